//! Scene model: the detections of one image and their pairwise angular distances.

use nalgebra::DMatrix;
use thiserror::Error;

use crate::camera::Camera;
use crate::geometry::angular_distance;
use crate::Detection;

/// Errors raised while building a scene from text input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    /// The number of values is not a multiple of 3 (x, y, magnitude).
    #[error("malformed scene: {count} values is not a multiple of 3 (x, y, magnitude)")]
    Malformed { count: usize },
    /// A value could not be parsed as a number.
    #[error("malformed scene: value {position} ({value:?}) is not a number")]
    InvalidNumber { position: usize, value: String },
}

/// The detections of one image, with derived angular geometry.
///
/// `distances` is an N×N matrix whose upper triangle (`i < j`) holds the
/// angular distance in radians between detections `i` and `j`. The diagonal
/// and lower triangle are zero and carry no meaning; use [`Scene::distance`]
/// for symmetric access.
#[derive(Debug, Clone)]
pub struct Scene {
    detections: Vec<Detection>,
    angles: Vec<(f64, f64)>,
    distances: DMatrix<f64>,
    max_magnitude: f64,
}

impl Scene {
    /// Parse a scene line of comma-separated `x, y, magnitude` triples.
    pub fn parse(line: &str, camera: &dyn Camera) -> Result<Self, SceneError> {
        let values = parse_values(line)?;
        Self::from_values(&values, camera)
    }

    /// Build a scene from a flat list of `x, y, magnitude` triples.
    pub fn from_values(values: &[f64], camera: &dyn Camera) -> Result<Self, SceneError> {
        if values.len() % 3 != 0 {
            return Err(SceneError::Malformed {
                count: values.len(),
            });
        }
        let detections = values
            .chunks_exact(3)
            .map(|v| Detection::new(v[0], v[1], v[2]))
            .collect();
        Ok(Self::from_detections(detections, camera))
    }

    /// Build a scene from detections, computing all pairwise distances once.
    pub fn from_detections(detections: Vec<Detection>, camera: &dyn Camera) -> Self {
        let n = detections.len();
        let angles: Vec<(f64, f64)> = detections.iter().map(|d| d.angles(camera)).collect();

        let mut distances = DMatrix::zeros(n, n);
        for i in 0..n {
            let (az_i, alt_i) = angles[i];
            for j in (i + 1)..n {
                let (az_j, alt_j) = angles[j];
                distances[(i, j)] = angular_distance(az_i, alt_i, az_j, alt_j);
            }
        }

        let max_magnitude = detections
            .iter()
            .map(|d| d.mag)
            .fold(f64::NEG_INFINITY, f64::max);

        Self {
            detections,
            angles,
            distances,
            max_magnitude,
        }
    }

    /// Number of detections.
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn detection(&self, idx: usize) -> &Detection {
        &self.detections[idx]
    }

    pub fn magnitude(&self, idx: usize) -> f64 {
        self.detections[idx].mag
    }

    /// Camera-frame (azimuth, altitude) of a detection.
    pub fn angles(&self, idx: usize) -> (f64, f64) {
        self.angles[idx]
    }

    /// Faintest (largest) magnitude in the scene; `-inf` for an empty scene.
    pub fn max_magnitude(&self) -> f64 {
        self.max_magnitude
    }

    /// Angular distance between two detections (symmetric, zero on the diagonal).
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        if i <= j {
            self.distances[(i, j)]
        } else {
            self.distances[(j, i)]
        }
    }

    /// The raw upper-triangular distance matrix.
    pub fn distance_matrix(&self) -> &DMatrix<f64> {
        &self.distances
    }
}

fn parse_values(line: &str) -> Result<Vec<f64>, SceneError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }
    line.split(',')
        .enumerate()
        .map(|(position, raw)| {
            let raw = raw.trim();
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| SceneError::InvalidNumber {
                    position,
                    value: raw.to_string(),
                })
        })
        .collect()
}
