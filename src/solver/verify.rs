//! Match verification.
//!
//! Projects the catalog neighborhood of the centered star through a
//! hypothesized orientation and compares it with the scene. Every projected
//! star that should be visible must be explained by a detection; detections
//! explained by exactly one star are identified.

use tracing::trace;

use crate::camera::Camera;
use crate::geometry::{angular_distance, vector_to_angles};
use crate::{Matrix3, Scene, StarCatalog, Vector3};

/// Joint pixel and magnitude limit under which a projected star explains a detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchTier {
    pub max_pixels: f64,
    pub max_magnitude: f64,
}

impl MatchTier {
    pub const fn new(max_pixels: f64, max_magnitude: f64) -> Self {
        Self {
            max_pixels,
            max_magnitude,
        }
    }
}

/// Verification thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyConfig {
    /// Added to the FOV radius around the centered star, radians.
    pub fov_margin: f64,
    /// Catalog stars up to `faintest detection + magnitude_margin` are projected.
    pub magnitude_margin: f64,
    /// A missing star only rejects the match if it lands this many pixels inside every edge.
    pub edge_margin_px: f64,
    /// ... and is brighter than `faintest detection - visibility_margin`.
    pub visibility_margin: f64,
    /// A detection is a candidate for a projected star if any tier holds.
    pub tiers: Vec<MatchTier>,
    /// Uniquely identified detections required to accept.
    pub min_identified: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            fov_margin: 0.002,
            magnitude_margin: 0.4,
            edge_margin_px: 3.0,
            visibility_margin: 0.3,
            tiers: vec![
                MatchTier::new(1.0, 0.2),
                MatchTier::new(2.0, 0.12),
                MatchTier::new(3.0, 0.08),
            ],
            min_identified: 3,
        }
    }
}

/// Identification state of one detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Assignment {
    #[default]
    Unidentified,
    Identified(u64),
    /// Close to more than one explanation (typically a double star). Never
    /// reverts to `Identified`.
    Ambiguous,
}

impl Assignment {
    pub fn id(&self) -> Option<u64> {
        match self {
            Assignment::Identified(id) => Some(*id),
            _ => None,
        }
    }

    fn assign(&mut self, id: u64) {
        *self = match *self {
            Assignment::Unidentified => Assignment::Identified(id),
            Assignment::Identified(prev) if prev == id => Assignment::Identified(id),
            _ => Assignment::Ambiguous,
        };
    }
}

/// Outcome of verifying one orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub accepted: bool,
    pub assignments: Vec<Assignment>,
    /// Catalog stars projected into the image.
    pub projected: usize,
    /// Catalog star that should have been seen but was not, if that rejected the match.
    pub missing_star: Option<u64>,
}

impl Verification {
    /// Number of uniquely identified detections.
    pub fn identified(&self) -> usize {
        self.assignments
            .iter()
            .filter(|a| matches!(a, Assignment::Identified(_)))
            .count()
    }

    /// Per-detection catalog ids; ambiguous and unidentified detections are `None`.
    pub fn ids(&self) -> Vec<Option<u64>> {
        self.assignments.iter().map(Assignment::id).collect()
    }
}

/// Largest angular distance from detection `centered` to the image corners,
/// plus `margin`.
pub fn fov_radius(scene: &Scene, centered: usize, camera: &dyn Camera, margin: f64) -> f64 {
    let (w, h) = camera.resolution();
    let (w, h) = (w as f64, h as f64);
    let (az0, alt0) = scene.angles(centered);
    [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
        .into_iter()
        .map(|(x, y)| {
            let (az, alt) = camera.to_angles(x, y);
            angular_distance(az0, alt0, az, alt)
        })
        .fold(0.0, f64::max)
        + margin
}

/// Verify an orientation hypothesis.
///
/// `center` is the catalog unit vector of the centered star and
/// `centered_detection` the detection it was matched to.
pub fn verify(
    scene: &Scene,
    catalog: &StarCatalog,
    camera: &dyn Camera,
    orientation: &Matrix3,
    center: Vector3,
    centered_detection: usize,
    config: &VerifyConfig,
) -> Verification {
    let mut assignments = vec![Assignment::Unidentified; scene.len()];
    let radius = fov_radius(scene, centered_detection, camera, config.fov_margin);
    let faintest = scene.max_magnitude();
    let (w, h) = camera.resolution();
    let (w, h) = (w as f64, h as f64);
    let mut projected = 0;

    let neighbors = catalog
        .query_stars_from_uvec(center, radius)
        .into_iter()
        .filter(|s| s.mag < faintest + config.magnitude_margin);

    for star in neighbors {
        let (az, alt) = vector_to_angles(&(orientation * star.uvec()));
        let Some((x, y)) = camera.from_angles(az, alt) else {
            continue;
        };
        projected += 1;

        let candidates: Vec<usize> = scene
            .detections()
            .iter()
            .enumerate()
            .filter(|(_, d)| {
                let dpix = d.pixel_distance(x, y);
                let dmag = (d.mag - star.mag).abs();
                config
                    .tiers
                    .iter()
                    .any(|t| dpix < t.max_pixels && dmag < t.max_magnitude)
            })
            .map(|(j, _)| j)
            .collect();

        match candidates.as_slice() {
            [] => {
                let m = config.edge_margin_px;
                let visible = m < x
                    && x < w - m
                    && m < y
                    && y < h - m
                    && star.mag < faintest - config.visibility_margin;
                if visible {
                    trace!("Star {} at ({:.1}, {:.1}) has no detection", star.id, x, y);
                    return Verification {
                        accepted: false,
                        assignments,
                        projected,
                        missing_star: Some(star.id),
                    };
                }
            }
            [j] => assignments[*j].assign(star.id),
            many => {
                for &j in many {
                    assignments[j] = Assignment::Ambiguous;
                }
            }
        }
    }

    let mut result = Verification {
        accepted: false,
        assignments,
        projected,
        missing_star: None,
    };
    result.accepted = result.identified() >= config.min_identified;
    result
}
