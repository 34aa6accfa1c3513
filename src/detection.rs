//! A detection: one point source (star) observed in an image.
//!
//! Detections are the output of star extraction and the input to star
//! identification.

use crate::camera::Camera;
use crate::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Position in pixels along columns (image x-axis), origin at the top-left corner.
    pub x: f64,
    /// Position in pixels along rows (image y-axis), origin at the top-left corner.
    pub y: f64,
    /// Observed magnitude (lower is brighter).
    pub mag: f64,
}

impl Detection {
    pub fn new(x: f64, y: f64, mag: f64) -> Self {
        Self { x, y, mag }
    }

    /// Camera-frame (azimuth, altitude) of the detection.
    pub fn angles(&self, camera: &dyn Camera) -> (f64, f64) {
        camera.to_angles(self.x, self.y)
    }

    /// Unit vector pointing to the detection in camera coordinates.
    pub fn uvec(&self, camera: &dyn Camera) -> Vector3 {
        let (az, alt) = self.angles(camera);
        crate::geometry::angles_to_vector(az, alt)
    }

    /// Euclidean pixel distance to a point.
    pub fn pixel_distance(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}
