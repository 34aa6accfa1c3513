//! Camera models: mapping between pixel coordinates and camera-frame angles.
//!
//! The identification core only talks to the [`Camera`] trait, so any lens
//! model can be plugged in. [`CameraModel`] covers the five classic
//! fisheye/pinhole projections.
//!
//! # Coordinate conventions
//!
//! - **Pixel coordinates**: origin at the top-left corner, +X along columns
//!   (right), +Y along rows (down).
//! - **Camera frame**: +Z is the boresight (altitude `π/2`). Azimuth is measured
//!   in the image plane from +X towards +Y.
//!
//! # Pipeline
//!
//! ```text
//! pixel → subtract principal point → scale by focal length → (r, az) → θ = proj⁻¹(r) → alt = π/2 − θ
//! alt → θ → r = proj(θ) → scale by focal length → add principal point → pixel
//! ```

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::str::FromStr;

/// Pixel ↔ angle mapping used by the identification core.
pub trait Camera: Send + Sync {
    /// Camera-frame `(azimuth, altitude)` in radians of a pixel position.
    fn to_angles(&self, x: f64, y: f64) -> (f64, f64);

    /// Pixel position of a camera-frame direction, or `None` when the
    /// projection cannot represent it (e.g. behind a pinhole camera).
    fn from_angles(&self, az: f64, alt: f64) -> Option<(f64, f64)>;

    /// Image size in pixels `(width, height)`.
    fn resolution(&self) -> (u32, u32);

    /// Geometric center of the image in pixels.
    fn image_center(&self) -> (f64, f64) {
        let (w, h) = self.resolution();
        (w as f64 / 2.0, h as f64 / 2.0)
    }
}

/// Radial projection model: how the off-axis angle θ maps to image radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Pinhole: `r = tan θ`.
    Rectilinear,
    /// `r = θ`.
    Equidistant,
    /// `r = 2 sin(θ/2)`.
    EquisolidAngle,
    /// `r = 2 tan(θ/2)`.
    Stereographic,
    /// `r = sin θ`.
    Orthographic,
}

impl Projection {
    pub const ALL: [Projection; 5] = [
        Projection::Rectilinear,
        Projection::Equidistant,
        Projection::EquisolidAngle,
        Projection::Stereographic,
        Projection::Orthographic,
    ];

    /// Image radius (in focal lengths) of an off-axis angle, if representable.
    pub fn radius(&self, theta: f64) -> Option<f64> {
        match self {
            Projection::Rectilinear if theta >= FRAC_PI_2 => None,
            Projection::Rectilinear => Some(theta.tan()),
            Projection::Equidistant => Some(theta),
            Projection::EquisolidAngle => Some(2.0 * (theta / 2.0).sin()),
            Projection::Stereographic if theta >= PI => None,
            Projection::Stereographic => Some(2.0 * (theta / 2.0).tan()),
            Projection::Orthographic if theta > FRAC_PI_2 => None,
            Projection::Orthographic => Some(theta.sin()),
        }
    }

    /// Off-axis angle of an image radius (in focal lengths).
    pub fn theta(&self, r: f64) -> f64 {
        match self {
            Projection::Rectilinear => r.atan(),
            Projection::Equidistant => r,
            Projection::EquisolidAngle => 2.0 * (r / 2.0).clamp(-1.0, 1.0).asin(),
            Projection::Stereographic => 2.0 * (r / 2.0).atan(),
            Projection::Orthographic => r.clamp(-1.0, 1.0).asin(),
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Projection::Rectilinear => "rectilinear",
            Projection::Equidistant => "equidistant",
            Projection::EquisolidAngle => "equisolid",
            Projection::Stereographic => "stereographic",
            Projection::Orthographic => "orthographic",
        };
        f.write_str(name)
    }
}

impl FromStr for Projection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rectilinear" | "pinhole" => Ok(Projection::Rectilinear),
            "equidistant" => Ok(Projection::Equidistant),
            "equisolid" | "equisolid-angle" => Ok(Projection::EquisolidAngle),
            "stereographic" => Ok(Projection::Stereographic),
            "orthographic" => Ok(Projection::Orthographic),
            other => Err(anyhow::anyhow!("unknown projection {other:?}")),
        }
    }
}

/// Camera intrinsics for an ideal (distortion-free) lens.
#[derive(Debug, Clone)]
pub struct CameraModel {
    /// Radial projection model.
    pub projection: Projection,
    /// Focal length normalized by the image width.
    pub focal_length: f64,
    /// Image size in pixels `(width, height)`.
    pub resolution: (u32, u32),
    /// Pixel height divided by pixel width.
    pub pixel_aspect_ratio: f64,
    /// Principal point as a fraction of `(width, height)`; `(0.5, 0.5)` is the image center.
    pub principal_point: (f64, f64),
}

impl CameraModel {
    pub fn new(
        projection: Projection,
        focal_length: f64,
        resolution: (u32, u32),
        pixel_aspect_ratio: f64,
        principal_point: (f64, f64),
    ) -> Self {
        Self {
            projection,
            focal_length,
            resolution,
            pixel_aspect_ratio,
            principal_point,
        }
    }

    /// Create a camera whose horizontal field of view spans the image width.
    ///
    /// Square pixels, principal point at the image center.
    pub fn from_fov(projection: Projection, fov_rad: f64, resolution: (u32, u32)) -> Self {
        let edge_radius = projection.radius(fov_rad / 2.0).unwrap_or(f64::INFINITY);
        Self::new(projection, 0.5 / edge_radius, resolution, 1.0, (0.5, 0.5))
    }

    /// Focal length in pixels.
    pub fn focal_length_px(&self) -> f64 {
        self.focal_length * self.resolution.0 as f64
    }

    /// Horizontal field of view in radians.
    pub fn fov_rad(&self) -> f64 {
        2.0 * self.projection.theta(0.5 / self.focal_length)
    }

    fn principal_point_px(&self) -> (f64, f64) {
        (
            self.principal_point.0 * self.resolution.0 as f64,
            self.principal_point.1 * self.resolution.1 as f64,
        )
    }
}

impl Camera for CameraModel {
    fn to_angles(&self, x: f64, y: f64) -> (f64, f64) {
        let f = self.focal_length_px();
        let (cx, cy) = self.principal_point_px();
        let dx = (x - cx) / f;
        let dy = (y - cy) * self.pixel_aspect_ratio / f;
        let theta = self.projection.theta(dx.hypot(dy));
        (dy.atan2(dx), FRAC_PI_2 - theta)
    }

    fn from_angles(&self, az: f64, alt: f64) -> Option<(f64, f64)> {
        let r = self.projection.radius(FRAC_PI_2 - alt)?;
        let f = self.focal_length_px();
        let (cx, cy) = self.principal_point_px();
        let (sin_az, cos_az) = az.sin_cos();
        Some((
            cx + r * cos_az * f,
            cy + r * sin_az * f / self.pixel_aspect_ratio,
        ))
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}
