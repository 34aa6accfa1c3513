//! Lost-in-space star identification by normalized voting (NVIDA).
//!
//! Given the detections of one image, the identifier determines which catalog
//! star each detection is and recovers the camera orientation. The algorithm:
//!
//! 1. **Filtering**: for every detection pair, collect the catalog pairs whose
//!    separation and magnitudes agree within tolerance.
//! 2. **Voting**: rank each detection's catalog ids by occurrence count,
//!    normalized by how common the id is in the whole distance table.
//! 3. **Triangle search**: breadth-first over the vote rankings, close
//!    detection triangles whose three catalog pairs are mutually consistent.
//! 4. **Orientation**: align the centered star, then solve the roll by
//!    gradient descent.
//! 5. **Verification**: project the catalog neighborhood and compare with the
//!    scene.
//!
//! If a round runs out of triangles, tolerances are widened and the search
//! restarts, skipping triangles already tried.

pub mod filter;
pub mod identify;
pub mod orientation;
pub mod triangle;
pub mod verify;
pub mod votes;

use crate::camera::Camera;
use crate::geometry::{angles_to_vector, vector_to_angles};
use crate::{DistanceTable, Matrix3, StarCatalog, Vector3};

pub use orientation::{GradientDescent, ThetaSolution};
pub use triangle::StarTriangle;
pub use verify::VerifyConfig;

// ── Status codes ────────────────────────────────────────────────────────────

/// Outcome of an identification attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifyStatus {
    /// A verified match was found.
    MatchFound,
    /// The triangle budget or the relaxation rounds ran out without a match.
    NoMatch,
    /// The solve timeout was reached before a match was found.
    Timeout,
    /// Fewer than three detections were provided.
    TooFew,
}

impl std::fmt::Display for IdentifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IdentifyStatus::MatchFound => "match found",
            IdentifyStatus::NoMatch => "no match",
            IdentifyStatus::Timeout => "timeout",
            IdentifyStatus::TooFew => "too few detections",
        };
        f.write_str(s)
    }
}

// ── Configuration ───────────────────────────────────────────────────────────

/// Parameters controlling identification.
#[derive(Debug, Clone, PartialEq)]
pub struct NvidaConfig {
    /// Initial angular distance tolerance, radians. Default 3e-4.
    pub dist_error: f64,
    /// Initial magnitude tolerance. Default 0.04.
    pub mag_error: f64,
    /// Factor applied to `dist_error` after a round without a match. Default 1.5.
    pub dist_mult_factor: f64,
    /// Factor applied to `mag_error` after a round without a match. Default 1.5.
    pub mag_mult_factor: f64,
    /// Distinct triangles evaluated before giving up. Default 50.
    pub max_num_triangles: usize,
    /// Roll-angle optimizer settings.
    pub gradient_descent: GradientDescent,
    /// Filtering rounds (initial plus relaxed) before giving up. Default 20.
    pub max_rounds: usize,
    /// Timeout in milliseconds. None = no timeout.
    pub solve_timeout_ms: Option<u64>,
    /// Match verification thresholds.
    pub verify: VerifyConfig,
}

impl Default for NvidaConfig {
    fn default() -> Self {
        Self {
            dist_error: 3e-4,
            mag_error: 0.04,
            dist_mult_factor: 1.5,
            mag_mult_factor: 1.5,
            max_num_triangles: 50,
            gradient_descent: GradientDescent::default(),
            max_rounds: 20,
            solve_timeout_ms: None,
            verify: VerifyConfig::default(),
        }
    }
}

// ── Identify result ─────────────────────────────────────────────────────────

/// Statistics of one filtering round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundStats {
    pub dist_error: f64,
    pub mag_error: f64,
    /// Candidates over all detections.
    pub candidates: usize,
    /// Triangles evaluated in this round.
    pub triangles: usize,
}

/// Result of an identification attempt.
#[derive(Debug, Clone)]
pub struct IdentifyResult {
    /// Outcome status.
    pub status: IdentifyStatus,
    /// Catalog id per detection, in detection order. `None` for unidentified
    /// and ambiguous detections, and for every detection without a match.
    pub ids: Vec<Option<u64>>,
    /// Rotation mapping celestial unit vectors into the camera frame.
    /// Camera frame: +Z boresight, azimuth from +X (columns) towards +Y (rows).
    /// Only populated on success.
    pub orientation: Option<Matrix3>,
    /// The accepted triangle.
    pub triangle: Option<StarTriangle>,
    /// Roll-angle solution of the accepted triangle.
    pub theta: Option<ThetaSolution>,
    /// Distinct triangles evaluated (the size of the tried set).
    pub num_triangles: usize,
    /// Per-round tolerances and counts, in order.
    pub rounds: Vec<RoundStats>,
    /// Wall-clock time spent identifying, in milliseconds.
    pub solve_time_ms: f32,
}

impl IdentifyResult {
    /// Create a failure result with every detection unidentified.
    pub(crate) fn failure(
        status: IdentifyStatus,
        num_detections: usize,
        num_triangles: usize,
        rounds: Vec<RoundStats>,
        solve_time_ms: f32,
    ) -> Self {
        Self {
            status,
            ids: vec![None; num_detections],
            orientation: None,
            triangle: None,
            theta: None,
            num_triangles,
            rounds,
            solve_time_ms,
        }
    }

    pub fn is_match(&self) -> bool {
        self.status == IdentifyStatus::MatchFound
    }

    /// Number of uniquely identified detections.
    pub fn num_identified(&self) -> usize {
        self.ids.iter().flatten().count()
    }

    /// One comma-separated output line: per detection the catalog id or `-1`.
    pub fn to_csv_line(&self) -> String {
        self.ids
            .iter()
            .map(|id| id.map_or_else(|| "-1".to_string(), |id| id.to_string()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Boresight direction (RA, Dec) in radians. `None` without a match.
    pub fn boresight(&self) -> Option<(f64, f64)> {
        let m = self.orientation.as_ref()?;
        let (ra, dec) = vector_to_angles(&(m.transpose() * Vector3::z()));
        Some((ra.rem_euclid(std::f64::consts::TAU), dec))
    }

    /// Sky position (RA, Dec) in radians of a pixel. `None` without a match.
    pub fn pixel_to_radec(&self, camera: &dyn Camera, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = self.orientation.as_ref()?;
        let (az, alt) = camera.to_angles(x, y);
        let (ra, dec) = vector_to_angles(&(m.transpose() * angles_to_vector(az, alt)));
        Some((ra.rem_euclid(std::f64::consts::TAU), dec))
    }

    /// Pixel position of a sky position (RA, Dec in radians).
    ///
    /// `None` without a match or when the camera cannot image the direction.
    pub fn radec_to_pixel(&self, camera: &dyn Camera, ra: f64, dec: f64) -> Option<(f64, f64)> {
        let m = self.orientation.as_ref()?;
        let (az, alt) = vector_to_angles(&(m * angles_to_vector(ra, dec)));
        camera.from_angles(az, alt)
    }
}

// ── The identifier ──────────────────────────────────────────────────────────

/// Star identifier over shared, read-only reference data.
///
/// One `Nvida` can serve any number of scenes, from any number of threads:
/// all per-scene state lives inside [`Nvida::identify_stars`].
pub struct Nvida<'a> {
    pub catalog: &'a StarCatalog,
    pub table: &'a DistanceTable,
    pub camera: &'a dyn Camera,
    pub config: NvidaConfig,
}

impl<'a> Nvida<'a> {
    /// Create an identifier with the default configuration.
    pub fn new(catalog: &'a StarCatalog, table: &'a DistanceTable, camera: &'a dyn Camera) -> Self {
        Self::with_config(catalog, table, camera, NvidaConfig::default())
    }

    pub fn with_config(
        catalog: &'a StarCatalog,
        table: &'a DistanceTable,
        camera: &'a dyn Camera,
        config: NvidaConfig,
    ) -> Self {
        Self {
            catalog,
            table,
            camera,
            config,
        }
    }
}
