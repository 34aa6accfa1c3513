//! # nvida
//!
//! **Lost-in-space star identification** by Normalized Voting (NVIDA).
//!
//! Given the detections of a camera image (pixel position and magnitude of
//! each point source), `nvida` determines which catalog star each detection
//! is and recovers the camera orientation. No prior attitude estimate is
//! required; the only inputs are the scene, a star catalog, a table of
//! catalog star-pair separations, and a camera model.
//!
//! ## Features
//!
//! - **Voting** over catalog pairs compatible with each measured separation,
//!   normalized so dense sky regions do not dominate
//! - **Breadth-first triangle search** over the vote rankings
//! - **Orientation** from the centered star plus a gradient-descent roll fit
//! - **Verification** by projecting the catalog neighborhood into the image,
//!   discarding double-star ambiguities
//! - **Tolerance relaxation** with bounded budgets (triangles, rounds, time)
//! - **Camera models**: rectilinear, equidistant, equisolid-angle,
//!   stereographic and orthographic
//! - **Reference data**: Hipparcos or CSV catalogs, distance tables as CSV or
//!   an [rkyv](https://docs.rs/rkyv) binary cache
//!
//! ## Example
//!
//! ```no_run
//! use nvida::{CameraModel, DistanceTable, IdentifyStatus, Nvida, Projection, StarCatalog};
//!
//! let catalog = StarCatalog::load("data/hip_main.dat", 16, Some(2025.0)).unwrap();
//! let table = DistanceTable::load("data/distances.rkyv").unwrap();
//! let camera = CameraModel::from_fov(Projection::Rectilinear, 10f64.to_radians(), (1920, 1440));
//!
//! let nvida = Nvida::new(&catalog, &table, &camera);
//! let result = nvida.identify_line("960,720,2.0,1000,700,2.3,900,750,2.7").unwrap();
//! if result.status == IdentifyStatus::MatchFound {
//!     println!("{}", result.to_csv_line());
//! }
//! ```

pub mod batch;
pub mod camera;
/// Raw star catalogs: Hipparcos and plain CSV star lists
pub mod catalogs;
mod detection;
pub mod distance_table;
pub mod geometry;
pub mod scene;
pub mod solver;
pub mod star;
pub mod starcatalog;

pub use batch::BatchSummary;
pub use camera::{Camera, CameraModel, Projection};
pub use detection::*;
pub use distance_table::{DistanceRecord, DistanceTable, GenerateTableConfig};
pub use scene::{Scene, SceneError};
pub use solver::{IdentifyResult, IdentifyStatus, Nvida, NvidaConfig, RoundStats};
pub use star::*;
pub use starcatalog::*;

// Commonly used types. Identification runs in double precision throughout:
// pixel-level verification at narrow fields of view needs it.
pub type Vector3 = nalgebra::Vector3<f64>;
pub type Matrix3 = nalgebra::Matrix3<f64>;
