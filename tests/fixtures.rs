//! Shared synthetic fixtures.
//!
//! A fixture places catalog stars exactly under given pixel positions for a
//! known camera orientation, so the identification result can be checked
//! against the ids used to seed it. The distance table is generated from the
//! fixture catalog.

#![allow(dead_code)]

use nvida::geometry::{angle_between, angles_to_vector, vector_to_angles};
use nvida::{
    Camera, CameraModel, DistanceTable, GenerateTableConfig, Matrix3, Nvida, NvidaConfig,
    Projection, Star, StarCatalog, Vector3,
};
use rand::rngs::StdRng;
use rand::Rng;

pub const WIDTH: u32 = 1920;
pub const HEIGHT: u32 = 1440;

/// 60° horizontal FOV camera used by the synthetic scenes.
pub fn camera(projection: Projection) -> CameraModel {
    CameraModel::from_fov(projection, 60.0_f64.to_radians(), (WIDTH, HEIGHT))
}

/// Rotation (celestial → camera) from boresight RA/Dec and roll angle.
pub fn rotation_from_ra_dec_roll(ra: f64, dec: f64, roll: f64) -> Matrix3 {
    let cam_z = angles_to_vector(ra, dec);

    // Reference "up": celestial north unless the boresight is near a pole
    let raw_x = Vector3::z().cross(&cam_z);
    let cam_x_noroll = if raw_x.norm() > 1e-6 {
        raw_x.normalize()
    } else {
        Vector3::x().cross(&cam_z).normalize()
    };
    let cam_y_noroll = cam_z.cross(&cam_x_noroll);

    let cam_x = cam_x_noroll * roll.cos() + cam_y_noroll * roll.sin();
    let cam_y = -cam_x_noroll * roll.sin() + cam_y_noroll * roll.cos();
    Matrix3::from_rows(&[cam_x.transpose(), cam_y.transpose(), cam_z.transpose()])
}

/// Catalog star imaged at pixel `(x, y)` under `orientation`.
pub fn star_at(camera: &dyn Camera, orientation: &Matrix3, id: u64, x: f64, y: f64, mag: f64) -> Star {
    let (az, alt) = camera.to_angles(x, y);
    let sky = orientation.transpose() * angles_to_vector(az, alt);
    let (ra, dec) = vector_to_angles(&sky);
    Star::new(id, ra.rem_euclid(std::f64::consts::TAU), dec, mag)
}

/// Random stars at least `min_sep_rad` away from `boresight`, ids from `first_id`.
pub fn decoys(rng: &mut StdRng, n: usize, boresight: &Vector3, min_sep_rad: f64, first_id: u64) -> Vec<Star> {
    let mut stars = Vec::with_capacity(n);
    while stars.len() < n {
        let ra = rng.random_range(0.0..std::f64::consts::TAU);
        let dec = rng.random_range(-1.0_f64..1.0).asin();
        let v = angles_to_vector(ra, dec);
        if angle_between(&v, boresight) < min_sep_rad {
            continue;
        }
        let mag = rng.random_range(1.0..6.0);
        stars.push(Star::new(first_id + stars.len() as u64, ra, dec, mag));
    }
    stars
}

/// Catalog, distance table and camera for one synthetic sky.
pub struct Fixture {
    pub catalog: StarCatalog,
    pub table: DistanceTable,
    pub camera: CameraModel,
    pub orientation: Matrix3,
}

impl Fixture {
    /// Seed catalog stars under `detections` (`x, y, mag`) with `ids`, plus
    /// any `extra` stars, and generate the distance table.
    pub fn new(
        camera: CameraModel,
        orientation: Matrix3,
        detections: &[(f64, f64, f64)],
        ids: &[u64],
        extra: Vec<Star>,
    ) -> Self {
        assert_eq!(detections.len(), ids.len());
        let mut stars: Vec<Star> = detections
            .iter()
            .zip(ids)
            .map(|(&(x, y, mag), &id)| star_at(&camera, &orientation, id, x, y, mag))
            .collect();
        stars.extend(extra);

        let catalog = StarCatalog::new(8, stars);
        let table = DistanceTable::generate(
            &catalog,
            &GenerateTableConfig {
                max_distance_rad: 15.0_f64.to_radians(),
                max_magnitude: 10.0,
            },
        );
        Self {
            catalog,
            table,
            camera,
            orientation,
        }
    }

    pub fn nvida(&self) -> Nvida<'_> {
        Nvida::new(&self.catalog, &self.table, &self.camera)
    }

    pub fn nvida_with(&self, config: NvidaConfig) -> Nvida<'_> {
        Nvida::with_config(&self.catalog, &self.table, &self.camera, config)
    }
}

/// Scene line for `(x, y, mag)` detections.
pub fn scene_line(detections: &[(f64, f64, f64)]) -> String {
    detections
        .iter()
        .map(|(x, y, m)| format!("{x},{y},{m}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Default orientation: boresight at RA 83°, Dec -1° (Orion), rolled 30°.
pub fn orion() -> Matrix3 {
    rotation_from_ra_dec_roll(83.0_f64.to_radians(), (-1.0_f64).to_radians(), 30.0_f64.to_radians())
}

/// Boresight direction of an orientation.
pub fn boresight(orientation: &Matrix3) -> Vector3 {
    orientation.transpose() * Vector3::z()
}
