//! Spatial star catalog optimized for cone (angular-radius) searches and id lookup.
//!
//! `StarCatalog` stores stars in a HEALPix-style spherical binning:
//! latitude is partitioned into `3 * nside` bins in `z = sin(dec)`, and
//! longitude into `4 * nside` bins in right ascension, for a total of
//! `12 * nside^2` cells. Each cell maps to a compact slice of star indices.
//!
//! Query flow:
//! 1. Compute candidate cells intersecting the cone around a pointing direction.
//! 2. Scan only stars in those cells.
//! 3. Apply exact angular filtering using a dot-product threshold.
//!
//! A hash index from catalog id to storage index serves the identification
//! core, which refers to stars by id only.

use std::collections::HashMap;
use std::f64::consts::{PI, TAU};
use std::path::Path;

use tracing::info;

use crate::catalogs::{csv_catalog, hipparcos};
use crate::{Star, Vector3};

#[derive(Debug, Clone)]
pub struct StarCatalog {
    pub nside: u32,
    pub n_lat: u32,
    pub n_lon: u32,
    pub stars: Vec<Star>,
    pub cell_offsets: Vec<u32>,
    pub star_indices: Vec<u32>,
    id_index: HashMap<u64, u32>,
}

impl StarCatalog {
    /// Build a catalog and spatial index from owned stars.
    ///
    /// `nside` controls resolution and must be greater than zero.
    /// The number of sky cells is `12 * nside^2`. If an id occurs more than
    /// once, lookups by id return the last occurrence.
    pub fn new(nside: u32, stars: Vec<Star>) -> Self {
        assert!(nside > 0, "nside must be > 0");
        let n_lat = 3 * nside;
        let n_lon = 4 * nside;
        let n_cells = (n_lat * n_lon) as usize;

        let mut bins: Vec<Vec<u32>> = vec![Vec::new(); n_cells];
        for (star_idx, star) in stars.iter().enumerate() {
            let cell = Self::cell_for_radec(n_lat, n_lon, star.ra_rad, star.dec_rad);
            bins[cell as usize].push(star_idx as u32);
        }

        let mut cell_offsets = Vec::with_capacity(n_cells + 1);
        let mut star_indices = Vec::with_capacity(stars.len());
        cell_offsets.push(0);
        for cell_bin in bins {
            star_indices.extend(cell_bin);
            cell_offsets.push(star_indices.len() as u32);
        }

        let id_index = stars
            .iter()
            .enumerate()
            .map(|(idx, s)| (s.id, idx as u32))
            .collect();

        Self {
            nside,
            n_lat,
            n_lon,
            stars,
            cell_offsets,
            star_indices,
            id_index,
        }
    }

    /// Load a catalog file. Paths ending in `.csv` are read as
    /// `id,ra_deg,dec_deg,mag`; anything else as Hipparcos `hip_main.dat`
    /// with proper motion propagated to `epoch_year` when given.
    pub fn load<P: AsRef<Path>>(path: P, nside: u32, epoch_year: Option<f64>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        info!("Loading star catalog from {}", path.display());
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let stars = if is_csv {
            csv_catalog::read_star_csv(path)?
        } else {
            hipparcos::load_hipparcos_catalog_from_file(path)?
                .iter()
                .map(|h| crate::star_from_hipparcos(h, epoch_year))
                .collect()
        };
        anyhow::ensure!(!stars.is_empty(), "star catalog {} is empty", path.display());
        info!("Loaded {} catalog stars", stars.len());
        Ok(Self::new(nside, stars))
    }

    /// Return the index resolution parameter.
    pub fn nside(&self) -> u32 {
        self.nside
    }

    /// Return the total number of stars in the catalog.
    pub fn len(&self) -> usize {
        self.stars.len()
    }

    /// Return `true` when the catalog contains no stars.
    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }

    /// Return all catalog stars as an immutable slice.
    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    /// Look up a star by catalog id.
    pub fn get(&self, id: u64) -> Option<&Star> {
        self.id_index.get(&id).map(|&idx| &self.stars[idx as usize])
    }

    /// Query stars within an angular radius of a pointing direction.
    ///
    /// Input coordinates are in radians (`ra_rad`, `dec_rad`, `radius_rad`).
    /// Returns indices into the internal star storage.
    pub fn query_indices(&self, ra_rad: f64, dec_rad: f64, radius_rad: f64) -> Vec<usize> {
        let dir = crate::geometry::angles_to_vector(ra_rad, dec_rad);
        self.query_indices_from_uvec(dir, radius_rad)
    }

    /// Query stars within an angular radius of a pointing direction.
    ///
    /// Input coordinates are in radians (`ra_rad`, `dec_rad`, `radius_rad`).
    /// Returns references to matching stars.
    pub fn query_stars(&self, ra_rad: f64, dec_rad: f64, radius_rad: f64) -> Vec<&Star> {
        self.query_indices(ra_rad, dec_rad, radius_rad)
            .into_iter()
            .map(|idx| &self.stars[idx])
            .collect()
    }

    /// Query stars around a (possibly non-unit) direction vector.
    ///
    /// `dir` is normalized internally; `radius_rad` is clamped to `[0, π]`.
    /// Returns indices into the internal star storage, sorted ascending.
    pub fn query_indices_from_uvec(&self, dir: Vector3, radius_rad: f64) -> Vec<usize> {
        if self.is_empty() {
            return Vec::new();
        }
        let radius = radius_rad.clamp(0.0, PI);
        let dir = normalize_or_fallback(dir);
        let cos_radius = radius.cos();

        let lon_step = TAU / self.n_lon as f64;

        // The z extent of a cap is not symmetric around the center once the cap
        // crosses a pole, so bound it through the center declination instead.
        let dec_center = dir.z.clamp(-1.0, 1.0).asin();
        let z_min = (dec_center - radius).max(-PI / 2.0).sin();
        let z_max = (dec_center + radius).min(PI / 2.0).sin();

        // Widest longitude offset of any point in the cap; a cap containing a
        // pole spans every longitude.
        let lon_half_span = if dec_center.abs() + radius >= PI / 2.0 {
            PI
        } else {
            (radius.sin() / dec_center.cos()).clamp(-1.0, 1.0).asin()
        } + lon_step;

        let mut phi = dir.y.atan2(dir.x);
        if phi < 0.0 {
            phi += TAU;
        }
        let lon_min = phi - lon_half_span;
        let lon_max = phi + lon_half_span;

        let mut out = Vec::new();
        for lat_bin in Self::z_bin_range(self.n_lat, z_min, z_max) {
            if lon_max - lon_min >= TAU {
                for lon_bin in 0..self.n_lon {
                    self.collect_cell_matches(lat_bin, lon_bin, dir, cos_radius, &mut out);
                }
                continue;
            }

            self.for_each_wrapped_lon_bin(lon_min, lon_max, |lon_bin| {
                self.collect_cell_matches(lat_bin, lon_bin, dir, cos_radius, &mut out);
            });
        }

        out.sort_unstable();
        out.dedup();
        out
    }

    /// Query stars around a (possibly non-unit) direction vector.
    ///
    /// `dir` is normalized internally; `radius_rad` is clamped to `[0, π]`.
    /// Returns references to matching stars.
    pub fn query_stars_from_uvec(&self, dir: Vector3, radius_rad: f64) -> Vec<&Star> {
        self.query_indices_from_uvec(dir, radius_rad)
            .into_iter()
            .map(|idx| &self.stars[idx])
            .collect()
    }

    fn collect_cell_matches(
        &self,
        lat_bin: u32,
        lon_bin: u32,
        dir: Vector3,
        cos_radius: f64,
        out: &mut Vec<usize>,
    ) {
        let cell = (lat_bin * self.n_lon + lon_bin) as usize;
        let start = self.cell_offsets[cell] as usize;
        let end = self.cell_offsets[cell + 1] as usize;

        for flat_idx in start..end {
            let star_idx = self.star_indices[flat_idx] as usize;
            let star = &self.stars[star_idx];
            if dir.dot(&star.uvec()) >= cos_radius {
                out.push(star_idx);
            }
        }
    }

    fn for_each_wrapped_lon_bin<F>(&self, lon_min: f64, lon_max: f64, mut f: F)
    where
        F: FnMut(u32),
    {
        let start = wrap_angle(lon_min);
        let end = wrap_angle(lon_max);

        let start_bin = Self::phi_to_lon_bin(self.n_lon, start);
        let end_bin = Self::phi_to_lon_bin(self.n_lon, end);

        if start_bin <= end_bin {
            for lon_bin in start_bin..=end_bin {
                f(lon_bin);
            }
            return;
        }

        for lon_bin in start_bin..self.n_lon {
            f(lon_bin);
        }
        for lon_bin in 0..=end_bin {
            f(lon_bin);
        }
    }

    fn z_bin_range(n_lat: u32, z_min: f64, z_max: f64) -> std::ops::RangeInclusive<u32> {
        let start = Self::z_to_lat_bin(n_lat, z_min);
        let end = Self::z_to_lat_bin(n_lat, z_max);
        start..=end
    }

    fn cell_for_radec(n_lat: u32, n_lon: u32, ra_rad: f64, dec_rad: f64) -> u32 {
        let mut phi = wrap_angle(ra_rad);
        if phi >= TAU {
            phi = 0.0;
        }
        let z = dec_rad.sin().clamp(-1.0, 1.0);
        let lat_bin = Self::z_to_lat_bin(n_lat, z);
        let lon_bin = Self::phi_to_lon_bin(n_lon, phi);
        lat_bin * n_lon + lon_bin
    }

    fn z_to_lat_bin(n_lat: u32, z: f64) -> u32 {
        let u = ((z.clamp(-1.0, 1.0) + 1.0) * 0.5).clamp(0.0, 1.0);
        let idx = (u * n_lat as f64).floor() as u32;
        idx.min(n_lat - 1)
    }

    fn phi_to_lon_bin(n_lon: u32, phi: f64) -> u32 {
        let u = (phi / TAU).clamp(0.0, 1.0 - f64::EPSILON);
        let idx = (u * n_lon as f64).floor() as u32;
        idx.min(n_lon - 1)
    }
}

fn wrap_angle(theta_rad: f64) -> f64 {
    theta_rad.rem_euclid(TAU)
}

fn normalize_or_fallback(v: Vector3) -> Vector3 {
    let n = v.norm();
    if n > 0.0 {
        v / n
    } else {
        Vector3::new(1.0, 0.0, 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deg2rad(d: f64) -> f64 {
        d.to_radians()
    }

    fn brute_force(catalog: &StarCatalog, ra: f64, dec: f64, radius: f64) -> Vec<u64> {
        let query_dir = crate::geometry::angles_to_vector(ra, dec).normalize();
        let mut ids: Vec<u64> = catalog
            .stars
            .iter()
            .filter(|s| query_dir.dot(&s.uvec()) >= radius.cos())
            .map(|s| s.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn cone_query_finds_nearby_stars() {
        let stars = vec![
            Star::new(1, deg2rad(0.0), deg2rad(0.0), 2.0),
            Star::new(2, deg2rad(2.0), deg2rad(1.0), 2.5),
            Star::new(3, deg2rad(40.0), deg2rad(-10.0), 5.0),
        ];

        let index = StarCatalog::new(8, stars);
        let hits = index.query_stars(deg2rad(0.5), deg2rad(0.25), deg2rad(3.0));
        let mut ids: Vec<u64> = hits.iter().map(|s| s.id).collect();
        ids.sort_unstable();

        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn cone_query_handles_ra_wraparound() {
        let stars = vec![
            Star::new(10, deg2rad(359.0), deg2rad(0.0), 3.0),
            Star::new(11, deg2rad(1.0), deg2rad(0.0), 3.0),
            Star::new(12, deg2rad(180.0), deg2rad(0.0), 3.0),
        ];

        let index = StarCatalog::new(8, stars);
        let hits = index.query_stars(deg2rad(0.0), deg2rad(0.0), deg2rad(3.0));
        let mut ids: Vec<u64> = hits.iter().map(|s| s.id).collect();
        ids.sort_unstable();

        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn cone_query_matches_brute_force_on_a_grid() {
        let mut stars = Vec::new();
        let mut id = 0;
        for dec in (-88..=88).step_by(4) {
            for ra in (0..360).step_by(5) {
                stars.push(Star::new(id, deg2rad(ra as f64), deg2rad(dec as f64), 5.0));
                id += 1;
            }
        }
        let catalog = StarCatalog::new(6, stars);
        for &(ra, dec, radius) in &[
            (120.0, 30.0, 7.0),
            (0.0, 85.0, 10.0),
            (200.0, -80.0, 15.0),
            (359.0, 0.0, 36.0),
            (45.0, 60.0, 25.0),
        ] {
            let mut got: Vec<u64> = catalog
                .query_stars(deg2rad(ra), deg2rad(dec), deg2rad(radius))
                .iter()
                .map(|s| s.id)
                .collect();
            got.sort_unstable();
            assert_eq!(
                got,
                brute_force(&catalog, deg2rad(ra), deg2rad(dec), deg2rad(radius)),
                "query at ({ra}, {dec}) r={radius}"
            );
        }
    }

    #[test]
    fn query_from_uvec_matches_radec_query() {
        let stars = vec![
            Star::new(20, deg2rad(120.0), deg2rad(30.0), 2.0),
            Star::new(21, deg2rad(124.0), deg2rad(30.5), 2.1),
        ];

        let index = StarCatalog::new(4, stars);
        let by_radec = index.query_indices(deg2rad(122.0), deg2rad(30.0), deg2rad(3.0));
        let by_uvec = index.query_indices_from_uvec(
            crate::geometry::angles_to_vector(deg2rad(122.0), deg2rad(30.0)),
            deg2rad(3.0),
        );

        assert_eq!(by_radec, by_uvec);
    }

    #[test]
    fn lookup_by_id() {
        let catalog = StarCatalog::new(2, vec![Star::new(5, 0.1, 0.2, 1.0), Star::new(77, 1.0, -0.3, 4.0)]);
        assert_eq!(catalog.get(77).map(|s| s.mag), Some(4.0));
        assert!(catalog.get(6).is_none());
    }
}
