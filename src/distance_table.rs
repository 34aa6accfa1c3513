//! Catalog star-pair distance table.
//!
//! The table holds one record per catalog star pair whose angular separation
//! is below the generation limit, sorted ascending by separation so that the
//! pairs compatible with a measured distance form one contiguous slice. A
//! derived vote-weight index counts how many records each star appears in;
//! the identification core divides raw votes by it so that stars in dense
//! regions do not dominate.
//!
//! Tables are persisted either as CSV (`HIP1,HIP2,Vmag1,Vmag2,distance`) or as
//! an rkyv binary cache.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;
use rkyv::{Archive, Deserialize, Serialize};
use tracing::{info, warn};

use crate::geometry::angle_between;
use crate::StarCatalog;

/// One catalog star pair. Constructed records always satisfy `star_a < star_b`.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
pub struct DistanceRecord {
    pub star_a: u64,
    pub star_b: u64,
    pub mag_a: f64,
    pub mag_b: f64,
    /// Angular separation in radians.
    pub distance: f64,
}

impl DistanceRecord {
    /// Build a record, ordering the pair so that `star_a < star_b`.
    pub fn new(star_a: u64, star_b: u64, mag_a: f64, mag_b: f64, distance: f64) -> Self {
        if star_a <= star_b {
            Self {
                star_a,
                star_b,
                mag_a,
                mag_b,
                distance,
            }
        } else {
            Self {
                star_a: star_b,
                star_b: star_a,
                mag_a: mag_b,
                mag_b: mag_a,
                distance,
            }
        }
    }

    /// The id paired with `id` in this record, if `id` is part of it.
    pub fn partner_of(&self, id: u64) -> Option<u64> {
        if self.star_a == id {
            Some(self.star_b)
        } else if self.star_b == id {
            Some(self.star_a)
        } else {
            None
        }
    }
}

/// Parameters controlling distance-table generation.
#[derive(Debug, Clone)]
pub struct GenerateTableConfig {
    /// Largest pair separation stored, radians. Should cover the image diagonal.
    pub max_distance_rad: f64,
    /// Faintest catalog magnitude included in any pair.
    pub max_magnitude: f64,
}

impl Default for GenerateTableConfig {
    fn default() -> Self {
        Self {
            max_distance_rad: 12.5_f64.to_radians(),
            max_magnitude: 6.0,
        }
    }
}

/// Sorted pair table plus the per-star vote-weight index.
#[derive(Debug, Clone, Default)]
pub struct DistanceTable {
    records: Vec<DistanceRecord>,
    weights: HashMap<u64, u32>,
}

impl DistanceTable {
    /// Build a table from records in any order.
    ///
    /// Records are normalized to `star_a < star_b` and sorted by distance; an
    /// input that was not already sorted is reported with a warning.
    pub fn from_records(records: Vec<DistanceRecord>) -> Self {
        let mut records: Vec<DistanceRecord> = records
            .into_iter()
            .map(|r| DistanceRecord::new(r.star_a, r.star_b, r.mag_a, r.mag_b, r.distance))
            .collect();

        let sorted = records
            .windows(2)
            .all(|w| w[0].distance <= w[1].distance);
        if !sorted {
            warn!(
                "Distance table with {} records was not sorted by distance; sorting",
                records.len()
            );
            // Stable, so equal distances keep their input order.
            records.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        }

        let mut weights: HashMap<u64, u32> = HashMap::new();
        for r in &records {
            *weights.entry(r.star_a).or_insert(0) += 1;
            *weights.entry(r.star_b).or_insert(0) += 1;
        }

        Self { records, weights }
    }

    /// Generate the table from a catalog.
    ///
    /// Every pair of catalog stars at or brighter than `max_magnitude` and at
    /// most `max_distance_rad` apart is emitted exactly once.
    pub fn generate(catalog: &StarCatalog, config: &GenerateTableConfig) -> Self {
        info!(
            "Generating distance table: max separation {:.3}°, max magnitude {:.2}",
            config.max_distance_rad.to_degrees(),
            config.max_magnitude
        );

        let stars = catalog.stars();
        let mut records: Vec<DistanceRecord> = stars
            .par_iter()
            .enumerate()
            .filter(|(_, s)| s.mag <= config.max_magnitude)
            .flat_map_iter(|(idx, star)| {
                let uvec = star.uvec();
                catalog
                    .query_indices_from_uvec(uvec, config.max_distance_rad)
                    .into_iter()
                    // Each unordered pair is emitted from its lower storage index.
                    .filter(move |&other| other > idx)
                    .filter_map(move |other| {
                        let s = &stars[other];
                        if s.mag > config.max_magnitude {
                            return None;
                        }
                        let distance = angle_between(&uvec, &s.uvec());
                        (distance <= config.max_distance_rad)
                            .then(|| DistanceRecord::new(star.id, s.id, star.mag, s.mag, distance))
                    })
            })
            .collect();

        records.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.star_a.cmp(&b.star_a))
                .then(a.star_b.cmp(&b.star_b))
        });

        let table = Self::from_records(records);
        info!(
            "Distance table complete: {} pairs over {} stars",
            table.len(),
            table.num_stars()
        );
        table
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of distinct stars referenced by the table.
    pub fn num_stars(&self) -> usize {
        self.weights.len()
    }

    pub fn records(&self) -> &[DistanceRecord] {
        &self.records
    }

    /// Contiguous slice of records with `lo <= distance <= hi`.
    pub fn records_with_distance_in(&self, lo: f64, hi: f64) -> &[DistanceRecord] {
        let start = self.records.partition_point(|r| r.distance < lo);
        let end = self.records.partition_point(|r| r.distance <= hi);
        if start >= end {
            return &[];
        }
        &self.records[start..end]
    }

    /// Number of records a star appears in (either column); zero if absent.
    pub fn vote_weight(&self, id: u64) -> u32 {
        self.weights.get(&id).copied().unwrap_or(0)
    }

    // ── CSV ─────────────────────────────────────────────────────────────────

    /// Load a CSV table with header `HIP1,HIP2,Vmag1,Vmag2,distance`.
    ///
    /// Columns are located by name, so extra columns (such as a leading index)
    /// are ignored.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("opening distance table {}", path.display()))?;
        let records =
            read_records(rdr).with_context(|| format!("reading distance table {}", path.display()))?;
        let table = Self::from_records(records);
        info!(
            "Loaded distance table {}: {} pairs over {} stars",
            path.display(),
            table.len(),
            table.num_stars()
        );
        Ok(table)
    }

    /// Write the table as CSV in the format read by [`DistanceTable::load_csv`].
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating distance table {}", path.display()))?;
        wtr.write_record(COLUMNS)?;
        for r in &self.records {
            wtr.write_record([
                r.star_a.to_string(),
                r.star_b.to_string(),
                r.mag_a.to_string(),
                r.mag_b.to_string(),
                r.distance.to_string(),
            ])?;
        }
        wtr.flush()?;
        info!("Wrote {} pairs to {}", self.len(), path.display());
        Ok(())
    }

    // ── Serialization ───────────────────────────────────────────────────────

    /// Serialize the records to bytes using rkyv.
    pub fn to_rkyv_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&self.records)
            .map_err(|e| anyhow::anyhow!("rkyv serialization failed: {}", e))?;
        Ok(bytes.to_vec())
    }

    /// Save the table to a file using rkyv.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = self.to_rkyv_bytes()?;
        std::fs::write(path, &bytes)
            .with_context(|| format!("writing distance table {}", path.display()))?;
        info!("Saved distance table to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Load a table from an rkyv file. The vote-weight index is rebuilt.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading distance table {}", path.display()))?;
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(&bytes);
        let records = rkyv::from_bytes::<Vec<DistanceRecord>, rkyv::rancor::Error>(&aligned)
            .map_err(|e| anyhow::anyhow!("rkyv deserialization failed: {}", e))?;
        let table = Self::from_records(records);
        info!(
            "Loaded distance table {}: {} pairs over {} stars",
            path.display(),
            table.len(),
            table.num_stars()
        );
        Ok(table)
    }

    /// Load a table, choosing the format by extension (`.rkyv` or CSV).
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if is_rkyv_path(path.as_ref()) {
            Self::load_from_file(path)
        } else {
            Self::load_csv(path)
        }
    }

    /// Save a table, choosing the format by extension (`.rkyv` or CSV).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        if is_rkyv_path(path.as_ref()) {
            self.save_to_file(path)
        } else {
            self.write_csv(path)
        }
    }
}

const COLUMNS: [&str; 5] = ["HIP1", "HIP2", "Vmag1", "Vmag2", "distance"];

fn is_rkyv_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("rkyv"))
}

fn read_records<R: std::io::Read>(mut rdr: csv::Reader<R>) -> anyhow::Result<Vec<DistanceRecord>> {
    let headers = rdr.headers()?.clone();
    let mut cols = [0usize; 5];
    for (slot, name) in cols.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("missing column {name:?}"))?;
    }

    rdr.records()
        .enumerate()
        .map(|(row, result)| -> anyhow::Result<DistanceRecord> {
            let record = result?;
            let raw = |col: usize| record.get(cols[col]).unwrap_or("");
            let id = |col: usize| -> anyhow::Result<u64> {
                // Ids written by float-typed tools come out as "1234.0".
                let s = raw(col);
                s.parse::<u64>().or_else(|_| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|v| v.fract() == 0.0 && *v >= 0.0)
                        .map(|v| v as u64)
                        .with_context(|| format!("row {}: bad star id {s:?}", row + 1))
                })
            };
            let value = |col: usize| -> anyhow::Result<f64> {
                let s = raw(col);
                s.parse()
                    .with_context(|| format!("row {}: bad {} value {s:?}", row + 1, COLUMNS[col]))
            };
            Ok(DistanceRecord::new(
                id(0)?,
                id(1)?,
                value(2)?,
                value(3)?,
                value(4)?,
            ))
        })
        .collect()
}
