//! Candidate filtering: which catalog pairs could explain each detection pair.

use std::collections::HashSet;

use crate::{DistanceTable, Scene};

/// Distance and magnitude tolerances for one filtering round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Angular distance tolerance, radians.
    pub dist_error: f64,
    /// Magnitude tolerance.
    pub mag_error: f64,
}

impl Tolerances {
    pub fn new(dist_error: f64, mag_error: f64) -> Self {
        Self {
            dist_error,
            mag_error,
        }
    }

    /// Widen both tolerances by their multiplication factors.
    pub fn relax(&mut self, dist_mult_factor: f64, mag_mult_factor: f64) {
        self.dist_error *= dist_mult_factor;
        self.mag_error *= mag_mult_factor;
    }
}

/// A catalog pair `(star_a, star_b)` compatible with a detection and its `partner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub star_a: u64,
    pub star_b: u64,
    /// Index of the other detection of the pair.
    pub partner: usize,
}

impl Candidate {
    pub fn new(star_a: u64, star_b: u64, partner: usize) -> Self {
        Self {
            star_a,
            star_b,
            partner,
        }
    }

    pub fn involves(&self, id: u64) -> bool {
        self.star_a == id || self.star_b == id
    }

    /// The catalog id paired with `id`, if `id` is part of this candidate.
    pub fn other(&self, id: u64) -> Option<u64> {
        if self.star_a == id {
            Some(self.star_b)
        } else if self.star_b == id {
            Some(self.star_a)
        } else {
            None
        }
    }
}

/// Candidate lists for every detection of a scene.
#[derive(Debug, Clone, Default)]
pub struct CandidateLists {
    lists: Vec<Vec<Candidate>>,
    members: Vec<HashSet<Candidate>>,
}

impl CandidateLists {
    fn with_len(n: usize) -> Self {
        Self {
            lists: vec![Vec::new(); n],
            members: vec![HashSet::new(); n],
        }
    }

    fn push(&mut self, detection: usize, candidate: Candidate) {
        if self.members[detection].insert(candidate) {
            self.lists[detection].push(candidate);
        }
    }

    /// Number of detections covered.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Candidates of one detection, in filtering order.
    pub fn of(&self, detection: usize) -> &[Candidate] {
        &self.lists[detection]
    }

    /// Whether `detection` holds exactly this candidate.
    pub fn contains(&self, detection: usize, candidate: &Candidate) -> bool {
        self.members[detection].contains(candidate)
    }

    /// Total number of candidates over all detections.
    pub fn total(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }
}

/// `x ~ m`: strictly within `tolerance` of `m`.
fn mag_close(x: f64, m: f64, tolerance: f64) -> bool {
    m - tolerance < x && x < m + tolerance
}

/// Build the candidate lists of a scene for the given tolerances.
///
/// For every detection pair `(i, j)` with `i < j`, each table record whose
/// distance lies within `dist_error` of the measured distance and whose
/// magnitudes match the detections in either order is added to both
/// detections' lists.
pub fn filter_candidates(scene: &Scene, table: &DistanceTable, tol: &Tolerances) -> CandidateLists {
    let n = scene.len();
    let mut lists = CandidateLists::with_len(n);

    for i in 0..n {
        let mag_i = scene.magnitude(i);
        for j in (i + 1)..n {
            let mag_j = scene.magnitude(j);
            let d = scene.distance(i, j);
            for r in table.records_with_distance_in(d - tol.dist_error, d + tol.dist_error) {
                let forward = mag_close(mag_i, r.mag_a, tol.mag_error)
                    && mag_close(mag_j, r.mag_b, tol.mag_error);
                let reverse = mag_close(mag_j, r.mag_a, tol.mag_error)
                    && mag_close(mag_i, r.mag_b, tol.mag_error);
                if forward || reverse {
                    lists.push(i, Candidate::new(r.star_a, r.star_b, j));
                    lists.push(j, Candidate::new(r.star_a, r.star_b, i));
                }
            }
        }
    }

    lists
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraModel, Projection};
    use crate::distance_table::DistanceRecord;
    use crate::Detection;

    fn camera() -> CameraModel {
        CameraModel::from_fov(Projection::Rectilinear, 10.0_f64.to_radians(), (1920, 1440))
    }

    /// Two detections and a table built around their measured distance.
    fn pair_scene(mag_0: f64, mag_1: f64) -> Scene {
        Scene::from_detections(
            vec![
                Detection::new(960.0, 720.0, mag_0),
                Detection::new(1060.0, 720.0, mag_1),
            ],
            &camera(),
        )
    }

    #[test]
    fn magnitudes_match_in_either_order() {
        let scene = pair_scene(2.0, 3.0);
        let d = scene.distance(0, 1);
        let table = DistanceTable::from_records(vec![
            // Forward order
            DistanceRecord::new(1, 2, 2.0, 3.0, d),
            // Reverse order: star 3 is the fainter one
            DistanceRecord::new(3, 4, 3.0, 2.0, d),
            // Magnitudes off
            DistanceRecord::new(5, 6, 2.0, 4.0, d),
            // Distance off
            DistanceRecord::new(7, 8, 2.0, 3.0, d + 0.01),
        ]);
        let lists = filter_candidates(&scene, &table, &Tolerances::new(1e-4, 0.04));

        assert_eq!(lists.of(0), &[Candidate::new(1, 2, 1), Candidate::new(3, 4, 1)]);
        assert_eq!(lists.of(1), &[Candidate::new(1, 2, 0), Candidate::new(3, 4, 0)]);
        assert!(lists.contains(0, &Candidate::new(3, 4, 1)));
        assert!(!lists.contains(0, &Candidate::new(5, 6, 1)));
        assert_eq!(lists.total(), 4);
    }

    #[test]
    fn magnitude_tolerance_is_strict() {
        let scene = pair_scene(2.0, 3.0);
        let d = scene.distance(0, 1);
        let table = DistanceTable::from_records(vec![DistanceRecord::new(1, 2, 2.5, 3.0, d)]);
        let strict = filter_candidates(&scene, &table, &Tolerances::new(1e-4, 0.5));
        assert!(strict.of(0).is_empty());
        let wider = filter_candidates(&scene, &table, &Tolerances::new(1e-4, 0.5001));
        assert_eq!(wider.of(0).len(), 1);
    }

    #[test]
    fn relaxing_widens_both_tolerances() {
        let mut tol = Tolerances::new(3e-4, 0.04);
        tol.relax(1.5, 2.0);
        assert!((tol.dist_error - 4.5e-4).abs() < 1e-15);
        assert!((tol.mag_error - 0.08).abs() < 1e-15);
    }

    #[test]
    fn candidate_other_id() {
        let c = Candidate::new(10, 20, 3);
        assert_eq!(c.other(10), Some(20));
        assert_eq!(c.other(20), Some(10));
        assert_eq!(c.other(30), None);
        assert!(c.involves(20));
        assert!(!c.involves(30));
    }
}
