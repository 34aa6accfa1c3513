//! Breadth-first triangle search.
//!
//! Yields hypothesized correspondences of three detections with three catalog
//! stars. Depth `L` of the search tries every still-active detection's `L`-th
//! best voted id as the first vertex, then closes triangles through the
//! candidate lists. Shallow depths involve the most strongly voted ids, so the
//! likeliest triangles come first.
//!
//! Implementation: a lazy iterator with a pending queue; the tried-triangle
//! set is shared with the caller and grows as triangles are yielded.

use std::collections::{HashSet, VecDeque};

use crate::camera::Camera;
use crate::Scene;

use super::filter::{Candidate, CandidateLists};
use super::votes::Vote;

/// Three detections paired 1:1 with three catalog ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarTriangle {
    /// Detection indices.
    pub detections: [usize; 3],
    /// Catalog ids, `stars[k]` is hypothesized for `detections[k]`.
    pub stars: [u64; 3],
}

impl StarTriangle {
    pub fn new(detections: [usize; 3], stars: [u64; 3]) -> Self {
        Self { detections, stars }
    }

    /// Unordered key of the catalog ids.
    pub fn key(&self) -> [u64; 3] {
        let mut key = self.stars;
        key.sort_unstable();
        key
    }

    /// Vertex position (0..3) whose detection is nearest the image center.
    /// The first vertex wins ties.
    pub fn centered_vertex(&self, scene: &Scene, camera: &dyn Camera) -> usize {
        let (cx, cy) = camera.image_center();
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (k, &d) in self.detections.iter().enumerate() {
            let dist = scene.detection(d).pixel_distance(cx, cy);
            if dist < best_dist {
                best = k;
                best_dist = dist;
            }
        }
        best
    }

    /// The two vertex positions other than `centered`, in triangle order.
    pub fn left_vertices(centered: usize) -> [usize; 2] {
        match centered {
            0 => [1, 2],
            1 => [0, 2],
            _ => [0, 1],
        }
    }
}

/// Catalog-id triples already evaluated in one identification run.
#[derive(Debug, Clone, Default)]
pub struct TriedTriangles {
    set: HashSet<[u64; 3]>,
}

impl TriedTriangles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a triangle; returns `false` if its ids were already tried.
    pub fn insert(&mut self, triangle: &StarTriangle) -> bool {
        self.set.insert(triangle.key())
    }

    pub fn contains(&self, triangle: &StarTriangle) -> bool {
        self.set.contains(&triangle.key())
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

/// Lazy breadth-first triangle iterator over one round's candidate lists.
pub struct TriangleSearch<'a> {
    lists: &'a CandidateLists,
    votes: &'a [Vec<Vote>],
    tried: &'a mut TriedTriangles,
    depth: usize,
    active: Vec<usize>,
    cursor: usize,
    survivors: Vec<usize>,
    pending: VecDeque<StarTriangle>,
}

impl<'a> TriangleSearch<'a> {
    /// Start a search. `votes[d]` must be the ranked votes of `lists.of(d)`.
    pub fn new(
        lists: &'a CandidateLists,
        votes: &'a [Vec<Vote>],
        tried: &'a mut TriedTriangles,
    ) -> Self {
        Self {
            lists,
            votes,
            tried,
            depth: 0,
            active: (0..votes.len()).collect(),
            cursor: 0,
            survivors: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    /// Current search depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of distinct triangles tried so far in the run.
    pub fn tried_len(&self) -> usize {
        self.tried.len()
    }

    /// Queue every triangle closing through `d1` hypothesized as `h1`.
    fn expand(&mut self, d1: usize, h1: u64) {
        let lists = self.lists;
        for c1 in lists.of(d1) {
            let Some(h2) = c1.other(h1) else { continue };
            let d2 = c1.partner;
            for c2 in lists.of(d2) {
                if c2.involves(h1) {
                    continue;
                }
                let Some(h3) = c2.other(h2) else { continue };
                let d3 = c2.partner;
                let closing = Candidate::new(h1.min(h3), h1.max(h3), d1);
                if lists.contains(d3, &closing) {
                    self.pending
                        .push_back(StarTriangle::new([d1, d2, d3], [h1, h2, h3]));
                }
            }
        }
    }
}

impl Iterator for TriangleSearch<'_> {
    type Item = StarTriangle;

    fn next(&mut self) -> Option<StarTriangle> {
        loop {
            while let Some(triangle) = self.pending.pop_front() {
                if self.tried.insert(&triangle) {
                    return Some(triangle);
                }
            }

            if self.cursor == self.active.len() {
                // Depth exhausted: continue with the detections that survived it.
                self.active = std::mem::take(&mut self.survivors);
                self.cursor = 0;
                self.depth += 1;
                if self.active.is_empty() {
                    return None;
                }
            }

            let d1 = self.active[self.cursor];
            self.cursor += 1;
            match self.votes[d1].get(self.depth).copied() {
                Some(vote) if vote.count > 1 => {
                    self.survivors.push(d1);
                    self.expand(d1, vote.id);
                }
                // No id at this depth, or too weakly voted: drop d1.
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraModel, Projection};
    use crate::distance_table::{DistanceRecord, DistanceTable};
    use crate::solver::filter::{filter_candidates, Tolerances};
    use crate::solver::votes::rank_all;
    use crate::Detection;

    fn camera() -> CameraModel {
        CameraModel::from_fov(Projection::Rectilinear, 10.0_f64.to_radians(), (1920, 1440))
    }

    /// A 3-detection scene and a table containing the matching catalog triangle
    /// (ids 10, 20, 30) plus a decoy pair.
    fn fixture() -> (Scene, DistanceTable) {
        let scene = Scene::from_detections(
            vec![
                Detection::new(960.0, 720.0, 2.0),
                Detection::new(1100.0, 700.0, 2.5),
                Detection::new(900.0, 800.0, 3.0),
            ],
            &camera(),
        );
        let table = DistanceTable::from_records(vec![
            DistanceRecord::new(10, 20, 2.0, 2.5, scene.distance(0, 1)),
            DistanceRecord::new(10, 30, 2.0, 3.0, scene.distance(0, 2)),
            DistanceRecord::new(20, 30, 2.5, 3.0, scene.distance(1, 2)),
            DistanceRecord::new(40, 50, 2.0, 2.5, scene.distance(0, 1)),
        ]);
        (scene, table)
    }

    #[test]
    fn finds_the_seeded_triangle_once() {
        let (scene, table) = fixture();
        let lists = filter_candidates(&scene, &table, &Tolerances::new(1e-6, 0.01));
        let votes = rank_all(&lists, &table);
        let mut tried = TriedTriangles::new();

        let triangles: Vec<StarTriangle> =
            TriangleSearch::new(&lists, &votes, &mut tried).collect();
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].key(), [10, 20, 30]);
        // Detection k is hypothesized as the matching id
        for (d, id) in triangles[0].detections.iter().zip(triangles[0].stars) {
            assert_eq!(id, [10, 20, 30][*d]);
        }
        assert_eq!(tried.len(), 1);
    }

    #[test]
    fn tried_triangles_are_not_repeated() {
        let (scene, table) = fixture();
        let lists = filter_candidates(&scene, &table, &Tolerances::new(1e-6, 0.01));
        let votes = rank_all(&lists, &table);
        let mut tried = TriedTriangles::new();

        let first = TriangleSearch::new(&lists, &votes, &mut tried).count();
        let again = TriangleSearch::new(&lists, &votes, &mut tried).count();
        assert_eq!(first, 1);
        assert_eq!(again, 0);
        assert_eq!(tried.len(), 1);
    }

    #[test]
    fn single_votes_do_not_start_triangles() {
        let (scene, table) = fixture();
        let lists = filter_candidates(&scene, &table, &Tolerances::new(1e-6, 0.01));
        let mut votes = rank_all(&lists, &table);
        for v in votes.iter_mut().flatten() {
            v.count = 1;
        }
        let mut tried = TriedTriangles::new();
        let mut search = TriangleSearch::new(&lists, &votes, &mut tried);
        assert!(search.next().is_none());
        assert_eq!(search.tried_len(), 0);
    }

    #[test]
    fn centered_vertex_prefers_image_center() {
        let (scene, _) = fixture();
        let cam = camera();
        let t = StarTriangle::new([1, 0, 2], [20, 10, 30]);
        assert_eq!(t.centered_vertex(&scene, &cam), 1);
        assert_eq!(StarTriangle::left_vertices(1), [0, 2]);
        assert_eq!(StarTriangle::left_vertices(2), [0, 1]);
    }
}
