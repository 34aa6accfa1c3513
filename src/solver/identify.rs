//! Identification control loop.
//!
//! 1. Filter candidates at the current tolerances and rank votes.
//! 2. For each triangle of the breadth-first search:
//!    a. Solve the orientation implied by the triangle.
//!    b. Verify it against the scene; accept on success.
//! 3. A round without a match widens the tolerances and starts over, keeping
//!    the set of triangles already tried.
//!
//! The run ends at the first verified match, when the triangle budget is
//! spent, after `max_rounds` rounds, or on timeout.

use std::time::Instant;

use tracing::debug;

use crate::{Scene, SceneError};

use super::filter::{filter_candidates, Tolerances};
use super::orientation::{find_orientation, OrientationFit};
use super::triangle::{StarTriangle, TriangleSearch, TriedTriangles};
use super::verify::{verify, Verification};
use super::votes::rank_all;
use super::{IdentifyResult, IdentifyStatus, Nvida, RoundStats};

// ── Identify entry points ───────────────────────────────────────────────────

impl Nvida<'_> {
    /// Parse one scene line and identify it.
    pub fn identify_line(&self, line: &str) -> Result<IdentifyResult, SceneError> {
        let scene = Scene::parse(line, self.camera)?;
        Ok(self.identify_stars(&scene))
    }

    /// Identify the detections of a scene.
    ///
    /// Returns `MatchFound` with per-detection ids and the orientation, or a
    /// failure status with every detection unidentified.
    pub fn identify_stars(&self, scene: &Scene) -> IdentifyResult {
        let t0 = Instant::now();
        let config = &self.config;
        let n = scene.len();

        if n < 3 {
            debug!("Only {} detections; need at least 3", n);
            return IdentifyResult::failure(IdentifyStatus::TooFew, n, 0, Vec::new(), elapsed_ms(t0));
        }

        let mut tol = Tolerances::new(config.dist_error, config.mag_error);
        let mut tried = TriedTriangles::new();
        let mut rounds: Vec<RoundStats> = Vec::new();

        for round in 0..config.max_rounds {
            if tried.len() >= config.max_num_triangles {
                break;
            }
            if self.timed_out(t0) {
                debug!("Timeout after {:.1}ms", elapsed_ms(t0));
                return IdentifyResult::failure(IdentifyStatus::Timeout, n, tried.len(), rounds, elapsed_ms(t0));
            }

            let lists = filter_candidates(scene, self.table, &tol);
            let votes = rank_all(&lists, self.table);
            let mut stats = RoundStats {
                dist_error: tol.dist_error,
                mag_error: tol.mag_error,
                candidates: lists.total(),
                triangles: 0,
            };
            debug!(
                "Round {}: dist_error={:.3e}, mag_error={:.4}, {} candidates",
                round, tol.dist_error, tol.mag_error, stats.candidates
            );

            let mut search = TriangleSearch::new(&lists, &votes, &mut tried);
            while let Some(triangle) = search.next() {
                stats.triangles += 1;

                if let Some((fit, verification)) = self.evaluate(scene, &triangle) {
                    debug!(
                        "Triangle {:?} (depth {}): {} identified, {} projected",
                        triangle.stars,
                        search.depth(),
                        verification.identified(),
                        verification.projected
                    );
                    if verification.accepted {
                        let num_triangles = search.tried_len();
                        rounds.push(stats);
                        debug!(
                            "MATCH: {} of {} detections after {} triangles",
                            verification.identified(),
                            n,
                            num_triangles
                        );
                        return IdentifyResult {
                            status: IdentifyStatus::MatchFound,
                            ids: verification.ids(),
                            orientation: Some(fit.matrix),
                            triangle: Some(triangle),
                            theta: Some(fit.theta),
                            num_triangles,
                            rounds,
                            solve_time_ms: elapsed_ms(t0),
                        };
                    }
                }

                if search.tried_len() >= config.max_num_triangles {
                    debug!("Triangle budget of {} spent", config.max_num_triangles);
                    break;
                }
                if self.timed_out(t0) {
                    let num_triangles = search.tried_len();
                    rounds.push(stats);
                    debug!("Timeout after {:.1}ms", elapsed_ms(t0));
                    return IdentifyResult::failure(IdentifyStatus::Timeout, n, num_triangles, rounds, elapsed_ms(t0));
                }
            }

            rounds.push(stats);
            tol.relax(config.dist_mult_factor, config.mag_mult_factor);
        }

        IdentifyResult::failure(IdentifyStatus::NoMatch, n, tried.len(), rounds, elapsed_ms(t0))
    }

    /// Orientation and verification of one triangle; `None` if the triangle
    /// references stars missing from the catalog.
    fn evaluate(&self, scene: &Scene, triangle: &StarTriangle) -> Option<(OrientationFit, Verification)> {
        let fit = find_orientation(
            triangle,
            scene,
            self.catalog,
            self.camera,
            &self.config.gradient_descent,
        )?;
        let center = self.catalog.get(triangle.stars[fit.centered])?.uvec();
        let verification = verify(
            scene,
            self.catalog,
            self.camera,
            &fit.matrix,
            center,
            triangle.detections[fit.centered],
            &self.config.verify,
        );
        Some((fit, verification))
    }

    fn timed_out(&self, t0: Instant) -> bool {
        self.config
            .solve_timeout_ms
            .is_some_and(|t| elapsed_ms(t0) >= t as f32)
    }
}

fn elapsed_ms(t0: Instant) -> f32 {
    t0.elapsed().as_secs_f32() * 1000.0
}
