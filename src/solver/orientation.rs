//! Orientation from a star triangle.
//!
//! The centered star fixes the boresight: an initial rotation `O2` maps its
//! catalog vector exactly onto the camera vector of its detection. The only
//! remaining freedom is a roll `θ` about that vector, found by gradient
//! descent on
//!
//! ```text
//! J(θ) = (1 − v1_cam · R(u′, θ) O2 v1) + (1 − v2_cam · R(u′, θ) O2 v2),   u′ = O2 u
//! ```
//!
//! using the closed-form derivative of the Rodrigues rotation.

use std::f64::consts::{FRAC_PI_2, TAU};

use tracing::{debug, warn};

use crate::camera::Camera;
use crate::geometry::{angles_to_vector, look_at, rotate, rotate_der};
use crate::{Matrix3, Scene, StarCatalog, Vector3};

use super::triangle::StarTriangle;

/// Number of equally spaced roll angles evaluated for the initial guess.
const INITIAL_GUESSES: usize = 5;

/// Iterations after which the learning rate is halved.
const LEARNING_RATE_HALVINGS: [usize; 3] = [250, 500, 1000];

/// Gradient descent parameters for the roll angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientDescent {
    /// Convergence threshold on the change of `θ` between iterations, radians.
    pub error: f64,
    pub max_iterations: usize,
    /// Initial step size.
    pub learning_rate: f64,
}

impl Default for GradientDescent {
    fn default() -> Self {
        Self {
            error: 1e-5,
            max_iterations: 1500,
            learning_rate: 35.0,
        }
    }
}

/// Outcome of a roll-angle optimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThetaSolution {
    pub theta: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl GradientDescent {
    /// Find the roll `θ` about `axis` that best aligns `targets[k]` with
    /// `R(axis, θ) · sources[k]`.
    ///
    /// `axis` must be unit length. Non-convergence is not an error: the last
    /// iterate is returned with `converged == false`.
    pub fn solve(&self, axis: &Vector3, sources: [Vector3; 2], targets: [Vector3; 2]) -> ThetaSolution {
        let cost = |theta: f64| -> f64 {
            let r = rotate(axis, theta);
            sources
                .iter()
                .zip(&targets)
                .map(|(s, t)| 1.0 - t.dot(&(r * s)))
                .sum()
        };

        let mut theta = (0..INITIAL_GUESSES)
            .map(|k| TAU * k as f64 / INITIAL_GUESSES as f64)
            .map(|t| (t, cost(t)))
            .fold((0.0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
            .0;

        let mut eta = self.learning_rate;
        let mut iterations = 0;
        let mut converged = false;
        while !converged && iterations < self.max_iterations {
            iterations += 1;
            let dr = rotate_der(axis, theta);
            // -dJ/dθ
            let descent: f64 = sources
                .iter()
                .zip(&targets)
                .map(|(s, t)| t.dot(&(dr * s)))
                .sum();
            let new_theta = theta + eta * descent;

            if LEARNING_RATE_HALVINGS.contains(&iterations) {
                eta /= 2.0;
            }
            converged = (new_theta - theta).abs() < self.error;
            theta = new_theta;
        }

        if !converged {
            debug!(
                "Roll angle did not converge after {} iterations (θ = {:.6})",
                iterations, theta
            );
        }

        ThetaSolution {
            theta,
            iterations,
            converged,
        }
    }
}

/// Camera orientation hypothesized from one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationFit {
    /// Rotation mapping celestial unit vectors into the camera frame.
    pub matrix: Matrix3,
    /// Vertex position (0..3) of the centered star within the triangle.
    pub centered: usize,
    pub theta: ThetaSolution,
}

/// Initial alignment: a rotation taking celestial `u` onto the camera-frame
/// direction `(az0, alt0)`.
pub fn initial_alignment(u: &Vector3, az0: f64, alt0: f64) -> Matrix3 {
    let axis = Vector3::new(az0.sin(), -az0.cos(), 0.0);
    rotate(&axis, -(FRAC_PI_2 - alt0)) * look_at(u)
}

/// Solve the orientation implied by a triangle.
///
/// Returns `None`, with a warning, if a vertex id is missing from the catalog.
pub fn find_orientation(
    triangle: &StarTriangle,
    scene: &Scene,
    catalog: &StarCatalog,
    camera: &dyn Camera,
    descent: &GradientDescent,
) -> Option<OrientationFit> {
    let mut celestial = [Vector3::zeros(); 3];
    for (v, &id) in celestial.iter_mut().zip(&triangle.stars) {
        match catalog.get(id) {
            Some(star) => *v = star.uvec(),
            None => {
                warn!("Star {} of triangle {:?} is not in the catalog; skipping", id, triangle.stars);
                return None;
            }
        }
    }

    let centered = triangle.centered_vertex(scene, camera);
    let [l1, l2] = StarTriangle::left_vertices(centered);
    let camera_vec = |k: usize| {
        let (az, alt) = scene.angles(triangle.detections[k]);
        angles_to_vector(az, alt)
    };

    let (az0, alt0) = scene.angles(triangle.detections[centered]);
    let o2 = initial_alignment(&celestial[centered], az0, alt0);
    let axis = (o2 * celestial[centered]).normalize();

    let theta = descent.solve(
        &axis,
        [o2 * celestial[l1], o2 * celestial[l2]],
        [camera_vec(l1), camera_vec(l2)],
    );

    Some(OrientationFit {
        matrix: rotate(&axis, theta.theta) * o2,
        centered,
        theta,
    })
}
