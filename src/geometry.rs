//! Rotation and spherical-geometry primitives.
//!
//! Conventions used throughout the crate:
//!
//! - Directions are given as (azimuth, altitude) pairs in radians. Catalog
//!   positions use the same convention with RA as azimuth and Dec as altitude.
//! - The matching unit vector is `(cos alt · cos az, cos alt · sin az, sin alt)`,
//!   so altitude `π/2` is `+Z`.
//! - Rotations are right-handed.

use std::f64::consts::FRAC_PI_2;

use crate::{Matrix3, Vector3};

// ── Rotations ───────────────────────────────────────────────────────────────

/// Rotation matrix for a right-hand rotation of `angle` radians about `axis`.
///
/// Rodrigues' formula: `R = I·cosθ + sinθ·[axis]× + (1 − cosθ)·axis·axisᵀ`.
///
/// `axis` must be unit length; it is not normalized here.
pub fn rotate(axis: &Vector3, angle: f64) -> Matrix3 {
    let (sin_t, cos_t) = angle.sin_cos();
    Matrix3::identity() * cos_t + axis.cross_matrix() * sin_t + axis * axis.transpose() * (1.0 - cos_t)
}

/// Derivative of [`rotate`] with respect to `angle`.
///
/// `dR/dθ = −sinθ·I + cosθ·[axis]× + sinθ·axis·axisᵀ`. Same precondition on `axis`.
pub fn rotate_der(axis: &Vector3, angle: f64) -> Matrix3 {
    let (sin_t, cos_t) = angle.sin_cos();
    Matrix3::identity() * -sin_t + axis.cross_matrix() * cos_t + axis * axis.transpose() * sin_t
}

/// A proper rotation that maps `dir` onto `+Z`.
///
/// The remaining roll is fixed by keeping celestial north (`+Z`) in the
/// `y-z` half plane of the rotated frame; when `dir` is (anti)parallel to
/// `+Z` the `+X` axis is used as the reference instead.
pub fn look_at(dir: &Vector3) -> Matrix3 {
    let z = dir.normalize();
    let reference = if z.z.abs() > 1.0 - 1e-9 {
        Vector3::x()
    } else {
        Vector3::z()
    };
    let x = reference.cross(&z).normalize();
    let y = z.cross(&x);
    Matrix3::from_rows(&[x.transpose(), y.transpose(), z.transpose()])
}

// ── Directions ──────────────────────────────────────────────────────────────

/// Unit vector for an (azimuth, altitude) direction.
#[inline]
pub fn angles_to_vector(az: f64, alt: f64) -> Vector3 {
    let (sin_az, cos_az) = az.sin_cos();
    let (sin_alt, cos_alt) = alt.sin_cos();
    Vector3::new(cos_alt * cos_az, cos_alt * sin_az, sin_alt)
}

/// (azimuth, altitude) of a non-zero vector. Azimuth is in `(−π, π]`.
#[inline]
pub fn vector_to_angles(v: &Vector3) -> (f64, f64) {
    let n = v.norm();
    let az = v.y.atan2(v.x);
    let alt = (v.z / n).clamp(-1.0, 1.0).asin();
    (az, alt)
}

/// Angular distance between two directions on the sphere (spherical law of cosines).
///
/// Inputs are finite angles in radians; the result is in `[0, π]`.
pub fn angular_distance(az1: f64, alt1: f64, az2: f64, alt2: f64) -> f64 {
    let zenith1 = FRAC_PI_2 - alt1;
    let zenith2 = FRAC_PI_2 - alt2;
    let cos_d = zenith1.cos() * zenith2.cos() + zenith1.sin() * zenith2.sin() * (az1 - az2).cos();
    cos_d.clamp(-1.0, 1.0).acos()
}

/// Angle between two unit vectors, accurate for small separations.
#[inline]
pub fn angle_between(a: &Vector3, b: &Vector3) -> f64 {
    a.cross(b).norm().atan2(a.dot(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::{PI, TAU};

    fn random_axis(rng: &mut StdRng) -> Vector3 {
        loop {
            let v = Vector3::new(
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            );
            if v.norm() > 1e-3 {
                return v.normalize();
            }
        }
    }

    #[test]
    fn rotation_is_orthogonal_with_unit_determinant() {
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            let axis = random_axis(&mut rng);
            let angle = rng.random_range(-TAU..TAU);
            let r = rotate(&axis, angle);
            let err = (r.transpose() * r - Matrix3::identity()).abs().max();
            assert!(err < 1e-12, "RᵀR deviates from I by {err}");
            assert!((r.determinant() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn rotation_fixes_axis_and_turns_right_handed() {
        let axis = Vector3::z();
        let r = rotate(&axis, PI / 2.0);
        assert!((r * axis - axis).norm() < 1e-15);
        // +X goes to +Y for a positive quarter turn about +Z
        assert!((r * Vector3::x() - Vector3::y()).norm() < 1e-15);
    }

    #[test]
    fn derivative_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(99);
        let h = 1e-6;
        for _ in 0..100 {
            let axis = random_axis(&mut rng);
            let angle = rng.random_range(0.0..TAU);
            let numeric = (rotate(&axis, angle + h) - rotate(&axis, angle - h)) / (2.0 * h);
            let err = (numeric - rotate_der(&axis, angle)).abs().max();
            assert!(err < 1e-8, "derivative mismatch {err}");
        }
    }

    #[test]
    fn angular_distance_properties() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let (az1, al1) = (rng.random_range(-PI..PI), rng.random_range(-PI / 2.0..PI / 2.0));
            let (az2, al2) = (rng.random_range(-PI..PI), rng.random_range(-PI / 2.0..PI / 2.0));
            let d12 = angular_distance(az1, al1, az2, al2);
            let d21 = angular_distance(az2, al2, az1, al1);
            assert_eq!(d12, d21);
            assert!((0.0..=PI).contains(&d12));
            assert!(angular_distance(az1, al1, az1, al1) < 1e-7);

            let by_vectors = angle_between(&angles_to_vector(az1, al1), &angles_to_vector(az2, al2));
            assert!((d12 - by_vectors).abs() < 1e-7);
        }
    }

    #[test]
    fn vector_angles_roundtrip() {
        let v = angles_to_vector(1.2, -0.4);
        let (az, alt) = vector_to_angles(&(v * 3.0));
        assert!((az - 1.2).abs() < 1e-12);
        assert!((alt + 0.4).abs() < 1e-12);
    }

    #[test]
    fn look_at_aligns_direction_with_z() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..50 {
            let dir = random_axis(&mut rng);
            let m = look_at(&dir);
            assert!((m * dir - Vector3::z()).norm() < 1e-12);
            assert!((m.determinant() - 1.0).abs() < 1e-12);
        }
        let m = look_at(&Vector3::z());
        assert!((m * Vector3::z() - Vector3::z()).norm() < 1e-12);
    }
}
