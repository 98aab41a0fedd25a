//! Small geometric helpers shared by the narrow phase and the solver.
//!
//! Vector, quaternion and matrix types are nalgebra's; this module only adds
//! the handful of operations the engine needs on top of them.

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

/// 3-component `f32` vector.
pub type Vec3 = Vector3<f32>;
/// Unit quaternion used for orientations.
pub type Quat = UnitQuaternion<f32>;
/// 3×3 `f32` matrix (inertia tensors, effective-mass matrices).
pub type Mat3 = Matrix3<f32>;

/// Threshold under which `1 - |n·X|` counts as "parallel to X" when picking a
/// tangent direction.
const PARALLEL_EPSILON: f32 = 1.0e-4;

/// Squared length under which a segment is treated as a point.
const DEGENERATE_SEGMENT_SQ: f32 = 1.0e-6;

/// Cross-product matrix of `v`, such that `skew(a) * b == a.cross(&b)`.
#[inline]
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(
        0.0, -v.z, v.y, //
        v.z, 0.0, -v.x, //
        -v.y, v.x, 0.0,
    )
}

/// Build an orthonormal tangent frame `(tangent, bitangent)` around a unit
/// normal.
///
/// The tangent is `normalize(n × X)` unless the normal is (nearly) parallel to
/// world X, in which case world Y is crossed instead.
pub fn tangent_basis(normal: &Vec3) -> (Vec3, Vec3) {
    let reference = if 1.0 - normal.dot(&Vec3::x()).abs() < PARALLEL_EPSILON {
        Vec3::y()
    } else {
        Vec3::x()
    };
    let tangent = normal.cross(&reference).normalize();
    let bitangent = normal.cross(&tangent);
    (tangent, bitangent)
}

/// Integrate an orientation by an angular velocity over `dt` seconds.
///
/// First-order update `q' = q + ½·dt·(0, ω)·q`, renormalized to counteract
/// drift.
pub fn integrate_rotation(rotation: &Quat, angular_velocity: &Vec3, dt: f32) -> Quat {
    let half_dt = 0.5 * dt;
    let dq = Quaternion::new(
        0.0,
        angular_velocity.x * half_dt,
        angular_velocity.y * half_dt,
        angular_velocity.z * half_dt,
    );
    let q = rotation.into_inner();
    UnitQuaternion::new_normalize(q + dq * q)
}

/// Closest points between segments `p1→q1` and `p2→q2`.
///
/// Parameters are clamped to `[0, 1]`; zero-length segments degrade to point
/// queries.
pub fn closest_points_on_segments(p1: &Vec3, q1: &Vec3, p2: &Vec3, q2: &Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;

    let a = d1.dot(&d1);
    let e = d2.dot(&d2);
    let f = d2.dot(&r);

    if a <= DEGENERATE_SEGMENT_SQ && e <= DEGENERATE_SEGMENT_SQ {
        return (*p1, *p2);
    }

    let (s, t) = if a <= DEGENERATE_SEGMENT_SQ {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= DEGENERATE_SEGMENT_SQ {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;

            // Parallel segments: any s works, start from the first endpoint.
            let s = if denom != 0.0 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };

            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}
