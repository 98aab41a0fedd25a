//! Narrow-phase dispatch.
//!
//! [`collide`] orders its two arguments by `(shape kind, shape id)` so that a
//! given kind pair always reaches the same routine with the same argument
//! order, moves both shapes into world space and looks the routine up in
//! [`COLLISION_TABLE`]. Routines write normals pointing from their first
//! argument to their second; when the arguments were swapped the normals are
//! flipped back so they always point from the caller's first body to its
//! second.

use crate::body::Body;
use crate::box_box::collide_box_box;
use crate::contact::{Contact, FeatureId, Manifold};
use crate::math::{closest_points_on_segments, Quat, Vec3};
use crate::shape::{Geometry, Shape, ShapeKind};

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

/// Distance under which two centers are treated as coincident.
const COINCIDENT_EPSILON: f32 = 1.0e-6;

/// A shape's geometry with its world-space pose.
#[derive(Debug, Clone, Copy)]
pub struct PosedGeometry<'a> {
    pub geometry: &'a Geometry,
    pub position: Vec3,
    pub rotation: Quat,
}

/// Signature shared by every pair routine.
pub type CollideFn = fn(&PosedGeometry<'_>, &PosedGeometry<'_>) -> Manifold;

/// Routine per `(kind1, kind2)`, indexed by [`ShapeKind::index`]. Only the
/// upper triangle is reachable because [`collide`] sorts its arguments by
/// kind.
pub static COLLISION_TABLE: [[CollideFn; ShapeKind::COUNT]; ShapeKind::COUNT] = [
    [box_box, box_sphere, box_capsule],
    [no_contact, sphere_sphere, sphere_capsule],
    [no_contact, no_contact, capsule_capsule],
];

/// Contact manifold between `shape1` (owned by `body1`) and `shape2` (owned
/// by `body2`). Normals point from body 1 toward body 2.
pub fn collide(body1: &Body, shape1: &Shape, body2: &Body, shape2: &Shape) -> Manifold {
    let swapped = (shape2.kind(), shape2.id()) < (shape1.kind(), shape1.id());
    let (body_a, shape_a, body_b, shape_b) = if swapped {
        (body2, shape2, body1, shape1)
    } else {
        (body1, shape1, body2, shape2)
    };

    let (position_a, rotation_a) = body_a.shape_transform(shape_a);
    let (position_b, rotation_b) = body_b.shape_transform(shape_b);
    let a = PosedGeometry {
        geometry: shape_a.geometry(),
        position: position_a,
        rotation: rotation_a,
    };
    let b = PosedGeometry {
        geometry: shape_b.geometry(),
        position: position_b,
        rotation: rotation_b,
    };

    let routine = COLLISION_TABLE[shape_a.kind().index()][shape_b.kind().index()];
    let mut manifold = routine(&a, &b);

    if swapped {
        for contact in manifold.iter_mut() {
            contact.normal = -contact.normal;
        }
    }
    manifold
}

fn no_contact(_: &PosedGeometry<'_>, _: &PosedGeometry<'_>) -> Manifold {
    Manifold::new()
}

fn box_box(a: &PosedGeometry<'_>, b: &PosedGeometry<'_>) -> Manifold {
    let (Geometry::Box { half_extents: h1 }, Geometry::Box { half_extents: h2 }) =
        (a.geometry, b.geometry)
    else {
        return Manifold::new();
    };
    collide_box_box(&a.position, &a.rotation, h1, &b.position, &b.rotation, h2)
}

// ---------------------------------------------------------------------------
// Round shapes
// ---------------------------------------------------------------------------

/// One contact between two spheres (or swept-sphere closest points).
///
/// The point sits halfway through the overlap along the center axis; the
/// normal falls back to +Y when the centers coincide. Empty when
/// `distance - r1 - r2 > 0`.
fn sphere_contact(center1: &Vec3, radius1: f32, center2: &Vec3, radius2: f32) -> Manifold {
    let mut manifold = Manifold::new();

    let diff = center2 - center1;
    let distance = diff.norm();
    let separation = distance - radius1 - radius2;
    if separation > 0.0 {
        return manifold;
    }

    let normal = if distance > COINCIDENT_EPSILON {
        diff / distance
    } else {
        Vec3::y()
    };

    let _ = manifold.push(Contact::new(
        center1 + normal * (radius1 + separation * 0.5),
        normal,
        separation,
        FeatureId(0),
    ));
    manifold
}

fn sphere_sphere(a: &PosedGeometry<'_>, b: &PosedGeometry<'_>) -> Manifold {
    let (Geometry::Sphere { radius: r1 }, Geometry::Sphere { radius: r2 }) = (a.geometry, b.geometry)
    else {
        return Manifold::new();
    };
    sphere_contact(&a.position, *r1, &b.position, *r2)
}

/// End points of a capsule's core segment in world space.
fn capsule_segment(posed: &PosedGeometry<'_>, half_height: f32) -> (Vec3, Vec3) {
    let offset = posed.rotation * Vec3::new(0.0, half_height, 0.0);
    (posed.position - offset, posed.position + offset)
}

fn sphere_capsule(a: &PosedGeometry<'_>, b: &PosedGeometry<'_>) -> Manifold {
    let (Geometry::Sphere { radius: r1 }, Geometry::Capsule { radius: r2, half_height }) =
        (a.geometry, b.geometry)
    else {
        return Manifold::new();
    };
    let (p, q) = capsule_segment(b, *half_height);
    let (_, closest) = closest_points_on_segments(&a.position, &a.position, &p, &q);
    sphere_contact(&a.position, *r1, &closest, *r2)
}

fn capsule_capsule(a: &PosedGeometry<'_>, b: &PosedGeometry<'_>) -> Manifold {
    let (
        Geometry::Capsule { radius: r1, half_height: h1 },
        Geometry::Capsule { radius: r2, half_height: h2 },
    ) = (a.geometry, b.geometry)
    else {
        return Manifold::new();
    };
    let (p1, q1) = capsule_segment(a, *h1);
    let (p2, q2) = capsule_segment(b, *h2);
    let (c1, c2) = closest_points_on_segments(&p1, &q1, &p2, &q2);
    sphere_contact(&c1, *r1, &c2, *r2)
}

// ---------------------------------------------------------------------------
// Box vs round shapes
// ---------------------------------------------------------------------------

/// Box vs sphere: the sphere center is clamped into the box. Outside the box
/// the normal runs from the clamped point to the center; inside, the face of
/// least penetration is used.
fn box_sphere(a: &PosedGeometry<'_>, b: &PosedGeometry<'_>) -> Manifold {
    let (Geometry::Box { half_extents }, Geometry::Sphere { radius }) = (a.geometry, b.geometry)
    else {
        return Manifold::new();
    };
    let radius = *radius;
    let mut manifold = Manifold::new();

    let inverse = a.rotation.inverse();
    let local = inverse * (b.position - a.position);
    let closest = Vec3::new(
        local.x.clamp(-half_extents.x, half_extents.x),
        local.y.clamp(-half_extents.y, half_extents.y),
        local.z.clamp(-half_extents.z, half_extents.z),
    );

    let diff = local - closest;
    let distance_sq = diff.norm_squared();
    if distance_sq > radius * radius {
        return manifold;
    }

    let distance = distance_sq.sqrt();
    let (local_normal, separation, local_point) = if distance > COINCIDENT_EPSILON {
        let normal = diff / distance;
        let separation = distance - radius;
        (normal, separation, closest + normal * (separation * 0.5))
    } else {
        // Center inside the box: push out through the nearest face
        let mut min_depth = f32::MAX;
        let mut normal = Vec3::y();
        for k in 0..3 {
            let positive = half_extents[k] - local[k];
            let negative = half_extents[k] + local[k];
            if positive < min_depth {
                min_depth = positive;
                normal = Vec3::zeros();
                normal[k] = 1.0;
            }
            if negative < min_depth {
                min_depth = negative;
                normal = Vec3::zeros();
                normal[k] = -1.0;
            }
        }
        let separation = -(min_depth + radius);
        (normal, separation, local + normal * ((min_depth - radius) * 0.5))
    };

    let _ = manifold.push(Contact::new(
        a.position + a.rotation * local_point,
        a.rotation * local_normal,
        separation,
        FeatureId(0),
    ));
    manifold
}

/// Box vs capsule has no routine yet: the pair never produces contacts.
// TODO: clip the capsule segment against the box like the box-box face case.
fn box_capsule(_: &PosedGeometry<'_>, _: &PosedGeometry<'_>) -> Manifold {
    Manifold::new()
}
