//! Oriented box vs oriented box.
//!
//! Separating-axis test over the 15 candidate axes: the three face normals of
//! each box and the nine cross products of one box's axes with the other's.
//! Any axis with no overlap proves the boxes disjoint. Otherwise the axis of
//! least overlap becomes the contact normal:
//!
//! - Face axis: the face of the owning box that points at the other box is
//!   the reference face. The other box's face most anti-parallel to it is the
//!   incident face; its corners are clipped against the four side planes of
//!   the reference face (Sutherland-Hodgman) and every clipped point below the
//!   reference plane becomes a contact.
//! - Edge axis: one contact between the two supporting edges.
//!
//! Face axes win ties against edge axes (and box 1's faces against box 2's)
//! unless the other axis is clearly shallower, so that nearly resting stacks
//! keep a stable reference face from one step to the next.

use crate::contact::{Contact, FeatureId, Manifold, MAX_CONTACT_POINTS};
use crate::math::{closest_points_on_segments, Quat, Vec3};

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

/// Cross products shorter than this are skipped (near-parallel edges).
const MIN_AXIS_LENGTH: f32 = 1.0e-4;

/// A later axis replaces the current best only if its overlap is below
/// `RELATIVE_TOLERANCE * best - ABSOLUTE_TOLERANCE`.
const RELATIVE_TOLERANCE: f32 = 0.95;
const ABSOLUTE_TOLERANCE: f32 = 1.0e-3;

/// Points this close outside a side plane are still kept.
const CLIP_TOLERANCE: f32 = 1.0e-4;

/// A quad clipped by four planes has at most eight vertices.
const MAX_CLIP_VERTICES: usize = 8;

/// Marks edge-edge features so they never equal a face feature.
const EDGE_FEATURE: u32 = 1 << 16;

/// Vertex code of the single fallback point (outside the clip-vertex range).
const FALLBACK_VERTEX: u32 = 63;

#[derive(Debug, Clone, Copy)]
struct Obb {
    center: Vec3,
    axes: [Vec3; 3],
    half: [f32; 3],
}

impl Obb {
    fn new(center: &Vec3, rotation: &Quat, half_extents: &Vec3) -> Self {
        Self {
            center: *center,
            axes: [
                rotation * Vec3::x(),
                rotation * Vec3::y(),
                rotation * Vec3::z(),
            ],
            half: [half_extents.x, half_extents.y, half_extents.z],
        }
    }

    /// Half-length of the box's shadow on a unit axis.
    fn project(&self, axis: &Vec3) -> f32 {
        (0..3)
            .map(|k| self.half[k] * self.axes[k].dot(axis).abs())
            .sum()
    }

    /// Corner furthest along `direction`.
    fn support(&self, direction: &Vec3) -> Vec3 {
        let mut point = self.center;
        for k in 0..3 {
            point += self.axes[k] * (self.half[k] * sign(self.axes[k].dot(direction)));
        }
        point
    }
}

#[inline]
fn sign(x: f32) -> f32 {
    if x >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

#[inline]
fn other_axes(k: usize) -> [usize; 2] {
    [(k + 1) % 3, (k + 2) % 3]
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    FaceA(usize),
    FaceB(usize),
    Edge(usize, usize),
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    axis: Axis,
    /// Unit normal, oriented from box 1 toward box 2 once selection is done.
    normal: Vec3,
    overlap: f32,
}

/// Run the separating-axis test. `None` when a separating axis exists.
fn least_overlap_axis(a: &Obb, b: &Obb) -> Option<Candidate> {
    let d = b.center - a.center;
    let overlap_on = |axis: &Vec3| a.project(axis) + b.project(axis) - d.dot(axis).abs();

    let mut best = Candidate {
        axis: Axis::FaceA(0),
        normal: a.axes[0],
        overlap: f32::MAX,
    };

    for i in 0..3 {
        let overlap = overlap_on(&a.axes[i]);
        if overlap <= 0.0 {
            return None;
        }
        if overlap < best.overlap {
            best = Candidate {
                axis: Axis::FaceA(i),
                normal: a.axes[i],
                overlap,
            };
        }
    }

    for j in 0..3 {
        let overlap = overlap_on(&b.axes[j]);
        if overlap <= 0.0 {
            return None;
        }
        if overlap < RELATIVE_TOLERANCE * best.overlap - ABSOLUTE_TOLERANCE {
            best = Candidate {
                axis: Axis::FaceB(j),
                normal: b.axes[j],
                overlap,
            };
        }
    }

    for i in 0..3 {
        for j in 0..3 {
            let axis = a.axes[i].cross(&b.axes[j]);
            let length = axis.norm();
            if length < MIN_AXIS_LENGTH {
                continue;
            }
            let axis = axis / length;
            let overlap = overlap_on(&axis);
            if overlap <= 0.0 {
                return None;
            }
            if overlap < RELATIVE_TOLERANCE * best.overlap - ABSOLUTE_TOLERANCE {
                best = Candidate {
                    axis: Axis::Edge(i, j),
                    normal: axis,
                    overlap,
                };
            }
        }
    }

    if d.dot(&best.normal) < 0.0 {
        best.normal = -best.normal;
    }
    Some(best)
}

/// Box vs box contact manifold. Normals point from box 1 to box 2.
pub fn collide_box_box(
    position1: &Vec3,
    rotation1: &Quat,
    half_extents1: &Vec3,
    position2: &Vec3,
    rotation2: &Quat,
    half_extents2: &Vec3,
) -> Manifold {
    let a = Obb::new(position1, rotation1, half_extents1);
    let b = Obb::new(position2, rotation2, half_extents2);

    let Some(best) = least_overlap_axis(&a, &b) else {
        return Manifold::new();
    };

    match best.axis {
        Axis::FaceA(i) => face_contact(&a, &b, i, 0, &best.normal, &best.normal, best.overlap),
        Axis::FaceB(j) => face_contact(&b, &a, j, 1, &-best.normal, &best.normal, best.overlap),
        Axis::Edge(i, j) => edge_contact(&a, &b, i, j, &best.normal, best.overlap),
    }
}

// ---------------------------------------------------------------------------
// Face contact
// ---------------------------------------------------------------------------

/// A vertex of the polygon being clipped, identified by the two polygon edges
/// meeting at it. Edges `0..4` are incident-face edges, `4..8` lie on a
/// reference side plane.
#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    position: Vec3,
    in_edge: u32,
    out_edge: u32,
}

impl ClipVertex {
    fn code(&self) -> u32 {
        let lo = self.in_edge.min(self.out_edge);
        let hi = self.in_edge.max(self.out_edge);
        lo * 8 + hi
    }
}

type ClipPolygon = heapless::Vec<ClipVertex, MAX_CLIP_VERTICES>;

/// Keep the part of `polygon` with `normal · x <= offset`.
fn clip_polygon(polygon: &ClipPolygon, normal: &Vec3, offset: f32, plane: u32) -> ClipPolygon {
    let mut out = ClipPolygon::new();
    let Some(&last) = polygon.last() else {
        return out;
    };

    let mut prev = last;
    let mut prev_distance = normal.dot(&prev.position) - offset;

    for &cur in polygon.iter() {
        let cur_distance = normal.dot(&cur.position) - offset;
        let prev_inside = prev_distance <= CLIP_TOLERANCE;
        let cur_inside = cur_distance <= CLIP_TOLERANCE;

        if prev_inside != cur_inside {
            let t = (prev_distance / (prev_distance - cur_distance)).clamp(0.0, 1.0);
            let position = prev.position + (cur.position - prev.position) * t;
            let vertex = if prev_inside {
                ClipVertex {
                    position,
                    in_edge: prev.out_edge,
                    out_edge: plane,
                }
            } else {
                ClipVertex {
                    position,
                    in_edge: plane,
                    out_edge: cur.in_edge,
                }
            };
            let _ = out.push(vertex);
        }
        if cur_inside {
            let _ = out.push(cur);
        }

        prev = cur;
        prev_distance = cur_distance;
    }

    out
}

#[derive(Debug, Clone, Copy)]
struct FacePoint {
    position: Vec3,
    separation: f32,
    code: u32,
}

/// Contacts for a face axis.
///
/// `reference_normal` is the outward normal of the reference face (pointing
/// at the incident box); `normal` is the manifold normal from box 1 to box 2.
fn face_contact(
    reference: &Obb,
    incident: &Obb,
    reference_axis: usize,
    reference_side: u32,
    reference_normal: &Vec3,
    normal: &Vec3,
    overlap: f32,
) -> Manifold {
    // Incident face: most anti-parallel to the reference normal
    let mut incident_axis = 0;
    let mut incident_sign = 1.0;
    let mut min_dot = f32::MAX;
    for j in 0..3 {
        let dot = incident.axes[j].dot(reference_normal);
        if dot < min_dot {
            min_dot = dot;
            incident_axis = j;
            incident_sign = 1.0;
        }
        if -dot < min_dot {
            min_dot = -dot;
            incident_axis = j;
            incident_sign = -1.0;
        }
    }

    let reference_face = reference_side * 6
        + reference_axis as u32 * 2
        + u32::from(reference.axes[reference_axis].dot(reference_normal) > 0.0);
    let incident_face = incident_axis as u32 * 2 + u32::from(incident_sign > 0.0);
    let feature_base = (reference_face * 6 + incident_face) << 6;

    let face_center = incident.center
        + incident.axes[incident_axis] * (incident_sign * incident.half[incident_axis]);
    let [j1, j2] = other_axes(incident_axis);
    let u = incident.axes[j1] * incident.half[j1];
    let v = incident.axes[j2] * incident.half[j2];

    let mut polygon = ClipPolygon::new();
    for (i, corner) in [
        face_center + u + v,
        face_center - u + v,
        face_center - u - v,
        face_center + u - v,
    ]
    .into_iter()
    .enumerate()
    {
        let i = i as u32;
        let _ = polygon.push(ClipVertex {
            position: corner,
            in_edge: (i + 3) % 4,
            out_edge: i,
        });
    }

    // Side planes of the reference face
    let [k1, k2] = other_axes(reference_axis);
    let planes = [
        (reference.axes[k1], reference.half[k1]),
        (-reference.axes[k1], reference.half[k1]),
        (reference.axes[k2], reference.half[k2]),
        (-reference.axes[k2], reference.half[k2]),
    ];
    for (p, (plane_normal, extent)) in planes.iter().enumerate() {
        let offset = plane_normal.dot(&reference.center) + extent;
        polygon = clip_polygon(&polygon, plane_normal, offset, 4 + p as u32);
    }

    let reference_center = reference.center + reference_normal * reference.half[reference_axis];

    let mut points: heapless::Vec<FacePoint, MAX_CLIP_VERTICES> = heapless::Vec::new();
    for vertex in polygon.iter() {
        let separation = reference_normal.dot(&(vertex.position - reference_center));
        if separation <= 0.0 {
            let _ = points.push(FacePoint {
                position: vertex.position,
                separation,
                code: vertex.code(),
            });
        }
    }

    let mut manifold = Manifold::new();

    if points.is_empty() {
        // Clipping removed everything: fall back to the incident box's
        // deepest corner.
        let deepest = incident.support(&-reference_normal);
        let _ = manifold.push(Contact::new(
            deepest + reference_normal * (overlap * 0.5),
            *normal,
            -overlap,
            FeatureId(feature_base | FALLBACK_VERTEX),
        ));
        return manifold;
    }

    for index in reduce_points(&points, reference_normal) {
        let point = &points[index];
        let _ = manifold.push(Contact::new(
            point.position - reference_normal * (point.separation * 0.5),
            *normal,
            point.separation,
            FeatureId(feature_base | point.code),
        ));
    }

    manifold
}

/// Pick at most four points spanning the largest area: the deepest point, the
/// point furthest from it, then the points furthest on either side of the
/// line through those two.
fn reduce_points(
    points: &[FacePoint],
    normal: &Vec3,
) -> heapless::Vec<usize, MAX_CONTACT_POINTS> {
    let mut chosen: heapless::Vec<usize, MAX_CONTACT_POINTS> = heapless::Vec::new();

    if points.len() <= MAX_CONTACT_POINTS {
        for i in 0..points.len() {
            let _ = chosen.push(i);
        }
        return chosen;
    }

    let deepest = argmax(points, |p| -p.separation);
    let p0 = points[deepest].position;
    let farthest = argmax(points, |p| (p.position - p0).norm_squared());
    let p1 = points[farthest].position;

    let edge = p1 - p0;
    let area = |p: &FacePoint| edge.cross(&(p.position - p0)).dot(normal);
    let left = argmax(points, &area);
    let right = argmax(points, |p| -area(p));

    for index in [deepest, farthest, left, right] {
        if !chosen.contains(&index) {
            let _ = chosen.push(index);
        }
    }
    chosen
}

fn argmax(points: &[FacePoint], score: impl Fn(&FacePoint) -> f32) -> usize {
    let mut best = 0;
    let mut best_score = f32::MIN;
    for (i, p) in points.iter().enumerate() {
        let s = score(p);
        if s > best_score {
            best_score = s;
            best = i;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Edge contact
// ---------------------------------------------------------------------------

/// Edge of `obb` parallel to `axis` that lies furthest along `direction`,
/// with a code identifying which of the four parallel edges it is.
fn support_edge(obb: &Obb, axis: usize, direction: &Vec3) -> (Vec3, Vec3, u32) {
    let mut mid = obb.center;
    let mut code = axis as u32 * 4;
    for (bit, k) in other_axes(axis).into_iter().enumerate() {
        let s = sign(obb.axes[k].dot(direction));
        mid += obb.axes[k] * (obb.half[k] * s);
        if s > 0.0 {
            code |= 1 << bit;
        }
    }
    let extent = obb.axes[axis] * obb.half[axis];
    (mid - extent, mid + extent, code)
}

fn edge_contact(a: &Obb, b: &Obb, i: usize, j: usize, normal: &Vec3, overlap: f32) -> Manifold {
    let (a0, a1, code_a) = support_edge(a, i, normal);
    let (b0, b1, code_b) = support_edge(b, j, &-normal);
    let (c1, c2) = closest_points_on_segments(&a0, &a1, &b0, &b1);

    let mut manifold = Manifold::new();
    let _ = manifold.push(Contact::new(
        (c1 + c2) * 0.5,
        *normal,
        -overlap,
        FeatureId(EDGE_FEATURE | code_a << 4 | code_b),
    ));
    manifold
}
