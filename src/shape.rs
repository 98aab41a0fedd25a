//! Collision shapes attached to bodies.
//!
//! A [`Shape`] is a [`Geometry`] placed at a local offset inside its owning
//! body, together with a surface [`Material`]. Shapes receive a process-unique
//! [`ShapeId`] when constructed; contact pairs are keyed by the two ids, so the
//! same pair of shapes always maps to the same key regardless of the order in
//! which they are visited.

use core::f32::consts::PI;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::material::Material;
use crate::math::{Quat, Vec3};

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

static NEXT_SHAPE_ID: AtomicU32 = AtomicU32::new(0);

/// Unique, monotonically increasing shape identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeId(u32);

impl ShapeId {
    fn next() -> Self {
        ShapeId(NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Discriminant of a [`Geometry`], used to index the collision dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    Box = 0,
    Sphere = 1,
    Capsule = 2,
}

impl ShapeKind {
    /// Number of shape kinds.
    pub const COUNT: usize = 3;

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Shape geometry, expressed in the shape's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// Oriented box defined by half-extents along its local axes.
    Box { half_extents: Vec3 },
    /// Sphere centered on the shape origin.
    Sphere { radius: f32 },
    /// Capsule: a segment along local Y of length `2 * half_height`, swept by
    /// `radius`.
    Capsule { radius: f32, half_height: f32 },
}

impl Geometry {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Geometry::Box { .. } => ShapeKind::Box,
            Geometry::Sphere { .. } => ShapeKind::Sphere,
            Geometry::Capsule { .. } => ShapeKind::Capsule,
        }
    }

    /// Enclosed volume. Used to split a body's mass between its shapes.
    pub fn volume(&self) -> f32 {
        match *self {
            Geometry::Box { half_extents: h } => 8.0 * h.x * h.y * h.z,
            Geometry::Sphere { radius } => (4.0 / 3.0) * PI * radius * radius * radius,
            Geometry::Capsule { radius, half_height } => {
                let cylinder = PI * radius * radius * (2.0 * half_height);
                let spheres = (4.0 / 3.0) * PI * radius * radius * radius;
                cylinder + spheres
            }
        }
    }

    /// Principal moments of inertia about the shape origin for a solid of
    /// the given mass.
    pub fn inertia(&self, mass: f32) -> Vec3 {
        match *self {
            Geometry::Box { half_extents } => {
                // Full dimensions
                let s = half_extents * 2.0;
                let k = mass / 12.0;
                Vec3::new(
                    k * (s.y * s.y + s.z * s.z),
                    k * (s.x * s.x + s.z * s.z),
                    k * (s.x * s.x + s.y * s.y),
                )
            }
            Geometry::Sphere { radius } => {
                let i = 0.4 * mass * radius * radius;
                Vec3::new(i, i, i)
            }
            Geometry::Capsule { radius, half_height } => {
                let r2 = radius * radius;
                let volume_cylinder = PI * r2 * (2.0 * half_height);
                let volume_spheres = (4.0 / 3.0) * PI * r2 * radius;
                let total = volume_cylinder + volume_spheres;
                if total <= 0.0 {
                    return Vec3::zeros();
                }

                let mass_cylinder = mass * (volume_cylinder / total);
                let mass_hemisphere = 0.5 * (mass - mass_cylinder);

                let cyl_transverse =
                    (1.0 / 12.0) * mass_cylinder * (3.0 * r2 + 4.0 * half_height * half_height);
                let cyl_axial = 0.5 * mass_cylinder * r2;

                // Hemisphere transverse moment about its own center of mass
                // (83/320 m r²), shifted to the capsule center.
                let hemi_axial = 0.4 * mass_hemisphere * r2;
                let hemi_transverse = (0.4 - 9.0 / 64.0) * mass_hemisphere * r2;
                let offset = half_height + (3.0 / 8.0) * radius;
                let hemi_offset = mass_hemisphere * offset * offset;

                let transverse = cyl_transverse + 2.0 * (hemi_transverse + hemi_offset);
                let axial = cyl_axial + 2.0 * hemi_axial;
                Vec3::new(transverse, axial, transverse)
            }
        }
    }
}

/// A collision shape owned by a body.
#[derive(Debug)]
pub struct Shape {
    id: ShapeId,
    geometry: Geometry,
    position: Vec3,
    rotation: Quat,
    /// Surface material used when this shape touches another.
    pub material: Material,
    /// Trigger shapes report overlaps but never generate contact impulses.
    pub trigger: bool,
}

impl Shape {
    /// Create a shape with the default material at the body origin.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: ShapeId::next(),
            geometry,
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            material: Material::default(),
            trigger: false,
        }
    }

    /// Box shape with the given half-extents.
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(Geometry::Box { half_extents })
    }

    /// Sphere shape with the given radius.
    pub fn ball(radius: f32) -> Self {
        Self::new(Geometry::Sphere { radius })
    }

    /// Capsule shape along local Y.
    pub fn capsule(radius: f32, half_height: f32) -> Self {
        Self::new(Geometry::Capsule { radius, half_height })
    }

    /// Builder: local offset relative to the owning body.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder: local orientation relative to the owning body.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: surface material.
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Builder: mark as a trigger (overlap detection only).
    pub fn as_trigger(mut self) -> Self {
        self.trigger = true;
        self
    }

    /// A copy of this shape carrying a fresh id.
    pub fn duplicate(&self) -> Self {
        Self {
            id: ShapeId::next(),
            geometry: self.geometry,
            position: self.position,
            rotation: self.rotation,
            material: self.material,
            trigger: self.trigger,
        }
    }

    #[inline]
    pub fn id(&self) -> ShapeId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    #[inline]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Local offset relative to the owning body.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Local orientation relative to the owning body.
    #[inline]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Replace the geometry. When the shape belongs to a body, go through
    /// [`Body::set_shape_geometry`](crate::body::Body::set_shape_geometry) so
    /// the body's inertia is refreshed.
    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.geometry = geometry;
    }

    /// Replace the local pose.
    pub fn set_pose(&mut self, position: Vec3, rotation: Quat) {
        self.position = position;
        self.rotation = rotation;
    }

    /// World-space pose of this shape given its owner's pose.
    #[inline]
    pub fn world_transform(&self, body_position: &Vec3, body_rotation: &Quat) -> (Vec3, Quat) {
        (
            body_position + body_rotation * self.position,
            body_rotation * self.rotation,
        )
    }
}
