//! Rigid bodies.
//!
//! A [`Body`] carries pose, velocity, mass properties and the collision
//! shapes it owns. Mass `∞` (or any non-positive mass) makes the body
//! immovable: its inverse mass and inverse inertia are both zero, so impulses
//! and forces leave it untouched.
//!
//! The inverse inertia tensor is recomputed every time the mass or any
//! attached shape changes. The body's mass is split between its shapes in
//! proportion to their volume; each shape's tensor is rotated into the body
//! frame and shifted by the parallel-axis term for its local offset.

use alloc::vec::Vec;

use crate::math::{integrate_rotation, Mat3, Quat, Vec3};
use crate::shape::{Geometry, Shape, ShapeId};

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

/// Identifier of a body inside a [`World`](crate::world::World).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId(pub(crate) usize);

impl BodyId {
    /// Slot index inside the owning world.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A rigid body with linear and angular dynamics.
#[derive(Debug)]
pub struct Body {
    /// Center of mass in world space.
    pub position: Vec3,
    /// Orientation. Defaults to identity.
    pub rotation: Quat,
    /// Linear velocity.
    pub velocity: Vec3,
    /// Angular velocity in world space (radians per second).
    pub angular_velocity: Vec3,

    /// Accumulated force, cleared after each step.
    force: Vec3,
    /// Accumulated torque, cleared after each step.
    torque: Vec3,

    mass: f32,
    inv_mass: f32,
    /// Inverse inertia tensor in body-local space. Zero iff `inv_mass == 0`.
    inv_inertia: Mat3,

    shapes: Vec<Shape>,
}

impl Body {
    /// Create a body with the given mass (in kg).
    ///
    /// A mass that is infinite, zero or negative yields an immovable body.
    pub fn new(mass: f32) -> Self {
        let mut body = Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
            mass: f32::INFINITY,
            inv_mass: 0.0,
            inv_inertia: Mat3::zeros(),
            shapes: Vec::new(),
        };
        body.set_mass(mass);
        body
    }

    /// Create an immovable body (infinite mass).
    pub fn new_static() -> Self {
        Self::new(f32::INFINITY)
    }

    /// Builder: set initial position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder: set initial orientation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder: set initial velocity.
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder: set initial angular velocity (radians per second).
    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Builder: attach a shape.
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.add_shape(shape);
        self
    }

    /// Set the mass and refresh the derived inverse mass and inertia.
    pub fn set_mass(&mut self, mass: f32) {
        self.mass = mass;
        self.inv_mass = if mass > 0.0 && mass < f32::INFINITY {
            1.0 / mass
        } else {
            0.0
        };
        self.update_inertia();
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Whether the body is immovable (`inv_mass == 0`).
    #[inline]
    pub fn is_static(&self) -> bool {
        self.inv_mass == 0.0
    }

    /// Inverse inertia tensor in body-local space.
    #[inline]
    pub fn inv_inertia_local(&self) -> Mat3 {
        self.inv_inertia
    }

    /// World-space inverse inertia tensor: `R * I⁻¹_local * Rᵀ`.
    #[inline]
    pub fn inv_inertia_world(&self) -> Mat3 {
        let r = self.rotation.to_rotation_matrix();
        r.matrix() * self.inv_inertia * r.matrix().transpose()
    }

    // -- Shapes --

    /// Attach a shape and return its id.
    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id();
        self.shapes.push(shape);
        self.update_inertia();
        id
    }

    /// Detach a shape.
    pub fn remove_shape(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.shapes.iter().position(|s| s.id() == id)?;
        let shape = self.shapes.remove(index);
        self.update_inertia();
        Some(shape)
    }

    /// Shapes in attachment order.
    #[inline]
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    /// Change a shape's geometry. Returns `false` if the shape is not attached.
    pub fn set_shape_geometry(&mut self, id: ShapeId, geometry: Geometry) -> bool {
        self.modify_shape(id, |s| s.set_geometry(geometry))
    }

    /// Change a shape's local pose. Returns `false` if the shape is not attached.
    pub fn set_shape_pose(&mut self, id: ShapeId, position: Vec3, rotation: Quat) -> bool {
        self.modify_shape(id, |s| s.set_pose(position, rotation))
    }

    /// Mutate an attached shape in place, then refresh the inertia.
    /// Returns `false` if the shape is not attached.
    pub fn modify_shape<F>(&mut self, id: ShapeId, f: F) -> bool
    where
        F: FnOnce(&mut Shape),
    {
        match self.shapes.iter_mut().find(|s| s.id() == id) {
            Some(shape) => {
                f(shape);
                self.update_inertia();
                true
            }
            None => false,
        }
    }

    /// World-space pose of one of this body's shapes.
    #[inline]
    pub fn shape_transform(&self, shape: &Shape) -> (Vec3, Quat) {
        shape.world_transform(&self.position, &self.rotation)
    }

    fn update_inertia(&mut self) {
        if self.inv_mass == 0.0 {
            self.inv_inertia = Mat3::zeros();
            return;
        }

        let total_volume: f32 = self.shapes.iter().map(|s| s.geometry().volume()).sum();
        let count = self.shapes.len() as f32;

        let mut tensor = Mat3::zeros();
        for shape in &self.shapes {
            let share = if total_volume > 0.0 {
                self.mass * shape.geometry().volume() / total_volume
            } else {
                self.mass / count
            };

            let principal = Mat3::from_diagonal(&shape.geometry().inertia(share));
            let r = shape.rotation().to_rotation_matrix();
            let rotated = r.matrix() * principal * r.matrix().transpose();

            // Parallel-axis term: m * (|d|² I - d dᵀ)
            let d = shape.position();
            let shifted = (Mat3::identity() * d.norm_squared() - d * d.transpose()) * share;

            tensor += rotated + shifted;
        }

        self.inv_inertia = match tensor.try_inverse() {
            Some(inv) if tensor.diagonal().iter().all(|&v| v > 0.0) => inv,
            // No usable shape: treat as unit sphere (I = 2/5 * m * 1^2)
            _ => Mat3::from_diagonal_element(1.0 / (0.4 * self.mass)),
        };
    }

    // -- Forces and impulses --

    /// Apply a force (in Newtons) at the center of mass. Forces accumulate
    /// until the next step.
    #[inline]
    pub fn apply_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Apply a force at a world-space point, producing a torque about the
    /// center of mass.
    pub fn apply_force_at_point(&mut self, force: Vec3, point: Vec3) {
        self.force += force;
        self.torque += (point - self.position).cross(&force);
    }

    /// Apply a torque (in N·m). Torques accumulate until the next step.
    #[inline]
    pub fn apply_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    #[inline]
    pub fn force(&self) -> Vec3 {
        self.force
    }

    #[inline]
    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    /// Reset accumulated force and torque.
    pub fn clear_forces(&mut self) {
        self.force = Vec3::zeros();
        self.torque = Vec3::zeros();
    }

    /// Apply an instantaneous impulse at the center of mass.
    #[inline]
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.velocity += impulse * self.inv_mass;
    }

    /// Apply an instantaneous impulse at offset `r` from the center of mass
    /// (world-space arm).
    #[inline]
    pub fn apply_impulse_at(&mut self, impulse: Vec3, r: Vec3) {
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world() * r.cross(&impulse);
    }

    /// Apply an instantaneous angular impulse: `Δω = I⁻¹ * impulse`.
    #[inline]
    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        self.angular_velocity += self.inv_inertia_world() * impulse;
    }

    /// Velocity of the material point at world-space arm `r`.
    #[inline]
    pub fn velocity_at(&self, r: &Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(r)
    }

    /// Current speed (magnitude of linear velocity).
    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    /// Linear plus rotational kinetic energy. Zero for immovable bodies.
    pub fn kinetic_energy(&self) -> f32 {
        if self.is_static() {
            return 0.0;
        }
        let linear = 0.5 * self.mass * self.velocity.norm_squared();
        let angular = match self.inv_inertia_world().try_inverse() {
            Some(inertia) => 0.5 * self.angular_velocity.dot(&(inertia * self.angular_velocity)),
            None => 0.0,
        };
        linear + angular
    }

    /// `v += dt * (g + F/m)`, `ω += dt * I⁻¹τ`. Immovable bodies are skipped.
    pub(crate) fn integrate_forces(&mut self, dt: f32, gravity: &Vec3) {
        if self.is_static() {
            return;
        }
        self.velocity += (gravity + self.force * self.inv_mass) * dt;
        self.angular_velocity += self.inv_inertia_world() * self.torque * dt;
    }

    /// Advance pose by the current velocities and clear the accumulators.
    pub(crate) fn integrate_pose(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        self.rotation = integrate_rotation(&self.rotation, &self.angular_velocity, dt);
        self.clear_forces();
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON
    }

    fn approx_vec_eq(a: &Vec3, b: &Vec3) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
    }

    #[test]
    fn test_body_creation() {
        let body = Body::new(5.0);
        assert_eq!(body.mass(), 5.0);
        assert!(approx_eq(body.inv_mass(), 0.2));
        assert!(!body.is_static());
        assert!(approx_vec_eq(&body.position, &Vec3::zeros()));
        assert!(approx_vec_eq(&body.velocity, &Vec3::zeros()));
    }

    #[test]
    fn test_static_body() {
        let body = Body::new_static();
        assert!(body.is_static());
        assert_eq!(body.inv_mass(), 0.0);
        assert!(body.mass().is_infinite());
        assert_eq!(body.inv_inertia_local(), Mat3::zeros());
    }

    #[test]
    fn test_mass_inertia_invariant() {
        for mass in [f32::INFINITY, 0.0, -1.0, 1.0e-3, 1.0, 250.0] {
            let body = Body::new(mass).with_shape(Shape::cuboid(Vec3::new(0.5, 0.5, 0.5)));
            let immovable = !(mass > 0.0 && mass.is_finite());
            assert_eq!(body.inv_mass() == 0.0, immovable, "mass {}", mass);
            assert_eq!(body.inv_inertia_local() == Mat3::zeros(), immovable, "mass {}", mass);
        }
    }

    #[test]
    fn test_shapeless_body_uses_unit_sphere_inertia() {
        let body = Body::new(2.0);
        let expected = 1.0 / (0.4 * 2.0);
        assert!(approx_eq(body.inv_inertia_local()[(0, 0)], expected));
        assert!(approx_eq(body.inv_inertia_local()[(1, 1)], expected));
    }

    #[test]
    fn test_box_inertia_from_shape() {
        let body = Body::new(12.0).with_shape(Shape::cuboid(Vec3::new(0.5, 1.0, 1.5)));
        let inv = body.inv_inertia_local();
        assert!(approx_eq(inv[(0, 0)], 1.0 / 13.0));
        assert!(approx_eq(inv[(1, 1)], 1.0 / 10.0));
        assert!(approx_eq(inv[(2, 2)], 1.0 / 5.0));
    }

    #[test]
    fn test_inertia_recomputed_on_mass_change() {
        let mut body = Body::new(1.0).with_shape(Shape::ball(1.0));
        let before = body.inv_inertia_local()[(0, 0)];
        body.set_mass(2.0);
        let after = body.inv_inertia_local()[(0, 0)];
        assert!(approx_eq(after, before * 0.5));

        body.set_mass(f32::INFINITY);
        assert_eq!(body.inv_inertia_local(), Mat3::zeros());
    }

    #[test]
    fn test_inertia_recomputed_on_geometry_change() {
        let mut body = Body::new(1.0);
        let id = body.add_shape(Shape::ball(1.0));
        let before = body.inv_inertia_local()[(0, 0)];
        assert!(body.set_shape_geometry(id, Geometry::Sphere { radius: 2.0 }));
        let after = body.inv_inertia_local()[(0, 0)];
        assert!(approx_eq(after, before / 4.0));
    }

    #[test]
    fn test_offset_shape_adds_parallel_axis_term() {
        let centered = Body::new(1.0).with_shape(Shape::ball(0.5));
        let offset = Body::new(1.0)
            .with_shape(Shape::ball(0.5).with_position(Vec3::new(0.0, 2.0, 0.0)));
        // Rotation about x moves the offset sphere around: larger inertia
        assert!(offset.inv_inertia_local()[(0, 0)] < centered.inv_inertia_local()[(0, 0)]);
        // Rotation about y (the offset axis) is unchanged
        assert!(approx_eq(
            offset.inv_inertia_local()[(1, 1)],
            centered.inv_inertia_local()[(1, 1)]
        ));
    }

    #[test]
    fn test_mass_split_by_volume() {
        let mut body = Body::new(2.0);
        body.add_shape(Shape::cuboid(Vec3::new(0.5, 0.5, 0.5)));
        body.add_shape(Shape::cuboid(Vec3::new(0.5, 0.5, 0.5)));
        // Two unit cubes at the same place: same tensor as one cube of mass 2
        let single = Body::new(2.0).with_shape(Shape::cuboid(Vec3::new(0.5, 0.5, 0.5)));
        assert!(approx_eq(
            body.inv_inertia_local()[(2, 2)],
            single.inv_inertia_local()[(2, 2)]
        ));
    }

    #[test]
    fn test_remove_shape() {
        let mut body = Body::new(1.0);
        let a = body.add_shape(Shape::ball(1.0));
        let b = body.add_shape(Shape::ball(0.5));
        assert!(body.remove_shape(a).is_some());
        assert!(body.remove_shape(a).is_none());
        assert_eq!(body.shapes().len(), 1);
        assert!(body.shape(b).is_some());
    }

    #[test]
    fn test_apply_force_and_clear() {
        let mut body = Body::new(1.0);
        body.apply_force(Vec3::new(10.0, 0.0, 0.0));
        body.apply_force(Vec3::new(5.0, 0.0, 0.0));
        assert!(approx_vec_eq(&body.force(), &Vec3::new(15.0, 0.0, 0.0)));
        body.clear_forces();
        assert!(approx_vec_eq(&body.force(), &Vec3::zeros()));
    }

    #[test]
    fn test_force_at_point_produces_torque() {
        let mut body = Body::new(1.0);
        body.apply_force_at_point(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(approx_vec_eq(&body.torque(), &Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_impulse_on_static_body_ignored() {
        let mut body = Body::new_static();
        body.apply_impulse_at(Vec3::new(100.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert!(approx_vec_eq(&body.velocity, &Vec3::zeros()));
        assert!(approx_vec_eq(&body.angular_velocity, &Vec3::zeros()));
    }

    #[test]
    fn test_impulse_at_offset_spins_body() {
        let mut body = Body::new(1.0).with_shape(Shape::ball(1.0));
        body.apply_impulse_at(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert!(approx_eq(body.velocity.x, 1.0));
        // r × P = (0,1,0) × (1,0,0) = (0,0,-1)
        assert!(body.angular_velocity.z < 0.0);
    }

    #[test]
    fn test_inv_inertia_world_rotated() {
        let rot = Quat::from_axis_angle(&Vec3::z_axis(), core::f32::consts::FRAC_PI_2);
        let body = Body::new(12.0)
            .with_shape(Shape::cuboid(Vec3::new(0.5, 1.0, 1.5)))
            .with_rotation(rot);
        let world = body.inv_inertia_world();
        // A quarter turn about Z swaps the X and Y moments
        assert!(approx_eq(world[(0, 0)], 1.0 / 10.0));
        assert!(approx_eq(world[(1, 1)], 1.0 / 13.0));
    }

    #[test]
    fn test_integrate_forces_and_pose() {
        let mut body = Body::new(2.0);
        body.apply_force(Vec3::new(4.0, 0.0, 0.0));
        body.integrate_forces(0.5, &Vec3::new(0.0, -10.0, 0.0));
        assert!(approx_vec_eq(&body.velocity, &Vec3::new(1.0, -5.0, 0.0)));

        body.integrate_pose(0.5);
        assert!(approx_vec_eq(&body.position, &Vec3::new(0.5, -2.5, 0.0)));
        assert!(approx_vec_eq(&body.force(), &Vec3::zeros()));
    }

    #[test]
    fn test_static_body_ignores_gravity() {
        let mut body = Body::new_static();
        body.integrate_forces(1.0, &Vec3::new(0.0, -9.81, 0.0));
        assert!(approx_vec_eq(&body.velocity, &Vec3::zeros()));
    }

    #[test]
    fn test_kinetic_energy() {
        let body = Body::new(2.0).with_velocity(Vec3::new(3.0, 0.0, 0.0));
        assert!(approx_eq(body.kinetic_energy(), 9.0));
        assert_eq!(Body::new_static().with_velocity(Vec3::x()).kinetic_energy(), 0.0);
    }
}
