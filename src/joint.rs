//! Joints: persistent two-body constraints.
//!
//! Each joint stores its anchor (and for a hinge, its axis) in both bodies'
//! local frames, captured when the joint is set. The solver works like the
//! contact solver: [`Joint::pre_step`] computes the effective mass and bias
//! and warm-starts with the accumulated impulse, then
//! [`Joint::apply_impulse`] runs once per iteration.
//!
//! - [`SphericalJoint`]: the two anchor points coincide (ball and socket).
//! - [`HingeJoint`]: a spherical joint that also keeps the two bodies' hinge
//!   axes aligned, leaving one rotational degree of freedom.

use log::warn;

use crate::body::{Body, BodyId};
use crate::config::SolverConfig;
use crate::math::{skew, tangent_basis, Mat3, Vec3};

/// Identifier of a joint inside a [`World`](crate::world::World).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JointId(pub(crate) usize);

impl JointId {
    /// Slot index inside the owning world.
    pub fn index(self) -> usize {
        self.0
    }
}

const DEFAULT_BIAS_FACTOR: f32 = 0.2;

/// Ball-and-socket joint.
#[derive(Debug, Clone)]
pub struct SphericalJoint {
    body1: BodyId,
    body2: BodyId,
    /// Anchor in body 1's local frame.
    local_anchor1: Vec3,
    /// Anchor in body 2's local frame.
    local_anchor2: Vec3,

    r1: Vec3,
    r2: Vec3,
    /// Inverse of the 3×3 effective-mass matrix.
    mass: Mat3,
    bias: Vec3,
    accumulated_impulse: Vec3,

    /// Constraint softness. 0 = rigid.
    pub softness: f32,
    /// Fraction of anchor drift corrected per step.
    pub bias_factor: f32,
}

impl SphericalJoint {
    /// Join two bodies at a world-space anchor point.
    pub fn new(id1: BodyId, body1: &Body, id2: BodyId, body2: &Body, anchor: Vec3) -> Self {
        let mut joint = Self {
            body1: id1,
            body2: id2,
            local_anchor1: Vec3::zeros(),
            local_anchor2: Vec3::zeros(),
            r1: Vec3::zeros(),
            r2: Vec3::zeros(),
            mass: Mat3::zeros(),
            bias: Vec3::zeros(),
            accumulated_impulse: Vec3::zeros(),
            softness: 0.0,
            bias_factor: DEFAULT_BIAS_FACTOR,
        };
        joint.set(id1, body1, id2, body2, anchor);
        joint
    }

    /// Re-anchor the joint at a world-space point, relative to the bodies'
    /// current poses. Resets the accumulated impulse.
    pub fn set(&mut self, id1: BodyId, body1: &Body, id2: BodyId, body2: &Body, anchor: Vec3) {
        self.body1 = id1;
        self.body2 = id2;
        self.local_anchor1 = body1.rotation.inverse() * (anchor - body1.position);
        self.local_anchor2 = body2.rotation.inverse() * (anchor - body2.position);
        self.accumulated_impulse = Vec3::zeros();
    }

    /// Builder: set softness.
    pub fn with_softness(mut self, softness: f32) -> Self {
        self.softness = softness.max(0.0);
        self
    }

    /// Builder: set the drift-correction factor.
    pub fn with_bias_factor(mut self, bias_factor: f32) -> Self {
        self.bias_factor = bias_factor;
        self
    }

    #[inline]
    pub fn bodies(&self) -> (BodyId, BodyId) {
        (self.body1, self.body2)
    }

    /// Anchors in each body's local frame.
    #[inline]
    pub fn local_anchors(&self) -> (Vec3, Vec3) {
        (self.local_anchor1, self.local_anchor2)
    }

    /// Current world-space anchor on each body. Equal when the joint is
    /// satisfied.
    pub fn anchors_world(&self, body1: &Body, body2: &Body) -> (Vec3, Vec3) {
        (
            body1.position + body1.rotation * self.local_anchor1,
            body2.position + body2.rotation * self.local_anchor2,
        )
    }

    #[inline]
    pub fn accumulated_impulse(&self) -> Vec3 {
        self.accumulated_impulse
    }

    pub fn pre_step(&mut self, body1: &mut Body, body2: &mut Body, inv_dt: f32, config: &SolverConfig) {
        self.r1 = body1.rotation * self.local_anchor1;
        self.r2 = body2.rotation * self.local_anchor2;

        let s1 = skew(&self.r1);
        let s2 = skew(&self.r2);
        let k = Mat3::identity() * (body1.inv_mass() + body2.inv_mass())
            - s1 * body1.inv_inertia_world() * s1
            - s2 * body2.inv_inertia_world() * s2
            + Mat3::identity() * self.softness;

        self.mass = match k.try_inverse() {
            Some(mass) => mass,
            None => {
                warn!(
                    "singular joint mass matrix between {:?} and {:?}",
                    self.body1, self.body2
                );
                Mat3::zeros()
            }
        };

        let p1 = body1.position + self.r1;
        let p2 = body2.position + self.r2;
        self.bias = if config.position_correction {
            -(p2 - p1) * (self.bias_factor * inv_dt)
        } else {
            Vec3::zeros()
        };

        if config.warm_starting {
            body1.apply_impulse_at(-self.accumulated_impulse, self.r1);
            body2.apply_impulse_at(self.accumulated_impulse, self.r2);
        } else {
            self.accumulated_impulse = Vec3::zeros();
        }
    }

    pub fn apply_impulse(&mut self, body1: &mut Body, body2: &mut Body) {
        let dv = body2.velocity_at(&self.r2) - body1.velocity_at(&self.r1);
        let impulse =
            self.mass * (self.bias - dv - self.accumulated_impulse * self.softness);

        body1.apply_impulse_at(-impulse, self.r1);
        body2.apply_impulse_at(impulse, self.r2);
        self.accumulated_impulse += impulse;
    }
}

/// One scalar angular constraint row of a hinge.
#[derive(Debug, Clone, Copy, Default)]
struct AngularRow {
    axis: Vec3,
    mass: f32,
    bias: f32,
    impulse: f32,
}

/// Hinge joint: a spherical joint plus two angular rows that keep the hinge
/// axes of both bodies parallel.
#[derive(Debug, Clone)]
pub struct HingeJoint {
    point: SphericalJoint,
    /// Hinge axis in body 1's local frame.
    local_axis1: Vec3,
    /// Hinge axis in body 2's local frame.
    local_axis2: Vec3,
    /// Directions perpendicular to the hinge axis in body 1's local frame.
    local_basis1: [Vec3; 2],
    rows: [AngularRow; 2],
}

impl HingeJoint {
    /// Join two bodies at a world-space anchor, free to rotate about the
    /// world-space `axis`.
    pub fn new(
        id1: BodyId,
        body1: &Body,
        id2: BodyId,
        body2: &Body,
        anchor: Vec3,
        axis: Vec3,
    ) -> Self {
        let mut joint = Self {
            point: SphericalJoint::new(id1, body1, id2, body2, anchor),
            local_axis1: Vec3::y(),
            local_axis2: Vec3::y(),
            local_basis1: [Vec3::z(), Vec3::x()],
            rows: [AngularRow::default(); 2],
        };
        joint.set(id1, body1, id2, body2, anchor, axis);
        joint
    }

    /// Re-anchor the joint. Resets all accumulated impulses.
    pub fn set(
        &mut self,
        id1: BodyId,
        body1: &Body,
        id2: BodyId,
        body2: &Body,
        anchor: Vec3,
        axis: Vec3,
    ) {
        self.point.set(id1, body1, id2, body2, anchor);
        let axis = axis.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::y);
        self.local_axis1 = body1.rotation.inverse() * axis;
        self.local_axis2 = body2.rotation.inverse() * axis;
        let (u, v) = tangent_basis(&self.local_axis1);
        self.local_basis1 = [u, v];
        self.rows = [AngularRow::default(); 2];
    }

    /// Builder: set softness (shared by the point and angular parts).
    pub fn with_softness(mut self, softness: f32) -> Self {
        self.point.softness = softness.max(0.0);
        self
    }

    /// Builder: set the drift-correction factor.
    pub fn with_bias_factor(mut self, bias_factor: f32) -> Self {
        self.point.bias_factor = bias_factor;
        self
    }

    #[inline]
    pub fn bodies(&self) -> (BodyId, BodyId) {
        self.point.bodies()
    }

    /// The point-constraint part.
    #[inline]
    pub fn point(&self) -> &SphericalJoint {
        &self.point
    }

    #[inline]
    pub fn point_mut(&mut self) -> &mut SphericalJoint {
        &mut self.point
    }

    pub fn anchors_world(&self, body1: &Body, body2: &Body) -> (Vec3, Vec3) {
        self.point.anchors_world(body1, body2)
    }

    /// Current world-space hinge axis of each body.
    pub fn axes_world(&self, body1: &Body, body2: &Body) -> (Vec3, Vec3) {
        (body1.rotation * self.local_axis1, body2.rotation * self.local_axis2)
    }

    /// Accumulated angular impulses of the two alignment rows.
    pub fn accumulated_angular_impulse(&self) -> [f32; 2] {
        [self.rows[0].impulse, self.rows[1].impulse]
    }

    pub fn pre_step(&mut self, body1: &mut Body, body2: &mut Body, inv_dt: f32, config: &SolverConfig) {
        self.point.pre_step(body1, body2, inv_dt, config);

        let (a1, a2) = self.axes_world(body1, body2);
        // Row directions turn with body 1 so warm-started impulses keep
        // their meaning.
        let u = body1.rotation * self.local_basis1[0];
        let v = body1.rotation * self.local_basis1[1];
        let error = a1.cross(&a2);
        let bias_factor = if config.position_correction {
            self.point.bias_factor
        } else {
            0.0
        };

        let inv_inertia1 = body1.inv_inertia_world();
        let inv_inertia2 = body2.inv_inertia_world();
        let softness = self.point.softness;

        for (row, axis) in self.rows.iter_mut().zip([u, v]) {
            let k = axis.dot(&(inv_inertia1 * axis)) + axis.dot(&(inv_inertia2 * axis)) + softness;
            row.axis = axis;
            row.mass = if k > 0.0 { 1.0 / k } else { 0.0 };
            row.bias = -bias_factor * inv_dt * error.dot(&axis);

            if config.warm_starting {
                body1.apply_angular_impulse(-axis * row.impulse);
                body2.apply_angular_impulse(axis * row.impulse);
            } else {
                row.impulse = 0.0;
            }
        }
    }

    pub fn apply_impulse(&mut self, body1: &mut Body, body2: &mut Body) {
        self.point.apply_impulse(body1, body2);

        let softness = self.point.softness;
        for row in self.rows.iter_mut() {
            let dw = (body2.angular_velocity - body1.angular_velocity).dot(&row.axis);
            let lambda = row.mass * (row.bias - dw - softness * row.impulse);
            body1.apply_angular_impulse(-row.axis * lambda);
            body2.apply_angular_impulse(row.axis * lambda);
            row.impulse += lambda;
        }
    }
}

/// A joint of any kind.
#[derive(Debug, Clone)]
pub enum Joint {
    Spherical(SphericalJoint),
    Hinge(HingeJoint),
}

impl From<SphericalJoint> for Joint {
    fn from(joint: SphericalJoint) -> Self {
        Joint::Spherical(joint)
    }
}

impl From<HingeJoint> for Joint {
    fn from(joint: HingeJoint) -> Self {
        Joint::Hinge(joint)
    }
}

impl Joint {
    pub fn bodies(&self) -> (BodyId, BodyId) {
        match self {
            Joint::Spherical(j) => j.bodies(),
            Joint::Hinge(j) => j.bodies(),
        }
    }

    /// Whether either body is `id`.
    pub fn involves(&self, id: BodyId) -> bool {
        let (a, b) = self.bodies();
        a == id || b == id
    }

    pub fn anchors_world(&self, body1: &Body, body2: &Body) -> (Vec3, Vec3) {
        match self {
            Joint::Spherical(j) => j.anchors_world(body1, body2),
            Joint::Hinge(j) => j.anchors_world(body1, body2),
        }
    }

    /// Accumulated linear impulse of the point constraint.
    pub fn accumulated_impulse(&self) -> Vec3 {
        match self {
            Joint::Spherical(j) => j.accumulated_impulse(),
            Joint::Hinge(j) => j.point().accumulated_impulse(),
        }
    }

    pub fn set_softness(&mut self, softness: f32) {
        let softness = softness.max(0.0);
        match self {
            Joint::Spherical(j) => j.softness = softness,
            Joint::Hinge(j) => j.point_mut().softness = softness,
        }
    }

    pub fn set_bias_factor(&mut self, bias_factor: f32) {
        match self {
            Joint::Spherical(j) => j.bias_factor = bias_factor,
            Joint::Hinge(j) => j.point_mut().bias_factor = bias_factor,
        }
    }

    pub fn pre_step(&mut self, body1: &mut Body, body2: &mut Body, inv_dt: f32, config: &SolverConfig) {
        match self {
            Joint::Spherical(j) => j.pre_step(body1, body2, inv_dt, config),
            Joint::Hinge(j) => j.pre_step(body1, body2, inv_dt, config),
        }
    }

    pub fn apply_impulse(&mut self, body1: &mut Body, body2: &mut Body) {
        match self {
            Joint::Spherical(j) => j.apply_impulse(body1, body2),
            Joint::Hinge(j) => j.apply_impulse(body1, body2),
        }
    }
}
