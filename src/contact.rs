//! Contact points and manifolds produced by the narrow phase.

use crate::math::Vec3;

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

/// Hard cap on points per manifold.
pub const MAX_CONTACT_POINTS: usize = 4;

/// Fixed-capacity set of contact points for one shape pair.
pub type Manifold = heapless::Vec<Contact, MAX_CONTACT_POINTS>;

/// Identifies the geometric features (faces, edges, vertices) that produced a
/// contact point.
///
/// Only equality is meaningful: the same physical feature pair yields the same
/// id from one step to the next, which is what lets an
/// [`Arbiter`](crate::arbiter::Arbiter) carry accumulated impulses forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FeatureId(pub u32);

/// A single point of a contact manifold.
///
/// The geometric part (`position`, `normal`, `separation`, `feature`) comes
/// from the narrow phase. The rest is solver state, owned by the arbiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// World-space contact point.
    pub position: Vec3,
    /// Unit normal pointing from the first body toward the second.
    pub normal: Vec3,
    /// Signed distance along the normal. Negative while penetrating.
    pub separation: f32,
    pub feature: FeatureId,

    /// Accumulated impulse along the normal.
    pub normal_impulse: f32,
    /// Accumulated friction impulse along `tangent`.
    pub tangent_impulse: f32,
    /// Accumulated friction impulse along `bitangent`.
    pub bitangent_impulse: f32,

    pub mass_normal: f32,
    pub mass_tangent: f32,
    pub mass_bitangent: f32,
    /// Target normal velocity (position correction plus restitution).
    pub bias: f32,

    pub tangent: Vec3,
    pub bitangent: Vec3,
    /// Contact point relative to the first body's center of mass.
    pub r1: Vec3,
    /// Contact point relative to the second body's center of mass.
    pub r2: Vec3,
}

impl Contact {
    /// A fresh contact with zeroed solver state.
    pub fn new(position: Vec3, normal: Vec3, separation: f32, feature: FeatureId) -> Self {
        Self {
            position,
            normal,
            separation,
            feature,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            bitangent_impulse: 0.0,
            mass_normal: 0.0,
            mass_tangent: 0.0,
            mass_bitangent: 0.0,
            bias: 0.0,
            tangent: Vec3::zeros(),
            bitangent: Vec3::zeros(),
            r1: Vec3::zeros(),
            r2: Vec3::zeros(),
        }
    }

    /// Penetration depth (positive while overlapping).
    #[inline]
    pub fn penetration(&self) -> f32 {
        -self.separation
    }

    /// Magnitude of the accumulated friction impulse.
    #[inline]
    pub fn friction_impulse(&self) -> f32 {
        let t = self.tangent_impulse;
        let b = self.bitangent_impulse;
        (t * t + b * b).sqrt()
    }
}
