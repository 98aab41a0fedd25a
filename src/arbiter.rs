//! Persistent contact constraint for one shape pair.
//!
//! An [`Arbiter`] lives as long as its two shapes keep overlapping. Each step
//! the broad phase hands it a fresh manifold; points whose [`FeatureId`]
//! matches a point of the previous manifold keep their accumulated impulses,
//! which is what makes warm starting work.
//!
//! The solver part is sequential impulses: [`Arbiter::pre_step`] computes
//! effective masses and the velocity bias and re-applies last step's impulses,
//! then [`Arbiter::apply_impulse`] is called once per iteration.
//!
//! [`FeatureId`]: crate::contact::FeatureId

use crate::body::{Body, BodyId};
use crate::collide::collide;
use crate::config::SolverConfig;
use crate::contact::{Contact, Manifold};
use crate::events::{CollisionEvent, TriggerEvent};
use crate::material::{CombinedMaterial, Material};
use crate::math::{tangent_basis, Mat3, Vec3};
use crate::shape::{Shape, ShapeId};

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

/// Unordered shape pair, stored lower id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArbiterKey(ShapeId, ShapeId);

impl ArbiterKey {
    pub fn new(a: ShapeId, b: ShapeId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    #[inline]
    pub fn shape1(&self) -> ShapeId {
        self.0
    }

    #[inline]
    pub fn shape2(&self) -> ShapeId {
        self.1
    }
}

/// Contact constraint between two shapes on two different bodies.
#[derive(Debug, Clone)]
pub struct Arbiter {
    key: ArbiterKey,
    body1: BodyId,
    body2: BodyId,
    contacts: Manifold,
    material: CombinedMaterial,
    trigger: bool,
}

/// Effective mass of an impulse along `direction` applied at arms `r1`/`r2`.
fn effective_mass(
    inv_mass_sum: f32,
    inv_inertia1: &Mat3,
    inv_inertia2: &Mat3,
    r1: &Vec3,
    r2: &Vec3,
    direction: &Vec3,
) -> f32 {
    let rn1 = r1.cross(direction);
    let rn2 = r2.cross(direction);
    let k = inv_mass_sum + rn1.dot(&(inv_inertia1 * rn1)) + rn2.dot(&(inv_inertia2 * rn2));
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

/// Relative velocity of body 2 with respect to body 1 at a contact.
#[inline]
fn relative_velocity(body1: &Body, body2: &Body, contact: &Contact) -> Vec3 {
    body2.velocity_at(&contact.r2) - body1.velocity_at(&contact.r1)
}

#[inline]
fn apply_pair(body1: &mut Body, body2: &mut Body, impulse: Vec3, contact: &Contact) {
    body1.apply_impulse_at(-impulse, contact.r1);
    body2.apply_impulse_at(impulse, contact.r2);
}

impl Arbiter {
    /// Build the arbiter for two shapes and run the narrow phase once.
    ///
    /// The pair is canonicalized: the shape with the lower id becomes shape 1
    /// and its owner body 1, so the result does not depend on argument order.
    pub fn new(
        id_a: BodyId,
        body_a: &Body,
        shape_a: &Shape,
        id_b: BodyId,
        body_b: &Body,
        shape_b: &Shape,
    ) -> Self {
        if shape_b.id() < shape_a.id() {
            return Self::new(id_b, body_b, shape_b, id_a, body_a, shape_a);
        }

        let contacts = collide(body_a, shape_a, body_b, shape_b);
        Self::with_contacts(id_a, shape_a, id_b, shape_b, contacts)
    }

    /// Build the arbiter around a manifold already computed for the pair.
    /// `shape1` must have the lower id and `contacts` must point from body 1
    /// to body 2.
    pub(crate) fn with_contacts(
        id1: BodyId,
        shape1: &Shape,
        id2: BodyId,
        shape2: &Shape,
        contacts: Manifold,
    ) -> Self {
        debug_assert!(shape1.id() <= shape2.id());
        Self {
            key: ArbiterKey(shape1.id(), shape2.id()),
            body1: id1,
            body2: id2,
            contacts,
            material: Material::combine(&shape1.material, &shape2.material),
            trigger: shape1.trigger || shape2.trigger,
        }
    }

    /// Merge a new manifold into this one.
    ///
    /// Points matching an old point by feature id take the new geometry and
    /// keep the old accumulated impulses (zeroed when warm starting is off).
    /// Unmatched points start from zero.
    pub fn update(&mut self, new_contacts: &[Contact], warm_starting: bool) {
        let mut merged = Manifold::new();
        for new in new_contacts {
            let mut contact = Contact::new(new.position, new.normal, new.separation, new.feature);
            if warm_starting {
                if let Some(old) = self.contacts.iter().find(|c| c.feature == new.feature) {
                    contact.normal_impulse = old.normal_impulse;
                    contact.tangent_impulse = old.tangent_impulse;
                    contact.bitangent_impulse = old.bitangent_impulse;
                }
            }
            let _ = merged.push(contact);
        }
        self.contacts = merged;
    }

    /// Prepare every contact for this step's iterations.
    pub fn pre_step(&mut self, body1: &mut Body, body2: &mut Body, inv_dt: f32, config: &SolverConfig) {
        let bias_factor = config.effective_contact_bias();
        let inv_mass_sum = body1.inv_mass() + body2.inv_mass();
        let inv_inertia1 = body1.inv_inertia_world();
        let inv_inertia2 = body2.inv_inertia_world();

        for contact in self.contacts.iter_mut() {
            contact.r1 = contact.position - body1.position;
            contact.r2 = contact.position - body2.position;

            let (tangent, bitangent) = tangent_basis(&contact.normal);
            contact.tangent = tangent;
            contact.bitangent = bitangent;

            let (r1, r2) = (contact.r1, contact.r2);
            contact.mass_normal =
                effective_mass(inv_mass_sum, &inv_inertia1, &inv_inertia2, &r1, &r2, &contact.normal);
            contact.mass_tangent =
                effective_mass(inv_mass_sum, &inv_inertia1, &inv_inertia2, &r1, &r2, &tangent);
            contact.mass_bitangent =
                effective_mass(inv_mass_sum, &inv_inertia1, &inv_inertia2, &r1, &r2, &bitangent);

            contact.bias =
                -bias_factor * inv_dt * (contact.separation + config.allowed_penetration).min(0.0);

            let vn = relative_velocity(body1, body2, contact).dot(&contact.normal);
            if vn < -config.restitution_threshold {
                contact.bias += -self.material.restitution * vn;
            }

            if config.accumulate_impulses {
                let impulse = contact.normal * contact.normal_impulse
                    + contact.tangent * contact.tangent_impulse
                    + contact.bitangent * contact.bitangent_impulse;
                apply_pair(body1, body2, impulse, contact);
            }
        }
    }

    /// One relaxation pass over every contact point.
    pub fn apply_impulse(&mut self, body1: &mut Body, body2: &mut Body, config: &SolverConfig) {
        for contact in self.contacts.iter_mut() {
            // Normal
            let vn = relative_velocity(body1, body2, contact).dot(&contact.normal);
            let mut dpn = contact.mass_normal * (-vn + contact.bias);

            let normal_bound = if config.accumulate_impulses {
                let old = contact.normal_impulse;
                contact.normal_impulse = (old + dpn).max(0.0);
                dpn = contact.normal_impulse - old;
                contact.normal_impulse
            } else {
                dpn = dpn.max(0.0);
                contact.normal_impulse = dpn;
                dpn
            };
            apply_pair(body1, body2, contact.normal * dpn, contact);

            // Friction pyramid: tangent and bitangent clamped independently
            let dv = relative_velocity(body1, body2, contact);
            let vt = dv.dot(&contact.tangent);
            let vb = dv.dot(&contact.bitangent);
            let friction = if (vt * vt + vb * vb).sqrt() < config.friction_threshold {
                self.material.static_friction
            } else {
                self.material.dynamic_friction
            };
            let max_friction = friction * normal_bound;

            let mut dpt = contact.mass_tangent * -vt;
            let mut dpb = contact.mass_bitangent * -vb;
            if config.accumulate_impulses {
                let old_t = contact.tangent_impulse;
                contact.tangent_impulse = (old_t + dpt).clamp(-max_friction, max_friction);
                dpt = contact.tangent_impulse - old_t;

                let old_b = contact.bitangent_impulse;
                contact.bitangent_impulse = (old_b + dpb).clamp(-max_friction, max_friction);
                dpb = contact.bitangent_impulse - old_b;
            } else {
                dpt = dpt.clamp(-max_friction, max_friction);
                dpb = dpb.clamp(-max_friction, max_friction);
                contact.tangent_impulse = dpt;
                contact.bitangent_impulse = dpb;
            }
            apply_pair(
                body1,
                body2,
                contact.tangent * dpt + contact.bitangent * dpb,
                contact,
            );
        }
    }

    #[inline]
    pub fn key(&self) -> ArbiterKey {
        self.key
    }

    /// `(body1, body2)`: owners of the lower-id and higher-id shape.
    #[inline]
    pub fn bodies(&self) -> (BodyId, BodyId) {
        (self.body1, self.body2)
    }

    /// Whether either body is `id`.
    #[inline]
    pub fn involves(&self, id: BodyId) -> bool {
        self.body1 == id || self.body2 == id
    }

    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// `(static, dynamic)` friction of the pair.
    #[inline]
    pub fn friction(&self) -> (f32, f32) {
        (self.material.static_friction, self.material.dynamic_friction)
    }

    #[inline]
    pub fn restitution(&self) -> f32 {
        self.material.restitution
    }

    #[inline]
    pub fn material(&self) -> &CombinedMaterial {
        &self.material
    }

    /// Trigger pairs report overlap but are skipped by the solver.
    #[inline]
    pub fn is_trigger(&self) -> bool {
        self.trigger
    }

    pub(crate) fn trigger_event(&self) -> TriggerEvent {
        TriggerEvent {
            body1: self.body1,
            body2: self.body2,
            shape1: self.key.0,
            shape2: self.key.1,
        }
    }

    pub(crate) fn collision_events(&self) -> impl Iterator<Item = CollisionEvent> + '_ {
        self.contacts.iter().map(move |c| CollisionEvent {
            body1: self.body1,
            body2: self.body2,
            shape1: self.key.0,
            shape2: self.key.1,
            position: c.position,
            normal: c.normal,
            normal_impulse: c.normal_impulse,
            separation: c.separation,
        })
    }
}
