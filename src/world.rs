//! The simulation container and its step loop.
//!
//! A [`World`] owns bodies, joints and the persistent arbiters. Each call to
//! [`World::step`] runs, in order:
//!
//! 1. Broad phase: every pair of bodies (at least one movable) is tested
//!    shape by shape. Pairs with contacts create or refresh an arbiter, pairs
//!    without contacts drop theirs.
//! 2. Listener notification (trigger enter/exit, then the collision batch).
//! 3. Force integration for movable bodies.
//! 4. Pre-step of every solid arbiter, then every joint.
//! 5. `iterations` sweeps of arbiter and joint impulses.
//! 6. Pose integration.
//!
//! Bodies and joints live in slot vectors. Removing one leaves an empty slot,
//! so ids handed out earlier never change meaning.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use log::{debug, trace, warn};

use crate::arbiter::{Arbiter, ArbiterKey};
use crate::body::{Body, BodyId};
use crate::collide::collide;
use crate::config::WorldConfig;
use crate::error::PhysicsError;
use crate::events::{CollisionEvent, ContactListener, ListenerId, TriggerEvent};
use crate::joint::{HingeJoint, Joint, JointId, SphericalJoint};
use crate::math::Vec3;

/// Mutable references to two distinct occupied slots.
fn body_pair_mut(
    slots: &mut [Option<Body>],
    a: BodyId,
    b: BodyId,
) -> Option<(&mut Body, &mut Body)> {
    let (i, j) = (a.0, b.0);
    if i == j || i >= slots.len() || j >= slots.len() {
        return None;
    }
    if i < j {
        let (head, tail) = slots.split_at_mut(j);
        Some((head[i].as_mut()?, tail[0].as_mut()?))
    } else {
        let (head, tail) = slots.split_at_mut(i);
        Some((tail[0].as_mut()?, head[j].as_mut()?))
    }
}

/// Rigid-body world.
///
/// # Example
///
/// ```
/// use embedded_3dphysics::{Body, Shape, Vec3, World};
///
/// let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
/// world.add_body(
///     Body::new_static()
///         .with_position(Vec3::new(0.0, -0.5, 0.0))
///         .with_shape(Shape::cuboid(Vec3::new(10.0, 0.5, 10.0))),
/// );
/// let cube = world.add_body(
///     Body::new(1.0)
///         .with_position(Vec3::new(0.0, 2.0, 0.0))
///         .with_shape(Shape::cuboid(Vec3::new(0.5, 0.5, 0.5))),
/// );
///
/// for _ in 0..60 {
///     world.step(1.0 / 60.0);
/// }
/// assert!(world.body(cube).unwrap().position.y < 2.0);
/// ```
pub struct World {
    config: WorldConfig,
    bodies: Vec<Option<Body>>,
    joints: Vec<Option<Joint>>,
    arbiters: BTreeMap<ArbiterKey, Arbiter>,
    listeners: Vec<(ListenerId, Box<dyn ContactListener>)>,
    next_listener: usize,
}

impl Default for World {
    fn default() -> Self {
        Self::with_config(WorldConfig::default())
    }
}

impl core::fmt::Debug for World {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("World")
            .field("config", &self.config)
            .field("bodies", &self.body_count())
            .field("joints", &self.joint_count())
            .field("arbiters", &self.arbiters.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl World {
    /// Create an empty world with the given gravity and solver iteration
    /// count. All other settings take their defaults.
    pub fn new(gravity: Vec3, iterations: u32) -> Self {
        let config = WorldConfig::default().with_gravity(gravity);
        let solver = config.solver.with_iterations(iterations);
        Self::with_config(config.with_solver(solver))
    }

    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            bodies: Vec::new(),
            joints: Vec::new(),
            arbiters: BTreeMap::new(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Settings take effect from the next step.
    #[inline]
    pub fn config_mut(&mut self) -> &mut WorldConfig {
        &mut self.config
    }

    #[inline]
    pub fn gravity(&self) -> Vec3 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    // -- Bodies --

    /// Add a body. Its id stays valid until the body is removed.
    pub fn add_body(&mut self, body: Body) -> BodyId {
        let id = BodyId(self.bodies.len());
        debug!(
            "add {:?}: mass {}, {} shape(s)",
            id,
            body.mass(),
            body.shapes().len()
        );
        self.bodies.push(Some(body));
        id
    }

    /// Remove a body and every arbiter touching it.
    ///
    /// Fails with [`PhysicsError::BodyHasJoints`] while any joint still
    /// references the body.
    pub fn remove_body(&mut self, id: BodyId) -> Result<Body, PhysicsError> {
        if self.body(id).is_none() {
            return Err(PhysicsError::UnknownBody(id));
        }

        let joints = self.joints().filter(|(_, j)| j.involves(id)).count();
        if joints > 0 {
            warn!("refusing to remove {:?}: {} joint(s) attached", id, joints);
            return Err(PhysicsError::BodyHasJoints { body: id, joints });
        }

        self.arbiters.retain(|key, arbiter| {
            let keep = !arbiter.involves(id);
            if !keep {
                trace!("drop arbiter {:?} with removed body", key);
            }
            keep
        });

        let body = self.bodies[id.0].take().ok_or(PhysicsError::UnknownBody(id))?;
        debug!("remove {:?}", id);
        Ok(body)
    }

    #[inline]
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id.0).and_then(Option::as_ref)
    }

    #[inline]
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Live bodies in slot order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|b| (BodyId(i), b)))
    }

    pub fn bodies_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut Body)> {
        self.bodies
            .iter_mut()
            .enumerate()
            .filter_map(|(i, b)| b.as_mut().map(|b| (BodyId(i), b)))
    }

    /// Number of live bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.iter().flatten().count()
    }

    // -- Joints --

    /// Add a prebuilt joint. Both bodies must exist and differ.
    pub fn add_joint(&mut self, joint: impl Into<Joint>) -> Result<JointId, PhysicsError> {
        let joint = joint.into();
        let (a, b) = joint.bodies();
        if a == b {
            return Err(PhysicsError::SelfJoint(a));
        }
        for id in [a, b] {
            if self.body(id).is_none() {
                return Err(PhysicsError::UnknownBody(id));
            }
        }

        let id = JointId(self.joints.len());
        debug!("add {:?} between {:?} and {:?}", id, a, b);
        self.joints.push(Some(joint));
        Ok(id)
    }

    /// Connect two bodies with a ball-and-socket joint at a world-space
    /// anchor.
    pub fn add_spherical_joint(
        &mut self,
        body1: BodyId,
        body2: BodyId,
        anchor: Vec3,
    ) -> Result<JointId, PhysicsError> {
        let (b1, b2) = self.joint_bodies(body1, body2)?;
        let joint = SphericalJoint::new(body1, b1, body2, b2, anchor);
        self.add_joint(joint)
    }

    /// Connect two bodies with a hinge at a world-space anchor, rotating
    /// about the world-space `axis`.
    pub fn add_hinge_joint(
        &mut self,
        body1: BodyId,
        body2: BodyId,
        anchor: Vec3,
        axis: Vec3,
    ) -> Result<JointId, PhysicsError> {
        let (b1, b2) = self.joint_bodies(body1, body2)?;
        let joint = HingeJoint::new(body1, b1, body2, b2, anchor, axis);
        self.add_joint(joint)
    }

    fn joint_bodies(&self, body1: BodyId, body2: BodyId) -> Result<(&Body, &Body), PhysicsError> {
        if body1 == body2 {
            return Err(PhysicsError::SelfJoint(body1));
        }
        let b1 = self.body(body1).ok_or(PhysicsError::UnknownBody(body1))?;
        let b2 = self.body(body2).ok_or(PhysicsError::UnknownBody(body2))?;
        Ok((b1, b2))
    }

    pub fn remove_joint(&mut self, id: JointId) -> Result<Joint, PhysicsError> {
        let joint = self
            .joints
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(PhysicsError::UnknownJoint(id))?;
        debug!("remove {:?}", id);
        Ok(joint)
    }

    #[inline]
    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id.0).and_then(Option::as_ref)
    }

    #[inline]
    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut Joint> {
        self.joints.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn joints(&self) -> impl Iterator<Item = (JointId, &Joint)> {
        self.joints
            .iter()
            .enumerate()
            .filter_map(|(i, j)| j.as_ref().map(|j| (JointId(i), j)))
    }

    pub fn joint_count(&self) -> usize {
        self.joints.iter().flatten().count()
    }

    // -- Arbiters --

    /// Live arbiters in key order.
    pub fn arbiters(&self) -> impl Iterator<Item = &Arbiter> {
        self.arbiters.values()
    }

    pub fn arbiter(&self, key: ArbiterKey) -> Option<&Arbiter> {
        self.arbiters.get(&key)
    }

    pub fn arbiter_count(&self) -> usize {
        self.arbiters.len()
    }

    /// Remove all bodies, joints and arbiters. Listeners stay registered and
    /// slots are emptied in place, so old ids keep resolving to nothing.
    pub fn clear(&mut self) {
        debug!(
            "clear: {} bodies, {} joints, {} arbiters",
            self.body_count(),
            self.joint_count(),
            self.arbiters.len()
        );
        self.bodies.iter_mut().for_each(|slot| *slot = None);
        self.joints.iter_mut().for_each(|slot| *slot = None);
        self.arbiters.clear();
    }

    // -- Listeners --

    pub fn add_listener(&mut self, listener: Box<dyn ContactListener>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a listener, handing it back.
    pub fn remove_listener(&mut self, id: ListenerId) -> Option<Box<dyn ContactListener>> {
        let index = self.listeners.iter().position(|(lid, _)| *lid == id)?;
        Some(self.listeners.remove(index).1)
    }

    // -- Simulation --

    /// Advance the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };

        let mut entered = Vec::new();
        let mut exited = Vec::new();
        self.broad_phase(&mut entered, &mut exited);
        self.notify(&entered, &exited);

        let gravity = self.config.gravity;
        for body in self.bodies.iter_mut().flatten() {
            body.integrate_forces(dt, &gravity);
        }

        let solver = self.config.solver;
        for arbiter in self.arbiters.values_mut().filter(|a| !a.is_trigger()) {
            let (id1, id2) = arbiter.bodies();
            if let Some((b1, b2)) = body_pair_mut(&mut self.bodies, id1, id2) {
                arbiter.pre_step(b1, b2, inv_dt, &solver);
            }
        }
        for joint in self.joints.iter_mut().flatten() {
            let (id1, id2) = joint.bodies();
            if let Some((b1, b2)) = body_pair_mut(&mut self.bodies, id1, id2) {
                joint.pre_step(b1, b2, inv_dt, &solver);
            }
        }

        for _ in 0..solver.iterations {
            for arbiter in self.arbiters.values_mut().filter(|a| !a.is_trigger()) {
                let (id1, id2) = arbiter.bodies();
                if let Some((b1, b2)) = body_pair_mut(&mut self.bodies, id1, id2) {
                    arbiter.apply_impulse(b1, b2, &solver);
                }
            }
            for joint in self.joints.iter_mut().flatten() {
                let (id1, id2) = joint.bodies();
                if let Some((b1, b2)) = body_pair_mut(&mut self.bodies, id1, id2) {
                    joint.apply_impulse(b1, b2);
                }
            }
        }

        for body in self.bodies.iter_mut().flatten() {
            body.integrate_pose(dt);
        }
    }

    /// Rebuild the arbiter set from scratch geometry, keeping accumulated
    /// impulses of persisting contacts.
    fn broad_phase(&mut self, entered: &mut Vec<TriggerEvent>, exited: &mut Vec<TriggerEvent>) {
        let warm_starting = self.config.solver.warm_starting;
        let mut live = BTreeSet::new();

        for (i, slot_i) in self.bodies.iter().enumerate() {
            let Some(body_i) = slot_i else { continue };
            for (j, slot_j) in self.bodies.iter().enumerate().skip(i + 1) {
                let Some(body_j) = slot_j else { continue };
                if body_i.is_static() && body_j.is_static() {
                    continue;
                }

                for shape_i in body_i.shapes() {
                    for shape_j in body_j.shapes() {
                        // Lower shape id first, matching the arbiter key
                        let (id1, body1, shape1, id2, body2, shape2) =
                            if shape_i.id() <= shape_j.id() {
                                (BodyId(i), body_i, shape_i, BodyId(j), body_j, shape_j)
                            } else {
                                (BodyId(j), body_j, shape_j, BodyId(i), body_i, shape_i)
                            };

                        let contacts = collide(body1, shape1, body2, shape2);
                        if contacts.is_empty() {
                            continue;
                        }

                        let key = ArbiterKey::new(shape1.id(), shape2.id());
                        live.insert(key);

                        let persists = self
                            .arbiters
                            .get(&key)
                            .is_some_and(|old| old.bodies() == (id1, id2));
                        if persists {
                            if let Some(old) = self.arbiters.get_mut(&key) {
                                old.update(&contacts, warm_starting);
                            }
                            continue;
                        }

                        let arbiter = Arbiter::with_contacts(id1, shape1, id2, shape2, contacts);
                        trace!("new arbiter {:?}: {} contact(s)", key, arbiter.contacts().len());
                        if arbiter.is_trigger() {
                            entered.push(arbiter.trigger_event());
                        }
                        self.arbiters.insert(key, arbiter);
                    }
                }
            }
        }

        self.arbiters.retain(|key, arbiter| {
            if live.contains(key) {
                return true;
            }
            trace!("drop arbiter {:?}", key);
            if arbiter.is_trigger() {
                exited.push(arbiter.trigger_event());
            }
            false
        });
    }

    fn notify(&mut self, entered: &[TriggerEvent], exited: &[TriggerEvent]) {
        if self.listeners.is_empty() {
            return;
        }

        let collisions: Vec<CollisionEvent> = self
            .arbiters
            .values()
            .filter(|a| !a.is_trigger())
            .flat_map(|a| a.collision_events())
            .collect();

        for (_, listener) in self.listeners.iter_mut() {
            for event in entered {
                listener.on_trigger_enter(*event);
            }
            for event in exited {
                listener.on_trigger_exit(*event);
            }
            if !collisions.is_empty() {
                listener.on_collisions(&collisions);
            }
        }
    }
}
