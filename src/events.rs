//! Collision and trigger notifications.
//!
//! Listeners registered on a [`World`](crate::world::World) are called
//! synchronously from [`World::step`](crate::world::World::step), right after
//! the broad phase.

use crate::body::BodyId;
use crate::math::Vec3;
use crate::shape::ShapeId;

/// Handle returned when registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) usize);

/// One contact point of a solid (non-trigger) shape pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub body1: BodyId,
    pub body2: BodyId,
    pub shape1: ShapeId,
    pub shape2: ShapeId,
    /// World-space contact point.
    pub position: Vec3,
    /// Unit normal from `body1` toward `body2`.
    pub normal: Vec3,
    /// Accumulated normal impulse carried into this step.
    pub normal_impulse: f32,
    /// Negative while penetrating.
    pub separation: f32,
}

/// A trigger shape started or stopped overlapping another shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    pub body1: BodyId,
    pub body2: BodyId,
    pub shape1: ShapeId,
    pub shape2: ShapeId,
}

/// Receives world events. Every method defaults to a no-op.
pub trait ContactListener {
    /// All contact points of the current step, in arbiter key order.
    fn on_collisions(&mut self, _events: &[CollisionEvent]) {}

    fn on_trigger_enter(&mut self, _event: TriggerEvent) {}

    fn on_trigger_exit(&mut self, _event: TriggerEvent) {}
}
