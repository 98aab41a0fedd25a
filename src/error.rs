//! Error types for world bookkeeping.
//!
//! The numerical path (collision, solving, integration) never fails; these
//! errors only cover misuse of body and joint handles.

use thiserror::Error;

use crate::body::BodyId;
use crate::joint::JointId;

/// Errors returned by [`World`](crate::world::World) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhysicsError {
    /// The id does not name a live body.
    #[error("unknown body: {0:?}")]
    UnknownBody(BodyId),

    /// The id does not name a live joint.
    #[error("unknown joint: {0:?}")]
    UnknownJoint(JointId),

    /// A joint must connect two different bodies.
    #[error("joint connects body {0:?} to itself")]
    SelfJoint(BodyId),

    /// Joints still reference the body; remove them first.
    #[error("body {body:?} is still referenced by {joints} joint(s)")]
    BodyHasJoints { body: BodyId, joints: usize },
}
