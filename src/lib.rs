//! Rigid-body physics core for `no_std` targets.
//!
//! Bodies carry one or more collision [`Shape`]s (box, sphere, capsule). A
//! [`World`] finds touching shape pairs with an all-pairs broad phase, builds
//! contact manifolds in the narrow phase and resolves them with a
//! sequential-impulse solver: accumulated impulses, warm starting keyed on
//! contact feature ids, Baumgarte position correction and a friction pyramid.
//! [`SphericalJoint`] and [`HingeJoint`] share the same solver loop.
//!
//! ```
//! use embedded_3dphysics::{Body, Shape, Vec3, World};
//!
//! let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
//! world.add_body(
//!     Body::new_static()
//!         .with_position(Vec3::new(0.0, -0.5, 0.0))
//!         .with_shape(Shape::cuboid(Vec3::new(20.0, 0.5, 20.0))),
//! );
//! let ball = world.add_body(
//!     Body::new(1.0)
//!         .with_position(Vec3::new(0.0, 3.0, 0.0))
//!         .with_shape(Shape::ball(0.5)),
//! );
//!
//! world.step(1.0 / 60.0);
//! assert!(world.body(ball).unwrap().velocity.y < 0.0);
//! ```
#![no_std]

extern crate alloc;

pub mod arbiter;
pub mod body;
pub mod box_box;
pub mod collide;
pub mod config;
pub mod contact;
pub mod error;
pub mod events;
pub mod joint;
pub mod material;
pub mod math;
pub mod shape;
pub mod world;

pub use arbiter::{Arbiter, ArbiterKey};
pub use body::{Body, BodyId};
pub use collide::collide;
pub use config::{SolverConfig, WorldConfig};
pub use contact::{Contact, FeatureId, Manifold, MAX_CONTACT_POINTS};
pub use error::PhysicsError;
pub use events::{CollisionEvent, ContactListener, ListenerId, TriggerEvent};
pub use joint::{HingeJoint, Joint, JointId, SphericalJoint};
pub use material::{CombineMode, CombinedMaterial, Material};
pub use math::{Mat3, Quat, Vec3};
pub use shape::{Geometry, Shape, ShapeId, ShapeKind};
pub use world::World;
