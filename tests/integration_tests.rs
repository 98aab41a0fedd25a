//! Integration tests for embedded-3dphysics
//! These tests run whole scenes through the public API

use std::cell::RefCell;
use std::rc::Rc;

use embedded_3dphysics::{
    collide, Body, CollisionEvent, ContactListener, Material, Quat, Shape, SolverConfig, TriggerEvent, Vec3,
    World, WorldConfig,
};
use proptest::prelude::*;

const DT: f32 = 1.0 / 60.0;

fn unit_box() -> Shape {
    Shape::cuboid(Vec3::new(0.5, 0.5, 0.5))
}

fn ground() -> Body {
    Body::new_static()
        .with_position(Vec3::new(0.0, -0.5, 0.0))
        .with_shape(Shape::cuboid(Vec3::new(20.0, 0.5, 20.0)))
}

// ---------------------------------------------------------------------------
// Narrow phase
// ---------------------------------------------------------------------------

#[test]
fn test_separated_boxes_have_no_contacts() {
    let a = Body::new(1.0).with_shape(unit_box());
    let b = Body::new(1.0).with_position(Vec3::new(1.5, 0.0, 0.0)).with_shape(unit_box());
    assert!(collide(&a, &a.shapes()[0], &b, &b.shapes()[0]).is_empty());
}

#[test]
fn test_face_contact_at_point_nine_spacing() {
    let a = Body::new(1.0).with_shape(unit_box());
    let b = Body::new(1.0).with_position(Vec3::new(0.9, 0.0, 0.0)).with_shape(unit_box());

    let manifold = collide(&a, &a.shapes()[0], &b, &b.shapes()[0]);
    assert_eq!(manifold.len(), 4);
    for contact in &manifold {
        assert!((contact.normal - Vec3::x()).norm() < 1e-4);
        assert!((contact.separation + 0.1).abs() < 1e-4);
        assert!((contact.penetration() - 0.1).abs() < 1e-4);
    }

    let reversed = collide(&b, &b.shapes()[0], &a, &a.shapes()[0]);
    assert_eq!(reversed.len(), 4);
    for contact in &reversed {
        assert!((contact.normal + Vec3::x()).norm() < 1e-4);
    }
}

fn arb_rotation() -> impl Strategy<Value = Quat> {
    (-1.0f32..1.0, -1.0f32..1.0, -1.0f32..1.0, 0.0f32..3.14).prop_map(|(x, y, z, angle)| {
        match nalgebra::Unit::try_new(Vec3::new(x, y, z), 1e-3) {
            Some(axis) => Quat::from_axis_angle(&axis, angle),
            None => Quat::identity(),
        }
    })
}

fn arb_shape() -> impl Strategy<Value = u8> {
    0u8..3
}

fn make_shape(kind: u8) -> Shape {
    match kind {
        0 => Shape::cuboid(Vec3::new(0.5, 0.3, 0.4)),
        1 => Shape::ball(0.45),
        _ => Shape::capsule(0.25, 0.4),
    }
}

proptest! {
    #[test]
    fn prop_manifold_symmetric_under_swap(
        kind_a in arb_shape(),
        kind_b in arb_shape(),
        offset in (-1.2f32..1.2, -1.2f32..1.2, -1.2f32..1.2),
        rot_a in arb_rotation(),
        rot_b in arb_rotation(),
    ) {
        let a = Body::new(1.0).with_rotation(rot_a).with_shape(make_shape(kind_a));
        let b = Body::new(1.0)
            .with_position(Vec3::new(offset.0, offset.1, offset.2))
            .with_rotation(rot_b)
            .with_shape(make_shape(kind_b));

        let ab = collide(&a, &a.shapes()[0], &b, &b.shapes()[0]);
        let ba = collide(&b, &b.shapes()[0], &a, &a.shapes()[0]);

        prop_assert_eq!(ab.len(), ba.len());
        for (p, q) in ab.iter().zip(ba.iter()) {
            prop_assert!((p.normal + q.normal).norm() < 1e-5);
            prop_assert!((p.position - q.position).norm() < 1e-5);
            prop_assert!((p.separation - q.separation).abs() < 1e-5);
            prop_assert_eq!(p.feature, q.feature);
            prop_assert!(p.separation <= 1e-5);
        }
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

#[test]
fn test_mass_and_inertia_invariants() {
    let body = Body::new(4.0).with_shape(unit_box());
    assert!((body.inv_mass() - 0.25).abs() < 1e-6);
    assert!(!body.is_static());
    let inv = body.inv_inertia_local();
    // Unit cube, mass 4: I = m/6 on each axis
    for i in 0..3 {
        assert!((inv[(i, i)] - 6.0 / 4.0).abs() < 1e-4);
    }

    for mass in [0.0, -1.0, f32::INFINITY] {
        let body = Body::new(mass).with_shape(unit_box());
        assert!(body.is_static());
        assert_eq!(body.inv_mass(), 0.0);
        assert_eq!(body.inv_inertia_world(), embedded_3dphysics::Mat3::zeros());
    }
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

#[test]
fn test_box_dropped_from_ten_meters_settles() {
    let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
    world.add_body(ground());
    let id = world.add_body(
        Body::new(1.0)
            .with_position(Vec3::new(0.0, 10.0, 0.0))
            .with_shape(unit_box()),
    );

    for _ in 0..300 {
        world.step(DT);
    }

    let body = world.body(id).unwrap();
    assert!((body.position.y - 0.5).abs() < 0.05, "y = {}", body.position.y);
    assert!(body.speed() < 0.05, "speed = {}", body.speed());
    assert!(body.angular_velocity.norm() < 0.05);
}

#[test]
fn test_resting_box_is_stable_with_warm_starting() {
    let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
    world.add_body(ground());
    let id = world.add_body(
        Body::new(1.0)
            .with_position(Vec3::new(0.0, 0.495, 0.0))
            .with_shape(unit_box()),
    );

    for _ in 0..120 {
        world.step(DT);
        let body = world.body(id).unwrap();
        assert!((body.position.y - 0.495).abs() < 0.02);
        assert!(body.position.xz().norm() < 1e-3);
    }

    assert_eq!(world.arbiter_count(), 1);
    let arbiter = world.arbiters().next().unwrap();
    assert_eq!(arbiter.contacts().len(), 4);
    let total: f32 = arbiter.contacts().iter().map(|c| c.normal_impulse).sum();
    assert!((total - 9.81 * DT).abs() < 0.05);
}

#[test]
fn test_sliding_box_slows_down() {
    let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
    world.add_body(ground());
    let id = world.add_body(
        Body::new(1.0)
            .with_position(Vec3::new(0.0, 0.495, 0.0))
            .with_velocity(Vec3::new(3.0, 0.0, 0.0))
            .with_shape(unit_box().with_material(Material::new(0.8, 0.0))),
    );

    for _ in 0..120 {
        world.step(DT);
    }
    let body = world.body(id).unwrap();
    assert!(body.velocity.x.abs() < 0.05);
    assert!(body.position.x > 0.0);
}

#[test]
fn test_spherical_joint_keeps_anchors_together() {
    let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
    let pivot = world.add_body(Body::new_static().with_position(Vec3::new(0.0, 5.0, 0.0)));
    let bob = world.add_body(
        Body::new(1.0)
            .with_position(Vec3::new(1.0, 5.0, 0.0))
            .with_shape(Shape::ball(0.1)),
    );
    let joint = world
        .add_spherical_joint(pivot, bob, Vec3::new(0.0, 5.0, 0.0))
        .unwrap();

    for _ in 0..180 {
        world.step(DT);
        let j = world.joint(joint).unwrap();
        let (a1, a2) = j.anchors_world(world.body(pivot).unwrap(), world.body(bob).unwrap());
        assert!((a1 - a2).norm() < 0.05, "drift {}", (a1 - a2).norm());
    }

    // The bob swung down below the pivot
    let bob_body = world.body(bob).unwrap();
    assert!(bob_body.position.y < 5.0);
    assert!(((bob_body.position - Vec3::new(0.0, 5.0, 0.0)).norm() - 1.0).abs() < 0.05);
}

#[test]
fn test_hinge_keeps_axes_aligned() {
    let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
    let pivot = world.add_body(Body::new_static());
    let door = world.add_body(
        Body::new(2.0)
            .with_position(Vec3::new(1.0, 0.0, 0.0))
            .with_angular_velocity(Vec3::new(1.0, 2.0, 0.0))
            .with_shape(Shape::cuboid(Vec3::new(1.0, 0.1, 0.5))),
    );
    let joint = world
        .add_hinge_joint(pivot, door, Vec3::zeros(), Vec3::z())
        .unwrap();

    for _ in 0..120 {
        world.step(DT);
    }

    let door_body = world.body(door).unwrap();
    let axis = door_body.rotation * Vec3::z();
    assert!(axis.dot(&Vec3::z()) > 0.99);
    let (a1, a2) = world
        .joint(joint)
        .unwrap()
        .anchors_world(world.body(pivot).unwrap(), door_body);
    assert!((a1 - a2).norm() < 0.05);
}

proptest! {
    #[test]
    fn prop_friction_stays_inside_pyramid(
        vx in -6.0f32..6.0,
        vz in -6.0f32..6.0,
        friction in 0.0f32..1.5,
        drop in 0.0f32..0.05,
    ) {
        let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
        world.add_body(ground());
        world.add_body(
            Body::new(1.0)
                .with_position(Vec3::new(0.0, 0.5 - drop, 0.0))
                .with_velocity(Vec3::new(vx, -1.0, vz))
                .with_shape(unit_box().with_material(Material::new(friction, 0.0))),
        );

        for _ in 0..5 {
            world.step(DT);
            for arbiter in world.arbiters() {
                let (static_mu, dynamic_mu) = arbiter.friction();
                let mu = static_mu.max(dynamic_mu);
                for c in arbiter.contacts() {
                    prop_assert!(c.normal_impulse >= 0.0);
                    let bound = mu * c.normal_impulse + 1e-5;
                    prop_assert!(c.tangent_impulse.abs() <= bound);
                    prop_assert!(c.bitangent_impulse.abs() <= bound);
                }
            }
        }
    }
}

#[test]
fn test_drop_without_impulse_accumulation_lands() {
    let config = WorldConfig::default()
        .with_solver(SolverConfig::default().with_accumulate_impulses(false).with_iterations(20));
    let mut world = World::with_config(config);
    world.add_body(ground());
    let id = world.add_body(
        Body::new(1.0)
            .with_position(Vec3::new(0.0, 2.0, 0.0))
            .with_shape(unit_box()),
    );

    for _ in 0..300 {
        world.step(DT);
        for arbiter in world.arbiters() {
            assert!(arbiter.contacts().iter().all(|c| c.normal_impulse >= 0.0));
        }
    }

    let body = world.body(id).unwrap();
    assert!(body.position.y > 0.3 && body.position.y < 0.7, "y = {}", body.position.y);
    assert!(body.speed() < 1.0, "speed = {}", body.speed());
}

#[test]
fn test_solver_without_warm_starting_still_supports_box() {
    let config = WorldConfig::default()
        .with_solver(SolverConfig::default().with_warm_starting(false).with_iterations(20));
    let mut world = World::with_config(config);
    world.add_body(ground());
    let id = world.add_body(
        Body::new(1.0)
            .with_position(Vec3::new(0.0, 0.495, 0.0))
            .with_shape(unit_box()),
    );

    for _ in 0..120 {
        world.step(DT);
    }
    let y = world.body(id).unwrap().position.y;
    assert!(y > 0.4 && y < 0.55, "y = {y}");
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Log {
    collisions: Vec<CollisionEvent>,
    enters: Vec<TriggerEvent>,
    exits: Vec<TriggerEvent>,
}

struct Recorder(Rc<RefCell<Log>>);

impl ContactListener for Recorder {
    fn on_collisions(&mut self, events: &[CollisionEvent]) {
        self.0.borrow_mut().collisions.extend_from_slice(events);
    }

    fn on_trigger_enter(&mut self, event: TriggerEvent) {
        self.0.borrow_mut().enters.push(event);
    }

    fn on_trigger_exit(&mut self, event: TriggerEvent) {
        self.0.borrow_mut().exits.push(event);
    }
}

#[test]
fn test_collision_events_point_from_ground_to_box() {
    let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
    let g = world.add_body(ground());
    let b = world.add_body(
        Body::new(1.0)
            .with_position(Vec3::new(0.0, 0.45, 0.0))
            .with_shape(unit_box()),
    );

    let log = Rc::new(RefCell::new(Log::default()));
    world.add_listener(Box::new(Recorder(log.clone())));
    world.step(DT);

    let log = log.borrow();
    assert_eq!(log.collisions.len(), 4);
    for event in &log.collisions {
        assert_eq!((event.body1, event.body2), (g, b));
        assert!((event.normal - Vec3::y()).norm() < 1e-4);
        assert!(event.separation < 0.0);
        // First step: nothing carried over yet
        assert_eq!(event.normal_impulse, 0.0);
    }
}

#[test]
fn test_sphere_trigger_enter_and_exit() {
    let mut world = World::new(Vec3::zeros(), 10);
    let sensor = world.add_body(Body::new_static().with_shape(Shape::ball(1.0).as_trigger()));
    let mover = world.add_body(
        Body::new(1.0)
            .with_position(Vec3::new(0.0, 3.0, 0.0))
            .with_velocity(Vec3::new(0.0, -6.0, 0.0))
            .with_shape(Shape::ball(0.5)),
    );

    let log = Rc::new(RefCell::new(Log::default()));
    world.add_listener(Box::new(Recorder(log.clone())));

    for _ in 0..60 {
        world.step(DT);
    }

    let log = log.borrow();
    assert_eq!(log.enters.len(), 1);
    assert_eq!(log.exits.len(), 1);
    assert!(log.collisions.is_empty());
    assert_eq!(log.enters[0].body1, sensor);
    assert_eq!(log.enters[0].body2, mover);
    assert!((world.body(mover).unwrap().velocity.y + 6.0).abs() < 1e-4);
}
