//! Pendulum Chain Demonstration
//!
//! Hangs a chain of spheres from a static pivot with spherical joints, with a
//! hinged paddle at the end, releases it horizontally and prints the worst
//! joint drift and the chain's kinetic energy once per simulated second.
//!
//! Run with: cargo run --example pendulum_chain

use embedded_3dphysics::{Body, Shape, Vec3, World};

const DT: f32 = 1.0 / 60.0;
const LINKS: usize = 6;
const LINK_LENGTH: f32 = 0.5;

fn main() {
    let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
    let pivot_position = Vec3::new(0.0, 5.0, 0.0);

    let mut prev = world.add_body(Body::new_static().with_position(pivot_position));
    let mut links = Vec::with_capacity(LINKS);
    for i in 1..=LINKS {
        let position = pivot_position + Vec3::new(i as f32 * LINK_LENGTH, 0.0, 0.0);
        let link = world.add_body(
            Body::new(1.0)
                .with_position(position)
                .with_shape(Shape::ball(0.1)),
        );
        let anchor = position - Vec3::new(LINK_LENGTH, 0.0, 0.0);
        world
            .add_spherical_joint(prev, link, anchor)
            .expect("chain links exist");
        links.push(link);
        prev = link;
    }

    let paddle_position = pivot_position + Vec3::new((LINKS as f32 + 1.0) * LINK_LENGTH, 0.0, 0.0);
    let paddle = world.add_body(
        Body::new(0.5)
            .with_position(paddle_position)
            .with_shape(Shape::cuboid(Vec3::new(0.25, 0.05, 0.25))),
    );
    world
        .add_hinge_joint(
            prev,
            paddle,
            paddle_position - Vec3::new(LINK_LENGTH, 0.0, 0.0),
            Vec3::z(),
        )
        .expect("paddle and last link exist");

    for frame in 0..=600 {
        if frame % 60 == 0 {
            let drift = world
                .joints()
                .filter_map(|(_, joint)| {
                    let (a, b) = joint.bodies();
                    let (pa, pb) = joint.anchors_world(world.body(a)?, world.body(b)?);
                    Some((pa - pb).norm())
                })
                .fold(0.0f32, f32::max);
            let energy: f32 = world.bodies().map(|(_, b)| b.kinetic_energy()).sum();
            println!(
                "t={:5.2}s  max drift={:.4}  kinetic energy={:7.3}",
                frame as f32 * DT,
                drift,
                energy
            );
        }
        world.step(DT);
    }
}
