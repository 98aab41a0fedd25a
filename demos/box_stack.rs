//! Box Stack Demonstration
//!
//! Drops a column of unit cubes onto a static ground box and prints the stack
//! height and per-step contact count once per simulated second. The stack
//! settles under warm-started sequential impulses without drifting sideways.
//!
//! Run with: cargo run --example box_stack

use embedded_3dphysics::{Body, Shape, Vec3, World};

const DT: f32 = 1.0 / 60.0;
const BOXES: usize = 5;

fn main() {
    let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);

    world.add_body(
        Body::new_static()
            .with_position(Vec3::new(0.0, -0.5, 0.0))
            .with_shape(Shape::cuboid(Vec3::new(20.0, 0.5, 20.0))),
    );

    let boxes: Vec<_> = (0..BOXES)
        .map(|i| {
            world.add_body(
                Body::new(1.0)
                    .with_position(Vec3::new(0.0, 0.5 + i as f32 * 1.05, 0.0))
                    .with_shape(Shape::cuboid(Vec3::new(0.5, 0.5, 0.5))),
            )
        })
        .collect();

    for frame in 0..=600 {
        if frame % 60 == 0 {
            let contacts: usize = world.arbiters().map(|a| a.contacts().len()).sum();
            let top = boxes
                .last()
                .and_then(|&id| world.body(id))
                .map(|b| b.position)
                .unwrap_or_else(Vec3::zeros);
            println!(
                "t={:5.2}s  arbiters={:2}  contacts={:2}  top=({:6.3}, {:6.3}, {:6.3})",
                frame as f32 * DT,
                world.arbiter_count(),
                contacts,
                top.x,
                top.y,
                top.z
            );
        }
        world.step(DT);
    }
}
