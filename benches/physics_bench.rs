//! Benchmarks for the narrow phase and the world step.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use embedded_3dphysics::box_box::collide_box_box;
use embedded_3dphysics::{Body, Quat, Shape, Vec3, World};

const DT: f32 = 1.0 / 60.0;

fn ground() -> Body {
    Body::new_static()
        .with_position(Vec3::new(0.0, -0.5, 0.0))
        .with_shape(Shape::cuboid(Vec3::new(50.0, 0.5, 50.0)))
}

fn bench_box_box(c: &mut Criterion) {
    let h = Vec3::new(0.5, 0.5, 0.5);

    c.bench_function("box_box_face", |b| {
        let p2 = Vec3::new(0.9, 0.0, 0.0);
        b.iter(|| {
            black_box(collide_box_box(
                black_box(&Vec3::zeros()),
                &Quat::identity(),
                &h,
                black_box(&p2),
                &Quat::identity(),
                &h,
            ))
        })
    });

    c.bench_function("box_box_edge", |b| {
        let q1 = Quat::from_axis_angle(&Vec3::x_axis(), core::f32::consts::FRAC_PI_4);
        let q2 = Quat::from_axis_angle(&Vec3::z_axis(), core::f32::consts::FRAC_PI_4);
        let p2 = Vec3::new(0.0, 1.35, 0.0);
        b.iter(|| black_box(collide_box_box(&Vec3::zeros(), &q1, &h, black_box(&p2), &q2, &h)))
    });
}

fn bench_world_step(c: &mut Criterion) {
    c.bench_function("step_box_stack_10", |b| {
        let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
        world.add_body(ground());
        for i in 0..10 {
            world.add_body(
                Body::new(1.0)
                    .with_position(Vec3::new(0.0, 0.5 + i as f32 * 1.0, 0.0))
                    .with_shape(Shape::cuboid(Vec3::new(0.5, 0.5, 0.5))),
            );
        }

        b.iter(|| {
            world.step(DT);
            black_box(&world);
        })
    });

    c.bench_function("step_spheres_100", |b| {
        let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
        world.add_body(ground());
        for i in 0..100 {
            let pos = Vec3::new((i % 10) as f32 * 1.1, 0.5 + (i / 10) as f32 * 1.1, 0.0);
            world.add_body(Body::new(1.0).with_position(pos).with_shape(Shape::ball(0.5)));
        }

        b.iter(|| {
            world.step(DT);
            black_box(&world);
        })
    });

    c.bench_function("step_pendulum_chain_20", |b| {
        let mut world = World::new(Vec3::new(0.0, -9.81, 0.0), 10);
        let mut prev = world.add_body(Body::new_static().with_position(Vec3::new(0.0, 25.0, 0.0)));
        for i in 1..=20 {
            let link = world.add_body(
                Body::new(1.0)
                    .with_position(Vec3::new(i as f32, 25.0, 0.0))
                    .with_shape(Shape::ball(0.2)),
            );
            let anchor = Vec3::new(i as f32 - 1.0, 25.0, 0.0);
            if world.add_spherical_joint(prev, link, anchor).is_err() {
                return;
            }
            prev = link;
        }

        b.iter(|| {
            world.step(DT);
            black_box(&world);
        })
    });
}

criterion_group!(benches, bench_box_box, bench_world_step);
criterion_main!(benches);
