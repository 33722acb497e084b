//! # ECS Performance Benchmark
//!
//! Covers the O(1) paths: entity create/destroy, component add/remove with
//! membership upkeep, packed iteration, and one full system update.
//!
//! Run with: `cargo bench --package trajan_core`

// Benchmarks don't need docs and may have intentionally unused code
#![allow(missing_docs)]
#![allow(dead_code)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trajan_core::{EcsConfig, Entity, Orchestrator, System, SystemFrame};

/// Entity capacity for every benchmark.
const ENTITY_COUNT: usize = 100_000;

#[derive(Clone, Copy, Debug, Default)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, Default)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Default)]
struct Physics;

impl System<()> for Physics {
    fn update(&mut self, mut frame: SystemFrame<'_, ()>) {
        for &entity in frame.entities {
            let Ok(vel) = frame.components.get::<Velocity>(entity).copied() else {
                continue;
            };
            if let Ok(pos) = frame.components.get_mut::<Position>(entity) {
                pos.x += vel.x * frame.dt;
                pos.y += vel.y * frame.dt;
            }
        }
    }
}

fn populated(count: usize) -> (Orchestrator, Vec<Entity>) {
    let mut ecs = Orchestrator::new(EcsConfig::with_capacity(count));
    ecs.register_component::<Position>().unwrap();
    ecs.register_component::<Velocity>().unwrap();
    ecs.create_system::<Physics, (Position, Velocity)>().unwrap();

    let mut entities = Vec::with_capacity(count);
    for i in 0..count {
        let e = ecs.create_entity().unwrap();
        ecs.add_component(e, Position { x: i as f32, y: 0.0 }).unwrap();
        ecs.add_component(e, Velocity { x: 0.1, y: 0.2 }).unwrap();
        entities.push(e);
    }
    (ecs, entities)
}

/// Benchmark: Create entities up to capacity.
fn bench_create_entities(c: &mut Criterion) {
    let mut group = c.benchmark_group("create_entities");

    for count in [1_000, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut ecs: Orchestrator = Orchestrator::new(EcsConfig::with_capacity(count));
                for _ in 0..count {
                    black_box(ecs.create_entity().unwrap());
                }
                ecs.alive_count()
            });
        });
    }

    group.finish();
}

/// Benchmark: Add/remove a component, including signature and membership
/// updates.
fn bench_add_remove_cycle(c: &mut Criterion) {
    let (mut ecs, entities) = populated(ENTITY_COUNT);

    c.bench_function("remove_add_velocity_10K", |b| {
        b.iter(|| {
            for &e in entities.iter().take(10_000) {
                let vel = ecs.remove_component::<Velocity>(e).unwrap();
                ecs.add_component(e, vel).unwrap();
            }
            black_box(ecs.alive_count())
        });
    });
}

/// Benchmark: Packed store iteration (the layout systems benefit from).
fn bench_packed_iteration(c: &mut Criterion) {
    let (ecs, _) = populated(ENTITY_COUNT);

    c.bench_function("packed_read_100K", |b| {
        b.iter(|| {
            let store = ecs.components().store::<Position>().unwrap();
            let sum: f32 = store.as_slice().iter().map(|p| p.x).sum();
            black_box(sum)
        });
    });
}

/// Benchmark: One full system update over every member.
fn bench_system_update(c: &mut Criterion) {
    let (mut ecs, _) = populated(ENTITY_COUNT);

    c.bench_function("physics_update_100K", |b| {
        b.iter(|| {
            ecs.update_systems(0.016, &mut ());
            black_box(ecs.alive_count())
        });
    });
}

/// Benchmark: Entity destroy/create cycle with component cleanup.
fn bench_destroy_create_cycle(c: &mut Criterion) {
    let (mut ecs, mut entities) = populated(ENTITY_COUNT);

    c.bench_function("destroy_create_cycle_10K", |b| {
        b.iter(|| {
            for e in entities.iter_mut().take(10_000) {
                ecs.destroy_entity(*e).unwrap();
                *e = ecs.create_entity().unwrap();
                ecs.add_component(*e, Position::default()).unwrap();
                ecs.add_component(*e, Velocity::default()).unwrap();
            }
            black_box(ecs.alive_count())
        });
    });
}

criterion_group!(
    benches,
    bench_create_entities,
    bench_add_remove_cycle,
    bench_packed_iteration,
    bench_system_update,
    bench_destroy_create_cycle,
);

criterion_main!(benches);
