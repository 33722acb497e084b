//! # ECS Consistency Tests
//!
//! Scenario tests for the orchestrator, plus seeded random operation
//! sequences that re-check every cross-registry invariant after each call:
//!
//! 1. **Uniqueness**: no two alive entities share a handle or slot
//! 2. **Coherence**: signature bit set iff the component can be fetched
//! 3. **Membership**: members == alive entities matching the requirement
//! 4. **Density**: store rows == attached components, packed from row 0
//!
//! Run with: cargo test --package trajan_core --test ecs_properties

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trajan_core::{
    EcsConfig, EcsError, Entity, Orchestrator, Signature, System, SystemFrame,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Health(i32);

#[derive(Default)]
struct Physics;

impl System<()> for Physics {
    fn update(&mut self, _frame: SystemFrame<'_, ()>) {}
}

#[derive(Default)]
struct Medic;

impl System<()> for Medic {
    fn update(&mut self, _frame: SystemFrame<'_, ()>) {}
}

#[derive(Default)]
struct Census;

impl System<()> for Census {
    fn update(&mut self, _frame: SystemFrame<'_, ()>) {}
}

fn scenario_world(capacity: usize) -> Orchestrator {
    let mut ecs = Orchestrator::new(EcsConfig::with_capacity(capacity));
    ecs.register_component::<Position>().unwrap();
    ecs.register_component::<Velocity>().unwrap();
    ecs
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn scenario_a_membership_follows_components() {
    let mut ecs = scenario_world(16);
    assert_eq!(ecs.component_type::<Position>().unwrap().as_usize(), 0);
    assert_eq!(ecs.component_type::<Velocity>().unwrap().as_usize(), 1);
    ecs.create_system::<Physics, (Position, Velocity)>().unwrap();

    let e = ecs.create_entity().unwrap();

    ecs.add_component(e, Position::default()).unwrap();
    assert!(!ecs.members::<Physics>().unwrap().contains(&e));

    ecs.add_component(e, Velocity::default()).unwrap();
    assert!(ecs.members::<Physics>().unwrap().contains(&e));

    ecs.remove_component::<Position>(e).unwrap();
    assert!(!ecs.members::<Physics>().unwrap().contains(&e));
}

#[test]
fn scenario_b_double_registration() {
    let mut ecs = scenario_world(16);
    let before = ecs.component_type::<Position>().unwrap();

    let err = ecs.register_component::<Position>().unwrap_err();
    assert!(matches!(err, EcsError::AlreadyRegistered { .. }));
    assert_eq!(ecs.components().len(), 2);
    assert_eq!(ecs.component_type::<Position>().unwrap(), before);
}

#[test]
fn scenario_c_remove_missing_component() {
    let mut ecs = scenario_world(16);
    let e = ecs.create_entity().unwrap();
    ecs.add_component(e, Velocity { x: 1.0, y: 0.0 }).unwrap();
    let before = ecs.signature(e).unwrap();

    let err = ecs.remove_component::<Position>(e).unwrap_err();
    assert!(matches!(err, EcsError::MissingComponent { .. }));
    assert_eq!(ecs.signature(e).unwrap(), before);
}

#[test]
fn capacity_boundary_is_side_effect_free() {
    let mut ecs = scenario_world(3);
    let all: Vec<Entity> = (0..3).map(|_| ecs.create_entity().unwrap()).collect();

    assert_eq!(
        ecs.create_entity(),
        Err(EcsError::CapacityExceeded { capacity: 3 })
    );
    assert_eq!(ecs.alive_count(), 3);

    // Still fully functional afterwards
    ecs.destroy_entity(all[1]).unwrap();
    let again = ecs.create_entity().unwrap();
    assert_eq!(again.index(), all[1].index());
}

#[test]
fn recycled_slot_starts_clean() {
    let mut ecs = scenario_world(1);
    ecs.create_system::<Physics, (Position, Velocity)>().unwrap();

    let e = ecs.create_entity().unwrap();
    ecs.add_component(e, Position { x: 3.0, y: 4.0 }).unwrap();
    ecs.add_component(e, Velocity { x: 1.0, y: 1.0 }).unwrap();
    ecs.destroy_entity(e).unwrap();

    let reused = ecs.create_entity().unwrap();
    assert_eq!(reused.index(), e.index());
    assert_ne!(reused, e);
    assert_eq!(ecs.signature(reused).unwrap(), Signature::EMPTY);
    assert!(matches!(
        ecs.get_component::<Position>(reused),
        Err(EcsError::MissingComponent { .. })
    ));
    assert!(ecs.members::<Physics>().unwrap().is_empty());

    // The old handle no longer reaches the new occupant
    assert_eq!(
        ecs.add_component(e, Position::default()),
        Err(EcsError::StaleEntity(e))
    );
    assert_eq!(ecs.signature(reused).unwrap(), Signature::EMPTY);
}

#[test]
fn out_of_range_handle() {
    let mut ecs = scenario_world(4);
    let far = Entity::new(4, 0);

    assert_eq!(
        ecs.destroy_entity(far),
        Err(EcsError::OutOfRange { index: 4, capacity: 4 })
    );
    assert!(matches!(ecs.signature(far), Err(EcsError::OutOfRange { .. })));
}

// ============================================================================
// RANDOMIZED SEQUENCES
// ============================================================================

/// Checks every invariant against the current state.
fn assert_consistent(ecs: &Orchestrator, alive: &[Entity]) {
    // Uniqueness
    let handles: HashSet<Entity> = alive.iter().copied().collect();
    let slots: HashSet<u32> = alive.iter().map(|e| e.index()).collect();
    assert_eq!(handles.len(), alive.len());
    assert_eq!(slots.len(), alive.len());
    assert_eq!(ecs.alive_count(), alive.len());

    let pos = ecs.component_type::<Position>().unwrap();
    let vel = ecs.component_type::<Velocity>().unwrap();
    let hp = ecs.component_type::<Health>().unwrap();

    let mut counts = [0usize; 3];
    for &e in alive {
        let sig = ecs.signature(e).unwrap();

        // Coherence
        assert_eq!(sig.contains(pos), ecs.get_component::<Position>(e).is_ok());
        assert_eq!(sig.contains(vel), ecs.get_component::<Velocity>(e).is_ok());
        assert_eq!(sig.contains(hp), ecs.get_component::<Health>(e).is_ok());

        counts[0] += usize::from(sig.contains(pos));
        counts[1] += usize::from(sig.contains(vel));
        counts[2] += usize::from(sig.contains(hp));

        // Membership
        for (members, required) in [
            (ecs.members::<Physics>().unwrap(), ecs.system_signature::<Physics>().unwrap()),
            (ecs.members::<Medic>().unwrap(), ecs.system_signature::<Medic>().unwrap()),
            (ecs.members::<Census>().unwrap(), ecs.system_signature::<Census>().unwrap()),
        ] {
            assert_eq!(members.contains(&e), sig.matches(required), "entity {e}");
        }
    }

    // No member outlives its entity
    assert_eq!(ecs.members::<Census>().unwrap().len(), alive.len());
    assert!(ecs.members::<Physics>().unwrap().iter().all(|e| handles.contains(e)));
    assert!(ecs.members::<Medic>().unwrap().iter().all(|e| handles.contains(e)));

    // Density: rows == attached components, and every row maps back
    let components = ecs.components();
    for (ty, count) in [pos, vel, hp].into_iter().zip(counts) {
        assert_eq!(components.row_count(ty), Some(count));
    }
    let store = components.store::<Position>().unwrap();
    assert_eq!(store.as_slice().len(), store.entities().len());
    for (row, &e) in store.entities().iter().enumerate() {
        assert!(std::ptr::eq(&store.as_slice()[row], store.get(e).unwrap()));
    }
}

fn run_sequence(seed: u64, capacity: usize, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ecs: Orchestrator = Orchestrator::new(EcsConfig::with_capacity(capacity));
    ecs.register_component::<Position>().unwrap();
    ecs.register_component::<Velocity>().unwrap();
    ecs.register_component::<Health>().unwrap();
    ecs.create_system::<Physics, (Position, Velocity)>().unwrap();
    ecs.create_system::<Medic, (Health,)>().unwrap();
    ecs.create_system::<Census, ()>().unwrap();

    let mut alive: Vec<Entity> = Vec::new();
    let mut dead: Vec<Entity> = Vec::new();

    for _ in 0..steps {
        match rng.gen_range(0..8) {
            0 | 1 => match ecs.create_entity() {
                Ok(e) => alive.push(e),
                Err(err) => {
                    assert_eq!(alive.len(), capacity);
                    assert_eq!(err, EcsError::CapacityExceeded { capacity });
                }
            },
            2 if !alive.is_empty() => {
                let e = alive.swap_remove(rng.gen_range(0..alive.len()));
                ecs.destroy_entity(e).unwrap();
                dead.push(e);
            }
            3 if !dead.is_empty() => {
                // Stale handles are rejected without side effects
                let e = dead[rng.gen_range(0..dead.len())];
                assert_eq!(ecs.destroy_entity(e), Err(EcsError::StaleEntity(e)));
            }
            op if !alive.is_empty() => {
                let e = alive[rng.gen_range(0..alive.len())];
                let had = ecs.signature(e).unwrap();
                let result = match (op, rng.gen_range(0..3)) {
                    (4 | 5, 0) => ecs.add_component(e, Position { x: 1.0, y: 2.0 }),
                    (4 | 5, 1) => ecs.add_component(e, Velocity { x: 0.5, y: 0.5 }),
                    (4 | 5, _) => ecs.add_component(e, Health(10)),
                    (_, 0) => ecs.remove_component::<Position>(e).map(drop),
                    (_, 1) => ecs.remove_component::<Velocity>(e).map(drop),
                    _ => ecs.remove_component::<Health>(e).map(drop),
                };
                match result {
                    Ok(()) => assert_ne!(ecs.signature(e).unwrap(), had),
                    Err(
                        EcsError::DuplicateComponent { .. } | EcsError::MissingComponent { .. },
                    ) => {
                        assert_eq!(ecs.signature(e).unwrap(), had);
                    }
                    Err(other) => panic!("unexpected error {other}"),
                }
            }
            _ => {}
        }

        assert_consistent(&ecs, &alive);
    }
}

#[test]
fn random_sequences_preserve_invariants() {
    for seed in 0..8 {
        run_sequence(seed, 24, 600);
    }
}

#[test]
fn random_sequences_at_tight_capacity() {
    for seed in 100..104 {
        run_sequence(seed, 4, 400);
    }
}
