//! Properties checked over seeded random operation sequences.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    engine, log, record, sample, Components, Log, Position, TestEngine, Velocity, ALL_KINDS,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::{
    Aspect, CollectionId, Component, EcsError, EntityId, EntitySystem, KindMask, SystemResult,
    TickContext, Topic, World,
};

/// A spread of aspects, including exclusions and the match-all aspect.
fn aspects() -> Vec<Aspect> {
    let [p, v, c, m] = ALL_KINDS;
    vec![
        Aspect::new(),
        Aspect::all_of(&[p]),
        Aspect::all_of(&[p, v]),
        Aspect::all_of(&[p]).none_of(&[v]),
        Aspect::all_of(&[c]),
        Aspect::all_of(&[p, m, c]),
        Aspect::new().exclude(m),
    ]
}

/// Every live entity is in exactly the collections whose aspect it matches,
/// and no collection holds a dead entity.
fn assert_consistent(
    engine: &TestEngine,
    live: &[EntityId],
    collections: &[(Aspect, CollectionId)],
) {
    for &(aspect, id) in collections {
        let view = engine.view(id).unwrap();
        for &e in live {
            let kinds = engine.world().kinds(e).unwrap();
            assert_eq!(
                view.contains(e),
                aspect.matches(kinds),
                "entity {e} with {kinds:?} vs {aspect:?}"
            );
        }
        for member in view.iter() {
            assert!(engine.is_alive(member), "dead member {member} in {aspect:?}");
        }
        let members = view.entities();
        let mut deduped = members.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), members.len(), "duplicate members");
    }
}

#[test]
fn test_collections_match_effective_kinds() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut engine = engine();
    let collections: Vec<_> = aspects()
        .into_iter()
        .map(|a| (a, engine.collection(a).unwrap()))
        .collect();
    let mut live: Vec<EntityId> = Vec::new();

    for step in 0..2_000_u32 {
        match rng.gen_range(0..10) {
            0 | 1 => live.push(engine.create()),
            2 if !live.is_empty() => {
                let e = live.swap_remove(rng.gen_range(0..live.len()));
                engine.destroy(e).unwrap();
            }
            3 | 4 | 5 if !live.is_empty() => {
                let e = live[rng.gen_range(0..live.len())];
                let kind = ALL_KINDS[rng.gen_range(0..ALL_KINDS.len())];
                engine.set(e, kind, sample(kind, step)).unwrap();
            }
            6 | 7 if !live.is_empty() => {
                let e = live[rng.gen_range(0..live.len())];
                let kind = ALL_KINDS[rng.gen_range(0..ALL_KINDS.len())];
                engine.remove(e, kind).unwrap();
            }
            8 if !live.is_empty() => {
                let e = live[rng.gen_range(0..live.len())];
                let kind = ALL_KINDS[rng.gen_range(0..ALL_KINDS.len())];
                let label = if rng.gen_bool(0.5) { "a" } else { "b" };
                engine.define_state(e, label, vec![sample(kind, step)]).unwrap();
            }
            9 if !live.is_empty() => {
                let e = live[rng.gen_range(0..live.len())];
                let label = match rng.gen_range(0..3) {
                    0 => None,
                    1 => Some("a"),
                    _ => Some("b"),
                };
                match engine.change_state(e, label) {
                    Ok(()) | Err(EcsError::UnknownState { .. }) => {}
                    Err(other) => panic!("unexpected {other}"),
                }
            }
            _ => {}
        }
        assert_consistent(&engine, &live, &collections);
    }
}

#[test]
fn test_collection_created_late_sees_existing_entities() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut engine = engine();
    let live: Vec<_> = (0..200_u32)
        .map(|i| {
            let e = engine.create();
            for kind in ALL_KINDS {
                if rng.gen_bool(0.5) {
                    engine.set(e, kind, sample(kind, i)).unwrap();
                }
            }
            e
        })
        .collect();

    let collections: Vec<_> = aspects()
        .into_iter()
        .map(|a| (a, engine.collection(a).unwrap()))
        .collect();
    assert_consistent(&engine, &live, &collections);

    // Populated in creation order
    let everything = engine.view(collections[0].1).unwrap().entities();
    assert_eq!(everything, live);
}

#[test]
fn test_set_then_get() {
    let mut engine = engine();
    let e = engine.create();
    for (i, kind) in ALL_KINDS.into_iter().enumerate() {
        let value = sample(kind, i as u32 + 1);
        engine.set(e, kind, value.clone()).unwrap();
        assert_eq!(engine.get(e, kind).unwrap(), Some(value));
        engine.remove(e, kind).unwrap();
        assert_eq!(engine.get(e, kind).unwrap(), None);
    }
}

#[test]
fn test_set_is_idempotent() {
    let mut engine = engine();
    let movers = engine
        .collection(Aspect::all_of(&[Position::KIND, Velocity::KIND]))
        .unwrap();
    let e = engine.create();
    engine.insert(e, Position::new(1.0, 2.0, 3.0)).unwrap();
    let events = record(
        &mut engine,
        &[Topic::ComponentAdded, Topic::ComponentReplaced],
    );

    engine.insert(e, Velocity::new(1.0, 1.0, 1.0)).unwrap();
    let members = engine.view(movers).unwrap().entities();
    let after_first = events.lock().len();

    engine.insert(e, Velocity::new(1.0, 1.0, 1.0)).unwrap();
    assert_eq!(events.lock().len(), after_first);
    assert_eq!(engine.view(movers).unwrap().entities(), members);
    assert_eq!(
        engine.component::<Velocity>(e).unwrap(),
        Some(Velocity::new(1.0, 1.0, 1.0))
    );
}

#[test]
fn test_destroy_leaves_no_trace() {
    let mut engine = engine();
    let collections: Vec<_> = aspects()
        .into_iter()
        .map(|a| (a, engine.collection(a).unwrap()))
        .collect();

    let e = engine.create();
    for (i, kind) in ALL_KINDS.into_iter().enumerate() {
        engine.set(e, kind, sample(kind, i as u32)).unwrap();
    }
    engine
        .define_state(e, "hover", vec![sample(ALL_KINDS[2], 9)])
        .unwrap();
    engine.change_state(e, Some("hover")).unwrap();
    engine.destroy(e).unwrap();

    for (aspect, id) in collections {
        assert!(!engine.view(id).unwrap().contains(e), "{aspect:?}");
    }
    for kind in ALL_KINDS {
        assert!(matches!(engine.get(e, kind), Err(EcsError::StaleEntity(_))));
    }
    assert!(matches!(engine.world().kinds(e), Err(EcsError::StaleEntity(_))));

    // The reused slot is a different identity
    let f = engine.create();
    assert_eq!(f.index(), e.index());
    assert_ne!(f, e);
    assert_eq!(engine.world().kinds(f).unwrap(), KindMask::EMPTY);
}

struct Integrate;

impl EntitySystem<Components> for Integrate {
    fn name(&self) -> &str {
        "integrate"
    }

    fn aspect(&self) -> Aspect {
        Aspect::all_of(&[Position::KIND, Velocity::KIND])
    }

    fn update_entity(
        &mut self,
        ctx: &TickContext<'_>,
        world: &mut World<Components>,
        entity: EntityId,
    ) -> SystemResult {
        let (Some(p), Some(v)) = (
            world.component::<Position>(entity)?,
            world.component::<Velocity>(entity)?,
        ) else {
            return Ok(());
        };
        let dt = ctx.delta_seconds();
        world.insert(
            entity,
            Position::new(p.x + v.vx * dt, p.y + v.vy * dt, p.theta + v.omega * dt),
        )?;
        // Slow movers come to rest
        if v.vx.abs() < 0.1 {
            world.remove_component::<Velocity>(entity)?;
        }
        Ok(())
    }
}

/// Splits every entity that drifts past the boundary.
struct Splitter;

impl EntitySystem<Components> for Splitter {
    fn name(&self) -> &str {
        "splitter"
    }

    fn aspect(&self) -> Aspect {
        Aspect::all_of(&[Position::KIND])
    }

    fn update_entity(
        &mut self,
        _: &TickContext<'_>,
        world: &mut World<Components>,
        entity: EntityId,
    ) -> SystemResult {
        let Some(p) = world.component::<Position>(entity)? else {
            return Ok(());
        };
        if p.x.abs() > 50.0 {
            world.destroy(entity)?;
            for sign in [-1.0, 1.0] {
                let child = world.create();
                world.insert(child, Position::new(0.0, p.y, 0.0))?;
                world.insert(child, Velocity::new(sign * 0.5, 0.0, 0.0))?;
            }
        }
        Ok(())
    }
}

fn simulate(seed: u64) -> Vec<(EntityId, Option<Position>)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut engine = engine();
    engine.add_entity_system(Splitter, 1).unwrap();
    engine.add_entity_system(Integrate, 0).unwrap();
    for _ in 0..100 {
        let e = engine.create();
        engine
            .insert(e, Position::new(rng.gen_range(-40.0..40.0), rng.gen_range(-40.0..40.0), 0.0))
            .unwrap();
        engine
            .insert(e, Velocity::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), 0.0))
            .unwrap();
    }
    for _ in 0..30 {
        engine.update(Duration::from_millis(500)).unwrap();
    }

    let all = engine.collection(Aspect::new()).unwrap();
    let members = engine.view(all).unwrap().entities();
    members
        .into_iter()
        .map(|e| (e, engine.component::<Position>(e).unwrap()))
        .collect()
}

#[test]
fn test_update_is_deterministic() {
    let first = simulate(42);
    let second = simulate(42);
    assert!(first.len() > 100, "the splitter must have run");
    assert_eq!(first, second);
}

/// Destroys every member it visits and records the visit.
struct Sweeper {
    visited: Log<EntityId>,
}

impl EntitySystem<Components> for Sweeper {
    fn name(&self) -> &str {
        "sweeper"
    }

    fn aspect(&self) -> Aspect {
        Aspect::all_of(&[Velocity::KIND])
    }

    fn update_entity(
        &mut self,
        _: &TickContext<'_>,
        world: &mut World<Components>,
        entity: EntityId,
    ) -> SystemResult {
        self.visited.lock().push(entity);
        world.destroy(entity)?;
        // Replacements match the aspect but belong to the next iteration
        let replacement = world.create();
        world.insert(replacement, Velocity::new(0.0, 0.0, 0.0))?;
        Ok(())
    }
}

#[test]
fn test_destroying_iteration_visits_original_members() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut engine = engine();
    let visited = log();
    engine
        .add_entity_system(
            Sweeper {
                visited: Arc::clone(&visited),
            },
            0,
        )
        .unwrap();

    let mut expected = Vec::new();
    for _ in 0..64 {
        let e = engine.create();
        if rng.gen_bool(0.6) {
            engine.insert(e, Velocity::new(1.0, 0.0, 0.0)).unwrap();
            expected.push(e);
        }
    }

    engine.update(Duration::ZERO).unwrap();
    assert_eq!(*visited.lock(), expected);
}

#[test]
fn test_payload_kind_checked() {
    let mut engine = engine();
    let e = engine.create();
    let wrong = Components::Position(Position::new(0.0, 0.0, 0.0));
    for kind in ALL_KINDS.into_iter().skip(1) {
        match engine.set(e, kind, wrong.clone()) {
            Err(EcsError::KindMismatch { entity, expected, found }) => {
                assert_eq!(entity, e);
                assert_eq!(expected, kind);
                assert_eq!(found, Position::KIND);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(engine.world().kinds(e).unwrap(), KindMask::EMPTY);
}
