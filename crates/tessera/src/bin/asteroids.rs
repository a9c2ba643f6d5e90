//! # Tessera Asteroids
//!
//! Headless asteroid field driven by the fixed-step game loop.
//!
//! A ship spins in the middle of the field and fires; bullets split large
//! rocks into smaller ones and the field wraps at its edges. A second thread
//! counts destroyed entities through the event bridge.
//!
//! ```bash
//! # Ten simulated seconds, as fast as possible
//! cargo run --bin asteroids
//!
//! # Paced to the tick rate, with a config file
//! RUST_LOG=debug cargo run --bin asteroids -- tessera.toml --realtime
//! ```

use std::f32::consts::TAU;
use std::thread;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera::core::{
    Aspect, Component, ComponentKind, ComponentSet, EcsResult, Engine, EntityId, EntitySystem,
    KindInfo, System, SystemResult, TickContext, Topic, World,
};
use tessera::{EventBridge, GameLoop, GameLoopConfig, RuntimeResult};
use tracing::{debug, info};

/// Field size; positions wrap into `[0, WIDTH) x [0, HEIGHT)`.
const WIDTH: f32 = 800.0;
const HEIGHT: f32 = 600.0;

/// Rocks below this radius are destroyed instead of split.
const MIN_RADIUS: f32 = 10.0;

/// Frames simulated per run.
const FRAMES: u64 = 600;

const BULLET_SPEED: f32 = 300.0;
const BULLET_LIFETIME: f32 = 1.5;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Position {
    x: f32,
    y: f32,
    theta: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Velocity {
    vx: f32,
    vy: f32,
    omega: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Asteroid {
    radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Lifetime {
    remaining: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Ship;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Bullet;

#[derive(Clone, Debug, PartialEq)]
enum Parts {
    Position(Position),
    Velocity(Velocity),
    Asteroid(Asteroid),
    Lifetime(Lifetime),
    Ship(Ship),
    Bullet(Bullet),
}

impl ComponentSet for Parts {
    const KINDS: &'static [KindInfo] = &[
        KindInfo::new(0, "Position"),
        KindInfo::new(1, "Velocity"),
        KindInfo::new(2, "Asteroid"),
        KindInfo::new(3, "Lifetime"),
        KindInfo::new(4, "Ship"),
        KindInfo::new(5, "Bullet"),
    ];

    fn kind(&self) -> ComponentKind {
        match self {
            Self::Position(_) => Position::KIND,
            Self::Velocity(_) => Velocity::KIND,
            Self::Asteroid(_) => Asteroid::KIND,
            Self::Lifetime(_) => Lifetime::KIND,
            Self::Ship(_) => Ship::KIND,
            Self::Bullet(_) => Bullet::KIND,
        }
    }
}

macro_rules! component {
    ($ty:ident, $tag:expr) => {
        impl Component<Parts> for $ty {
            const KIND: ComponentKind = ComponentKind::new($tag);

            fn into_set(self) -> Parts {
                Parts::$ty(self)
            }

            fn from_set(value: &Parts) -> Option<&Self> {
                match value {
                    Parts::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

component!(Position, 0);
component!(Velocity, 1);
component!(Asteroid, 2);
component!(Lifetime, 3);
component!(Ship, 4);
component!(Bullet, 5);

fn spawn_asteroid(
    world: &mut World<Parts>,
    rng: &mut ChaCha8Rng,
    at: Position,
    radius: f32,
) -> EcsResult<EntityId> {
    let rock = world.create_named("asteroid");
    world.insert(rock, at)?;
    world.insert(
        rock,
        Velocity {
            vx: rng.gen_range(-60.0..60.0),
            vy: rng.gen_range(-60.0..60.0),
            omega: rng.gen_range(-1.0..1.0),
        },
    )?;
    world.insert(rock, Asteroid { radius })?;
    Ok(rock)
}

// =============================================================================
// Systems
// =============================================================================

struct Movement;

impl EntitySystem<Parts> for Movement {
    fn name(&self) -> &str {
        "movement"
    }

    fn aspect(&self) -> Aspect {
        Aspect::new().with::<Parts, Position>().with::<Parts, Velocity>()
    }

    fn update_entity(
        &mut self,
        ctx: &TickContext<'_>,
        world: &mut World<Parts>,
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
            Position {
                x: p.x + v.vx * dt,
                y: p.y + v.vy * dt,
                theta: (p.theta + v.omega * dt).rem_euclid(TAU),
            },
        )?;
        Ok(())
    }
}

struct Wrap;

impl EntitySystem<Parts> for Wrap {
    fn name(&self) -> &str {
        "wrap"
    }

    fn aspect(&self) -> Aspect {
        Aspect::new().with::<Parts, Position>()
    }

    fn update_entity(
        &mut self,
        _: &TickContext<'_>,
        world: &mut World<Parts>,
        entity: EntityId,
    ) -> SystemResult {
        let Some(p) = world.component::<Position>(entity)? else {
            return Ok(());
        };
        let wrapped = Position {
            x: p.x.rem_euclid(WIDTH),
            y: p.y.rem_euclid(HEIGHT),
            theta: p.theta,
        };
        // Unchanged payloads are not rewritten
        world.insert(entity, wrapped)?;
        Ok(())
    }
}

/// Every ship fires along its heading once per interval.
struct Gun {
    interval: f32,
    cooldown: f32,
}

impl System<Parts> for Gun {
    fn name(&self) -> &str {
        "gun"
    }

    fn aspects(&self) -> Vec<Aspect> {
        vec![Aspect::new().with::<Parts, Ship>().with::<Parts, Position>()]
    }

    fn update(&mut self, ctx: &TickContext<'_>, world: &mut World<Parts>) -> SystemResult {
        self.cooldown -= ctx.delta_seconds();
        if self.cooldown > 0.0 {
            return Ok(());
        }
        self.cooldown += self.interval;

        let Some(ships) = ctx.primary() else {
            return Ok(());
        };
        for ship in world.view(ships)?.entities() {
            let Some(p) = world.component::<Position>(ship)? else {
                continue;
            };
            let bullet = world.create_named("bullet");
            world.insert(bullet, Bullet)?;
            world.insert(bullet, p)?;
            world.insert(
                bullet,
                Velocity {
                    vx: p.theta.cos() * BULLET_SPEED,
                    vy: p.theta.sin() * BULLET_SPEED,
                    omega: 0.0,
                },
            )?;
            world.insert(
                bullet,
                Lifetime {
                    remaining: BULLET_LIFETIME,
                },
            )?;
        }
        Ok(())
    }
}

/// Bullets against rocks; large rocks split in two.
struct Collision {
    rng: ChaCha8Rng,
    hits: u64,
}

impl System<Parts> for Collision {
    fn name(&self) -> &str {
        "collision"
    }

    fn aspects(&self) -> Vec<Aspect> {
        vec![
            Aspect::new().with::<Parts, Bullet>().with::<Parts, Position>(),
            Aspect::new().with::<Parts, Asteroid>().with::<Parts, Position>(),
        ]
    }

    fn update(&mut self, ctx: &TickContext<'_>, world: &mut World<Parts>) -> SystemResult {
        let &[bullets, rocks] = ctx.collections else {
            return Ok(());
        };
        let targets = world.view(rocks)?.entities();

        for bullet in world.view(bullets)?.entities() {
            let Some(shot) = world.component::<Position>(bullet)? else {
                continue;
            };
            for &rock in &targets {
                if !world.is_alive(rock) {
                    continue;
                }
                let (Some(at), Some(Asteroid { radius })) = (
                    world.component::<Position>(rock)?,
                    world.component::<Asteroid>(rock)?,
                ) else {
                    continue;
                };
                if (at.x - shot.x).hypot(at.y - shot.y) > radius {
                    continue;
                }

                world.destroy(bullet)?;
                world.destroy(rock)?;
                self.hits += 1;
                if radius / 2.0 >= MIN_RADIUS {
                    for _ in 0..2 {
                        spawn_asteroid(world, &mut self.rng, at, radius / 2.0)?;
                    }
                }
                break;
            }
        }
        Ok(())
    }

    fn on_unregister(&mut self, _: &mut World<Parts>) -> SystemResult {
        info!(hits = self.hits, "collision system removed");
        Ok(())
    }
}

struct Aging;

impl EntitySystem<Parts> for Aging {
    fn name(&self) -> &str {
        "aging"
    }

    fn aspect(&self) -> Aspect {
        Aspect::new().with::<Parts, Lifetime>()
    }

    fn update_entity(
        &mut self,
        ctx: &TickContext<'_>,
        world: &mut World<Parts>,
        entity: EntityId,
    ) -> SystemResult {
        let Some(Lifetime { remaining }) = world.component::<Lifetime>(entity)? else {
            return Ok(());
        };
        let remaining = remaining - ctx.delta_seconds();
        if remaining <= 0.0 {
            world.destroy(entity)?;
        } else {
            world.insert(entity, Lifetime { remaining })?;
        }
        Ok(())
    }
}

/// Logs the population every `every` ticks.
struct Census {
    every: u64,
}

impl System<Parts> for Census {
    fn name(&self) -> &str {
        "census"
    }

    fn aspects(&self) -> Vec<Aspect> {
        vec![
            Aspect::new().with::<Parts, Asteroid>(),
            Aspect::new().with::<Parts, Bullet>(),
        ]
    }

    fn update(&mut self, ctx: &TickContext<'_>, world: &mut World<Parts>) -> SystemResult {
        if ctx.tick % self.every != 0 {
            return Ok(());
        }
        let &[rocks, bullets] = ctx.collections else {
            return Ok(());
        };
        info!(
            tick = ctx.tick,
            asteroids = world.view(rocks)?.len(),
            bullets = world.view(bullets)?.len(),
            "census"
        );
        Ok(())
    }
}

fn populate(engine: &mut Engine<Parts>, rng: &mut ChaCha8Rng) -> EcsResult<()> {
    let ship = engine.create_named("ship");
    engine.insert(ship, Ship)?;
    engine.insert(
        ship,
        Position {
            x: WIDTH / 2.0,
            y: HEIGHT / 2.0,
            theta: 0.0,
        },
    )?;
    engine.insert(
        ship,
        Velocity {
            vx: 0.0,
            vy: 0.0,
            omega: 1.5,
        },
    )?;

    for _ in 0..8 {
        let at = Position {
            x: rng.gen_range(0.0..WIDTH),
            y: rng.gen_range(0.0..HEIGHT),
            theta: rng.gen_range(0.0..TAU),
        };
        spawn_asteroid(engine.world_mut(), rng, at, 40.0)?;
    }
    debug!(entities = engine.world().entity_count(), "field populated");
    Ok(())
}

fn main() -> RuntimeResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut realtime = false;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        if arg == "--realtime" {
            realtime = true;
        } else {
            config_path = Some(arg);
        }
    }
    let config = match config_path {
        Some(path) => GameLoopConfig::from_toml_file(path)?,
        None => GameLoopConfig::default(),
    };

    let bridge = EventBridge::new(config.bridge_capacity);
    let mut game = GameLoop::<Parts>::new(config)?;
    bridge.attach(game.engine_mut(), &[Topic::EntityRemoved]);

    let receiver = bridge.receiver();
    let tally = thread::spawn(move || {
        let mut destroyed = 0_u64;
        while receiver.recv().is_some() {
            destroyed += 1;
        }
        destroyed
    });

    let mut rng = ChaCha8Rng::seed_from_u64(0xA57E_0001);
    populate(game.engine_mut(), &mut rng)?;

    let engine = game.engine_mut();
    engine.add_entity_system(Movement, 0)?;
    engine.add_entity_system(Wrap, 1)?;
    engine.add_system(
        Gun {
            interval: 0.25,
            cooldown: 0.0,
        },
        2,
    )?;
    engine.add_system(Collision { rng, hits: 0 }, 3)?;
    engine.add_entity_system(Aging, 4)?;
    engine.add_system(Census { every: 60 }, 10)?;

    if realtime {
        game.run_realtime(FRAMES)?;
    } else {
        game.run_fixed(FRAMES)?;
    }
    game.stats().log_summary();

    let mut engine = game.into_engine();
    engine.shutdown()?;
    let dropped = bridge.dropped();

    // Closing every sender ends the tally
    drop(engine);
    drop(bridge);
    let destroyed = tally.join().unwrap_or_default();
    info!(destroyed, dropped, "asteroids finished");
    Ok(())
}
