//! # Scheduler
//!
//! Ordered system registry and tick dispatcher.
//!
//! ```text
//! update(Δ):
//!   tick += 1
//!   publish Update { tick, Δ }
//!   for system in (priority, insertion order):
//!       on_pre_update ─> update ─> on_post_update
//! ```
//!
//! Systems run one after another on the calling thread. Every structural
//! change a system makes is reflected in the collections before the next
//! system starts. The first error aborts the tick; changes made before it
//! stay committed.

use std::time::{Duration, Instant};

use tracing::{debug, debug_span, warn};

use crate::ecs::{CollectionId, ComponentSet, World};
use crate::error::{EcsError, EcsResult, SystemResult};
use crate::events::{Event, Message};
use crate::system::{System, TickContext};

/// Registration token for a system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

impl SystemId {
    /// Returns the raw registration number.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Wall-clock time spent in one system during a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemTiming {
    /// System name.
    pub name: String,
    /// Time spent in the pre, main and post hooks.
    pub duration: Duration,
}

/// Summary of one completed tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Simulated time step.
    pub delta: Duration,
    /// Wall-clock time of the whole tick.
    pub duration: Duration,
    /// Per-system timings in run order.
    pub systems: Vec<SystemTiming>,
}

impl TickReport {
    /// Returns the slowest system of the tick.
    #[must_use]
    pub fn slowest(&self) -> Option<&SystemTiming> {
        self.systems.iter().max_by_key(|timing| timing.duration)
    }
}

struct Entry<S: ComponentSet, M: Message> {
    id: SystemId,
    priority: i32,
    name: String,
    system: Box<dyn System<S, M>>,
    collections: Vec<CollectionId>,
}

/// Priority-ordered system list.
pub struct Scheduler<S: ComponentSet, M: Message = ()> {
    /// Sorted by priority; equal priorities keep insertion order.
    entries: Vec<Entry<S, M>>,
    next_id: u64,
    tick: u64,
}

impl<S: ComponentSet, M: Message> Scheduler<S, M> {
    /// Creates an empty scheduler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            tick: 0,
        }
    }

    /// Registers a system at `priority` (lower runs earlier).
    ///
    /// The system's aspects become live collections, then
    /// [`System::on_register`] runs exactly once.
    ///
    /// # Errors
    ///
    /// - [`EcsError::DuplicateSystem`] if the name is taken
    /// - [`EcsError::UnknownKind`] if an aspect names an unregistered kind
    /// - [`EcsError::Handler`] if `on_register` fails; nothing is registered
    pub fn add(
        &mut self,
        world: &mut World<S, M>,
        mut system: Box<dyn System<S, M>>,
        priority: i32,
    ) -> EcsResult<SystemId> {
        let name = system.name().to_owned();
        if self.contains(&name) {
            return Err(EcsError::DuplicateSystem(name));
        }

        let mut collections = Vec::new();
        for aspect in system.aspects() {
            match world.collection(aspect) {
                Ok(id) => collections.push(id),
                Err(err) => {
                    release_all(world, &collections);
                    return Err(err);
                }
            }
        }

        if let Err(source) = system.on_register(world) {
            release_all(world, &collections);
            return Err(EcsError::Handler {
                system: name,
                source,
            });
        }

        let id = SystemId(self.next_id);
        self.next_id += 1;
        let at = self.entries.partition_point(|e| e.priority <= priority);
        debug!(system = %name, priority, position = at, "system registered");
        self.entries.insert(
            at,
            Entry {
                id,
                priority,
                name,
                system,
                collections,
            },
        );
        Ok(id)
    }

    /// Unregisters a system by name and hands it back.
    ///
    /// Runs [`System::on_unregister`] exactly once and releases the
    /// system's collections.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnknownSystem`] if no system has this name
    /// - [`EcsError::Handler`] if `on_unregister` fails; the system is
    ///   removed regardless
    pub fn remove(
        &mut self,
        world: &mut World<S, M>,
        name: &str,
    ) -> EcsResult<Box<dyn System<S, M>>> {
        let at = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| EcsError::UnknownSystem(name.to_owned()))?;
        let mut entry = self.entries.remove(at);

        let result = entry.system.on_unregister(world);
        release_all(world, &entry.collections);
        debug!(system = %entry.name, "system removed");

        match result {
            Ok(()) => Ok(entry.system),
            Err(source) => Err(EcsError::Handler {
                system: entry.name,
                source,
            }),
        }
    }

    /// Checks whether a system with this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// `(name, priority)` of every system in run order.
    #[must_use]
    pub fn systems(&self) -> Vec<(&str, i32)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.priority))
            .collect()
    }

    /// Returns the registration token of a system.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<SystemId> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.id)
    }

    /// Collections held by a system, in aspect order.
    #[must_use]
    pub fn collections_of(&self, name: &str) -> Option<&[CollectionId]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.collections.as_slice())
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks if no system is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of ticks started so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Runs one tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Handler`] for the first hook that fails. The
    /// remaining systems do not run this tick.
    pub fn update(&mut self, world: &mut World<S, M>, delta: Duration) -> EcsResult<TickReport> {
        self.tick += 1;
        let tick = self.tick;
        let span = debug_span!("tick", tick);
        let _enter = span.enter();
        let started = Instant::now();

        world.emit(Event::Update { tick, delta });

        let mut systems = Vec::with_capacity(self.entries.len());
        for entry in &mut self.entries {
            let ctx = TickContext {
                tick,
                delta,
                collections: &entry.collections,
            };
            let system_started = Instant::now();
            if let Err(source) = run_hooks(entry.system.as_mut(), &ctx, world) {
                warn!(system = %entry.name, error = %source, "tick aborted");
                return Err(EcsError::Handler {
                    system: entry.name.clone(),
                    source,
                });
            }
            systems.push(SystemTiming {
                name: entry.name.clone(),
                duration: system_started.elapsed(),
            });
        }

        Ok(TickReport {
            tick,
            delta,
            duration: started.elapsed(),
            systems,
        })
    }

    /// Unregisters every system in reverse run order.
    ///
    /// # Errors
    ///
    /// Returns the first `on_unregister` failure after all systems are
    /// removed.
    pub fn clear(&mut self, world: &mut World<S, M>) -> EcsResult<()> {
        let mut first_error = None;
        while let Some(entry) = self.entries.last() {
            let name = entry.name.clone();
            if let Err(err) = self.remove(world, &name) {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<S: ComponentSet, M: Message> Default for Scheduler<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ComponentSet, M: Message> std::fmt::Debug for Scheduler<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("systems", &self.systems())
            .field("tick", &self.tick)
            .finish()
    }
}

fn run_hooks<S: ComponentSet, M: Message>(
    system: &mut dyn System<S, M>,
    ctx: &TickContext<'_>,
    world: &mut World<S, M>,
) -> SystemResult {
    system.on_pre_update(ctx, world)?;
    system.update(ctx, world)?;
    system.on_post_update(ctx, world)
}

fn release_all<S: ComponentSet, M: Message>(
    world: &mut World<S, M>,
    collections: &[CollectionId],
) {
    for &id in collections {
        if let Err(error) = world.release_collection(id) {
            warn!(collection = ?id, %error, "collection already released");
        }
    }
}
