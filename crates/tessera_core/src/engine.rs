//! # Engine
//!
//! The single surface exposed to host code. Owns a [`World`] and a
//! [`Scheduler`] side by side so that systems can be handed `&mut World`
//! while the scheduler walks its list.
//!
//! The engine takes no locks. Drive it from one thread, or wrap the whole
//! engine in a mutex.

use std::time::Duration;

use tracing::info;

use crate::config::EngineConfig;
use crate::ecs::{
    Aspect, Collection, CollectionId, Component, ComponentKind, ComponentSet, EntityId,
    ObserverId, World,
};
use crate::error::EcsResult;
use crate::events::{Event, Message, SubscriptionId, Topic};
use crate::scheduler::{Scheduler, SystemId, TickReport};
use crate::system::{EntitySystem, ForEach, System};

/// ECS engine: entities, components, collections, systems and events.
///
/// # Example
///
/// ```rust,ignore
/// let mut engine = Engine::<Components>::new()?;
/// engine.add_entity_system(Movement, 0)?;
///
/// let ship = engine.create();
/// engine.insert(ship, Position::new(10.0, 10.0, 12.0))?;
/// engine.insert(ship, Velocity::new(-1.0, -5.0, 1.0))?;
///
/// engine.update(Duration::from_secs(1))?;
/// ```
pub struct Engine<S: ComponentSet, M: Message = ()> {
    world: World<S, M>,
    scheduler: Scheduler<S, M>,
    last_report: Option<TickReport>,
}

impl<S: ComponentSet, M: Message> Engine<S, M> {
    /// Creates an engine with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidRegistry`](crate::EcsError::InvalidRegistry)
    /// if the kind table of `S` is malformed.
    pub fn new() -> EcsResult<Self> {
        Self::with_config(&EngineConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed kind table or invalid settings.
    pub fn with_config(config: &EngineConfig) -> EcsResult<Self> {
        let world = World::with_config(config)?;
        info!(
            kinds = world.registry().len(),
            entity_capacity = config.entity_capacity,
            "engine initialized"
        );
        Ok(Self {
            world,
            scheduler: Scheduler::new(),
            last_report: None,
        })
    }

    /// Shared access to the world.
    #[inline]
    #[must_use]
    pub const fn world(&self) -> &World<S, M> {
        &self.world
    }

    /// Exclusive access to the world.
    #[inline]
    pub fn world_mut(&mut self) -> &mut World<S, M> {
        &mut self.world
    }

    /// The system list.
    #[inline]
    #[must_use]
    pub const fn scheduler(&self) -> &Scheduler<S, M> {
        &self.scheduler
    }

    // =========================================================================
    // Entities and components
    // =========================================================================

    /// See [`World::create`].
    ///
    /// # Panics
    ///
    /// Panics if the entity index space is exhausted.
    pub fn create(&mut self) -> EntityId {
        self.world.create()
    }

    /// See [`World::create_named`].
    ///
    /// # Panics
    ///
    /// Panics if the entity index space is exhausted.
    pub fn create_named(&mut self, name: impl Into<String>) -> EntityId {
        self.world.create_named(name)
    }

    /// See [`World::destroy`].
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` if the entity is not alive.
    pub fn destroy(&mut self, id: EntityId) -> EcsResult<()> {
        self.world.destroy(id)
    }

    /// See [`World::is_alive`].
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.world.is_alive(id)
    }

    /// See [`World::set`].
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity`, `UnknownKind` or `KindMismatch`.
    pub fn set(&mut self, id: EntityId, kind: ComponentKind, payload: S) -> EcsResult<()> {
        self.world.set(id, kind, payload)
    }

    /// See [`World::insert`].
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` or `UnknownKind`.
    pub fn insert<C: Component<S>>(&mut self, id: EntityId, component: C) -> EcsResult<()> {
        self.world.insert(id, component)
    }

    /// See [`World::get`].
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` if the entity is not alive.
    pub fn get(&self, id: EntityId, kind: ComponentKind) -> EcsResult<Option<S>> {
        self.world.get(id, kind)
    }

    /// See [`World::component`].
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` if the entity is not alive.
    pub fn component<C: Component<S>>(&self, id: EntityId) -> EcsResult<Option<C>> {
        self.world.component(id)
    }

    /// See [`World::remove`].
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` or `UnknownKind`.
    pub fn remove(&mut self, id: EntityId, kind: ComponentKind) -> EcsResult<Option<S>> {
        self.world.remove(id, kind)
    }

    /// See [`World::remove_component`].
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` or `UnknownKind`.
    pub fn remove_component<C: Component<S>>(&mut self, id: EntityId) -> EcsResult<Option<C>> {
        self.world.remove_component(id)
    }

    /// See [`World::define_state`].
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` or `UnknownKind`.
    pub fn define_state(&mut self, id: EntityId, label: &str, payloads: Vec<S>) -> EcsResult<()> {
        self.world.define_state(id, label, payloads)
    }

    /// See [`World::change_state`].
    ///
    /// # Errors
    ///
    /// Returns `StaleEntity` or `UnknownState`.
    pub fn change_state(&mut self, id: EntityId, label: Option<&str>) -> EcsResult<()> {
        self.world.change_state(id, label)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// See [`World::collection`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if the aspect names an unregistered kind.
    pub fn collection(&mut self, aspect: Aspect) -> EcsResult<CollectionId> {
        self.world.collection(aspect)
    }

    /// See [`World::release_collection`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection` for a released handle.
    pub fn release_collection(&mut self, id: CollectionId) -> EcsResult<()> {
        self.world.release_collection(id)
    }

    /// See [`World::view`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection` for a released handle.
    pub fn view(&self, id: CollectionId) -> EcsResult<&Collection> {
        self.world.view(id)
    }

    /// See [`World::each`].
    ///
    /// # Errors
    ///
    /// Returns the first error from `f`.
    pub fn each<F, E>(&mut self, id: CollectionId, f: F) -> Result<(), E>
    where
        F: FnMut(&mut World<S, M>, EntityId) -> Result<(), E>,
        E: From<crate::EcsError>,
    {
        self.world.each(id, f)
    }

    /// See [`World::observe`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection` for a released handle.
    pub fn observe<A, R>(
        &mut self,
        id: CollectionId,
        on_add: A,
        on_remove: R,
    ) -> EcsResult<ObserverId>
    where
        A: FnMut(EntityId) + Send + 'static,
        R: FnMut(EntityId) + Send + 'static,
    {
        self.world.observe(id, on_add, on_remove)
    }

    /// See [`World::unobserve`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownCollection` if the observer is not attached.
    pub fn unobserve(&mut self, observer: ObserverId) -> EcsResult<()> {
        self.world.unobserve(observer)
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Registers a whole-collection system.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::add`].
    pub fn add_system<T>(&mut self, system: T, priority: i32) -> EcsResult<SystemId>
    where
        T: System<S, M> + 'static,
    {
        self.add_boxed_system(Box::new(system), priority)
    }

    /// Registers a per-entity system.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::add`].
    pub fn add_entity_system<T>(&mut self, system: T, priority: i32) -> EcsResult<SystemId>
    where
        T: EntitySystem<S, M> + 'static,
    {
        self.add_boxed_system(Box::new(ForEach(system)), priority)
    }

    /// Registers an already boxed system.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::add`].
    pub fn add_boxed_system(
        &mut self,
        system: Box<dyn System<S, M>>,
        priority: i32,
    ) -> EcsResult<SystemId> {
        self.scheduler.add(&mut self.world, system, priority)
    }

    /// Unregisters a system by name.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::remove`].
    pub fn remove_system(&mut self, name: &str) -> EcsResult<Box<dyn System<S, M>>> {
        self.scheduler.remove(&mut self.world, name)
    }

    /// `(name, priority)` of every system in run order.
    #[must_use]
    pub fn systems(&self) -> Vec<(&str, i32)> {
        self.scheduler.systems()
    }

    /// Runs one tick: every system once, in priority order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Handler`](crate::EcsError::Handler) for the
    /// first failing hook.
    pub fn update(&mut self, delta: Duration) -> EcsResult<&TickReport> {
        let report = self.scheduler.update(&mut self.world, delta)?;
        Ok(self.last_report.insert(report))
    }

    /// Report of the last completed tick.
    #[must_use]
    pub const fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    /// Number of ticks started so far.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.scheduler.tick()
    }

    /// Unregisters every system, last-running first.
    ///
    /// # Errors
    ///
    /// Returns the first `on_unregister` failure.
    pub fn shutdown(&mut self) -> EcsResult<()> {
        info!(systems = self.scheduler.len(), "engine shutting down");
        self.scheduler.clear(&mut self.world)
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// See [`World::subscribe`].
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event<M>) + Send + 'static,
    {
        self.world.subscribe(topic, handler)
    }

    /// See [`World::unsubscribe`].
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.world.unsubscribe(id)
    }

    /// See [`World::publish`].
    pub fn publish(&mut self, message: M) {
        self.world.publish(message);
    }
}

impl<S: ComponentSet, M: Message> std::fmt::Debug for Engine<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("world", &self.world)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}
