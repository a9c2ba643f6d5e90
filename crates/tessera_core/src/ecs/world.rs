//! # ECS World
//!
//! The central container for entities, components, collections and the
//! event bus. Every structural mutation goes through here so that
//! collections and subscribers stay consistent:
//!
//! 1. validate the request (stale identity, unknown kind, payload shape)
//! 2. apply it to the entity store
//! 3. re-evaluate collection membership for the touched entity
//! 4. queue the resulting events
//! 5. deliver observer callbacks, then bus events
//!
//! Step 5 runs only after the store and every collection agree, so
//! callbacks never see an intermediate state.

use tracing::{debug, trace};

use super::aspect::Aspect;
use super::collection::{Collection, CollectionId, CollectionStore, Membership, ObserverId};
use super::component::{Component, ComponentKind, ComponentSet, KindMask};
use super::entity::EntityId;
use super::registry::ComponentRegistry;
use super::storage::{EntityStore, Slot};
use crate::config::EngineConfig;
use crate::error::{EcsError, EcsResult};
use crate::events::{Event, EventBus, Message, SubscriptionId, Topic};

/// The ECS World - container for all simulation state.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::<Components>::new()?;
///
/// let ship = world.create();
/// world.insert(ship, Position::new(10.0, 10.0, 12.0))?;
/// let movers = world.collection(Aspect::new().with::<Components, Position>())?;
/// ```
pub struct World<S: ComponentSet, M: Message = ()> {
    registry: ComponentRegistry,
    entities: EntityStore<S>,
    collections: CollectionStore,
    bus: EventBus<M>,
    /// Membership transitions waiting for observer delivery.
    membership: Vec<Membership>,
}

impl<S: ComponentSet, M: Message> World<S, M> {
    /// Creates a world with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidRegistry`] if the kind table of `S` is
    /// malformed.
    pub fn new() -> EcsResult<Self> {
        Self::with_config(&EngineConfig::default())
    }

    /// Creates a world with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidRegistry`] for a malformed kind table and
    /// [`EcsError::Config`] for out-of-range settings.
    pub fn with_config(config: &EngineConfig) -> EcsResult<Self> {
        config.validate()?;
        let registry = ComponentRegistry::from_set::<S>()?;
        debug!(kinds = registry.len(), "world created");
        Ok(Self {
            entities: EntityStore::new(registry.width(), config.entity_capacity),
            collections: CollectionStore::new(
                config.compaction_ratio,
                config.collect_unused_collections,
            ),
            bus: EventBus::new(config.event_queue_capacity),
            membership: Vec::new(),
            registry,
        })
    }

    /// The kind table this world was built for.
    #[inline]
    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with an empty mapping and no active state.
    ///
    /// # Panics
    ///
    /// Panics if all 2^32 - 1 entity indices are in use at once.
    pub fn create(&mut self) -> EntityId {
        self.spawn(None)
    }

    /// Creates a named entity.
    ///
    /// # Panics
    ///
    /// Panics if all 2^32 - 1 entity indices are in use at once.
    pub fn create_named(&mut self, name: impl Into<String>) -> EntityId {
        self.spawn(Some(name.into()))
    }

    fn spawn(&mut self, name: Option<String>) -> EntityId {
        let id = self.entities.spawn(name);
        debug!(entity = %id, "entity created");
        self.collections
            .reconcile(id, None, Some(KindMask::EMPTY), &mut self.membership);
        self.bus.enqueue(Event::EntityAdded { entity: id });
        self.flush();
        id
    }

    /// Destroys an entity.
    ///
    /// Every effective kind is reported removed (in tag order), the entity
    /// leaves every collection, and its identity becomes stale.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn destroy(&mut self, id: EntityId) -> EcsResult<()> {
        let kinds = self.entities.despawn(id)?;
        debug!(entity = %id, kinds = kinds.len(), "entity destroyed");
        self.collections
            .reconcile(id, Some(kinds), None, &mut self.membership);
        for kind in kinds {
            self.bus.enqueue(Event::ComponentRemoved { entity: id, kind });
        }
        self.bus.enqueue(Event::EntityRemoved { entity: id });
        self.flush();
        Ok(())
    }

    /// Checks whether the identity refers to a live entity.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns the entity's name.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn name(&self, id: EntityId) -> EcsResult<Option<&str>> {
        Ok(self.entities.slot(id)?.name())
    }

    /// Returns the earliest-created live entity with this name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .filter(|(_, slot)| slot.name() == Some(name))
            .min_by_key(|(_, slot)| slot.spawn_seq())
            .map(|(id, _)| id)
    }

    /// Returns the entity's effective kind set (base ⊕ active overlay).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn kinds(&self, id: EntityId) -> EcsResult<KindMask> {
        Ok(self.entities.slot(id)?.effective_mask())
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches or replaces a component.
    ///
    /// Setting a value equal to the stored one is a no-op. Writing a kind
    /// that the active overlay shadows updates the base mapping only and
    /// is reported once the overlay is deactivated.
    ///
    /// # Errors
    ///
    /// - [`EcsError::StaleEntity`] if the entity is not alive
    /// - [`EcsError::UnknownKind`] if `kind` is not registered
    /// - [`EcsError::KindMismatch`] if `payload` is not of kind `kind`
    pub fn set(&mut self, id: EntityId, kind: ComponentKind, payload: S) -> EcsResult<()> {
        self.entities.slot(id)?;
        self.registry.check(kind)?;
        let found = payload.kind();
        if found != kind {
            return Err(EcsError::KindMismatch {
                entity: id,
                expected: kind,
                found,
            });
        }

        let slot = self.entities.slot_mut(id)?;
        if slot.base().get(kind) == Some(&payload) {
            return Ok(());
        }
        let before = slot.effective_mask();
        let shadowed = slot.overlay_mask().contains(kind);
        let previous = slot.set_base(kind, payload);
        let after = slot.effective_mask();

        if shadowed {
            trace!(entity = %id, %kind, "base component set under overlay");
            return Ok(());
        }
        if previous.is_some() {
            trace!(entity = %id, %kind, "component replaced");
            self.bus.enqueue(Event::ComponentReplaced { entity: id, kind });
        } else {
            trace!(entity = %id, %kind, "component added");
            self.collections
                .reconcile(id, Some(before), Some(after), &mut self.membership);
            self.bus.enqueue(Event::ComponentAdded { entity: id, kind });
        }
        self.flush();
        Ok(())
    }

    /// Attaches or replaces a typed component. See [`set`](Self::set).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] or [`EcsError::UnknownKind`].
    pub fn insert<C: Component<S>>(&mut self, id: EntityId, component: C) -> EcsResult<()> {
        self.set(id, C::KIND, component.into_set())
    }

    /// Returns a snapshot of the effective payload for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn get(&self, id: EntityId, kind: ComponentKind) -> EcsResult<Option<S>> {
        Ok(self.entities.slot(id)?.get(kind).cloned())
    }

    /// Returns a snapshot of a typed component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn component<C: Component<S>>(&self, id: EntityId) -> EcsResult<Option<C>> {
        Ok(self
            .entities
            .slot(id)?
            .get(C::KIND)
            .and_then(C::from_set)
            .cloned())
    }

    /// Checks whether `kind` is effectively present.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn has_kind(&self, id: EntityId, kind: ComponentKind) -> EcsResult<bool> {
        Ok(self.entities.slot(id)?.effective_mask().contains(kind))
    }

    /// Checks whether a typed component is effectively present.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn has<C: Component<S>>(&self, id: EntityId) -> EcsResult<bool> {
        self.has_kind(id, C::KIND)
    }

    /// Detaches a component from the base mapping.
    ///
    /// Absent kinds are a silent no-op. Returns the detached payload.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] or [`EcsError::UnknownKind`].
    pub fn remove(&mut self, id: EntityId, kind: ComponentKind) -> EcsResult<Option<S>> {
        self.entities.slot(id)?;
        self.registry.check(kind)?;

        let slot = self.entities.slot_mut(id)?;
        let before = slot.effective_mask();
        let Some(previous) = slot.remove_base(kind) else {
            return Ok(None);
        };
        let after = slot.effective_mask();

        if after.contains(kind) {
            // Still supplied by the active overlay; the effective value is unchanged
            trace!(entity = %id, %kind, "base component removed under overlay");
            return Ok(Some(previous));
        }
        trace!(entity = %id, %kind, "component removed");
        self.collections
            .reconcile(id, Some(before), Some(after), &mut self.membership);
        self.bus.enqueue(Event::ComponentRemoved { entity: id, kind });
        self.flush();
        Ok(Some(previous))
    }

    /// Detaches a typed component. See [`remove`](Self::remove).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] or [`EcsError::UnknownKind`].
    pub fn remove_component<C: Component<S>>(&mut self, id: EntityId) -> EcsResult<Option<C>> {
        let removed = self.remove(id, C::KIND)?;
        Ok(removed.as_ref().and_then(C::from_set).cloned())
    }

    // =========================================================================
    // State overlays
    // =========================================================================

    /// Stores (or replaces) a named overlay.
    ///
    /// Later payloads of the same kind win. Redefining the active overlay
    /// takes effect immediately.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] or [`EcsError::UnknownKind`].
    pub fn define_state(
        &mut self,
        id: EntityId,
        label: &str,
        payloads: Vec<S>,
    ) -> EcsResult<()> {
        let slot = self.entities.slot(id)?;
        for payload in &payloads {
            self.registry.check(payload.kind())?;
        }
        if slot.active_state() == Some(label) {
            self.restyle(id, false, |slot| slot.define_state(label, payloads))
        } else {
            self.entities.slot_mut(id)?.define_state(label, payloads);
            Ok(())
        }
    }

    /// Drops a named overlay, deactivating it first if active.
    ///
    /// Returns `false` if no overlay had this label.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn remove_state(&mut self, id: EntityId, label: &str) -> EcsResult<bool> {
        let slot = self.entities.slot(id)?;
        if !slot.has_state(label) {
            return Ok(false);
        }
        if slot.active_state() == Some(label) {
            self.restyle(id, true, |slot| {
                slot.remove_state(label);
            })?;
        } else {
            self.entities.slot_mut(id)?.remove_state(label);
        }
        Ok(true)
    }

    /// Activates an overlay, or returns to the base mapping with `None`.
    ///
    /// Emits added/removed/replaced signals for every kind whose effective
    /// value changes, then [`Event::StateChanged`].
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`], or [`EcsError::UnknownState`] if
    /// `label` was never defined on this entity.
    pub fn change_state(&mut self, id: EntityId, label: Option<&str>) -> EcsResult<()> {
        let slot = self.entities.slot(id)?;
        if let Some(label) = label {
            if !slot.has_state(label) {
                return Err(EcsError::UnknownState {
                    entity: id,
                    label: label.to_owned(),
                });
            }
        }
        if slot.active_state() == label {
            return Ok(());
        }
        self.restyle(id, true, |slot| slot.set_active(label))
    }

    /// Returns the active overlay label.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn active_state(&self, id: EntityId) -> EcsResult<Option<&str>> {
        Ok(self.entities.slot(id)?.active_state())
    }

    /// Labels of every overlay defined on the entity, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StaleEntity`] if the entity is not alive.
    pub fn states(&self, id: EntityId) -> EcsResult<Vec<&str>> {
        let mut labels: Vec<&str> = self.entities.slot(id)?.state_labels().collect();
        labels.sort_unstable();
        Ok(labels)
    }

    /// Applies an overlay change and reports every effective difference.
    fn restyle<F>(&mut self, id: EntityId, label_changed: bool, change: F) -> EcsResult<()>
    where
        F: FnOnce(&mut Slot<S>),
    {
        let slot = self.entities.slot_mut(id)?;
        let before = slot.effective_mask();
        let old_overlay = slot.overlay_mask();
        let shadowed: Vec<(ComponentKind, S)> = old_overlay
            .iter()
            .filter_map(|kind| slot.get(kind).map(|value| (kind, value.clone())))
            .collect();

        change(slot);

        let after = slot.effective_mask();
        let touched = old_overlay | slot.overlay_mask();
        for kind in touched {
            let old = if old_overlay.contains(kind) {
                shadowed.iter().find(|(k, _)| *k == kind).map(|(_, v)| v)
            } else {
                slot.base().get(kind)
            };
            let event = match (old, slot.get(kind)) {
                (None, Some(_)) => Event::ComponentAdded { entity: id, kind },
                (Some(_), None) => Event::ComponentRemoved { entity: id, kind },
                (Some(a), Some(b)) if a != b => Event::ComponentReplaced { entity: id, kind },
                _ => continue,
            };
            self.bus.enqueue(event);
        }

        let state = label_changed.then(|| slot.active_state().map(str::to_owned));
        debug!(entity = %id, state = ?slot.active_state(), "state overlay changed");

        self.collections
            .reconcile(id, Some(before), Some(after), &mut self.membership);
        if let Some(state) = state {
            self.bus.enqueue(Event::StateChanged { entity: id, state });
        }
        self.flush();
        Ok(())
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Takes a reference to the collection for `aspect`, creating it on
    /// first request.
    ///
    /// A new collection is populated with every live matching entity in
    /// creation order. Release the reference with
    /// [`release_collection`](Self::release_collection).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownKind`] if the aspect names an
    /// unregistered kind.
    pub fn collection(&mut self, aspect: Aspect) -> EcsResult<CollectionId> {
        if let Some(kind) = aspect.out_of_range() {
            return Err(EcsError::UnknownKind(kind));
        }
        self.registry.check_mask(aspect.kinds())?;
        let entities = &self.entities;
        Ok(self.collections.acquire(aspect, || {
            entities.collect_in_spawn_order(|slot| aspect.matches(slot.effective_mask()))
        }))
    }

    /// Drops a reference taken by [`collection`](Self::collection).
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownCollection`] for a released handle.
    pub fn release_collection(&mut self, id: CollectionId) -> EcsResult<()> {
        self.collections.release(id).map(|_| ())
    }

    /// Returns the live collection for a cached aspect without taking a
    /// reference.
    #[must_use]
    pub fn find_collection(&self, aspect: &Aspect) -> Option<CollectionId> {
        self.collections.find(aspect)
    }

    /// Read access to a collection.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownCollection`] for a released handle.
    pub fn view(&self, id: CollectionId) -> EcsResult<&Collection> {
        self.collections.get(id)
    }

    /// Snapshot of a collection's members in first-match order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownCollection`] for a released handle.
    pub fn entities(&self, id: CollectionId) -> EcsResult<Vec<EntityId>> {
        Ok(self.view(id)?.entities())
    }

    /// First member of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownCollection`] for a released handle.
    pub fn first(&self, id: CollectionId) -> EcsResult<Option<EntityId>> {
        Ok(self.view(id)?.first())
    }

    /// Calls `f` for every member of the collection.
    ///
    /// Iterates the membership as it was when the call began. `f` may mutate
    /// the world freely; entities it destroys are skipped if not yet
    /// visited, entities that start matching are left to the next caller.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first error from `f`, or
    /// [`EcsError::UnknownCollection`] for a released handle.
    pub fn each<F, E>(&mut self, id: CollectionId, mut f: F) -> Result<(), E>
    where
        F: FnMut(&mut Self, EntityId) -> Result<(), E>,
        E: From<EcsError>,
    {
        let snapshot = self.entities(id)?;
        for entity in snapshot {
            if self.is_alive(entity) {
                f(self, entity)?;
            }
        }
        Ok(())
    }

    /// Registers membership callbacks on a collection.
    ///
    /// The observer holds a collection reference until
    /// [`unobserve`](Self::unobserve). Callbacks run after the mutation
    /// that caused the transition has fully committed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownCollection`] for a released handle.
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
        self.collections
            .observe(id, Box::new(on_add), Box::new(on_remove))
    }

    /// Detaches an observer and drops its collection reference.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownCollection`] if the observer is not attached.
    pub fn unobserve(&mut self, observer: ObserverId) -> EcsResult<()> {
        self.collections.unobserve(observer)
    }

    /// Number of live collections.
    #[must_use]
    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Subscribes a handler to a topic.
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event<M>) + Send + 'static,
    {
        self.bus.subscribe(topic, handler)
    }

    /// Removes a subscription. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Publishes a host message on its custom topic.
    pub fn publish(&mut self, message: M) {
        self.emit(Event::Custom(message));
    }

    /// Publishes any event and delivers it synchronously.
    pub(crate) fn emit(&mut self, event: Event<M>) {
        self.bus.enqueue(event);
        self.flush();
    }

    /// The underlying bus.
    #[must_use]
    pub const fn bus(&self) -> &EventBus<M> {
        &self.bus
    }

    /// Delivers queued observer notifications, then queued bus events.
    fn flush(&mut self) {
        for membership in self.membership.drain(..) {
            self.collections.deliver(membership);
        }
        self.bus.drain();
    }
}

impl<S: ComponentSet, M: Message> std::fmt::Debug for World<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("kinds", &self.registry.len())
            .field("entities", &self.entities.len())
            .field("collections", &self.collections.len())
            .field("bus", &self.bus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Color, Components, Mesh, Position, Velocity};
    use std::sync::{Arc, Mutex};

    fn world() -> World<Components> {
        World::new().unwrap()
    }

    fn record(world: &mut World<Components>, topics: &[Topic]) -> Arc<Mutex<Vec<Event>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        for &topic in topics {
            let sink = Arc::clone(&log);
            world.subscribe(topic, move |event| sink.lock().unwrap().push(event.clone()));
        }
        log
    }

    #[test]
    fn test_set_get_remove() {
        let mut world = world();
        let e = world.create();
        let pos = Position::new(1.0, 2.0, 3.0);

        world.insert(e, pos).unwrap();
        assert_eq!(world.component::<Position>(e).unwrap(), Some(pos));
        assert!(world.has::<Position>(e).unwrap());

        assert_eq!(world.remove_component::<Position>(e).unwrap(), Some(pos));
        assert_eq!(world.component::<Position>(e).unwrap(), None);
        // Absent kinds are a silent no-op
        assert_eq!(world.remove(e, Position::KIND).unwrap(), None);
    }

    #[test]
    fn test_set_validates_in_order() {
        let mut world = world();
        let e = world.create();
        let payload = Components::Velocity(Velocity::new(0.0, 0.0, 0.0));

        match world.set(e, Position::KIND, payload.clone()) {
            Err(EcsError::KindMismatch { entity, expected, found }) => {
                assert_eq!(entity, e);
                assert_eq!(expected, Position::KIND);
                assert_eq!(found, Velocity::KIND);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            world.set(e, ComponentKind::new(40), payload.clone()),
            Err(EcsError::UnknownKind(_))
        ));

        world.destroy(e).unwrap();
        assert!(matches!(
            world.set(e, ComponentKind::new(40), payload),
            Err(EcsError::StaleEntity(_))
        ));
    }

    #[test]
    fn test_snapshots_do_not_alias() {
        let mut world = world();
        let e = world.create();
        world.insert(e, Position::new(1.0, 1.0, 1.0)).unwrap();

        let mut copy = world.component::<Position>(e).unwrap().unwrap();
        copy.x = 99.0;
        assert_eq!(world.component::<Position>(e).unwrap().unwrap().x, 1.0);
    }

    #[test]
    fn test_add_then_replace_events() {
        let mut world = world();
        let e = world.create();
        let log = record(
            &mut world,
            &[Topic::ComponentAdded, Topic::ComponentReplaced],
        );

        world.insert(e, Color::Green).unwrap();
        world.insert(e, Color::Green).unwrap(); // equal value: nothing
        world.insert(e, Color::Red).unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Event::ComponentAdded { entity: e, kind: Color::KIND },
                Event::ComponentReplaced { entity: e, kind: Color::KIND },
            ]
        );
    }

    #[test]
    fn test_destroy_reports_kinds_in_tag_order() {
        let mut world = world();
        let e = world.create();
        world.insert(e, Mesh("ship".into())).unwrap();
        world.insert(e, Position::new(0.0, 0.0, 0.0)).unwrap();
        let log = record(&mut world, &[Topic::ComponentRemoved, Topic::EntityRemoved]);

        world.destroy(e).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Event::ComponentRemoved { entity: e, kind: Position::KIND },
                Event::ComponentRemoved { entity: e, kind: Mesh::KIND },
                Event::EntityRemoved { entity: e },
            ]
        );
        assert!(matches!(world.get(e, Position::KIND), Err(EcsError::StaleEntity(_))));
        assert!(matches!(world.destroy(e), Err(EcsError::StaleEntity(_))));
    }

    #[test]
    fn test_collection_tracks_membership() {
        let mut world = world();
        let aspect = Aspect::new()
            .with::<Components, Position>()
            .with::<Components, Velocity>();
        let id = world.collection(aspect).unwrap();

        let e = world.create();
        world.insert(e, Position::new(0.0, 0.0, 0.0)).unwrap();
        assert!(world.view(id).unwrap().is_empty());

        world.insert(e, Velocity::new(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(world.entities(id).unwrap(), vec![e]);

        world.remove_component::<Velocity>(e).unwrap();
        assert_eq!(world.first(id).unwrap(), None);
    }

    #[test]
    fn test_collection_unknown_kind() {
        let mut world = world();
        let bad = Aspect::all_of(&[ComponentKind::new(9)]);
        assert!(matches!(world.collection(bad), Err(EcsError::UnknownKind(_))));
    }

    #[test]
    fn test_collection_rejects_wide_tag() {
        let mut world = world();
        let e = world.create();
        world.insert(e, Position::new(0.0, 0.0, 0.0)).unwrap();

        let wide = ComponentKind::new(70);
        assert!(matches!(
            world.collection(Aspect::all_of(&[wide])),
            Err(EcsError::UnknownKind(k)) if k == wide
        ));
        assert!(matches!(
            world.collection(Aspect::new().with::<Components, Position>().exclude(wide)),
            Err(EcsError::UnknownKind(_))
        ));
        assert_eq!(world.collection_count(), 0);
    }

    #[test]
    fn test_overlay_changes_effective_mapping() {
        let mut world = world();
        let e = world.create_named("button");
        world.insert(e, Color::Green).unwrap();
        world
            .define_state(e, "hover", vec![Components::Color(Color::Blue)])
            .unwrap();
        world
            .define_state(e, "glow", vec![Components::Mesh(Mesh("halo".into()))])
            .unwrap();
        let log = record(
            &mut world,
            &[
                Topic::ComponentAdded,
                Topic::ComponentReplaced,
                Topic::ComponentRemoved,
                Topic::StateChanged,
            ],
        );

        world.change_state(e, Some("hover")).unwrap();
        assert_eq!(world.component::<Color>(e).unwrap(), Some(Color::Blue));

        world.change_state(e, Some("glow")).unwrap();
        assert_eq!(world.component::<Color>(e).unwrap(), Some(Color::Green));
        assert!(world.has::<Mesh>(e).unwrap());

        world.change_state(e, None).unwrap();
        assert!(!world.has::<Mesh>(e).unwrap());

        let hover = Some("hover".to_owned());
        let glow = Some("glow".to_owned());
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Event::ComponentReplaced { entity: e, kind: Color::KIND },
                Event::StateChanged { entity: e, state: hover },
                Event::ComponentReplaced { entity: e, kind: Color::KIND },
                Event::ComponentAdded { entity: e, kind: Mesh::KIND },
                Event::StateChanged { entity: e, state: glow },
                Event::ComponentRemoved { entity: e, kind: Mesh::KIND },
                Event::StateChanged { entity: e, state: None },
            ]
        );
    }

    #[test]
    fn test_unknown_state() {
        let mut world = world();
        let e = world.create();
        match world.change_state(e, Some("pressed")) {
            Err(EcsError::UnknownState { entity, label }) => {
                assert_eq!(entity, e);
                assert_eq!(label, "pressed");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_base_write_under_overlay_is_silent() {
        let mut world = world();
        let e = world.create();
        world
            .define_state(e, "hover", vec![Components::Color(Color::Blue)])
            .unwrap();
        world.change_state(e, Some("hover")).unwrap();
        let log = record(&mut world, &[Topic::ComponentAdded, Topic::ComponentReplaced]);

        world.insert(e, Color::Red).unwrap();
        assert_eq!(world.component::<Color>(e).unwrap(), Some(Color::Blue));
        assert!(log.lock().unwrap().is_empty());

        // Leaving the overlay reveals the base value
        world.change_state(e, None).unwrap();
        assert_eq!(world.component::<Color>(e).unwrap(), Some(Color::Red));
        assert_eq!(
            *log.lock().unwrap(),
            vec![Event::ComponentReplaced { entity: e, kind: Color::KIND }]
        );
    }

    #[test]
    fn test_remove_active_state() {
        let mut world = world();
        let e = world.create();
        world
            .define_state(e, "hover", vec![Components::Color(Color::Blue)])
            .unwrap();
        world.change_state(e, Some("hover")).unwrap();

        assert!(world.remove_state(e, "hover").unwrap());
        assert_eq!(world.active_state(e).unwrap(), None);
        assert!(!world.has::<Color>(e).unwrap());
        assert!(!world.remove_state(e, "hover").unwrap());
    }

    #[test]
    fn test_find_by_name() {
        let mut world = world();
        let a = world.create_named("start");
        let _b = world.create_named("quit");
        let c = world.create_named("start");

        assert_eq!(world.find_by_name("start"), Some(a));
        world.destroy(a).unwrap();
        assert_eq!(world.find_by_name("start"), Some(c));
        assert_eq!(world.find_by_name("options"), None);
        assert_eq!(world.name(c).unwrap(), Some("start"));
    }

    #[test]
    fn test_observer_runs_after_commit() {
        let mut world = world();
        let id = world
            .collection(Aspect::new().with::<Components, Position>())
            .unwrap();
        let joined = Arc::new(Mutex::new(Vec::new()));
        let left = Arc::new(Mutex::new(Vec::new()));
        let (j, l) = (Arc::clone(&joined), Arc::clone(&left));
        let observer = world
            .observe(
                id,
                move |e| j.lock().unwrap().push(e),
                move |e| l.lock().unwrap().push(e),
            )
            .unwrap();

        let e = world.create();
        world.insert(e, Position::new(0.0, 0.0, 0.0)).unwrap();
        world.destroy(e).unwrap();
        assert_eq!(*joined.lock().unwrap(), vec![e]);
        assert_eq!(*left.lock().unwrap(), vec![e]);

        world.unobserve(observer).unwrap();
        world.release_collection(id).unwrap();
        assert_eq!(world.collection_count(), 0);
    }
}
