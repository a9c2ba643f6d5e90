//! # Collections
//!
//! A collection is the live set of entities matching one [`Aspect`]. The
//! world keeps every collection consistent with the effective kind sets of
//! its entities, so a system never re-scans the entity table.
//!
//! ## Ordering
//!
//! Members keep the order in which they first matched. Removal leaves a
//! tombstone instead of shifting the tail; tombstones are swept once they
//! exceed the configured fraction of the member list.
//!
//! ## Sharing
//!
//! Collections are cached by aspect and reference-counted. Systems, hosts
//! and observers each hold a reference; the store drops a collection when
//! the last one is released (if configured to).

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use super::aspect::Aspect;
use super::component::KindMask;
use super::entity::EntityId;
use crate::error::{EcsError, EcsResult};

/// Handle to a cached collection.
///
/// Handles carry a generation so a released-and-reused slot is detected.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionId {
    index: u32,
    generation: u32,
}

impl CollectionId {
    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Returns the slot generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CollectionId({}v{})", self.index, self.generation)
    }
}

/// Token returned by [`World::observe`](crate::ecs::World::observe).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId {
    collection: CollectionId,
    serial: u64,
}

impl ObserverId {
    /// The collection this observer is attached to.
    #[inline]
    #[must_use]
    pub const fn collection(self) -> CollectionId {
        self.collection
    }
}

/// Membership transition callback.
pub(crate) type Observer = Box<dyn FnMut(EntityId) + Send>;

struct Observers {
    id: ObserverId,
    on_add: Observer,
    on_remove: Observer,
}

/// A membership transition waiting for delivery to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Membership {
    pub(crate) collection: CollectionId,
    pub(crate) entity: EntityId,
    pub(crate) joined: bool,
}

/// Live, ordered, deduplicated set of entities matching an aspect.
pub struct Collection {
    aspect: Aspect,
    /// Insertion-ordered members, `None` marks a removed entry.
    members: Vec<Option<EntityId>>,
    /// Entity -> index into `members`.
    positions: HashMap<EntityId, usize>,
    tombstones: usize,
    refs: usize,
    observers: Vec<Observers>,
}

impl Collection {
    fn new(aspect: Aspect, initial: Vec<EntityId>) -> Self {
        let positions = initial.iter().enumerate().map(|(i, &e)| (e, i)).collect();
        Self {
            aspect,
            members: initial.into_iter().map(Some).collect(),
            positions,
            tombstones: 0,
            refs: 0,
            observers: Vec::new(),
        }
    }

    /// The aspect this collection tracks.
    #[inline]
    #[must_use]
    pub const fn aspect(&self) -> Aspect {
        self.aspect
    }

    /// Iterates over members in first-match order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().filter_map(|m| *m)
    }

    /// Returns a snapshot of the members in first-match order.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityId> {
        self.iter().collect()
    }

    /// Returns the earliest member, if any.
    #[must_use]
    pub fn first(&self) -> Option<EntityId> {
        self.iter().next()
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Checks if the collection has no members.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Checks whether `entity` is a member.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.positions.contains_key(&entity)
    }

    /// Number of outstanding references (systems, host handles, observers).
    #[inline]
    #[must_use]
    pub const fn references(&self) -> usize {
        self.refs
    }

    fn insert(&mut self, entity: EntityId) -> bool {
        if self.positions.contains_key(&entity) {
            return false;
        }
        self.positions.insert(entity, self.members.len());
        self.members.push(Some(entity));
        true
    }

    fn remove(&mut self, entity: EntityId, compaction_ratio: f32) -> bool {
        let Some(at) = self.positions.remove(&entity) else {
            return false;
        };
        self.members[at] = None;
        self.tombstones += 1;

        #[allow(clippy::cast_precision_loss)]
        let ratio = self.tombstones as f32 / self.members.len() as f32;
        if self.positions.is_empty() || ratio > compaction_ratio {
            self.compact();
        }
        true
    }

    /// Sweeps tombstones and re-indexes the survivors.
    fn compact(&mut self) {
        self.members.retain(Option::is_some);
        for (i, member) in self.members.iter().enumerate() {
            if let Some(entity) = member {
                self.positions.insert(*entity, i);
            }
        }
        self.tombstones = 0;
    }

    fn notify(&mut self, entity: EntityId, joined: bool) {
        for observer in &mut self.observers {
            if joined {
                (observer.on_add)(entity);
            } else {
                (observer.on_remove)(entity);
            }
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("aspect", &self.aspect)
            .field("members", &self.entities())
            .field("refs", &self.refs)
            .field("observers", &self.observers.len())
            .finish()
    }
}

struct CollectionSlot {
    generation: u32,
    collection: Option<Collection>,
}

/// Cache of collections keyed by aspect.
pub(crate) struct CollectionStore {
    slots: Vec<CollectionSlot>,
    free: Vec<u32>,
    by_aspect: HashMap<Aspect, CollectionId>,
    next_observer: u64,
    compaction_ratio: f32,
    collect_unused: bool,
}

impl CollectionStore {
    pub(crate) fn new(compaction_ratio: f32, collect_unused: bool) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_aspect: HashMap::new(),
            next_observer: 0,
            compaction_ratio,
            collect_unused,
        }
    }

    /// Returns the cached collection for `aspect`, if one is live.
    pub(crate) fn find(&self, aspect: &Aspect) -> Option<CollectionId> {
        self.by_aspect.get(aspect).copied()
    }

    /// Takes a reference to the collection for `aspect`, creating it with
    /// the members produced by `populate` if it does not exist yet.
    pub(crate) fn acquire<F>(&mut self, aspect: Aspect, populate: F) -> CollectionId
    where
        F: FnOnce() -> Vec<EntityId>,
    {
        if let Some(id) = self.find(&aspect) {
            if let Ok(collection) = self.get_mut(id) {
                collection.refs += 1;
                return id;
            }
        }

        let mut collection = Collection::new(aspect, populate());
        collection.refs = 1;
        let members = collection.len();

        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.collection = Some(collection);
            CollectionId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(CollectionSlot {
                generation: 0,
                collection: Some(collection),
            });
            CollectionId {
                index,
                generation: 0,
            }
        };

        self.by_aspect.insert(aspect, id);
        debug!(?id, ?aspect, members, "collection created");
        id
    }

    /// Drops one reference. Returns `true` if the collection was discarded.
    pub(crate) fn release(&mut self, id: CollectionId) -> EcsResult<bool> {
        let collect_unused = self.collect_unused;
        let collection = self.get_mut(id)?;
        collection.refs = collection.refs.saturating_sub(1);
        if collection.refs > 0 || !collect_unused {
            return Ok(false);
        }

        let aspect = collection.aspect;
        let slot = &mut self.slots[id.index as usize];
        slot.collection = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.by_aspect.remove(&aspect);
        debug!(?id, ?aspect, "collection dropped");
        Ok(true)
    }

    pub(crate) fn get(&self, id: CollectionId) -> EcsResult<&Collection> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.collection.as_ref())
            .ok_or(EcsError::UnknownCollection(id))
    }

    pub(crate) fn get_mut(&mut self, id: CollectionId) -> EcsResult<&mut Collection> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.collection.as_mut())
            .ok_or(EcsError::UnknownCollection(id))
    }

    /// Attaches membership callbacks. The observer holds a reference.
    pub(crate) fn observe(
        &mut self,
        id: CollectionId,
        on_add: Observer,
        on_remove: Observer,
    ) -> EcsResult<ObserverId> {
        let serial = self.next_observer;
        let collection = self.get_mut(id)?;
        let observer = ObserverId {
            collection: id,
            serial,
        };
        collection.refs += 1;
        collection.observers.push(Observers {
            id: observer,
            on_add,
            on_remove,
        });
        self.next_observer += 1;
        Ok(observer)
    }

    /// Detaches an observer and drops its reference.
    pub(crate) fn unobserve(&mut self, observer: ObserverId) -> EcsResult<()> {
        let collection = self.get_mut(observer.collection)?;
        let before = collection.observers.len();
        collection.observers.retain(|o| o.id != observer);
        if collection.observers.len() == before {
            return Err(EcsError::UnknownCollection(observer.collection));
        }
        self.release(observer.collection).map(|_| ())
    }

    /// Re-evaluates one entity against every collection.
    ///
    /// `before`/`after` are the entity's effective kind sets around the
    /// mutation; `None` means the entity did not exist. Transitions seen by
    /// observed collections are appended to `pending`.
    pub(crate) fn reconcile(
        &mut self,
        entity: EntityId,
        before: Option<KindMask>,
        after: Option<KindMask>,
        pending: &mut Vec<Membership>,
    ) {
        let ratio = self.compaction_ratio;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(collection) = slot.collection.as_mut() else {
                continue;
            };
            let aspect = collection.aspect;
            let was = before.is_some_and(|mask| aspect.matches(mask));
            let now = after.is_some_and(|mask| aspect.matches(mask));
            if was == now {
                continue;
            }

            let changed = if now {
                collection.insert(entity)
            } else {
                collection.remove(entity, ratio)
            };
            if changed && !collection.observers.is_empty() {
                pending.push(Membership {
                    collection: CollectionId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    entity,
                    joined: now,
                });
            }
        }
    }

    /// Runs observer callbacks for a committed transition.
    ///
    /// Transitions for collections dropped since are ignored.
    pub(crate) fn deliver(&mut self, membership: Membership) {
        if let Ok(collection) = self.get_mut(membership.collection) {
            collection.notify(membership.entity, membership.joined);
        }
    }

    /// Number of live collections.
    pub(crate) fn len(&self) -> usize {
        self.by_aspect.len()
    }
}
