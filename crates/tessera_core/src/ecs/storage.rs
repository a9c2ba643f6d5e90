//! # Entity Storage
//!
//! Row-major entity table. Every entity slot owns a dense row of component
//! payloads indexed by kind tag, so `get`/`set`/`remove` are a bounds check
//! and an array access:
//!
//! ```text
//! slot 0: [Position, Velocity, -,     -   ]  mask 0b0011
//! slot 1: [Position, -,        Color, Mesh]  mask 0b1101
//! ```
//!
//! Slots are recycled through a free list. A recycled slot keeps its row
//! allocations; only the contents are reset.

use std::collections::HashMap;

use super::component::{ComponentKind, ComponentSet, KindMask};
use super::entity::EntityId;
use crate::error::{EcsError, EcsResult};

/// A dense per-kind row of payloads with its presence mask.
#[derive(Clone, Debug)]
pub(crate) struct Row<S> {
    values: Box<[Option<S>]>,
    mask: KindMask,
}

impl<S: ComponentSet> Row<S> {
    fn new(width: usize) -> Self {
        Self {
            values: (0..width).map(|_| None).collect(),
            mask: KindMask::EMPTY,
        }
    }

    #[inline]
    pub(crate) fn get(&self, kind: ComponentKind) -> Option<&S> {
        self.values.get(kind.index())?.as_ref()
    }

    #[inline]
    fn insert(&mut self, kind: ComponentKind, value: S) -> Option<S> {
        let slot = self.values.get_mut(kind.index())?;
        self.mask = self.mask.with(kind);
        slot.replace(value)
    }

    #[inline]
    fn remove(&mut self, kind: ComponentKind) -> Option<S> {
        let value = self.values.get_mut(kind.index())?.take();
        self.mask = self.mask.without(kind);
        value
    }

    #[inline]
    pub(crate) const fn mask(&self) -> KindMask {
        self.mask
    }

    fn clear(&mut self) {
        for kind in self.mask {
            if let Some(slot) = self.values.get_mut(kind.index()) {
                *slot = None;
            }
        }
        self.mask = KindMask::EMPTY;
    }
}

/// One entity slot: identity, base mapping and state overlays.
#[derive(Debug)]
pub(crate) struct Slot<S> {
    generation: u32,
    alive: bool,
    /// Creation sequence number; orders entities when a collection is
    /// populated after the fact.
    spawn_seq: u64,
    name: Option<String>,
    base: Row<S>,
    states: HashMap<String, Row<S>>,
    active: Option<String>,
}

impl<S: ComponentSet> Slot<S> {
    fn new(width: usize) -> Self {
        Self {
            generation: 0,
            alive: false,
            spawn_seq: 0,
            name: None,
            base: Row::new(width),
            states: HashMap::new(),
            active: None,
        }
    }

    /// The active overlay, if any.
    #[inline]
    fn overlay(&self) -> Option<&Row<S>> {
        self.active.as_deref().and_then(|label| self.states.get(label))
    }

    /// Kinds supplied by the active overlay.
    #[inline]
    pub(crate) fn overlay_mask(&self) -> KindMask {
        self.overlay().map_or(KindMask::EMPTY, Row::mask)
    }

    /// Effective kind set: base ⊕ active overlay.
    #[inline]
    pub(crate) fn effective_mask(&self) -> KindMask {
        self.base.mask() | self.overlay_mask()
    }

    /// Effective payload for a kind. The overlay wins over the base.
    #[inline]
    pub(crate) fn get(&self, kind: ComponentKind) -> Option<&S> {
        self.overlay()
            .and_then(|overlay| overlay.get(kind))
            .or_else(|| self.base.get(kind))
    }

    #[inline]
    pub(crate) fn base(&self) -> &Row<S> {
        &self.base
    }

    #[inline]
    pub(crate) fn set_base(&mut self, kind: ComponentKind, value: S) -> Option<S> {
        self.base.insert(kind, value)
    }

    #[inline]
    pub(crate) fn remove_base(&mut self, kind: ComponentKind) -> Option<S> {
        self.base.remove(kind)
    }

    pub(crate) fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn active_state(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub(crate) fn has_state(&self, label: &str) -> bool {
        self.states.contains_key(label)
    }

    pub(crate) fn state_labels(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Mask of the overlay stored under `label` (active or not).
    pub(crate) fn state_mask(&self, label: &str) -> KindMask {
        self.states.get(label).map_or(KindMask::EMPTY, Row::mask)
    }

    /// Replaces the overlay stored under `label`.
    pub(crate) fn define_state(&mut self, label: &str, values: Vec<S>) {
        let width = self.base.values.len();
        let row = self
            .states
            .entry(label.to_owned())
            .or_insert_with(|| Row::new(width));
        row.clear();
        for value in values {
            let kind = value.kind();
            row.insert(kind, value);
        }
    }

    /// Drops the overlay stored under `label`, deactivating it first.
    pub(crate) fn remove_state(&mut self, label: &str) -> bool {
        if self.active.as_deref() == Some(label) {
            self.active = None;
        }
        self.states.remove(label).is_some()
    }

    pub(crate) fn set_active(&mut self, label: Option<&str>) {
        self.active = label.map(str::to_owned);
    }

    pub(crate) const fn spawn_seq(&self) -> u64 {
        self.spawn_seq
    }

    fn reset(&mut self) {
        self.alive = false;
        self.name = None;
        self.base.clear();
        self.states.clear();
        self.active = None;
    }
}

/// Generational slot table holding every entity's components.
///
/// This storage guarantees:
/// - O(1) access by entity index
/// - Stale identities are rejected by generation check
/// - No identity is issued twice (exhausted slots are retired)
#[derive(Debug)]
pub(crate) struct EntityStore<S> {
    slots: Vec<Slot<S>>,
    free: Vec<u32>,
    alive: usize,
    next_seq: u64,
    width: usize,
}

impl<S: ComponentSet> EntityStore<S> {
    /// Creates a store whose rows are `width` kinds wide.
    pub(crate) fn new(width: usize, capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            alive: 0,
            next_seq: 0,
            width,
        }
    }

    /// Allocates a fresh identity with an empty mapping.
    ///
    /// # Panics
    ///
    /// Panics if the 32-bit index space is exhausted.
    pub(crate) fn spawn(&mut self, name: Option<String>) -> EntityId {
        let index = if let Some(index) = self.free.pop() {
            index
        } else {
            let index = u32::try_from(self.slots.len())
                .ok()
                .filter(|&i| i < u32::MAX)
                .unwrap_or_else(|| panic!("entity index space exhausted"));
            self.slots.push(Slot::new(self.width));
            index
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        let slot = &mut self.slots[index as usize];
        slot.alive = true;
        slot.spawn_seq = seq;
        slot.name = name;
        self.alive += 1;

        EntityId::new(index, slot.generation)
    }

    /// Invalidates an identity and clears its slot.
    ///
    /// Returns the effective kind set the entity had.
    pub(crate) fn despawn(&mut self, id: EntityId) -> EcsResult<KindMask> {
        let slot = self.slot_mut(id)?;
        let kinds = slot.effective_mask();
        slot.reset();

        let retired = slot.generation == u32::MAX;
        slot.generation = slot.generation.wrapping_add(1);
        self.alive -= 1;

        // Exhausted slots never come back, so old handles stay stale forever
        if !retired {
            self.free.push(id.index());
        }
        Ok(kinds)
    }

    #[inline]
    pub(crate) fn is_alive(&self, id: EntityId) -> bool {
        self.slot(id).is_ok()
    }

    /// Looks up a live slot, failing with `StaleEntity`.
    #[inline]
    pub(crate) fn slot(&self, id: EntityId) -> EcsResult<&Slot<S>> {
        match self.slots.get(id.index() as usize) {
            Some(slot) if slot.alive && slot.generation == id.generation() && !id.is_null() => {
                Ok(slot)
            }
            _ => Err(EcsError::StaleEntity(id)),
        }
    }

    /// Looks up a live slot mutably, failing with `StaleEntity`.
    #[inline]
    pub(crate) fn slot_mut(&mut self, id: EntityId) -> EcsResult<&mut Slot<S>> {
        match self.slots.get_mut(id.index() as usize) {
            Some(slot) if slot.alive && slot.generation == id.generation() && !id.is_null() => {
                Ok(slot)
            }
            _ => Err(EcsError::StaleEntity(id)),
        }
    }

    /// Number of live entities.
    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.alive
    }

    /// Iterates over live entities in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (EntityId, &Slot<S>)> {
        self.slots.iter().enumerate().filter(|(_, s)| s.alive).map(|(index, slot)| {
            (EntityId::new(index as u32, slot.generation), slot)
        })
    }

    /// Live entities matching `filter`, in creation order.
    pub(crate) fn collect_in_spawn_order<F>(&self, mut filter: F) -> Vec<EntityId>
    where
        F: FnMut(&Slot<S>) -> bool,
    {
        let mut found: Vec<(u64, EntityId)> = self
            .iter()
            .filter(|(_, slot)| filter(slot))
            .map(|(id, slot)| (slot.spawn_seq(), id))
            .collect();
        found.sort_unstable_by_key(|&(seq, _)| seq);
        found.into_iter().map(|(_, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Component;
    use crate::testing::{Color, Components, Position};

    fn store() -> EntityStore<Components> {
        EntityStore::new(4, 16)
    }

    #[test]
    fn test_spawn_despawn() {
        let mut store = store();

        let id1 = store.spawn(None);
        assert!(store.is_alive(id1));
        let id2 = store.spawn(Some("second".into()));
        assert_eq!(store.len(), 2);
        assert_eq!(store.slot(id2).unwrap().name(), Some("second"));

        store.despawn(id1).unwrap();
        assert!(!store.is_alive(id1));
        assert_eq!(store.len(), 1);

        // Spawn again - should reuse the slot
        let id3 = store.spawn(None);
        assert_eq!(id3.index(), id1.index());
        assert_ne!(id3.generation(), id1.generation());
        assert!(matches!(store.slot(id1), Err(EcsError::StaleEntity(_))));
    }

    #[test]
    fn test_despawn_twice_is_stale() {
        let mut store = store();
        let id = store.spawn(None);
        store.despawn(id).unwrap();
        assert!(matches!(store.despawn(id), Err(EcsError::StaleEntity(e)) if e == id));
    }

    #[test]
    fn test_row_set_get_remove() {
        let mut store = store();
        let id = store.spawn(None);
        let slot = store.slot_mut(id).unwrap();

        let pos = Components::Position(Position::new(1.0, 2.0, 3.0));
        assert!(slot.set_base(Position::KIND, pos.clone()).is_none());
        assert_eq!(slot.get(Position::KIND), Some(&pos));
        assert!(slot.effective_mask().contains(Position::KIND));

        assert_eq!(slot.remove_base(Position::KIND), Some(pos));
        assert!(slot.get(Position::KIND).is_none());
        assert!(slot.effective_mask().is_empty());
    }

    #[test]
    fn test_overlay_wins_over_base() {
        let mut store = store();
        let id = store.spawn(None);
        let slot = store.slot_mut(id).unwrap();

        slot.set_base(Color::KIND, Components::Color(Color::Green));
        slot.define_state("hover", vec![Components::Color(Color::Blue)]);
        assert_eq!(slot.get(Color::KIND), Some(&Components::Color(Color::Green)));

        slot.set_active(Some("hover"));
        assert_eq!(slot.get(Color::KIND), Some(&Components::Color(Color::Blue)));
        assert_eq!(slot.overlay_mask(), KindMask::single(Color::KIND));

        assert!(slot.remove_state("hover"));
        assert!(slot.active_state().is_none());
        assert_eq!(slot.get(Color::KIND), Some(&Components::Color(Color::Green)));
    }

    #[test]
    fn test_recycled_slot_is_empty() {
        let mut store = store();
        let id = store.spawn(Some("old".into()));
        {
            let slot = store.slot_mut(id).unwrap();
            slot.set_base(Position::KIND, Components::Position(Position::new(0.0, 0.0, 0.0)));
            slot.define_state("hover", vec![Components::Color(Color::Red)]);
            slot.set_active(Some("hover"));
        }
        store.despawn(id).unwrap();

        let fresh = store.spawn(None);
        let slot = store.slot(fresh).unwrap();
        assert!(slot.effective_mask().is_empty());
        assert!(slot.name().is_none());
        assert!(slot.active_state().is_none());
        assert_eq!(slot.state_labels().count(), 0);
    }

    #[test]
    fn test_spawn_order_survives_slot_reuse() {
        let mut store = store();
        let a = store.spawn(None);
        let b = store.spawn(None);
        store.despawn(a).unwrap();
        let c = store.spawn(None); // reuses slot 0

        assert_eq!(c.index(), a.index());
        assert_eq!(store.collect_in_spawn_order(|_| true), vec![b, c]);
    }
}
