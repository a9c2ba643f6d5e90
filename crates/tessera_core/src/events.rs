//! # Event Bus
//!
//! Synchronous in-process publish/subscribe.
//!
//! ```text
//! mutation ──> queue ──(commit)──> drain ──> handlers (FIFO)
//! ```
//!
//! Structural events are queued while a mutation is in progress and drained
//! once it has committed, so a handler never observes a half-applied change.
//! Handlers receive the event only, never the world: they cannot re-enter
//! the engine.
//!
//! Events for topics nobody listens to are never queued.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use crate::ecs::{ComponentKind, EntityId};

/// Host-defined message carried by [`Event::Custom`].
///
/// `topic` selects the [`Topic::Custom`] channel the message is delivered on.
pub trait Message: Clone + fmt::Debug + Send + 'static {
    /// Custom topic number of this message.
    fn topic(&self) -> u32;
}

/// Engines without custom messages use `()`.
impl Message for () {
    fn topic(&self) -> u32 {
        0
    }
}

/// Subscription channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Start of every tick.
    Update,
    /// An entity was created.
    EntityAdded,
    /// An entity was destroyed.
    EntityRemoved,
    /// A kind became effectively present on an entity.
    ComponentAdded,
    /// The effective payload of a present kind changed.
    ComponentReplaced,
    /// A kind stopped being effectively present on an entity.
    ComponentRemoved,
    /// The active state overlay of an entity changed.
    StateChanged,
    /// Host-defined topic.
    Custom(u32),
}

/// A value record delivered to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum Event<M = ()> {
    /// Published by the scheduler before any system runs.
    Update {
        /// Tick number, starting at 1.
        tick: u64,
        /// Simulated time step.
        delta: Duration,
    },
    /// An entity was created.
    EntityAdded {
        /// The new entity.
        entity: EntityId,
    },
    /// An entity was destroyed. Its identity is already stale.
    EntityRemoved {
        /// The destroyed entity.
        entity: EntityId,
    },
    /// A kind became effectively present.
    ComponentAdded {
        /// The entity that gained the kind.
        entity: EntityId,
        /// The kind.
        kind: ComponentKind,
    },
    /// The effective payload of a kind was replaced.
    ComponentReplaced {
        /// The entity whose payload changed.
        entity: EntityId,
        /// The kind.
        kind: ComponentKind,
    },
    /// A kind stopped being effectively present.
    ComponentRemoved {
        /// The entity that lost the kind.
        entity: EntityId,
        /// The kind.
        kind: ComponentKind,
    },
    /// The active overlay changed.
    StateChanged {
        /// The entity.
        entity: EntityId,
        /// The newly active label, `None` for the base mapping.
        state: Option<String>,
    },
    /// Host-defined message.
    Custom(M),
}

impl<M: Message> Event<M> {
    /// Returns the topic this event is delivered on.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::Update { .. } => Topic::Update,
            Self::EntityAdded { .. } => Topic::EntityAdded,
            Self::EntityRemoved { .. } => Topic::EntityRemoved,
            Self::ComponentAdded { .. } => Topic::ComponentAdded,
            Self::ComponentReplaced { .. } => Topic::ComponentReplaced,
            Self::ComponentRemoved { .. } => Topic::ComponentRemoved,
            Self::StateChanged { .. } => Topic::StateChanged,
            Self::Custom(message) => Topic::Custom(message.topic()),
        }
    }

    /// Returns the entity the event is about, if any.
    #[must_use]
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::EntityAdded { entity }
            | Self::EntityRemoved { entity }
            | Self::ComponentAdded { entity, .. }
            | Self::ComponentReplaced { entity, .. }
            | Self::ComponentRemoved { entity, .. }
            | Self::StateChanged { entity, .. } => Some(*entity),
            Self::Update { .. } | Self::Custom(_) => None,
        }
    }
}

/// Token returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    topic: Topic,
    serial: u64,
}

impl SubscriptionId {
    /// The topic this subscription listens on.
    #[must_use]
    pub const fn topic(self) -> Topic {
        self.topic
    }
}

/// Boxed event handler.
pub type Handler<M> = Box<dyn FnMut(&Event<M>) + Send>;

/// Topic-keyed handler table with a post-commit delivery queue.
pub struct EventBus<M = ()> {
    handlers: HashMap<Topic, Vec<(SubscriptionId, Handler<M>)>>,
    pending: VecDeque<Event<M>>,
    next_serial: u64,
    delivered: u64,
}

impl<M: Message> EventBus<M> {
    /// Creates a bus whose queue is pre-sized for `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            handlers: HashMap::new(),
            pending: VecDeque::with_capacity(capacity),
            next_serial: 0,
            delivered: 0,
        }
    }

    /// Registers a handler. Handlers on one topic run in subscription order.
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event<M>) + Send + 'static,
    {
        let id = SubscriptionId {
            topic,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.handlers
            .entry(topic)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Removes a handler. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let Some(list) = self.handlers.get_mut(&id.topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub, _)| *sub != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(&id.topic);
        }
        removed
    }

    /// Checks whether anyone listens on `topic`.
    #[inline]
    #[must_use]
    pub fn has_subscribers(&self, topic: Topic) -> bool {
        self.handlers.contains_key(&topic)
    }

    /// Queues an event for the next [`drain`](Self::drain).
    ///
    /// Dropped immediately when the topic has no subscribers.
    pub fn enqueue(&mut self, event: Event<M>) {
        if self.has_subscribers(event.topic()) {
            self.pending.push_back(event);
        }
    }

    /// Queues and immediately delivers an event.
    pub fn publish(&mut self, event: Event<M>) {
        self.enqueue(event);
        self.drain();
    }

    /// Delivers every queued event in FIFO order.
    pub fn drain(&mut self) {
        while let Some(event) = self.pending.pop_front() {
            if let Some(list) = self.handlers.get_mut(&event.topic()) {
                for (_, handler) in list.iter_mut() {
                    handler(&event);
                }
                self.delivered += 1;
            }
        }
    }

    /// Number of events waiting for delivery.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of events delivered so far.
    #[must_use]
    pub const fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }
}

impl<M: Message> Default for EventBus<M> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<M> fmt::Debug for EventBus<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.handlers.len())
            .field("pending", &self.pending.len())
            .field("delivered", &self.delivered)
            .finish()
    }
}
