//! # Event Bridge
//!
//! Forwards kernel events to other threads.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐ subscribe ┌─────────────┐ bounded ┌─────────────┐
//! │   Engine    │──────────>│   Bridge    │────────>│  Consumer   │
//! │  (bus)      │  handler  │   Sender    │ channel │  thread     │
//! └─────────────┘           └─────────────┘         └─────────────┘
//! ```
//!
//! Kernel handlers run inside the tick, so the bridge never blocks: when the
//! channel is full the event is dropped and counted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tessera_core::{ComponentSet, Engine, Event, Message, SubscriptionId, Topic};
use tracing::debug;

/// Bounded channel carrying engine events across threads.
pub struct EventBridge<M: Message = ()> {
    /// Sender end - cloned into engine handlers.
    sender: Sender<Event<M>>,
    /// Receiver end - handed to consumers.
    receiver: Receiver<Event<M>>,
    /// Events dropped because the channel was full.
    dropped: Arc<AtomicU64>,
}

impl<M: Message> EventBridge<M> {
    /// Creates a new bridge.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum events in flight before new ones are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Subscribes the bridge to `topics` on `engine`.
    ///
    /// Returns one subscription per topic, in order, for later
    /// [`Engine::unsubscribe`].
    pub fn attach<S: ComponentSet>(
        &self,
        engine: &mut Engine<S, M>,
        topics: &[Topic],
    ) -> Vec<SubscriptionId> {
        debug!(?topics, "attaching event bridge");
        topics
            .iter()
            .map(|&topic| {
                let sender = self.sender();
                engine.subscribe(topic, move |event| {
                    sender.send(event.clone());
                })
            })
            .collect()
    }

    /// Creates a sender handle (clone for multiple producers).
    #[must_use]
    pub fn sender(&self) -> BridgeSender<M> {
        BridgeSender {
            sender: self.sender.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Creates a receiver handle (clone for multiple consumers).
    #[must_use]
    pub fn receiver(&self) -> EventReceiver<M> {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Returns the number of events dropped on a full channel.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<M: Message> std::fmt::Debug for EventBridge<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("pending", &self.receiver.len())
            .field("dropped", &self.dropped())
            .finish()
    }
}

/// Handle for sending events.
pub struct BridgeSender<M: Message = ()> {
    sender: Sender<Event<M>>,
    dropped: Arc<AtomicU64>,
}

impl<M: Message> BridgeSender<M> {
    /// Sends an event (non-blocking).
    ///
    /// Returns `false` if the event was dropped: the channel was full or
    /// every receiver is gone. Only full-channel drops are counted.
    #[inline]
    pub fn send(&self, event: Event<M>) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl<M: Message> Clone for BridgeSender<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

/// Handle for receiving events.
pub struct EventReceiver<M: Message = ()> {
    receiver: Receiver<Event<M>>,
}

impl<M: Message> EventReceiver<M> {
    /// Receives all pending events (non-blocking).
    #[inline]
    pub fn drain(&self) -> Vec<Event<M>> {
        self.receiver.try_iter().collect()
    }

    /// Receives one event (non-blocking).
    #[inline]
    pub fn try_recv(&self) -> Option<Event<M>> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until an event arrives.
    ///
    /// Returns `None` once every sender is gone and the channel is empty.
    pub fn recv(&self) -> Option<Event<M>> {
        self.receiver.recv().ok()
    }

    /// Waits up to `timeout` for one event.
    ///
    /// Returns `None` on timeout or once every sender is gone and the
    /// channel is empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event<M>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Checks if there are pending events.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}

impl<M: Message> Clone for EventReceiver<M> {
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.clone(),
        }
    }
}
