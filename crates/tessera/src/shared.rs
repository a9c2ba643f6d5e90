//! # Shared Engine
//!
//! The kernel takes no locks. Hosts that touch the engine from more than one
//! thread wrap it here, and every operation runs under one mutex:
//!
//! ```text
//! ┌────────────┐  with(|e| ...)  ┌──────────────────────────┐
//! │ Sim thread │───────────────>│                          │
//! └────────────┘                │  Arc<Mutex<Engine<S,M>>> │
//! ┌────────────┐  with(|e| ...)  │                          │
//! │ UI thread  │───────────────>│                          │
//! └────────────┘                └──────────────────────────┘
//! ```
//!
//! A tick holds the lock for its whole duration, so other threads only ever
//! see the world between ticks.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tessera_core::{ComponentSet, EcsResult, Engine, Message, TickReport};

use crate::error::{RuntimeError, RuntimeResult};

/// Cloneable handle to an engine behind a mutex.
pub struct SharedEngine<S: ComponentSet, M: Message = ()> {
    inner: Arc<Mutex<Engine<S, M>>>,
}

impl<S: ComponentSet, M: Message> SharedEngine<S, M> {
    /// Wraps an engine.
    #[must_use]
    pub fn new(engine: Engine<S, M>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Locks the engine until the guard drops.
    #[inline]
    pub fn lock(&self) -> MutexGuard<'_, Engine<S, M>> {
        self.inner.lock()
    }

    /// Runs `f` with exclusive access to the engine.
    #[inline]
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine<S, M>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Runs `f` if the lock is acquired within `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::LockTimeout`] if another thread held the
    /// engine for the whole timeout.
    pub fn try_with<R>(
        &self,
        timeout: Duration,
        f: impl FnOnce(&mut Engine<S, M>) -> R,
    ) -> RuntimeResult<R> {
        let mut guard = self
            .inner
            .try_lock_for(timeout)
            .ok_or(RuntimeError::LockTimeout(timeout))?;
        Ok(f(&mut guard))
    }

    /// Runs one tick under the lock.
    ///
    /// # Errors
    ///
    /// Propagates the tick error.
    pub fn update(&self, delta: Duration) -> EcsResult<TickReport> {
        self.inner.lock().update(delta).cloned()
    }

    /// Number of handles sharing the engine.
    #[must_use]
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Unwraps the engine if this is the last handle.
    ///
    /// # Errors
    ///
    /// Returns the handle unchanged while other handles exist.
    pub fn into_inner(self) -> Result<Engine<S, M>, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl<S: ComponentSet, M: Message> Clone for SharedEngine<S, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ComponentSet, M: Message> std::fmt::Debug for SharedEngine<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEngine")
            .field("handles", &self.handles())
            .finish_non_exhaustive()
    }
}
