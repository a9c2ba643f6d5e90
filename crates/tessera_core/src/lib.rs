//! # Tessera Core
//!
//! Entity Component System kernel designed for:
//! - Components queried by kind sets, not by type hierarchies
//! - Live collections that follow entities as they gain and lose components
//! - Deterministic, priority-ordered system updates
//!
//! ## Architecture Rules
//!
//! 1. **Closed kind enumeration** - The host declares every component kind up front
//! 2. **Value semantics** - Payloads go in and come out as snapshots
//! 3. **Single-threaded ticks** - The kernel never locks; hosts wrap it if they share it
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{Aspect, Engine};
//!
//! let mut engine = Engine::<Components>::new()?;
//! let ship = engine.create();
//! engine.insert(ship, Position::new(10.0, 10.0, 12.0))?;
//!
//! let ships = engine.collection(Aspect::new().with::<Components, Position>())?;
//! assert_eq!(engine.view(ships)?.first(), Some(ship));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod engine;
pub mod error;
pub mod events;
pub mod scheduler;
pub mod system;

#[cfg(test)]
mod testing;

pub use config::EngineConfig;
pub use ecs::{
    Aspect, Collection, CollectionId, Component, ComponentKind, ComponentRegistry, ComponentSet,
    EntityId, KindInfo, KindMask, ObserverId, World,
};
pub use engine::Engine;
pub use error::{EcsError, EcsResult, SystemError, SystemResult};
pub use events::{Event, EventBus, Message, SubscriptionId, Topic};
pub use scheduler::{Scheduler, SystemId, SystemTiming, TickReport};
pub use system::{EntitySystem, ForEach, System, TickContext};
