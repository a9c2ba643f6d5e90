//! # Tessera
//!
//! Host integration for the [`tessera_core`] kernel.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              TESSERA HOST                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐   │
//! │  │   GameLoop      │────>│   Engine        │────>│   EventBridge   │   │
//! │  │                 │     │  (tessera_core) │     │                 │   │
//! │  │  • Fixed step   │     │  • Entities     │     │  • Bounded      │   │
//! │  │  • Delta clamp  │     │  • Collections  │     │  • Drop on full │   │
//! │  │  • FrameStats   │     │  • Systems      │     │                 │   │
//! │  └─────────────────┘     └────────┬────────┘     └────────┬────────┘   │
//! │                                   │                       │            │
//! │                          ┌────────┴────────┐     ┌────────┴────────┐   │
//! │                          │  SharedEngine   │     │ Consumer thread │   │
//! │                          │  (one mutex)    │     │                 │   │
//! │                          └─────────────────┘     └─────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `game_loop`: Fixed-step frame orchestration and timing
//! - `shared`: Mutex-wrapped engine for multi-threaded hosts
//! - `bridge`: Kernel events forwarded over a crossbeam channel
//! - `config`: TOML configuration for all of the above

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod game_loop;
pub mod shared;

#[cfg(test)]
mod testing;

// Re-export the kernel
pub use tessera_core as core;

// Re-export commonly used types
pub use bridge::{BridgeSender, EventBridge, EventReceiver};
pub use config::GameLoopConfig;
pub use error::{RuntimeError, RuntimeResult};
pub use game_loop::{FrameStats, FrameStatsAccumulator, GameLoop};
pub use shared::SharedEngine;
