//! # Host Error Types
//!
//! Errors raised while loading configuration or driving the engine.

use thiserror::Error;

use tessera_core::EcsError;

/// Errors that can occur in the host runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The kernel rejected an operation or a system aborted the tick.
    #[error(transparent)]
    Engine(#[from] EcsError),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A shared engine lock was not acquired in time.
    #[error("engine lock not acquired within {0:?}")]
    LockTimeout(std::time::Duration),
}

/// Result type for host operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
