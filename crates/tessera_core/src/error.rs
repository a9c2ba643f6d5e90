//! # Kernel Error Types
//!
//! All errors that can be returned by the engine facade. Errors carry the
//! offending entity identity and kind tag where applicable.
//!
//! The engine never swallows an error and is not transactional: structural
//! changes committed before a failure persist.

use thiserror::Error;

use crate::ecs::{CollectionId, ComponentKind, EntityId};

/// Error returned by a system hook or handler.
///
/// Any error type converts into it with `?`, including [`EcsError`].
pub type SystemError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for system hooks and handlers.
pub type SystemResult = Result<(), SystemError>;

/// Errors that can occur in the kernel.
#[derive(Error, Debug)]
pub enum EcsError {
    /// Operation on a destroyed or never-created entity.
    #[error("stale entity {0}")]
    StaleEntity(EntityId),

    /// Payload shape does not match the kind it was stored under.
    #[error("kind mismatch on entity {entity}: expected {expected}, found {found}")]
    KindMismatch {
        /// The entity the payload was meant for.
        entity: EntityId,
        /// The kind the caller asked for.
        expected: ComponentKind,
        /// The kind the payload actually carries.
        found: ComponentKind,
    },

    /// Tag not in the registered enumeration.
    #[error("unknown component {0}")]
    UnknownKind(ComponentKind),

    /// A system with the same name is already registered.
    #[error("system `{0}` is already registered")]
    DuplicateSystem(String),

    /// No system with this name is registered.
    #[error("system `{0}` is not registered")]
    UnknownSystem(String),

    /// Collection handle was released or never issued.
    #[error("unknown collection {0:?}")]
    UnknownCollection(CollectionId),

    /// The entity has no state overlay with this label.
    #[error("entity {entity} has no state `{label}`")]
    UnknownState {
        /// The entity whose state was changed.
        entity: EntityId,
        /// The label that was requested.
        label: String,
    },

    /// A system hook returned an error. Aborts the current tick.
    #[error("system `{system}` failed: {source}")]
    Handler {
        /// Name of the failing system.
        system: String,
        /// The error returned by the hook.
        #[source]
        source: SystemError,
    },

    /// The host's kind table is malformed (duplicate or out-of-range tags).
    #[error("invalid component registry: {0}")]
    InvalidRegistry(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be read.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for kernel operations.
pub type EcsResult<T> = Result<T, EcsError>;
