//! # Engine Configuration
//!
//! Tuning knobs for the kernel. Loaded once at startup, usually from a TOML
//! file; every field is optional.
//!
//! ```toml
//! entity_capacity = 4096
//! event_queue_capacity = 256
//! collect_unused_collections = true
//! compaction_ratio = 0.25
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Default number of pre-reserved entity slots.
pub const DEFAULT_ENTITY_CAPACITY: usize = 1024;

/// Default pre-sized event queue length.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 64;

/// Default tombstone fraction that triggers collection compaction.
pub const DEFAULT_COMPACTION_RATIO: f32 = 0.5;

/// Kernel configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Entity slots reserved up front. The table still grows past this.
    pub entity_capacity: usize,
    /// Initial length of the event delivery queue.
    pub event_queue_capacity: usize,
    /// Drop collections once nothing references them.
    pub collect_unused_collections: bool,
    /// Fraction of removed entries (0, 1) a collection tolerates before it
    /// compacts its member list.
    pub compaction_ratio: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entity_capacity: DEFAULT_ENTITY_CAPACITY,
            event_queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
            collect_unused_collections: true,
            compaction_ratio: DEFAULT_COMPACTION_RATIO,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Config`] on malformed TOML, unknown keys or
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EcsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Config`] if `compaction_ratio` is not in `(0, 1)`.
    pub fn validate(&self) -> EcsResult<()> {
        if !(self.compaction_ratio > 0.0 && self.compaction_ratio < 1.0) {
            return Err(EcsError::Config(format!(
                "compaction_ratio must be in (0, 1), got {}",
                self.compaction_ratio
            )));
        }
        Ok(())
    }
}
