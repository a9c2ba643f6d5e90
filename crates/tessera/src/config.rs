//! # Game Loop Configuration
//!
//! ```toml
//! tick_rate = 60
//! max_frame_time_ms = 250
//! max_steps_per_frame = 5
//! bridge_capacity = 1024
//! log_frame_stats = false
//!
//! [engine]
//! entity_capacity = 4096
//! ```
//!
//! The `[engine]` table is handed to the kernel unchanged.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_core::EngineConfig;

use crate::error::{RuntimeError, RuntimeResult};

/// Default simulation rate in ticks per second.
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Default cap on the wall time a single frame may account for.
pub const DEFAULT_MAX_FRAME_TIME_MS: u64 = 250;

/// Default cap on fixed steps run in one frame.
pub const DEFAULT_MAX_STEPS_PER_FRAME: u32 = 5;

/// Default event bridge channel capacity.
pub const DEFAULT_BRIDGE_CAPACITY: usize = 1024;

/// Configuration for the game loop and the engine it drives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameLoopConfig {
    /// Fixed simulation steps per second.
    pub tick_rate: u32,
    /// Longer frames are clamped to this before they reach the accumulator.
    pub max_frame_time_ms: u64,
    /// Steps beyond this in one frame are dropped from the backlog.
    pub max_steps_per_frame: u32,
    /// Event bridge channel capacity.
    pub bridge_capacity: usize,
    /// Log frames whose updates overran the step budget.
    pub log_frame_stats: bool,
    /// Kernel configuration.
    pub engine: EngineConfig,
}

impl Default for GameLoopConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            max_frame_time_ms: DEFAULT_MAX_FRAME_TIME_MS,
            max_steps_per_frame: DEFAULT_MAX_STEPS_PER_FRAME,
            bridge_capacity: DEFAULT_BRIDGE_CAPACITY,
            log_frame_stats: false,
            engine: EngineConfig::default(),
        }
    }
}

impl GameLoopConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] on malformed TOML, unknown keys or
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> RuntimeResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| RuntimeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn from_toml_file(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges, including the nested engine table.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if a rate, cap or capacity is zero,
    /// and [`RuntimeError::Engine`] if the engine table is invalid.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.tick_rate == 0 {
            return Err(RuntimeError::Config("tick_rate must be positive".into()));
        }
        if self.max_steps_per_frame == 0 {
            return Err(RuntimeError::Config(
                "max_steps_per_frame must be positive".into(),
            ));
        }
        if self.bridge_capacity == 0 {
            return Err(RuntimeError::Config("bridge_capacity must be positive".into()));
        }
        if self.max_frame_time() < self.fixed_step() {
            return Err(RuntimeError::Config(format!(
                "max_frame_time_ms ({}) is shorter than one step",
                self.max_frame_time_ms
            )));
        }
        self.engine.validate()?;
        Ok(())
    }

    /// Duration of one simulation step.
    #[inline]
    #[must_use]
    pub fn fixed_step(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }

    /// Clamp applied to each frame's elapsed time.
    #[inline]
    #[must_use]
    pub const fn max_frame_time(&self) -> Duration {
        Duration::from_millis(self.max_frame_time_ms)
    }
}
