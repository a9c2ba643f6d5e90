//! # Tessera Game Loop
//!
//! Fixed-step orchestration over [`Engine::update`]:
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. MEASURE                                                          │
//! │    └─ elapsed = min(wall time since frame N-1, max_frame_time)      │
//! │                                                                     │
//! │ 2. ACCUMULATE                                                       │
//! │    └─ accumulator += elapsed                                        │
//! │                                                                     │
//! │ 3. STEP (at most max_steps_per_frame times)                         │
//! │    └─ while accumulator >= step: engine.update(step)                │
//! │                                                                     │
//! │ 4. DROP BACKLOG                                                     │
//! │    └─ if the step cap was hit, the remainder is discarded           │
//! │                                                                     │
//! │ 5. RECORD                                                           │
//! │    └─ FrameStats { steps, update time, alpha }                      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every tick receives exactly the configured step, so a simulation fed the
//! same frames produces the same world regardless of wall-clock jitter.

use std::thread;
use std::time::{Duration, Instant};

use tessera_core::{ComponentSet, Engine, Message};
use tracing::{debug, info, warn};

use crate::config::GameLoopConfig;
use crate::error::RuntimeResult;

/// Timing of one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Frame number, starting at 0.
    pub frame: u64,
    /// Elapsed time after clamping.
    pub elapsed: Duration,
    /// Fixed steps run this frame.
    pub steps: u32,
    /// Time spent inside `Engine::update` across all steps.
    pub update: Duration,
    /// Fraction of a step left in the accumulator, for interpolation.
    pub alpha: f32,
    /// The step cap was hit and the backlog discarded.
    pub backlog_dropped: bool,
}

/// The main game loop orchestrator.
///
/// Owns the engine and feeds it fixed steps.
pub struct GameLoop<S: ComponentSet, M: Message = ()> {
    /// The engine being driven.
    engine: Engine<S, M>,
    /// Configuration.
    config: GameLoopConfig,
    /// Duration of one step.
    step: Duration,
    /// Unsimulated time carried between frames.
    accumulator: Duration,
    /// Frame counter.
    frame_count: u64,
    /// Start of the previous real-time frame.
    last_frame_time: Option<Instant>,
    /// Accumulated frame statistics.
    stats_accumulator: FrameStatsAccumulator,
}

impl<S: ComponentSet, M: Message> GameLoop<S, M> {
    /// Creates a game loop around a fresh engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or the component table is
    /// invalid.
    pub fn new(config: GameLoopConfig) -> RuntimeResult<Self> {
        config.validate()?;
        let engine = Engine::with_config(&config.engine)?;
        Ok(Self::with_engine(engine, config))
    }

    /// Creates a game loop around an existing engine.
    ///
    /// The configuration is assumed valid; its `engine` table is ignored.
    #[must_use]
    pub fn with_engine(engine: Engine<S, M>, config: GameLoopConfig) -> Self {
        let step = config.fixed_step();
        info!(
            tick_rate = config.tick_rate,
            step_us = step.as_micros() as u64,
            "game loop ready"
        );
        Self {
            engine,
            config,
            step,
            accumulator: Duration::ZERO,
            frame_count: 0,
            last_frame_time: None,
            stats_accumulator: FrameStatsAccumulator::new(step),
        }
    }

    /// Runs one frame that took `elapsed` of wall time.
    ///
    /// # Arguments
    ///
    /// * `elapsed` - Time since the previous frame; clamped to
    ///   `max_frame_time`.
    ///
    /// # Errors
    ///
    /// Propagates the first tick error. Steps that completed before it stay
    /// applied and the failing step is not retried.
    pub fn frame(&mut self, elapsed: Duration) -> RuntimeResult<FrameStats> {
        let elapsed = elapsed.min(self.config.max_frame_time());
        self.accumulator += elapsed;

        let mut stats = FrameStats {
            frame: self.frame_count,
            elapsed,
            ..FrameStats::default()
        };

        while self.accumulator >= self.step {
            if stats.steps == self.config.max_steps_per_frame {
                debug!(
                    frame = self.frame_count,
                    backlog_us = self.accumulator.as_micros() as u64,
                    "step cap hit, dropping backlog"
                );
                self.accumulator = Duration::ZERO;
                stats.backlog_dropped = true;
                break;
            }
            self.accumulator -= self.step;
            let report = self.engine.update(self.step)?;
            stats.update += report.duration;
            stats.steps += 1;
        }

        stats.alpha = self.alpha();
        self.end_frame(stats);
        Ok(stats)
    }

    /// Runs one frame measured against the wall clock.
    ///
    /// The first call measures zero elapsed time.
    ///
    /// # Errors
    ///
    /// As [`frame`](Self::frame).
    pub fn advance(&mut self) -> RuntimeResult<FrameStats> {
        let now = Instant::now();
        let elapsed = self
            .last_frame_time
            .map_or(Duration::ZERO, |last| now.duration_since(last));
        self.last_frame_time = Some(now);
        self.frame(elapsed)
    }

    /// Runs `frames` real-time frames, sleeping out the rest of each step.
    ///
    /// # Errors
    ///
    /// Stops at the first tick error.
    pub fn run_realtime(&mut self, frames: u64) -> RuntimeResult<()> {
        for _ in 0..frames {
            let start = Instant::now();
            self.advance()?;
            if let Some(rest) = self.step.checked_sub(start.elapsed()) {
                thread::sleep(rest);
            }
        }
        Ok(())
    }

    /// Runs `frames` frames of exactly one step each, without sleeping.
    ///
    /// # Errors
    ///
    /// Stops at the first tick error.
    pub fn run_fixed(&mut self, frames: u64) -> RuntimeResult<()> {
        for _ in 0..frames {
            self.frame(self.step)?;
        }
        Ok(())
    }

    fn end_frame(&mut self, stats: FrameStats) {
        self.frame_count += 1;
        self.stats_accumulator.record(stats);

        // Log frames whose updates overran the time they simulated
        if self.config.log_frame_stats && stats.update > self.step * stats.steps.max(1) {
            warn!(
                frame = stats.frame,
                steps = stats.steps,
                update_ms = stats.update.as_secs_f64() * 1000.0,
                "frame exceeded budget"
            );
        }
    }

    /// Fraction of a step waiting in the accumulator.
    #[inline]
    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.step.as_secs_f32()
    }

    /// Returns the current frame count.
    #[inline]
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Returns the duration of one step.
    #[inline]
    #[must_use]
    pub const fn step(&self) -> Duration {
        self.step
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &GameLoopConfig {
        &self.config
    }

    /// Returns the engine.
    #[must_use]
    pub const fn engine(&self) -> &Engine<S, M> {
        &self.engine
    }

    /// Returns the engine for setup between frames.
    #[must_use]
    pub fn engine_mut(&mut self) -> &mut Engine<S, M> {
        &mut self.engine
    }

    /// Consumes the loop and returns the engine.
    #[must_use]
    pub fn into_engine(self) -> Engine<S, M> {
        self.engine
    }

    /// Returns the accumulated statistics.
    #[must_use]
    pub const fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats_accumulator
    }
}

impl<S: ComponentSet, M: Message> std::fmt::Debug for GameLoop<S, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLoop")
            .field("step", &self.step)
            .field("accumulator", &self.accumulator)
            .field("frame_count", &self.frame_count)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Budget a single step's update is measured against.
    pub step: Duration,
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Total steps run.
    pub steps_total: u64,
    /// Sum of update times.
    pub update_sum: Duration,
    /// Slowest single frame update.
    pub max_update: Duration,
    /// Frames whose updates took longer than the time they simulated.
    pub frames_over_budget: u64,
    /// Frames that hit the step cap.
    pub backlog_drops: u64,
}

impl FrameStatsAccumulator {
    /// Creates an accumulator measuring against `step`.
    #[must_use]
    pub const fn new(step: Duration) -> Self {
        Self {
            step,
            frames_recorded: 0,
            steps_total: 0,
            update_sum: Duration::ZERO,
            max_update: Duration::ZERO,
            frames_over_budget: 0,
            backlog_drops: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.steps_total += u64::from(stats.steps);
        self.update_sum += stats.update;
        self.max_update = self.max_update.max(stats.update);

        if stats.steps > 0 && stats.update > self.step * stats.steps {
            self.frames_over_budget += 1;
        }
        if stats.backlog_dropped {
            self.backlog_drops += 1;
        }
    }

    /// Returns the average update time per step in milliseconds.
    #[must_use]
    pub fn avg_step_ms(&self) -> f64 {
        if self.steps_total == 0 {
            return 0.0;
        }
        self.update_sum.as_secs_f64() * 1000.0 / self.steps_total as f64
    }

    /// Returns the average steps per frame.
    #[must_use]
    pub fn avg_steps(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.steps_total as f64 / self.frames_recorded as f64
    }

    /// Returns the fraction of frames over budget.
    #[must_use]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Logs a summary of the statistics at `info`.
    pub fn log_summary(&self) {
        info!(
            frames = self.frames_recorded,
            steps = self.steps_total,
            avg_steps = self.avg_steps(),
            avg_step_ms = self.avg_step_ms(),
            max_update_ms = self.max_update.as_secs_f64() * 1000.0,
            over_budget = self.frames_over_budget,
            backlog_drops = self.backlog_drops,
            "frame statistics"
        );
    }
}
