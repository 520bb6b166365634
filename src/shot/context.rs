//! Blackboard threaded through every shot-state handler.
//!
//! The scheduler writes the pump and lever inputs and the current time
//! before each tick; handlers keep the [`BrewSession`] and the displayed
//! duration current.

use crate::config::HmiConfig;

/// Timing constants the handlers need, copied out of the node config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotTiming {
    /// Pump and lever must both be on for longer than this to count as a shot.
    pub start_threshold_ms: u32,
    /// How long a finished shot's duration stays on screen.
    pub retention_ms: u32,
    /// How long the chart keeps plotting after a shot stops.
    pub chart_retention_ms: u32,
}

impl ShotTiming {
    pub fn from_config(config: &HmiConfig) -> Self {
        Self {
            start_threshold_ms: config.shot_start_threshold_ms,
            retention_ms: config.shot_retention_ms,
            chart_retention_ms: config.chart_retention_ms,
        }
    }
}

/// One brewing cycle as tracked on this node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrewSession {
    /// True once the start threshold has been crossed, until the shot stops.
    pub active: bool,
    /// When pump and lever both became true.
    pub start_ms: Option<u64>,
    /// Frozen duration of the last shot, whole seconds.
    pub completed_secs: u32,
    /// When the last shot stopped.
    pub lever_lowered_ms: Option<u64>,
    /// Until when the chart keeps plotting after a stop.
    pub chart_stop_ms: Option<u64>,
}

impl BrewSession {
    /// Milliseconds since the shot started (0 when none is running).
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.start_ms.map_or(0, |s| now_ms.saturating_sub(s))
    }
}

/// Shared state for the shot handlers.
#[derive(Debug, Clone)]
pub struct ShotContext {
    pub timing: ShotTiming,

    // ── Inputs ─────────────────────────────────────────────────
    pub now_ms: u64,
    pub pump_on: bool,
    pub lever_lifted: bool,

    // ── State ──────────────────────────────────────────────────
    pub session: BrewSession,

    // ── Outputs ────────────────────────────────────────────────
    /// Seconds shown on the shot timer.
    pub displayed_secs: u32,

    /// Milliseconds since the current state was entered (set by the engine).
    pub ms_in_state: u64,
}

impl ShotContext {
    pub fn new(timing: ShotTiming) -> Self {
        Self {
            timing,
            now_ms: 0,
            pump_on: false,
            lever_lifted: false,
            session: BrewSession::default(),
            displayed_secs: 0,
            ms_in_state: 0,
        }
    }

    /// Pump running with the lever up.
    pub fn brewing(&self) -> bool {
        self.pump_on && self.lever_lifted
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.session.elapsed_ms(self.now_ms)
    }
}
