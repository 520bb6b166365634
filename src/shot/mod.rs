//! Shot tracking: a function-pointer state machine over pump and lever.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  StateTable                                              │
//! │  ┌──────────┬───────────┬──────────┬───────────────────┐ │
//! │  │ Phase    │ on_enter  │ on_exit  │ on_update         │ │
//! │  ├──────────┼───────────┼──────────┼───────────────────┤ │
//! │  │ Idle     │ fn(ctx)   │ -        │ fn(ctx)->Option<> │ │
//! │  │ Arming   │ fn(ctx)   │ -        │ fn(ctx)->Option<> │ │
//! │  │ Active   │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │ │
//! │  │ Retained │ fn(ctx)   │ -        │ fn(ctx)->Option<> │ │
//! │  │ Expired  │ fn(ctx)   │ -        │ fn(ctx)->Option<> │ │
//! │  └──────────┴───────────┴──────────┴───────────────────┘ │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the current phase.  If it
//! returns `Some(next)`, the engine runs `on_exit` for the current phase,
//! then `on_enter` for the next.  All handlers receive `&mut ShotContext`.

pub mod chart;
pub mod context;
pub mod states;

use context::{BrewSession, ShotContext, ShotTiming};
use log::info;

use crate::config::HmiConfig;

pub use chart::ShotChart;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Phases of a shot.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ShotPhase {
    Idle = 0,
    /// Pump and lever on, start threshold not yet crossed.
    Arming = 1,
    Active = 2,
    /// Finished shot still displayed.
    Retained = 3,
    Expired = 4,
}

impl ShotPhase {
    /// Total number of phases, used to size the table array.
    pub const COUNT: usize = 5;

    /// Convert an index back to a phase.  Panics on out-of-range in debug
    /// builds; returns `Idle` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Arming,
            2 => Self::Active,
            3 => Self::Retained,
            4 => Self::Expired,
            _ => {
                debug_assert!(false, "invalid shot phase index: {idx}");
                Self::Idle
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut ShotContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut ShotContext) -> Option<ShotPhase>;

/// One row of the state table.
pub struct StateDescriptor {
    pub id: ShotPhase,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// The state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `ShotPhase as usize`.
    table: [StateDescriptor; ShotPhase::COUNT],
    current: usize,
    /// Time at which the current phase was entered.
    state_entry_ms: u64,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; ShotPhase::COUNT], initial: ShotPhase) -> Self {
        Self {
            table,
            current: initial as usize,
            state_entry_ms: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut ShotContext) {
        self.state_entry_ms = ctx.now_ms;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance by one tick using the inputs already written to `ctx`.
    pub fn tick(&mut self, ctx: &mut ShotContext) {
        ctx.ms_in_state = ctx.now_ms.saturating_sub(self.state_entry_ms);

        if let Some(next) = (self.table[self.current].on_update)(ctx) {
            self.transition(next, ctx);
        }
    }

    /// Jump to `next` regardless of the inputs.
    pub fn force_transition(&mut self, next: ShotPhase, ctx: &mut ShotContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> ShotPhase {
        ShotPhase::from_index(self.current)
    }

    fn transition(&mut self, next: ShotPhase, ctx: &mut ShotContext) {
        let next_idx = next as usize;
        info!(
            "SHOT: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.state_entry_ms = ctx.now_ms;
        ctx.ms_in_state = 0;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Owns the engine and its context; what the scheduler talks to.
pub struct ShotTracker {
    fsm: Fsm,
    ctx: ShotContext,
}

impl ShotTracker {
    pub fn new(config: &HmiConfig) -> Self {
        let mut ctx = ShotContext::new(ShotTiming::from_config(config));
        let mut fsm = Fsm::new(states::build_state_table(), ShotPhase::Idle);
        fsm.start(&mut ctx);
        Self { fsm, ctx }
    }

    /// Feed the current inputs and return the seconds to display.
    pub fn update(&mut self, now_ms: u64, pump_on: bool, lever_lifted: bool) -> u32 {
        self.ctx.now_ms = now_ms;
        self.ctx.pump_on = pump_on;
        self.ctx.lever_lifted = lever_lifted;
        self.fsm.tick(&mut self.ctx);
        self.ctx.displayed_secs
    }

    pub fn phase(&self) -> ShotPhase {
        self.fsm.current_state()
    }

    pub fn displayed_secs(&self) -> u32 {
        self.ctx.displayed_secs
    }

    pub fn session(&self) -> &BrewSession {
        &self.ctx.session
    }

    /// Start of the shot the chart should be plotting at `now_ms`, if any.
    ///
    /// The chart runs from the moment pump and lever go on, and for the
    /// chart retention window after a completed shot stops.
    pub fn chart_window(&self, now_ms: u64) -> Option<u64> {
        match self.phase() {
            ShotPhase::Arming | ShotPhase::Active => self.ctx.session.start_ms,
            ShotPhase::Retained => match self.ctx.session.chart_stop_ms {
                Some(stop) if now_ms < stop => self.ctx.session.start_ms,
                _ => None,
            },
            ShotPhase::Idle | ShotPhase::Expired => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: u64 = 50;

    fn make_tracker() -> ShotTracker {
        ShotTracker::new(&HmiConfig::default())
    }

    /// Drive the tracker from `from` to `to` (exclusive) every tick.
    fn run(t: &mut ShotTracker, from: u64, to: u64, pump: bool, lever: bool) -> Vec<u32> {
        (from..to)
            .step_by(TICK as usize)
            .map(|now| t.update(now, pump, lever))
            .collect()
    }

    #[test]
    fn starts_idle() {
        let t = make_tracker();
        assert_eq!(t.phase(), ShotPhase::Idle);
        assert_eq!(t.displayed_secs(), 0);
    }

    #[test]
    fn brief_tap_never_reports_a_shot() {
        let mut t = make_tracker();
        let shown = run(&mut t, 0, 500, true, true);
        assert_eq!(t.phase(), ShotPhase::Arming);
        shown.iter().for_each(|s| assert_eq!(*s, 0));

        assert_eq!(t.update(500, false, true), 0);
        assert_eq!(t.phase(), ShotPhase::Idle);
        assert!(!t.session().active);
    }

    #[test]
    fn start_time_is_when_both_signals_went_true() {
        let mut t = make_tracker();
        t.update(1000, true, false);
        t.update(1050, true, true);
        assert_eq!(t.session().start_ms, Some(1050));
    }

    #[test]
    fn threshold_is_strict() {
        let mut t = make_tracker();
        t.update(0, true, true);
        t.update(1000, true, true);
        assert_eq!(t.phase(), ShotPhase::Arming);
        t.update(1050, true, true);
        assert_eq!(t.phase(), ShotPhase::Active);
        assert_eq!(t.displayed_secs(), 1);
    }

    #[test]
    fn active_shot_counts_whole_seconds() {
        let mut t = make_tracker();
        run(&mut t, 0, 25_000, true, true);
        assert_eq!(t.phase(), ShotPhase::Active);
        assert_eq!(t.displayed_secs(), 24);
        assert!(t.session().active);
    }

    #[test]
    fn timing_is_not_capped() {
        let mut t = make_tracker();
        t.update(0, true, true);
        t.update(2000, true, true);
        assert_eq!(t.update(75_000, true, true), 75);
    }

    #[test]
    fn finished_shot_is_retained_then_expires() {
        let mut t = make_tracker();
        run(&mut t, 0, 28_100, true, true);
        assert_eq!(t.update(28_100, false, false), 28);
        assert_eq!(t.phase(), ShotPhase::Retained);
        assert_eq!(t.session().lever_lowered_ms, Some(28_100));
        assert_eq!(t.session().chart_stop_ms, Some(31_100));

        assert_eq!(t.update(38_050, false, false), 28);
        assert_eq!(t.update(38_100, false, false), 0);
        assert_eq!(t.phase(), ShotPhase::Expired);
        t.update(38_150, false, false);
        assert_eq!(t.phase(), ShotPhase::Idle);
    }

    #[test]
    fn chart_window_follows_retention() {
        let mut t = make_tracker();
        assert_eq!(t.chart_window(0), None);
        t.update(100, true, true);
        assert_eq!(t.chart_window(100), Some(100));
        t.update(5000, true, true);
        t.update(5100, true, false);
        assert_eq!(t.chart_window(8000), Some(100));
        assert_eq!(t.chart_window(8100), None);
    }

    #[test]
    fn aborted_arming_stops_the_chart() {
        let mut t = make_tracker();
        t.update(0, true, true);
        t.update(400, false, true);
        assert_eq!(t.chart_window(450), None);
    }

    #[test]
    fn new_shot_during_retention_restarts() {
        let mut t = make_tracker();
        t.update(0, true, true);
        t.update(5000, true, true);
        t.update(5050, false, false);
        assert_eq!(t.phase(), ShotPhase::Retained);

        assert_eq!(t.update(7000, true, true), 0);
        assert_eq!(t.phase(), ShotPhase::Arming);
        assert_eq!(t.session().start_ms, Some(7000));
        assert_eq!(t.session().completed_secs, 0);
    }

    #[test]
    fn phase_from_index_roundtrip() {
        for i in 0..ShotPhase::COUNT {
            assert_eq!(ShotPhase::from_index(i) as usize, i);
        }
    }

    #[test]
    fn force_transition_runs_enter() {
        let mut t = make_tracker();
        t.ctx.now_ms = 42;
        t.fsm.force_transition(ShotPhase::Arming, &mut t.ctx);
        assert_eq!(t.session().start_ms, Some(42));
    }
}
