//! Shot state handlers and table builder.
//!
//! ```text
//!  IDLE ──[pump+lever]──▶ ARMING ──[> threshold]──▶ ACTIVE
//!   ▲                       │                          │
//!   │◀──────[released]──────┘                   [released]
//!   │                                                  ▼
//!   └──────── EXPIRED ◀──────[retention over]──── RETAINED
//!                                                      │
//!                ARMING ◀────────[pump+lever]──────────┘
//! ```

use log::info;

use super::context::ShotContext;
use super::{ShotPhase, StateDescriptor};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.
pub fn build_state_table() -> [StateDescriptor; ShotPhase::COUNT] {
    [
        // Index 0: Idle
        StateDescriptor {
            id: ShotPhase::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: idle_update,
        },
        // Index 1: Arming
        StateDescriptor {
            id: ShotPhase::Arming,
            name: "Arming",
            on_enter: Some(arming_enter),
            on_exit: None,
            on_update: arming_update,
        },
        // Index 2: Active
        StateDescriptor {
            id: ShotPhase::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_exit: Some(active_exit),
            on_update: active_update,
        },
        // Index 3: Retained
        StateDescriptor {
            id: ShotPhase::Retained,
            name: "Retained",
            on_enter: Some(retained_enter),
            on_exit: None,
            on_update: retained_update,
        },
        // Index 4: Expired
        StateDescriptor {
            id: ShotPhase::Expired,
            name: "Expired",
            on_enter: Some(expired_enter),
            on_exit: None,
            on_update: expired_update,
        },
    ]
}

fn whole_secs(ms: u64) -> u32 {
    u32::try_from(ms / 1000).unwrap_or(u32::MAX)
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut ShotContext) {
    ctx.session = Default::default();
    ctx.displayed_secs = 0;
}

fn idle_update(ctx: &mut ShotContext) -> Option<ShotPhase> {
    ctx.brewing().then_some(ShotPhase::Arming)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ARMING state: pump and lever on, threshold not yet crossed
// ═══════════════════════════════════════════════════════════════════════════

fn arming_enter(ctx: &mut ShotContext) {
    // The shot is timed from the moment both signals went true.
    ctx.session = Default::default();
    ctx.session.start_ms = Some(ctx.now_ms);
    ctx.displayed_secs = 0;
}

fn arming_update(ctx: &mut ShotContext) -> Option<ShotPhase> {
    if !ctx.brewing() {
        return Some(ShotPhase::Idle);
    }
    if ctx.elapsed_ms() > u64::from(ctx.timing.start_threshold_ms) {
        return Some(ShotPhase::Active);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE state
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut ShotContext) {
    ctx.session.active = true;
    ctx.displayed_secs = whole_secs(ctx.elapsed_ms());
    info!("SHOT: started");
}

fn active_exit(ctx: &mut ShotContext) {
    ctx.session.active = false;
}

fn active_update(ctx: &mut ShotContext) -> Option<ShotPhase> {
    let secs = whole_secs(ctx.elapsed_ms());
    if ctx.brewing() {
        ctx.displayed_secs = secs;
        None
    } else {
        ctx.session.completed_secs = secs;
        Some(ShotPhase::Retained)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RETAINED state: finished shot still on screen
// ═══════════════════════════════════════════════════════════════════════════

fn retained_enter(ctx: &mut ShotContext) {
    ctx.session.lever_lowered_ms = Some(ctx.now_ms);
    ctx.session.chart_stop_ms = Some(ctx.now_ms + u64::from(ctx.timing.chart_retention_ms));
    ctx.displayed_secs = ctx.session.completed_secs;
    info!("SHOT: finished after {} s", ctx.session.completed_secs);
}

fn retained_update(ctx: &mut ShotContext) -> Option<ShotPhase> {
    if ctx.brewing() {
        return Some(ShotPhase::Arming);
    }
    if ctx.ms_in_state >= u64::from(ctx.timing.retention_ms) {
        return Some(ShotPhase::Expired);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  EXPIRED state: retention over, one tick before idling
// ═══════════════════════════════════════════════════════════════════════════

fn expired_enter(ctx: &mut ShotContext) {
    ctx.session.completed_secs = 0;
    ctx.displayed_secs = 0;
}

fn expired_update(ctx: &mut ShotContext) -> Option<ShotPhase> {
    if ctx.brewing() {
        Some(ShotPhase::Arming)
    } else {
        Some(ShotPhase::Idle)
    }
}
