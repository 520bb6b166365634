//! Scale calibration: tare with an empty scale, then weigh a known mass.
//!
//! ```text
//!  Idle ──[button]──▶ (requested) ──[CALIBRATION_EMPTY]──▶ WaitingTare
//!  WaitingTare ──[button]──▶ TareConfirmSent ──[CALIBRATION_TEST_WEIGHT]──▶ WaitingWeigh
//!  WaitingWeigh ──[button]──▶ WeighConfirmSent ──[any other state]──▶ Idle
//! ```
//!
//! The confirm-sent steps swallow repeats of the state that led into them,
//! so one button press yields exactly one confirmation.

use log::info;

use super::{Effect, StatusLine};
use crate::error::WorkflowError;

/// Reference weight limits, grams.
pub const REFERENCE_WEIGHT_MAX: f32 = 500.0;
/// Reference weight change per encoder tick, grams.
pub const REFERENCE_WEIGHT_STEP: f32 = 0.5;
/// Reference weight used when the screen cannot be read.
pub const DEFAULT_REFERENCE_WEIGHT: f32 = 100.0;

const STATE_EMPTY: &str = "CALIBRATION_EMPTY";
const STATE_TEST_WEIGHT: &str = "CALIBRATION_TEST_WEIGHT";
const STATE_FAMILY: &str = "CALIBRATION";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationStep {
    #[default]
    Idle,
    WaitingTare,
    WaitingWeigh,
    TareConfirmSent,
    WeighConfirmSent,
}

/// What a controller state meant for the calibration.
#[derive(Debug, Clone, PartialEq)]
pub enum StateOutcome {
    /// The state moved the workflow; carry out these effects.
    Handled(Vec<Effect>),
    /// A repeat swallowed by a confirm-sent step, or a pending request.
    Ignored,
    /// No calibration in progress and not a calibration state.
    NotInvolved,
}

#[derive(Debug, Clone)]
pub struct Calibration {
    step: CalibrationStep,
    requested_at_ms: Option<u64>,
    reference_grams: f32,
    timeout_ms: u32,
}

impl Calibration {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            step: CalibrationStep::Idle,
            requested_at_ms: None,
            reference_grams: DEFAULT_REFERENCE_WEIGHT,
            timeout_ms,
        }
    }

    pub fn step(&self) -> CalibrationStep {
        self.step
    }

    pub fn is_active(&self) -> bool {
        self.step != CalibrationStep::Idle || self.requested_at_ms.is_some()
    }

    pub fn reference_weight(&self) -> f32 {
        self.reference_grams
    }

    pub fn set_reference_weight(&mut self, grams: f32) {
        self.reference_grams = grams.clamp(0.0, REFERENCE_WEIGHT_MAX);
    }

    /// Move the reference weight by encoder ticks.  Returns the new entry
    /// value (tenths of a gram) if it changed.
    pub fn adjust_reference_weight(&mut self, ticks: i32) -> Option<i32> {
        let next = (self.reference_grams + ticks as f32 * REFERENCE_WEIGHT_STEP)
            .clamp(0.0, REFERENCE_WEIGHT_MAX);
        if next == self.reference_grams {
            return None;
        }
        self.reference_grams = next;
        Some((next * 10.0) as i32)
    }

    pub(super) fn timed_out(&self, now_ms: u64) -> bool {
        self.requested_at_ms
            .is_some_and(|t| now_ms.saturating_sub(t) >= u64::from(self.timeout_ms))
    }

    pub(super) fn reset(&mut self) {
        self.step = CalibrationStep::Idle;
        self.requested_at_ms = None;
    }

    /// The calibrate button was released.
    pub(super) fn request(
        &mut self,
        now_ms: u64,
        paired: bool,
        status: &mut StatusLine,
    ) -> Result<Vec<Effect>, WorkflowError> {
        if !paired {
            return Err(WorkflowError::NotPaired);
        }
        match self.step {
            CalibrationStep::Idle => {
                info!("CALIBRATION: requested");
                self.requested_at_ms = Some(now_ms);
                status.show("Calibration requested...");
                Ok(vec![
                    Effect::Publish {
                        topic: "calibratescale",
                        value: String::new(),
                    },
                    Effect::ReferenceWeightVisible(false),
                ])
            }
            CalibrationStep::WaitingTare => {
                self.step = CalibrationStep::TareConfirmSent;
                status.show("Taring scale...\r\nPlease wait...");
                Ok(vec![Effect::Publish {
                    topic: "calibration_step",
                    value: "0.0".into(),
                }])
            }
            CalibrationStep::WaitingWeigh => {
                if self.reference_grams <= 0.0 {
                    return Err(WorkflowError::MissingReferenceWeight);
                }
                self.step = CalibrationStep::WeighConfirmSent;
                status.show("Weighing... Finishing calibration");
                Ok(vec![
                    Effect::ReferenceWeightVisible(false),
                    Effect::Publish {
                        topic: "calibration_step",
                        value: format!("{:.1}", self.reference_grams),
                    },
                ])
            }
            CalibrationStep::TareConfirmSent | CalibrationStep::WeighConfirmSent => {
                Err(WorkflowError::Busy)
            }
        }
    }

    /// A controller state arrived (and was not a cleaning state).
    pub(super) fn on_state(
        &mut self,
        state: &str,
        previous: &str,
        now_ms: u64,
        status: &mut StatusLine,
    ) -> StateOutcome {
        match state {
            STATE_EMPTY => {
                if self.step == CalibrationStep::TareConfirmSent {
                    return StateOutcome::Ignored;
                }
                self.requested_at_ms = None;
                if self.step != CalibrationStep::WaitingTare {
                    self.step = CalibrationStep::WaitingTare;
                    info!("CALIBRATION: waiting for tare");
                }
                status.show("Calibration Started:\r\nEnsure scale is empty.\r\nPress button to tare");
                StateOutcome::Handled(Vec::new())
            }
            STATE_TEST_WEIGHT => {
                if self.step == CalibrationStep::WeighConfirmSent {
                    return StateOutcome::Ignored;
                }
                self.requested_at_ms = None;
                status.show("Tare Complete.\r\nPlace weight on scale.\r\nPress button to weigh");
                if self.step == CalibrationStep::WaitingWeigh {
                    return StateOutcome::Handled(Vec::new());
                }
                self.step = CalibrationStep::WaitingWeigh;
                info!("CALIBRATION: waiting for reference weight");
                StateOutcome::Handled(vec![
                    Effect::ReferenceWeightVisible(true),
                    Effect::LoadReferenceWeight,
                ])
            }
            _ if self.step != CalibrationStep::Idle => {
                if self.requested_at_ms.is_some() {
                    return StateOutcome::Ignored;
                }
                if previous.contains(STATE_FAMILY) {
                    status.flash("Calibration Complete", now_ms);
                    info!("CALIBRATION: complete");
                } else {
                    status.flash("Calibration Cancelled", now_ms);
                    info!("CALIBRATION: cancelled");
                }
                self.step = CalibrationStep::Idle;
                StateOutcome::Handled(vec![Effect::ReferenceWeightVisible(false)])
            }
            _ => StateOutcome::NotInvolved,
        }
    }
}
