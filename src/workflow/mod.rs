//! Scale calibration and cleaning cycle workflows.
//!
//! Both follow the same shape: a button publishes a request and starts a
//! timeout, the controller's `state` topic walks the workflow forward, and
//! a timeout without acknowledgement reverts it with a failure message.
//! Messages go to a single [`StatusLine`] on the system page.

pub mod calibration;
pub mod cleaning;

use heapless::String as BoundedString;
use log::{info, warn};

use crate::app::machine::{STATE_CAPACITY, bounded};
use crate::config::HmiConfig;
use crate::display::DisplayUpdate;
use crate::display::layout::system_page;
use crate::error::WorkflowError;

pub use calibration::{Calibration, CalibrationStep};
pub use cleaning::Cleaning;

/// Shown when a workflow is requested without a paired controller.
pub const NOT_CONNECTED: &str = "Error:\r\nNot connected to\r\nmain controller";

/// A side effect a workflow asks the scheduler to carry out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Publish and flush immediately.
    Publish { topic: &'static str, value: String },
    /// Show or hide the reference weight entry and its unit label.
    ReferenceWeightVisible(bool),
    /// Read the reference weight entry back from the screen.
    LoadReferenceWeight,
}

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

/// Short-lived status text with an optional auto-clear deadline.
#[derive(Debug, Clone, Default)]
pub struct StatusLine {
    text: String,
    clear_at_ms: Option<u64>,
    changed: bool,
    hold_ms: u32,
}

impl StatusLine {
    pub fn new(hold_ms: u32) -> Self {
        Self {
            hold_ms,
            ..Default::default()
        }
    }

    /// Show `text` until it is replaced.
    pub fn show(&mut self, text: &str) {
        self.clear_at_ms = None;
        self.set(text);
    }

    /// Show `text` and clear it after the hold time.
    pub fn flash(&mut self, text: &str, now_ms: u64) {
        self.clear_at_ms = Some(now_ms + u64::from(self.hold_ms));
        self.set(text);
    }

    pub fn clear(&mut self) {
        self.clear_at_ms = None;
        self.set("");
    }

    /// Apply the auto-clear deadline.
    pub fn poll(&mut self, now_ms: u64) {
        if self.clear_at_ms.is_some_and(|t| now_ms >= t) {
            self.clear();
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn clear_scheduled(&self) -> bool {
        self.clear_at_ms.is_some()
    }

    /// The screen write for a changed text, once.
    pub fn take_update(&mut self) -> Option<DisplayUpdate> {
        if !self.changed {
            return None;
        }
        self.changed = false;
        Some(DisplayUpdate::Text(system_page::MESSAGE.txt(), self.text.clone()))
    }

    fn set(&mut self, text: &str) {
        if self.text != text {
            self.text.clear();
            self.text.push_str(text);
            self.changed = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

/// Both workflows plus the status line and the last controller state.
#[derive(Debug, Clone)]
pub struct Workflows {
    pub status: StatusLine,
    pub calibration: Calibration,
    pub cleaning: Cleaning,
    previous_state: BoundedString<STATE_CAPACITY>,
}

impl Workflows {
    pub fn new(config: &HmiConfig) -> Self {
        Self {
            status: StatusLine::new(config.status_clear_ms),
            calibration: Calibration::new(config.calibration_timeout_ms),
            cleaning: Cleaning::new(config.cleaning_timeout_ms),
            previous_state: BoundedString::new(),
        }
    }

    /// Calibrate button released.
    pub fn request_calibration(&mut self, now_ms: u64, paired: bool) -> Vec<Effect> {
        if self.cleaning.is_active() {
            return Vec::new();
        }
        match self.calibration.request(now_ms, paired, &mut self.status) {
            Ok(effects) => effects,
            Err(e) => {
                self.report(e, now_ms);
                Vec::new()
            }
        }
    }

    /// Cleaning button released.
    pub fn request_cleaning(&mut self, now_ms: u64, paired: bool) -> Vec<Effect> {
        if self.calibration.is_active() {
            return Vec::new();
        }
        match self.cleaning.request(now_ms, paired, &mut self.status) {
            Ok(effects) => effects,
            Err(e) => {
                self.report(e, now_ms);
                Vec::new()
            }
        }
    }

    /// A `state` value arrived from the controller.
    pub fn on_machine_state(&mut self, state: &str, now_ms: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        let previous = self.previous_state.clone();

        if self.cleaning.on_state(state, &previous, now_ms, &mut self.status) {
            // Handled by the cleaning cycle.
        } else {
            match self
                .calibration
                .on_state(state, &previous, now_ms, &mut self.status)
            {
                calibration::StateOutcome::Handled(mut e) => effects.append(&mut e),
                // Keep the previous state so completion is judged later.
                calibration::StateOutcome::Ignored => return effects,
                calibration::StateOutcome::NotInvolved => {
                    if !self.is_busy() && !self.status.clear_scheduled() {
                        self.status.clear();
                    }
                }
            }
        }

        self.previous_state = bounded(state);
        effects
    }

    /// Timeouts and the status auto-clear; call once per tick.
    pub fn poll(&mut self, now_ms: u64) -> Vec<Effect> {
        self.status.poll(now_ms);
        let mut effects = Vec::new();

        if self.calibration.timed_out(now_ms) {
            warn!("CALIBRATION: request timed out");
            self.calibration.reset();
            self.status.flash("Calibration Failed:\r\nTimeout", now_ms);
            effects.push(Effect::ReferenceWeightVisible(false));
        }
        if self.cleaning.timed_out(now_ms) {
            warn!("CLEANING: request timed out");
            self.cleaning.reset();
            self.status.flash("Cleaning Failed:\r\nTimeout", now_ms);
        }
        effects
    }

    /// The system page was just shown.
    pub fn on_system_page(&mut self) -> Vec<Effect> {
        if !self.is_busy() {
            self.status.clear();
        }
        if self.calibration.step() == CalibrationStep::WaitingWeigh {
            Vec::new()
        } else {
            vec![Effect::ReferenceWeightVisible(false)]
        }
    }

    /// A workflow or an unanswered request owns the status line.
    pub fn is_busy(&self) -> bool {
        self.calibration.is_active() || self.cleaning.is_active()
    }

    fn report(&mut self, e: WorkflowError, now_ms: u64) {
        info!("WORKFLOW: request rejected: {e}");
        match e {
            WorkflowError::NotPaired => self.status.flash(NOT_CONNECTED, now_ms),
            WorkflowError::MissingReferenceWeight => self.status.flash(
                "Error: Set reference weight\r\nusing encoder first (e.g., 100)",
                now_ms,
            ),
            WorkflowError::Busy
            | WorkflowError::CalibrationTimeout
            | WorkflowError::CleaningTimeout => {}
        }
    }
}
