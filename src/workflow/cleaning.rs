//! Backflush cleaning cycle driven by the controller's state reports.
//!
//! Cycles 1..=4 run with detergent, cycle 5 asks for the detergent to be
//! removed, and later cycles are plain flushes.

use core::fmt::Write;

use log::info;

use super::{Effect, StatusLine};
use crate::error::WorkflowError;

const STATE_START: &str = "CLEANING_START";
const STATE_PUMPING: &str = "CLEANING_PUMPING";
const STATE_PAUSE: &str = "CLEANING_PAUSE";
const STATE_FAMILY: &str = "CLEANING";

/// Cycle after which the detergent must be removed.
const DETERGENT_CYCLES: u32 = 5;

#[derive(Debug, Clone)]
pub struct Cleaning {
    active: bool,
    cycle: u32,
    requested_at_ms: Option<u64>,
    timeout_ms: u32,
}

impl Cleaning {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            active: false,
            cycle: 0,
            requested_at_ms: None,
            timeout_ms,
        }
    }

    /// A cycle is running or a request awaits acknowledgement.
    pub fn is_active(&self) -> bool {
        self.active || self.requested_at_ms.is_some()
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub(super) fn timed_out(&self, now_ms: u64) -> bool {
        self.requested_at_ms
            .is_some_and(|t| now_ms.saturating_sub(t) >= u64::from(self.timeout_ms))
    }

    pub(super) fn reset(&mut self) {
        self.active = false;
        self.cycle = 0;
        self.requested_at_ms = None;
    }

    /// The cleaning button was released.
    pub(super) fn request(
        &mut self,
        now_ms: u64,
        paired: bool,
        status: &mut StatusLine,
    ) -> Result<Vec<Effect>, WorkflowError> {
        if !paired {
            return Err(WorkflowError::NotPaired);
        }
        if self.is_active() {
            return Err(WorkflowError::Busy);
        }
        info!("CLEANING: requested");
        self.requested_at_ms = Some(now_ms);
        status.show("Cleaning cycle requested...");
        Ok(vec![Effect::Publish {
            topic: "start_cleaning",
            value: "true".into(),
        }])
    }

    /// Returns `true` if the state belonged to the cleaning cycle.
    pub(super) fn on_state(
        &mut self,
        state: &str,
        previous: &str,
        now_ms: u64,
        status: &mut StatusLine,
    ) -> bool {
        let mut msg = String::new();
        match state {
            STATE_START => {
                self.cycle = 1;
                status.show("Cleaning Cycle:\r\nAdd detergent\r\nPull lever to start");
            }
            STATE_PUMPING => {
                if previous == STATE_PAUSE {
                    self.cycle += 1;
                }
                let _ = write!(
                    msg,
                    "Pumping... (Cycle {})\r\nLower lever when buzzing",
                    self.cycle
                );
                status.show(&msg);
            }
            STATE_PAUSE => {
                let _ = match self.cycle {
                    c if c < DETERGENT_CYCLES => {
                        write!(msg, "Cleaning... (Cycle {c})\r\nLift lever")
                    }
                    DETERGENT_CYCLES => write!(
                        msg,
                        "Flushing... (Cycle {DETERGENT_CYCLES})\r\nRemove detergent, lift lever"
                    ),
                    c => write!(msg, "Flushing... (Cycle {c})\r\nLift lever"),
                };
                status.show(&msg);
            }
            _ if self.active
                && !state.contains(STATE_FAMILY)
                && self.requested_at_ms.is_none() =>
            {
                info!("CLEANING: complete after {} cycles", self.cycle);
                self.reset();
                status.flash("Cleaning Complete", now_ms);
                return true;
            }
            _ => return false,
        }
        if !self.active {
            info!("CLEANING: cycle running");
        }
        self.active = true;
        self.requested_at_ms = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Cleaning, StatusLine) {
        (Cleaning::new(10_000), StatusLine::new(5000))
    }

    /// Feed a sequence of states with the previous one tracked.
    fn feed(c: &mut Cleaning, s: &mut StatusLine, states: &[&str]) {
        let mut previous = "";
        for state in states {
            c.on_state(state, previous, 0, s);
            previous = state;
        }
    }

    #[test]
    fn request_publishes_once() {
        let (mut c, mut s) = setup();
        assert_eq!(
            c.request(0, true, &mut s),
            Ok(vec![Effect::Publish {
                topic: "start_cleaning",
                value: "true".into()
            }])
        );
        assert_eq!(c.request(10, true, &mut s), Err(WorkflowError::Busy));
        assert_eq!(s.text(), "Cleaning cycle requested...");
    }

    #[test]
    fn cycles_count_on_pause_to_pumping() {
        let (mut c, mut s) = setup();
        feed(
            &mut c,
            &mut s,
            &[STATE_START, STATE_PUMPING, STATE_PUMPING, STATE_PAUSE, STATE_PUMPING],
        );
        assert_eq!(c.cycle(), 2);
        assert_eq!(s.text(), "Pumping... (Cycle 2)\r\nLower lever when buzzing");
    }

    #[test]
    fn pause_messages_by_cycle() {
        let (mut c, mut s) = setup();
        let mut states = vec![STATE_START];
        for _ in 0..4 {
            states.extend([STATE_PUMPING, STATE_PAUSE]);
        }
        feed(&mut c, &mut s, &states);
        assert_eq!(c.cycle(), 4);
        assert_eq!(s.text(), "Cleaning... (Cycle 4)\r\nLift lever");

        c.on_state(STATE_PUMPING, STATE_PAUSE, 0, &mut s);
        c.on_state(STATE_PAUSE, STATE_PUMPING, 0, &mut s);
        assert_eq!(s.text(), "Flushing... (Cycle 5)\r\nRemove detergent, lift lever");

        c.on_state(STATE_PUMPING, STATE_PAUSE, 0, &mut s);
        c.on_state(STATE_PAUSE, STATE_PUMPING, 0, &mut s);
        assert_eq!(s.text(), "Flushing... (Cycle 6)\r\nLift lever");
    }

    #[test]
    fn leaving_cleaning_states_completes() {
        let (mut c, mut s) = setup();
        feed(&mut c, &mut s, &[STATE_START, STATE_PUMPING]);
        assert!(c.on_state("IDLE", STATE_PUMPING, 100, &mut s));
        assert!(!c.is_active());
        assert_eq!(s.text(), "Cleaning Complete");
        assert!(s.clear_scheduled());
    }

    #[test]
    fn unrelated_state_while_idle_is_not_handled() {
        let (mut c, mut s) = setup();
        assert!(!c.on_state("BREWING", "IDLE", 0, &mut s));
    }

    #[test]
    fn acknowledgement_clears_request() {
        let (mut c, mut s) = setup();
        c.request(0, true, &mut s).unwrap();
        c.on_state(STATE_START, "IDLE", 500, &mut s);
        assert!(!c.timed_out(60_000));
        assert!(c.is_active());
    }
}
