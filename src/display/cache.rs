//! Push-side change detection for the live readouts.
//!
//! Each readout remembers the value last written to the screen.  A new value
//! is only pushed when it differs by more than the field's tolerance, which
//! keeps traffic on the slow serial link down to actual changes.

use heapless::String;
use log::debug;

use super::DisplayUpdate;
use super::layout::{
    self, BOILER_GAUGE, BOILER_TEMP_TEXT, BREW_GAUGE, HX_TEMP_TEXT, SETPOINT_ARROW, main_page,
};
use crate::config::HmiConfig;

/// Capacity of the machine state label.
pub const STATE_CAPACITY: usize = 63;

/// A float readout with an absolute tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedFloat {
    last: f32,
    tolerance: f32,
}

impl CachedFloat {
    pub const fn new(initial: f32, tolerance: f32) -> Self {
        Self {
            last: initial,
            tolerance,
        }
    }

    /// Record `value` and return `true` if it moved by more than the tolerance.
    pub fn update(&mut self, value: f32) -> bool {
        if (value - self.last).abs() > self.tolerance {
            self.last = value;
            true
        } else {
            false
        }
    }

    pub fn last(&self) -> f32 {
        self.last
    }
}

/// A discrete readout that is pushed on any change.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedExact<T> {
    last: T,
}

impl<T: PartialEq + Clone> CachedExact<T> {
    pub const fn new(initial: T) -> Self {
        Self { last: initial }
    }

    pub fn update(&mut self, value: &T) -> bool {
        if *value == self.last {
            false
        } else {
            self.last = value.clone();
            true
        }
    }

    pub fn last(&self) -> &T {
        &self.last
    }
}

/// The values the readouts are derived from on one tick.
#[derive(Debug, Clone, Copy)]
pub struct DisplayView<'a> {
    pub shot_secs: u32,
    pub hx_temp: f32,
    pub boiler_temp: f32,
    /// Brew setpoint in tenths of a degree.
    pub setpoint_tenths: f32,
    pub weight: f32,
    pub machine_state: &'a str,
}

/// Last-pushed values of every live readout.
#[derive(Debug, Clone)]
pub struct DisplayCache {
    shot_secs: CachedExact<i64>,
    hx_temp: CachedFloat,
    boiler_temp: CachedFloat,
    setpoint: CachedFloat,
    weight: CachedFloat,
    machine_state: CachedExact<String<STATE_CAPACITY>>,
}

impl DisplayCache {
    /// Every readout starts out stale, so the first refresh pushes them all.
    pub fn new(config: &HmiConfig) -> Self {
        Self {
            shot_secs: CachedExact::new(-1),
            hx_temp: CachedFloat::new(-1.0, config.temperature_tolerance),
            boiler_temp: CachedFloat::new(-1.0, config.temperature_tolerance),
            setpoint: CachedFloat::new(0.0, config.temperature_tolerance),
            weight: CachedFloat::new(-1.0, config.weight_tolerance),
            machine_state: CachedExact::new(String::new()),
        }
    }

    /// Forget everything pushed so far (after the screen was reset).
    pub fn invalidate(&mut self, config: &HmiConfig) {
        *self = Self::new(config);
    }

    pub fn last_boiler_temp(&self) -> f32 {
        self.boiler_temp.last()
    }

    pub fn last_hx_temp(&self) -> f32 {
        self.hx_temp.last()
    }

    /// Compare `view` against the cache and collect the writes it needs.
    pub fn refresh(&mut self, view: &DisplayView<'_>) -> Vec<DisplayUpdate> {
        let mut out = Vec::new();

        if self.shot_secs.update(&i64::from(view.shot_secs)) {
            if view.shot_secs == 0 {
                out.push(DisplayUpdate::Text(main_page::SHOT_TIME.txt(), "".into()));
                out.push(DisplayUpdate::Command(layout::clear_waveform(
                    main_page::WAVEFORM,
                )));
            } else {
                out.push(DisplayUpdate::Text(
                    main_page::SHOT_TIME.txt(),
                    view.shot_secs.to_string(),
                ));
            }
        }

        if self.hx_temp.update(view.hx_temp) {
            let text = format!("{:4.1}", view.hx_temp);
            let pic = layout::brew_gauge_picture(view.hx_temp);
            for (label, gauge) in HX_TEMP_TEXT.iter().zip(BREW_GAUGE) {
                out.push(DisplayUpdate::Text(label.txt(), text.clone()));
                out.push(DisplayUpdate::Number(gauge.attr("pic"), pic));
            }
        }

        if self.boiler_temp.update(view.boiler_temp) {
            let text = format!("{:4.1}", view.boiler_temp);
            let pic = layout::boiler_gauge_picture(view.boiler_temp);
            for (label, gauge) in BOILER_TEMP_TEXT.iter().zip(BOILER_GAUGE) {
                out.push(DisplayUpdate::Text(label.txt(), text.clone()));
                out.push(DisplayUpdate::Number(gauge.attr("pic"), pic));
            }
        }

        if self.setpoint.update(view.setpoint_tenths) {
            let pic = layout::setpoint_arrow_picture(view.setpoint_tenths);
            for arrow in SETPOINT_ARROW {
                out.push(DisplayUpdate::Number(arrow.attr("pic"), pic));
            }
        }

        if self.weight.update(view.weight) {
            out.push(DisplayUpdate::Text(
                main_page::WEIGHT.txt(),
                format!("{:.1}g", view.weight),
            ));
        }

        let mut state = String::new();
        for c in view.machine_state.chars() {
            if state.push(c).is_err() {
                break;
            }
        }
        if self.machine_state.update(&state) {
            out.push(DisplayUpdate::Text(
                main_page::MACHINE_STATE.txt(),
                view.machine_state.into(),
            ));
        }

        if !out.is_empty() {
            debug!("DISPLAY: {} readout writes", out.len());
        }
        out
    }
}
