//! Waveform plotting for the brewing page.
//!
//! While a shot runs, one sample per channel is added for every pixel
//! column the elapsed time has reached.  The x axis spans the maximum shot
//! time across the chart width.  Outside shots a debug trace of the scale
//! and flow filters is plotted at a fixed rate while that data is fresh.

use crate::app::machine::{MachineState, ProfilingMode, ProfilingSource, ProfilingTarget};
use crate::config::HmiConfig;
use crate::display::DisplayUpdate;
use crate::display::layout::{self, main_page};
use crate::profile::{Profile, target_at};

const PRESSURE_FULL_SCALE: f32 = 15.0;
const FLOW_FULL_SCALE: f32 = 5.0;
const DEBUG_WEIGHT_FULL_SCALE: f32 = 200.0;
const DEBUG_FLOW_FULL_SCALE: f32 = 10.0;


fn add(out: &mut Vec<DisplayUpdate>, channel: u8, value: u8) {
    out.push(DisplayUpdate::Command(layout::add_sample(
        main_page::WAVEFORM,
        channel,
        value,
    )));
}

#[derive(Debug, Clone)]
pub struct ShotChart {
    /// Chart size in pixels; 0 until read from the screen.
    width: u32,
    height: u32,
    plotting: bool,
    columns: u32,
    max_shot_ms: u64,
    debug_window_ms: u64,
    debug_interval_ms: u64,
    last_debug_plot_ms: Option<u64>,
}

impl ShotChart {
    pub fn new(config: &HmiConfig) -> Self {
        Self {
            width: 0,
            height: 0,
            plotting: false,
            columns: 0,
            max_shot_ms: u64::from(config.max_shot_time_secs.max(1)) * 1000,
            debug_window_ms: u64::from(config.debug_plot_window_ms),
            debug_interval_ms: u64::from(config.debug_plot_interval_ms),
            last_debug_plot_ms: None,
        }
    }

    /// Set the chart size once the screen reported it.  A non-positive
    /// dimension leaves the chart unsized.
    pub fn set_size(&mut self, width: i32, height: i32) {
        match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => {
                self.width = w;
                self.height = h;
            }
            _ => {
                self.width = 0;
                self.height = 0;
            }
        }
    }

    pub fn is_sized(&self) -> bool {
        self.width > 0
    }

    /// Map `value` in `0..=full_scale` onto the chart's pixel height.
    fn sample(&self, value: f32, full_scale: f32) -> u8 {
        let y = (value / full_scale * self.height as f32).round();
        y.clamp(0.0, self.height.min(255) as f32) as u8
    }

    pub fn is_plotting(&self) -> bool {
        self.plotting
    }

    /// Collect this tick's waveform writes.
    ///
    /// `window` is the start of the shot being plotted, if one is.
    pub fn update(
        &mut self,
        now_ms: u64,
        window: Option<u64>,
        machine: &MachineState,
        profile: &Profile,
    ) -> Vec<DisplayUpdate> {
        let mut out = Vec::new();
        if self.width == 0 {
            return out;
        }

        match window {
            Some(start_ms) => {
                if !self.plotting {
                    self.plotting = true;
                    self.columns = 0;
                    out.push(DisplayUpdate::Command(layout::clear_waveform(
                        main_page::WAVEFORM,
                    )));
                }
                let elapsed = now_ms.saturating_sub(start_ms).min(self.max_shot_ms);
                let due = elapsed * u64::from(self.width) / self.max_shot_ms;
                while u64::from(self.columns) < due {
                    self.plot_column(&mut out, machine, profile);
                    self.columns += 1;
                }
            }
            None => {
                self.plotting = false;
                self.plot_debug(&mut out, now_ms, machine);
            }
        }
        out
    }

    fn plot_column(&self, out: &mut Vec<DisplayUpdate>, machine: &MachineState, profile: &Profile) {
        add(out, 0, self.sample(machine.pressure, PRESSURE_FULL_SCALE));
        add(out, 1, self.sample(machine.flow_rate, FLOW_FULL_SCALE));

        let target = match machine.profiling_mode {
            ProfilingMode::Manual => return,
            ProfilingMode::Flat => machine.flat_value,
            ProfilingMode::Profile => {
                let x = match machine.profiling_target {
                    ProfilingTarget::Time => {
                        (u64::from(self.columns) * self.max_shot_ms / u64::from(self.width)) as f32
                            / 1000.0
                    }
                    ProfilingTarget::Weight => machine.weight,
                };
                target_at(profile, x)
            }
        };
        let full_scale = match machine.profiling_source {
            ProfilingSource::Pressure => PRESSURE_FULL_SCALE,
            ProfilingSource::Flow => FLOW_FULL_SCALE,
        };
        add(out, 2, self.sample(target, full_scale));
    }

    fn plot_debug(&mut self, out: &mut Vec<DisplayUpdate>, now_ms: u64, machine: &MachineState) {
        let fresh = machine
            .last_debug_ms
            .is_some_and(|t| now_ms.saturating_sub(t) < self.debug_window_ms);
        let due = self
            .last_debug_plot_ms
            .is_none_or(|t| now_ms.saturating_sub(t) > self.debug_interval_ms);
        if !(fresh && due) {
            return;
        }
        self.last_debug_plot_ms = Some(now_ms);
        add(out, 0, self.sample(machine.raw_weight, DEBUG_WEIGHT_FULL_SCALE));
        add(out, 1, self.sample(machine.filtered_weight, DEBUG_WEIGHT_FULL_SCALE));
        add(out, 2, self.sample(machine.filtered_flow, DEBUG_FLOW_FULL_SCALE));
    }
}
