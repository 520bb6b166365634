//! Local editing of settings with the dial and push button.
//!
//! Dial ticks are routed by the page on screen:
//!
//! | page      | edits                                                     |
//! |-----------|-----------------------------------------------------------|
//! | settings  | brew temperature slider, clamped to its screen bounds     |
//! | profiling | flat value, active profile (name selected), step cells    |
//! | system    | calibration reference weight                              |
//!
//! Edited settings are published once the dial has been idle for the
//! configured delay, so a fast turn yields a single message.

use log::{debug, info, warn};

use crate::app::machine::{MachineState, ProfilingMode};
use crate::app::ports::StoragePort;
use crate::display::DisplayUpdate;
use crate::display::layout::{
    HIGHLIGHT_COLOR, NAME_SELECTION, PLAIN_COLOR, Page, profiling_page, settings_page, system_page,
};
use crate::profile::text::{clamp_cell, render_grid};
use crate::profile::{Profile, ProfileStore, json};
use crate::workflow::Calibration;

/// Change of a flat value or step cell per dial tick.
const CELL_STEP: f32 = 0.1;

/// Pixel height of one grid row, used to decide when to scroll.
const GRID_ROW_HEIGHT: i32 = 20;
/// Scroll offset per row once the cursor runs off the visible grid.
const GRID_SCROLL_STEP: i32 = 12;

/// A setting edited locally and not yet published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingSetting {
    BrewTemperature,
    FlatValue,
    Profile,
}

/// Holds the most recent edit until the dial has been idle long enough.
#[derive(Debug, Clone)]
pub struct PendingPublish {
    pending: Option<PendingSetting>,
    last_activity_ms: u64,
    idle_ms: u64,
}

impl PendingPublish {
    pub fn new(idle_ms: u32) -> Self {
        Self {
            pending: None,
            last_activity_ms: 0,
            idle_ms: u64::from(idle_ms),
        }
    }

    /// Record an edit.  A later edit replaces an earlier one.
    pub fn mark(&mut self, setting: PendingSetting, now_ms: u64) {
        self.pending = Some(setting);
        self.last_activity_ms = now_ms;
    }

    pub fn pending(&self) -> Option<PendingSetting> {
        self.pending
    }

    /// The pending setting, once the dial has been idle for the delay.
    pub fn take_due(&mut self, now_ms: u64) -> Option<PendingSetting> {
        if now_ms.saturating_sub(self.last_activity_ms) < self.idle_ms {
            return None;
        }
        self.pending.take()
    }

    /// The pending setting, regardless of the delay.
    pub fn take(&mut self) -> Option<PendingSetting> {
        self.pending.take()
    }
}

// ---------------------------------------------------------------------------
// Profile cursor
// ---------------------------------------------------------------------------

/// Selected cell of the profile grid, mirrored in the page's hidden
/// `row`/`column`/`selection` variables.
///
/// Selections `0..2n` walk the cells of an `n`-step grid row by row, target
/// then duration.  [`NAME_SELECTION`] selects the profile name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileCursor {
    pub selection: i32,
    pub row: i32,
    pub column: i32,
}

impl ProfileCursor {
    pub fn is_name_selected(&self) -> bool {
        self.selection == NAME_SELECTION
    }

    /// The cell under the cursor, if it is inside a grid of `step_count` rows.
    pub fn cell(&self, step_count: usize) -> Option<(usize, usize)> {
        let row = usize::try_from(self.row).ok()?;
        let column = usize::try_from(self.column).ok()?;
        (self.selection < NAME_SELECTION && row < step_count && column < 2)
            .then_some((row, column))
    }

    /// Adopt the values read back from the screen.
    pub fn sync(&mut self, row: i32, column: i32, selection: i32) {
        *self = Self {
            selection,
            row,
            column,
        };
    }

    /// Back to the first cell.
    pub fn reset(&mut self) -> Vec<DisplayUpdate> {
        *self = Self::default();
        self.variables()
    }

    /// The name field was tapped.
    pub fn select_name(&mut self) -> Vec<DisplayUpdate> {
        self.selection = NAME_SELECTION;
        self.column = 2;
        vec![
            DisplayUpdate::Number(profiling_page::COLUMN.val(), self.column),
            DisplayUpdate::Number(profiling_page::SELECTION.val(), self.selection),
        ]
    }

    /// Button press: move to the next cell, then the name, then wrap.
    ///
    /// `scroll_y` is the grid's current scroll offset and `grid_height` its
    /// visible height, both in pixels.
    pub fn advance(
        &mut self,
        step_count: usize,
        scroll_y: i32,
        grid_height: i32,
    ) -> Vec<DisplayUpdate> {
        let name_bco = profiling_page::PROFILE_NAME.attr("bco");
        let last_cell = step_count as i32 * 2 - 1;

        if self.selection >= NAME_SELECTION {
            let mut out = self.reset();
            out.push(DisplayUpdate::Number(profiling_page::VALUES.attr("val_y"), 0));
            out.push(DisplayUpdate::Number(name_bco, PLAIN_COLOR));
            return out;
        }

        if self.selection >= last_cell {
            self.selection = NAME_SELECTION;
            self.column = 2;
            self.row = 0;
            let mut out = self.variables();
            out.push(DisplayUpdate::Number(name_bco, HIGHLIGHT_COLOR));
            return out;
        }

        self.selection += 1;
        if self.column == 0 {
            self.column = 1;
        } else {
            self.row += 1;
            self.column = 0;
        }
        let mut out = vec![DisplayUpdate::Number(name_bco, PLAIN_COLOR)];
        out.extend(self.variables());
        if (1 + self.row) * GRID_ROW_HEIGHT - scroll_y >= grid_height {
            out.push(DisplayUpdate::Number(
                profiling_page::VALUES.attr("val_y"),
                (1 + self.row) * GRID_SCROLL_STEP,
            ));
        }
        out
    }

    fn variables(&self) -> Vec<DisplayUpdate> {
        vec![
            DisplayUpdate::Number(profiling_page::COLUMN.val(), self.column),
            DisplayUpdate::Number(profiling_page::ROW.val(), self.row),
            DisplayUpdate::Number(profiling_page::SELECTION.val(), self.selection),
        ]
    }
}

// ---------------------------------------------------------------------------
// Screen writes shared with the service
// ---------------------------------------------------------------------------

/// Grid, name and stepped switch for a newly selected or replaced profile.
pub fn profile_ui(profile: &Profile) -> Vec<DisplayUpdate> {
    vec![
        DisplayUpdate::Text(profiling_page::VALUES.txt(), render_grid(profile)),
        DisplayUpdate::Text(profiling_page::PROFILE_NAME.txt(), profile.name().into()),
        DisplayUpdate::Number(profiling_page::STEPPED.val(), i32::from(profile.is_stepped())),
    ]
}

/// Flat value as shown in its text field.
pub fn flat_text(value: f32) -> String {
    format!("{value:4.1}")
}

/// Topic and value to publish for a settled edit.
pub fn publication(
    setting: PendingSetting,
    slider_value: i32,
    machine: &MachineState,
    profile: &Profile,
) -> (&'static str, String) {
    match setting {
        PendingSetting::BrewTemperature => {
            ("tempsetbrew", format!("{:.3}", slider_value as f32 / 10.0))
        }
        PendingSetting::FlatValue => ("profiling_flat_value", format!("{:.1}", machine.flat_value)),
        PendingSetting::Profile => ("profile_data", json::export(profile)),
    }
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

/// Dial and button state of the local editor.
#[derive(Debug, Clone)]
pub struct SettingsEditor {
    pub cursor: ProfileCursor,
    pub pending: PendingPublish,
    /// Brew temperature slider, tenths of a degree.
    slider_value: i32,
    slider_min: i32,
    slider_max: i32,
    /// Visible height of the profile grid, pixels.
    grid_height: i32,
}

impl SettingsEditor {
    pub fn new(publish_idle_ms: u32) -> Self {
        Self {
            cursor: ProfileCursor::default(),
            pending: PendingPublish::new(publish_idle_ms),
            slider_value: 930,
            slider_min: 800,
            slider_max: 1050,
            grid_height: 0,
        }
    }

    /// Adopt the slider bounds and grid metrics read back at startup.
    pub fn set_layout(&mut self, slider_min: i32, slider_max: i32, slider_value: i32, grid_height: i32) {
        self.slider_min = slider_min.min(slider_max);
        self.slider_max = slider_max.max(slider_min);
        self.slider_value = slider_value.clamp(self.slider_min, self.slider_max);
        self.grid_height = grid_height;
    }

    pub fn slider_value(&self) -> i32 {
        self.slider_value
    }

    /// The controller reported a new brew setpoint.
    pub fn set_slider_value(&mut self, tenths: i32) {
        self.slider_value = tenths;
    }

    pub fn grid_height(&self) -> i32 {
        self.grid_height
    }

    /// Route drained dial ticks to whatever the current page edits.
    #[allow(clippy::too_many_arguments)]
    pub fn on_dial(
        &mut self,
        ticks: i32,
        page: Page,
        machine: &mut MachineState,
        profiles: &mut ProfileStore,
        calibration: &mut Calibration,
        storage: &mut impl StoragePort,
        now_ms: u64,
    ) -> Vec<DisplayUpdate> {
        if ticks == 0 {
            return Vec::new();
        }
        match page {
            Page::Main => Vec::new(),
            Page::Settings => self.dial_slider(ticks, now_ms),
            Page::Profiling => {
                if self.cursor.selection > NAME_SELECTION {
                    return Vec::new();
                }
                match machine.profiling_mode {
                    ProfilingMode::Manual => Vec::new(),
                    ProfilingMode::Flat => self.dial_flat(ticks, machine, now_ms),
                    ProfilingMode::Profile => self.dial_profile(ticks, profiles, storage, now_ms),
                }
            }
            Page::System => {
                let weight = system_page::REFERENCE_WEIGHT;
                let mut out = vec![DisplayUpdate::Number(weight.attr("bco"), HIGHLIGHT_COLOR)];
                if let Some(tenths) = calibration.adjust_reference_weight(ticks) {
                    out.push(DisplayUpdate::Number(weight.val(), tenths));
                }
                out
            }
        }
    }

    fn dial_slider(&mut self, ticks: i32, now_ms: u64) -> Vec<DisplayUpdate> {
        let next = self
            .slider_value
            .saturating_add(ticks)
            .clamp(self.slider_min, self.slider_max);
        if next == self.slider_value {
            return Vec::new();
        }
        self.slider_value = next;
        self.pending.mark(PendingSetting::BrewTemperature, now_ms);
        vec![
            DisplayUpdate::Number(settings_page::BREW_TEMP_SLIDER.val(), next),
            DisplayUpdate::Number(settings_page::BREW_TEMP_VALUE.val(), next),
        ]
    }

    fn dial_flat(&mut self, ticks: i32, machine: &mut MachineState, now_ms: u64) -> Vec<DisplayUpdate> {
        if self.cursor.selection != 0 {
            return Vec::new();
        }
        machine.flat_value = (machine.flat_value + ticks as f32 * CELL_STEP).max(0.0);
        self.pending.mark(PendingSetting::FlatValue, now_ms);
        vec![DisplayUpdate::Text(
            profiling_page::FLAT.txt(),
            flat_text(machine.flat_value),
        )]
    }

    fn dial_profile(
        &mut self,
        ticks: i32,
        profiles: &mut ProfileStore,
        storage: &mut impl StoragePort,
        now_ms: u64,
    ) -> Vec<DisplayUpdate> {
        if self.cursor.is_name_selected() {
            return self.scrub_profiles(ticks, profiles, storage, now_ms);
        }

        let step_count = profiles.active().steps().len();
        let Some((row, column)) = self.cursor.cell(step_count) else {
            return Vec::new();
        };
        let change = ticks as f32 * CELL_STEP;
        let step = &mut profiles.active_mut().steps_mut()[row];
        if column == 0 {
            step.target = clamp_cell(step.target + change);
        } else {
            step.duration = clamp_cell(step.duration + change);
        }
        profiles.mark_dirty();
        self.pending.mark(PendingSetting::Profile, now_ms);
        vec![DisplayUpdate::Text(
            profiling_page::VALUES.txt(),
            render_grid(profiles.active()),
        )]
    }

    fn scrub_profiles(
        &mut self,
        ticks: i32,
        profiles: &mut ProfileStore,
        storage: &mut impl StoragePort,
        now_ms: u64,
    ) -> Vec<DisplayUpdate> {
        if profiles.is_dirty() {
            debug!("PROFILE: saving edits to slot {} before switching", profiles.active_index());
            if let Err(e) = profiles.flush_dirty(storage) {
                warn!("PROFILE: {e}");
            }
        }

        let mut out = Vec::new();
        if let Some(next) = profiles.next_non_empty(profiles.active_index(), ticks.signum()) {
            match profiles.set_active_index(next, now_ms) {
                Ok(()) => {
                    info!("PROFILE: scrubbed to slot {} '{}'", next, profiles.active().name());
                    out = profile_ui(profiles.active());
                }
                Err(e) => warn!("PROFILE: {e}"),
            }
        }
        self.pending.mark(PendingSetting::Profile, now_ms);
        out
    }

    /// Button press on the profiling page.
    ///
    /// `scroll_y` is only needed (and only read) in profile mode.
    pub fn on_button(
        &mut self,
        mode: ProfilingMode,
        step_count: usize,
        scroll_y: impl FnOnce() -> i32,
    ) -> Vec<DisplayUpdate> {
        match mode {
            ProfilingMode::Manual => Vec::new(),
            ProfilingMode::Flat => {
                let mut out = self.cursor.reset();
                out.push(DisplayUpdate::Number(
                    profiling_page::FLAT.attr("bco"),
                    HIGHLIGHT_COLOR,
                ));
                out
            }
            ProfilingMode::Profile => {
                self.cursor
                    .advance(step_count, scroll_y(), self.grid_height)
            }
        }
    }
}
