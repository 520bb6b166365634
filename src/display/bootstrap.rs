//! Startup read-back of the UI state the screen keeps across power cycles.
//!
//! Every field is retried on its own until it yields a valid value.  Each
//! field has a fixed attempt budget; a field that exhausts it ends the whole
//! bootstrap with [`DisplayError::BootstrapFailed`], and the caller falls
//! back to defaults for whatever is still missing.

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use super::layout::{Attr, main_page, profiling_page, settings_page};
use super::{NUMBER_NOT_READY, TEXT_NOT_READY};
use crate::app::ports::ScreenPort;
use crate::error::{DisplayError, ScreenError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Number,
    Text,
    /// A layout dimension: only strictly positive values count.
    Dimension,
}

#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    attr: Attr,
    kind: Kind,
}

const fn number(name: &'static str, attr: Attr) -> Field {
    Field {
        name,
        attr,
        kind: Kind::Number,
    }
}

const fn text(name: &'static str, attr: Attr) -> Field {
    Field {
        name,
        attr,
        kind: Kind::Text,
    }
}

const fn dimension(name: &'static str, attr: Attr) -> Field {
    Field {
        name,
        attr,
        kind: Kind::Dimension,
    }
}

// Index N of FIELDS is slot N of Bootstrap::values.
const SLIDER_MIN: usize = 0;
const SLIDER_MAX: usize = 1;
const SLIDER_VALUE: usize = 2;
const PROFILE_GRID: usize = 3;
const FLAT_TEXT: usize = 4;
const PROFILE_NAME: usize = 5;
const STEPPED: usize = 6;
const SELECTION: usize = 7;
const ROW: usize = 8;
const COLUMN: usize = 9;
const GRID_HEIGHT: usize = 10;
const CHART_WIDTH: usize = 11;
const CHART_HEIGHT: usize = 12;
const FIELD_COUNT: usize = 13;

const FIELDS: [Field; FIELD_COUNT] = [
    number("slider_min", settings_page::BREW_TEMP_SLIDER.attr("minval")),
    number("slider_max", settings_page::BREW_TEMP_SLIDER.attr("maxval")),
    number("slider_value", settings_page::BREW_TEMP_SLIDER.val()),
    text("profile_grid", profiling_page::VALUES.txt()),
    text("flat_value", profiling_page::FLAT.txt()),
    text("profile_name", profiling_page::PROFILE_NAME.txt()),
    number("stepped", profiling_page::STEPPED.val()),
    number("selection", profiling_page::SELECTION.val()),
    number("row", profiling_page::ROW.val()),
    number("column", profiling_page::COLUMN.val()),
    dimension("grid_height", profiling_page::VALUES.attr("h")),
    dimension("chart_width", main_page::WAVEFORM.attr("w")),
    dimension("chart_height", main_page::WAVEFORM.attr("h")),
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Number(i32),
    Text(String),
}

/// Outcome of one pass over the unfinished fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Every field holds a valid value.
    Complete,
    /// Some fields are still missing and have attempts left.
    Pending,
    /// A field ran out of attempts.
    Failed(DisplayError),
}

/// UI state recovered from the screen, with defaults for anything missing.
#[derive(Debug, Clone, PartialEq)]
pub struct BootstrapSnapshot {
    /// Brew temperature slider bounds and value, tenths of a degree.
    pub slider_min: i32,
    pub slider_max: i32,
    pub slider_value: i32,
    pub profile_grid: String,
    pub flat_text: String,
    pub profile_name: String,
    pub stepped: bool,
    pub selection: i32,
    pub row: i32,
    pub column: i32,
    pub grid_height: i32,
    /// Zero while unknown; the chart stays idle until both are known.
    pub chart_width: i32,
    pub chart_height: i32,
}

impl Default for BootstrapSnapshot {
    fn default() -> Self {
        Self {
            slider_min: 800,
            slider_max: 1050,
            slider_value: 930,
            profile_grid: String::new(),
            flat_text: String::new(),
            profile_name: String::new(),
            stepped: false,
            selection: 0,
            row: 0,
            column: 0,
            grid_height: 0,
            chart_width: 0,
            chart_height: 0,
        }
    }
}

impl BootstrapSnapshot {
    /// Flat-mode value parsed from its text field.
    pub fn flat_value(&self) -> Option<f32> {
        self.flat_text.trim().parse().ok()
    }
}

/// Per-field bounded retry of the startup reads.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    values: [Option<Value>; FIELD_COUNT],
    attempts: [u8; FIELD_COUNT],
    max_attempts: u8,
}

impl Bootstrap {
    pub fn new(max_attempts: u8) -> Self {
        Self {
            values: Default::default(),
            attempts: [0; FIELD_COUNT],
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }

    /// Try every unfinished field once.
    pub fn poll(&mut self, screen: &mut impl ScreenPort) -> Progress {
        for (i, field) in FIELDS.iter().enumerate() {
            if self.values[i].is_some() {
                continue;
            }
            match read(screen, field) {
                Ok(value) => self.values[i] = Some(value),
                Err(_) => {
                    self.attempts[i] = self.attempts[i].saturating_add(1);
                    if self.attempts[i] >= self.max_attempts {
                        warn!(
                            "DISPLAY: bootstrap gave up on {} after {} attempts",
                            field.name, self.attempts[i]
                        );
                        return Progress::Failed(DisplayError::BootstrapFailed {
                            field: field.name,
                        });
                    }
                }
            }
        }
        if self.is_complete() {
            Progress::Complete
        } else {
            Progress::Pending
        }
    }

    /// Poll until complete or a field fails, pausing `retry_ms` between passes.
    pub fn run(
        &mut self,
        screen: &mut impl ScreenPort,
        delay: &mut impl DelayNs,
        retry_ms: u32,
    ) -> Result<(), DisplayError> {
        loop {
            match self.poll(screen) {
                Progress::Complete => {
                    info!("DISPLAY: bootstrap complete");
                    return Ok(());
                }
                Progress::Pending => delay.delay_ms(retry_ms),
                Progress::Failed(e) => return Err(e),
            }
        }
    }

    /// Recovered values, defaults where a field never loaded.
    pub fn snapshot(&self) -> BootstrapSnapshot {
        let defaults = BootstrapSnapshot::default();
        let number = |i: usize, fallback: i32| match &self.values[i] {
            Some(Value::Number(v)) => *v,
            _ => fallback,
        };
        let text = |i: usize| match &self.values[i] {
            Some(Value::Text(s)) => s.clone(),
            _ => String::new(),
        };

        BootstrapSnapshot {
            slider_min: number(SLIDER_MIN, defaults.slider_min),
            slider_max: number(SLIDER_MAX, defaults.slider_max),
            slider_value: number(SLIDER_VALUE, defaults.slider_value),
            profile_grid: text(PROFILE_GRID),
            flat_text: text(FLAT_TEXT),
            profile_name: text(PROFILE_NAME),
            stepped: number(STEPPED, 0) == 1,
            selection: number(SELECTION, defaults.selection),
            row: number(ROW, defaults.row),
            column: number(COLUMN, defaults.column),
            grid_height: number(GRID_HEIGHT, defaults.grid_height),
            chart_width: number(CHART_WIDTH, defaults.chart_width),
            chart_height: number(CHART_HEIGHT, defaults.chart_height),
        }
    }
}

fn read(screen: &mut impl ScreenPort, field: &Field) -> Result<Value, ScreenError> {
    match field.kind {
        Kind::Number => match screen.get_number(field.attr)? {
            NUMBER_NOT_READY => Err(ScreenError::NotReady),
            v => Ok(Value::Number(v)),
        },
        Kind::Dimension => match screen.get_number(field.attr)? {
            v if v > 0 => Ok(Value::Number(v)),
            _ => Err(ScreenError::NotReady),
        },
        Kind::Text => {
            let s = screen.get_text(field.attr)?;
            if s == TEXT_NOT_READY {
                Err(ScreenError::NotReady)
            } else {
                Ok(Value::Text(s))
            }
        }
    }
}
