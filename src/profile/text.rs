//! The screen's free-text step table.
//!
//! One row per step, target then duration, right-aligned with one decimal:
//!
//! ```text
//!     9.0             30.0\r\n
//!   12.5           100.0
//! ```

use core::fmt::Write;

use super::{MAX_STEPS, Profile, Step};

const COLUMN_GAP: &str = "           ";
const ROW_SEPARATOR: &str = "\r\n";
const CELL_MAX: f32 = 999.9;

/// Clamp a cell value into the range the table can show.
pub fn clamp_cell(v: f32) -> f32 {
    v.clamp(0.0, CELL_MAX)
}

/// Right-align so the decimal points line up across magnitudes.
fn push_cell(out: &mut String, v: f32) {
    let v = clamp_cell(v);
    let width = if v < 9.99 {
        7
    } else if v < 99.99 {
        6
    } else {
        5
    };
    // Writing into a String cannot fail.
    let _ = write!(out, "{v:>width$.1}");
}

/// Render the step grid shown in the profile text box.
pub fn render_grid(profile: &Profile) -> String {
    let mut out = String::new();
    for (i, step) in profile.steps().iter().enumerate() {
        if i > 0 {
            out.push_str(ROW_SEPARATOR);
        }
        push_cell(&mut out, step.target);
        out.push_str(COLUMN_GAP);
        push_cell(&mut out, step.duration);
    }
    out
}

/// Parse text typed into the grid back into steps.
///
/// Whitespace-separated numbers are paired as `(target, duration)`.
/// Unparseable tokens read as 0 and a trailing unpaired number is dropped.
pub fn parse_grid(text: &str) -> heapless::Vec<Step, MAX_STEPS> {
    let mut steps = heapless::Vec::new();
    let mut pending: Option<f32> = None;

    for token in text.split([' ', '\r', '\n']).filter(|t| !t.is_empty()) {
        let value = token.parse::<f32>().unwrap_or(0.0);
        match pending.take() {
            None => pending = Some(value),
            Some(target) => {
                if steps.push(Step::new(target, value)).is_err() {
                    break;
                }
            }
        }
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileMode;

    #[test]
    fn cells_align_by_magnitude() {
        let p = Profile::new(
            "g",
            ProfileMode::Ramped,
            &[Step::new(9.0, 30.0), Step::new(12.5, 100.0)],
        );
        assert_eq!(
            render_grid(&p),
            "    9.0             30.0\r\n  12.5           100.0"
        );
    }

    #[test]
    fn cells_are_clamped() {
        let p = Profile::new("c", ProfileMode::Ramped, &[Step::new(-4.0, 5000.0)]);
        assert_eq!(render_grid(&p), "    0.0           999.9");
    }

    #[test]
    fn empty_profile_renders_nothing() {
        assert_eq!(render_grid(&Profile::default()), "");
    }

    #[test]
    fn parse_pairs_numbers() {
        let steps = parse_grid("    9.0             30.0\r\n  12.5           100.0");
        assert_eq!(
            steps.as_slice(),
            &[Step::new(9.0, 30.0), Step::new(12.5, 100.0)]
        );
    }

    #[test]
    fn parse_drops_trailing_target() {
        let steps = parse_grid("1 2 3");
        assert_eq!(steps.as_slice(), &[Step::new(1.0, 2.0)]);
    }

    #[test]
    fn parse_garbage_reads_as_zero() {
        let steps = parse_grid("abc 4");
        assert_eq!(steps.as_slice(), &[Step::new(0.0, 4.0)]);
    }

    #[test]
    fn render_then_parse_keeps_one_decimal() {
        let p = Profile::new("r", ProfileMode::Ramped, &[Step::new(2.25, 7.0)]);
        let steps = parse_grid(&render_grid(&p));
        assert!((steps[0].target - 2.2).abs() < 0.051);
        assert_eq!(steps[0].duration, 7.0);
    }
}
