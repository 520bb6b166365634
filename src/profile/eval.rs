//! Piecewise target curve.

use super::{Profile, ProfileMode};

/// Steps no wider than this carry a target without taking up axis width.
const ZERO_WIDTH: f32 = 0.001;

/// Control target at position `x` along the profile's independent axis.
///
/// Walks the steps accumulating segment starts.  Inside a segment, a stepped
/// profile returns the segment target and a ramped one interpolates from the
/// previous target.  Zero-width steps only move the baseline.  Past the last
/// segment the last target holds; an empty profile evaluates to 0.
pub fn target_at(profile: &Profile, x: f32) -> f32 {
    let mut start = 0.0_f32;
    let mut previous = 0.0_f32;

    for step in profile.steps() {
        if step.duration <= ZERO_WIDTH {
            previous = step.target;
            continue;
        }

        let end = start + step.duration;
        if x <= end {
            return match profile.mode {
                ProfileMode::Stepped => step.target,
                ProfileMode::Ramped => {
                    previous + (x - start) * (step.target - previous) / step.duration
                }
            };
        }

        start = end;
        previous = step.target;
    }

    previous
}
