//! Brew profile data model.
//!
//! A profile is a named list of `(target, duration)` steps walked along an
//! independent axis (seconds or grams).  The submodules cover evaluation,
//! the binary storage record, the JSON exchange format, the screen's
//! free-text step grid and the 32-slot store.

pub mod eval;
pub mod json;
pub mod record;
pub mod store;
pub mod text;

pub use eval::target_at;
pub use store::ProfileStore;

use heapless::{String, Vec};

/// Number of profile slots.
pub const MAX_PROFILES: usize = 32;

/// Maximum number of steps per profile.
pub const MAX_STEPS: usize = 128;

/// Maximum profile name length in bytes.
pub const NAME_CAPACITY: usize = 64;

/// How a profile moves between step targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileMode {
    /// Linear interpolation from the previous target.
    #[default]
    Ramped,
    /// Jump straight to the step target.
    Stepped,
}

impl ProfileMode {
    /// Wire value used by the exchange format and the storage record.
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Ramped => 0,
            Self::Stepped => 1,
        }
    }

    /// `1` is stepped; anything else is ramped.
    pub const fn from_u8(v: u8) -> Self {
        if v == 1 { Self::Stepped } else { Self::Ramped }
    }
}

/// One segment of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Step {
    /// Control value to reach (ramped) or hold (stepped).
    pub target: f32,
    /// Width of the segment along the independent axis.
    pub duration: f32,
}

impl Step {
    pub const fn new(target: f32, duration: f32) -> Self {
        Self { target, duration }
    }
}

/// A named brew profile.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Profile {
    name: String<NAME_CAPACITY>,
    pub mode: ProfileMode,
    steps: Vec<Step, MAX_STEPS>,
}

impl Profile {
    /// Build a profile, truncating the name and dropping steps past the cap.
    pub fn new(name: &str, mode: ProfileMode, steps: &[Step]) -> Self {
        let mut p = Self {
            mode,
            ..Self::default()
        };
        p.set_name(name);
        for s in steps.iter().take(MAX_STEPS) {
            p.push_step(*s);
        }
        p
    }

    /// Built-in profile synthesised when no slot holds anything.
    pub fn standard() -> Self {
        Self::new(
            "Standard Profile",
            ProfileMode::Ramped,
            &[Step::new(9.0, 30.0)],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the name, truncated to 64 bytes on a character boundary.
    pub fn set_name(&mut self, name: &str) {
        self.name.clear();
        let mut cut = name.len().min(NAME_CAPACITY);
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        // `cut` never exceeds the capacity.
        let _ = self.name.push_str(&name[..cut]);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    /// Append a step.  Returns `false` if the profile is already full.
    pub fn push_step(&mut self, step: Step) -> bool {
        self.steps.push(step).is_ok()
    }

    /// Wipe name, mode and steps, leaving a free slot.
    pub fn clear(&mut self) {
        self.name.clear();
        self.mode = ProfileMode::Ramped;
        self.steps.clear();
    }

    /// A slot is free iff it has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_stepped(&self) -> bool {
        self.mode == ProfileMode::Stepped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_profile() {
        let p = Profile::standard();
        assert_eq!(p.name(), "Standard Profile");
        assert_eq!(p.mode, ProfileMode::Ramped);
        assert_eq!(p.steps(), &[Step::new(9.0, 30.0)]);
    }

    #[test]
    fn long_name_truncates_at_64() {
        let mut p = Profile::default();
        p.set_name(&"a".repeat(80));
        assert_eq!(p.name().len(), 64);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut p = Profile::default();
        // 63 ASCII bytes + a 2-byte char straddling the limit
        let name = format!("{}é", "a".repeat(63));
        p.set_name(&name);
        assert_eq!(p.name().len(), 63);
    }

    #[test]
    fn steps_are_capped() {
        let steps = [Step::new(1.0, 1.0); 200];
        let p = Profile::new("x", ProfileMode::Stepped, &steps);
        assert_eq!(p.steps().len(), MAX_STEPS);
    }

    #[test]
    fn clear_frees_slot() {
        let mut p = Profile::standard();
        assert!(!p.is_empty());
        p.clear();
        assert!(p.is_empty());
        assert_eq!(p.name(), "");
    }

    #[test]
    fn mode_wire_values() {
        assert_eq!(ProfileMode::from_u8(1), ProfileMode::Stepped);
        assert_eq!(ProfileMode::from_u8(0), ProfileMode::Ramped);
        assert_eq!(ProfileMode::from_u8(7), ProfileMode::Ramped);
        assert_eq!(ProfileMode::Stepped.as_u8(), 1);
    }
}
