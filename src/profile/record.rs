//! Fixed-size storage record for one profile slot.
//!
//! ```text
//! ┌───────────────┬──────┬───────────┬──────────────────────────────────┐
//! │ name (65 B)   │ mode │ count     │ 128 × (target f32, duration f32) │
//! │ NUL-padded    │ u8   │ u16 LE    │ little-endian, zero-filled       │
//! └───────────────┴──────┴───────────┴──────────────────────────────────┘
//! ```
//!
//! Every slot occupies the same number of bytes whether it is used or not,
//! so a stored blob of any other length is treated as an empty slot.

use super::{MAX_STEPS, NAME_CAPACITY, Profile, ProfileMode, Step};

const NAME_FIELD: usize = NAME_CAPACITY + 1;
const MODE_OFFSET: usize = NAME_FIELD;
const COUNT_OFFSET: usize = MODE_OFFSET + 1;
const STEPS_OFFSET: usize = COUNT_OFFSET + 2;
const STEP_LEN: usize = 8;

/// Encoded size of a slot record.
pub const RECORD_LEN: usize = STEPS_OFFSET + MAX_STEPS * STEP_LEN;

/// Serialise a profile (empty or not) into its slot record.
pub fn encode(profile: &Profile) -> [u8; RECORD_LEN] {
    let mut out = [0u8; RECORD_LEN];

    let name = profile.name().as_bytes();
    out[..name.len()].copy_from_slice(name);
    out[MODE_OFFSET] = profile.mode.as_u8();

    let steps = profile.steps();
    // At most 128 steps, always fits.
    out[COUNT_OFFSET..STEPS_OFFSET].copy_from_slice(&(steps.len() as u16).to_le_bytes());

    for (i, step) in steps.iter().enumerate() {
        let at = STEPS_OFFSET + i * STEP_LEN;
        out[at..at + 4].copy_from_slice(&step.target.to_le_bytes());
        out[at + 4..at + 8].copy_from_slice(&step.duration.to_le_bytes());
    }
    out
}

/// Decode a stored slot record.
///
/// Returns `None` (an empty slot) for a wrong length, a zero step count or
/// a count above the maximum.
pub fn decode(data: &[u8]) -> Option<Profile> {
    if data.len() != RECORD_LEN {
        return None;
    }

    let count = usize::from(u16::from_le_bytes([
        data[COUNT_OFFSET],
        data[COUNT_OFFSET + 1],
    ]));
    if count == 0 || count > MAX_STEPS {
        return None;
    }

    let name_bytes = &data[..NAME_FIELD];
    let end = name_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(NAME_CAPACITY);
    let name = match core::str::from_utf8(&name_bytes[..end]) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(&name_bytes[..e.valid_up_to()]).unwrap_or_default(),
    };

    let mut profile = Profile::new(name, ProfileMode::from_u8(data[MODE_OFFSET]), &[]);
    for i in 0..count {
        let at = STEPS_OFFSET + i * STEP_LEN;
        let target = f32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);
        let duration =
            f32::from_le_bytes([data[at + 4], data[at + 5], data[at + 6], data[at + 7]]);
        profile.push_step(Step::new(target, duration));
    }
    Some(profile)
}

/// Storage key for a slot: `p_0` .. `p_31`.
pub fn slot_key(slot: usize) -> heapless::String<8> {
    use core::fmt::Write;
    let mut key = heapless::String::new();
    // "p_" plus at most two digits.
    let _ = write!(key, "p_{slot}");
    key
}
