//! Fuzz target: profile exchange import
//!
//! Any text handed to the import path either fails cleanly or yields a
//! profile that respects the step cap and survives an export.
//!
//! cargo fuzz run fuzz_profile_json

#![no_main]

use brewhmi::profile::{MAX_STEPS, json};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(profile) = json::import(text) {
        assert!(!profile.steps().is_empty(), "import accepted an empty profile");
        assert!(profile.steps().len() <= MAX_STEPS);
        let _ = json::export(&profile);
    }
    let _ = json::parse_slot_document(text);
});
