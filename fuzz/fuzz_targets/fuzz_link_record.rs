//! Fuzz target: radio record classification and token splitting
//!
//! Arbitrary bytes as they might arrive over the air.  Classification must
//! never panic; application payloads must split into tokens that carry no
//! separator.
//!
//! cargo fuzz run fuzz_link_record

#![no_main]

use brewhmi::link::frame::tokens;
use brewhmi::link::record::{InboundRecord, classify};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    match classify(data) {
        Ok(InboundRecord::Application(text)) => {
            for (topic, value) in tokens(text).flatten() {
                assert!(!topic.contains('|'), "separator leaked into topic");
                assert!(!value.contains('|'), "separator leaked into value");
            }
        }
        Ok(InboundRecord::Pairing(rec)) => {
            assert!(rec.identifier().len() <= data.len());
        }
        Err(_) => {}
    }
});
