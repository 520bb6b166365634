//! Fuzz target: `ResponseDecoder::feed`
//!
//! Drives arbitrary serial bytes into the screen reply decoder and checks
//! it never panics and recovers after a reset.
//!
//! cargo fuzz run fuzz_screen_decoder

#![no_main]

use brewhmi::adapters::nextion::codec::{Response, ResponseDecoder};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = ResponseDecoder::new();
    decoder.feed(data, |reply| {
        if let Response::Text(text) = reply {
            assert!(text.len() <= 4 * data.len(), "text longer than its input");
        }
    });

    // After a reset a well-formed page reply must decode.
    decoder.reset();
    let mut pages = Vec::new();
    decoder.feed(&[0x66, 0x02, 0xFF, 0xFF, 0xFF], |r| pages.push(r));
    assert_eq!(pages, vec![Response::Page(2)]);
});
