//! Screen serial codec.
//!
//! Instructions are ASCII text terminated by three `0xFF` bytes.  Replies
//! start with a one-byte code and end with the same terminator:
//!
//! ```text
//! ┌──────┬─────────────────────┬────────────┐
//! │ code │ data                │ FF FF FF   │
//! ├──────┼─────────────────────┼────────────┤
//! │ 0x71 │ i32, 4 bytes LE     │ number     │
//! │ 0x70 │ text, any length    │ string     │
//! │ 0x66 │ page id, 1 byte     │ sendme     │
//! │ 0x65 │ page, id, event     │ touch      │
//! │ else │ none                │ status     │
//! └──────┴─────────────────────┴────────────┘
//! ```
//!
//! Fixed-size payloads are read by count, not by scanning for the
//! terminator, because a number such as `-1` is itself `FF FF FF FF`.

use core::fmt::Write;

use crate::display::layout::Attr;

/// Instruction terminator.
pub const TERMINATOR: [u8; 3] = [0xFF; 3];

/// Longest text reply kept; longer text is truncated.
const MAX_TEXT_LEN: usize = 1024;

const CODE_NUMBER: u8 = 0x71;
const CODE_TEXT: u8 = 0x70;
const CODE_PAGE: u8 = 0x66;
const CODE_TOUCH: u8 = 0x65;
const CODE_SUCCESS: u8 = 0x01;

/// One decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Number(i32),
    Text(String),
    Page(u8),
    Touch { page: u8, component: u8, pressed: bool },
    /// Instruction accepted (only sent when `bkcmd` asks for it).
    Success,
    /// Any other status code: invalid variable, invalid instruction, ...
    Status(u8),
}

impl Response {
    /// Replies that arrive unsolicited rather than answering a request.
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Touch { .. })
    }
}

enum DecoderState {
    /// Waiting for a reply code.
    Idle,
    /// Reading a fixed number of data bytes.
    Fixed { expected: usize },
    /// Reading text until the terminator.
    Text,
    /// Data complete, counting terminator bytes.
    Terminator { seen: usize },
}

/// Streaming reply decoder.
pub struct ResponseDecoder {
    state: DecoderState,
    code: u8,
    data: Vec<u8>,
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Idle,
            code: 0,
            data: Vec::new(),
        }
    }

    /// Feed one byte.  Returns a reply once its terminator is complete.
    pub fn push(&mut self, byte: u8) -> Option<Response> {
        match &mut self.state {
            DecoderState::Idle => {
                if byte == 0xFF {
                    // Stray terminator byte, e.g. after a dropped reply.
                    return None;
                }
                self.code = byte;
                self.data.clear();
                self.state = match byte {
                    CODE_NUMBER => DecoderState::Fixed { expected: 4 },
                    CODE_TOUCH => DecoderState::Fixed { expected: 3 },
                    CODE_PAGE => DecoderState::Fixed { expected: 1 },
                    CODE_TEXT => DecoderState::Text,
                    _ => DecoderState::Terminator { seen: 0 },
                };
                None
            }
            DecoderState::Fixed { expected } => {
                self.data.push(byte);
                if self.data.len() == *expected {
                    self.state = DecoderState::Terminator { seen: 0 };
                }
                None
            }
            DecoderState::Text => {
                if byte == 0xFF {
                    self.state = DecoderState::Terminator { seen: 1 };
                } else if self.data.len() < MAX_TEXT_LEN {
                    self.data.push(byte);
                }
                None
            }
            DecoderState::Terminator { seen } => {
                if byte != 0xFF {
                    // Malformed reply; resynchronise on this byte.
                    self.state = DecoderState::Idle;
                    return self.push(byte);
                }
                *seen += 1;
                if *seen < TERMINATOR.len() {
                    return None;
                }
                self.state = DecoderState::Idle;
                Some(self.finish())
            }
        }
    }

    /// Feed a slice; every completed reply is passed to `on_response`.
    pub fn feed(&mut self, bytes: &[u8], mut on_response: impl FnMut(Response)) {
        for &b in bytes {
            if let Some(r) = self.push(b) {
                on_response(r);
            }
        }
    }

    /// Drop a partially received reply (e.g. after a timeout).
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
        self.data.clear();
    }

    fn finish(&mut self) -> Response {
        let d = &self.data;
        match self.code {
            CODE_NUMBER => Response::Number(i32::from_le_bytes([d[0], d[1], d[2], d[3]])),
            CODE_TEXT => Response::Text(String::from_utf8_lossy(d).into_owned()),
            CODE_PAGE => Response::Page(d[0]),
            CODE_TOUCH => Response::Touch {
                page: d[0],
                component: d[1],
                pressed: d[2] == 1,
            },
            CODE_SUCCESS => Response::Success,
            other => Response::Status(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Instructions
// ---------------------------------------------------------------------------

/// Append the terminator to an instruction.
pub fn encode_instruction(instruction: &str, out: &mut Vec<u8>) {
    out.clear();
    out.extend_from_slice(instruction.as_bytes());
    out.extend_from_slice(&TERMINATOR);
}

/// `get p[1].b[23].val`
pub fn get(attr: Attr) -> String {
    format!("get {attr}")
}

/// `p[1].b[23].val=930`
pub fn set_number(attr: Attr, value: i32) -> String {
    format!("{attr}={value}")
}

/// `p[2].b[47].txt="name"`, with quotes and backslashes escaped.
pub fn set_text(attr: Attr, value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 24);
    let _ = write!(out, "{attr}=\"");
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Ask for the current page id.
pub const SEND_ME: &str = "sendme";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::layout::{profiling_page, settings_page};

    fn decode_all(bytes: &[u8]) -> Vec<Response> {
        let mut d = ResponseDecoder::new();
        let mut out = Vec::new();
        d.feed(bytes, |r| out.push(r));
        out
    }

    #[test]
    fn number_reply() {
        let r = decode_all(&[0x71, 0xA2, 0x03, 0, 0, 0xFF, 0xFF, 0xFF]);
        assert_eq!(r, vec![Response::Number(930)]);
    }

    #[test]
    fn negative_number_contains_terminator_bytes() {
        let r = decode_all(&[0x71, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(r, vec![Response::Number(-1)]);
    }

    #[test]
    fn text_reply() {
        let mut bytes = vec![0x70];
        bytes.extend_from_slice(b"Default");
        bytes.extend_from_slice(&TERMINATOR);
        assert_eq!(decode_all(&bytes), vec![Response::Text("Default".into())]);
    }

    #[test]
    fn touch_between_replies() {
        let bytes = [
            0x65, 2, 34, 0, 0xFF, 0xFF, 0xFF, //
            0x66, 2, 0xFF, 0xFF, 0xFF,
        ];
        assert_eq!(
            decode_all(&bytes),
            vec![
                Response::Touch {
                    page: 2,
                    component: 34,
                    pressed: false
                },
                Response::Page(2),
            ]
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            decode_all(&[0x1A, 0xFF, 0xFF, 0xFF, 0x01, 0xFF, 0xFF, 0xFF]),
            vec![Response::Status(0x1A), Response::Success]
        );
    }

    #[test]
    fn split_across_reads() {
        let mut d = ResponseDecoder::new();
        let mut out = Vec::new();
        d.feed(&[0x71, 0x05], |r| out.push(r));
        assert!(out.is_empty());
        d.feed(&[0, 0, 0, 0xFF, 0xFF], |r| out.push(r));
        assert!(out.is_empty());
        d.feed(&[0xFF], |r| out.push(r));
        assert_eq!(out, vec![Response::Number(5)]);
    }

    #[test]
    fn resynchronises_after_garbage() {
        // A number reply cut short, then a clean page reply.
        let r = decode_all(&[0x71, 1, 2, 3, 4, 0x66, 1, 0xFF, 0xFF, 0xFF]);
        assert_eq!(r, vec![Response::Page(1)]);
    }

    #[test]
    fn instructions() {
        assert_eq!(get(settings_page::BREW_TEMP_SLIDER.val()), "get p[1].b[23].val");
        assert_eq!(
            set_number(settings_page::BREW_TEMP_VALUE.val(), 935),
            "p[1].b[24].val=935"
        );
        assert_eq!(
            set_text(profiling_page::PROFILE_NAME.txt(), "My \"best\""),
            "p[2].b[47].txt=\"My \\\"best\\\"\""
        );
        let mut out = Vec::new();
        encode_instruction("page 1", &mut out);
        assert_eq!(out, b"page 1\xFF\xFF\xFF");
    }
}
