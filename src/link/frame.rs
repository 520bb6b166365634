//! Outbound accumulation buffer and inbound token splitter.
//!
//! Several `topic=value` entries share one application record, joined by
//! `|`.  The buffer never grows past [`OutboundFrame::CAPACITY`] bytes so
//! that the terminator always fits inside the 250-byte record.

use heapless::String;

use crate::error::FrameError;

use super::APPLICATION_RECORD_LEN;

const SEPARATOR: char = '|';

/// Payload capacity, one byte short of the record for the terminator.
const CAPACITY: usize = APPLICATION_RECORD_LEN - 1;

/// Outcome of [`OutboundFrame::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// The entry was added to the existing content.
    Appended,
    /// The entry does not fit next to the existing content; flush first.
    NeedsFlush,
}

/// Accumulates `topic=value` entries until flushed.
#[derive(Debug, Clone, Default)]
pub struct OutboundFrame {
    buf: String<CAPACITY>,
}

impl OutboundFrame {
    pub const CAPACITY: usize = CAPACITY;

    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Append `topic=value`, inserting a separator when the buffer is not empty.
    ///
    /// Returns [`Append::NeedsFlush`] without touching the buffer if the
    /// entry would overflow it.  An entry that cannot fit even into an empty
    /// buffer is cut at the capacity on a character boundary.
    pub fn append(&mut self, topic: &str, value: &str) -> Append {
        let entry_len = topic.len() + 1 + value.len();
        let sep = usize::from(!self.buf.is_empty());
        if self.buf.len() + sep + entry_len > CAPACITY {
            if !self.buf.is_empty() {
                return Append::NeedsFlush;
            }
            log::warn!(
                "frame: entry '{}' ({} bytes) truncated to {}",
                topic,
                entry_len,
                CAPACITY
            );
        }
        if sep == 1 {
            self.push_bounded("|");
        }
        self.push_bounded(topic);
        self.push_bounded("=");
        self.push_bounded(value);
        Append::Appended
    }

    /// Push as much of `s` as fits, never splitting a character.
    fn push_bounded(&mut self, s: &str) {
        let room = CAPACITY - self.buf.len();
        if s.len() <= room {
            // Fits by the check above.
            let _ = self.buf.push_str(s);
            return;
        }
        let mut cut = room;
        while cut > 0 && !s.is_char_boundary(cut) {
            cut -= 1;
        }
        let _ = self.buf.push_str(&s[..cut]);
    }
}

/// Split an application payload into `(topic, value)` pairs in arrival order.
///
/// Empty tokens (leading, trailing or doubled separators) are skipped.
/// Each remaining token is split on its *first* `=`; a token without one
/// yields [`FrameError::MalformedToken`] and the iteration carries on.
pub fn tokens(payload: &str) -> impl Iterator<Item = Result<(&str, &str), FrameError>> {
    payload
        .split(SEPARATOR)
        .filter(|t| !t.is_empty())
        .map(|t| t.split_once('=').ok_or(FrameError::MalformedToken))
}
