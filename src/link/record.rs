//! Radio record codec.
//!
//! Two record shapes share the link and are told apart purely by length:
//!
//! ```text
//! Pairing (18 B):
//! ┌──────┬──────────────┬─────────┬─────────────────────────┐
//! │ kind │ address (6B) │ channel │ identifier (10B, NUL)   │
//! │ u8   │              │ u8      │                         │
//! └──────┴──────────────┴─────────┴─────────────────────────┘
//!
//! Application (250 B):
//! ┌──────────────────────────────────────────────────────────┐
//! │ payload: "topic=value|topic=value|..." NUL-terminated    │
//! └──────────────────────────────────────────────────────────┘
//! ```

use crate::error::FrameError;

use super::{APPLICATION_RECORD_LEN, IDENTIFIER_LEN, MacAddress, PAIRING_RECORD_LEN};

/// Discriminant of a pairing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PairingKind {
    Request = 1,
    Response = 2,
}

impl PairingKind {
    fn from_byte(b: u8) -> Result<Self, FrameError> {
        match b {
            1 => Ok(Self::Request),
            2 => Ok(Self::Response),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

/// Decoded pairing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingRecord {
    pub kind: PairingKind,
    pub address: MacAddress,
    pub channel: u8,
    identifier: [u8; IDENTIFIER_LEN],
}

impl PairingRecord {
    /// Build a record; the identifier is cut to leave room for the terminator.
    pub fn new(kind: PairingKind, address: MacAddress, channel: u8, identifier: &str) -> Self {
        let mut id = [0u8; IDENTIFIER_LEN];
        let bytes = identifier.as_bytes();
        let len = bytes.len().min(IDENTIFIER_LEN - 1);
        id[..len].copy_from_slice(&bytes[..len]);
        Self {
            kind,
            address,
            channel,
            identifier: id,
        }
    }

    /// Identifier bytes up to the first NUL.
    pub fn identifier(&self) -> &[u8] {
        let end = self
            .identifier
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(IDENTIFIER_LEN);
        &self.identifier[..end]
    }

    /// C-string comparison against the expected identifier.
    pub fn identifier_matches(&self, expected: &str) -> bool {
        self.identifier() == expected.as_bytes()
    }

    pub fn encode(&self) -> [u8; PAIRING_RECORD_LEN] {
        let mut out = [0u8; PAIRING_RECORD_LEN];
        out[0] = self.kind as u8;
        out[1..7].copy_from_slice(&self.address);
        out[7] = self.channel;
        out[8..].copy_from_slice(&self.identifier);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, FrameError> {
        if data.len() != PAIRING_RECORD_LEN {
            return Err(FrameError::UnknownRecord(data.len()));
        }
        let kind = PairingKind::from_byte(data[0])?;
        let mut address = [0u8; 6];
        address.copy_from_slice(&data[1..7]);
        let mut identifier = [0u8; IDENTIFIER_LEN];
        identifier.copy_from_slice(&data[8..]);
        Ok(Self {
            kind,
            address,
            channel: data[7],
            identifier,
        })
    }
}

/// An inbound frame after length classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundRecord<'a> {
    Pairing(PairingRecord),
    /// Payload text up to the terminator.
    Application(&'a str),
}

/// Classify a raw radio frame by its length and decode it.
pub fn classify(data: &[u8]) -> Result<InboundRecord<'_>, FrameError> {
    match data.len() {
        PAIRING_RECORD_LEN => PairingRecord::decode(data).map(InboundRecord::Pairing),
        APPLICATION_RECORD_LEN => Ok(InboundRecord::Application(payload_text(data))),
        other => Err(FrameError::UnknownRecord(other)),
    }
}

/// Payload text of an application record.
///
/// The last byte is always treated as the terminator, even if the sender
/// filled it.  Invalid UTF-8 cuts the payload at the first bad byte.
fn payload_text(data: &[u8]) -> &str {
    let body = &data[..data.len().saturating_sub(1)];
    let end = body.iter().position(|&b| b == 0).unwrap_or(body.len());
    let body = &body[..end];
    match core::str::from_utf8(body) {
        Ok(s) => s,
        Err(e) => core::str::from_utf8(&body[..e.valid_up_to()]).unwrap_or_default(),
    }
}

/// Lay out an application payload into its fixed 250-byte record.
///
/// `payload` must already respect the frame capacity; longer input is cut.
pub fn encode_application(payload: &str) -> [u8; APPLICATION_RECORD_LEN] {
    let mut out = [0u8; APPLICATION_RECORD_LEN];
    let bytes = payload.as_bytes();
    let len = bytes.len().min(APPLICATION_RECORD_LEN - 1);
    out[..len].copy_from_slice(&bytes[..len]);
    out
}
