//! Radio link layer: one peer session, many small `topic=value` messages.
//!
//! ```text
//!  unpaired ──[PairRequest every 10 s]──▶ broadcast
//!     ▲                                      │
//!     │                          [PairResponse, same identifier]
//!     │                                      ▼
//!     └───[no payload for 10 s]───────── paired (unicast)
//! ```
//!
//! - [`record`]: the two fixed-size radio records and their wire layout.
//! - [`frame`]: the outbound `|`-joined accumulation buffer and the
//!   inbound token splitter.
//! - [`session`]: pairing, liveness and publish/flush over a [`RadioPort`].
//!
//! [`RadioPort`]: crate::app::ports::RadioPort

pub mod frame;
pub mod record;
pub mod session;

pub use frame::OutboundFrame;
pub use session::{Inbound, LinkLayer, PeerSession};

/// Six-byte link-layer (MAC) address.
pub type MacAddress = [u8; 6];

/// The all-ones broadcast address used while unpaired.
pub const BROADCAST: MacAddress = [0xFF; 6];

/// Size of an application record on the wire, terminator included.
pub const APPLICATION_RECORD_LEN: usize = 250;

/// Size of a pairing record on the wire.
pub const PAIRING_RECORD_LEN: usize = 18;

/// Width of the identifier field inside a pairing record.
pub const IDENTIFIER_LEN: usize = 10;

/// Render an address as `aa:bb:cc:dd:ee:ff` for logs.
pub fn format_mac(mac: &MacAddress) -> heapless::String<17> {
    use core::fmt::Write;
    let mut out = heapless::String::new();
    // 17 characters always fit.
    let _ = write!(
        out,
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_formats_lowercase_hex() {
        let mac = [0x24, 0x6F, 0x28, 0x0A, 0xB1, 0x02];
        assert_eq!(format_mac(&mac).as_str(), "24:6f:28:0a:b1:02");
    }
}
