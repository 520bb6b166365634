//! Peer session management: pairing, liveness, publish and flush.
//!
//! The session is the only owner of the outbound frame buffer.  All calls
//! happen on the scheduler thread; the radio is passed in per call.

use log::{debug, info, warn};

use crate::app::ports::{RadioPort, ReceivedFrame};
use crate::config::HmiConfig;
use crate::error::LinkError;

use super::frame::{Append, OutboundFrame};
use super::record::{self, InboundRecord, PairingKind, PairingRecord};
use super::{BROADCAST, MacAddress, format_mac};

/// The single logical connection to the main controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerSession {
    pub paired: bool,
    /// Unicast peer while paired, [`BROADCAST`] otherwise.
    pub peer: MacAddress,
    pub channel: u8,
    /// Last application frame from the peer (pairing frames do not count).
    pub last_message_ms: u64,
}

impl PeerSession {
    const fn unpaired() -> Self {
        Self {
            paired: false,
            peer: BROADCAST,
            channel: 0,
            last_message_ms: 0,
        }
    }
}

/// What a received frame turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Dropped: wrong sender, unexpected pairing record, undecodable.
    Ignored,
    /// A matching pair response established the session.
    Paired { peer: MacAddress, channel: u8 },
    /// Application payload from the paired peer.
    Payload(&'a str),
}

/// Pairing handshake plus best-effort framed messaging.
pub struct LinkLayer {
    session: PeerSession,
    frame: OutboundFrame,
    identifier: heapless::String<{ crate::config::IDENTIFIER_CAPACITY }>,
    /// `None` means the next pairing broadcast goes out immediately.
    last_pair_request_ms: Option<u64>,
    pairing_retry_ms: u64,
    peer_timeout_ms: u64,
    enabled: bool,
}

impl LinkLayer {
    pub fn new(config: &HmiConfig) -> Self {
        Self {
            session: PeerSession::unpaired(),
            frame: OutboundFrame::new(),
            identifier: config.pairing_identifier.clone(),
            last_pair_request_ms: None,
            pairing_retry_ms: u64::from(config.pairing_retry_ms),
            peer_timeout_ms: u64::from(config.peer_timeout_ms),
            enabled: true,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn session(&self) -> &PeerSession {
        &self.session
    }

    pub fn is_paired(&self) -> bool {
        self.session.paired
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Content waiting for the next flush.
    pub fn pending(&self) -> &str {
        self.frame.as_str()
    }

    /// Globally enable or disable the link (offline mode).
    ///
    /// While disabled no pairing broadcasts go out and every publish is a
    /// silent no-op.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!("LINK: {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    // ── Pairing ───────────────────────────────────────────────

    /// Broadcast a pair request if unpaired and the retry interval elapsed.
    /// Returns `true` when a request went out.
    pub fn poll_pairing(&mut self, radio: &mut impl RadioPort, now_ms: u64) -> bool {
        if !self.enabled || self.session.paired {
            return false;
        }
        if let Some(last) = self.last_pair_request_ms {
            if now_ms.saturating_sub(last) < self.pairing_retry_ms {
                return false;
            }
        }

        let request = PairingRecord::new(
            PairingKind::Request,
            radio.own_address(),
            radio.channel(),
            &self.identifier,
        );
        if let Err(e) = radio.send(&BROADCAST, &request.encode()) {
            warn!("LINK: pair request send failed: {}", e);
        } else {
            debug!("LINK: pair request broadcast");
        }
        self.last_pair_request_ms = Some(now_ms);
        true
    }

    /// Tear the session down if the peer went quiet.
    /// Returns [`LinkError::PeerTimeout`] when a reset happened.
    pub fn check_liveness(
        &mut self,
        radio: &mut impl RadioPort,
        now_ms: u64,
    ) -> Result<(), LinkError> {
        if self.session.paired
            && now_ms.saturating_sub(self.session.last_message_ms) >= self.peer_timeout_ms
        {
            warn!(
                "LINK: no payload from {} for {} ms, resetting",
                format_mac(&self.session.peer),
                now_ms.saturating_sub(self.session.last_message_ms)
            );
            self.reset(radio);
            return Err(LinkError::PeerTimeout);
        }
        Ok(())
    }

    /// Drop the session and fall back to broadcast pairing.
    ///
    /// The next [`poll_pairing`](Self::poll_pairing) broadcasts immediately.
    pub fn reset(&mut self, radio: &mut impl RadioPort) {
        if !self.session.paired {
            return;
        }
        let old = self.session.peer;
        if let Err(e) = radio.remove_peer(&old) {
            debug!("LINK: remove peer {}: {}", format_mac(&old), e);
        }
        if let Err(e) = radio.add_peer(&BROADCAST) {
            warn!("LINK: re-adding broadcast peer failed: {}", e);
        }
        self.session = PeerSession::unpaired();
        self.frame.clear();
        self.last_pair_request_ms = None;
        info!("LINK: session reset, pairing resumes");
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Classify a received frame and update the session accordingly.
    pub fn handle_frame<'a>(
        &mut self,
        radio: &mut impl RadioPort,
        frame: &'a ReceivedFrame,
        now_ms: u64,
    ) -> Inbound<'a> {
        match record::classify(&frame.data) {
            Ok(InboundRecord::Pairing(rec)) => self.handle_pairing(radio, &rec, now_ms),
            Ok(InboundRecord::Application(text)) => {
                if !self.session.paired {
                    debug!("LINK: payload while unpaired, dropped");
                    return Inbound::Ignored;
                }
                if frame.source != self.session.peer {
                    debug!(
                        "LINK: payload from unknown {}, dropped",
                        format_mac(&frame.source)
                    );
                    return Inbound::Ignored;
                }
                self.session.last_message_ms = now_ms;
                Inbound::Payload(text)
            }
            Err(e) => {
                debug!("LINK: {}", e);
                Inbound::Ignored
            }
        }
    }

    fn handle_pairing(
        &mut self,
        radio: &mut impl RadioPort,
        rec: &PairingRecord,
        now_ms: u64,
    ) -> Inbound<'static> {
        if rec.kind != PairingKind::Response
            || self.session.paired
            || !rec.identifier_matches(&self.identifier)
            || rec.address == BROADCAST
        {
            return Inbound::Ignored;
        }

        if let Err(e) = radio.remove_peer(&BROADCAST) {
            debug!("LINK: remove broadcast peer: {}", e);
        }
        if let Err(e) = radio.add_peer(&rec.address) {
            warn!(
                "LINK: {} ({})",
                LinkError::PeerRegistrationFailed,
                format_mac(&rec.address)
            );
            debug!("LINK: radio said {}", e);
            if let Err(e) = radio.add_peer(&BROADCAST) {
                warn!("LINK: re-adding broadcast peer failed: {}", e);
            }
            return Inbound::Ignored;
        }

        self.session = PeerSession {
            paired: true,
            peer: rec.address,
            channel: rec.channel,
            last_message_ms: now_ms,
        };
        info!(
            "LINK: paired with {} on channel {}",
            format_mac(&rec.address),
            rec.channel
        );
        Inbound::Paired {
            peer: rec.address,
            channel: rec.channel,
        }
    }

    // ── Outbound ──────────────────────────────────────────────

    /// Queue `topic=value`, flushing first if it would overflow the frame
    /// and afterwards if `flush_now` is set.
    ///
    /// Silently does nothing while unpaired or disabled.
    pub fn publish(
        &mut self,
        radio: &mut impl RadioPort,
        topic: &str,
        value: &str,
        flush_now: bool,
    ) {
        if !self.enabled || !self.session.paired {
            return;
        }
        if self.frame.append(topic, value) == Append::NeedsFlush {
            debug!("LINK: frame full, flushing before '{}'", topic);
            self.flush_logged(radio);
            // An empty buffer always accepts (truncating if needed).
            let _ = self.frame.append(topic, value);
        }
        if flush_now {
            self.flush_logged(radio);
        }
    }

    /// Send the accumulated frame.  The buffer is cleared even on failure.
    pub fn flush(&mut self, radio: &mut impl RadioPort) -> Result<(), LinkError> {
        if !self.enabled {
            return Err(LinkError::Disabled);
        }
        if !self.session.paired {
            return Err(LinkError::NotPaired);
        }
        if self.frame.is_empty() {
            return Ok(());
        }
        let bytes = record::encode_application(self.frame.as_str());
        let result = radio.send(&self.session.peer, &bytes);
        self.frame.clear();
        result.map_err(|_| LinkError::SendFailed)
    }

    fn flush_logged(&mut self, radio: &mut impl RadioPort) {
        if let Err(e) = self.flush(radio) {
            warn!("LINK: {}, frame dropped", e);
        }
    }
}
