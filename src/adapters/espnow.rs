//! ESP-NOW radio adapter.
//!
//! - **`target_os = "espidf"`**: [`EspNowRadio`] drives the ESP-IDF
//!   ESP-NOW driver.  The receive callback runs on the Wi-Fi task, so
//!   frames reach the scheduler through a small bounded queue; when it is
//!   full the oldest frame is dropped.
//! - **`not(target_os = "espidf")`**: [`SimRadio`] records sent frames and
//!   replays injected ones, for host tests and simulation.

use std::collections::VecDeque;

#[cfg(target_os = "espidf")]
use std::sync::{Arc, Mutex};

#[cfg(target_os = "espidf")]
use esp_idf_svc::espnow::{EspNow, PeerInfo, ReceiveInfo};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::wifi_interface_t_WIFI_IF_STA;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{RadioError, RadioPort, ReceivedFrame};
use crate::link::{BROADCAST, MacAddress, format_mac};

/// Frames buffered between the receive callback and the next tick.
const RX_QUEUE_DEPTH: usize = 8;

#[cfg(target_os = "espidf")]
pub struct EspNowRadio {
    driver: EspNow<'static>,
    rx: Arc<Mutex<VecDeque<ReceivedFrame>>>,
    own_address: MacAddress,
    channel: u8,
}

#[cfg(target_os = "espidf")]
impl EspNowRadio {
    /// Take the ESP-NOW driver.  Wi-Fi must already be started in station
    /// mode on `channel`.
    pub fn new(own_address: MacAddress, channel: u8) -> anyhow::Result<Self> {
        let driver = EspNow::take()?;
        let rx = Arc::new(Mutex::new(VecDeque::with_capacity(RX_QUEUE_DEPTH)));

        let queue = Arc::clone(&rx);
        driver.register_recv_cb(move |info: &ReceiveInfo, data: &[u8]| {
            let frame = ReceivedFrame::new(*info.src_addr, data);
            if let Ok(mut q) = queue.lock() {
                if q.len() == RX_QUEUE_DEPTH {
                    q.pop_front();
                }
                q.push_back(frame);
            }
        })?;

        let mut radio = Self {
            driver,
            rx,
            own_address,
            channel,
        };
        // Pair requests go out before any peer is known.
        radio
            .add_peer(&BROADCAST)
            .map_err(|e| anyhow::anyhow!("broadcast peer: {e}"))?;
        info!(
            "EspNowRadio: ready as {} on channel {}",
            format_mac(&own_address),
            channel
        );
        Ok(radio)
    }
}

#[cfg(target_os = "espidf")]
impl RadioPort for EspNowRadio {
    fn own_address(&self) -> MacAddress {
        self.own_address
    }

    fn channel(&self) -> u8 {
        self.channel
    }

    fn add_peer(&mut self, address: &MacAddress) -> Result<(), RadioError> {
        if self.driver.peer_exists(*address).unwrap_or(false) {
            return Ok(());
        }
        let peer = PeerInfo {
            peer_addr: *address,
            channel: self.channel,
            ifidx: wifi_interface_t_WIFI_IF_STA,
            encrypt: false,
            ..Default::default()
        };
        self.driver.add_peer(peer).map_err(|e| {
            warn!("EspNowRadio: add peer {}: {}", format_mac(address), e);
            RadioError::PeerTable
        })
    }

    fn remove_peer(&mut self, address: &MacAddress) -> Result<(), RadioError> {
        self.driver
            .del_peer(*address)
            .map_err(|_| RadioError::PeerTable)
    }

    fn send(&mut self, address: &MacAddress, data: &[u8]) -> Result<(), RadioError> {
        self.driver
            .send(*address, data)
            .map_err(|_| RadioError::SendFailed)
    }

    fn receive(&mut self) -> Option<ReceivedFrame> {
        self.rx.lock().ok()?.pop_front()
    }
}

// ---------------------------------------------------------------------------
// Host simulation
// ---------------------------------------------------------------------------

/// In-memory radio: frames sent are recorded, frames injected are
/// delivered by [`receive`](RadioPort::receive) in order.  Starts with the
/// broadcast peer registered, like the firmware radio.
#[cfg(not(target_os = "espidf"))]
pub struct SimRadio {
    own_address: MacAddress,
    channel: u8,
    peers: Vec<MacAddress>,
    inbox: VecDeque<ReceivedFrame>,
    /// Every frame handed to `send`, with its destination.
    pub sent: Vec<(MacAddress, Vec<u8>)>,
    /// Make every `send` fail (radio out of range, driver error).
    pub fail_sends: bool,
}

#[cfg(not(target_os = "espidf"))]
impl SimRadio {
    pub fn new(own_address: MacAddress, channel: u8) -> Self {
        info!(
            "SimRadio: simulating {} on channel {}",
            format_mac(&own_address),
            channel
        );
        Self {
            own_address,
            channel,
            peers: vec![BROADCAST],
            inbox: VecDeque::new(),
            sent: Vec::new(),
            fail_sends: false,
        }
    }

    /// Queue a frame as if `source` had sent it.  Like the driver queue,
    /// the oldest frame is dropped when the inbox is full.
    pub fn inject(&mut self, source: MacAddress, data: &[u8]) {
        if self.inbox.len() == RX_QUEUE_DEPTH {
            self.inbox.pop_front();
        }
        self.inbox.push_back(ReceivedFrame::new(source, data));
    }

    pub fn peers(&self) -> &[MacAddress] {
        &self.peers
    }

    pub fn is_peer(&self, address: &MacAddress) -> bool {
        self.peers.contains(address)
    }
}

#[cfg(not(target_os = "espidf"))]
impl RadioPort for SimRadio {
    fn own_address(&self) -> MacAddress {
        self.own_address
    }

    fn channel(&self) -> u8 {
        self.channel
    }

    fn add_peer(&mut self, address: &MacAddress) -> Result<(), RadioError> {
        if !self.peers.contains(address) {
            self.peers.push(*address);
        }
        Ok(())
    }

    fn remove_peer(&mut self, address: &MacAddress) -> Result<(), RadioError> {
        let before = self.peers.len();
        self.peers.retain(|p| p != address);
        if self.peers.len() == before {
            return Err(RadioError::PeerTable);
        }
        Ok(())
    }

    fn send(&mut self, address: &MacAddress, data: &[u8]) -> Result<(), RadioError> {
        if self.fail_sends {
            return Err(RadioError::SendFailed);
        }
        if !self.peers.contains(address) {
            return Err(RadioError::PeerTable);
        }
        self.sent.push((*address, data.to_vec()));
        Ok(())
    }

    fn receive(&mut self) -> Option<ReceivedFrame> {
        self.inbox.pop_front()
    }
}
