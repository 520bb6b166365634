//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ HmiService (domain)
//! ```
//!
//! Driven adapters (radio, screen, storage, event sinks) implement these
//! traits.  The [`HmiService`](super::service::HmiService) consumes them via
//! generics, so the domain core never touches hardware directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use heapless::Vec;

use crate::config::HmiConfig;
use crate::display::layout::Attr;
use crate::error::ScreenError;
use crate::link::{MacAddress, APPLICATION_RECORD_LEN};

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain ↔ ESP-NOW)
// ───────────────────────────────────────────────────────────────

/// A frame as delivered by the radio, tagged with its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub source: MacAddress,
    pub data: Vec<u8, APPLICATION_RECORD_LEN>,
}

impl ReceivedFrame {
    /// Copy `data` into a frame; anything past the largest record is cut off.
    pub fn new(source: MacAddress, data: &[u8]) -> Self {
        let len = data.len().min(APPLICATION_RECORD_LEN);
        let mut buf = Vec::new();
        // Cannot fail: `len` is bounded by the capacity.
        let _ = buf.extend_from_slice(&data[..len]);
        Self { source, data: buf }
    }
}

/// Broadcast-capable, connectionless radio (ESP-NOW on target).
///
/// Frames are fire-and-forget: a successful `send` only means the radio
/// accepted the frame, not that the peer received it.
pub trait RadioPort {
    /// This node's own link-layer address.
    fn own_address(&self) -> MacAddress;

    /// The radio channel this node is listening on.
    fn channel(&self) -> u8;

    /// Register a unicast (or the broadcast) peer so frames can be sent to it.
    fn add_peer(&mut self, address: &MacAddress) -> Result<(), RadioError>;

    /// Forget a previously registered peer.
    fn remove_peer(&mut self, address: &MacAddress) -> Result<(), RadioError>;

    /// Queue one frame for transmission.
    fn send(&mut self, address: &MacAddress, data: &[u8]) -> Result<(), RadioError>;

    /// Pop the oldest received frame, if any.  Frames come out in arrival order.
    fn receive(&mut self) -> Option<ReceivedFrame>;
}

// ───────────────────────────────────────────────────────────────
// Screen port (driven adapter: domain ↔ serial HMI display)
// ───────────────────────────────────────────────────────────────

/// A touch event reported by the screen for a component on the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchEvent {
    pub page: u8,
    pub component: u8,
    /// `true` on press, `false` on release.
    pub pressed: bool,
}

/// Synchronous get/set attribute RPC surface of the external screen.
///
/// Reads may return [`ScreenError::NotReady`] while the screen is still
/// busy; the adapter is responsible for honouring the minimum turnaround
/// between a write and a dependent read.
pub trait ScreenPort {
    /// Read a numeric attribute (`val`, `minval`, `w`, ...).
    fn get_number(&mut self, attr: Attr) -> Result<i32, ScreenError>;

    /// Read a text attribute (`txt`).
    fn get_text(&mut self, attr: Attr) -> Result<std::string::String, ScreenError>;

    /// Write a numeric attribute.
    fn set_number(&mut self, attr: Attr, value: i32) -> Result<(), ScreenError>;

    /// Write a text attribute.
    fn set_text(&mut self, attr: Attr, value: &str) -> Result<(), ScreenError>;

    /// Send a raw instruction (`cle 12,255`, `add 12,0,40`, `vis 24,1`, ...).
    fn command(&mut self, instruction: &str) -> Result<(), ScreenError>;

    /// The page currently shown.
    fn current_page(&mut self) -> Result<u8, ScreenError>;

    /// Pop the oldest pending touch event, if any.
    fn poll_touch(&mut self) -> Option<TouchEvent>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`HmiConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<HmiConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &HmiConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Each call is open-write-close; no transaction spans ticks.
/// - Write operations MUST be atomic, with no partial writes on power loss.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Stored length of a value without reading it.
    fn stored_len(&self, namespace: &str, key: &str) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`RadioPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// The driver rejected the frame.
    SendFailed,
    /// Peer table full, or the peer is unknown.
    PeerTable,
    /// The radio was used before initialisation.
    NotInitialised,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for RadioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SendFailed => write!(f, "send failed"),
            Self::PeerTable => write!(f, "peer table error"),
            Self::NotInitialised => write!(f, "radio not initialised"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
