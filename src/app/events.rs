//! Outbound application events.
//!
//! The [`HmiService`](super::service::HmiService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, a test recorder, ...).

use crate::error::{DisplayError, ProfileError};
use crate::link::MacAddress;
use crate::settings_sync::RemoteSetting;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service finished startup; carries the active profile slot.
    Started { active_profile: usize },

    /// The screen read-back gave up; defaults are in use.
    BootstrapFailed(DisplayError),

    /// A pair response established the session.
    Paired { peer: MacAddress, channel: u8 },

    /// The peer went quiet and the session was torn down.
    PeerLost,

    /// A `request=<name>` went out for a setting not yet confirmed.
    SettingRequested(RemoteSetting),

    /// Every synchronised setting has been confirmed since pairing.
    SettingsSynchronised,

    /// Pump and lever held past the start threshold.
    ShotStarted,

    /// The shot ended; carries the frozen duration.
    ShotFinished { seconds: u32 },

    /// A profile was imported or saved into a slot.
    ProfileStored { slot: usize },

    /// An import or save was rejected; nothing changed.
    ProfileRejected(ProfileError),

    /// A profile slot was cleared.
    ProfileDeleted { slot: usize },

    /// The active slot changed (dial scrub, CRUD or deletion).
    ActiveProfileChanged { slot: usize },

    /// The system-page status text changed.
    Status(String),

    /// A locally edited setting was published.
    SettingPublished { topic: &'static str },

    /// The system settings button asked for the configuration portal.
    ConfigPortalRequested,
}
