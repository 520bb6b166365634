//! Settings resynchronisation after pairing.
//!
//! The main controller owns the authoritative value of every setting the
//! screen edits.  After each pairing the node pulls them back one at a time,
//! in a fixed priority order, until each has been seen on the link.

use log::debug;

/// A remote setting that must be confirmed after every pairing.
///
/// Declaration order is request priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RemoteSetting {
    Profile = 0,
    BrewTemperature,
    BrewMode,
    SteamBoost,
    ProfilingMode,
    ProfilingSource,
    ProfilingTarget,
    FlatValue,
}

impl RemoteSetting {
    pub const COUNT: usize = 8;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Profile,
        Self::BrewTemperature,
        Self::BrewMode,
        Self::SteamBoost,
        Self::ProfilingMode,
        Self::ProfilingSource,
        Self::ProfilingTarget,
        Self::FlatValue,
    ];

    /// Name carried in the outbound `request=<name>` message.
    pub const fn request_name(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::BrewTemperature => "tempsetbrew",
            Self::BrewMode => "brewmode",
            Self::SteamBoost => "steamboost",
            Self::ProfilingMode => "prof_mode",
            Self::ProfilingSource => "prof_src",
            Self::ProfilingTarget => "prof_trg",
            Self::FlatValue => "prof_flat",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Outbound topic for settings requests.
pub const REQUEST_TOPIC: &str = "request";

/// Tracks which settings have arrived and rate-limits requests for the rest.
#[derive(Debug, Clone)]
pub struct SettingsSync {
    received: u8,
    last_request_ms: Option<u64>,
    interval_ms: u64,
}

impl SettingsSync {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            received: 0,
            last_request_ms: None,
            interval_ms: u64::from(interval_ms),
        }
    }

    pub fn mark_received(&mut self, setting: RemoteSetting) {
        self.received |= setting.bit();
    }

    pub fn is_received(&self, setting: RemoteSetting) -> bool {
        self.received & setting.bit() != 0
    }

    pub fn all_received(&self) -> bool {
        RemoteSetting::ALL.iter().all(|s| self.is_received(*s))
    }

    /// Forget everything; called on a pairing reset only.
    pub fn reset(&mut self) {
        self.received = 0;
        self.last_request_ms = None;
    }

    /// The setting to request on this tick, if any.
    ///
    /// Returns the first unconfirmed setting in priority order, at most once
    /// per request interval and only while paired.  The caller publishes
    /// `request=<name>` with an immediate flush.
    pub fn poll(&mut self, now_ms: u64, paired: bool) -> Option<RemoteSetting> {
        if let Some(last) = self.last_request_ms {
            if now_ms.saturating_sub(last) < self.interval_ms {
                return None;
            }
        }
        if !paired {
            return None;
        }
        let next = RemoteSetting::ALL
            .into_iter()
            .find(|s| !self.is_received(*s))?;
        debug!("SYNC: requesting {}", next.request_name());
        self.last_request_ms = Some(now_ms);
        Some(next)
    }
}
