//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::link::format_mac;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { active_profile } => {
                info!("START | active_profile={}", active_profile);
            }
            AppEvent::BootstrapFailed(e) => warn!("START | screen read-back failed: {}", e),
            AppEvent::Paired { peer, channel } => {
                info!("LINK | paired with {} on channel {}", format_mac(peer), channel);
            }
            AppEvent::PeerLost => warn!("LINK | peer lost"),
            AppEvent::SettingRequested(setting) => {
                info!("SYNC | requested {}", setting.request_name());
            }
            AppEvent::SettingsSynchronised => info!("SYNC | all settings received"),
            AppEvent::ShotStarted => info!("SHOT | started"),
            AppEvent::ShotFinished { seconds } => info!("SHOT | finished after {} s", seconds),
            AppEvent::ProfileStored { slot } => info!("PROFILE | stored in slot {}", slot),
            AppEvent::ProfileRejected(e) => warn!("PROFILE | rejected: {}", e),
            AppEvent::ProfileDeleted { slot } => info!("PROFILE | slot {} deleted", slot),
            AppEvent::ActiveProfileChanged { slot } => info!("PROFILE | active slot {}", slot),
            AppEvent::Status(text) => info!("STATUS | {}", text.replace("\r\n", " ")),
            AppEvent::SettingPublished { topic } => info!("PUBLISH | {}", topic),
            AppEvent::ConfigPortalRequested => info!("CONFIG | portal requested"),
        }
    }
}
