//! HMI configuration parameters
//!
//! Every timing constant and tolerance the node uses lives here.
//! Values can be overridden via NVS (see [`ConfigPort`](crate::app::ports::ConfigPort)).

use heapless::String;
use serde::{Deserialize, Serialize};

/// Maximum length of the pairing identifier (10-byte field, NUL terminated).
pub const IDENTIFIER_CAPACITY: usize = 9;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmiConfig {
    // --- Scheduler ---
    /// Cooperative scheduler tick period (milliseconds)
    pub tick_interval_ms: u32,

    // --- Radio link ---
    /// Identifier both nodes must present during pairing
    pub pairing_identifier: String<IDENTIFIER_CAPACITY>,
    /// Broadcast interval while unpaired (milliseconds)
    pub pairing_retry_ms: u32,
    /// Session teardown after this long without an application frame (milliseconds)
    pub peer_timeout_ms: u32,
    /// Minimum spacing between settings requests (milliseconds)
    pub settings_request_interval_ms: u32,

    // --- Profiles and editing ---
    /// Active-index settle delay before it is persisted (milliseconds)
    pub profile_settle_ms: u32,
    /// Dial idle time before an edited setting is published (milliseconds)
    pub publish_idle_ms: u32,

    // --- Shot ---
    /// Pump + lever must be held longer than this to count as a shot (milliseconds)
    pub shot_start_threshold_ms: u32,
    /// Shot length mapped onto the full chart width (seconds)
    pub max_shot_time_secs: u32,
    /// How long a finished shot time stays on screen (milliseconds)
    pub shot_retention_ms: u32,
    /// How long the chart keeps plotting after a shot ends (milliseconds)
    pub chart_retention_ms: u32,

    // --- Workflows ---
    pub calibration_timeout_ms: u32,
    pub cleaning_timeout_ms: u32,
    /// Auto-clear delay for transient status messages (milliseconds)
    pub status_clear_ms: u32,

    // --- Display ---
    /// Temperature change that forces a screen write (°C)
    pub temperature_tolerance: f32,
    /// Weight change that forces a screen write (g)
    pub weight_tolerance: f32,
    /// Pause between bootstrap read passes (milliseconds)
    pub bootstrap_retry_ms: u32,
    /// Read attempts per bootstrap field before giving up
    pub bootstrap_max_attempts: u8,
    /// Minimum gap between a screen write and a dependent read (milliseconds)
    pub screen_turnaround_ms: u32,
    /// Debug trace stays visible this long after the last debug topic (milliseconds)
    pub debug_plot_window_ms: u32,
    /// Minimum spacing between debug trace samples (milliseconds)
    pub debug_plot_interval_ms: u32,
}

impl Default for HmiConfig {
    fn default() -> Self {
        let mut pairing_identifier = String::new();
        // "espresso" fits the 9-byte capacity.
        let _ = pairing_identifier.push_str("espresso");

        Self {
            tick_interval_ms: 50,

            pairing_identifier,
            pairing_retry_ms: 10_000,
            peer_timeout_ms: 10_000,
            settings_request_interval_ms: 500,

            profile_settle_ms: 3_000,
            publish_idle_ms: 1_000,

            shot_start_threshold_ms: 1_000,
            max_shot_time_secs: 50,
            shot_retention_ms: 10_000,
            chart_retention_ms: 3_000,

            calibration_timeout_ms: 10_000,
            cleaning_timeout_ms: 10_000,
            status_clear_ms: 5_000,

            temperature_tolerance: 0.1,
            weight_tolerance: 0.01,
            bootstrap_retry_ms: 50,
            bootstrap_max_attempts: 40,
            screen_turnaround_ms: 100,
            debug_plot_window_ms: 2_000,
            debug_plot_interval_ms: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = HmiConfig::default();
        assert_eq!(c.pairing_identifier.as_str(), "espresso");
        assert!(c.tick_interval_ms > 0);
        assert!(c.settings_request_interval_ms < c.pairing_retry_ms);
        assert!(c.bootstrap_max_attempts > 0);
        assert!(c.temperature_tolerance > 0.0);
    }

    #[test]
    fn retention_outlasts_chart() {
        let c = HmiConfig::default();
        assert!(
            c.shot_retention_ms > c.chart_retention_ms,
            "the shot time must stay visible longer than the chart keeps drawing"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let c = HmiConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: HmiConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c, c2);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = HmiConfig {
            peer_timeout_ms: 12_345,
            ..HmiConfig::default()
        };
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: HmiConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c2.peer_timeout_ms, 12_345);
        assert_eq!(c, c2);
    }
}
