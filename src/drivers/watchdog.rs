//! Task watchdog.
//!
//! Subscribes the scheduler task to the ESP-IDF task watchdog, so a stalled
//! tick loop (screen or radio driver stuck) resets the node.  The loop
//! calls [`feed`](Watchdog::feed) once per tick.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, esp_task_wdt_reset,
};
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

/// Reset the node if the loop has not fed the watchdog for this long.
pub const WATCHDOG_TIMEOUT_MS: u32 = 8_000;

pub struct Watchdog {
    subscribed: bool,
}

impl Watchdog {
    /// Configure the watchdog and subscribe the calling task.
    #[cfg(target_os = "espidf")]
    pub fn subscribe(timeout_ms: u32) -> Self {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: plain FFI calls on a config struct that outlives them;
        // called once from the scheduler task before the loop starts.
        let subscribed = unsafe {
            let rc = esp_task_wdt_reconfigure(&cfg);
            if rc != ESP_OK {
                warn!("Watchdog: reconfigure returned {rc}, keeping the boot settings");
            }
            esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK
        };
        if subscribed {
            info!("Watchdog: armed, {timeout_ms} ms");
        } else {
            warn!("Watchdog: could not subscribe the main task");
        }
        Self { subscribed }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn subscribe(timeout_ms: u32) -> Self {
        info!("Watchdog(sim): {timeout_ms} ms, not enforced");
        Self { subscribed: false }
    }

    pub fn is_armed(&self) -> bool {
        self.subscribed
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the counter of the already subscribed task.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;

    #[test]
    fn host_watchdog_is_inert() {
        let wd = Watchdog::subscribe(WATCHDOG_TIMEOUT_MS);
        assert!(!wd.is_armed());
        wd.feed();
    }
}
