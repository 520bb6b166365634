//! One-shot GPIO setup for the dial.
//!
//! Configures the dial lines and push button as pulled-up inputs and hooks
//! their interrupts to the atomics in [`crate::input::encoder`].  Called
//! once from `main()` before the tick loop starts.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    ESP_ERR_INVALID_STATE, ESP_OK, gpio_config, gpio_config_t, gpio_get_level,
    gpio_install_isr_service, gpio_int_type_t, gpio_int_type_t_GPIO_INTR_ANYEDGE,
    gpio_int_type_t_GPIO_INTR_NEGEDGE, gpio_isr_handler_add, gpio_mode_t_GPIO_MODE_INPUT,
    gpio_pulldown_t_GPIO_PULLDOWN_DISABLE, gpio_pullup_t_GPIO_PULLUP_ENABLE,
};
#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::input::encoder::{button_isr_handler, dial_lines_isr_handler};
#[cfg(target_os = "espidf")]
use crate::pins;

/// Errors during GPIO bring-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed { gpio: i32, rc: i32 },
    IsrInstallFailed(i32),
    HandlerAddFailed { gpio: i32, rc: i32 },
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed { gpio, rc } => {
                write!(f, "GPIO{gpio} config failed (rc={rc})")
            }
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
            Self::HandlerAddFailed { gpio, rc } => {
                write!(f, "GPIO{gpio} handler registration failed (rc={rc})")
            }
        }
    }
}

impl std::error::Error for HwInitError {}

// ── ISR trampolines ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn dial_line_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let (a, b) = unsafe {
        (
            gpio_get_level(pins::DIAL_A_GPIO) != 0,
            gpio_get_level(pins::DIAL_B_GPIO) != 0,
        )
    };
    dial_lines_isr_handler(a, b);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn dial_button_isr(_arg: *mut core::ffi::c_void) {
    button_isr_handler();
}

// ── Setup ─────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn configure_input(gpio: i32, intr_type: gpio_int_type_t) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << gpio,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type,
        ..Default::default()
    };
    // SAFETY: the config struct lives across the call; init path only.
    let rc = unsafe { gpio_config(&cfg) };
    if rc != ESP_OK {
        return Err(HwInitError::GpioConfigFailed { gpio, rc });
    }
    Ok(())
}

#[cfg(target_os = "espidf")]
fn attach(
    gpio: i32,
    handler: unsafe extern "C" fn(*mut core::ffi::c_void),
) -> Result<(), HwInitError> {
    // SAFETY: handlers are static functions touching only atomics.
    let rc = unsafe { gpio_isr_handler_add(gpio, Some(handler), core::ptr::null_mut()) };
    if rc != ESP_OK {
        return Err(HwInitError::HandlerAddFailed { gpio, rc });
    }
    Ok(())
}

/// Configure the dial inputs and register their interrupt handlers.
#[cfg(target_os = "espidf")]
pub fn init_dial() -> Result<(), HwInitError> {
    configure_input(pins::DIAL_A_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE)?;
    configure_input(pins::DIAL_B_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE)?;
    configure_input(pins::DIAL_BUTTON_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE)?;

    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed.
    let rc = unsafe { gpio_install_isr_service(0) };
    if rc != ESP_OK && rc != ESP_ERR_INVALID_STATE {
        return Err(HwInitError::IsrInstallFailed(rc));
    }

    attach(pins::DIAL_A_GPIO, dial_line_isr)?;
    attach(pins::DIAL_B_GPIO, dial_line_isr)?;
    attach(pins::DIAL_BUTTON_GPIO, dial_button_isr)?;
    info!(
        "hw_init: dial on GPIO{}/{} button GPIO{}",
        pins::DIAL_A_GPIO,
        pins::DIAL_B_GPIO,
        pins::DIAL_BUTTON_GPIO
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_dial() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): dial interrupts skipped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_pin() {
        let e = HwInitError::HandlerAddFailed { gpio: 6, rc: -1 };
        assert_eq!(e.to_string(), "GPIO6 handler registration failed (rc=-1)");
    }
}
