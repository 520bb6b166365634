//! GPIO assignments for the HMI board (XIAO ESP32-C3 carrier).
//!
//! Every driver takes its pin numbers from here.  The silkscreen label is
//! noted next to each GPIO.

// ---------------------------------------------------------------------------
// Rotary dial
// ---------------------------------------------------------------------------

/// Dial line A (D4).
pub const DIAL_A_GPIO: i32 = 6;
/// Dial line B (D3).
pub const DIAL_B_GPIO: i32 = 5;
/// Dial push button (D5), active low with the internal pull-up.
pub const DIAL_BUTTON_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Screen UART
// ---------------------------------------------------------------------------

/// UART1 TX towards the screen (D8).
pub const SCREEN_TX_GPIO: i32 = 8;
/// UART1 RX from the screen (D9).
pub const SCREEN_RX_GPIO: i32 = 9;

/// The screen powers up at this rate.
pub const SCREEN_BOOT_BAUD: u32 = 9_600;
/// Rate the screen is switched to before the bootstrap runs.
pub const SCREEN_BAUD: u32 = 19_200;
/// The screen needs this long to apply a baud change.
pub const SCREEN_BAUD_SWITCH_MS: u32 = 1_500;
