//! Board bring-up: GPIO interrupts for the dial and the task watchdog.

pub mod hw_init;
pub mod watchdog;
