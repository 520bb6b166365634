//! BrewHMI firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod display;
pub mod drivers;
pub mod error;
pub mod input;
pub mod link;
pub mod pins;
pub mod profile;
pub mod settings_sync;
pub mod shot;
pub mod workflow;
