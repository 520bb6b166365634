//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the rules of the remote HMI node: mirroring the
//! controller's state, editing settings and profiles from the dial and the
//! touch screen, and pushing changes back over the radio link.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod editor;
pub mod events;
pub mod machine;
pub mod ports;
pub mod service;
