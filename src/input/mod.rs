//! Local input devices.

pub mod encoder;

pub use encoder::{ENCODER, QUADRATURE, Quadrature, RotaryEncoder};
