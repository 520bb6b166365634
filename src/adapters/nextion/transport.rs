//! Serial transport for the screen.
//!
//! The screen adapter is generic over [`Transport`], so the firmware runs
//! it on a UART and the tests run it on a scripted byte stream.

use crate::error::ScreenError;

/// Byte-oriented serial channel.
pub trait Transport {
    /// Read up to `buf.len()` bytes, waiting at most `timeout_ms`.
    /// Returns 0 if nothing arrived in time.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, ScreenError>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8]) -> Result<(), ScreenError>;
}

#[cfg(target_os = "espidf")]
mod uart {
    use esp_idf_hal::delay::TickType;
    use esp_idf_hal::uart::UartDriver;
    use log::warn;

    use super::Transport;
    use crate::error::ScreenError;

    impl Transport for UartDriver<'_> {
        fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, ScreenError> {
            let ticks = TickType::new_millis(u64::from(timeout_ms)).ticks();
            UartDriver::read(self, buf, ticks).map_err(|e| {
                warn!("DISPLAY: uart read failed: {e}");
                ScreenError::Io
            })
        }

        fn write_all(&mut self, data: &[u8]) -> Result<(), ScreenError> {
            let mut rest = data;
            while !rest.is_empty() {
                let n = UartDriver::write(self, rest).map_err(|e| {
                    warn!("DISPLAY: uart write failed: {e}");
                    ScreenError::Io
                })?;
                rest = &rest[n..];
            }
            Ok(())
        }
    }
}
