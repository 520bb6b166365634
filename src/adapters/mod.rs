//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to               |
//! |----------------|--------------------|---------------------------|
//! | `espnow`       | RadioPort          | ESP-NOW driver / sim      |
//! | `log_sink`     | EventSink          | Serial log output         |
//! | `nextion`      | ScreenPort         | Touch screen over UART    |
//! | `nvs`          | ConfigPort         | NVS / in-memory store     |
//! |                | StoragePort        |                           |
//! | `time`         | (none)             | ESP32 system timer        |

pub mod espnow;
pub mod log_sink;
pub mod nextion;
pub mod nvs;
pub mod time;
