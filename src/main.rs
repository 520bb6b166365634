//! BrewHMI firmware: main entry point.
//!
//! Hexagonal architecture around a single cooperative tick loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  EspNowRadio    NextionScreen   NvsAdapter      LogEventSink   │
//! │  (RadioPort)    (ScreenPort)    (Storage+Config) (EventSink)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              HmiService (pure logic)                   │    │
//! │  │  Link · Sync · Profiles · Display · Shot · Workflows   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Dial ISRs → atomics, drained once per tick                    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use std::sync::mpsc::{self, Receiver};

use anyhow::{Context, Result};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_hal::units::Hertz;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::sys::{
    esp, esp_wifi_get_channel, esp_wifi_set_ps, wifi_ps_type_t_WIFI_PS_NONE,
    wifi_second_chan_t_WIFI_SECOND_CHAN_NONE,
};
use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use brewhmi::adapters::espnow::EspNowRadio;
use brewhmi::adapters::log_sink::LogEventSink;
use brewhmi::adapters::nextion::codec::encode_instruction;
use brewhmi::adapters::nextion::{NextionScreen, Transport};
use brewhmi::adapters::nvs::NvsAdapter;
use brewhmi::adapters::time::MonotonicClock;
use brewhmi::app::commands::{AppCommand, CommandReply};
use brewhmi::app::ports::ConfigPort;
use brewhmi::app::service::{DialInput, HmiService};
use brewhmi::config::HmiConfig;
use brewhmi::drivers::hw_init;
use brewhmi::drivers::watchdog::{WATCHDOG_TIMEOUT_MS, Watchdog};
use brewhmi::input::ENCODER;
use brewhmi::pins;

// ── Serial console ────────────────────────────────────────────
//
// stdin blocks, so a helper thread reads lines and hands them to the
// tick loop through a channel.

fn spawn_console() -> Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(4096)
        .spawn(move || {
            for line in std::io::stdin().lines() {
                let Ok(line) = line else { continue };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("console thread")?;
    Ok(rx)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  BrewHMI v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let watchdog = Watchdog::subscribe(WATCHDOG_TIMEOUT_MS);

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            HmiConfig::default()
        }
    };

    // ── 3. Wi-Fi station, only as the ESP-NOW carrier ─────────
    let sysloop = EspSystemEventLoop::take()?;
    let mut wifi = EspWifi::new(peripherals.modem, sysloop, None)?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration::default()))?;
    wifi.start()?;
    // SAFETY: Wi-Fi is started; plain driver calls with valid out-pointers.
    let channel = unsafe {
        esp!(esp_wifi_set_ps(wifi_ps_type_t_WIFI_PS_NONE))?;
        let mut primary = 0u8;
        let mut secondary = wifi_second_chan_t_WIFI_SECOND_CHAN_NONE;
        esp!(esp_wifi_get_channel(&mut primary, &mut secondary))?;
        primary
    };
    let own_address = wifi.sta_netif().get_mac()?;
    let mut radio = EspNowRadio::new(own_address, channel)?;

    // ── 4. Screen UART ────────────────────────────────────────
    // TX/RX are GPIO8/GPIO9, see `pins::SCREEN_TX_GPIO`.
    let mut uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &UartConfig::default().baudrate(Hertz(pins::SCREEN_BOOT_BAUD)),
    )?;
    let mut switch = Vec::new();
    encode_instruction(&format!("baud={}", pins::SCREEN_BAUD), &mut switch);
    uart.write_all(&switch)
        .map_err(|e| anyhow::anyhow!("screen baud switch: {e}"))?;
    FreeRtos::delay_ms(pins::SCREEN_BAUD_SWITCH_MS);
    uart.change_baudrate(Hertz(pins::SCREEN_BAUD))?;
    let mut screen = NextionScreen::new(uart, FreeRtos, config.screen_turnaround_ms);

    // ── 5. Local input ────────────────────────────────────────
    if let Err(e) = hw_init::init_dial() {
        log::error!("Dial init failed ({}), continuing without local input", e);
    }

    // ── 6. Construct app service ──────────────────────────────
    let mut log_sink = LogEventSink::new();
    let clock = MonotonicClock::new();
    let tick_ms = config.tick_interval_ms;

    let mut app = HmiService::new(config, &mut nvs);
    app.start(&mut screen, &mut FreeRtos, &mut log_sink);

    let console = match spawn_console() {
        Ok(rx) => Some(rx),
        Err(e) => {
            warn!("Serial console unavailable: {:#}", e);
            None
        }
    };

    info!("System ready. Entering tick loop.");

    // ── 7. Tick loop ──────────────────────────────────────────
    loop {
        let now_ms = clock.uptime_ms();
        let input = DialInput {
            ticks: ENCODER.drain_ticks(),
            button: ENCODER.take_button(),
        };
        app.tick(now_ms, input, &mut radio, &mut screen, &mut nvs, &mut log_sink);

        if let Some(rx) = &console {
            while let Ok(line) = rx.try_recv() {
                let Some(cmd) = AppCommand::parse_console(&line) else {
                    continue;
                };
                match app.handle_command(cmd, now_ms, &mut radio, &mut screen, &mut nvs, &mut log_sink) {
                    CommandReply::Done => {}
                    CommandReply::Document(doc) => println!("{doc}"),
                    CommandReply::Rejected(reason) => warn!("Console: {}", reason),
                }
            }
        }

        // Config auto-save (5s debounce after last change).
        app.auto_save_if_needed(&nvs, now_ms);

        watchdog.feed();
        FreeRtos::delay_ms(tick_ms);
    }
}
