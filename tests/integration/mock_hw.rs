//! Mock adapters for integration tests.
//!
//! The screen records every write so tests can assert on the full command
//! history; storage keeps values in a map shared by the profile store and
//! the config port.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use brewhmi::adapters::espnow::SimRadio;
use brewhmi::app::commands::{AppCommand, CommandReply};
use brewhmi::app::events::AppEvent;
use brewhmi::app::ports::{
    ConfigError, ConfigPort, EventSink, ScreenPort, StorageError, StoragePort, TouchEvent,
};
use brewhmi::app::service::{DialInput, HmiService};
use brewhmi::config::HmiConfig;
use brewhmi::display::layout::{Attr, Component, main_page, profiling_page, settings_page};
use brewhmi::error::ScreenError;
use brewhmi::link::MacAddress;
use brewhmi::link::record::{PairingKind, PairingRecord, encode_application};
use embedded_hal::delay::DelayNs;

pub const HMI: MacAddress = [0x34, 0x85, 0x18, 0x00, 0x00, 0x01];
pub const CONTROLLER: MacAddress = [0x24, 0x6F, 0x28, 0x01, 0x02, 0x03];

// ── Screen write record ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ScreenWrite {
    Number(Attr, i32),
    Text(Attr, String),
    Command(String),
}

// ── MockScreen ────────────────────────────────────────────────

/// Attribute store standing in for the screen.  Reads of unknown
/// attributes answer `NotReady`, like a screen still booting.
pub struct MockScreen {
    pub numbers: HashMap<Attr, i32>,
    pub texts: HashMap<Attr, String>,
    pub page: u8,
    pub writes: Vec<ScreenWrite>,
    pub touches: VecDeque<TouchEvent>,
}

#[allow(dead_code)]
impl MockScreen {
    /// A screen holding a complete, freshly flashed UI state.
    pub fn new() -> Self {
        let mut s = Self {
            numbers: HashMap::new(),
            texts: HashMap::new(),
            page: 0,
            writes: Vec::new(),
            touches: VecDeque::new(),
        };
        s.numbers.insert(settings_page::BREW_TEMP_SLIDER.attr("minval"), 800);
        s.numbers.insert(settings_page::BREW_TEMP_SLIDER.attr("maxval"), 1050);
        s.numbers.insert(settings_page::BREW_TEMP_SLIDER.val(), 930);
        s.texts.insert(profiling_page::VALUES.txt(), String::new());
        s.texts.insert(profiling_page::FLAT.txt(), " 2.0".into());
        s.texts.insert(profiling_page::PROFILE_NAME.txt(), String::new());
        s.numbers.insert(profiling_page::STEPPED.val(), 0);
        s.numbers.insert(profiling_page::SELECTION.val(), 0);
        s.numbers.insert(profiling_page::ROW.val(), 0);
        s.numbers.insert(profiling_page::COLUMN.val(), 0);
        s.numbers.insert(profiling_page::VALUES.attr("h"), 200);
        s.numbers.insert(main_page::WAVEFORM.attr("w"), 300);
        s.numbers.insert(main_page::WAVEFORM.attr("h"), 150);
        s
    }

    /// A screen that never answers a read.
    pub fn silent() -> Self {
        Self {
            numbers: HashMap::new(),
            texts: HashMap::new(),
            page: 0,
            writes: Vec::new(),
            touches: VecDeque::new(),
        }
    }

    /// Queue a press and release of `component`.
    pub fn tap(&mut self, component: Component) {
        for pressed in [true, false] {
            self.touches.push_back(TouchEvent {
                page: component.page,
                component: component.id,
                pressed,
            });
        }
    }

    pub fn text_written(&self, attr: Attr) -> Option<&str> {
        self.writes.iter().rev().find_map(|w| match w {
            ScreenWrite::Text(a, t) if *a == attr => Some(t.as_str()),
            _ => None,
        })
    }

    pub fn number_written(&self, attr: Attr) -> Option<i32> {
        self.writes.iter().rev().find_map(|w| match w {
            ScreenWrite::Number(a, v) if *a == attr => Some(*v),
            _ => None,
        })
    }

    pub fn commands(&self) -> impl Iterator<Item = &str> {
        self.writes.iter().filter_map(|w| match w {
            ScreenWrite::Command(c) => Some(c.as_str()),
            _ => None,
        })
    }
}

impl Default for MockScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenPort for MockScreen {
    fn get_number(&mut self, attr: Attr) -> Result<i32, ScreenError> {
        self.numbers.get(&attr).copied().ok_or(ScreenError::NotReady)
    }

    fn get_text(&mut self, attr: Attr) -> Result<String, ScreenError> {
        self.texts.get(&attr).cloned().ok_or(ScreenError::NotReady)
    }

    fn set_number(&mut self, attr: Attr, value: i32) -> Result<(), ScreenError> {
        self.numbers.insert(attr, value);
        self.writes.push(ScreenWrite::Number(attr, value));
        Ok(())
    }

    fn set_text(&mut self, attr: Attr, value: &str) -> Result<(), ScreenError> {
        self.texts.insert(attr, value.into());
        self.writes.push(ScreenWrite::Text(attr, value.into()));
        Ok(())
    }

    fn command(&mut self, instruction: &str) -> Result<(), ScreenError> {
        self.writes.push(ScreenWrite::Command(instruction.into()));
        Ok(())
    }

    fn current_page(&mut self) -> Result<u8, ScreenError> {
        Ok(self.page)
    }

    fn poll_touch(&mut self) -> Option<TouchEvent> {
        self.touches.pop_front()
    }
}

// ── NoDelay ───────────────────────────────────────────────────

#[derive(Default)]
pub struct NoDelay {
    pub total_ms: u64,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ms += u64::from(ns) / 1_000_000;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.total_ms += u64::from(ms);
    }
}

// ── MockNvs ───────────────────────────────────────────────────

pub struct MockNvs {
    store: HashMap<String, Vec<u8>>,
    config: RefCell<Option<HmiConfig>>,
    pub writes: usize,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self {
            store: HashMap::new(),
            config: RefCell::new(None),
            writes: 0,
        }
    }

    pub fn saved_config(&self) -> Option<HmiConfig> {
        self.config.borrow().clone()
    }

    pub fn raw(&self, namespace: &str, key: &str) -> Option<&[u8]> {
        self.store
            .get(&format!("{}::{}", namespace, key))
            .map(Vec::as_slice)
    }
}

impl Default for MockNvs {
    fn default() -> Self {
        Self::new()
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.get(&format!("{}::{}", namespace, key)) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn stored_len(&self, namespace: &str, key: &str) -> Result<usize, StorageError> {
        self.store
            .get(&format!("{}::{}", namespace, key))
            .map(Vec::len)
            .ok_or(StorageError::NotFound)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.writes += 1;
        self.store
            .insert(format!("{}::{}", namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&format!("{}::{}", namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store.contains_key(&format!("{}::{}", namespace, key))
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<HmiConfig, ConfigError> {
        Ok(self.config.borrow().clone().unwrap_or_default())
    }

    fn save(&self, config: &HmiConfig) -> Result<(), ConfigError> {
        *self.config.borrow_mut() = Some(config.clone());
        Ok(())
    }
}

// ── LogSink ───────────────────────────────────────────────────

pub struct LogSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl LogSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Radio helpers ─────────────────────────────────────────────

#[allow(dead_code)]
pub fn radio() -> SimRadio {
    SimRadio::new(HMI, 6)
}

/// A pair response from the controller as the radio would deliver it.
#[allow(dead_code)]
pub fn pair_response(identifier: &str) -> Vec<u8> {
    PairingRecord::new(PairingKind::Response, CONTROLLER, 6, identifier)
        .encode()
        .to_vec()
}

/// An application frame carrying `payload`.
#[allow(dead_code)]
pub fn payload(text: &str) -> Vec<u8> {
    encode_application(text).to_vec()
}

/// Payload text of every application frame sent to the controller.
#[allow(dead_code)]
pub fn sent_payloads(radio: &SimRadio) -> Vec<String> {
    radio
        .sent
        .iter()
        .filter(|(to, data)| *to == CONTROLLER && data.len() == 250)
        .map(|(_, data)| {
            let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
            String::from_utf8_lossy(&data[..end]).into_owned()
        })
        .collect()
}

// ── Rig ───────────────────────────────────────────────────────

/// No dial movement, no button.
pub const IDLE: DialInput = DialInput {
    ticks: 0,
    button: false,
};

/// A started service wired to mock adapters.
pub struct Rig {
    pub app: HmiService,
    pub screen: MockScreen,
    pub nvs: MockNvs,
    pub sink: LogSink,
    pub radio: SimRadio,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        let mut nvs = MockNvs::new();
        let mut screen = MockScreen::new();
        let mut sink = LogSink::new();
        let mut app = HmiService::new(HmiConfig::default(), &mut nvs);
        app.start(&mut screen, &mut NoDelay::default(), &mut sink);
        Self {
            app,
            screen,
            nvs,
            sink,
            radio: radio(),
        }
    }

    /// Started and paired at t=0.
    pub fn paired() -> Self {
        let mut rig = Self::new();
        rig.radio.inject(CONTROLLER, &pair_response("espresso"));
        rig.tick(0);
        assert!(rig.app.link().is_paired());
        rig
    }

    pub fn tick(&mut self, now_ms: u64) {
        self.tick_with(now_ms, IDLE);
    }

    pub fn tick_with(&mut self, now_ms: u64, input: DialInput) {
        self.app.tick(
            now_ms,
            input,
            &mut self.radio,
            &mut self.screen,
            &mut self.nvs,
            &mut self.sink,
        );
    }

    pub fn receive(&mut self, now_ms: u64, text: &str) {
        self.radio.inject(CONTROLLER, &payload(text));
        self.tick(now_ms);
    }

    pub fn command(&mut self, now_ms: u64, cmd: AppCommand) -> CommandReply {
        self.app.handle_command(
            cmd,
            now_ms,
            &mut self.radio,
            &mut self.screen,
            &mut self.nvs,
            &mut self.sink,
        )
    }
}
