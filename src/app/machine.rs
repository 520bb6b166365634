//! Typed state mirrored from the main controller.
//!
//! Inbound `topic=value` tokens are parsed into [`Update`]s and folded into
//! [`MachineState`].  Unknown topics parse to `None` and are ignored.

use heapless::String;

use crate::settings_sync::RemoteSetting;

/// Capacity of the controller state label.
pub const STATE_CAPACITY: usize = 63;
/// Capacity of each broker setting.
pub const MQTT_FIELD_CAPACITY: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrewMode {
    #[default]
    Coffee,
    Steam,
}

impl BrewMode {
    pub fn parse(value: &str) -> Self {
        if value == "COFFEE" {
            Self::Coffee
        } else {
            Self::Steam
        }
    }

    /// Value published on the `brewmode` topic.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Coffee => "coffee",
            Self::Steam => "steam",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilingMode {
    #[default]
    Manual,
    Flat,
    Profile,
}

impl ProfilingMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "manual" => Some(Self::Manual),
            "flat" => Some(Self::Flat),
            "profile" => Some(Self::Profile),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Flat => "flat",
            Self::Profile => "profile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilingSource {
    #[default]
    Pressure,
    Flow,
}

impl ProfilingSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pressure" => Some(Self::Pressure),
            "flow" => Some(Self::Flow),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pressure => "pressure",
            Self::Flow => "flow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfilingTarget {
    #[default]
    Time,
    Weight,
}

impl ProfilingTarget {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "time" => Some(Self::Time),
            "weight" => Some(Self::Weight),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Weight => "weight",
        }
    }
}

/// Broker settings, as reported by the controller or entered locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MqttSettings {
    pub server: String<MQTT_FIELD_CAPACITY>,
    pub port: String<MQTT_FIELD_CAPACITY>,
    pub user: String<MQTT_FIELD_CAPACITY>,
    pub password: String<MQTT_FIELD_CAPACITY>,
}

/// Copy `src` into a bounded string, cutting at the last whole character.
pub fn bounded<const N: usize>(src: &str) -> String<N> {
    let mut out = String::new();
    for c in src.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// `ON`, `true` and `1` are true; anything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(value, "ON" | "true" | "1")
}

/// Lenient float parse: anything unparseable reads as 0.
pub fn parse_float(value: &str) -> f32 {
    value.trim().parse().unwrap_or(0.0)
}

/// One decoded inbound token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Update<'a> {
    BoilerTemp(f32),
    HxTemp(f32),
    Pressure(f32),
    Heater(bool),
    Pump(bool),
    BrewMode(BrewMode),
    Lever(bool),
    /// Brew setpoint in °C.
    BrewSetpoint(f32),
    Weight(f32),
    FlowRate(f32),
    SteamBoost(bool),
    ProfilingMode(ProfilingMode),
    ProfilingSource(ProfilingSource),
    ProfilingTarget(ProfilingTarget),
    FlatValue(f32),
    MqttServer(&'a str),
    MqttPort(&'a str),
    MqttUser(&'a str),
    MqttPassword(&'a str),
    ProfileData(&'a str),
    State(&'a str),
    RawWeight(f32),
    FilteredWeight(f32),
    FilteredFlow(f32),
}

impl<'a> Update<'a> {
    /// Decode a token.  `None` for unknown topics and unknown enum values.
    pub fn parse(topic: &str, value: &'a str) -> Option<Self> {
        let update = match topic {
            "boiler_temp" => Self::BoilerTemp(parse_float(value)),
            "hx_temp" => Self::HxTemp(parse_float(value)),
            "pressure" => Self::Pressure(parse_float(value)),
            "heater" => Self::Heater(parse_bool(value)),
            "pump" => Self::Pump(parse_bool(value)),
            "brew_mode" => Self::BrewMode(BrewMode::parse(value)),
            "lever" => Self::Lever(value == "LIFTED"),
            "tempsetbrew" => Self::BrewSetpoint(parse_float(value)),
            "weight" => Self::Weight(parse_float(value)),
            "flow_rate" => Self::FlowRate(parse_float(value)),
            "steam_boost" => Self::SteamBoost(value == "true"),
            "profiling_mode" => Self::ProfilingMode(ProfilingMode::parse(value)?),
            "profiling_source" => Self::ProfilingSource(ProfilingSource::parse(value)?),
            "profiling_target" => Self::ProfilingTarget(ProfilingTarget::parse(value)?),
            "profiling_flat_value" => Self::FlatValue(parse_float(value)),
            "mqtt_server" => Self::MqttServer(value),
            "mqtt_port" => Self::MqttPort(value),
            "mqtt_user" => Self::MqttUser(value),
            "mqtt_pass" => Self::MqttPassword(value),
            "profile_data" => Self::ProfileData(value),
            "state" => Self::State(value),
            "raw_weight" => Self::RawWeight(parse_float(value)),
            "filtered_weight" => Self::FilteredWeight(parse_float(value)),
            "filtered_flow" => Self::FilteredFlow(parse_float(value)),
            _ => return None,
        };
        Some(update)
    }

    /// The synchronised setting this update confirms, if any.
    pub const fn confirms(&self) -> Option<RemoteSetting> {
        match self {
            Self::ProfileData(_) => Some(RemoteSetting::Profile),
            Self::BrewSetpoint(_) => Some(RemoteSetting::BrewTemperature),
            Self::BrewMode(_) => Some(RemoteSetting::BrewMode),
            Self::SteamBoost(_) => Some(RemoteSetting::SteamBoost),
            Self::ProfilingMode(_) => Some(RemoteSetting::ProfilingMode),
            Self::ProfilingSource(_) => Some(RemoteSetting::ProfilingSource),
            Self::ProfilingTarget(_) => Some(RemoteSetting::ProfilingTarget),
            Self::FlatValue(_) => Some(RemoteSetting::FlatValue),
            _ => None,
        }
    }
}

/// Everything known about the espresso machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineState {
    pub boiler_temp: f32,
    pub hx_temp: f32,
    pub pressure: f32,
    pub weight: f32,
    pub flow_rate: f32,
    pub heater: bool,
    pub pump: bool,
    pub lever_lifted: bool,
    pub brew_mode: BrewMode,
    /// Brew setpoint in tenths of a degree (slider units).
    pub setpoint_tenths: f32,
    pub steam_boost: bool,
    pub profiling_mode: ProfilingMode,
    pub profiling_source: ProfilingSource,
    pub profiling_target: ProfilingTarget,
    pub flat_value: f32,
    pub state: String<STATE_CAPACITY>,
    pub mqtt: MqttSettings,
    pub raw_weight: f32,
    pub filtered_weight: f32,
    pub filtered_flow: f32,
    /// When the last debug trace value arrived.
    pub last_debug_ms: Option<u64>,
}

impl MachineState {
    /// Fold one update in.  `ProfileData` is handled by the caller.
    pub fn apply(&mut self, update: &Update<'_>, now_ms: u64) {
        match *update {
            Update::BoilerTemp(v) => self.boiler_temp = v,
            Update::HxTemp(v) => self.hx_temp = v,
            Update::Pressure(v) => self.pressure = v,
            Update::Heater(v) => self.heater = v,
            Update::Pump(v) => self.pump = v,
            Update::BrewMode(v) => self.brew_mode = v,
            Update::Lever(v) => self.lever_lifted = v,
            Update::BrewSetpoint(v) => self.setpoint_tenths = v * 10.0,
            Update::Weight(v) => self.weight = v,
            Update::FlowRate(v) => self.flow_rate = v,
            Update::SteamBoost(v) => self.steam_boost = v,
            Update::ProfilingMode(v) => self.profiling_mode = v,
            Update::ProfilingSource(v) => self.profiling_source = v,
            Update::ProfilingTarget(v) => self.profiling_target = v,
            Update::FlatValue(v) => self.flat_value = v,
            Update::MqttServer(v) => self.mqtt.server = bounded(v),
            Update::MqttPort(v) => self.mqtt.port = bounded(v),
            Update::MqttUser(v) => self.mqtt.user = bounded(v),
            Update::MqttPassword(v) => self.mqtt.password = bounded(v),
            Update::State(v) => self.state = bounded(v),
            Update::RawWeight(v) => {
                self.raw_weight = v;
                self.last_debug_ms = Some(now_ms);
            }
            Update::FilteredWeight(v) => {
                self.filtered_weight = v;
                self.weight = v;
                self.last_debug_ms = Some(now_ms);
            }
            Update::FilteredFlow(v) => {
                self.filtered_flow = v;
                self.flow_rate = v;
                self.last_debug_ms = Some(now_ms);
            }
            Update::ProfileData(_) => {}
        }
    }

    /// Brew setpoint in °C.
    pub fn setpoint_celsius(&self) -> f32 {
        self.setpoint_tenths / 10.0
    }
}
