//! Screen page layout: component ids, attribute addressing and gauge maps.
//!
//! Attributes are addressed across pages as `p[page].b[id].attr`, so a
//! component can be written while another page is showing.

use core::fmt;

/// A screen component on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Component {
    pub page: u8,
    pub id: u8,
}

impl Component {
    pub const fn new(page: u8, id: u8) -> Self {
        Self { page, id }
    }

    pub const fn attr(self, name: &'static str) -> Attr {
        Attr {
            component: self,
            name,
        }
    }

    pub const fn val(self) -> Attr {
        self.attr("val")
    }

    pub const fn txt(self) -> Attr {
        self.attr("txt")
    }
}

/// One attribute of a component (`val`, `txt`, `bco`, `pic`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attr {
    pub component: Component,
    pub name: &'static str,
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p[{}].b[{}].{}",
            self.component.page, self.component.id, self.name
        )
    }
}

/// The four screen pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Page {
    Main = 0,
    Settings = 1,
    Profiling = 2,
    System = 3,
}

impl Page {
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Main),
            1 => Some(Self::Settings),
            2 => Some(Self::Profiling),
            3 => Some(Self::System),
            _ => None,
        }
    }
}

/// Background colour of a highlighted entry field.
pub const HIGHLIGHT_COLOR: i32 = 65519;

/// Background colour written to clear a highlight.
pub const PLAIN_COLOR: i32 = 65536;

/// Selection value meaning "the profile name field is selected".
pub const NAME_SELECTION: i32 = 1024;

/// Brewing page.
pub mod main_page {
    use super::Component;

    pub const BREW_PIC: Component = Component::new(0, 1);
    pub const BOILER_PIC: Component = Component::new(0, 2);
    pub const ARROW_PIC: Component = Component::new(0, 3);
    pub const BOILER_TEMP: Component = Component::new(0, 5);
    pub const HX_TEMP: Component = Component::new(0, 6);
    pub const WAVEFORM: Component = Component::new(0, 12);
    pub const SHOT_TIME: Component = Component::new(0, 13);
    pub const MACHINE_STATE: Component = Component::new(0, 14);
    pub const WEIGHT: Component = Component::new(0, 15);
    pub const TARE: Component = Component::new(0, 16);
    pub const HIGHLIGHT: Component = Component::new(0, 45);
}

/// Brew temperature, brew mode and steam boost.
pub mod settings_page {
    use super::Component;

    pub const BREW_PIC: Component = Component::new(1, 1);
    pub const BOILER_PIC: Component = Component::new(1, 2);
    pub const ARROW_PIC: Component = Component::new(1, 3);
    pub const BOILER_TEMP: Component = Component::new(1, 6);
    pub const HX_TEMP: Component = Component::new(1, 9);
    pub const BREW_TEMP_LABEL: Component = Component::new(1, 20);
    pub const BREW_MODE_LABEL: Component = Component::new(1, 21);
    pub const STEAM_BOOST_LABEL: Component = Component::new(1, 22);
    pub const BREW_TEMP_SLIDER: Component = Component::new(1, 23);
    pub const BREW_TEMP_VALUE: Component = Component::new(1, 24);
    pub const COFFEE_MODE: Component = Component::new(1, 26);
    pub const STEAM_MODE: Component = Component::new(1, 27);
    pub const STEAM_BOOST: Component = Component::new(1, 28);
}

/// Flat value and profile editor.
pub mod profiling_page {
    use super::Component;

    pub const BOILER_TEMP: Component = Component::new(2, 6);
    pub const HX_TEMP: Component = Component::new(2, 9);
    pub const ROW: Component = Component::new(2, 23);
    pub const COLUMN: Component = Component::new(2, 24);
    pub const BREW_PIC: Component = Component::new(2, 29);
    pub const BOILER_PIC: Component = Component::new(2, 30);
    pub const ARROW_PIC: Component = Component::new(2, 31);
    pub const STEPPED: Component = Component::new(2, 33);
    pub const VALUES: Component = Component::new(2, 34);
    pub const MODE_MANUAL: Component = Component::new(2, 35);
    pub const MODE_FLAT: Component = Component::new(2, 36);
    pub const MODE_PROFILE: Component = Component::new(2, 37);
    pub const SOURCE_PRESSURE: Component = Component::new(2, 38);
    pub const SOURCE_FLOW: Component = Component::new(2, 39);
    pub const TARGET_TIME: Component = Component::new(2, 40);
    pub const TARGET_WEIGHT: Component = Component::new(2, 41);
    pub const FLAT: Component = Component::new(2, 42);
    pub const SELECTION: Component = Component::new(2, 43);
    pub const PROFILE_NAME: Component = Component::new(2, 47);
}

/// Status messages, calibration and cleaning.
pub mod system_page {
    use super::Component;

    pub const BREW_PIC: Component = Component::new(3, 1);
    pub const BOILER_PIC: Component = Component::new(3, 2);
    pub const ARROW_PIC: Component = Component::new(3, 3);
    pub const BOILER_TEMP: Component = Component::new(3, 6);
    pub const HX_TEMP: Component = Component::new(3, 9);
    pub const MESSAGE: Component = Component::new(3, 20);
    pub const SYSTEM_SETTINGS: Component = Component::new(3, 21);
    pub const CLEANING: Component = Component::new(3, 22);
    pub const CALIBRATE: Component = Component::new(3, 23);
    pub const REFERENCE_WEIGHT: Component = Component::new(3, 24);
    pub const REFERENCE_WEIGHT_UNIT: Component = Component::new(3, 25);
}

/// Readouts mirrored on every page.
pub const HX_TEMP_TEXT: [Component; 4] = [
    main_page::HX_TEMP,
    settings_page::HX_TEMP,
    profiling_page::HX_TEMP,
    system_page::HX_TEMP,
];
pub const BOILER_TEMP_TEXT: [Component; 4] = [
    main_page::BOILER_TEMP,
    settings_page::BOILER_TEMP,
    profiling_page::BOILER_TEMP,
    system_page::BOILER_TEMP,
];
pub const BREW_GAUGE: [Component; 4] = [
    main_page::BREW_PIC,
    settings_page::BREW_PIC,
    profiling_page::BREW_PIC,
    system_page::BREW_PIC,
];
pub const BOILER_GAUGE: [Component; 4] = [
    main_page::BOILER_PIC,
    settings_page::BOILER_PIC,
    profiling_page::BOILER_PIC,
    system_page::BOILER_PIC,
];
pub const SETPOINT_ARROW: [Component; 4] = [
    main_page::ARROW_PIC,
    settings_page::ARROW_PIC,
    profiling_page::ARROW_PIC,
    system_page::ARROW_PIC,
];

// ---------------------------------------------------------------------------
// Screen instructions
// ---------------------------------------------------------------------------

/// `cle <id>,255`: wipe every channel of a waveform.
pub fn clear_waveform(waveform: Component) -> String {
    format!("cle {},255", waveform.id)
}

/// `add <id>,<channel>,<value>`: append one sample to a waveform channel.
pub fn add_sample(waveform: Component, channel: u8, value: u8) -> String {
    format!("add {},{},{}", waveform.id, channel, value)
}

/// `vis <id>,<0|1>`: show or hide a component on the current page.
pub fn visibility(component: Component, visible: bool) -> String {
    format!("vis {},{}", component.id, u8::from(visible))
}

/// `click <name>,0`: fire a component's release event.
pub fn click_release(name: &str) -> String {
    format!("click {name},0")
}

// ---------------------------------------------------------------------------
// Gauges
// ---------------------------------------------------------------------------

/// Pictures per gauge strip in the screen's picture table.
const GAUGE_PICTURES: i64 = 38;

/// Integer range map with truncating division.
fn map_long(x: i64, in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> i64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

/// Picture for the group-head gauge: 20..100 °C over pictures 0..=37.
pub fn brew_gauge_picture(hx_temp: f32) -> i32 {
    let pic = map_long(hx_temp as i64, 20, 100, 0, GAUGE_PICTURES - 1);
    pic.clamp(0, GAUGE_PICTURES - 1) as i32
}

/// Picture for the boiler gauge: 20..140 °C over pictures 38..=75.
pub fn boiler_gauge_picture(boiler_temp: f32) -> i32 {
    let pic = map_long(
        boiler_temp as i64,
        20,
        140,
        GAUGE_PICTURES,
        2 * GAUGE_PICTURES - 1,
    );
    pic.clamp(GAUGE_PICTURES, 2 * GAUGE_PICTURES - 1) as i32
}

/// Picture for the setpoint arrow, from the setpoint in tenths of a degree.
///
/// The input range is widened by one gauge step on each side so the arrow
/// sits between the gauge ticks.
pub fn setpoint_arrow_picture(setpoint_tenths: f32) -> i32 {
    let margin = (100 - 20) / (GAUGE_PICTURES - 2);
    let pic = map_long(
        (setpoint_tenths / 10.0) as i64,
        20 - margin,
        100 + margin,
        2 * GAUGE_PICTURES,
        3 * GAUGE_PICTURES,
    );
    pic.clamp(2 * GAUGE_PICTURES, 3 * GAUGE_PICTURES - 1) as i32
}

// ---------------------------------------------------------------------------
// Touch releases
// ---------------------------------------------------------------------------

/// A component release the node reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    BrewTempSlider,
    BrewMode,
    SteamBoost,
    ProfilingManual,
    ProfilingFlat,
    ProfilingProfile,
    ProfilingSource,
    ProfilingTarget,
    ProfileValues,
    FlatValue,
    ProfileName,
    ProfileStepped,
    Tare,
    SystemSettings,
    Calibrate,
    Cleaning,
}

impl Release {
    /// Map a released component to its action.
    pub fn from_component(c: Component) -> Option<Self> {
        use profiling_page as p2;
        use settings_page as p1;
        use system_page as p3;

        let release = match c {
            p1::BREW_TEMP_SLIDER => Self::BrewTempSlider,
            p1::COFFEE_MODE | p1::STEAM_MODE => Self::BrewMode,
            p1::STEAM_BOOST => Self::SteamBoost,
            p2::MODE_MANUAL => Self::ProfilingManual,
            p2::MODE_FLAT => Self::ProfilingFlat,
            p2::MODE_PROFILE => Self::ProfilingProfile,
            p2::SOURCE_PRESSURE | p2::SOURCE_FLOW => Self::ProfilingSource,
            p2::TARGET_TIME | p2::TARGET_WEIGHT => Self::ProfilingTarget,
            p2::VALUES => Self::ProfileValues,
            p2::FLAT => Self::FlatValue,
            p2::PROFILE_NAME => Self::ProfileName,
            p2::STEPPED => Self::ProfileStepped,
            main_page::TARE => Self::Tare,
            p3::SYSTEM_SETTINGS => Self::SystemSettings,
            p3::CALIBRATE => Self::Calibrate,
            p3::CLEANING => Self::Cleaning,
            _ => return None,
        };
        Some(release)
    }
}
