//! Inbound commands to the application service.
//!
//! These represent actions requested from outside the tick loop (serial
//! console, the profile CRUD front end, the configuration portal) that the
//! [`HmiService`](super::service::HmiService) interprets and acts upon.

use crate::app::machine::MqttSettings;
use crate::config::HmiConfig;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Import a profile exchange document into the store.
    ImportProfile(String),

    /// Save a profile by slot id (document carries `"id"`).
    SaveProfile(String),

    /// Clear a slot.
    DeleteProfile(usize),

    /// Make a slot active, persisting the index straight away.
    SetActiveProfile(usize),

    /// Reply with every slot as a list document.
    ListProfiles,

    /// Ask the controller to resend its settings.
    RequestSettings,

    /// Hand a raw instruction to the screen.
    ScreenInstruction(String),

    /// Broker settings entered locally; sent once paired.
    SetMqttSettings(MqttSettings),

    /// Enable or disable the radio link (offline mode).
    SetLinkEnabled(bool),

    /// Replace the stored configuration (takes effect after restart).
    UpdateConfig(Box<HmiConfig>),
}

/// What a command produced for its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    Done,
    /// A JSON document (profile list).
    Document(String),
    Rejected(&'static str),
}

impl AppCommand {
    /// Parse one serial console line.
    ///
    /// ```text
    /// import_profile=<json>   import a profile
    /// delete_profile=<slot>   clear a slot
    /// request                 ask the controller for its settings
    /// <anything else>         passed to the screen as an instruction
    /// ```
    pub fn parse_console(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return None;
        }
        if let Some(json) = line.strip_prefix("import_profile=") {
            return Some(Self::ImportProfile(json.into()));
        }
        if let Some(slot) = line.strip_prefix("delete_profile=") {
            return slot.trim().parse().ok().map(Self::DeleteProfile);
        }
        if line.starts_with("request") {
            return Some(Self::RequestSettings);
        }
        Some(Self::ScreenInstruction(line.into()))
    }
}
