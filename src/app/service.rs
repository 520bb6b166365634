//! Application service: the hexagonal core.
//!
//! [`HmiService`] owns every piece of node state: the link session, the
//! settings checklist, the profile table, the mirrored machine state, the
//! display cache, the shot tracker and the workflows.  One call to
//! [`tick`](HmiService::tick) runs a full scheduler cycle; all I/O flows
//! through port traits passed in per call.
//!
//! ```text
//!  RadioPort ───▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          HmiService           │
//!  ScreenPort ◀──▶│ link · sync · profiles · shot │
//!                 │ display · workflows · editor  │
//!  StoragePort ◀──└──────────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::HmiConfig;
use crate::display::layout::{
    self, HIGHLIGHT_COLOR, Page, Release, main_page, profiling_page, settings_page, system_page,
};
use crate::display::{
    self as screen_io, Bootstrap, DisplayCache, DisplayUpdate, DisplayView, apply_all,
};
use crate::error::ProfileError;
use crate::link::frame::tokens;
use crate::link::{Inbound, LinkLayer};
use crate::profile::text::parse_grid;
use crate::profile::{Profile, ProfileMode, ProfileStore, json};
use crate::settings_sync::{REQUEST_TOPIC, SettingsSync};
use crate::shot::{ShotChart, ShotPhase, ShotTracker};
use crate::workflow::{CalibrationStep, Effect, Workflows};

use super::commands::{AppCommand, CommandReply};
use super::editor::{self, PendingSetting, SettingsEditor};
use super::events::AppEvent;
use super::machine::{
    BrewMode, MachineState, MqttSettings, ProfilingMode, ProfilingSource, ProfilingTarget, Update,
};
use super::ports::{ConfigPort, EventSink, RadioPort, ScreenPort, StoragePort};

/// Config changes are persisted once they have been left alone this long.
const CONFIG_SAVE_DELAY_MS: u64 = 5_000;

/// Local input drained from the dial since the last tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DialInput {
    pub ticks: i32,
    pub button: bool,
}

// ───────────────────────────────────────────────────────────────
// HmiService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct HmiService {
    config: HmiConfig,
    link: LinkLayer,
    sync: SettingsSync,
    profiles: ProfileStore,
    machine: MachineState,
    display: DisplayCache,
    shot: ShotTracker,
    chart: ShotChart,
    workflows: Workflows,
    editor: SettingsEditor,
    page: Page,
    /// Broker settings waiting for a paired controller.
    mqtt_pending: Option<MqttSettings>,
    sync_reported: bool,
    /// Config replaced at runtime and not yet persisted.
    config_dirty_since_ms: Option<u64>,
}

impl HmiService {
    /// Construct the service and restore the profile table.
    ///
    /// Does **not** touch the screen; call [`start`](Self::start) next.
    pub fn new(config: HmiConfig, storage: &mut impl StoragePort) -> Self {
        let profiles = ProfileStore::load(storage, config.profile_settle_ms);
        Self {
            link: LinkLayer::new(&config),
            sync: SettingsSync::new(config.settings_request_interval_ms),
            profiles,
            machine: MachineState::default(),
            display: DisplayCache::new(&config),
            shot: ShotTracker::new(&config),
            chart: ShotChart::new(&config),
            workflows: Workflows::new(&config),
            editor: SettingsEditor::new(config.publish_idle_ms),
            page: Page::Main,
            mqtt_pending: None,
            sync_reported: false,
            config_dirty_since_ms: None,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Read back the screen-held UI state and align the profile editor.
    ///
    /// A bootstrap that runs out of attempts is reported and the defaults
    /// are used for whatever could not be read.
    pub fn start(
        &mut self,
        screen: &mut impl ScreenPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) {
        let mut bootstrap = Bootstrap::new(self.config.bootstrap_max_attempts);
        if let Err(e) = bootstrap.run(screen, delay, self.config.bootstrap_retry_ms) {
            warn!("DISPLAY: {e}, continuing with defaults");
            sink.emit(&AppEvent::BootstrapFailed(e));
        }
        let snap = bootstrap.snapshot();

        self.editor.set_layout(
            snap.slider_min,
            snap.slider_max,
            snap.slider_value,
            snap.grid_height,
        );
        self.editor
            .cursor
            .sync(snap.row, snap.column, snap.selection);
        self.chart.set_size(snap.chart_width, snap.chart_height);
        if let Some(flat) = snap.flat_value() {
            self.machine.flat_value = flat;
        }
        if let Some(page) = screen.current_page().ok().and_then(Page::from_id) {
            self.page = page;
        }

        let active = self.profiles.active();
        let shown_matches = snap.profile_name == active.name()
            && snap.stepped == active.is_stepped()
            && parse_grid(&snap.profile_grid).as_slice() == active.steps();
        if !shown_matches {
            debug!("PROFILE: screen shows a different profile, refreshing");
            apply_all(screen, &editor::profile_ui(active));
        }

        let slot = self.profiles.active_index();
        info!("HmiService started, active profile slot {slot}");
        sink.emit(&AppEvent::Started {
            active_profile: slot,
        });
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one scheduler cycle.
    ///
    /// Order: inbound frames, persistence and timeouts, liveness, page
    /// changes, pairing and settings requests, local input, outbound
    /// publishes, touch releases, shot timing, then screen writes.
    pub fn tick(
        &mut self,
        now_ms: u64,
        input: DialInput,
        radio: &mut impl RadioPort,
        screen: &mut impl ScreenPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        // 1. Inbound frames, in reception order
        while let Some(frame) = radio.receive() {
            match self.link.handle_frame(radio, &frame, now_ms) {
                Inbound::Ignored => {}
                Inbound::Paired { peer, channel } => {
                    self.sync.reset();
                    self.sync_reported = false;
                    sink.emit(&AppEvent::Paired { peer, channel });
                    self.send_pending_mqtt(radio);
                }
                Inbound::Payload(text) => {
                    for token in tokens(text) {
                        match token {
                            Ok((topic, value)) => self.handle_token(
                                topic, value, now_ms, radio, screen, storage, sink,
                            ),
                            Err(e) => debug!("LINK: {e}, token skipped"),
                        }
                    }
                }
            }
        }

        // 2. Persistence and timeouts
        self.profiles.poll_settle(storage, now_ms);
        if !self.chart.is_sized() {
            self.load_chart_size(screen);
        }
        let effects = self.workflows.poll(now_ms);
        self.run_effects(&effects, radio, screen);

        // 3. Liveness
        if self.link.check_liveness(radio, now_ms).is_err() {
            self.sync.reset();
            self.sync_reported = false;
            sink.emit(&AppEvent::PeerLost);
        }

        // 4. Page changes
        if let Some(page) = screen.current_page().ok().and_then(Page::from_id) {
            if page != self.page {
                self.page = page;
                self.on_page_entered(page, radio, screen);
            }
        }

        // 5. Pairing and settings requests
        self.link.poll_pairing(radio, now_ms);
        if let Some(setting) = self.sync.poll(now_ms, self.link.is_paired()) {
            self.link
                .publish(radio, REQUEST_TOPIC, setting.request_name(), true);
            sink.emit(&AppEvent::SettingRequested(setting));
        }
        if !self.sync_reported && self.sync.all_received() {
            self.sync_reported = true;
            info!("SYNC: all settings confirmed");
            sink.emit(&AppEvent::SettingsSynchronised);
        }

        // 6. Local input
        if input.ticks != 0 {
            let updates = self.editor.on_dial(
                input.ticks,
                self.page,
                &mut self.machine,
                &mut self.profiles,
                &mut self.workflows.calibration,
                storage,
                now_ms,
            );
            apply_all(screen, &updates);
        }
        if input.button {
            self.on_button(screen);
        }

        // 7. Settled edits
        if let Some(setting) = self.editor.pending.take_due(now_ms) {
            self.publish_setting(setting, radio, storage, sink);
        }

        // 8. Touch releases
        while let Some(touch) = screen.poll_touch() {
            if touch.pressed {
                continue;
            }
            let component = layout::Component::new(touch.page, touch.component);
            if let Some(release) = Release::from_component(component) {
                self.on_release(release, now_ms, radio, screen, storage, sink);
            }
        }

        // 9. Shot timing
        let before = self.shot.phase();
        let shot_secs = self
            .shot
            .update(now_ms, self.machine.pump, self.machine.lever_lifted);
        match (before, self.shot.phase()) {
            (ShotPhase::Arming, ShotPhase::Active) => sink.emit(&AppEvent::ShotStarted),
            (ShotPhase::Active, ShotPhase::Retained) => sink.emit(&AppEvent::ShotFinished {
                seconds: self.shot.session().completed_secs,
            }),
            _ => {}
        }

        // 10. Screen writes
        let view = DisplayView {
            shot_secs,
            hx_temp: self.machine.hx_temp,
            boiler_temp: self.machine.boiler_temp,
            setpoint_tenths: self.machine.setpoint_tenths,
            weight: self.machine.weight,
            machine_state: &self.machine.state,
        };
        let updates = self.display.refresh(&view);
        apply_all(screen, &updates);

        let window = self.shot.chart_window(now_ms);
        let updates = self
            .chart
            .update(now_ms, window, &self.machine, self.profiles.active());
        apply_all(screen, &updates);

        if let Some(update) = self.workflows.status.take_update() {
            update.apply(screen);
            sink.emit(&AppEvent::Status(self.workflows.status.text().into()));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (serial console, CRUD front end, portal).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        radio: &mut impl RadioPort,
        screen: &mut impl ScreenPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> CommandReply {
        match cmd {
            AppCommand::ImportProfile(doc) => {
                match self.import_profile(&doc, now_ms, screen, storage, sink) {
                    Ok(_) => CommandReply::Done,
                    Err(_) => CommandReply::Rejected("import failed"),
                }
            }
            AppCommand::SaveProfile(doc) => match self.save_profile(&doc, screen, storage) {
                Ok(slot) => {
                    sink.emit(&AppEvent::ProfileStored { slot });
                    CommandReply::Done
                }
                Err(e) => {
                    warn!("PROFILE: save rejected: {e}");
                    sink.emit(&AppEvent::ProfileRejected(e));
                    CommandReply::Rejected("invalid profile or slot")
                }
            },
            AppCommand::DeleteProfile(slot) => match self.profiles.delete(storage, slot) {
                Ok(active_changed) => {
                    sink.emit(&AppEvent::ProfileDeleted { slot });
                    if active_changed {
                        apply_all(screen, &editor::profile_ui(self.profiles.active()));
                        sink.emit(&AppEvent::ActiveProfileChanged {
                            slot: self.profiles.active_index(),
                        });
                    }
                    CommandReply::Done
                }
                Err(e) => {
                    warn!("PROFILE: delete of slot {slot} failed: {e}");
                    CommandReply::Rejected("invalid slot")
                }
            },
            AppCommand::SetActiveProfile(slot) => {
                if let Err(e) = self.profiles.flush_dirty(storage) {
                    warn!("PROFILE: {e}");
                }
                match self.profiles.set_active_now(storage, slot) {
                    Ok(()) => {
                        apply_all(screen, &editor::profile_ui(self.profiles.active()));
                        sink.emit(&AppEvent::ActiveProfileChanged { slot });
                        CommandReply::Done
                    }
                    Err(e) => {
                        warn!("PROFILE: cannot activate slot {slot}: {e}");
                        CommandReply::Rejected("empty or invalid slot")
                    }
                }
            }
            AppCommand::ListProfiles => CommandReply::Document(json::export_list(
                self.profiles.active_index(),
                self.profiles.slots(),
            )),
            AppCommand::RequestSettings => {
                self.link.publish(radio, REQUEST_TOPIC, "settings", true);
                CommandReply::Done
            }
            AppCommand::ScreenInstruction(instruction) => {
                DisplayUpdate::Command(instruction).apply(screen);
                CommandReply::Done
            }
            AppCommand::SetMqttSettings(settings) => {
                self.mqtt_pending = Some(settings);
                self.send_pending_mqtt(radio);
                CommandReply::Done
            }
            AppCommand::SetLinkEnabled(enabled) => {
                self.link.set_enabled(enabled);
                CommandReply::Done
            }
            AppCommand::UpdateConfig(config) => {
                self.config = *config;
                if self.config_dirty_since_ms.is_none() {
                    self.config_dirty_since_ms = Some(now_ms);
                }
                info!("Configuration updated, applies after restart");
                CommandReply::Done
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &HmiConfig {
        &self.config
    }

    pub fn link(&self) -> &LinkLayer {
        &self.link
    }

    pub fn settings_sync(&self) -> &SettingsSync {
        &self.sync
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn machine(&self) -> &MachineState {
        &self.machine
    }

    pub fn shot(&self) -> &ShotTracker {
        &self.shot
    }

    pub fn workflows(&self) -> &Workflows {
        &self.workflows
    }

    pub fn editor(&self) -> &SettingsEditor {
        &self.editor
    }

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn mqtt_pending(&self) -> bool {
        self.mqtt_pending.is_some()
    }

    // ── Config persistence ────────────────────────────────────

    /// Persist a runtime config change once it has settled.
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, store: &impl ConfigPort, now_ms: u64) -> bool {
        let Some(since) = self.config_dirty_since_ms else {
            return false;
        };
        if now_ms.saturating_sub(since) < CONFIG_SAVE_DELAY_MS {
            return false;
        }
        match store.save(&self.config) {
            Ok(()) => {
                self.config_dirty_since_ms = None;
                info!("Config auto-saved to NVS");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {e}");
                false
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty_since_ms.is_some()
    }

    // ── Inbound topics ────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn handle_token(
        &mut self,
        topic: &str,
        value: &str,
        now_ms: u64,
        radio: &mut impl RadioPort,
        screen: &mut impl ScreenPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        let Some(update) = Update::parse(topic, value) else {
            debug!("LINK: ignoring {topic}={value}");
            return;
        };
        if let Some(setting) = update.confirms() {
            self.sync.mark_received(setting);
        }
        self.machine.apply(&update, now_ms);

        let updates = match update {
            Update::ProfileData(doc) => {
                // Failures are reported on the status line.
                let _ = self.import_profile(doc, now_ms, screen, storage, sink);
                return;
            }
            Update::State(state) => {
                let effects = self.workflows.on_machine_state(state, now_ms);
                self.run_effects(&effects, radio, screen);
                return;
            }
            Update::BrewMode(mode) => {
                let coffee = i32::from(mode == BrewMode::Coffee);
                vec![
                    DisplayUpdate::Number(settings_page::COFFEE_MODE.val(), coffee),
                    DisplayUpdate::Number(settings_page::STEAM_MODE.val(), 1 - coffee),
                ]
            }
            Update::SteamBoost(on) => vec![DisplayUpdate::Number(
                settings_page::STEAM_BOOST.val(),
                i32::from(on),
            )],
            Update::BrewSetpoint(_) => {
                let tenths = self.machine.setpoint_tenths as i32;
                self.editor.set_slider_value(tenths);
                vec![
                    DisplayUpdate::Number(settings_page::BREW_TEMP_SLIDER.val(), tenths),
                    DisplayUpdate::Number(settings_page::BREW_TEMP_VALUE.val(), tenths),
                ]
            }
            Update::ProfilingMode(mode) => {
                let is = |m: ProfilingMode| i32::from(mode == m);
                vec![
                    DisplayUpdate::Number(profiling_page::MODE_MANUAL.val(), is(ProfilingMode::Manual)),
                    DisplayUpdate::Number(profiling_page::MODE_FLAT.val(), is(ProfilingMode::Flat)),
                    DisplayUpdate::Number(
                        profiling_page::MODE_PROFILE.val(),
                        is(ProfilingMode::Profile),
                    ),
                    DisplayUpdate::Command(layout::click_release(mode_button(mode))),
                ]
            }
            Update::ProfilingSource(source) => {
                let pressure = i32::from(source == ProfilingSource::Pressure);
                vec![
                    DisplayUpdate::Number(profiling_page::SOURCE_PRESSURE.val(), pressure),
                    DisplayUpdate::Number(profiling_page::SOURCE_FLOW.val(), 1 - pressure),
                ]
            }
            Update::ProfilingTarget(target) => {
                let time = i32::from(target == ProfilingTarget::Time);
                vec![
                    DisplayUpdate::Number(profiling_page::TARGET_TIME.val(), time),
                    DisplayUpdate::Number(profiling_page::TARGET_WEIGHT.val(), 1 - time),
                ]
            }
            Update::FlatValue(v) => vec![DisplayUpdate::Text(
                profiling_page::FLAT.txt(),
                editor::flat_text(v),
            )],
            _ => return,
        };
        apply_all(screen, &updates);
    }

    /// Import a profile exchange document and report the outcome.
    fn import_profile(
        &mut self,
        doc: &str,
        now_ms: u64,
        screen: &mut impl ScreenPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> Result<usize, ProfileError> {
        let result = json::import(doc)
            .and_then(|profile| self.profiles.import_or_update(storage, profile));
        match result {
            Ok(slot) => {
                let name = self.profiles.get(slot).map(|p| p.name()).unwrap_or_default();
                let msg = format!("Import Successful:\r\n{name}");
                if slot == self.profiles.active_index() {
                    apply_all(screen, &editor::profile_ui(self.profiles.active()));
                }
                self.workflows.status.flash(&msg, now_ms);
                sink.emit(&AppEvent::ProfileStored { slot });
            }
            Err(e) => {
                warn!("PROFILE: import failed: {e}");
                let msg = match e {
                    ProfileError::ImportParse(_) => "Import Failed:\r\nInvalid JSON",
                    ProfileError::StoreFull => "Import Failed:\r\nProfile Memory Full",
                    _ => "Import Failed:\r\nStorage error",
                };
                self.workflows.status.flash(msg, now_ms);
                sink.emit(&AppEvent::ProfileRejected(e));
            }
        }
        result
    }

    fn save_profile(
        &mut self,
        doc: &str,
        screen: &mut impl ScreenPort,
        storage: &mut impl StoragePort,
    ) -> Result<usize, ProfileError> {
        let (slot, profile) = json::parse_slot_document(doc)?;
        self.profiles.put(storage, slot, profile)?;
        if slot == self.profiles.active_index() {
            apply_all(screen, &editor::profile_ui(self.profiles.active()));
        }
        Ok(slot)
    }

    // ── Outbound ──────────────────────────────────────────────

    /// Publish broker settings once a controller is paired.
    fn send_pending_mqtt(&mut self, radio: &mut impl RadioPort) {
        if !self.link.is_paired() {
            if self.mqtt_pending.is_some() {
                debug!("LINK: broker settings wait for pairing");
            }
            return;
        }
        let Some(m) = self.mqtt_pending.take() else {
            return;
        };
        info!("LINK: sending broker settings");
        self.link.publish(radio, "mqtt_server", &m.server, false);
        self.link.publish(radio, "mqtt_port", &m.port, false);
        self.link.publish(radio, "mqtt_user", &m.user, false);
        self.link.publish(radio, "mqtt_password", &m.password, true);
    }

    fn publish_setting(
        &mut self,
        setting: PendingSetting,
        radio: &mut impl RadioPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        if setting == PendingSetting::Profile {
            if let Err(e) = self.profiles.flush_dirty(storage) {
                warn!("PROFILE: {e}");
            }
        }
        let (topic, value) = editor::publication(
            setting,
            self.editor.slider_value(),
            &self.machine,
            self.profiles.active(),
        );
        debug!("LINK: publishing {topic}");
        self.link.publish(radio, topic, &value, true);
        sink.emit(&AppEvent::SettingPublished { topic });
    }

    fn run_effects(
        &mut self,
        effects: &[Effect],
        radio: &mut impl RadioPort,
        screen: &mut impl ScreenPort,
    ) {
        for effect in effects {
            match effect {
                Effect::Publish { topic, value } => {
                    self.link.publish(radio, topic, value, true);
                }
                Effect::ReferenceWeightVisible(visible) => {
                    for c in [
                        system_page::REFERENCE_WEIGHT,
                        system_page::REFERENCE_WEIGHT_UNIT,
                    ] {
                        DisplayUpdate::Command(layout::visibility(c, *visible)).apply(screen);
                    }
                }
                Effect::LoadReferenceWeight => self.load_reference_weight(screen),
            }
        }
    }

    // ── Screen ────────────────────────────────────────────────

    fn load_chart_size(&mut self, screen: &mut impl ScreenPort) {
        let width = screen_io::read_number(screen, main_page::WAVEFORM.attr("w"));
        let height = screen_io::read_number(screen, main_page::WAVEFORM.attr("h"));
        if let (Some(w), Some(h)) = (width, height) {
            if w > 0 && h > 0 {
                debug!("DISPLAY: chart is {w}x{h}");
                self.chart.set_size(w, h);
            }
        }
    }

    fn load_reference_weight(&mut self, screen: &mut impl ScreenPort) {
        if let Some(tenths) = screen_io::read_number(screen, system_page::REFERENCE_WEIGHT.val()) {
            self.workflows
                .calibration
                .set_reference_weight(tenths as f32 / 10.0);
        }
    }

    fn on_page_entered(
        &mut self,
        page: Page,
        radio: &mut impl RadioPort,
        screen: &mut impl ScreenPort,
    ) {
        debug!("DISPLAY: page {page:?}");
        match page {
            Page::Settings => {
                for label in [
                    settings_page::BREW_TEMP_LABEL,
                    settings_page::BREW_MODE_LABEL,
                    settings_page::STEAM_BOOST_LABEL,
                ] {
                    DisplayUpdate::Number(label.attr("font"), 6).apply(screen);
                }
            }
            Page::System => {
                let effects = self.workflows.on_system_page();
                self.run_effects(&effects, radio, screen);
                let tenths = (self.workflows.calibration.reference_weight() * 10.0) as i32;
                DisplayUpdate::Number(system_page::REFERENCE_WEIGHT.val(), tenths).apply(screen);
            }
            Page::Main | Page::Profiling => {}
        }
    }

    fn on_button(&mut self, screen: &mut impl ScreenPort) {
        match self.page {
            Page::Profiling => {
                let step_count = self.profiles.active().steps().len();
                let updates = self.editor.on_button(self.machine.profiling_mode, step_count, || {
                    screen_io::read_number(screen, profiling_page::VALUES.attr("val_y"))
                        .unwrap_or(0)
                });
                apply_all(screen, &updates);
            }
            Page::System => {
                if self.workflows.calibration.step() == CalibrationStep::WaitingWeigh {
                    DisplayUpdate::Number(
                        system_page::REFERENCE_WEIGHT.attr("bco"),
                        HIGHLIGHT_COLOR,
                    )
                    .apply(screen);
                    self.load_reference_weight(screen);
                }
            }
            Page::Main | Page::Settings => {}
        }
    }

    // ── Touch releases ────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn on_release(
        &mut self,
        release: Release,
        now_ms: u64,
        radio: &mut impl RadioPort,
        screen: &mut impl ScreenPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        debug!("DISPLAY: release {release:?}");
        match release {
            Release::BrewTempSlider => {
                if let Some(v) = screen_io::read_number(screen, settings_page::BREW_TEMP_SLIDER.val())
                {
                    self.editor.set_slider_value(v);
                    self.publish_setting(PendingSetting::BrewTemperature, radio, storage, sink);
                }
            }
            Release::BrewMode => {
                if let Some(v) = screen_io::read_number(screen, settings_page::COFFEE_MODE.val()) {
                    let mode = if v == 0 { BrewMode::Steam } else { BrewMode::Coffee };
                    self.link.publish(radio, "brewmode", mode.as_str(), true);
                }
            }
            Release::SteamBoost => {
                if let Some(v) = screen_io::read_number(screen, settings_page::STEAM_BOOST.val()) {
                    let on = if v == 1 { "true" } else { "false" };
                    self.link.publish(radio, "enablesteamboost", on, true);
                }
            }
            Release::ProfilingManual => self.select_mode(ProfilingMode::Manual, radio),
            Release::ProfilingFlat => {
                if let Some(v) = screen_io::read_text(screen, profiling_page::FLAT.txt())
                    .and_then(|t| t.trim().parse().ok())
                {
                    self.machine.flat_value = v;
                }
                self.select_mode(ProfilingMode::Flat, radio);
            }
            Release::ProfilingProfile => {
                if let Some(grid) = screen_io::read_text(screen, profiling_page::VALUES.txt()) {
                    self.replace_steps(&grid);
                }
                self.select_mode(ProfilingMode::Profile, radio);
                self.editor.pending.mark(PendingSetting::Profile, now_ms);
            }
            Release::ProfilingSource => {
                if let Some(v) = screen_io::read_number(screen, profiling_page::SOURCE_PRESSURE.val())
                {
                    let source = if v == 1 {
                        ProfilingSource::Pressure
                    } else {
                        ProfilingSource::Flow
                    };
                    self.machine.profiling_source = source;
                    self.link
                        .publish(radio, "profiling_source", source.as_str(), true);
                }
            }
            Release::ProfilingTarget => {
                if let Some(v) = screen_io::read_number(screen, profiling_page::TARGET_TIME.val()) {
                    let target = if v == 1 {
                        ProfilingTarget::Time
                    } else {
                        ProfilingTarget::Weight
                    };
                    self.machine.profiling_target = target;
                    self.link
                        .publish(radio, "profiling_target", target.as_str(), true);
                }
            }
            Release::ProfileValues => {
                let row = screen_io::read_number(screen, profiling_page::ROW.val());
                let column = screen_io::read_number(screen, profiling_page::COLUMN.val());
                let selection = screen_io::read_number(screen, profiling_page::SELECTION.val());
                let grid = screen_io::read_text(screen, profiling_page::VALUES.txt());
                match (row, column, selection, grid) {
                    (Some(row), Some(column), Some(selection), Some(grid)) => {
                        self.editor.cursor.sync(row, column, selection);
                        if self.replace_steps(&grid) {
                            self.editor.pending.mark(PendingSetting::Profile, now_ms);
                        }
                    }
                    _ => warn!("DISPLAY: profile grid not readable, edit ignored"),
                }
            }
            Release::FlatValue => {
                let text = screen_io::read_text(screen, profiling_page::FLAT.txt());
                let updates = self.editor.cursor.reset();
                apply_all(screen, &updates);
                if let Some(v) = text.and_then(|t| t.trim().parse().ok()) {
                    self.machine.flat_value = v;
                    self.editor.pending.mark(PendingSetting::FlatValue, now_ms);
                }
            }
            Release::ProfileName => {
                let updates = self.editor.cursor.select_name();
                apply_all(screen, &updates);
                if let Some(name) = screen_io::read_text(screen, profiling_page::PROFILE_NAME.txt())
                {
                    if !name.is_empty() && name != self.profiles.active().name() {
                        self.profiles.active_mut().set_name(&name);
                        self.profiles.mark_dirty();
                    }
                }
            }
            Release::ProfileStepped => {
                if let Some(v) = screen_io::read_number(screen, profiling_page::STEPPED.val()) {
                    let mode = if v == 1 {
                        ProfileMode::Stepped
                    } else {
                        ProfileMode::Ramped
                    };
                    if mode != self.profiles.active().mode {
                        self.profiles.active_mut().mode = mode;
                        self.profiles.mark_dirty();
                        self.editor.pending.take();
                        self.publish_setting(PendingSetting::Profile, radio, storage, sink);
                    }
                }
            }
            Release::Tare => self.link.publish(radio, "tare_scale", "true", true),
            Release::SystemSettings => {
                if !self.workflows.is_busy() {
                    sink.emit(&AppEvent::ConfigPortalRequested);
                }
            }
            Release::Calibrate => {
                let effects = self
                    .workflows
                    .request_calibration(now_ms, self.link.is_paired());
                self.run_effects(&effects, radio, screen);
            }
            Release::Cleaning => {
                let effects = self
                    .workflows
                    .request_cleaning(now_ms, self.link.is_paired());
                self.run_effects(&effects, radio, screen);
            }
        }
    }

    fn select_mode(&mut self, mode: ProfilingMode, radio: &mut impl RadioPort) {
        self.machine.profiling_mode = mode;
        self.link.publish(radio, "profiling_mode", mode.as_str(), true);
    }

    /// Replace the active profile's steps with the typed grid.
    /// Returns `true` if anything changed.
    fn replace_steps(&mut self, grid: &str) -> bool {
        let steps = parse_grid(grid);
        if steps.is_empty() || steps.as_slice() == self.profiles.active().steps() {
            return false;
        }
        let profile = self.profiles.active_mut();
        *profile = Profile::new(&profile.name().to_owned(), profile.mode, &steps);
        self.profiles.mark_dirty();
        debug!("PROFILE: grid edited, {} steps", steps.len());
        true
    }
}

/// Screen button that switches the profiling page into `mode`.
fn mode_button(mode: ProfilingMode) -> &'static str {
    match mode {
        ProfilingMode::Manual => "bt0",
        ProfilingMode::Flat => "bt1",
        ProfilingMode::Profile => "bt2",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::nvs::NvsAdapter;

    #[test]
    fn mode_buttons_follow_the_page_order() {
        assert_eq!(mode_button(ProfilingMode::Manual), "bt0");
        assert_eq!(mode_button(ProfilingMode::Flat), "bt1");
        assert_eq!(mode_button(ProfilingMode::Profile), "bt2");
    }

    #[test]
    fn fresh_service_is_idle_and_clean() {
        let mut nvs = NvsAdapter::default();
        let app = HmiService::new(HmiConfig::default(), &mut nvs);
        assert_eq!(app.page(), Page::Main);
        assert_eq!(app.shot().phase(), ShotPhase::Idle);
        assert!(!app.link().is_paired());
        assert!(!app.mqtt_pending());
        assert!(!app.is_config_dirty());
        assert_eq!(app.profiles().active().name(), "Standard Profile");
    }

    #[test]
    fn config_saves_only_after_it_settles() {
        let mut nvs = NvsAdapter::default();
        let mut app = HmiService::new(HmiConfig::default(), &mut nvs);
        app.config_dirty_since_ms = Some(100);
        assert!(!app.auto_save_if_needed(&nvs, 100 + CONFIG_SAVE_DELAY_MS - 1));
        assert!(app.auto_save_if_needed(&nvs, 100 + CONFIG_SAVE_DELAY_MS));
        assert!(!app.is_config_dirty());
        assert_eq!(nvs.load().unwrap(), HmiConfig::default());
    }
}
