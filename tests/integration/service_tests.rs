//! HmiService end to end: bootstrap, settings pull, display, shot timing,
//! local edits and config persistence.

use brewhmi::app::commands::AppCommand;
use brewhmi::app::events::AppEvent;
use brewhmi::app::machine::{MqttSettings, bounded};
use brewhmi::app::service::{DialInput, HmiService};
use brewhmi::config::HmiConfig;
use brewhmi::display::layout::{main_page, profiling_page, settings_page};
use brewhmi::error::DisplayError;
use brewhmi::settings_sync::RemoteSetting;
use brewhmi::shot::ShotPhase;

use crate::mock_hw::{
    CONTROLLER, LogSink, MockNvs, MockScreen, NoDelay, Rig, ScreenWrite, pair_response,
    sent_payloads,
};

// ── Bootstrap ─────────────────────────────────────────────────

#[test]
fn bootstrap_adopts_the_screen_layout() {
    let mut nvs = MockNvs::new();
    let mut screen = MockScreen::new();
    screen
        .numbers
        .insert(settings_page::BREW_TEMP_SLIDER.val(), 945);
    let mut sink = LogSink::new();
    let mut delay = NoDelay::default();
    let mut app = HmiService::new(HmiConfig::default(), &mut nvs);

    app.start(&mut screen, &mut delay, &mut sink);

    assert_eq!(app.editor().slider_value(), 945);
    assert_eq!(app.editor().grid_height(), 200);
    assert_eq!(app.machine().flat_value, 2.0);
    assert_eq!(delay.total_ms, 0, "a ready screen needs no retries");
    assert!(!sink.events.iter().any(|e| matches!(e, AppEvent::BootstrapFailed(_))));
}

#[test]
fn silent_screen_falls_back_to_defaults() {
    let mut nvs = MockNvs::new();
    let mut screen = MockScreen::silent();
    let mut sink = LogSink::new();
    let mut delay = NoDelay::default();
    let mut app = HmiService::new(HmiConfig::default(), &mut nvs);

    app.start(&mut screen, &mut delay, &mut sink);

    assert!(sink.contains(&AppEvent::BootstrapFailed(DisplayError::BootstrapFailed {
        field: "slider_min"
    })));
    // 40 passes, a pause between each.
    assert_eq!(delay.total_ms, 39 * 50);
    assert_eq!(app.editor().slider_value(), 930);
    assert!(sink.contains(&AppEvent::Started { active_profile: 0 }));
}

// ── Settings pull ─────────────────────────────────────────────

#[test]
fn settings_are_requested_in_order_until_confirmed() {
    let mut rig = Rig::paired();
    assert_eq!(sent_payloads(&rig.radio), vec!["request=profile"]);

    // Same setting again after the spacing, nothing in between.
    rig.tick(499);
    rig.tick(500);
    assert_eq!(
        sent_payloads(&rig.radio),
        vec!["request=profile", "request=profile"]
    );

    rig.receive(600, r#"profile_data={"n":"Remote","s":[[9,30]]}"#);
    rig.tick(1_000);
    assert_eq!(
        sent_payloads(&rig.radio).last().map(String::as_str),
        Some("request=tempsetbrew")
    );
    assert!(rig.app.settings_sync().is_received(RemoteSetting::Profile));
}

#[test]
fn confirming_everything_stops_the_requests() {
    let mut rig = Rig::paired();
    rig.receive(
        100,
        r#"profile_data={"n":"Remote","s":[[9,30]]}|tempsetbrew=93.5|brew_mode=COFFEE|steam_boost=false|profiling_mode=flat|profiling_source=pressure|profiling_target=time|profiling_flat_value=2.5"#,
    );
    assert!(rig.sink.contains(&AppEvent::SettingsSynchronised));

    let sent = rig.radio.sent.len();
    rig.tick(5_000);
    assert_eq!(rig.radio.sent.len(), sent);
}

#[test]
fn repairing_starts_the_pull_over() {
    let mut rig = Rig::paired();
    rig.receive(100, "tempsetbrew=93.5");
    rig.tick(10_100);
    assert!(rig.sink.contains(&AppEvent::PeerLost));
    assert!(!rig.app.settings_sync().is_received(RemoteSetting::BrewTemperature));
}

// ── Inbound topics to the screen ──────────────────────────────

#[test]
fn inbound_settings_update_the_screen() {
    let mut rig = Rig::paired();
    rig.receive(
        100,
        "brew_mode=STEAM|steam_boost=true|tempsetbrew=94.5|profiling_mode=flat|profiling_flat_value=3.2",
    );

    let s = &rig.screen;
    assert_eq!(s.number_written(settings_page::COFFEE_MODE.val()), Some(0));
    assert_eq!(s.number_written(settings_page::STEAM_MODE.val()), Some(1));
    assert_eq!(s.number_written(settings_page::STEAM_BOOST.val()), Some(1));
    assert_eq!(s.number_written(settings_page::BREW_TEMP_SLIDER.val()), Some(945));
    assert_eq!(s.number_written(profiling_page::MODE_FLAT.val()), Some(1));
    assert_eq!(s.number_written(profiling_page::MODE_PROFILE.val()), Some(0));
    assert_eq!(s.text_written(profiling_page::FLAT.txt()), Some(" 3.2"));
    assert_eq!(rig.app.editor().slider_value(), 945);
}

#[test]
fn machine_state_text_is_shown_once_per_change() {
    let mut rig = Rig::paired();
    rig.receive(100, "state=HEATING");
    rig.tick(150);
    rig.receive(200, "state=HEATING");

    let writes = rig
        .screen
        .writes
        .iter()
        .filter(|w| matches!(w, ScreenWrite::Text(a, t) if *a == main_page::MACHINE_STATE.txt() && t == "HEATING"))
        .count();
    assert_eq!(writes, 1);
}

// ── Shot timing ───────────────────────────────────────────────

#[test]
fn shot_runs_from_pump_and_lever() {
    let mut rig = Rig::paired();
    rig.receive(100, "pump=ON|lever=LIFTED");
    assert_eq!(rig.app.shot().phase(), ShotPhase::Arming);

    rig.tick(1_100);
    assert_eq!(rig.app.shot().phase(), ShotPhase::Arming);
    rig.tick(1_200);
    assert_eq!(rig.app.shot().phase(), ShotPhase::Active);
    assert!(rig.sink.contains(&AppEvent::ShotStarted));

    rig.receive(5_100, "pump=OFF");
    assert_eq!(rig.app.shot().phase(), ShotPhase::Retained);
    assert!(rig.sink.contains(&AppEvent::ShotFinished { seconds: 5 }));
    assert_eq!(rig.screen.text_written(main_page::SHOT_TIME.txt()), Some("5"));
}

#[test]
fn short_pull_is_not_a_shot() {
    let mut rig = Rig::paired();
    rig.receive(100, "pump=ON|lever=LIFTED");
    rig.receive(600, "lever=LOWERED");

    assert_eq!(rig.app.shot().phase(), ShotPhase::Idle);
    assert!(!rig.sink.contains(&AppEvent::ShotStarted));
}

// ── Local edits ───────────────────────────────────────────────

#[test]
fn dial_edit_publishes_after_the_idle_delay() {
    let mut rig = Rig::paired();
    rig.screen.page = 1;
    rig.tick(50);

    rig.tick_with(
        100,
        DialInput {
            ticks: 5,
            button: false,
        },
    );
    assert_eq!(
        rig.screen.number_written(settings_page::BREW_TEMP_VALUE.val()),
        Some(935)
    );

    rig.tick(1_099);
    assert!(!sent_payloads(&rig.radio).contains(&"tempsetbrew=93.500".to_string()));
    rig.tick(1_100);
    assert!(sent_payloads(&rig.radio).contains(&"tempsetbrew=93.500".to_string()));
    assert!(rig.sink.contains(&AppEvent::SettingPublished {
        topic: "tempsetbrew"
    }));
}

#[test]
fn slider_is_clamped_to_its_bounds() {
    let mut rig = Rig::new();
    rig.screen.page = 1;
    rig.tick(0);
    rig.tick_with(
        100,
        DialInput {
            ticks: 500,
            button: false,
        },
    );
    assert_eq!(rig.app.editor().slider_value(), 1050);
}

#[test]
fn tare_release_is_forwarded() {
    let mut rig = Rig::paired();
    rig.screen.tap(main_page::TARE);
    rig.tick(100);
    assert!(sent_payloads(&rig.radio).contains(&"tare_scale=true".to_string()));
}

// ── Commands ──────────────────────────────────────────────────

#[test]
fn broker_settings_wait_for_pairing() {
    let mut rig = Rig::new();
    let settings = MqttSettings {
        server: bounded("10.0.0.2"),
        port: bounded("1883"),
        user: bounded("hmi"),
        password: bounded("secret"),
    };
    rig.command(0, AppCommand::SetMqttSettings(settings));
    assert!(rig.app.mqtt_pending());

    rig.radio.inject(CONTROLLER, &pair_response("espresso"));
    rig.tick(50);

    assert!(!rig.app.mqtt_pending());
    assert_eq!(
        sent_payloads(&rig.radio)[0],
        "mqtt_server=10.0.0.2|mqtt_port=1883|mqtt_user=hmi|mqtt_password=secret"
    );
}

#[test]
fn screen_instruction_is_passed_through() {
    let mut rig = Rig::new();
    rig.command(0, AppCommand::ScreenInstruction("page 3".into()));
    assert!(rig.screen.commands().any(|c| c == "page 3"));
}

#[test]
fn config_change_is_saved_after_it_settles() {
    let mut rig = Rig::new();
    let mut config = HmiConfig::default();
    config.peer_timeout_ms = 20_000;

    rig.command(1_000, AppCommand::UpdateConfig(Box::new(config.clone())));
    assert!(rig.app.is_config_dirty());

    assert!(!rig.app.auto_save_if_needed(&rig.nvs, 5_999));
    assert!(rig.app.auto_save_if_needed(&rig.nvs, 6_000));
    assert!(!rig.app.is_config_dirty());
    assert_eq!(rig.nvs.saved_config(), Some(config));
}
