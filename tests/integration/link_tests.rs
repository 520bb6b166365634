//! Pairing, liveness and framing through the service tick.

use brewhmi::app::events::AppEvent;
use brewhmi::app::service::{DialInput, HmiService};
use brewhmi::config::HmiConfig;
use brewhmi::link::{BROADCAST, PAIRING_RECORD_LEN};

use crate::mock_hw::{
    CONTROLLER, LogSink, MockNvs, MockScreen, NoDelay, pair_response, payload, radio,
    sent_payloads,
};

fn started() -> (HmiService, MockScreen, MockNvs, LogSink) {
    let mut nvs = MockNvs::new();
    let mut screen = MockScreen::new();
    let mut sink = LogSink::new();
    let mut app = HmiService::new(HmiConfig::default(), &mut nvs);
    app.start(&mut screen, &mut NoDelay::default(), &mut sink);
    (app, screen, nvs, sink)
}

const IDLE: DialInput = DialInput {
    ticks: 0,
    button: false,
};

#[test]
fn first_tick_broadcasts_a_pair_request() {
    let (mut app, mut screen, mut nvs, mut sink) = started();
    let mut radio = radio();

    app.tick(0, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    assert_eq!(radio.sent.len(), 1);
    let (to, data) = &radio.sent[0];
    assert_eq!(*to, BROADCAST);
    assert_eq!(data.len(), PAIRING_RECORD_LEN);
    assert_eq!(data[0], 1, "pair request kind");

    // Not again before the retry interval.
    app.tick(9_999, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert_eq!(radio.sent.len(), 1);
    app.tick(10_000, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert_eq!(radio.sent.len(), 2);
}

#[test]
fn pair_response_establishes_the_session() {
    let (mut app, mut screen, mut nvs, mut sink) = started();
    let mut radio = radio();
    app.tick(0, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    radio.inject(CONTROLLER, &pair_response("espresso"));
    app.tick(50, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    assert!(app.link().is_paired());
    assert!(radio.is_peer(&CONTROLLER));
    assert!(!radio.is_peer(&BROADCAST));
    assert!(sink.contains(&AppEvent::Paired {
        peer: CONTROLLER,
        channel: 6
    }));
    // The settings pull starts on the same tick.
    assert_eq!(sent_payloads(&radio), vec!["request=profile"]);
}

#[test]
fn wrong_identifier_is_ignored() {
    let (mut app, mut screen, mut nvs, mut sink) = started();
    let mut radio = radio();
    app.tick(0, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    radio.inject(CONTROLLER, &pair_response("grinder"));
    app.tick(50, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    assert!(!app.link().is_paired());
    assert!(radio.is_peer(&BROADCAST));
}

#[test]
fn payload_before_pairing_is_dropped() {
    let (mut app, mut screen, mut nvs, mut sink) = started();
    let mut radio = radio();

    radio.inject(CONTROLLER, &payload("boiler_temp=120.5"));
    app.tick(0, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    assert_eq!(app.machine().boiler_temp, 0.0);
}

#[test]
fn payload_from_a_stranger_is_dropped() {
    let (mut app, mut screen, mut nvs, mut sink) = started();
    let mut radio = radio();
    radio.inject(CONTROLLER, &pair_response("espresso"));
    app.tick(0, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    radio.inject([9; 6], &payload("boiler_temp=120.5"));
    app.tick(50, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert_eq!(app.machine().boiler_temp, 0.0);

    radio.inject(CONTROLLER, &payload("boiler_temp=120.5|hx_temp=92"));
    app.tick(100, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert_eq!(app.machine().boiler_temp, 120.5);
    assert_eq!(app.machine().hx_temp, 92.0);
}

#[test]
fn malformed_tokens_do_not_stop_the_frame() {
    let (mut app, mut screen, mut nvs, mut sink) = started();
    let mut radio = radio();
    radio.inject(CONTROLLER, &pair_response("espresso"));
    app.tick(0, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    radio.inject(CONTROLLER, &payload("||garbage|weight=18.4|"));
    app.tick(50, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    assert_eq!(app.machine().weight, 18.4);
}

#[test]
fn silent_peer_is_dropped_and_pairing_resumes() {
    let (mut app, mut screen, mut nvs, mut sink) = started();
    let mut radio = radio();
    radio.inject(CONTROLLER, &pair_response("espresso"));
    app.tick(0, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert!(app.link().is_paired());

    app.tick(9_999, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert!(app.link().is_paired());

    let sent_before = radio.sent.len();
    app.tick(10_000, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert!(!app.link().is_paired());
    assert!(sink.contains(&AppEvent::PeerLost));
    assert!(radio.is_peer(&BROADCAST));

    // The next pair request goes out on the same tick.
    let (to, data) = radio.sent.last().unwrap();
    assert!(radio.sent.len() > sent_before);
    assert_eq!(*to, BROADCAST);
    assert_eq!(data.len(), PAIRING_RECORD_LEN);
}

#[test]
fn traffic_keeps_the_session_alive() {
    let (mut app, mut screen, mut nvs, mut sink) = started();
    let mut radio = radio();
    radio.inject(CONTROLLER, &pair_response("espresso"));
    app.tick(0, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    radio.inject(CONTROLLER, &payload("pressure=9.1"));
    app.tick(8_000, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    app.tick(15_000, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    assert!(app.link().is_paired());
}

#[test]
fn offline_mode_stops_pairing() {
    use brewhmi::app::commands::AppCommand;

    let (mut app, mut screen, mut nvs, mut sink) = started();
    let mut radio = radio();
    app.handle_command(
        AppCommand::SetLinkEnabled(false),
        0,
        &mut radio,
        &mut screen,
        &mut nvs,
        &mut sink,
    );
    app.tick(0, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    app.tick(20_000, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);

    assert!(radio.sent.is_empty());
}
