//! Calibration and cleaning driven through touch releases and the
//! controller's `state` reports.

use brewhmi::app::events::AppEvent;
use brewhmi::app::service::DialInput;
use brewhmi::display::layout::{self, system_page};
use brewhmi::workflow::{CalibrationStep, NOT_CONNECTED};

use crate::mock_hw::{Rig, sent_payloads};

fn message(rig: &Rig) -> Option<&str> {
    rig.screen.text_written(system_page::MESSAGE.txt())
}

fn published(rig: &Rig, payload: &str) -> bool {
    sent_payloads(&rig.radio).iter().any(|p| p == payload)
}

/// Paired rig showing the system page.
fn on_system_page() -> Rig {
    let mut rig = Rig::paired();
    rig.screen.page = 3;
    rig.tick(50);
    rig
}

// ── Calibration ───────────────────────────────────────────────

#[test]
fn calibrate_without_controller_reports_it() {
    let mut rig = Rig::new();
    rig.screen.tap(system_page::CALIBRATE);
    rig.tick(100);

    assert_eq!(message(&rig), Some(NOT_CONNECTED));
    assert!(rig.radio.sent.iter().all(|(_, data)| data.len() != 250));

    rig.tick(5_099);
    assert_eq!(message(&rig), Some(NOT_CONNECTED));
    rig.tick(5_100);
    assert_eq!(message(&rig), Some(""));
}

#[test]
fn full_calibration_walkthrough() {
    let mut rig = on_system_page();
    assert_eq!(
        rig.screen.number_written(system_page::REFERENCE_WEIGHT.val()),
        Some(1000)
    );

    rig.screen.tap(system_page::CALIBRATE);
    rig.tick(100);
    assert!(published(&rig, "calibratescale="));
    assert_eq!(message(&rig), Some("Calibration requested..."));

    rig.receive(200, "state=CALIBRATION_EMPTY");
    assert_eq!(
        rig.app.workflows().calibration.step(),
        CalibrationStep::WaitingTare
    );

    rig.screen.tap(system_page::CALIBRATE);
    rig.tick(300);
    assert!(published(&rig, "calibration_step=0.0"));

    // A repeat while the tare is confirmed changes nothing.
    rig.receive(400, "state=CALIBRATION_EMPTY");
    assert_eq!(
        rig.app.workflows().calibration.step(),
        CalibrationStep::TareConfirmSent
    );

    rig.receive(500, "state=CALIBRATION_TEST_WEIGHT");
    assert_eq!(
        rig.app.workflows().calibration.step(),
        CalibrationStep::WaitingWeigh
    );
    assert!(
        rig.screen
            .commands()
            .any(|c| c == layout::visibility(system_page::REFERENCE_WEIGHT, true))
    );

    // Four ticks of half a gram each.
    rig.tick_with(
        600,
        DialInput {
            ticks: 4,
            button: false,
        },
    );
    assert_eq!(
        rig.screen.number_written(system_page::REFERENCE_WEIGHT.val()),
        Some(1020)
    );

    rig.screen.tap(system_page::CALIBRATE);
    rig.tick(700);
    assert!(published(&rig, "calibration_step=102.0"));

    rig.receive(800, "state=IDLE");
    assert_eq!(message(&rig), Some("Calibration Complete"));
    assert_eq!(rig.app.workflows().calibration.step(), CalibrationStep::Idle);
}

#[test]
fn unanswered_calibration_times_out() {
    let mut rig = on_system_page();
    rig.screen.tap(system_page::CALIBRATE);
    rig.tick(100);

    rig.receive(5_000, "state=READY");
    rig.tick(10_099);
    assert!(rig.app.workflows().calibration.is_active());

    rig.tick(10_100);
    assert!(!rig.app.workflows().calibration.is_active());
    assert_eq!(message(&rig), Some("Calibration Failed:\r\nTimeout"));
}

// ── Cleaning ──────────────────────────────────────────────────

#[test]
fn cleaning_counts_cycles_and_completes() {
    let mut rig = on_system_page();
    rig.screen.tap(system_page::CLEANING);
    rig.tick(100);
    assert!(published(&rig, "start_cleaning=true"));

    rig.receive(200, "state=CLEANING_START");
    assert_eq!(
        message(&rig),
        Some("Cleaning Cycle:\r\nAdd detergent\r\nPull lever to start")
    );

    rig.receive(300, "state=CLEANING_PUMPING");
    rig.receive(400, "state=CLEANING_PAUSE");
    assert_eq!(message(&rig), Some("Cleaning... (Cycle 1)\r\nLift lever"));

    rig.receive(500, "state=CLEANING_PUMPING");
    assert_eq!(rig.app.workflows().cleaning.cycle(), 2);
    assert_eq!(
        message(&rig),
        Some("Pumping... (Cycle 2)\r\nLower lever when buzzing")
    );

    rig.receive(600, "state=IDLE");
    assert_eq!(message(&rig), Some("Cleaning Complete"));
    assert!(!rig.app.workflows().is_busy());
}

#[test]
fn unanswered_cleaning_times_out() {
    let mut rig = on_system_page();
    rig.screen.tap(system_page::CLEANING);
    rig.tick(100);

    rig.receive(5_000, "state=READY");
    rig.tick(10_099);
    assert!(rig.app.workflows().cleaning.is_active());

    rig.tick(10_100);
    assert_eq!(message(&rig), Some("Cleaning Failed:\r\nTimeout"));
    assert!(!rig.app.workflows().is_busy());
}

#[test]
fn workflows_exclude_each_other() {
    let mut rig = on_system_page();
    rig.screen.tap(system_page::CALIBRATE);
    rig.tick(100);
    rig.screen.tap(system_page::CLEANING);
    rig.tick(200);

    assert!(!published(&rig, "start_cleaning=true"));
    assert!(!rig.app.workflows().cleaning.is_active());
}

#[test]
fn portal_is_refused_while_busy() {
    let mut rig = on_system_page();
    rig.screen.tap(system_page::CLEANING);
    rig.tick(100);
    rig.screen.tap(system_page::SYSTEM_SETTINGS);
    rig.tick(200);
    assert!(!rig.sink.contains(&AppEvent::ConfigPortalRequested));

    rig.receive(300, "state=CLEANING_START");
    rig.receive(400, "state=IDLE");
    rig.screen.tap(system_page::SYSTEM_SETTINGS);
    rig.tick(500);
    assert!(rig.sink.contains(&AppEvent::ConfigPortalRequested));
}
