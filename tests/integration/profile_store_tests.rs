//! Profile persistence, import and dial scrubbing through the service.

use brewhmi::app::commands::{AppCommand, CommandReply};
use brewhmi::app::events::AppEvent;
use brewhmi::app::service::{DialInput, HmiService};
use brewhmi::config::HmiConfig;
use brewhmi::display::layout::{profiling_page, system_page};
use brewhmi::error::ProfileError;
use brewhmi::profile::store::{INDEX_KEY, INDEX_NAMESPACE};
use brewhmi::profile::{MAX_PROFILES, ProfileMode, ProfileStore, Step};

use crate::mock_hw::{LogSink, MockNvs, MockScreen, NoDelay, radio};

const IDLE: DialInput = DialInput {
    ticks: 0,
    button: false,
};

fn started(nvs: &mut MockNvs) -> (HmiService, MockScreen, LogSink) {
    let mut screen = MockScreen::new();
    let mut sink = LogSink::new();
    let mut app = HmiService::new(HmiConfig::default(), nvs);
    app.start(&mut screen, &mut NoDelay::default(), &mut sink);
    (app, screen, sink)
}

fn import(
    app: &mut HmiService,
    screen: &mut MockScreen,
    nvs: &mut MockNvs,
    sink: &mut LogSink,
    doc: &str,
) -> CommandReply {
    app.handle_command(
        AppCommand::ImportProfile(doc.into()),
        0,
        &mut radio(),
        screen,
        nvs,
        sink,
    )
}

#[test]
fn empty_storage_gets_the_standard_profile() {
    let mut nvs = MockNvs::new();
    let (app, screen, sink) = started(&mut nvs);

    assert_eq!(app.profiles().active_index(), 0);
    assert_eq!(app.profiles().active().name(), "Standard Profile");
    assert_eq!(
        nvs.raw(INDEX_NAMESPACE, INDEX_KEY),
        Some(&0i32.to_le_bytes()[..])
    );
    // The screen showed nothing, so the editor was refreshed.
    assert_eq!(
        screen.text_written(profiling_page::PROFILE_NAME.txt()),
        Some("Standard Profile")
    );
    assert!(sink.contains(&AppEvent::Started { active_profile: 0 }));
}

#[test]
fn imported_profiles_survive_a_restart() {
    let mut nvs = MockNvs::new();
    let (mut app, mut screen, mut sink) = started(&mut nvs);

    let reply = import(
        &mut app,
        &mut screen,
        &mut nvs,
        &mut sink,
        r#"{"n":"Blooming","m":1,"s":[{"t":2,"c":8},{"t":9,"c":25}]}"#,
    );
    assert_eq!(reply, CommandReply::Done);
    assert!(sink.contains(&AppEvent::ProfileStored { slot: 1 }));

    let reloaded = ProfileStore::load(&mut nvs, 3_000);
    let p = reloaded.get(1).unwrap();
    assert_eq!(p.name(), "Blooming");
    assert_eq!(p.mode, ProfileMode::Stepped);
    assert_eq!(p.steps(), &[Step::new(2.0, 8.0), Step::new(9.0, 25.0)]);
}

#[test]
fn import_with_an_existing_name_updates_in_place() {
    let mut nvs = MockNvs::new();
    let (mut app, mut screen, mut sink) = started(&mut nvs);

    import(&mut app, &mut screen, &mut nvs, &mut sink, r#"{"n":"A","s":[[6,10]]}"#);
    import(&mut app, &mut screen, &mut nvs, &mut sink, r#"{"n":"A","s":[[7,12]]}"#);

    let used = app.profiles().slots().iter().filter(|p| !p.is_empty()).count();
    assert_eq!(used, 2);
    assert_eq!(app.profiles().get(1).unwrap().steps(), &[Step::new(7.0, 12.0)]);
}

#[test]
fn bad_import_is_reported_on_the_status_line() {
    let mut nvs = MockNvs::new();
    let (mut app, mut screen, mut sink) = started(&mut nvs);

    let reply = import(&mut app, &mut screen, &mut nvs, &mut sink, "{not json");
    assert_eq!(reply, CommandReply::Rejected("import failed"));

    app.tick(0, IDLE, &mut radio(), &mut screen, &mut nvs, &mut sink);
    assert_eq!(
        screen.text_written(system_page::MESSAGE.txt()),
        Some("Import Failed:\r\nInvalid JSON")
    );
}

#[test]
fn full_store_rejects_new_names() {
    let mut nvs = MockNvs::new();
    let (mut app, mut screen, mut sink) = started(&mut nvs);

    for i in 1..MAX_PROFILES {
        let doc = format!(r#"{{"n":"P{i}","s":[[9,30]]}}"#);
        assert_eq!(
            import(&mut app, &mut screen, &mut nvs, &mut sink, &doc),
            CommandReply::Done
        );
    }
    let reply = import(&mut app, &mut screen, &mut nvs, &mut sink, r#"{"n":"One more","s":[[9,30]]}"#);

    assert_eq!(reply, CommandReply::Rejected("import failed"));
    assert!(sink.contains(&AppEvent::ProfileRejected(ProfileError::StoreFull)));
}

#[test]
fn deleting_the_active_profile_moves_the_selection() {
    let mut nvs = MockNvs::new();
    let (mut app, mut screen, mut sink) = started(&mut nvs);
    import(&mut app, &mut screen, &mut nvs, &mut sink, r#"{"n":"B","s":[[8,20]]}"#);

    let reply = app.handle_command(
        AppCommand::DeleteProfile(0),
        0,
        &mut radio(),
        &mut screen,
        &mut nvs,
        &mut sink,
    );

    assert_eq!(reply, CommandReply::Done);
    assert_eq!(app.profiles().active_index(), 1);
    assert!(sink.contains(&AppEvent::ActiveProfileChanged { slot: 1 }));
    assert_eq!(
        screen.text_written(profiling_page::PROFILE_NAME.txt()),
        Some("B")
    );
}

#[test]
fn activating_an_empty_slot_is_rejected() {
    let mut nvs = MockNvs::new();
    let (mut app, mut screen, mut sink) = started(&mut nvs);

    let reply = app.handle_command(
        AppCommand::SetActiveProfile(5),
        0,
        &mut radio(),
        &mut screen,
        &mut nvs,
        &mut sink,
    );

    assert_eq!(reply, CommandReply::Rejected("empty or invalid slot"));
    assert_eq!(app.profiles().active_index(), 0);
}

#[test]
fn save_by_slot_and_list() {
    let mut nvs = MockNvs::new();
    let (mut app, mut screen, mut sink) = started(&mut nvs);
    let mut radio = radio();

    let reply = app.handle_command(
        AppCommand::SaveProfile(r#"{"id":4,"n":"Turbo","s":[[6,15]]}"#.into()),
        0,
        &mut radio,
        &mut screen,
        &mut nvs,
        &mut sink,
    );
    assert_eq!(reply, CommandReply::Done);

    let CommandReply::Document(doc) = app.handle_command(
        AppCommand::ListProfiles,
        0,
        &mut radio,
        &mut screen,
        &mut nvs,
        &mut sink,
    ) else {
        panic!("list should return a document");
    };
    let list: serde_json::Value = serde_json::from_str(&doc).unwrap();
    assert_eq!(list["active"], 0);
    assert_eq!(list["profiles"].as_array().unwrap().len(), MAX_PROFILES);
    assert_eq!(list["profiles"][4]["n"], "Turbo");
}

#[test]
fn dial_scrub_persists_the_index_after_settling() {
    let mut nvs = MockNvs::new();
    let (mut app, mut screen, mut sink) = started(&mut nvs);
    let mut radio = radio();
    import(&mut app, &mut screen, &mut nvs, &mut sink, r#"{"n":"Second","s":[[8,20]]}"#);

    // Profiling page, profile mode, name field selected.
    screen.page = 2;
    screen.tap(profiling_page::MODE_PROFILE);
    screen.tap(profiling_page::PROFILE_NAME);
    app.tick(100, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert!(app.editor().cursor.is_name_selected());

    let turn = DialInput {
        ticks: 1,
        button: false,
    };
    app.tick(200, turn, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert_eq!(app.profiles().active_index(), 1);
    assert_eq!(
        screen.text_written(profiling_page::PROFILE_NAME.txt()),
        Some("Second")
    );

    app.tick(3_199, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert_eq!(
        nvs.raw(INDEX_NAMESPACE, INDEX_KEY),
        Some(&0i32.to_le_bytes()[..])
    );
    app.tick(3_200, IDLE, &mut radio, &mut screen, &mut nvs, &mut sink);
    assert_eq!(
        nvs.raw(INDEX_NAMESPACE, INDEX_KEY),
        Some(&1i32.to_le_bytes()[..])
    );
}
