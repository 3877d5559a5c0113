mod fixtures;

use fixtures::*;
use std::sync::Arc;
use std::time::Duration;
use surround_graph::{
    highest_priority_sink, spawn_reconcile_loop, JsonFileSettings, MixerProfile, PolicyError, RoutingAction,
    RoutingSettings,
};
use tokio_util::sync::CancellationToken;

#[test]
fn test_repeated_passes_converge() {
    let fixture = TestFixture::new();
    fixture.server.add_stream(stream(7, 41, "Game", "game.exe"));
    fixture.server.add_stream(stream(8, 57, "Browser", "firefox"));
    fixture.enable("Game");

    let first = fixture.reconciler.reconcile_once();
    assert_eq!(first.applied.len(), 3, "default, enable move, evict move: {:?}", first.applied);
    assert!(first.failed.is_empty());

    let second = fixture.reconciler.reconcile_once();
    assert!(second.is_noop(), "second pass acted: {:?}", second.applied);

    fixture.server.clear_calls();
    let third = fixture.reconciler.reconcile_once();
    assert!(third.is_noop());
    assert!(fixture.server.commands().is_empty());
}

#[test]
fn test_priority_tie_goes_to_higher_index() {
    let fixture = TestFixture::empty();
    fixture
        .server
        .add_sink(hardware_sink(7, 70, "alsa_output.a", 1000, &["available"]));
    fixture
        .server
        .add_sink(hardware_sink(9, 71, "alsa_output.b", 1000, &["available"]));

    let sinks = fixture.reconciler.collector().list_sinks();
    assert_eq!(highest_priority_sink(&sinks), Some(71));
}

#[test]
fn test_unavailable_ports_demote_sink() {
    let fixture = TestFixture::empty();
    fixture.server.add_sink(hardware_sink(
        3,
        30,
        "alsa_output.usb-headset",
        1000,
        &["not available", "Not Available"],
    ));
    fixture
        .server
        .add_sink(hardware_sink(4, 31, "alsa_output.speakers", 500, &["available"]));

    let sinks = fixture.reconciler.collector().list_sinks();
    assert_eq!(highest_priority_sink(&sinks), Some(31));
}

#[test]
fn test_enabled_app_moves_to_device_sink() {
    let fixture = TestFixture::empty();
    fixture.server.add_sink(virtual_sink(8, 80, FILTER));
    fixture.server.add_sink(virtual_sink(9, 81, DEVICE));
    fixture.server.add_sink(virtual_sink(3, 30, FALLBACK));
    fixture.server.set_default(DEVICE);
    fixture.server.add_stream(stream(7, 3, "Game", "game.exe"));
    fixture.enable("Game");

    let report = fixture.reconciler.reconcile_once();
    assert_eq!(
        report.applied,
        vec![RoutingAction::MoveStream {
            stream_index: 7,
            target_sink_index: 9,
            application: "Game".to_string(),
        }]
    );
    assert_eq!(fixture.server.commands(), vec!["pactl move-sink-input 7 9"]);
    assert_eq!(fixture.server.sink_of(7), Some(9));
}

#[test]
fn test_disabled_app_is_evicted_to_fallback() {
    let fixture = TestFixture::new();
    fixture.server.set_default(DEVICE);
    fixture.server.add_stream(stream(12, 58, "Music", "spotify"));
    fixture.server.add_stream(stream(13, 57, "Video", "mpv"));

    fixture.reconciler.reconcile_once();

    assert_eq!(fixture.server.sink_of(12), Some(50));
    assert_eq!(fixture.server.sink_of(13), Some(50));
}

#[test]
fn test_pinned_stream_is_never_moved() {
    let fixture = TestFixture::new();
    fixture.server.set_default(DEVICE);
    fixture
        .server
        .add_stream(pinned_stream(20, 41, "Game", "game.exe", "alsa_output.pci-analog-stereo"));
    fixture
        .server
        .add_stream(pinned_stream(21, 58, "Music", "spotify", "input.virtual-surround-sound-input"));
    fixture.enable("Game");

    let report = fixture.reconciler.reconcile_once();
    assert!(report.is_noop());
    assert_eq!(fixture.server.sink_of(20), Some(41));
    assert_eq!(fixture.server.sink_of(21), Some(58));
}

#[test]
fn test_ignored_binary_is_invisible() {
    let fixture = TestFixture::new();
    fixture.server.set_default(DEVICE);
    fixture.server.add_stream(stream(30, 58, "Steam", "steamwebhelper"));
    fixture.server.add_stream(stream(31, 41, "Steam", "steam"));
    fixture.enable("Steam");

    let streams = fixture.reconciler.collector().list_streams();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0].index, 31);

    fixture.reconciler.reconcile_once();
    assert_eq!(fixture.server.sink_of(30), Some(58));
    assert_eq!(fixture.server.sink_of(31), Some(58));
}

#[test]
fn test_stream_format_is_decoded() {
    let fixture = TestFixture::new();
    fixture.server.add_stream(stream(40, 41, "Game", "game.exe"));

    let streams = fixture.reconciler.collector().list_streams();
    let format = &streams[0].format;
    assert_eq!(format.format, "pcm");
    assert_eq!(format.sample_format, "float32le");
    assert_eq!(format.rate, "48000");
    assert_eq!(format.channels, "2");
    assert_eq!(format.channel_map, vec!["front-left", "front-right"]);
    assert_eq!(streams[0].volume, "front-left: 100%, front-right: 100%");
}

#[test]
fn test_sample_spec_fallback_when_format_is_bare() {
    let fixture = TestFixture::new();
    let mut raw = stream(41, 41, "Game", "game.exe");
    raw["format"] = serde_json::json!("pcm");
    raw["sample_specification"] = serde_json::json!("s16le 6ch 44100Hz");
    raw["channel_map"] = serde_json::json!("front-left,front-right,front-center,lfe,rear-left,rear-right");
    fixture.server.add_stream(raw);

    let streams = fixture.reconciler.collector().list_streams();
    let format = &streams[0].format;
    assert_eq!(format.sample_format, "s16le");
    assert_eq!(format.rate, "44100");
    assert_eq!(format.channels, "6");
    assert_eq!(format.channel_map.len(), 6);
}

#[test]
fn test_application_name_from_plain_listing() {
    let fixture = TestFixture::new();
    let mut raw = stream(50, 41, "ignored", "wine64-preloader");
    raw["properties"]
        .as_object_mut()
        .unwrap()
        .remove("application.name");
    raw["properties"].as_object_mut().unwrap().remove("media.name");
    fixture.server.add_stream(raw);
    fixture
        .server
        .set_plain_extra("Sink Input #50\n\tProperties:\n\t\tnode.name = \"Witcher 3\"\n");

    let streams = fixture.reconciler.collector().list_streams();
    assert_eq!(streams[0].application_name.as_deref(), Some("Witcher 3"));
}

#[test]
fn test_null_names_in_plain_listing_are_not_backfilled() {
    let fixture = TestFixture::new();
    let mut raw = stream(12, 41, "(null)", "wine64-preloader");
    raw["properties"].as_object_mut().unwrap().remove("media.name");
    fixture.server.add_stream(raw);
    fixture.server.set_plain_extra(
        "Sink Input #12\n\tProperties:\n\t\tnode.name = \"Witcher 3\"\n\t\tapplication.name = \"(null)\"\n",
    );

    let streams = fixture.reconciler.collector().list_streams();
    assert_eq!(streams[0].application_name.as_deref(), Some("Witcher 3"));
}

#[test]
fn test_surround_default_follows_preference() {
    let fixture = TestFixture::new();

    fixture.reconciler.reconcile_once();
    assert_eq!(fixture.server.default_sink().as_deref(), Some(DEVICE));

    fixture.set_surround_default(false);
    fixture.reconciler.reconcile_once();
    assert_eq!(fixture.server.default_sink().as_deref(), Some(FALLBACK));
}

#[test]
fn test_missing_filter_sink_aborts_without_commands() {
    let fixture = TestFixture::empty();
    fixture.server.add_sink(virtual_sink(50, 60, FALLBACK));
    fixture.server.add_stream(stream(7, 50, "Game", "game.exe"));
    fixture.enable("Game");

    let report = fixture.reconciler.reconcile_once();
    assert!(matches!(report.aborted, Some(PolicyError::FilterSinkMissing { .. })));
    assert!(fixture.server.commands().is_empty());
}

#[test]
fn test_missing_tools_degrade_to_abort() {
    let fixture = TestFixture::new();
    fixture.server.go_offline();

    assert!(fixture.reconciler.collector().list_sinks().is_empty());
    let report = fixture.reconciler.reconcile_once();
    assert!(report.aborted.is_some());
}

#[test]
fn test_mixer_profile_applies_to_filter_sink() {
    let fixture = TestFixture::new();
    let profile = MixerProfile::new("quiet-left").with_volume("FL", 70);

    assert!(fixture.reconciler.apply_mixer_profile(&profile));
    assert_eq!(fixture.server.commands(), vec!["pactl set-sink-volume 57 70% 100%"]);
}

#[test]
fn test_file_settings_are_reread_each_pass() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let server = Arc::new(FakeAudioServer::new());
    server.add_sink(virtual_sink(57, 90, FILTER));
    server.add_sink(virtual_sink(58, 91, DEVICE));
    server.add_sink(virtual_sink(50, 60, FALLBACK));
    server.set_default(DEVICE);
    server.add_stream(stream(7, 50, "Game", "game.exe"));

    let settings = Arc::new(JsonFileSettings::open(&path));
    let reconciler = reconciler_for(server.clone(), settings.clone());

    reconciler.reconcile_once();
    assert_eq!(server.sink_of(7), Some(50));

    std::fs::write(&path, r#"{"enabled_apps": ["Game"], "surround_sink_default": true}"#).unwrap();
    reconciler.reconcile_once();
    assert_eq!(server.sink_of(7), Some(58));
    assert_eq!(reconciler.routing_settings().enabled_apps, vec!["Game"]);

    reconciler.disable_app("Game").unwrap();
    reconciler.reconcile_once();
    assert_eq!(server.sink_of(7), Some(50));
    assert_eq!(RoutingSettings::read(settings.as_ref()).enabled_apps, Vec::<String>::new());
}

#[test]
fn test_enable_from_another_process_is_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let server = Arc::new(FakeAudioServer::new());
    server.add_sink(virtual_sink(57, 90, FILTER));
    server.add_sink(virtual_sink(58, 91, DEVICE));
    server.add_sink(virtual_sink(50, 60, FALLBACK));
    server.set_default(DEVICE);
    server.add_stream(stream(7, 50, "Game", "game.exe"));
    server.add_stream(stream(8, 50, "Video", "mpv"));

    let daemon = reconciler_for(server.clone(), Arc::new(JsonFileSettings::open(&path)));
    daemon.reconcile_once();

    let cli = reconciler_for(server.clone(), Arc::new(JsonFileSettings::open(&path)));
    cli.enable_app("Video").unwrap();

    daemon.enable_app("Game").unwrap();
    daemon.reconcile_once();

    assert_eq!(daemon.routing_settings().enabled_apps, vec!["Video", "Game"]);
    assert_eq!(server.sink_of(7), Some(58));
    assert_eq!(server.sink_of(8), Some(58));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_loop_routes_newly_enabled_app() {
    let fixture = TestFixture::new();
    fixture.server.add_stream(stream(7, 41, "Game", "game.exe"));

    let handle = spawn_reconcile_loop(
        fixture.reconciler.clone(),
        Duration::from_secs(3600),
        CancellationToken::new(),
    );

    let server = fixture.server.clone();
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.default_sink().as_deref() != Some(DEVICE) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("startup pass did not run");

    fixture.enable("Game");
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.sink_of(7) != Some(58) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("enable did not trigger a pass");

    handle.shutdown().await;
}
