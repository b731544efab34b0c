//! Tests for the App: dispatch, mode stack, MIDI in, reconnection and ticks

use super::*;
use crate::controller::mock::{ControllerCall, MockController};
use crate::controller::{buttons, Color, InputEvent, Pad};
use crate::display::recording::RecordingDisplay;
use crate::midi::MidiMessage;
use crate::midi_io::mock::MockBackend;
use crate::midi_io::MidiInNotify;
use crate::modes::stub::{Reply, StubMode};
use crate::modes::{groups, names};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::mpsc;

const SYNTH_OUT: &str = "Synth Out";

struct Harness {
    app: Arc<App>,
    backend: Arc<MockBackend>,
    controller: Arc<MockController>,
    display: RecordingDisplay,
    journal: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    fn new() -> Self {
        Self::with(Settings::default(), None, Project::default())
    }

    fn with(settings: Settings, settings_path: Option<PathBuf>, project: Project) -> Self {
        let backend = Arc::new(MockBackend::new(
            &["Ableton Push 2 Live Port", "Synth In"],
            &["Ableton Push 2 Live Port", SYNTH_OUT],
        ));
        let (tx, _rx) = mpsc::channel(64);
        let router = MidiRouter::new(backend.clone(), "Push 2", tx, settings.midi_in_notify);
        let controller = Arc::new(MockController::new());
        let display = RecordingDisplay::default();
        let app = Arc::new(App::new(
            settings,
            settings_path,
            project,
            router,
            controller.clone(),
            Box::new(display.clone()),
        ));
        Self {
            app,
            backend,
            controller,
            display,
            journal: Arc::default(),
        }
    }

    fn stub(&self, name: &str, group: Option<&str>) -> Arc<StubMode> {
        self.stub_with_pages(name, group, 1)
    }

    fn stub_with_pages(&self, name: &str, group: Option<&str>, pages: usize) -> Arc<StubMode> {
        let stub = Arc::new(StubMode::new(name, group, self.journal.clone()).with_pages(pages));
        self.app.register_mode(stub.clone());
        stub
    }

    fn take_journal(&self) -> Vec<String> {
        std::mem::take(&mut *self.journal.lock())
    }

    fn sent(&self) -> Vec<Vec<u8>> {
        self.backend.sent(SYNTH_OUT)
    }
}

fn press(button: &str) -> InputEvent {
    InputEvent::ButtonPressed {
        button: button.to_string(),
    }
}

#[test]
fn test_dispatch_reverse_order_with_short_circuit() {
    let h = Harness::new();
    h.stub("x", None);
    let y = h.stub("y", None);
    h.stub("z", None);
    for name in ["x", "y", "z"] {
        h.app.set_mode(name);
    }
    y.set_reply(Reply::Handled);
    h.take_journal();

    assert!(h.app.dispatch(&press(buttons::PLAY)));
    assert_eq!(
        h.take_journal(),
        vec!["z:button_pressed(play)", "y:button_pressed(play)"]
    );
}

#[test]
fn test_dispatch_unhandled_reaches_everyone() {
    let h = Harness::new();
    h.stub("x", None);
    h.stub("y", None);
    h.app.set_mode("x");
    h.app.set_mode("y");
    h.take_journal();

    assert!(!h.app.dispatch(&InputEvent::SustainPedal { on: true }));
    assert_eq!(h.take_journal(), vec!["y:sustain", "x:sustain"]);
}

#[test]
fn test_faulting_handler_does_not_stop_dispatch() {
    let h = Harness::new();
    let x = h.stub("x", None);
    let y = h.stub("y", None);
    let z = h.stub("z", None);
    for name in ["x", "y", "z"] {
        h.app.set_mode(name);
    }
    x.set_reply(Reply::Handled);
    y.set_reply(Reply::Panic);
    z.set_reply(Reply::Fail);
    h.take_journal();

    let event = InputEvent::PadPressed {
        pad: Pad::from_index(0),
        velocity: 100,
    };
    assert!(h.app.dispatch(&event));
    assert_eq!(
        h.take_journal(),
        vec!["z:pad_pressed", "y:pad_pressed", "x:pad_pressed"]
    );

    // Faulting modes stay active
    assert_eq!(h.app.active_mode_names(), vec!["x", "y", "z"]);
}

#[test]
fn test_set_active_mode_fires_no_callbacks() {
    let h = Harness::new();
    h.stub("a", Some(groups::PADS));
    h.app.set_mode("a");
    h.take_journal();

    h.app.set_mode("a");
    assert!(h.take_journal().is_empty());
    assert_eq!(h.app.active_mode_names(), vec!["a"]);
}

#[test]
fn test_unset_restores_then_falls_back_to_default() {
    let h = Harness::new();
    h.stub(names::MELODIC, Some(groups::PADS));
    h.stub("a", Some(groups::PADS));
    h.stub("b", Some(groups::PADS));

    h.app.set_mode("a");
    h.app.set_mode("b");
    h.take_journal();

    h.app.unset_mode("b");
    assert_eq!(h.take_journal(), vec!["b:deactivate", "a:activate"]);

    h.app.unset_mode("a");
    assert_eq!(h.take_journal(), vec!["a:deactivate", "melodic:activate"]);
    assert_eq!(h.app.active_mode_names(), vec![names::MELODIC]);
}

#[test]
fn test_toggle_melodic_rhythmic() {
    let h = Harness::new();
    h.stub(names::MELODIC, Some(groups::PADS));
    h.stub(names::RHYTHMIC, Some(groups::PADS));

    h.app.toggle_melodic_rhythmic();
    assert_eq!(h.app.active_mode_names(), vec![names::MELODIC]);
    h.app.toggle_melodic_rhythmic();
    assert_eq!(h.app.active_mode_names(), vec![names::RHYTHMIC]);
    h.app.toggle_melodic_rhythmic();
    assert_eq!(h.app.active_mode_names(), vec![names::MELODIC]);
}

#[test]
fn test_rotate_mode_pages_then_unsets() {
    let h = Harness::new();
    h.stub(names::MELODIC, Some(groups::PADS));
    h.stub_with_pages(names::SETTINGS, Some(groups::PADS), 2);
    h.app.set_mode(names::MELODIC);
    h.take_journal();

    h.app.rotate_mode(names::SETTINGS);
    assert_eq!(h.app.active_mode_names(), vec![names::SETTINGS]);
    assert_eq!(
        h.take_journal(),
        vec!["melodic:deactivate", "settings:activate"]
    );

    h.app.rotate_mode(names::SETTINGS);
    assert_eq!(h.app.active_mode_names(), vec![names::SETTINGS]);
    assert_eq!(
        h.take_journal(),
        vec!["settings:page1", "settings:update_pads", "settings:update_buttons"]
    );

    h.app.rotate_mode(names::SETTINGS);
    assert_eq!(h.app.active_mode_names(), vec![names::MELODIC]);
    assert_eq!(
        h.take_journal(),
        vec!["settings:page2", "settings:deactivate", "melodic:activate"]
    );

    // Next rotation starts from the first page again
    h.app.rotate_mode(names::SETTINGS);
    h.app.rotate_mode(names::SETTINGS);
    assert!(h.take_journal().contains(&"settings:page1".to_string()));
}

#[test]
fn test_connection_established_reinitializes() {
    let h = Harness::new();
    h.stub("a", None);
    h.stub("b", None);
    h.app.set_mode("a");
    h.app.set_mode("b");
    h.take_journal();

    assert!(h.app.dispatch(&InputEvent::ConnectionEstablished));

    assert_eq!(
        h.controller.calls(),
        vec![
            ControllerCall::ApplyPalette(Color::ALL.len()),
            ControllerCall::ResetAll(Color::IDLE),
        ]
    );
    assert_eq!(
        h.take_journal(),
        vec![
            "a:activate",
            "b:activate",
            "a:update_pads",
            "a:update_buttons",
            "b:update_pads",
            "b:update_buttons",
        ]
    );
}

#[test]
fn test_midi_in_all_channels_forwards_and_notifies() {
    let h = Harness::new();
    h.stub("a", None);
    h.stub("b", None);
    h.app.set_mode("a");
    h.app.set_mode("b");
    h.app.midi().configure_output(Some(SYNTH_OUT));
    h.take_journal();

    let message = MidiMessage::NoteOn {
        channel: 3,
        note: 60,
        velocity: 100,
    };
    h.app.on_midi_in(&message);

    assert_eq!(h.sent(), vec![vec![0x93, 60, 100]]);
    let expected = format!("midi_in({})", message);
    assert_eq!(
        h.take_journal(),
        vec![format!("a:{}", expected), format!("b:{}", expected)]
    );
}

#[test]
fn test_midi_in_filtered_channel_matching_policy() {
    let h = Harness::new();
    h.stub("a", None);
    h.app.set_mode("a");
    h.app.midi().configure_output(Some(SYNTH_OUT));
    h.app.midi().set_in_channel(5, false);
    h.take_journal();

    h.app.on_midi_in(&MidiMessage::NoteOn {
        channel: 2,
        note: 60,
        velocity: 100,
    });

    assert!(h.sent().is_empty());
    assert!(h.take_journal().is_empty());
}

#[test]
fn test_midi_in_filtered_channel_always_policy() {
    let settings = Settings {
        midi_in_notify: MidiInNotify::Always,
        ..Settings::default()
    };
    let h = Harness::with(settings, None, Project::default());
    h.stub("a", None);
    h.app.set_mode("a");
    h.app.midi().configure_output(Some(SYNTH_OUT));
    h.app.midi().set_in_channel(5, false);
    h.take_journal();

    h.app.on_midi_in(&MidiMessage::NoteOn {
        channel: 2,
        note: 60,
        velocity: 100,
    });

    assert!(h.sent().is_empty());
    assert_eq!(h.take_journal().len(), 1);
}

#[test]
fn test_tick_paints_and_runs_delayed_actions() {
    let h = Harness::new();
    h.stub("a", None);
    h.app.set_mode("a");
    h.take_journal();

    h.app.tick(Instant::now());

    let frame = h.display.last().unwrap();
    assert_eq!(frame.width, crate::display::DISPLAY_WIDTH);
    assert_eq!(frame.text_content(), "a");
    assert_eq!(h.take_journal(), vec!["a:delayed"]);
    assert_eq!(
        h.controller.calls(),
        vec![ControllerCall::CheckDelayedActions]
    );
}

#[test]
fn test_notification_expires() {
    let h = Harness::new();
    let start = Instant::now();
    h.app.notify_at("Saved", start);

    h.app.tick(start + Duration::from_millis(500));
    assert!(h.display.last().unwrap().text_content().contains("Saved"));
    assert!(h.app.notification().is_some());

    h.app.tick(start + NOTIFICATION_DURATION + Duration::from_millis(10));
    assert!(!h.display.last().unwrap().text_content().contains("Saved"));
    assert!(h.app.notification().is_none());
}

#[test]
fn test_display_disabled_skips_paint() {
    let settings = Settings {
        use_display: false,
        ..Settings::default()
    };
    let h = Harness::with(settings, None, Project::default());
    h.app.tick(Instant::now());
    assert!(h.display.frames.lock().is_empty());
}

#[test]
fn test_notification_expires_with_display_disabled() {
    let settings = Settings {
        use_display: false,
        ..Settings::default()
    };
    let h = Harness::with(settings, None, Project::default());
    let start = Instant::now();
    h.app.notify_at("Saved", start);

    h.app.tick(start + Duration::from_millis(500));
    assert!(h.app.notification().is_some());

    h.app.tick(start + NOTIFICATION_DURATION + Duration::from_millis(10));
    assert!(h.app.notification().is_none());
    assert!(h.display.frames.lock().is_empty());
}

#[test]
fn test_frame_rate_meter() {
    let mut meter = FrameRateMeter::new();
    let start = Instant::now();
    for i in 0..30 {
        assert_eq!(meter.tick(start + Duration::from_millis(i * 33)), None);
    }
    let rate = meter.tick(start + Duration::from_secs(1)).unwrap();
    assert!((rate - 31.0).abs() < 0.01);
    assert_eq!(meter.achieved(), Some(rate));
}

#[test]
fn test_frame_interval_follows_settings() {
    let h = Harness::new();
    assert_eq!(h.app.frame_interval(), Duration::from_secs_f64(1.0 / 60.0));
    h.app.settings_mut().target_frame_rate = 0;
    assert_eq!(h.app.frame_interval(), Duration::from_secs(1));
}

fn started(settings: Settings, project: Project) -> Harness {
    let h = Harness::with(
        Settings {
            default_midi_out_device_name: Some(SYNTH_OUT.to_string()),
            ..settings
        },
        None,
        project,
    );
    h.app.start();
    h
}

#[test]
fn test_start_activates_initial_modes() {
    let h = started(Settings::default(), Project::default());
    assert_eq!(
        h.app.active_mode_names(),
        vec![names::MAIN_CONTROLS, names::TRACK_SELECTION, names::MELODIC]
    );
    assert_eq!(h.app.midi().bound_output().as_deref(), Some(SYNTH_OUT));
}

#[test]
fn test_melodic_pad_plays_on_out_channel() {
    let settings = Settings {
        default_midi_out_channel: 2,
        ..Settings::default()
    };
    let h = started(settings, Project::default());

    let pad = Pad::from_coords(7, 0);
    h.app.dispatch(&InputEvent::PadPressed { pad, velocity: 90 });
    assert_eq!(h.sent(), vec![vec![0x92, 64, 90]]);
    assert_eq!(h.controller.pad_color(pad), Some(Color::Green));

    h.app.dispatch(&InputEvent::PadReleased { pad, velocity: 0 });
    assert_eq!(h.sent()[1], vec![0x82, 64, 0]);
    assert_eq!(h.controller.pad_color(pad), Some(Color::Blue));
}

#[test]
fn test_note_button_switches_pad_modes() {
    let h = started(Settings::default(), Project::default());

    h.app.dispatch(&press(buttons::NOTE));
    assert!(h.app.is_mode_active(names::RHYTHMIC));
    assert!(!h.app.is_mode_active(names::MELODIC));

    h.app.dispatch(&press(buttons::NOTE));
    assert!(h.app.is_mode_active(names::MELODIC));
}

#[test]
fn test_setup_button_rotates_settings() {
    let h = started(Settings::default(), Project::default());
    h.app.dispatch(&press(buttons::NOTE));

    h.app.dispatch(&press(buttons::SETUP));
    assert!(h.app.is_mode_active(names::SETTINGS));
    assert!(!h.app.is_mode_active(names::RHYTHMIC));

    h.app.dispatch(&press(buttons::SETUP));
    assert!(h.app.is_mode_active(names::SETTINGS));

    h.app.dispatch(&press(buttons::SETUP));
    assert!(!h.app.is_mode_active(names::SETTINGS));
    assert!(h.app.is_mode_active(names::RHYTHMIC));
}

#[test]
fn test_settings_encoder_wraps_in_channel() {
    let h = started(Settings::default(), Project::default());
    h.app.dispatch(&press(buttons::SETUP));

    h.app.dispatch(&InputEvent::EncoderRotated {
        encoder: crate::controller::encoders::TRACK[0].to_string(),
        delta: -1,
    });
    assert_eq!(h.app.midi().in_channel(), 15);
    assert_eq!(h.app.settings().default_midi_in_channel, 15);
}

#[test]
fn test_preset_selection_takes_pads() {
    let h = started(Settings::default(), Project::default());
    h.app.dispatch(&press(buttons::BROWSE));
    assert!(h.app.is_mode_active(names::PRESET_SELECTION));

    h.app.dispatch(&InputEvent::PadPressed {
        pad: Pad::from_index(3),
        velocity: 100,
    });
    assert_eq!(h.sent(), vec![vec![0xC0, 3]]);

    // Browse and Device share the buttons group
    h.app.dispatch(&press(buttons::DEVICE));
    assert!(h.app.is_mode_active(names::CC_EDITING));
    assert!(!h.app.is_mode_active(names::PRESET_SELECTION));
}

#[test]
fn test_held_pad_release_reaches_melodic_under_preset_selection() {
    let h = started(Settings::default(), Project::default());
    let pad = Pad::from_coords(7, 0);

    h.app.dispatch(&InputEvent::PadPressed { pad, velocity: 100 });
    h.app.dispatch(&press(buttons::BROWSE));
    assert!(h.app.is_mode_active(names::PRESET_SELECTION));

    h.app.dispatch(&InputEvent::PadAftertouch { pad, pressure: 127 });
    h.app.dispatch(&InputEvent::PadReleased { pad, velocity: 0 });
    h.app.dispatch(&press(buttons::BROWSE));

    assert_eq!(
        h.sent(),
        vec![vec![0x90, 64, 100], vec![0xA0, 64, 127], vec![0x80, 64, 0]]
    );
    assert!(!h.app.project().selected_track().is_note_being_played(64));
    assert_eq!(h.controller.pad_color(pad), Some(Color::Blue));
}

#[test]
fn test_preset_selection_consumes_its_own_pads() {
    let h = started(Settings::default(), Project::default());
    h.app.dispatch(&press(buttons::BROWSE));

    let pad = Pad::from_index(5);
    assert!(h.app.dispatch(&InputEvent::PadPressed { pad, velocity: 100 }));
    assert!(h.app.dispatch(&InputEvent::PadAftertouch { pad, pressure: 60 }));
    assert!(h.app.dispatch(&InputEvent::PadReleased { pad, velocity: 0 }));
    assert_eq!(h.sent(), vec![vec![0xC0, 5]]);
}

#[test]
fn test_settings_select_saves_on_last_page_only() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let h = Harness::with(Settings::default(), Some(path.clone()), Project::default());
    h.app.start();

    h.app.dispatch(&press(buttons::SETUP));
    assert!(!h.app.dispatch(&press(buttons::SELECT)));
    assert!(!path.exists());

    h.app.dispatch(&press(buttons::SETUP));
    assert!(h.app.dispatch(&press(buttons::SELECT)));
    assert!(path.exists());
    assert_eq!(
        h.controller.button_color(buttons::SELECT),
        Some(Color::White)
    );
}

#[test]
fn test_channel_pressure_skips_poly_curve() {
    let h = started(Settings::default(), Project::default());
    let pad = Pad::from_coords(7, 0);
    h.app.dispatch(&InputEvent::PadPressed { pad, velocity: 100 });

    // Default curve: 127 * (20 / 40) ^ 1.5
    h.app.dispatch(&InputEvent::PadAftertouch { pad, pressure: 20 });
    h.app.project_mut().selected_track_mut().use_poly_at = false;
    h.app.dispatch(&InputEvent::PadAftertouch { pad, pressure: 20 });

    assert_eq!(&h.sent()[1..], &[vec![0xA0, 64, 44], vec![0xD0, 20]]);
}

#[test]
fn test_sustain_pedal_sends_cc64() {
    let h = started(Settings::default(), Project::default());
    h.app.dispatch(&InputEvent::SustainPedal { on: true });
    h.app.dispatch(&InputEvent::SustainPedal { on: false });
    assert_eq!(h.sent(), vec![vec![0xB0, 64, 127], vec![0xB0, 64, 0]]);
}

#[test]
fn test_track_selection_applies_out_channel() {
    let mut project = Project::new("Live");
    let id = project.add_track("Bass");
    project.tracks[id].midi_channel_out = Some(5);
    let h = started(Settings::default(), project);

    h.app.dispatch(&press(buttons::UPPER_ROW[1]));
    assert_eq!(h.app.project().selected_index(), 1);
    assert_eq!(h.app.midi().out_channel(), 5);
    assert_eq!(
        h.controller.button_color(buttons::UPPER_ROW[1]),
        Some(Color::Green)
    );

    // No track behind the third button
    h.app.dispatch(&press(buttons::UPPER_ROW[2]));
    assert_eq!(h.app.project().selected_index(), 1);
}

#[test]
fn test_save_settings_includes_mode_exports() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    let h = Harness::with(Settings::default(), Some(path.clone()), Project::default());
    h.app.start();

    h.app.dispatch(&press(buttons::DEVICE));
    h.app.dispatch(&press(buttons::PAGE_RIGHT));
    h.app.save_settings().unwrap();

    let loaded = Settings::load(&path);
    assert_eq!(
        loaded.mode_settings.get("cc_editing_bank"),
        Some(&serde_json::json!(1))
    );
    assert_eq!(h.app.notification().map(|n| n.text).as_deref(), Some("Settings saved"));
}

#[tokio::test]
async fn test_run_loop_dispatches_and_stops_controller() {
    let h = Harness::new();
    h.stub("a", None);
    h.app.set_mode("a");
    h.take_journal();

    let (event_tx, event_rx) = mpsc::channel(8);
    let (midi_tx, midi_rx) = mpsc::channel(8);
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(h.app.clone().run(event_rx, midi_rx, async move {
        let _ = stop_rx.await;
    }));

    event_tx.send(press(buttons::PLAY)).await.unwrap();
    midi_tx
        .send(MidiMessage::ControlChange {
            channel: 0,
            cc: 7,
            value: 10,
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    stop_tx.send(()).unwrap();
    handle.await.unwrap();

    let journal = h.take_journal();
    assert!(journal.contains(&"a:button_pressed(play)".to_string()));
    assert!(journal.iter().any(|e| e.starts_with("a:midi_in")));
    assert!(journal.contains(&"a:delayed".to_string()));
    assert!(h.controller.is_stopped());
    assert!(!h.display.frames.lock().is_empty());
}
