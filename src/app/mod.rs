//! Application state
//!
//! `App` is the single explicitly-constructed state shared by `Arc` between the
//! dispatcher, the MIDI router and the tick driver. The split files each add
//! one concern to it:
//! - `dispatch`: input events to the active modes, guarded per call
//! - `mode_stack`: set / unset / toggle / rotate
//! - `midi_in`: incoming MIDI to output and modes
//! - `reconnect`: controller (re)connection hook
//! - `tick`: paint, delayed actions and the cooperative run loop

mod dispatch;
mod midi_in;
mod mode_stack;
mod notification;
mod reconnect;
mod tick;

#[cfg(test)]
mod tests;

pub use notification::{Notification, NOTIFICATION_DURATION};
pub use tick::FrameRateMeter;

use anyhow::Result;
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Map;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::controller::Controller;
use crate::display::DisplaySink;
use crate::midi_io::MidiRouter;
use crate::modes::{Mode, ModeStack};
use crate::project::Project;

pub struct App {
    settings: RwLock<Settings>,
    settings_path: Option<PathBuf>,
    modes: Mutex<ModeStack>,
    midi: MidiRouter,
    controller: Arc<dyn Controller>,
    display: Mutex<Box<dyn DisplaySink>>,
    notification: Mutex<Option<Notification>>,
    frame_meter: Mutex<FrameRateMeter>,
    project: RwLock<Project>,
}

impl App {
    pub fn new(
        settings: Settings,
        settings_path: Option<PathBuf>,
        project: Project,
        midi: MidiRouter,
        controller: Arc<dyn Controller>,
        display: Box<dyn DisplaySink>,
    ) -> Self {
        Self {
            settings: RwLock::new(settings),
            settings_path,
            modes: Mutex::new(ModeStack::new()),
            midi,
            controller,
            display: Mutex::new(display),
            notification: Mutex::new(None),
            frame_meter: Mutex::new(FrameRateMeter::new()),
            project: RwLock::new(project),
        }
    }

    pub fn midi(&self) -> &MidiRouter {
        &self.midi
    }

    pub fn controller(&self) -> &Arc<dyn Controller> {
        &self.controller
    }

    pub fn settings(&self) -> RwLockReadGuard<'_, Settings> {
        self.settings.read()
    }

    pub fn settings_mut(&self) -> RwLockWriteGuard<'_, Settings> {
        self.settings.write()
    }

    pub fn project(&self) -> RwLockReadGuard<'_, Project> {
        self.project.read()
    }

    pub fn project_mut(&self) -> RwLockWriteGuard<'_, Project> {
        self.project.write()
    }

    /// Register a mode and hand it its saved settings
    pub fn register_mode(&self, mode: Arc<dyn Mode>) {
        mode.load_settings(&self.settings.read().mode_settings);
        if self.modes.lock().register(mode.clone()) {
            debug!("Registered mode '{}'", mode.name());
        }
    }

    pub fn mode(&self, name: &str) -> Option<Arc<dyn Mode>> {
        self.modes.lock().registry().get(name)
    }

    pub fn is_mode_active(&self, name: &str) -> bool {
        self.modes.lock().is_active(name)
    }

    /// Snapshot of the active modes in activation order
    pub fn active_modes(&self) -> Vec<Arc<dyn Mode>> {
        self.modes.lock().active_modes()
    }

    pub fn active_mode_names(&self) -> Vec<String> {
        self.modes.lock().registry().active_names()
    }

    /// Apply the configured MIDI channels and devices to the router
    pub fn apply_midi_settings(&self) {
        let settings = self.settings.read().clone();
        self.midi
            .set_in_channel(settings.default_midi_in_channel as i32, false);
        self.midi
            .set_out_channel(settings.default_midi_out_channel as i32, false);
        self.midi
            .configure_input(settings.default_midi_in_device_name.as_deref());
        self.midi
            .configure_output(settings.default_midi_out_device_name.as_deref());
    }

    /// Register the built-in modes, activate the initial set and bind MIDI
    pub fn start(&self) {
        for mode in crate::modes::default_modes() {
            self.register_mode(mode);
        }
        self.apply_midi_settings();
        for name in crate::modes::INITIAL_MODES {
            self.set_mode(name);
        }
        info!("Active modes: {:?}", self.active_mode_names());
    }

    /// Select a track and route MIDI out to its device and channel
    pub fn select_track(&self, index: usize) -> bool {
        let (device, channel, name) = {
            let mut project = self.project.write();
            if !project.select_track(index) {
                return false;
            }
            let track = project.selected_track();
            (
                track.midi_device_out.clone(),
                track.midi_channel_out,
                track.name.clone(),
            )
        };

        if let Some(channel) = channel {
            self.midi.set_out_channel(channel as i32, false);
        }
        if device.is_some() && device != self.midi.bound_output() {
            self.midi.configure_output(device.as_deref());
        }
        self.notify(format!("Track: {}", name));
        true
    }

    /// Write settings plus every mode's exports to the settings file
    pub fn save_settings(&self) -> Result<()> {
        let Some(path) = &self.settings_path else {
            warn!("No settings path, not saving");
            return Ok(());
        };

        let mut exports = Map::new();
        for mode in self.modes.lock().registry().all_modes() {
            exports.extend(mode.export_settings());
        }

        self.settings.read().save(path, &exports)?;
        self.notify("Settings saved");
        Ok(())
    }
}
