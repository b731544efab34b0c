//! Modes: composable input/output behaviors
//!
//! A mode is created once at startup and lives for the whole process; it is
//! only ever activated and deactivated. Modes that share an xor group are
//! mutually exclusive (see [`xor::ModeStack`]).
//!
//! Every method takes `&self`; modes keep their mutable state behind a
//! `parking_lot::Mutex` so they can be shared as `Arc<dyn Mode>` and called
//! from a snapshot of the active list.

pub mod registry;
pub mod xor;

mod cc_editing;
mod main_controls;
mod melodic;
mod playing;
mod preset_selection;
mod rhythmic;
mod settings;
mod track_selection;

#[cfg(test)]
pub mod stub;

pub use cc_editing::CcEditingMode;
pub use main_controls::MainControlsMode;
pub use melodic::MelodicMode;
pub use preset_selection::PresetSelectionMode;
pub use registry::ModeRegistry;
pub use rhythmic::RhythmicMode;
pub use settings::SettingsMode;
pub use track_selection::TrackSelectionMode;
pub use xor::{ModeStack, Transition};

use anyhow::Result;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::app::App;
use crate::controller::Pad;
use crate::display::Canvas;
use crate::midi::MidiMessage;

/// Mode identities
pub mod names {
    pub const MAIN_CONTROLS: &str = "main_controls";
    pub const TRACK_SELECTION: &str = "track_selection";
    pub const MELODIC: &str = "melodic";
    pub const RHYTHMIC: &str = "rhythmic";
    pub const CC_EDITING: &str = "cc_editing";
    pub const PRESET_SELECTION: &str = "preset_selection";
    pub const SETTINGS: &str = "settings";
}

/// Xor group tags
pub mod groups {
    pub const PADS: &str = "pads";
    pub const BUTTONS: &str = "buttons";
}

/// A unit of behavior composed into the active-mode list.
///
/// Input handlers return `Ok(true)` when the event was handled, which stops
/// propagation to modes activated earlier. Errors (and panics) are caught by
/// the dispatcher and count as "not handled".
#[allow(unused_variables)]
pub trait Mode: Send + Sync {
    /// Stable identity
    fn name(&self) -> &str;

    /// Exclusivity group, `None` for modes that coexist freely
    fn xor_group(&self) -> Option<&str> {
        None
    }

    fn activate(&self, app: &App) {}

    fn deactivate(&self, app: &App) {}

    /// Advance the page cursor of a multi-page mode. Returns true once the last
    /// page has been passed and the mode should be unset.
    fn next_page(&self) -> bool {
        true
    }

    /// Rewind the page cursor to the first page
    fn reset_pages(&self) {}

    /// Restore mode settings from the settings document
    fn load_settings(&self, settings: &Map<String, Value>) {}

    /// Settings merged into the document on save
    fn export_settings(&self) -> Map<String, Value> {
        Map::new()
    }

    fn paint(&self, app: &App, canvas: &mut Canvas) {}

    /// Periodic work, once per tick
    fn check_delayed_actions(&self, app: &App) {}

    /// Push pad LED state to the controller
    fn update_pads(&self, app: &App) {}

    /// Push button LED state to the controller
    fn update_buttons(&self, app: &App) {}

    fn on_encoder_rotated(&self, app: &App, encoder: &str, delta: i32) -> Result<bool> {
        Ok(false)
    }

    fn on_pad_pressed(&self, app: &App, pad: Pad, velocity: u8) -> Result<bool> {
        Ok(false)
    }

    fn on_pad_released(&self, app: &App, pad: Pad, velocity: u8) -> Result<bool> {
        Ok(false)
    }

    fn on_pad_aftertouch(&self, app: &App, pad: Pad, pressure: u8) -> Result<bool> {
        Ok(false)
    }

    fn on_button_pressed(&self, app: &App, button: &str) -> Result<bool> {
        Ok(false)
    }

    fn on_button_released(&self, app: &App, button: &str) -> Result<bool> {
        Ok(false)
    }

    fn on_touchstrip(&self, app: &App, value: u16) -> Result<bool> {
        Ok(false)
    }

    fn on_sustain_pedal(&self, app: &App, on: bool) -> Result<bool> {
        Ok(false)
    }

    /// Raw message from the MIDI input device
    fn on_midi_in(&self, app: &App, message: &MidiMessage) -> Result<()> {
        Ok(())
    }
}

/// Every built-in mode, in registration order
pub fn default_modes() -> Vec<Arc<dyn Mode>> {
    vec![
        Arc::new(MainControlsMode::new()),
        Arc::new(TrackSelectionMode::new()),
        Arc::new(MelodicMode::new()),
        Arc::new(RhythmicMode::new()),
        Arc::new(CcEditingMode::new()),
        Arc::new(PresetSelectionMode::new()),
        Arc::new(SettingsMode::new()),
    ]
}

/// Modes active right after startup, in activation order
pub const INITIAL_MODES: [&str; 3] = [names::MAIN_CONTROLS, names::TRACK_SELECTION, names::MELODIC];
