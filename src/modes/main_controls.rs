//! Global buttons that switch between modes, plus the sustain pedal

use anyhow::Result;

use super::{names, Mode};
use crate::app::App;
use crate::controller::{buttons, Color};
use crate::midi::MidiMessage;

const SUSTAIN_CC: u8 = 64;

pub struct MainControlsMode;

impl MainControlsMode {
    pub fn new() -> Self {
        Self
    }

    fn indicator(app: &App, mode: &str) -> Color {
        if app.is_mode_active(mode) {
            Color::White
        } else {
            Color::DarkGray
        }
    }
}

impl Default for MainControlsMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for MainControlsMode {
    fn name(&self) -> &str {
        names::MAIN_CONTROLS
    }

    fn activate(&self, app: &App) {
        self.update_buttons(app);
    }

    fn update_buttons(&self, app: &App) {
        let controller = app.controller();
        controller.set_button_color(buttons::NOTE, Color::White);
        controller.set_button_color(buttons::SETUP, Self::indicator(app, names::SETTINGS));
        controller.set_button_color(
            buttons::BROWSE,
            Self::indicator(app, names::PRESET_SELECTION),
        );
        controller.set_button_color(buttons::DEVICE, Self::indicator(app, names::CC_EDITING));
    }

    fn on_button_pressed(&self, app: &App, button: &str) -> Result<bool> {
        match button {
            buttons::NOTE => app.toggle_melodic_rhythmic(),
            buttons::SETUP => app.rotate_mode(names::SETTINGS),
            buttons::BROWSE => app.toggle_mode(names::PRESET_SELECTION),
            buttons::DEVICE => app.toggle_mode(names::CC_EDITING),
            _ => return Ok(false),
        }
        self.update_buttons(app);
        Ok(true)
    }

    fn on_sustain_pedal(&self, app: &App, on: bool) -> Result<bool> {
        app.midi().send(
            &MidiMessage::ControlChange {
                channel: 0,
                cc: SUSTAIN_CC,
                value: if on { 127 } else { 0 },
            },
            None,
        );
        Ok(true)
    }
}
