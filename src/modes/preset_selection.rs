//! Preset selection: each pad sends a program change

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::HashSet;

use super::{groups, names, Mode};
use crate::app::App;
use crate::controller::{buttons, Color, Pad, PAD_COUNT};
use crate::display::Canvas;
use crate::midi::MidiMessage;

#[derive(Default)]
struct PresetState {
    /// Pads address programs 64-127 instead of 0-63
    upper_half: bool,
    current: Option<u8>,
    /// Pads pressed while this mode was on top; other pads belong to the pad
    /// mode underneath
    pressed: HashSet<Pad>,
}

pub struct PresetSelectionMode {
    state: Mutex<PresetState>,
}

impl PresetSelectionMode {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(PresetState::default()),
        }
    }

    fn program_for(&self, pad: Pad) -> u8 {
        let offset = if self.state.lock().upper_half {
            PAD_COUNT
        } else {
            0
        };
        offset + pad.index
    }

    pub fn current_program(&self) -> Option<u8> {
        self.state.lock().current
    }

    fn set_upper_half(&self, app: &App, upper_half: bool) {
        self.state.lock().upper_half = upper_half;
        app.notify(if upper_half {
            "Programs 65-128"
        } else {
            "Programs 1-64"
        });
        self.update_pads(app);
        self.update_buttons(app);
    }
}

impl Default for PresetSelectionMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for PresetSelectionMode {
    fn name(&self) -> &str {
        names::PRESET_SELECTION
    }

    fn xor_group(&self) -> Option<&str> {
        Some(groups::BUTTONS)
    }

    fn activate(&self, app: &App) {
        self.update_pads(app);
        self.update_buttons(app);
    }

    fn deactivate(&self, app: &App) {
        self.state.lock().pressed.clear();
        app.controller().set_button_color(buttons::PAGE_LEFT, Color::IDLE);
        app.controller().set_button_color(buttons::PAGE_RIGHT, Color::IDLE);
        // Hand the pads back to the pad mode underneath
        app.refresh_leds();
    }

    fn paint(&self, _app: &App, canvas: &mut Canvas) {
        let text = match self.current_program() {
            Some(program) => format!("Program {}", program as u16 + 1),
            None => "Program -".to_string(),
        };
        let (x, _) = canvas.column(1);
        canvas.draw_text(x + 4, 4, text, Color::Orange);
    }

    fn update_pads(&self, app: &App) {
        let current = self.current_program();
        for pad in Pad::all() {
            let color = if Some(self.program_for(pad)) == current {
                Color::Orange
            } else {
                Color::DarkGray
            };
            app.controller().set_pad_color(pad, color);
        }
    }

    fn update_buttons(&self, app: &App) {
        let upper_half = self.state.lock().upper_half;
        let lit = |on: bool| if on { Color::White } else { Color::DarkGray };
        app.controller()
            .set_button_color(buttons::PAGE_LEFT, lit(upper_half));
        app.controller()
            .set_button_color(buttons::PAGE_RIGHT, lit(!upper_half));
    }

    fn on_pad_pressed(&self, app: &App, pad: Pad, _velocity: u8) -> Result<bool> {
        let program = self.program_for(pad);
        {
            let mut state = self.state.lock();
            state.current = Some(program);
            state.pressed.insert(pad);
        }
        app.midi()
            .send(&MidiMessage::ProgramChange { channel: 0, program }, None);
        app.notify(format!("Program {}", program as u16 + 1));
        self.update_pads(app);
        Ok(true)
    }

    fn on_pad_released(&self, _app: &App, pad: Pad, _velocity: u8) -> Result<bool> {
        Ok(self.state.lock().pressed.remove(&pad))
    }

    fn on_pad_aftertouch(&self, _app: &App, pad: Pad, _pressure: u8) -> Result<bool> {
        Ok(self.state.lock().pressed.contains(&pad))
    }

    fn on_button_pressed(&self, app: &App, button: &str) -> Result<bool> {
        match button {
            buttons::PAGE_LEFT => self.set_upper_half(app, false),
            buttons::PAGE_RIGHT => self.set_upper_half(app, true),
            _ => return Ok(false),
        }
        Ok(true)
    }
}
