//! Melodic playing: the grid as an isomorphic keyboard
//!
//! The bottom-left pad plays the selected track's root note; moving right
//! adds a semitone and moving up adds a fourth.

use anyhow::Result;

use super::playing::NotePlayer;
use super::{groups, names, Mode};
use crate::app::App;
use crate::controller::{buttons, Color, Pad, GRID_SIZE};
use crate::display::Canvas;
use crate::midi::{note_name, MidiMessage};

const ROW_INTERVAL: i32 = 5;
const OCTAVE: i32 = 12;
const MOD_WHEEL_CC: u8 = 1;

/// Note played by `pad` for a given root, if inside the MIDI range
pub fn pad_note(pad: Pad, root: u8) -> Option<u8> {
    let rows_up = (GRID_SIZE - 1 - pad.row) as i32;
    let note = root as i32 + rows_up * ROW_INTERVAL + pad.col as i32;
    u8::try_from(note).ok().filter(|n| *n <= 127)
}

pub struct MelodicMode {
    player: NotePlayer,
}

impl MelodicMode {
    pub fn new() -> Self {
        Self {
            player: NotePlayer::new(),
        }
    }

    fn root(app: &App) -> u8 {
        app.project().selected_track().root_midi_note
    }

    fn shift_octave(&self, app: &App, octaves: i32) {
        let root = {
            let mut project = app.project_mut();
            let track = project.selected_track_mut();
            track.set_root_midi_note(track.root_midi_note as i32 + octaves * OCTAVE);
            track.root_midi_note
        };
        app.notify(format!("Root: {}", note_name(root)));
        self.update_pads(app);
    }
}

impl Default for MelodicMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for MelodicMode {
    fn name(&self) -> &str {
        names::MELODIC
    }

    fn xor_group(&self) -> Option<&str> {
        Some(groups::PADS)
    }

    fn activate(&self, app: &App) {
        self.update_pads(app);
        self.update_buttons(app);
    }

    fn deactivate(&self, app: &App) {
        self.player.release_all(app);
        app.controller().set_button_color(buttons::OCTAVE_UP, Color::IDLE);
        app.controller().set_button_color(buttons::OCTAVE_DOWN, Color::IDLE);
    }

    fn paint(&self, app: &App, canvas: &mut Canvas) {
        let (x, w) = canvas.column(0);
        let root = Self::root(app);
        canvas.fill_rect(x, 0, w, 20, Color::Blue);
        canvas.draw_text(x + 4, 4, "Melodic", Color::White);
        canvas.draw_text(x + 4, 30, format!("Root {}", note_name(root)), Color::White);
    }

    fn update_pads(&self, app: &App) {
        let project = app.project();
        let track = project.selected_track();
        let root = track.root_midi_note;
        for pad in Pad::all() {
            let color = match pad_note(pad, root) {
                None => Color::IDLE,
                Some(note) if track.is_note_being_played(note) => Color::Green,
                Some(note) if note % 12 == root % 12 => Color::Blue,
                Some(_) => Color::LightGray,
            };
            app.controller().set_pad_color(pad, color);
        }
    }

    fn update_buttons(&self, app: &App) {
        app.controller().set_button_color(buttons::OCTAVE_UP, Color::White);
        app.controller().set_button_color(buttons::OCTAVE_DOWN, Color::White);
    }

    fn on_pad_pressed(&self, app: &App, pad: Pad, velocity: u8) -> Result<bool> {
        if let Some(note) = pad_note(pad, Self::root(app)) {
            self.player.press(app, pad, note, velocity);
            self.update_pads(app);
        }
        Ok(true)
    }

    fn on_pad_released(&self, app: &App, pad: Pad, _velocity: u8) -> Result<bool> {
        if self.player.release(app, pad).is_some() {
            self.update_pads(app);
        }
        Ok(true)
    }

    fn on_pad_aftertouch(&self, app: &App, pad: Pad, pressure: u8) -> Result<bool> {
        self.player.aftertouch(app, pad, pressure);
        Ok(true)
    }

    fn on_button_pressed(&self, app: &App, button: &str) -> Result<bool> {
        match button {
            buttons::OCTAVE_UP => self.shift_octave(app, 1),
            buttons::OCTAVE_DOWN => self.shift_octave(app, -1),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn on_touchstrip(&self, app: &App, value: u16) -> Result<bool> {
        let mod_wheel = app.project().selected_track().modulation_wheel_mode;
        let message = if mod_wheel {
            MidiMessage::ControlChange {
                channel: 0,
                cc: MOD_WHEEL_CC,
                value: (value >> 7).min(127) as u8,
            }
        } else {
            MidiMessage::PitchBend {
                channel: 0,
                value: value.min(16383),
            }
        };
        app.midi().send(&message, None);
        Ok(true)
    }

    fn on_midi_in(&self, app: &App, message: &MidiMessage) -> Result<()> {
        if self.player.track_midi_in(app, message) {
            self.update_pads(app);
        }
        Ok(())
    }
}
