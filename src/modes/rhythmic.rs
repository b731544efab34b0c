//! Rhythmic playing: a 4x4 drum block in the bottom-left corner

use anyhow::Result;

use super::playing::NotePlayer;
use super::{groups, names, Mode};
use crate::app::App;
use crate::controller::{Color, Pad, GRID_SIZE};
use crate::display::Canvas;
use crate::midi::MidiMessage;

const FIRST_DRUM_NOTE: u8 = 36;
const BLOCK_SIZE: u8 = 4;

/// Drum note for `pad`; pads outside the block play nothing
pub fn drum_note(pad: Pad) -> Option<u8> {
    let rows_up = GRID_SIZE - 1 - pad.row;
    if rows_up >= BLOCK_SIZE || pad.col >= BLOCK_SIZE {
        return None;
    }
    Some(FIRST_DRUM_NOTE + rows_up * BLOCK_SIZE + pad.col)
}

pub struct RhythmicMode {
    player: NotePlayer,
}

impl RhythmicMode {
    pub fn new() -> Self {
        Self {
            player: NotePlayer::new(),
        }
    }
}

impl Default for RhythmicMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for RhythmicMode {
    fn name(&self) -> &str {
        names::RHYTHMIC
    }

    fn xor_group(&self) -> Option<&str> {
        Some(groups::PADS)
    }

    fn activate(&self, app: &App) {
        self.update_pads(app);
    }

    fn deactivate(&self, app: &App) {
        self.player.release_all(app);
    }

    fn paint(&self, _app: &App, canvas: &mut Canvas) {
        let (x, w) = canvas.column(0);
        canvas.fill_rect(x, 0, w, 20, Color::Yellow);
        canvas.draw_text(x + 4, 4, "Rhythmic", Color::Black);
    }

    fn update_pads(&self, app: &App) {
        let project = app.project();
        let track = project.selected_track();
        for pad in Pad::all() {
            let color = match drum_note(pad) {
                None => Color::IDLE,
                Some(note) if track.is_note_being_played(note) => Color::Green,
                Some(_) => Color::Yellow,
            };
            app.controller().set_pad_color(pad, color);
        }
    }

    fn on_pad_pressed(&self, app: &App, pad: Pad, velocity: u8) -> Result<bool> {
        if let Some(note) = drum_note(pad) {
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

    fn on_midi_in(&self, app: &App, message: &MidiMessage) -> Result<()> {
        if self.player.track_midi_in(app, message) {
            self.update_pads(app);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drum_block() {
        assert_eq!(drum_note(Pad::from_coords(7, 0)), Some(36));
        assert_eq!(drum_note(Pad::from_coords(7, 3)), Some(39));
        assert_eq!(drum_note(Pad::from_coords(4, 3)), Some(51));
        assert_eq!(drum_note(Pad::from_coords(3, 0)), None);
        assert_eq!(drum_note(Pad::from_coords(7, 4)), None);
    }
}
