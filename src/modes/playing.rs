//! Note playing shared by the melodic and rhythmic modes

use parking_lot::Mutex;
use std::collections::HashMap;

use crate::app::App;
use crate::controller::Pad;
use crate::midi::MidiMessage;
use crate::project::NoteSource;

/// Tracks which note each held pad is sounding.
///
/// The note is remembered at press time, so releasing a pad after the layout
/// changed (octave shift) still stops the right note.
#[derive(Default)]
pub(super) struct NotePlayer {
    held: Mutex<HashMap<Pad, u8>>,
}

impl NotePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, app: &App, pad: Pad, note: u8, velocity: u8) {
        let velocity = {
            let mut project = app.project_mut();
            let track = project.selected_track_mut();
            track.add_note_being_played(note, NoteSource::Pad);
            if track.fixed_velocity_mode {
                127
            } else {
                velocity
            }
        };
        self.held.lock().insert(pad, note);
        app.midi().send(
            &MidiMessage::NoteOn {
                channel: 0,
                note,
                velocity,
            },
            None,
        );
    }

    /// Stop the note held by `pad`; returns it
    pub fn release(&self, app: &App, pad: Pad) -> Option<u8> {
        let note = self.held.lock().remove(&pad)?;
        app.project_mut()
            .selected_track_mut()
            .remove_note_being_played(note, NoteSource::Pad);
        app.midi().send(
            &MidiMessage::NoteOff {
                channel: 0,
                note,
                velocity: 0,
            },
            None,
        );
        Some(note)
    }

    /// Stop every held note
    pub fn release_all(&self, app: &App) {
        let pads: Vec<Pad> = self.held.lock().keys().copied().collect();
        for pad in pads {
            self.release(app, pad);
        }
    }

    /// Poly aftertouch through the track's curve, or plain channel pressure
    pub fn aftertouch(&self, app: &App, pad: Pad, pressure: u8) {
        let Some(note) = self.held.lock().get(&pad).copied() else {
            return;
        };
        let pressure = pressure & 0x7F;
        let curve = {
            let project = app.project();
            let track = project.selected_track();
            track.use_poly_at.then(|| track.poly_at_curve())
        };

        let message = match curve {
            Some(curve) => MidiMessage::PolyPressure {
                channel: 0,
                note,
                pressure: curve[pressure as usize],
            },
            None => MidiMessage::ChannelPressure {
                channel: 0,
                pressure,
            },
        };
        app.midi().send(&message, None);
    }

    /// Record notes arriving from the MIDI input so pads can show them.
    /// Returns whether the set of sounding notes changed.
    pub fn track_midi_in(&self, app: &App, message: &MidiMessage) -> bool {
        let mut project = app.project_mut();
        let track = project.selected_track_mut();
        match *message {
            MidiMessage::NoteOn { note, .. } => {
                track.add_note_being_played(note, NoteSource::MidiIn);
                true
            }
            MidiMessage::NoteOff { note, .. } => {
                track.remove_note_being_played(note, NoteSource::MidiIn);
                true
            }
            _ => false,
        }
    }
}
