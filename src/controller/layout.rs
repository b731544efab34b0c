//! Hardware layout: raw controller MIDI <-> input events and LED messages
//!
//! Pads are notes 36-99 (bottom-left pad is 36), buttons and encoders are CCs,
//! the touch strip sends pitch bend and the foot pedal sends CC 64.

use super::{buttons, encoders, Color, InputEvent, Pad, GRID_SIZE, PAD_COUNT};
use crate::midi::MidiMessage;

const FIRST_PAD_NOTE: u8 = 36;
const SUSTAIN_CC: u8 = 64;

/// Manufacturer / device prefix for palette SysEx
const SYSEX_HEADER: [u8; 6] = [0x00, 0x21, 0x1D, 0x01, 0x01, 0x03];
const SYSEX_REAPPLY_PALETTE: [u8; 6] = [0x00, 0x21, 0x1D, 0x01, 0x01, 0x05];

const BUTTON_CCS: &[(u8, &str)] = &[
    (30, buttons::SETUP),
    (48, buttons::SELECT),
    (49, buttons::SHIFT),
    (50, buttons::NOTE),
    (54, buttons::OCTAVE_DOWN),
    (55, buttons::OCTAVE_UP),
    (62, buttons::PAGE_LEFT),
    (63, buttons::PAGE_RIGHT),
    (85, buttons::PLAY),
    (86, buttons::RECORD),
    (110, buttons::DEVICE),
    (111, buttons::BROWSE),
];

const ENCODER_CCS: &[(u8, &str)] = &[
    (14, encoders::TEMPO),
    (15, encoders::SWING),
    (79, encoders::MASTER),
];

const UPPER_ROW_FIRST_CC: u8 = 102;
const LOWER_ROW_FIRST_CC: u8 = 20;
const TRACK_ENCODER_FIRST_CC: u8 = 71;

/// Button name for a CC number
pub fn button_for_cc(cc: u8) -> Option<&'static str> {
    if let Some((_, name)) = BUTTON_CCS.iter().find(|(c, _)| *c == cc) {
        return Some(*name);
    }
    match cc {
        102..=109 => Some(buttons::UPPER_ROW[(cc - UPPER_ROW_FIRST_CC) as usize]),
        20..=27 => Some(buttons::LOWER_ROW[(cc - LOWER_ROW_FIRST_CC) as usize]),
        _ => None,
    }
}

/// CC number for a button name
pub fn cc_for_button(name: &str) -> Option<u8> {
    if let Some((cc, _)) = BUTTON_CCS.iter().find(|(_, n)| *n == name) {
        return Some(*cc);
    }
    if let Some(i) = buttons::UPPER_ROW.iter().position(|n| *n == name) {
        return Some(UPPER_ROW_FIRST_CC + i as u8);
    }
    buttons::LOWER_ROW
        .iter()
        .position(|n| *n == name)
        .map(|i| LOWER_ROW_FIRST_CC + i as u8)
}

/// Every button known to the layout
pub fn all_buttons() -> impl Iterator<Item = &'static str> {
    BUTTON_CCS
        .iter()
        .map(|(_, name)| *name)
        .chain(buttons::UPPER_ROW)
        .chain(buttons::LOWER_ROW)
}

fn encoder_for_cc(cc: u8) -> Option<&'static str> {
    if let Some((_, name)) = ENCODER_CCS.iter().find(|(c, _)| *c == cc) {
        return Some(*name);
    }
    match cc {
        71..=78 => Some(encoders::TRACK[(cc - TRACK_ENCODER_FIRST_CC) as usize]),
        _ => None,
    }
}

/// Pad for an incoming note number
pub fn pad_for_note(note: u8) -> Option<Pad> {
    let offset = note.checked_sub(FIRST_PAD_NOTE)?;
    if offset >= PAD_COUNT {
        return None;
    }
    let row = GRID_SIZE - 1 - offset / GRID_SIZE;
    Some(Pad::from_coords(row, offset % GRID_SIZE))
}

/// Note number that addresses a pad
pub fn note_for_pad(pad: Pad) -> u8 {
    FIRST_PAD_NOTE + (GRID_SIZE - 1 - pad.row) * GRID_SIZE + pad.col
}

/// Relative encoder value (two's complement, 7 bit) to a signed delta
fn encoder_delta(value: u8) -> i32 {
    if value < 64 {
        value as i32
    } else {
        value as i32 - 128
    }
}

/// Translate a raw message from the controller into an input event
pub fn translate(message: &MidiMessage) -> Option<InputEvent> {
    match *message {
        MidiMessage::NoteOn { note, velocity, .. } => {
            pad_for_note(note).map(|pad| InputEvent::PadPressed { pad, velocity })
        }
        MidiMessage::NoteOff { note, velocity, .. } => {
            pad_for_note(note).map(|pad| InputEvent::PadReleased { pad, velocity })
        }
        MidiMessage::PolyPressure { note, pressure, .. } => {
            pad_for_note(note).map(|pad| InputEvent::PadAftertouch { pad, pressure })
        }
        MidiMessage::ControlChange { cc, value, .. } => {
            if cc == SUSTAIN_CC {
                return Some(InputEvent::SustainPedal { on: value >= 64 });
            }
            if let Some(encoder) = encoder_for_cc(cc) {
                return Some(InputEvent::EncoderRotated {
                    encoder: encoder.to_string(),
                    delta: encoder_delta(value),
                });
            }
            let button = button_for_cc(cc)?.to_string();
            if value > 0 {
                Some(InputEvent::ButtonPressed { button })
            } else {
                Some(InputEvent::ButtonReleased { button })
            }
        }
        MidiMessage::PitchBend { value, .. } => Some(InputEvent::TouchStrip { value }),
        _ => None,
    }
}

/// LED message for a pad
pub fn pad_color_message(pad: Pad, color: Color) -> MidiMessage {
    MidiMessage::NoteOn {
        channel: 0,
        note: note_for_pad(pad),
        velocity: color.palette_index(),
    }
}

/// LED message for a button
pub fn button_color_message(button: &str, color: Color) -> Option<MidiMessage> {
    cc_for_button(button).map(|cc| MidiMessage::ControlChange {
        channel: 0,
        cc,
        value: color.palette_index(),
    })
}

/// SysEx messages that upload the palette and re-apply it
pub fn palette_messages(palette: &[Color]) -> Vec<MidiMessage> {
    let split = |v: u8| [v & 0x7F, v >> 7];

    let mut messages: Vec<MidiMessage> = palette
        .iter()
        .map(|color| {
            let (r, g, b) = color.rgb();
            let mut data = SYSEX_HEADER.to_vec();
            data.push(color.palette_index());
            data.extend_from_slice(&split(r));
            data.extend_from_slice(&split(g));
            data.extend_from_slice(&split(b));
            // White LED channel follows the brightest component
            data.extend_from_slice(&split(r.max(g).max(b)));
            MidiMessage::SysEx { data }
        })
        .collect();

    messages.push(MidiMessage::SysEx {
        data: SYSEX_REAPPLY_PALETTE.to_vec(),
    });
    messages
}
