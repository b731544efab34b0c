//! CC editing: the eight track encoders edit a bank of eight controllers

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};

use super::{groups, names, Mode};
use crate::app::App;
use crate::controller::{buttons, encoders, Color};
use crate::display::{Canvas, DISPLAY_COLUMNS};
use crate::midi::MidiMessage;

const BANK_SIZE: usize = 8;
const BANK_COUNT: usize = 128 / BANK_SIZE;
const SETTINGS_KEY: &str = "cc_editing_bank";

struct CcState {
    bank: usize,
    values: [u8; 128],
}

pub struct CcEditingMode {
    state: Mutex<CcState>,
}

impl CcEditingMode {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CcState {
                bank: 0,
                values: [0; 128],
            }),
        }
    }

    pub fn bank(&self) -> usize {
        self.state.lock().bank
    }

    pub fn value(&self, cc: u8) -> u8 {
        self.state.lock().values[(cc & 0x7F) as usize]
    }

    fn change_bank(&self, app: &App, step: i32) {
        let bank = {
            let mut state = self.state.lock();
            state.bank = (state.bank as i32 + step).clamp(0, BANK_COUNT as i32 - 1) as usize;
            state.bank
        };
        app.notify(format!(
            "CC {}-{}",
            bank * BANK_SIZE,
            bank * BANK_SIZE + BANK_SIZE - 1
        ));
        self.update_buttons(app);
    }
}

impl Default for CcEditingMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for CcEditingMode {
    fn name(&self) -> &str {
        names::CC_EDITING
    }

    fn xor_group(&self) -> Option<&str> {
        Some(groups::BUTTONS)
    }

    fn activate(&self, app: &App) {
        self.update_buttons(app);
    }

    fn deactivate(&self, app: &App) {
        app.controller().set_button_color(buttons::PAGE_LEFT, Color::IDLE);
        app.controller().set_button_color(buttons::PAGE_RIGHT, Color::IDLE);
    }

    fn load_settings(&self, settings: &Map<String, Value>) {
        if let Some(bank) = settings.get(SETTINGS_KEY).and_then(Value::as_u64) {
            self.state.lock().bank = (bank as usize).min(BANK_COUNT - 1);
        }
    }

    fn export_settings(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(SETTINGS_KEY.to_string(), json!(self.bank()));
        map
    }

    fn paint(&self, _app: &App, canvas: &mut Canvas) {
        let state = self.state.lock();
        let bar_height = canvas.height() / 2;
        for i in 0..DISPLAY_COLUMNS {
            let cc = state.bank * BANK_SIZE + i;
            let value = state.values[cc] as usize;
            let (x, w) = canvas.column(i);
            canvas.draw_text(x + 4, 24, format!("CC{}", cc), Color::White);
            canvas.draw_text(x + 4, 44, value.to_string(), Color::LightGray);

            let filled = bar_height * value / 127;
            canvas.fill_rect(x + 4, 60 + bar_height - filled, w / 4, filled, Color::Cyan);
        }
    }

    fn update_buttons(&self, app: &App) {
        let bank = self.bank();
        let lit = |on: bool| if on { Color::White } else { Color::DarkGray };
        app.controller()
            .set_button_color(buttons::PAGE_LEFT, lit(bank > 0));
        app.controller()
            .set_button_color(buttons::PAGE_RIGHT, lit(bank < BANK_COUNT - 1));
    }

    fn on_encoder_rotated(&self, app: &App, encoder: &str, delta: i32) -> Result<bool> {
        let Some(index) = encoders::track_index(encoder) else {
            return Ok(false);
        };
        let (cc, value) = {
            let mut state = self.state.lock();
            let cc = state.bank * BANK_SIZE + index;
            let value = (state.values[cc] as i32 + delta).clamp(0, 127) as u8;
            state.values[cc] = value;
            (cc as u8, value)
        };
        app.midi().send(
            &MidiMessage::ControlChange {
                channel: 0,
                cc,
                value,
            },
            None,
        );
        Ok(true)
    }

    fn on_button_pressed(&self, app: &App, button: &str) -> Result<bool> {
        match button {
            buttons::PAGE_LEFT => self.change_bank(app, -1),
            buttons::PAGE_RIGHT => self.change_bank(app, 1),
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn on_midi_in(&self, _app: &App, message: &MidiMessage) -> Result<()> {
        if let MidiMessage::ControlChange { cc, value, .. } = *message {
            self.state.lock().values[(cc & 0x7F) as usize] = value;
        }
        Ok(())
    }
}
