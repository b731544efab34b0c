//! Settings pages
//!
//! Page 1 edits MIDI routing (channels wrap around, devices cycle through the
//! available names); page 2 edits the frame rate and the display flag. Select
//! on page 2 saves the settings document.

use anyhow::Result;
use parking_lot::Mutex;

use super::{groups, names, Mode};
use crate::app::App;
use crate::config::MAX_FRAME_RATE;
use crate::controller::{buttons, encoders, Color, Pad};
use crate::display::Canvas;
use crate::midi_io::ALL_CHANNELS;

const PAGE_COUNT: usize = 2;

/// Next name when stepping through `names` by the sign of `delta`.
/// Starts at either end when `current` is not in the list.
fn cycle(names: &[String], current: Option<&str>, delta: i32) -> Option<String> {
    if names.is_empty() || delta == 0 {
        return None;
    }
    let len = names.len() as i32;
    let index = match current.and_then(|c| names.iter().position(|n| n == c)) {
        Some(pos) => (pos as i32 + delta.signum()).rem_euclid(len),
        None if delta > 0 => 0,
        None => len - 1,
    };
    names.get(index as usize).cloned()
}

fn channel_label(channel: i8) -> String {
    if channel == ALL_CHANNELS {
        "All".to_string()
    } else {
        (channel as i32 + 1).to_string()
    }
}

pub struct SettingsMode {
    page: Mutex<usize>,
}

impl SettingsMode {
    pub fn new() -> Self {
        Self {
            page: Mutex::new(0),
        }
    }

    pub fn page(&self) -> usize {
        *self.page.lock()
    }

    fn edit_routing(&self, app: &App, index: usize, delta: i32) {
        let midi = app.midi();
        match index {
            0 => {
                let channel = midi.set_in_channel(midi.in_channel() as i32 + delta, true);
                app.settings_mut().default_midi_in_channel = channel;
            }
            1 => {
                let channel = midi.set_out_channel(midi.out_channel() as i32 + delta, true);
                app.settings_mut().default_midi_out_channel = channel;
            }
            2 => {
                let current = midi.input_status();
                let current = current.bound.or(current.attempted);
                if let Some(name) = cycle(&midi.available_inputs(), current.as_deref(), delta) {
                    midi.configure_input(Some(&name));
                    app.settings_mut().default_midi_in_device_name = Some(name);
                }
            }
            3 => {
                let current = midi.output_status();
                let current = current.bound.or(current.attempted);
                if let Some(name) = cycle(&midi.available_outputs(), current.as_deref(), delta) {
                    midi.configure_output(Some(&name));
                    app.settings_mut().default_midi_out_device_name = Some(name);
                }
            }
            _ => {}
        }
    }

    fn edit_display(&self, app: &App, index: usize, delta: i32) {
        let mut settings = app.settings_mut();
        match index {
            0 => {
                settings.target_frame_rate = (settings.target_frame_rate as i32 + delta)
                    .clamp(1, MAX_FRAME_RATE as i32) as u32;
            }
            1 if delta != 0 => settings.use_display = !settings.use_display,
            _ => {}
        }
    }

    fn paint_routing(&self, app: &App, canvas: &mut Canvas) {
        let midi = app.midi();
        let none = || "-".to_string();
        let columns = [
            ("In ch", channel_label(midi.in_channel())),
            ("Out ch", (midi.out_channel() as u16 + 1).to_string()),
            ("In dev", midi.bound_input().unwrap_or_else(none)),
            ("Out dev", midi.bound_output().unwrap_or_else(none)),
        ];
        Self::paint_columns(canvas, &columns);
    }

    fn paint_display(&self, app: &App, canvas: &mut Canvas) {
        let (target, use_display) = {
            let settings = app.settings();
            (settings.target_frame_rate, settings.use_display)
        };
        let achieved = app
            .achieved_frame_rate()
            .map_or_else(|| "-".to_string(), |r| format!("{:.0}", r));
        let columns = [
            ("FPS", format!("{} ({})", target, achieved)),
            ("Display", if use_display { "On" } else { "Off" }.to_string()),
            ("", String::new()),
            ("Save", "Select".to_string()),
        ];
        Self::paint_columns(canvas, &columns);
    }

    fn paint_columns(canvas: &mut Canvas, columns: &[(&str, String)]) {
        for (i, (label, value)) in columns.iter().enumerate() {
            let (x, _) = canvas.column(i);
            canvas.draw_text(x + 4, 24, *label, Color::LightGray);
            canvas.draw_text(x + 4, 44, value.clone(), Color::White);
        }
    }
}

impl Default for SettingsMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for SettingsMode {
    fn name(&self) -> &str {
        names::SETTINGS
    }

    fn xor_group(&self) -> Option<&str> {
        Some(groups::PADS)
    }

    fn activate(&self, app: &App) {
        self.update_pads(app);
        self.update_buttons(app);
    }

    fn deactivate(&self, app: &App) {
        app.controller().set_button_color(buttons::SELECT, Color::IDLE);
    }

    fn next_page(&self) -> bool {
        let mut page = self.page.lock();
        *page += 1;
        *page >= PAGE_COUNT
    }

    fn reset_pages(&self) {
        *self.page.lock() = 0;
    }

    fn paint(&self, app: &App, canvas: &mut Canvas) {
        canvas.fill(Color::Black);
        canvas.draw_text(
            4,
            4,
            format!("Settings {}/{}", self.page() + 1, PAGE_COUNT),
            Color::White,
        );
        match self.page() {
            0 => self.paint_routing(app, canvas),
            _ => self.paint_display(app, canvas),
        }
    }

    fn update_pads(&self, app: &App) {
        for pad in Pad::all() {
            app.controller().set_pad_color(pad, Color::IDLE);
        }
    }

    fn update_buttons(&self, app: &App) {
        let color = if self.page() == PAGE_COUNT - 1 {
            Color::White
        } else {
            Color::DarkGray
        };
        app.controller().set_button_color(buttons::SELECT, color);
    }

    fn on_encoder_rotated(&self, app: &App, encoder: &str, delta: i32) -> Result<bool> {
        let Some(index) = encoders::track_index(encoder) else {
            return Ok(false);
        };
        match self.page() {
            0 => self.edit_routing(app, index, delta),
            _ => self.edit_display(app, index, delta),
        }
        Ok(true)
    }

    fn on_button_pressed(&self, app: &App, button: &str) -> Result<bool> {
        // Select is lit, and saves, on the last page only
        if button != buttons::SELECT || self.page() != PAGE_COUNT - 1 {
            return Ok(false);
        }
        app.save_settings()?;
        Ok(true)
    }

    fn on_pad_pressed(&self, _app: &App, _pad: Pad, _velocity: u8) -> Result<bool> {
        Ok(true)
    }

    fn on_pad_released(&self, _app: &App, _pad: Pad, _velocity: u8) -> Result<bool> {
        Ok(true)
    }
}
