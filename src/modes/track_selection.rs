//! Track selection with the upper button row

use anyhow::Result;

use super::{names, Mode};
use crate::app::App;
use crate::controller::{buttons, Color};
use crate::display::{Canvas, DISPLAY_COLUMNS};

pub struct TrackSelectionMode;

impl TrackSelectionMode {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TrackSelectionMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for TrackSelectionMode {
    fn name(&self) -> &str {
        names::TRACK_SELECTION
    }

    fn activate(&self, app: &App) {
        self.update_buttons(app);
    }

    fn deactivate(&self, app: &App) {
        for button in buttons::UPPER_ROW {
            app.controller().set_button_color(button, Color::IDLE);
        }
    }

    fn paint(&self, app: &App, canvas: &mut Canvas) {
        let project = app.project();
        let selected = project.selected_index();
        let bottom = canvas.height().saturating_sub(20);
        for (i, track) in project.tracks.iter().take(DISPLAY_COLUMNS).enumerate() {
            let (x, w) = canvas.column(i);
            let color = if i == selected {
                canvas.fill_rect(x, bottom, w, 20, Color::White);
                Color::Black
            } else {
                Color::LightGray
            };
            canvas.draw_text(x + 4, bottom + 4, track.name.clone(), color);
        }
    }

    fn update_buttons(&self, app: &App) {
        let (count, selected) = {
            let project = app.project();
            (project.tracks.len(), project.selected_index())
        };
        for (i, button) in buttons::UPPER_ROW.iter().enumerate() {
            let color = if i == selected {
                Color::Green
            } else if i < count {
                Color::White
            } else {
                Color::IDLE
            };
            app.controller().set_button_color(button, color);
        }
    }

    fn on_button_pressed(&self, app: &App, button: &str) -> Result<bool> {
        let Some(index) = buttons::UPPER_ROW.iter().position(|b| *b == button) else {
            return Ok(false);
        };
        if app.select_track(index) {
            // Pad colors depend on the selected track
            app.refresh_leds();
        }
        Ok(true)
    }
}
