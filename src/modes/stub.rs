//! Scriptable mode for tests

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::sync::Arc;

use super::Mode;
use crate::app::App;
use crate::controller::Pad;
use crate::display::Canvas;
use crate::midi::MidiMessage;

/// How a stub answers input events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Handled,
    Pass,
    Fail,
    Panic,
}

/// Mode that records every callback into a shared journal
pub struct StubMode {
    name: String,
    group: Option<String>,
    reply: Mutex<Reply>,
    pages: usize,
    page: Mutex<usize>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl StubMode {
    pub fn new(name: &str, group: Option<&str>, journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            name: name.to_string(),
            group: group.map(str::to_string),
            reply: Mutex::new(Reply::Pass),
            pages: 1,
            page: Mutex::new(0),
            journal,
        }
    }

    pub fn ungrouped(name: &str) -> Arc<dyn Mode> {
        Arc::new(Self::new(name, None, Arc::default()))
    }

    pub fn grouped(name: &str, group: &str) -> Arc<dyn Mode> {
        Arc::new(Self::new(name, Some(group), Arc::default()))
    }

    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = pages;
        self
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock() = reply;
    }

    fn log(&self, what: &str) {
        self.journal.lock().push(format!("{}:{}", self.name, what));
    }

    fn answer(&self, what: &str) -> Result<bool> {
        self.log(what);
        match *self.reply.lock() {
            Reply::Handled => Ok(true),
            Reply::Pass => Ok(false),
            Reply::Fail => Err(anyhow!("{} refused {}", self.name, what)),
            Reply::Panic => panic!("{} exploded on {}", self.name, what),
        }
    }
}

impl Mode for StubMode {
    fn name(&self) -> &str {
        &self.name
    }

    fn xor_group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn activate(&self, _app: &App) {
        self.log("activate");
    }

    fn deactivate(&self, _app: &App) {
        self.log("deactivate");
    }

    fn next_page(&self) -> bool {
        let mut page = self.page.lock();
        *page += 1;
        self.journal
            .lock()
            .push(format!("{}:page{}", self.name, *page));
        *page >= self.pages
    }

    fn reset_pages(&self) {
        *self.page.lock() = 0;
    }

    fn paint(&self, _app: &App, canvas: &mut Canvas) {
        canvas.draw_text(0, 0, self.name.clone(), crate::controller::Color::White);
    }

    fn check_delayed_actions(&self, _app: &App) {
        self.log("delayed");
    }

    fn update_pads(&self, _app: &App) {
        self.log("update_pads");
    }

    fn update_buttons(&self, _app: &App) {
        self.log("update_buttons");
    }

    fn on_encoder_rotated(&self, _app: &App, _encoder: &str, _delta: i32) -> Result<bool> {
        self.answer("encoder")
    }

    fn on_pad_pressed(&self, _app: &App, _pad: Pad, _velocity: u8) -> Result<bool> {
        self.answer("pad_pressed")
    }

    fn on_pad_released(&self, _app: &App, _pad: Pad, _velocity: u8) -> Result<bool> {
        self.answer("pad_released")
    }

    fn on_button_pressed(&self, _app: &App, button: &str) -> Result<bool> {
        self.answer(&format!("button_pressed({})", button))
    }

    fn on_sustain_pedal(&self, _app: &App, _on: bool) -> Result<bool> {
        self.answer("sustain")
    }

    fn on_midi_in(&self, _app: &App, message: &MidiMessage) -> Result<()> {
        self.log(&format!("midi_in({})", message));
        Ok(())
    }
}
