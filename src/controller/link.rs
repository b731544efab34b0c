//! MIDI link to the grid controller hardware
//!
//! Opens the controller's own MIDI port pair, translates incoming messages into
//! [`InputEvent`]s and sends LED updates. While disconnected, the link retries
//! on its delayed-actions pass.

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::{layout, Color, Controller, InputEvent, Pad};
use crate::midi::{format_hex, MidiMessage};
use crate::midi_io::{MidiBackend, MidiCallback, MidiInputHandle, MidiOutputHandle};

/// Minimum time between two connection attempts
const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Controller hardware reached over MIDI
pub struct MidiController {
    backend: Arc<dyn MidiBackend>,
    port_name: String,
    event_tx: mpsc::Sender<InputEvent>,
    input_conn: Mutex<Option<Box<dyn MidiInputHandle>>>,
    output_conn: Mutex<Option<Box<dyn MidiOutputHandle>>>,
    last_attempt: Mutex<Option<Instant>>,
    stopped: AtomicBool,
}

impl MidiController {
    pub fn new(
        backend: Arc<dyn MidiBackend>,
        port_name: impl Into<String>,
        event_tx: mpsc::Sender<InputEvent>,
    ) -> Self {
        Self {
            backend,
            port_name: port_name.into(),
            event_tx,
            input_conn: Mutex::new(None),
            output_conn: Mutex::new(None),
            last_attempt: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// Connect to the controller ports.
    ///
    /// On success a [`InputEvent::ConnectionEstablished`] is queued so the
    /// application re-initializes the device.
    pub fn connect(&self) -> Result<()> {
        self.disconnect();
        *self.last_attempt.lock() = Some(Instant::now());

        debug!("Connecting to controller port '{}'", self.port_name);

        let event_tx = self.event_tx.clone();
        let callback: MidiCallback = Box::new(move |data: &[u8]| {
            let Some(message) = MidiMessage::parse(data) else {
                debug!("Failed to parse controller MIDI: {}", format_hex(data));
                return;
            };
            if let Some(event) = layout::translate(&message) {
                trace!("Controller event: {:?}", event);
                // Try to send event, but don't block or panic
                let _ = event_tx.try_send(event);
            }
        });

        let input = self
            .backend
            .open_input(&self.port_name, callback)
            .map_err(|e| anyhow!("controller input: {}", e))?;
        let output = self
            .backend
            .open_output(&self.port_name, false)
            .map_err(|e| anyhow!("controller output: {}", e))?;

        info!("Controller connected: in='{}' out='{}'", input.name(), output.name());

        *self.input_conn.lock() = Some(input);
        *self.output_conn.lock() = Some(output);

        self.event_tx
            .try_send(InputEvent::ConnectionEstablished)
            .map_err(|e| anyhow!("failed to queue connection event: {}", e))?;

        Ok(())
    }

    /// Drop both connections
    pub fn disconnect(&self) {
        let had_input = self.input_conn.lock().take().is_some();
        let had_output = self.output_conn.lock().take().is_some();
        if had_input || had_output {
            info!("Controller disconnected");
        }
    }

    fn send(&self, message: &MidiMessage) {
        let mut output = self.output_conn.lock();
        let Some(conn) = output.as_mut() else {
            return;
        };
        if let Err(e) = conn.send(&message.encode()) {
            warn!("Controller send failed, dropping link: {}", e);
            *output = None;
            drop(output);
            self.input_conn.lock().take();
        }
    }
}

impl Controller for MidiController {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn is_connected(&self) -> bool {
        self.input_conn.lock().is_some() && self.output_conn.lock().is_some()
    }

    fn apply_palette(&self, palette: &[Color]) {
        for message in layout::palette_messages(palette) {
            self.send(&message);
        }
    }

    fn set_pad_color(&self, pad: Pad, color: Color) {
        self.send(&layout::pad_color_message(pad, color));
    }

    fn set_button_color(&self, button: &str, color: Color) {
        match layout::button_color_message(button, color) {
            Some(message) => self.send(&message),
            None => trace!("No LED for button '{}'", button),
        }
    }

    fn reset_all(&self, color: Color) {
        for pad in Pad::all() {
            self.set_pad_color(pad, color);
        }
        for button in layout::all_buttons() {
            self.set_button_color(button, color);
        }
    }

    fn check_delayed_actions(&self) {
        if self.stopped.load(Ordering::Acquire) || self.is_connected() {
            return;
        }
        let due = self
            .last_attempt
            .lock()
            .map_or(true, |at| at.elapsed() >= RETRY_INTERVAL);
        if due {
            if let Err(e) = self.connect() {
                debug!("Controller not available: {}", e);
            }
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.disconnect();
    }
}
