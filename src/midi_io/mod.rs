//! MIDI router - channel filtering, forwarding and device (re)binding
//!
//! The router owns one bound input and one bound output device. Incoming
//! messages are parsed on the backend's callback thread and handed to the
//! application loop through an mpsc channel; the loop then calls
//! [`MidiRouter::route_incoming`] and notifies modes.

mod backend;
#[cfg(test)]
pub mod mock;

pub use backend::MidirBackend;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::midi::{format_hex, MidiMessage};

/// In-channel value meaning "accept every channel"
pub const ALL_CHANNELS: i8 = -1;

/// Callback invoked by a backend with raw bytes of every incoming message
pub type MidiCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Failures raised by the MIDI collaborator
#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("MIDI device '{name}' not found")]
    DeviceNotFound { name: String },
    #[error("failed to connect to MIDI device '{name}': {reason}")]
    Connect { name: String, reason: String },
    #[error("MIDI backend unavailable: {0}")]
    Backend(String),
    #[error("failed to send MIDI message: {0}")]
    Send(String),
}

/// Open input connection; dropping it closes the port and stops the callback
pub trait MidiInputHandle: Send {
    fn name(&self) -> &str;
}

/// Open output connection
pub trait MidiOutputHandle: Send {
    fn name(&self) -> &str;
    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError>;
}

/// MIDI device collaborator (enumeration and connection)
pub trait MidiBackend: Send + Sync {
    fn input_names(&self) -> Result<Vec<String>, MidiError>;
    fn output_names(&self) -> Result<Vec<String>, MidiError>;
    fn open_input(
        &self,
        name: &str,
        callback: MidiCallback,
    ) -> Result<Box<dyn MidiInputHandle>, MidiError>;
    fn open_output(
        &self,
        name: &str,
        virtual_port: bool,
    ) -> Result<Box<dyn MidiOutputHandle>, MidiError>;
}

/// Which incoming messages reach the active modes' MIDI-in handlers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MidiInNotify {
    /// Only messages that pass the in-channel filter (same gate as forwarding)
    #[default]
    Matching,
    /// Every parsed message, regardless of the filter
    Always,
}

/// Result of routing one incoming message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingRoute {
    pub forwarded: bool,
    pub notify_modes: bool,
}

/// Binding state of one direction, for display and retry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceStatus {
    pub bound: Option<String>,
    pub attempted: Option<String>,
    pub available: Vec<String>,
}

/// Clamp (or wrap) a channel value into `[min, max]`.
///
/// Wrapping jumps to the opposite end of the range rather than taking a modulo,
/// so encoder turns past either end cycle around.
pub fn clamp_channel(value: i32, min: i32, max: i32, wrap: bool) -> i32 {
    if value < min {
        if wrap {
            max
        } else {
            min
        }
    } else if value > max {
        if wrap {
            min
        } else {
            max
        }
    } else {
        value
    }
}

struct RouterState {
    in_channel: i8,
    out_channel: u8,
    input: Option<Box<dyn MidiInputHandle>>,
    output: Option<Box<dyn MidiOutputHandle>>,
    attempted_input: Option<String>,
    attempted_output: Option<String>,
}

/// Routes MIDI between the external instrument/DAW and the modes
pub struct MidiRouter {
    backend: Arc<dyn MidiBackend>,
    /// Substring identifying the controller's own hardware port
    excluded_port: String,
    incoming_tx: mpsc::Sender<MidiMessage>,
    notify: MidiInNotify,
    state: Mutex<RouterState>,
}

impl MidiRouter {
    pub fn new(
        backend: Arc<dyn MidiBackend>,
        excluded_port: impl Into<String>,
        incoming_tx: mpsc::Sender<MidiMessage>,
        notify: MidiInNotify,
    ) -> Self {
        Self {
            backend,
            excluded_port: excluded_port.into(),
            incoming_tx,
            notify,
            state: Mutex::new(RouterState {
                in_channel: ALL_CHANNELS,
                out_channel: 0,
                input: None,
                output: None,
                attempted_input: None,
                attempted_output: None,
            }),
        }
    }

    fn is_excluded(&self, name: &str) -> bool {
        !self.excluded_port.is_empty()
            && name
                .to_lowercase()
                .contains(&self.excluded_port.to_lowercase())
    }

    /// First available device whose name contains `pattern`, case-insensitive.
    /// The controller's own port is never a candidate.
    fn resolve_device(available: Vec<String>, pattern: &str) -> Option<String> {
        let pattern = pattern.to_lowercase();
        available
            .into_iter()
            .find(|name| name.to_lowercase().contains(&pattern))
    }

    /// Available input device names, excluding the controller's own port
    pub fn available_inputs(&self) -> Vec<String> {
        match self.backend.input_names() {
            Ok(names) => names.into_iter().filter(|n| !self.is_excluded(n)).collect(),
            Err(e) => {
                warn!("Failed to enumerate MIDI inputs: {}", e);
                Vec::new()
            }
        }
    }

    /// Available output device names, excluding the controller's own port
    pub fn available_outputs(&self) -> Vec<String> {
        match self.backend.output_names() {
            Ok(names) => names.into_iter().filter(|n| !self.is_excluded(n)).collect(),
            Err(e) => {
                warn!("Failed to enumerate MIDI outputs: {}", e);
                Vec::new()
            }
        }
    }

    /// Bind the input device (or unbind with `None`).
    ///
    /// `name` matches the first available device containing it, so the
    /// controller's own port can never be bound. Any existing connection is
    /// torn down first. On failure the router stays disconnected; the error is
    /// logged together with the available devices.
    pub fn configure_input(&self, name: Option<&str>) -> bool {
        {
            let mut state = self.state.lock();
            if state.input.take().is_some() {
                debug!("MIDI input closed");
            }
            state.attempted_input = name.map(str::to_string);
        }

        let Some(name) = name else {
            info!("MIDI input unbound");
            return false;
        };

        let available = self.available_inputs();
        let Some(device) = Self::resolve_device(available.clone(), name) else {
            warn!(
                "MIDI input '{}' unavailable; available: {:?}",
                name, available
            );
            return false;
        };

        let tx = self.incoming_tx.clone();
        let callback: MidiCallback = Box::new(move |data: &[u8]| match MidiMessage::parse(data) {
            Some(message) => {
                trace!("MIDI IN: {} | {}", format_hex(data), message);
                // Never block the backend thread
                let _ = tx.try_send(message);
            }
            None => debug!("Failed to parse MIDI: {}", format_hex(data)),
        });

        match self.backend.open_input(&device, callback) {
            Ok(handle) => {
                info!("MIDI input bound: {}", handle.name());
                self.state.lock().input = Some(handle);
                true
            }
            Err(e) => {
                warn!(
                    "MIDI input '{}' unavailable ({}); available: {:?}",
                    name,
                    e,
                    self.available_inputs()
                );
                false
            }
        }
    }

    /// Bind the output device (or unbind with `None`). Same semantics as
    /// [`MidiRouter::configure_input`].
    pub fn configure_output(&self, name: Option<&str>) -> bool {
        {
            let mut state = self.state.lock();
            if state.output.take().is_some() {
                debug!("MIDI output closed");
            }
            state.attempted_output = name.map(str::to_string);
        }

        let Some(name) = name else {
            info!("MIDI output unbound");
            return false;
        };

        let available = self.available_outputs();
        let Some(device) = Self::resolve_device(available.clone(), name) else {
            warn!(
                "MIDI output '{}' unavailable; available: {:?}",
                name, available
            );
            return false;
        };

        match self.backend.open_output(&device, false) {
            Ok(handle) => {
                info!("MIDI output bound: {}", handle.name());
                self.state.lock().output = Some(handle);
                true
            }
            Err(e) => {
                warn!(
                    "MIDI output '{}' unavailable ({}); available: {:?}",
                    name,
                    e,
                    self.available_outputs()
                );
                false
            }
        }
    }

    pub fn input_status(&self) -> DeviceStatus {
        let (bound, attempted) = {
            let state = self.state.lock();
            (
                state.input.as_ref().map(|h| h.name().to_string()),
                state.attempted_input.clone(),
            )
        };
        DeviceStatus {
            bound,
            attempted,
            available: self.available_inputs(),
        }
    }

    pub fn output_status(&self) -> DeviceStatus {
        let (bound, attempted) = {
            let state = self.state.lock();
            (
                state.output.as_ref().map(|h| h.name().to_string()),
                state.attempted_output.clone(),
            )
        };
        DeviceStatus {
            bound,
            attempted,
            available: self.available_outputs(),
        }
    }

    pub fn bound_input(&self) -> Option<String> {
        self.state.lock().input.as_ref().map(|h| h.name().to_string())
    }

    pub fn bound_output(&self) -> Option<String> {
        self.state.lock().output.as_ref().map(|h| h.name().to_string())
    }

    pub fn in_channel(&self) -> i8 {
        self.state.lock().in_channel
    }

    pub fn out_channel(&self) -> u8 {
        self.state.lock().out_channel
    }

    /// Set the in-channel, clamped (or wrapped) into [-1, 15]. -1 means all channels.
    pub fn set_in_channel(&self, value: i32, wrap: bool) -> i8 {
        let channel = clamp_channel(value, ALL_CHANNELS as i32, 15, wrap) as i8;
        self.state.lock().in_channel = channel;
        debug!("MIDI in channel: {}", channel);
        channel
    }

    /// Set the out-channel, clamped (or wrapped) into [0, 15]
    pub fn set_out_channel(&self, value: i32, wrap: bool) -> u8 {
        let channel = clamp_channel(value, 0, 15, wrap) as u8;
        self.state.lock().out_channel = channel;
        debug!("MIDI out channel: {}", channel);
        channel
    }

    /// Send a message to the bound output.
    ///
    /// Channel messages are re-stamped with `channel_override` or, if absent, the
    /// current out-channel. Returns false when nothing was sent.
    pub fn send(&self, message: &MidiMessage, channel_override: Option<u8>) -> bool {
        let mut state = self.state.lock();
        let out_channel = state.out_channel;
        let Some(output) = state.output.as_mut() else {
            trace!("MIDI OUT skipped (no output bound): {}", message);
            return false;
        };

        let message = match message.channel() {
            Some(_) => message.with_channel(channel_override.unwrap_or(out_channel)),
            None => message.clone(),
        };

        match output.send(&message.encode()) {
            Ok(()) => {
                trace!("MIDI OUT: {}", message);
                true
            }
            Err(e) => {
                warn!("MIDI send failed: {}", e);
                false
            }
        }
    }

    /// Apply the in-channel filter to an incoming message and forward it verbatim
    /// to the bound output when it passes.
    pub fn route_incoming(&self, message: &MidiMessage) -> IncomingRoute {
        let mut state = self.state.lock();
        let in_channel = state.in_channel;
        let passes = match message.channel() {
            Some(channel) => in_channel == ALL_CHANNELS || in_channel == channel as i8,
            None => false,
        };

        let mut forwarded = false;
        if passes {
            if let Some(output) = state.output.as_mut() {
                match output.send(&message.encode()) {
                    Ok(()) => forwarded = true,
                    Err(e) => warn!("MIDI forward failed: {}", e),
                }
            }
        }

        let notify_modes = match self.notify {
            MidiInNotify::Matching => passes,
            MidiInNotify::Always => true,
        };

        IncomingRoute {
            forwarded,
            notify_modes,
        }
    }
}
