//! midir-backed MIDI device collaborator

use midir::{Ignore, MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
use tracing::debug;

use super::{MidiBackend, MidiCallback, MidiError, MidiInputHandle, MidiOutputHandle};

/// Client name announced to the OS MIDI layer
const CLIENT_NAME: &str = "padctl";

/// Collect port names of any midir endpoint
pub fn port_names<T: MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .filter_map(|port| io.port_name(port).ok())
        .collect()
}

/// Find a port by case-insensitive substring match
pub fn find_port_by_substring<T: MidiIO>(io: &T, pattern: &str) -> Option<(T::Port, String)> {
    let pattern = pattern.to_lowercase();
    io.ports().into_iter().find_map(|port| {
        let name = io.port_name(&port).ok()?;
        if name.to_lowercase().contains(&pattern) {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            Some((port, name))
        } else {
            None
        }
    })
}

/// System MIDI through midir
#[derive(Debug, Default, Clone, Copy)]
pub struct MidirBackend;

struct MidirInput {
    name: String,
    _connection: MidiInputConnection<()>,
}

impl MidiInputHandle for MidirInput {
    fn name(&self) -> &str {
        &self.name
    }
}

struct MidirOutput {
    name: String,
    connection: MidiOutputConnection,
}

impl MidiOutputHandle for MidirOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        self.connection
            .send(bytes)
            .map_err(|e| MidiError::Send(e.to_string()))
    }
}

fn new_input(suffix: &str) -> Result<MidiInput, MidiError> {
    MidiInput::new(&format!("{}-{}", CLIENT_NAME, suffix))
        .map_err(|e| MidiError::Backend(e.to_string()))
}

fn new_output(suffix: &str) -> Result<MidiOutput, MidiError> {
    MidiOutput::new(&format!("{}-{}", CLIENT_NAME, suffix))
        .map_err(|e| MidiError::Backend(e.to_string()))
}

impl MidiBackend for MidirBackend {
    fn input_names(&self) -> Result<Vec<String>, MidiError> {
        Ok(port_names(&new_input("scanner")?))
    }

    fn output_names(&self) -> Result<Vec<String>, MidiError> {
        Ok(port_names(&new_output("scanner")?))
    }

    fn open_input(
        &self,
        name: &str,
        mut callback: MidiCallback,
    ) -> Result<Box<dyn MidiInputHandle>, MidiError> {
        let mut midi_in = new_input("in")?;
        midi_in.ignore(Ignore::None);

        let (port, port_name) =
            find_port_by_substring(&midi_in, name).ok_or_else(|| MidiError::DeviceNotFound {
                name: name.to_string(),
            })?;

        let connection = midi_in
            .connect(
                &port,
                CLIENT_NAME,
                move |_timestamp, data, _| callback(data),
                (),
            )
            .map_err(|e| MidiError::Connect {
                name: port_name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(MidirInput {
            name: port_name,
            _connection: connection,
        }))
    }

    fn open_output(
        &self,
        name: &str,
        virtual_port: bool,
    ) -> Result<Box<dyn MidiOutputHandle>, MidiError> {
        let midi_out = new_output("out")?;

        if virtual_port {
            return open_virtual_output(midi_out, name);
        }

        let (port, port_name) =
            find_port_by_substring(&midi_out, name).ok_or_else(|| MidiError::DeviceNotFound {
                name: name.to_string(),
            })?;

        let connection = midi_out
            .connect(&port, CLIENT_NAME)
            .map_err(|e| MidiError::Connect {
                name: port_name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(MidirOutput {
            name: port_name,
            connection,
        }))
    }
}

#[cfg(unix)]
fn open_virtual_output(
    midi_out: MidiOutput,
    name: &str,
) -> Result<Box<dyn MidiOutputHandle>, MidiError> {
    use midir::os::unix::VirtualOutput;

    let connection = midi_out
        .create_virtual(name)
        .map_err(|e| MidiError::Connect {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    Ok(Box::new(MidirOutput {
        name: name.to_string(),
        connection,
    }))
}

#[cfg(not(unix))]
fn open_virtual_output(
    _midi_out: MidiOutput,
    name: &str,
) -> Result<Box<dyn MidiOutputHandle>, MidiError> {
    Err(MidiError::Connect {
        name: name.to_string(),
        reason: "virtual ports are not supported on this platform".to_string(),
    })
}
