//! In-memory MIDI backend for tests

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{MidiBackend, MidiCallback, MidiError, MidiInputHandle, MidiOutputHandle};

#[derive(Default)]
struct MockState {
    callbacks: HashMap<String, MidiCallback>,
    sent: HashMap<String, Vec<Vec<u8>>>,
}

/// A mock backend with a fixed device list. Records everything sent.
pub struct MockBackend {
    inputs: Vec<String>,
    outputs: Vec<String>,
    shared: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            shared: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Deliver raw bytes as if they arrived on the named input
    pub fn inject(&self, input: &str, data: &[u8]) {
        let mut state = self.shared.lock();
        if let Some(callback) = state.callbacks.get_mut(input) {
            callback(data);
        }
    }

    /// Everything sent to the named output so far
    pub fn sent(&self, output: &str) -> Vec<Vec<u8>> {
        self.shared.lock().sent.get(output).cloned().unwrap_or_default()
    }

    /// Names of inputs that currently have an open connection
    pub fn open_inputs(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.lock().callbacks.keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve(names: &[String], pattern: &str) -> Result<String, MidiError> {
        names
            .iter()
            .find(|n| n.to_lowercase().contains(&pattern.to_lowercase()))
            .cloned()
            .ok_or_else(|| MidiError::DeviceNotFound {
                name: pattern.to_string(),
            })
    }
}

struct MockInput {
    name: String,
    shared: Arc<Mutex<MockState>>,
}

impl MidiInputHandle for MockInput {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MockInput {
    fn drop(&mut self) {
        self.shared.lock().callbacks.remove(&self.name);
    }
}

struct MockOutput {
    name: String,
    shared: Arc<Mutex<MockState>>,
}

impl MidiOutputHandle for MockOutput {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), MidiError> {
        self.shared
            .lock()
            .sent
            .entry(self.name.clone())
            .or_default()
            .push(bytes.to_vec());
        Ok(())
    }
}

impl MidiBackend for MockBackend {
    fn input_names(&self) -> Result<Vec<String>, MidiError> {
        Ok(self.inputs.clone())
    }

    fn output_names(&self) -> Result<Vec<String>, MidiError> {
        Ok(self.outputs.clone())
    }

    fn open_input(
        &self,
        name: &str,
        callback: MidiCallback,
    ) -> Result<Box<dyn MidiInputHandle>, MidiError> {
        let name = Self::resolve(&self.inputs, name)?;
        self.shared.lock().callbacks.insert(name.clone(), callback);
        Ok(Box::new(MockInput {
            name,
            shared: self.shared.clone(),
        }))
    }

    fn open_output(
        &self,
        name: &str,
        _virtual_port: bool,
    ) -> Result<Box<dyn MidiOutputHandle>, MidiError> {
        let name = Self::resolve(&self.outputs, name)?;
        Ok(Box::new(MockOutput {
            name,
            shared: self.shared.clone(),
        }))
    }
}
