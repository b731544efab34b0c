//! Settings document
//!
//! A flat key/value document read at startup and written on demand. Every key
//! is decoded on its own: missing, malformed or out-of-range values fall back
//! to their built-in default without affecting the others. Keys that are not
//! core settings belong to the modes and are kept as-is.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::midi_io::{MidiInNotify, ALL_CHANNELS};

pub const DEFAULT_FRAME_RATE: u32 = 60;
pub const MAX_FRAME_RATE: u32 = 240;
pub const DEFAULT_CONTROLLER_PORT: &str = "Ableton Push 2";

const KEY_IN_DEVICE: &str = "default_midi_in_device_name";
const KEY_OUT_DEVICE: &str = "default_midi_out_device_name";
const KEY_IN_CHANNEL: &str = "default_midi_in_channel";
const KEY_OUT_CHANNEL: &str = "default_midi_out_channel";
const KEY_FRAME_RATE: &str = "target_frame_rate";
const KEY_USE_DISPLAY: &str = "use_display";
const KEY_CONTROLLER_PORT: &str = "controller_port";
const KEY_MIDI_IN_NOTIFY: &str = "midi_in_notify";

const CORE_KEYS: [&str; 8] = [
    KEY_IN_DEVICE,
    KEY_OUT_DEVICE,
    KEY_IN_CHANNEL,
    KEY_OUT_CHANNEL,
    KEY_FRAME_RATE,
    KEY_USE_DISPLAY,
    KEY_CONTROLLER_PORT,
    KEY_MIDI_IN_NOTIFY,
];

/// Application settings
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub default_midi_in_device_name: Option<String>,
    pub default_midi_out_device_name: Option<String>,
    /// -1 listens on every channel
    pub default_midi_in_channel: i8,
    pub default_midi_out_channel: u8,
    pub target_frame_rate: u32,
    pub use_display: bool,
    /// Substring of the controller's own MIDI port name
    pub controller_port: String,
    pub midi_in_notify: MidiInNotify,
    /// Mode-owned keys, merged at top level when saved
    pub mode_settings: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_midi_in_device_name: None,
            default_midi_out_device_name: None,
            default_midi_in_channel: ALL_CHANNELS,
            default_midi_out_channel: 0,
            target_frame_rate: DEFAULT_FRAME_RATE,
            use_display: true,
            controller_port: DEFAULT_CONTROLLER_PORT.to_string(),
            midi_in_notify: MidiInNotify::default(),
            mode_settings: Map::new(),
        }
    }
}

/// Document format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

/// Decode one key, logging and discarding values of the wrong type
fn decode<T: DeserializeOwned>(doc: &Map<String, Value>, key: &str) -> Option<T> {
    let value = doc.get(key)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Ignoring setting '{}' ({}), using default", key, e);
            None
        }
    }
}

/// Decode an integer key and check it against `[min, max]`
fn decode_in_range(doc: &Map<String, Value>, key: &str, min: i64, max: i64) -> Option<i64> {
    let value: i64 = decode(doc, key)?;
    if (min..=max).contains(&value) {
        Some(value)
    } else {
        warn!(
            "Setting '{}' = {} out of range [{}, {}], using default",
            key, value, min, max
        );
        None
    }
}

impl Settings {
    /// Build settings from a parsed document, key by key
    pub fn from_document(doc: &Map<String, Value>) -> Self {
        let defaults = Self::default();

        let mode_settings = doc
            .iter()
            .filter(|(key, _)| !CORE_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            default_midi_in_device_name: decode(doc, KEY_IN_DEVICE),
            default_midi_out_device_name: decode(doc, KEY_OUT_DEVICE),
            default_midi_in_channel: decode_in_range(doc, KEY_IN_CHANNEL, -1, 15)
                .map_or(defaults.default_midi_in_channel, |v| v as i8),
            default_midi_out_channel: decode_in_range(doc, KEY_OUT_CHANNEL, 0, 15)
                .map_or(defaults.default_midi_out_channel, |v| v as u8),
            target_frame_rate: decode_in_range(doc, KEY_FRAME_RATE, 1, MAX_FRAME_RATE as i64)
                .map_or(defaults.target_frame_rate, |v| v as u32),
            use_display: decode(doc, KEY_USE_DISPLAY).unwrap_or(defaults.use_display),
            controller_port: decode(doc, KEY_CONTROLLER_PORT).unwrap_or(defaults.controller_port),
            midi_in_notify: decode(doc, KEY_MIDI_IN_NOTIFY).unwrap_or(defaults.midi_in_notify),
            mode_settings,
        }
    }

    /// Parse document text in the given format
    fn parse_document(contents: &str, format: Format) -> Result<Map<String, Value>> {
        let value: Value = match format {
            Format::Json => serde_json::from_str(contents).context("Failed to parse JSON settings")?,
            Format::Yaml => serde_yaml::from_str(contents).context("Failed to parse YAML settings")?,
        };
        match value {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => anyhow::bail!("Settings document must be a map, found {}", other),
        }
    }

    /// Load settings from a file.
    ///
    /// Never fails: a missing or unparsable document yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                info!(
                    "No settings at {} ({}), using defaults",
                    path.display(),
                    e
                );
                return Self::default();
            }
        };

        match Self::parse_document(&contents, Format::for_path(path)) {
            Ok(doc) => {
                debug!("Loaded {} setting keys from {}", doc.len(), path.display());
                Self::from_document(&doc)
            }
            Err(e) => {
                warn!("{:#} in {}, using defaults", e, path.display());
                Self::default()
            }
        }
    }

    /// The full document: core keys plus mode settings, with `exports` merged
    /// on top
    pub fn to_document(&self, exports: &Map<String, Value>) -> Map<String, Value> {
        let mut doc = self.mode_settings.clone();
        doc.insert(
            KEY_IN_DEVICE.to_string(),
            self.default_midi_in_device_name.clone().into(),
        );
        doc.insert(
            KEY_OUT_DEVICE.to_string(),
            self.default_midi_out_device_name.clone().into(),
        );
        doc.insert(KEY_IN_CHANNEL.to_string(), self.default_midi_in_channel.into());
        doc.insert(KEY_OUT_CHANNEL.to_string(), self.default_midi_out_channel.into());
        doc.insert(KEY_FRAME_RATE.to_string(), self.target_frame_rate.into());
        doc.insert(KEY_USE_DISPLAY.to_string(), self.use_display.into());
        doc.insert(
            KEY_CONTROLLER_PORT.to_string(),
            self.controller_port.clone().into(),
        );
        doc.insert(
            KEY_MIDI_IN_NOTIFY.to_string(),
            serde_json::to_value(self.midi_in_notify).unwrap_or(Value::Null),
        );
        for (key, value) in exports {
            doc.insert(key.clone(), value.clone());
        }
        doc
    }

    /// Write the document (with mode exports) to `path`
    pub fn save(&self, path: impl AsRef<Path>, exports: &Map<String, Value>) -> Result<()> {
        let path = path.as_ref();
        let doc = Value::Object(self.to_document(exports));

        let contents = match Format::for_path(path) {
            Format::Json => {
                serde_json::to_string_pretty(&doc).context("Failed to serialize settings")?
            }
            Format::Yaml => serde_yaml::to_string(&doc).context("Failed to serialize settings")?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory: {}", parent.display())
                })?;
            }
        }

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        info!("Settings saved to {}", path.display());
        Ok(())
    }
}
