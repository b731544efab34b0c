//! Project and track data store
//!
//! A project is a list of tracks; each track carries its MIDI routing and the
//! playing parameters used by the melodic and rhythmic modes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

const DEFAULT_TRACK_NAME: &str = "New Track";

/// Where a sounding note came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteSource {
    Pad,
    MidiIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayedNote {
    pub note: u8,
    pub source: NoteSource,
}

/// One track of the project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Track {
    pub id: usize,
    pub name: String,
    pub midi_device_out: Option<String>,
    pub midi_channel_out: Option<u8>,
    pub midi_device_in: Option<String>,
    pub midi_channel_in: Option<i8>,
    pub midi_through: Option<bool>,
    pub root_midi_note: u8,
    pub fixed_velocity_mode: bool,
    pub use_poly_at: bool,
    /// Raw pad sensor thresholds for channel aftertouch, kept with the project
    /// for the controller's own setup. Outgoing pressure ignores them.
    pub channel_at_range_start: u16,
    pub channel_at_range_end: u16,
    pub poly_at_max_range: u8,
    pub poly_at_curve_bending: u8,
    pub modulation_wheel_mode: bool,
    #[serde(skip)]
    notes_being_played: Vec<PlayedNote>,
    #[serde(skip)]
    last_time_at_params_edited: Option<Instant>,
}

impl Default for Track {
    fn default() -> Self {
        Self::new(0, DEFAULT_TRACK_NAME)
    }
}

impl Track {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            midi_device_out: None,
            midi_channel_out: None,
            midi_device_in: None,
            midi_channel_in: None,
            midi_through: None,
            root_midi_note: 64,
            fixed_velocity_mode: false,
            use_poly_at: true,
            channel_at_range_start: 401,
            channel_at_range_end: 800,
            poly_at_max_range: 40,
            poly_at_curve_bending: 50,
            modulation_wheel_mode: false,
            notes_being_played: Vec::new(),
            last_time_at_params_edited: None,
        }
    }

    fn touch(&mut self) {
        self.last_time_at_params_edited = Some(Instant::now());
    }

    /// When an aftertouch parameter was last edited
    pub fn last_time_at_params_edited(&self) -> Option<Instant> {
        self.last_time_at_params_edited
    }

    /// Clamped to [401, channel_at_range_end - 1]
    pub fn set_channel_at_range_start(&mut self, value: i32) {
        let end = self.channel_at_range_end as i32;
        self.channel_at_range_start = value.clamp(401, (end - 1).max(401)) as u16;
        self.touch();
    }

    /// Clamped to [channel_at_range_start + 1, 2000]
    pub fn set_channel_at_range_end(&mut self, value: i32) {
        let start = self.channel_at_range_start as i32;
        self.channel_at_range_end = value.clamp(start + 1, 2000) as u16;
        self.touch();
    }

    /// Clamped to [0, 127]
    pub fn set_poly_at_max_range(&mut self, value: i32) {
        self.poly_at_max_range = value.clamp(0, 127) as u8;
        self.touch();
    }

    /// Clamped to [0, 100]
    pub fn set_poly_at_curve_bending(&mut self, value: i32) {
        self.poly_at_curve_bending = value.clamp(0, 100) as u8;
        self.touch();
    }

    /// Clamped to [0, 127]
    pub fn set_root_midi_note(&mut self, value: i32) {
        self.root_midi_note = value.clamp(0, 127) as u8;
    }

    /// Pressure response curve for poly aftertouch.
    ///
    /// Inputs below `poly_at_max_range` follow a power curve; everything at or
    /// above it maps to full pressure.
    pub fn poly_at_curve(&self) -> [u8; 128] {
        let max = self.poly_at_max_range as usize;
        let exponent = 3.0 * self.poly_at_curve_bending as f64 / 100.0;
        let mut curve = [127u8; 128];
        for (i, value) in curve.iter_mut().enumerate().take(max) {
            let x = i as f64 / max as f64;
            *value = (127.0 * x.powf(exponent)) as u8;
        }
        curve
    }

    pub fn add_note_being_played(&mut self, note: u8, source: NoteSource) {
        self.notes_being_played.push(PlayedNote { note, source });
    }

    pub fn remove_note_being_played(&mut self, note: u8, source: NoteSource) {
        self.notes_being_played
            .retain(|n| n.note != note || n.source != source);
    }

    pub fn is_note_being_played(&self, note: u8) -> bool {
        self.notes_being_played.iter().any(|n| n.note == note)
    }

    pub fn notes_being_played(&self) -> &[PlayedNote] {
        &self.notes_being_played
    }
}

/// A named set of tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: Option<String>,
    pub tracks: Vec<Track>,
    #[serde(skip)]
    selected_track: usize,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: None,
            tracks: vec![Track::new(0, DEFAULT_TRACK_NAME)],
            selected_track: 0,
        }
    }
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Load a project from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read project file: {}", path.display()))?;
        let mut project: Project = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse project file: {}", path.display()))?;
        if project.tracks.is_empty() {
            project.tracks.push(Track::new(0, DEFAULT_TRACK_NAME));
        }
        Ok(project)
    }

    /// Save the project as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize project")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write project file: {}", path.display()))?;
        Ok(())
    }

    pub fn add_track(&mut self, name: impl Into<String>) -> usize {
        let id = self.tracks.len();
        self.tracks.push(Track::new(id, name));
        id
    }

    /// Remove a track. The last remaining track is replaced by a fresh one.
    pub fn remove_track(&mut self, index: usize) {
        if self.tracks.len() > 1 {
            if index < self.tracks.len() {
                self.tracks.remove(index);
            }
        } else {
            self.tracks = vec![Track::new(0, DEFAULT_TRACK_NAME)];
        }
        self.selected_track = self.selected_track.min(self.tracks.len() - 1);
    }

    pub fn selected_index(&self) -> usize {
        self.selected_track
    }

    /// Select a track; out-of-range indices are ignored
    pub fn select_track(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.selected_track = index;
            true
        } else {
            false
        }
    }

    pub fn selected_track(&self) -> &Track {
        &self.tracks[self.selected_track]
    }

    pub fn selected_track_mut(&mut self) -> &mut Track {
        &mut self.tracks[self.selected_track]
    }
}
