//! Mode registry and the active-mode list

use std::sync::Arc;
use tracing::warn;

use super::Mode;

/// Owns every mode instance and the ordered list of active ones.
///
/// Activation order is insertion order: it is the paint order, and reversed it
/// is the input priority. The registry never calls into the modes; the xor
/// engine issues the activate/deactivate callbacks.
#[derive(Default)]
pub struct ModeRegistry {
    modes: Vec<Arc<dyn Mode>>,
    active: Vec<Arc<dyn Mode>>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mode. A second mode with the same name is rejected.
    pub fn register(&mut self, mode: Arc<dyn Mode>) -> bool {
        if self.get(mode.name()).is_some() {
            warn!("Mode '{}' already registered", mode.name());
            return false;
        }
        self.modes.push(mode);
        true
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Mode>> {
        self.modes.iter().find(|m| m.name() == name).cloned()
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|m| m.name() == name)
    }

    /// Append to the active list if absent
    pub fn activate(&mut self, mode: &Arc<dyn Mode>) -> bool {
        if self.is_active(mode.name()) {
            return false;
        }
        self.active.push(mode.clone());
        true
    }

    /// Remove from the active list if present
    pub fn deactivate(&mut self, name: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|m| m.name() != name);
        self.active.len() != before
    }

    pub fn all_modes(&self) -> &[Arc<dyn Mode>] {
        &self.modes
    }

    /// Snapshot of the active list in activation order
    pub fn active_modes(&self) -> Vec<Arc<dyn Mode>> {
        self.active.clone()
    }

    pub fn active_names(&self) -> Vec<String> {
        self.active.iter().map(|m| m.name().to_string()).collect()
    }
}
