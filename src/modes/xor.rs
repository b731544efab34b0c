//! Xor-group activation engine
//!
//! At most one mode per xor group is active. Setting a grouped mode displaces
//! the current member of its group and remembers it; unsetting restores the
//! remembered mode, or the group default when there is none.
//!
//! History is one entry deep per group: each displacement overwrites the
//! previous one, so set(A), set(B), set(C), unset(C) restores B and the fact
//! that A preceded B is lost.
//!
//! The engine only mutates membership. The activate/deactivate callbacks are
//! returned as [`Transition`]s for the caller to fire once the lock guarding
//! the stack is released, so callbacks may set and unset modes themselves.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{groups, names, Mode, ModeRegistry};

/// A callback owed to a mode after a membership change
#[derive(Clone)]
pub enum Transition {
    Activate(Arc<dyn Mode>),
    Deactivate(Arc<dyn Mode>),
}

impl Transition {
    pub fn mode(&self) -> &Arc<dyn Mode> {
        match self {
            Transition::Activate(mode) | Transition::Deactivate(mode) => mode,
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Activate(mode) => write!(f, "+{}", mode.name()),
            Transition::Deactivate(mode) => write!(f, "-{}", mode.name()),
        }
    }
}

pub struct ModeStack {
    registry: ModeRegistry,
    /// Most recently displaced mode per group, pending restoration
    pending: HashMap<String, Arc<dyn Mode>>,
    /// Group name -> default mode name
    defaults: HashMap<String, String>,
}

impl Default for ModeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeStack {
    /// Empty stack with the built-in group defaults (`pads` -> melodic)
    pub fn new() -> Self {
        let mut defaults = HashMap::new();
        defaults.insert(groups::PADS.to_string(), names::MELODIC.to_string());
        Self {
            registry: ModeRegistry::new(),
            pending: HashMap::new(),
            defaults,
        }
    }

    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    pub fn register(&mut self, mode: Arc<dyn Mode>) -> bool {
        self.registry.register(mode)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.registry.is_active(name)
    }

    pub fn active_modes(&self) -> Vec<Arc<dyn Mode>> {
        self.registry.active_modes()
    }

    /// Name of the mode pending restoration for `group`
    pub fn pending(&self, group: &str) -> Option<&str> {
        self.pending.get(group).map(|m| m.name())
    }

    /// Activate `name`, displacing every active mode of the same group.
    /// No-op when already active.
    pub fn set(&mut self, name: &str) -> Vec<Transition> {
        let Some(mode) = self.registry.get(name) else {
            warn!("Cannot set unknown mode '{}'", name);
            return Vec::new();
        };
        if self.registry.is_active(name) {
            return Vec::new();
        }

        let mut transitions = Vec::new();
        if let Some(group) = mode.xor_group() {
            let displaced: Vec<_> = self
                .registry
                .active_modes()
                .into_iter()
                .filter(|m| m.xor_group() == Some(group))
                .collect();
            for other in displaced {
                debug!("Mode '{}' displaces '{}' in group '{}'", name, other.name(), group);
                self.registry.deactivate(other.name());
                self.pending.insert(group.to_string(), other.clone());
                transitions.push(Transition::Deactivate(other));
            }
        }

        self.registry.activate(&mode);
        transitions.push(Transition::Activate(mode));
        transitions
    }

    /// Deactivate `name` and restore its group's pending mode, or the group
    /// default. No-op when not active.
    pub fn unset(&mut self, name: &str) -> Vec<Transition> {
        let Some(mode) = self.registry.get(name) else {
            warn!("Cannot unset unknown mode '{}'", name);
            return Vec::new();
        };
        if !self.registry.deactivate(name) {
            return Vec::new();
        }

        let mut transitions = vec![Transition::Deactivate(mode.clone())];
        let Some(group) = mode.xor_group() else {
            return transitions;
        };

        let restore = match self.pending.remove(group) {
            Some(pending) => Some(pending.name().to_string()),
            None => self.defaults.get(group).cloned(),
        };
        if let Some(restore) = restore {
            debug!("Restoring '{}' in group '{}'", restore, group);
            transitions.extend(self.set(&restore));
        }
        transitions
    }
}
