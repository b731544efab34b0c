//! Mode set / unset / toggle / rotate

use tracing::{debug, warn};

use crate::modes::{names, Transition};

impl super::App {
    /// Fire the callbacks owed after a membership change, in order.
    ///
    /// Runs without the mode-stack lock held, so callbacks may change modes.
    fn apply_transitions(&self, transitions: Vec<Transition>) {
        for transition in transitions {
            let mode = transition.mode().clone();
            match transition {
                Transition::Activate(_) => {
                    debug!("Activating mode '{}'", mode.name());
                    self.guarded(mode.name(), "activate", || {
                        mode.activate(self);
                        Ok(())
                    });
                }
                Transition::Deactivate(_) => {
                    debug!("Deactivating mode '{}'", mode.name());
                    self.guarded(mode.name(), "deactivate", || {
                        mode.deactivate(self);
                        Ok(())
                    });
                }
            }
        }
    }

    /// Activate a mode, displacing the active member of its xor group
    pub fn set_mode(&self, name: &str) {
        let transitions = self.modes.lock().set(name);
        self.apply_transitions(transitions);
    }

    /// Deactivate a mode, restoring its group's previous or default mode
    pub fn unset_mode(&self, name: &str) {
        let transitions = self.modes.lock().unset(name);
        self.apply_transitions(transitions);
    }

    pub fn toggle_mode(&self, name: &str) {
        if self.is_mode_active(name) {
            self.unset_mode(name);
        } else {
            self.set_mode(name);
        }
    }

    /// Switch between the melodic and rhythmic pad modes
    pub fn toggle_melodic_rhythmic(&self) {
        if self.is_mode_active(names::MELODIC) {
            self.set_mode(names::RHYTHMIC);
        } else {
            self.set_mode(names::MELODIC);
        }
    }

    /// Activate a multi-page mode, or advance its page when already active.
    ///
    /// Page changes keep the mode in place; passing the last page unsets it.
    pub fn rotate_mode(&self, name: &str) {
        let Some(mode) = self.mode(name) else {
            warn!("Cannot rotate unknown mode '{}'", name);
            return;
        };

        if !self.is_mode_active(name) {
            mode.reset_pages();
            self.set_mode(name);
            return;
        }

        if mode.next_page() {
            mode.reset_pages();
            self.unset_mode(name);
        } else {
            self.guarded(mode.name(), "page change", || {
                mode.update_pads(self);
                mode.update_buttons(self);
                Ok(())
            });
        }
    }
}
