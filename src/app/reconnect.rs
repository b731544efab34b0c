//! Controller (re)connection hook

use tracing::info;

use crate::controller::Color;

impl super::App {
    /// Re-initialize device state after the controller link (re)establishes.
    ///
    /// The hardware forgets palette and LED state across a disconnect, so the
    /// palette is re-uploaded, every LED reset to idle, each active mode
    /// re-activated and one pad/button refresh forced.
    pub fn on_connection_established(&self) {
        info!("Controller connected, re-initializing");

        self.controller.apply_palette(&Color::ALL);
        self.controller.reset_all(Color::IDLE);

        let active = self.active_modes();
        for mode in &active {
            self.guarded(mode.name(), "activate", || {
                mode.activate(self);
                Ok(())
            });
        }
        self.refresh_leds();
    }

    /// Ask every active mode to push its pad and button state
    pub fn refresh_leds(&self) {
        for mode in self.active_modes() {
            self.guarded(mode.name(), "update_pads", || {
                mode.update_pads(self);
                Ok(())
            });
            self.guarded(mode.name(), "update_buttons", || {
                mode.update_buttons(self);
                Ok(())
            });
        }
    }
}
