//! Incoming MIDI: forward to the output, then notify the active modes

use tracing::trace;

use crate::midi::MidiMessage;

impl super::App {
    /// Route one message from the MIDI input device.
    ///
    /// The router applies the in-channel filter and forwards passing messages
    /// verbatim. Modes are then notified with the original message according
    /// to the configured notification policy.
    pub fn on_midi_in(&self, message: &MidiMessage) {
        let route = self.midi.route_incoming(message);
        trace!(
            "MIDI IN {} forwarded={} notify={}",
            message,
            route.forwarded,
            route.notify_modes
        );
        if !route.notify_modes {
            return;
        }

        for mode in self.active_modes() {
            self.guarded(mode.name(), "midi_in", || mode.on_midi_in(self, message));
        }
    }
}
