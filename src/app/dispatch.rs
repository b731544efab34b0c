//! Input event dispatch with per-mode fault boundaries

use anyhow::Result;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, trace};

use crate::controller::InputEvent;
use crate::modes::Mode;

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

impl super::App {
    /// Run one mode callback, catching errors and panics.
    ///
    /// Returns `None` when the callback faulted; the fault is logged and the
    /// mode stays active.
    pub(crate) fn guarded<T>(
        &self,
        mode: &str,
        what: &str,
        f: impl FnOnce() -> Result<T>,
    ) -> Option<T> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                error!("Mode '{}' failed in {}: {:#}", mode, what, e);
                None
            }
            Err(payload) => {
                error!(
                    "Mode '{}' panicked in {}: {}",
                    mode,
                    what,
                    panic_message(payload.as_ref())
                );
                None
            }
        }
    }

    fn offer(&self, mode: &Arc<dyn Mode>, event: &InputEvent) -> bool {
        self.guarded(mode.name(), event.kind(), || match event {
            InputEvent::EncoderRotated { encoder, delta } => {
                mode.on_encoder_rotated(self, encoder, *delta)
            }
            InputEvent::PadPressed { pad, velocity } => mode.on_pad_pressed(self, *pad, *velocity),
            InputEvent::PadReleased { pad, velocity } => {
                mode.on_pad_released(self, *pad, *velocity)
            }
            InputEvent::PadAftertouch { pad, pressure } => {
                mode.on_pad_aftertouch(self, *pad, *pressure)
            }
            InputEvent::ButtonPressed { button } => mode.on_button_pressed(self, button),
            InputEvent::ButtonReleased { button } => mode.on_button_released(self, button),
            InputEvent::TouchStrip { value } => mode.on_touchstrip(self, *value),
            InputEvent::SustainPedal { on } => mode.on_sustain_pedal(self, *on),
            InputEvent::ConnectionEstablished => Ok(false),
        })
        .unwrap_or(false)
    }

    /// Dispatch one input event.
    ///
    /// Active modes are offered the event from most to least recently
    /// activated; the first one that handles it stops propagation. The walk
    /// runs over a snapshot, so modes may change the active set meanwhile.
    /// Returns whether any mode handled the event.
    pub fn dispatch(&self, event: &InputEvent) -> bool {
        if let InputEvent::ConnectionEstablished = event {
            self.on_connection_established();
            return true;
        }

        for mode in self.active_modes().iter().rev() {
            if self.offer(mode, event) {
                trace!("{} handled by '{}'", event.kind(), mode.name());
                return true;
            }
        }

        trace!("{} not handled", event.kind());
        false
    }
}
