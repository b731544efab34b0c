//! Recording controller for tests

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Color, Controller, Pad};

/// One call made on the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCall {
    ApplyPalette(usize),
    PadColor(Pad, Color),
    ButtonColor(String, Color),
    ResetAll(Color),
    CheckDelayedActions,
    Stop,
}

#[derive(Default)]
pub struct MockController {
    calls: Mutex<Vec<ControllerCall>>,
    stopped: AtomicBool,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ControllerCall> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Last color set for a pad, if any
    pub fn pad_color(&self, pad: Pad) -> Option<Color> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            ControllerCall::PadColor(p, color) if *p == pad => Some(*color),
            ControllerCall::ResetAll(color) => Some(*color),
            _ => None,
        })
    }

    /// Last color set for a button, if any
    pub fn button_color(&self, button: &str) -> Option<Color> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            ControllerCall::ButtonColor(b, color) if b == button => Some(*color),
            ControllerCall::ResetAll(color) => Some(*color),
            _ => None,
        })
    }

    fn record(&self, call: ControllerCall) {
        self.calls.lock().push(call);
    }
}

impl Controller for MockController {
    fn port_name(&self) -> &str {
        "Mock Controller"
    }

    fn is_connected(&self) -> bool {
        !self.is_stopped()
    }

    fn apply_palette(&self, palette: &[Color]) {
        self.record(ControllerCall::ApplyPalette(palette.len()));
    }

    fn set_pad_color(&self, pad: Pad, color: Color) {
        self.record(ControllerCall::PadColor(pad, color));
    }

    fn set_button_color(&self, button: &str, color: Color) {
        self.record(ControllerCall::ButtonColor(button.to_string(), color));
    }

    fn reset_all(&self, color: Color) {
        self.record(ControllerCall::ResetAll(color));
    }

    fn check_delayed_actions(&self) {
        self.record(ControllerCall::CheckDelayedActions);
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.record(ControllerCall::Stop);
    }
}
