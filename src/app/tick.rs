//! Frame/tick driver
//!
//! One cooperative loop handles input events, incoming MIDI and the frame
//! tick, so every callback into the modes runs on a single logical thread.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::MAX_FRAME_RATE;
use crate::controller::InputEvent;
use crate::display::{Canvas, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::midi::MidiMessage;

/// Counts ticks and reports the achieved rate once per second
#[derive(Debug)]
pub struct FrameRateMeter {
    window_start: Option<Instant>,
    frames: u32,
    achieved: Option<f64>,
}

impl FrameRateMeter {
    pub fn new() -> Self {
        Self {
            window_start: None,
            frames: 0,
            achieved: None,
        }
    }

    /// Record one tick. Returns the new rate when a one-second window closes.
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }

        let rate = self.frames as f64 / elapsed.as_secs_f64();
        self.achieved = Some(rate);
        self.window_start = Some(now);
        self.frames = 0;
        Some(rate)
    }

    /// Rate measured over the last complete window
    pub fn achieved(&self) -> Option<f64> {
        self.achieved
    }
}

impl Default for FrameRateMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl super::App {
    /// Time between ticks at the configured target frame rate
    pub fn frame_interval(&self) -> Duration {
        let rate = self.settings.read().target_frame_rate.clamp(1, MAX_FRAME_RATE);
        Duration::from_secs_f64(1.0 / rate as f64)
    }

    pub fn achieved_frame_rate(&self) -> Option<f64> {
        self.frame_meter.lock().achieved()
    }

    /// Paint the active modes and the notification, then transmit the frame
    fn paint(&self, now: Instant) {
        if !self.settings.read().use_display {
            self.expire_notification(now);
            return;
        }

        let mut canvas = Canvas::begin_frame(DISPLAY_WIDTH, DISPLAY_HEIGHT);
        for mode in self.active_modes() {
            self.guarded(mode.name(), "paint", || {
                mode.paint(self, &mut canvas);
                Ok(())
            });
        }
        self.paint_notification(&mut canvas, now);

        let frame = canvas.end_frame();
        if let Err(e) = self.display.lock().transmit(&frame) {
            warn!("Display transmit failed: {:#}", e);
        }
    }

    /// One tick: paint, measure, then delayed actions on the controller and on
    /// every active mode, in that order
    pub fn tick(&self, now: Instant) {
        self.paint(now);

        if let Some(rate) = self.frame_meter.lock().tick(now) {
            debug!("Frame rate: {:.1} fps", rate);
        }

        self.controller.check_delayed_actions();
        for mode in self.active_modes() {
            self.guarded(mode.name(), "check_delayed_actions", || {
                mode.check_delayed_actions(self);
                Ok(())
            });
        }
    }

    /// Run until `shutdown` resolves.
    ///
    /// Between ticks the loop sleeps for whatever remains of the frame
    /// interval; a late tick runs immediately. On exit the controller is told
    /// to stop.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<InputEvent>,
        mut midi_in: mpsc::Receiver<MidiMessage>,
        shutdown: impl Future<Output = ()>,
    ) {
        info!("Starting main loop at {:?} per frame", self.frame_interval());
        tokio::pin!(shutdown);

        let mut next_tick = tokio::time::Instant::now();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, stopping main loop");
                    break;
                }

                Some(event) = events.recv() => {
                    self.dispatch(&event);
                }

                Some(message) = midi_in.recv() => {
                    self.on_midi_in(&message);
                }

                _ = tokio::time::sleep_until(next_tick) => {
                    let started = tokio::time::Instant::now();
                    self.tick(started.into_std());
                    next_tick = started + self.frame_interval();
                }
            }
        }

        self.controller.stop();
        info!("Main loop stopped");
    }
}
