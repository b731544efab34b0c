//! Transient on-screen notification

use std::time::{Duration, Instant};
use tracing::debug;

use crate::controller::Color;
use crate::display::Canvas;

/// How long a notification stays visible
pub const NOTIFICATION_DURATION: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub started: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= NOTIFICATION_DURATION
    }

    fn draw(&self, canvas: &mut Canvas) {
        let (w, h) = (canvas.width(), canvas.height());
        let (box_w, box_h) = (w / 2, h / 3);
        let (x, y) = ((w - box_w) / 2, (h - box_h) / 2);
        canvas.fill_rect(x, y, box_w, box_h, Color::White);
        canvas.draw_text(x + 10, y + box_h / 2, self.text.clone(), Color::Black);
    }
}

impl super::App {
    /// Show `text` on top of the display for a short while
    pub fn notify(&self, text: impl Into<String>) {
        self.notify_at(text, Instant::now());
    }

    pub(crate) fn notify_at(&self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        debug!("Notification: {}", text);
        *self.notification.lock() = Some(Notification { text, started: now });
    }

    pub fn notification(&self) -> Option<Notification> {
        self.notification.lock().clone()
    }

    /// Drop the notification once its time is up
    pub(crate) fn expire_notification(&self, now: Instant) {
        let mut slot = self.notification.lock();
        if slot.as_ref().is_some_and(|n| n.is_expired(now)) {
            *slot = None;
        }
    }

    /// Draw the current notification, clearing it once expired
    pub(crate) fn paint_notification(&self, canvas: &mut Canvas, now: Instant) {
        let mut slot = self.notification.lock();
        match slot.as_ref() {
            Some(n) if n.is_expired(now) => *slot = None,
            Some(n) => n.draw(canvas),
            None => {}
        }
    }
}
