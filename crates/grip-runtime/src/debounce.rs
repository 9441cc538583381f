//! [`Debouncer`] – minimum spacing between accepted mode-change gestures.

use std::time::Duration;

use tokio::time::Instant;

/// Accepts a trigger only if at least `window` has elapsed since the last
/// accepted one.  The very first trigger is always accepted.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Offer a trigger observed at `now`.  Rejected triggers do not move the
    /// window.
    pub fn accept(&mut self, now: Instant) -> bool {
        let open = self
            .last_accepted
            .is_none_or(|last| now.saturating_duration_since(last) >= self.window);
        if open {
            self.last_accepted = Some(now);
        }
        open
    }
}
