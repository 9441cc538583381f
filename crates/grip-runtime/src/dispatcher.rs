//! [`GestureDispatcher`] – polls both sensors and routes their gestures.
//!
//! NEAR/FAR never enter the event slot: they go through the [`Debouncer`]
//! and, when accepted, call [`ModeStateMachine::advance`] directly.
//! Directional gestures are published into the single-slot channel where
//! the newest one wins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use grip_hal::GestureSource;
use grip_types::{GestureEvent, GestureSymbol, ModeSnapshot, SensorSide};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::debounce::Debouncer;
use crate::mode::ModeStateMachine;

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Pause between polling iterations.
    pub poll_interval: Duration,
    /// Minimum spacing between accepted mode-change gestures.
    pub debounce: Duration,
    /// Delay before the first poll, letting the arm settle after startup.
    pub start_delay: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
            debounce: Duration::from_millis(1000),
            start_delay: Duration::from_secs(2),
        }
    }
}

/// What the dispatcher did with one polled symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    ModeChanged(ModeSnapshot),
    /// A mode-change gesture arrived inside the debounce window.
    Debounced,
    /// A directional gesture went into the slot; `replaced` is true if it
    /// overwrote an unread one.
    Published { replaced: bool },
}

pub struct GestureDispatcher {
    left: Box<dyn GestureSource>,
    right: Box<dyn GestureSource>,
    machine: Arc<ModeStateMachine>,
    debouncer: Debouncer,
    config: DispatcherConfig,
}

impl GestureDispatcher {
    pub fn new(
        left: Box<dyn GestureSource>,
        right: Box<dyn GestureSource>,
        machine: Arc<ModeStateMachine>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            left,
            right,
            machine,
            debouncer: Debouncer::new(config.debounce),
            config,
        }
    }

    /// Poll the left sensor, then the right one, and route whatever they
    /// produced.  Returns the outcome for each symbol, in polling order.
    pub fn poll_once(&mut self, now: Instant) -> Vec<Dispatch> {
        let mut outcomes = Vec::with_capacity(2);
        if let Some(symbol) = self.left.poll() {
            outcomes.push(self.route(symbol, SensorSide::Left, now));
        }
        if let Some(symbol) = self.right.poll() {
            outcomes.push(self.route(symbol, SensorSide::Right, now));
        }
        outcomes
    }

    /// Poll until `shutdown` is set.
    pub async fn run(mut self, shutdown: Arc<AtomicBool>) {
        if !self.config.start_delay.is_zero() {
            sleep(self.config.start_delay).await;
        }
        info!(
            poll_ms = self.config.poll_interval.as_millis() as u64,
            debounce_ms = self.config.debounce.as_millis() as u64,
            "gesture dispatch started"
        );
        while !shutdown.load(Ordering::Acquire) {
            self.poll_once(Instant::now());
            sleep(self.config.poll_interval).await;
        }
        debug!("gesture dispatch stopped");
    }

    fn route(&mut self, symbol: GestureSymbol, side: SensorSide, now: Instant) -> Dispatch {
        debug!(%symbol, %side, "gesture");
        if symbol.is_mode_change() {
            if self.debouncer.accept(now) {
                Dispatch::ModeChanged(self.machine.advance())
            } else {
                debug!(%symbol, %side, "mode change debounced");
                Dispatch::Debounced
            }
        } else {
            let replaced = self
                .machine
                .events()
                .publish(GestureEvent::new(symbol, side))
                .is_some();
            Dispatch::Published { replaced }
        }
    }
}
