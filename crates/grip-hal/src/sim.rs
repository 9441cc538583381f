//! In-process simulated drivers for tests and the desktop demo.
//!
//! Every simulated driver exposes a cheap, cloneable handle so a test (or the
//! REPL) can keep observing or feeding the driver after it has been boxed and
//! handed to the controller.
//!
//! # Example
//!
//! ```rust
//! use grip_hal::sim::SimRegistry;
//! use grip_types::GestureSymbol;
//!
//! let (registry, handles) = SimRegistry::new()
//!     .with_joints(["BASE", "MIDDLE"])
//!     .with_indicator()
//!     .build();
//!
//! assert_eq!(registry.actuator_count(), 2);
//! handles.right.push(GestureSymbol::Near);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use grip_types::{GestureSymbol, GripError, Rgb, SensorSide};

use crate::actuator::{Actuator, clamp_servo_angle};
use crate::gesture::GestureSource;
use crate::indicator::Indicator;
use crate::registry::HardwareRegistry;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated servo
// ────────────────────────────────────────────────────────────────────────────

/// Shared record of every angle written to a [`SimActuator`].
#[derive(Debug, Clone, Default)]
pub struct WriteLog(Arc<Mutex<Vec<i32>>>);

impl WriteLog {
    fn record(&self, angle: i32) {
        lock(&self.0).push(angle);
    }

    /// Every write so far, oldest first.
    pub fn snapshot(&self) -> Vec<i32> {
        lock(&self.0).clone()
    }

    /// Number of writes so far.
    pub fn len(&self) -> usize {
        lock(&self.0).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent write.
    pub fn last(&self) -> Option<i32> {
        lock(&self.0).last().copied()
    }

    /// Forget all recorded writes.
    pub fn clear(&self) {
        lock(&self.0).clear();
    }
}

/// A simulated servo that clamps and records every commanded angle.
pub struct SimActuator {
    id: String,
    angle: i32,
    attach_failures: u32,
    log: WriteLog,
}

impl SimActuator {
    /// Create a simulated servo parked at 0°.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            angle: 0,
            attach_failures: 0,
            log: WriteLog::default(),
        }
    }

    /// Make the first `n` calls to [`Actuator::attach`] fail.
    pub fn with_attach_failures(mut self, n: u32) -> Self {
        self.attach_failures = n;
        self
    }

    /// Handle to this actuator's write history.
    pub fn write_log(&self) -> WriteLog {
        self.log.clone()
    }
}

impl Actuator for SimActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn attach(&mut self, initial_deg: i32) -> Result<(), GripError> {
        if self.attach_failures > 0 {
            self.attach_failures -= 1;
            return Err(GripError::HardwareFault {
                component: self.id.clone(),
                details: "simulated attach failure".to_string(),
            });
        }
        self.write(initial_deg)
    }

    fn write(&mut self, angle_deg: i32) -> Result<(), GripError> {
        self.angle = clamp_servo_angle(angle_deg);
        self.log.record(self.angle);
        Ok(())
    }

    fn commanded_angle(&self) -> i32 {
        self.angle
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted gesture sensor
// ────────────────────────────────────────────────────────────────────────────

/// Producer side of a [`ScriptedGestureSource`]; push gestures from any
/// thread and the source yields them one per poll.
#[derive(Debug, Clone, Default)]
pub struct GestureFeed(Arc<Mutex<VecDeque<GestureSymbol>>>);

impl GestureFeed {
    pub fn push(&self, symbol: GestureSymbol) {
        lock(&self.0).push_back(symbol);
    }

    /// Gestures not yet polled.
    pub fn pending(&self) -> usize {
        lock(&self.0).len()
    }

    fn pop(&self) -> Option<GestureSymbol> {
        lock(&self.0).pop_front()
    }
}

/// A gesture sensor that replays whatever was pushed into its
/// [`GestureFeed`].
pub struct ScriptedGestureSource {
    side: SensorSide,
    feed: GestureFeed,
}

impl ScriptedGestureSource {
    pub fn new(side: SensorSide) -> Self {
        Self {
            side,
            feed: GestureFeed::default(),
        }
    }

    /// Handle used to inject gestures.
    pub fn feed(&self) -> GestureFeed {
        self.feed.clone()
    }
}

impl GestureSource for ScriptedGestureSource {
    fn side(&self) -> SensorSide {
        self.side
    }

    fn poll(&mut self) -> Option<GestureSymbol> {
        self.feed.pop()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated status LED
// ────────────────────────────────────────────────────────────────────────────

/// Shared view of the colour currently shown by a [`SimIndicator`].
#[derive(Debug, Clone)]
pub struct ColorMonitor(Arc<Mutex<Rgb>>);

impl ColorMonitor {
    pub fn current(&self) -> Rgb {
        *lock(&self.0)
    }
}

/// A simulated RGB LED.
pub struct SimIndicator {
    id: String,
    color: Arc<Mutex<Rgb>>,
}

impl SimIndicator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color: Arc::new(Mutex::new(Rgb::OFF)),
        }
    }

    pub fn monitor(&self) -> ColorMonitor {
        ColorMonitor(Arc::clone(&self.color))
    }
}

impl Indicator for SimIndicator {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_color(&mut self, color: Rgb) -> Result<(), GripError> {
        *lock(&self.color) = color;
        Ok(())
    }

    fn color(&self) -> Rgb {
        *lock(&self.color)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRegistry builder
// ────────────────────────────────────────────────────────────────────────────

/// Handles for every driver created by [`SimRegistry::build`].
#[derive(Debug, Clone)]
pub struct SimHandles {
    /// Write history per joint, in joint order.
    pub writes: Vec<WriteLog>,
    pub left: GestureFeed,
    pub right: GestureFeed,
    pub indicator: Option<ColorMonitor>,
}

/// Builder that constructs a [`HardwareRegistry`] populated with simulated
/// drivers: one [`SimActuator`] per joint and a [`ScriptedGestureSource`]
/// on each side.
#[derive(Default)]
pub struct SimRegistry {
    joints: Vec<(String, u32)>,
    indicator: bool,
}

impl SimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one simulated servo per label, in joint order.
    pub fn with_joints<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.joints
            .extend(labels.into_iter().map(|label| (label.into(), 0)));
        self
    }

    /// Add a simulated servo whose first `failures` attach attempts fail.
    pub fn with_flaky_joint(mut self, label: impl Into<String>, failures: u32) -> Self {
        self.joints.push((label.into(), failures));
        self
    }

    /// Add a simulated status LED.
    pub fn with_indicator(mut self) -> Self {
        self.indicator = true;
        self
    }

    /// Consume the builder and return the registry plus its handles.
    pub fn build(self) -> (HardwareRegistry, SimHandles) {
        let mut registry = HardwareRegistry::new();
        let mut writes = Vec::with_capacity(self.joints.len());
        for (label, failures) in self.joints {
            let act = SimActuator::new(format!("servo_{}", label.to_ascii_lowercase()))
                .with_attach_failures(failures);
            writes.push(act.write_log());
            registry.register_actuator(Box::new(act));
        }

        let left = ScriptedGestureSource::new(SensorSide::Left);
        let right = ScriptedGestureSource::new(SensorSide::Right);
        let (left_feed, right_feed) = (left.feed(), right.feed());
        registry.register_gesture_source(Box::new(left));
        registry.register_gesture_source(Box::new(right));

        let indicator = self.indicator.then(|| {
            let led = SimIndicator::new("status_led");
            let monitor = led.monitor();
            registry.register_indicator(Box::new(led));
            monitor
        });

        (
            registry,
            SimHandles {
                writes,
                left: left_feed,
                right: right_feed,
                indicator,
            },
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
