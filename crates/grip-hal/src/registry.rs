//! [`HardwareRegistry`] – collects every driver the controller needs before
//! startup.
//!
//! Actuators are registered in joint order (index 0 first); each one becomes
//! the exclusive output of the joint with the same index.  Exactly one
//! [`GestureSource`] per [`SensorSide`] is required, the [`Indicator`] is
//! optional.
//!
//! Binding actuators to their outputs goes through [`attach_with_retry`]:
//! a joint that cannot be attached after the configured number of attempts
//! is a fatal startup error, since commanding an unbound joint is undefined.

use std::collections::HashMap;

use grip_types::{GripError, SensorSide};
use tracing::{debug, warn};

use crate::actuator::Actuator;
use crate::gesture::GestureSource;
use crate::indicator::Indicator;

/// Central driver registry.
///
/// Construct with [`HardwareRegistry::new`], register drivers, then call
/// [`HardwareRegistry::into_parts`] to hand them to the controller.
#[derive(Default)]
pub struct HardwareRegistry {
    actuators: Vec<Box<dyn Actuator>>,
    sources: HashMap<SensorSide, Box<dyn GestureSource>>,
    indicator: Option<Box<dyn Indicator>>,
}

/// The validated driver set, split out of a [`HardwareRegistry`].
pub struct HardwareParts {
    /// One actuator per joint, in joint order.
    pub actuators: Vec<Box<dyn Actuator>>,
    pub left: Box<dyn GestureSource>,
    pub right: Box<dyn GestureSource>,
    pub indicator: Option<Box<dyn Indicator>>,
}

impl HardwareRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an actuator.  The n-th registered actuator drives joint n.
    pub fn register_actuator(&mut self, actuator: Box<dyn Actuator>) {
        self.actuators.push(actuator);
    }

    /// Register a gesture source.  Any previously registered source for the
    /// same side is replaced.
    pub fn register_gesture_source(&mut self, source: Box<dyn GestureSource>) {
        self.sources.insert(source.side(), source);
    }

    /// Register the status indicator, replacing any previous one.
    pub fn register_indicator(&mut self, indicator: Box<dyn Indicator>) {
        self.indicator = Some(indicator);
    }

    /// Number of registered actuators.
    pub fn actuator_count(&self) -> usize {
        self.actuators.len()
    }

    /// Consume the registry and return its drivers.
    ///
    /// # Errors
    ///
    /// Returns [`GripError::Config`] when no actuator is registered or when
    /// either gesture source is missing.
    pub fn into_parts(mut self) -> Result<HardwareParts, GripError> {
        if self.actuators.is_empty() {
            return Err(GripError::Config("no actuators registered".to_string()));
        }
        let left = self
            .sources
            .remove(&SensorSide::Left)
            .ok_or_else(|| GripError::Config("left gesture source is not registered".to_string()))?;
        let right = self
            .sources
            .remove(&SensorSide::Right)
            .ok_or_else(|| GripError::Config("right gesture source is not registered".to_string()))?;
        Ok(HardwareParts {
            actuators: self.actuators,
            left,
            right,
            indicator: self.indicator,
        })
    }
}

/// Attach `actuator` at `initial_deg`, retrying up to `max_attempts` times.
///
/// A `max_attempts` of zero is treated as one.
///
/// # Errors
///
/// Returns [`GripError::AttachFailed`] carrying the last driver error when
/// every attempt fails.
pub fn attach_with_retry(
    actuator: &mut dyn Actuator,
    initial_deg: i32,
    max_attempts: u32,
) -> Result<(), GripError> {
    let attempts = max_attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match actuator.attach(initial_deg) {
            Ok(()) => {
                debug!(actuator = actuator.id(), attempt, "actuator attached");
                return Ok(());
            }
            Err(e) => {
                warn!(actuator = actuator.id(), attempt, error = %e, "actuator attach failed");
                last_error = e.to_string();
            }
        }
    }
    Err(GripError::AttachFailed {
        joint: actuator.id().to_string(),
        attempts,
        details: last_error,
    })
}
