//! [`Joint`] – one servo-driven axis of the arm.
//!
//! A joint exclusively owns its [`Actuator`] and enforces its own angle
//! range on every write, so `min <= angle() <= max` holds no matter which
//! path (trajectory step, direct write or hold) issued the command.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use grip_hal::{Actuator, SERVO_MAX_DEG, SERVO_MIN_DEG};
use grip_types::GripError;
use serde::{Deserialize, Serialize};

/// Inclusive angular range a joint may travel, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointRange {
    pub min: i32,
    pub max: i32,
}

impl JointRange {
    /// Build a validated range.
    ///
    /// # Errors
    ///
    /// Returns [`GripError::Config`] when `min > max` or either bound lies
    /// outside the servo's 0–180° envelope.
    pub fn new(min: i32, max: i32) -> Result<Self, GripError> {
        if min > max {
            return Err(GripError::Config(format!("joint range {min}..={max} is inverted")));
        }
        if min < SERVO_MIN_DEG || max > SERVO_MAX_DEG {
            return Err(GripError::Config(format!(
                "joint range {min}..={max} exceeds servo limits {SERVO_MIN_DEG}..={SERVO_MAX_DEG}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, angle: i32) -> i32 {
        angle.clamp(self.min, self.max)
    }

    pub fn contains(&self, angle: i32) -> bool {
        (self.min..=self.max).contains(&angle)
    }
}

/// A single arm joint: label, range, actuator and live state.
pub struct Joint {
    index: usize,
    label: String,
    range: JointRange,
    actuator: Mutex<Box<dyn Actuator>>,
    angle: AtomicI32,
    moving: AtomicBool,
}

impl Joint {
    /// Wrap an already attached actuator.
    ///
    /// The starting angle is the actuator's commanded angle clamped into
    /// `range`; nothing is written to the hardware here.
    pub fn new(
        index: usize,
        label: impl Into<String>,
        range: JointRange,
        actuator: Box<dyn Actuator>,
    ) -> Self {
        let angle = range.clamp(actuator.commanded_angle());
        Self {
            index,
            label: label.into(),
            range,
            actuator: Mutex::new(actuator),
            angle: AtomicI32::new(angle),
            moving: AtomicBool::new(false),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn range(&self) -> JointRange {
        self.range
    }

    /// Clamp `angle` to this joint's range.
    pub fn clamp(&self, angle: i32) -> i32 {
        self.range.clamp(angle)
    }

    /// Last angle written to the actuator.
    pub fn angle(&self) -> i32 {
        self.angle.load(Ordering::Acquire)
    }

    /// `true` while a trajectory task owns this joint.
    pub fn is_moving(&self) -> bool {
        self.moving.load(Ordering::Acquire)
    }

    pub(crate) fn set_moving(&self, moving: bool) {
        self.moving.store(moving, Ordering::Release);
    }

    /// Clamp `angle` to the joint range and write it to the actuator.
    ///
    /// Returns the angle actually applied.
    ///
    /// # Errors
    ///
    /// Propagates the actuator's [`GripError::HardwareFault`]; the cached
    /// angle is left unchanged in that case.
    pub fn set_angle(&self, angle: i32) -> Result<i32, GripError> {
        let clamped = self.range.clamp(angle);
        let mut actuator = self.lock_actuator();
        actuator.write(clamped)?;
        self.angle.store(clamped, Ordering::Release);
        Ok(clamped)
    }

    /// Re-write the current angle to the actuator without moving.
    ///
    /// The read and the write happen under the actuator lock, so a hold can
    /// never reinstate an angle older than the latest trajectory write.
    pub fn hold(&self) -> Result<i32, GripError> {
        let mut actuator = self.lock_actuator();
        let current = self.angle.load(Ordering::Acquire);
        actuator.write(current)?;
        Ok(current)
    }

    fn lock_actuator(&self) -> std::sync::MutexGuard<'_, Box<dyn Actuator>> {
        self.actuator
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Joint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Joint")
            .field("index", &self.index)
            .field("label", &self.label)
            .field("range", &self.range)
            .field("angle", &self.angle())
            .field("moving", &self.is_moving())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grip_hal::sim::SimActuator;

    fn joint(min: i32, max: i32, start: i32) -> (Joint, grip_hal::sim::WriteLog) {
        let mut act = SimActuator::new("servo_test");
        act.attach(start).unwrap();
        let log = act.write_log();
        log.clear();
        let range = JointRange::new(min, max).unwrap();
        (Joint::new(0, "TEST", range, Box::new(act)), log)
    }

    #[test]
    fn range_rejects_inverted_and_out_of_envelope() {
        assert!(JointRange::new(80, 20).is_err());
        assert!(JointRange::new(-5, 90).is_err());
        assert!(JointRange::new(0, 181).is_err());
        assert!(JointRange::new(20, 80).is_ok());
    }

    #[test]
    fn new_joint_clamps_initial_angle_without_writing() {
        let (j, log) = joint(20, 80, 0);
        assert_eq!(j.angle(), 20);
        assert!(log.is_empty());
        assert!(!j.is_moving());
    }

    #[test]
    fn set_angle_clamps_to_joint_range() {
        let (j, log) = joint(20, 80, 50);
        assert_eq!(j.set_angle(120).unwrap(), 80);
        assert_eq!(j.angle(), 80);
        assert_eq!(j.set_angle(-10).unwrap(), 20);
        assert_eq!(j.angle(), 20);
        assert_eq!(log.snapshot(), vec![80, 20]);
        assert!(j.range().contains(j.angle()));
    }

    #[test]
    fn hold_rewrites_current_angle() {
        let (j, log) = joint(0, 170, 85);
        assert_eq!(j.hold().unwrap(), 85);
        assert_eq!(j.hold().unwrap(), 85);
        assert_eq!(j.angle(), 85);
        assert_eq!(log.snapshot(), vec![85, 85]);
    }
}
