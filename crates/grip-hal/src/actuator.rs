//! Generic `Actuator` trait for hobby servos and any other angle-commanded
//! hardware.
//!
//! Drivers implement this trait and register themselves with a
//! [`HardwareRegistry`][crate::registry::HardwareRegistry].  The motion
//! layer only ever talks to the trait, so a PWM servo can be swapped for a
//! simulated one without touching the control logic.

use grip_types::GripError;

/// Lowest angle any servo may be commanded to, in degrees.
pub const SERVO_MIN_DEG: i32 = 0;
/// Highest angle any servo may be commanded to, in degrees.
pub const SERVO_MAX_DEG: i32 = 180;

/// Clamp `angle_deg` to the hardware-safe servo range.
///
/// Drivers call this inside [`Actuator::write`]; it is independent of the
/// tighter per-joint range enforced by the motion layer.
pub fn clamp_servo_angle(angle_deg: i32) -> i32 {
    angle_deg.clamp(SERVO_MIN_DEG, SERVO_MAX_DEG)
}

/// An angle-commanded hardware actuator (typically an SG90-class servo).
pub trait Actuator: Send {
    /// Stable identifier for this actuator, e.g. `"servo_base"`.
    fn id(&self) -> &str;

    /// Bind the driver to its physical output and park it at `initial_deg`.
    ///
    /// # Errors
    ///
    /// Returns [`GripError::HardwareFault`] when the output cannot be bound
    /// (e.g. no PWM timer is available).  Callers may retry.
    fn attach(&mut self, initial_deg: i32) -> Result<(), GripError>;

    /// Command the actuator to `angle_deg`.  The driver clamps the value to
    /// `SERVO_MIN_DEG..=SERVO_MAX_DEG` before applying it.
    ///
    /// # Errors
    ///
    /// Returns [`GripError::HardwareFault`] if the command cannot be applied.
    fn write(&mut self, angle_deg: i32) -> Result<(), GripError>;

    /// The most recently commanded (clamped) angle in degrees.
    fn commanded_angle(&self) -> i32;
}
