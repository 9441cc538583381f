//! `grip-hal` – Hardware Abstraction Layer
//!
//! The traits the controller uses to reach the physical world, plus
//! simulated drivers so the whole stack runs without hardware.
//!
//! # Modules
//!
//! - [`actuator`] – [`Actuator`]: angle-commanded servo output.
//! - [`gesture`] – [`GestureSource`]: non-blocking gesture sensor.
//! - [`indicator`] – [`Indicator`]: RGB status LED.
//! - [`registry`] – [`HardwareRegistry`]: driver collection and
//!   [`attach_with_retry`].
//! - [`sim`] – simulated drivers and the [`SimRegistry`][sim::SimRegistry]
//!   builder.

pub mod actuator;
pub mod gesture;
pub mod indicator;
pub mod registry;
pub mod sim;

pub use actuator::{Actuator, SERVO_MAX_DEG, SERVO_MIN_DEG, clamp_servo_angle};
pub use gesture::GestureSource;
pub use indicator::Indicator;
pub use registry::{HardwareParts, HardwareRegistry, attach_with_retry};
