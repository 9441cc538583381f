//! Generic `GestureSource` trait for proximity/gesture sensors.

use grip_types::{GestureSymbol, GripError, SensorSide};

/// A non-blocking gesture sensor (e.g. an APDS-9960 on its own I2C bus).
///
/// Register exactly one source per [`SensorSide`] with the
/// [`HardwareRegistry`][crate::registry::HardwareRegistry].
pub trait GestureSource: Send {
    /// Which side of the arm this sensor is mounted on.
    fn side(&self) -> SensorSide;

    /// Power up and configure the sensor.
    ///
    /// # Errors
    ///
    /// Returns [`GripError::HardwareFault`] if the sensor does not respond.
    /// A failed sensor is not fatal: it simply never yields gestures.
    fn init(&mut self) -> Result<(), GripError> {
        Ok(())
    }

    /// Read the next decoded gesture, if any.
    ///
    /// Must return immediately.  `None` covers "no gesture pending",
    /// "sensor unavailable" and "undecodable read" alike.
    fn poll(&mut self) -> Option<GestureSymbol>;
}
