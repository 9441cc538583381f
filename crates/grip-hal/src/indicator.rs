//! Generic `Indicator` trait for the status LED (or any other visual
//! feedback device).

use grip_types::{GripError, Rgb};

/// An RGB status indicator.
pub trait Indicator: Send {
    /// Stable identifier for this indicator, e.g. `"status_led"`.
    fn id(&self) -> &str;

    /// Drive the indicator to `color`.
    ///
    /// # Errors
    ///
    /// Returns [`GripError::HardwareFault`] if the command cannot be applied.
    fn set_color(&mut self, color: Rgb) -> Result<(), GripError>;

    /// The colour most recently applied.
    fn color(&self) -> Rgb;
}
