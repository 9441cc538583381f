use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A decoded gesture reported by one of the proximity/gesture sensors.
///
/// Sensor drivers map their "no gesture" and "invalid read" codes to `None`
/// at the `grip_hal::GestureSource` boundary, so every value of this type is
/// a real gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureSymbol {
    Up,
    Down,
    Left,
    Right,
    /// Hand approaching the sensor.
    Near,
    /// Hand withdrawing from the sensor.
    Far,
}

impl GestureSymbol {
    /// `true` for the NEAR/FAR pair that cycles the control mode.
    pub fn is_mode_change(self) -> bool {
        matches!(self, GestureSymbol::Near | GestureSymbol::Far)
    }

    /// `true` for swipe gestures (UP/DOWN/LEFT/RIGHT).
    pub fn is_directional(self) -> bool {
        !self.is_mode_change()
    }

    /// Parse a lower-case symbol name such as `"up"` or `"near"`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "up" => Some(GestureSymbol::Up),
            "down" => Some(GestureSymbol::Down),
            "left" => Some(GestureSymbol::Left),
            "right" => Some(GestureSymbol::Right),
            "near" => Some(GestureSymbol::Near),
            "far" => Some(GestureSymbol::Far),
            _ => None,
        }
    }
}

impl fmt::Display for GestureSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GestureSymbol::Up => "UP",
            GestureSymbol::Down => "DOWN",
            GestureSymbol::Left => "LEFT",
            GestureSymbol::Right => "RIGHT",
            GestureSymbol::Near => "NEAR",
            GestureSymbol::Far => "FAR",
        };
        f.write_str(name)
    }
}

/// Which of the two gesture sensors produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorSide {
    Left,
    Right,
}

impl fmt::Display for SensorSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorSide::Left => f.write_str("LEFT"),
            SensorSide::Right => f.write_str("RIGHT"),
        }
    }
}

/// A gesture tagged with the sensor it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub symbol: GestureSymbol,
    pub side: SensorSide,
}

impl GestureEvent {
    pub fn new(symbol: GestureSymbol, side: SensorSide) -> Self {
        Self { symbol, side }
    }
}

/// The three operator control modes.
///
/// Transitions are strictly cyclic: `Direct → Select → Adjust → Direct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// Swipes drive whole-arm canned postures.
    #[default]
    Direct,
    /// Swipes cycle through the joints.
    Select,
    /// Swipes nudge the selected joint.
    Adjust,
}

impl ControlMode {
    /// The mode entered on the next NEAR/FAR trigger.
    pub fn next(self) -> Self {
        match self {
            ControlMode::Direct => ControlMode::Select,
            ControlMode::Select => ControlMode::Adjust,
            ControlMode::Adjust => ControlMode::Direct,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlMode::Direct => f.write_str("DIRECT"),
            ControlMode::Select => f.write_str("SELECT"),
            ControlMode::Adjust => f.write_str("ADJUST"),
        }
    }
}

/// Read-only view of the mode machine published to feedback and
/// stabilizer tasks.
///
/// `selection` is `None` whenever `mode` is [`ControlMode::Direct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModeSnapshot {
    pub mode: ControlMode,
    pub selection: Option<usize>,
}

impl ModeSnapshot {
    /// Selection as the signed index used on the wire and in logs
    /// (`-1` when nothing is selected).
    pub fn selection_index(&self) -> i32 {
        self.selection.map_or(-1, |i| i as i32)
    }
}

/// An 8-bit-per-channel indicator colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `factor` (clamped to `0.0..=1.0`), truncating.
    pub fn scaled(self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let scale = |c: u8| (c as f32 * factor) as u8;
        Self {
            r: scale(self.r),
            g: scale(self.g),
            b: scale(self.b),
        }
    }
}

/// Errors raised by the GestureGrip stack.
///
/// Out-of-range angles are never errors; they are clamped where they are
/// applied.
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum GripError {
    #[error("Actuator for joint {joint} failed to attach after {attempts} attempt(s): {details}")]
    AttachFailed {
        joint: String,
        attempts: u32,
        details: String,
    },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("No joint with index {0}")]
    InvalidJoint(usize),

    #[error("Configuration Error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_cycle_returns_to_direct_after_three_steps() {
        let mode = ControlMode::Direct;
        assert_eq!(mode.next(), ControlMode::Select);
        assert_eq!(mode.next().next(), ControlMode::Adjust);
        assert_eq!(mode.next().next().next(), ControlMode::Direct);
    }

    #[test]
    fn near_and_far_are_mode_changes() {
        assert!(GestureSymbol::Near.is_mode_change());
        assert!(GestureSymbol::Far.is_mode_change());
        for s in [
            GestureSymbol::Up,
            GestureSymbol::Down,
            GestureSymbol::Left,
            GestureSymbol::Right,
        ] {
            assert!(s.is_directional(), "{s} should be directional");
        }
    }

    #[test]
    fn parse_accepts_mixed_case_and_rejects_unknown() {
        assert_eq!(GestureSymbol::parse(" Up "), Some(GestureSymbol::Up));
        assert_eq!(GestureSymbol::parse("FAR"), Some(GestureSymbol::Far));
        assert_eq!(GestureSymbol::parse("none"), None);
        assert_eq!(GestureSymbol::parse(""), None);
    }

    #[test]
    fn snapshot_selection_index_is_minus_one_when_unselected() {
        let snap = ModeSnapshot::default();
        assert_eq!(snap.mode, ControlMode::Direct);
        assert_eq!(snap.selection_index(), -1);

        let snap = ModeSnapshot {
            mode: ControlMode::Select,
            selection: Some(3),
        };
        assert_eq!(snap.selection_index(), 3);
    }

    #[test]
    fn rgb_scaled_truncates_like_pwm_duty() {
        let c = Rgb::new(150, 0, 255).scaled(0.3);
        assert_eq!(c, Rgb::new(45, 0, 76));
        assert_eq!(Rgb::WHITE.scaled(2.0), Rgb::WHITE);
    }

    #[test]
    fn gesture_event_serializes_lowercase() {
        let ev = GestureEvent::new(GestureSymbol::Left, SensorSide::Right);
        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(json, r#"{"symbol":"left","side":"right"}"#);
    }

    #[test]
    fn grip_error_display() {
        let err = GripError::AttachFailed {
            joint: "BASE".to_string(),
            attempts: 3,
            details: "no PWM timer".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("BASE"));
        assert!(msg.contains("3 attempt"));
    }
}
