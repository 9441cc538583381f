//! `grip-motion` – joints, trajectories and stabilization.
//!
//! # Modules
//!
//! - [`joint`] – [`Joint`]: a servo axis with a clamped angle range.
//! - [`easing`] – [`Easing`]: linear / sin / cos progress curves.
//! - [`engine`] – [`MotionEngine`]: one cancellable trajectory task per
//!   joint, deadzone and jitter filtering.
//! - [`lock`] – [`JointLockManager`]: hold commands for idle joints.
//! - [`posture`] – [`Posture`]: canned multi-joint move sequences.

pub mod easing;
pub mod engine;
pub mod joint;
pub mod lock;
pub mod posture;

pub use easing::Easing;
pub use engine::{MotionConfig, MotionEngine, MoveOutcome};
pub use joint::{Joint, JointRange};
pub use lock::JointLockManager;
pub use posture::{Posture, PostureStep};
