//! `grip-runtime` – the concurrent side of GestureGrip.
//!
//! # Modules
//!
//! - [`slot`] – [`EventSlot`]: capacity-one channel, newest event wins.
//! - [`debounce`] – [`Debouncer`] for NEAR/FAR mode changes.
//! - [`dispatcher`] – [`GestureDispatcher`]: sensor polling and routing.
//! - [`mode`] – [`ModeStateMachine`]: Direct / Select / Adjust.
//! - [`stabilizer`] – periodic hold of idle joints in Adjust mode.
//! - [`feedback`] – status LED colour policy and refresh task.
//! - [`controller`] – [`Controller`]: startup sequence and task supervision.
//! - [`telemetry`] – `tracing` subscriber and optional OTLP export.

pub mod controller;
pub mod debounce;
pub mod dispatcher;
pub mod feedback;
pub mod mode;
pub mod slot;
pub mod stabilizer;
pub mod telemetry;

pub use controller::{Controller, ControllerConfig, JointSpec};
pub use debounce::Debouncer;
pub use dispatcher::{Dispatch, DispatcherConfig, GestureDispatcher};
pub use feedback::FeedbackPolicy;
pub use mode::{ModeSettings, ModeStateMachine, Postures};
pub use slot::EventSlot;
pub use stabilizer::StabilizerConfig;
