//! [`Controller`] – bootstraps the arm and supervises the runtime tasks.
//!
//! Startup order:
//!
//! 1. attach every actuator (with retries), spaced out to limit inrush;
//! 2. wait for the servo supply to settle, then drive to the upright
//!    posture and wait for it to finish;
//! 3. initialise both gesture sensors and discard their warm-up noise;
//! 4. spawn the dispatcher, mode consumer, stabilizer and (if an indicator
//!    is registered) feedback tasks.
//!
//! An attach failure aborts startup: no task is spawned and no gesture is
//! ever read.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use grip_hal::{GestureSource, HardwareParts, HardwareRegistry, attach_with_retry};
use grip_motion::{
    Easing, Joint, JointLockManager, JointRange, MotionConfig, MotionEngine, Posture, PostureStep,
};
use grip_types::{GripError, ModeSnapshot, Rgb};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};

use crate::dispatcher::{DispatcherConfig, GestureDispatcher};
use crate::feedback::{FeedbackPolicy, run_feedback};
use crate::mode::{ModeSettings, ModeStateMachine, Postures};
use crate::slot::EventSlot;
use crate::stabilizer::{StabilizerConfig, run_stabilizer};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Static description of one joint.
#[derive(Debug, Clone)]
pub struct JointSpec {
    pub label: String,
    pub range: JointRange,
    pub upright_deg: i32,
    pub downward_deg: i32,
    /// Pause after starting this joint's posture move.
    pub settle: Duration,
    pub color: Rgb,
}

impl JointSpec {
    fn new(
        label: &str,
        (min, max): (i32, i32),
        upright_deg: i32,
        downward_deg: i32,
        settle_ms: u64,
        color: Rgb,
    ) -> Self {
        Self {
            label: label.to_string(),
            range: JointRange { min, max },
            upright_deg,
            downward_deg,
            settle: Duration::from_millis(settle_ms),
            color,
        }
    }
}

/// Everything [`Controller::start`] needs besides the hardware.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub joints: Vec<JointSpec>,
    pub motion: MotionConfig,
    pub mode: ModeSettings,
    pub dispatcher: DispatcherConfig,
    pub stabilizer: StabilizerConfig,
    pub feedback_interval: Duration,
    pub blink_interval: Duration,
    pub brightness: f32,
    pub attach_retries: u32,
    /// Pause after each actuator attach.
    pub attach_spacing: Duration,
    /// Pause between attaching and the first move.
    pub power_settle: Duration,
    pub startup_steps_per_degree: u32,
    /// Upper bound on waiting for the startup posture.
    pub posture_timeout: Duration,
    /// Gestures read during this window after sensor init are dropped.
    pub warmup: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            joints: vec![
                JointSpec::new("BASE", (20, 80), 50, 75, 300, Rgb::new(150, 0, 255)),
                JointSpec::new("MIDDLE", (0, 80), 60, 100, 300, Rgb::new(50, 232, 133)),
                JointSpec::new("CROSS", (0, 180), 90, 0, 200, Rgb::new(255, 190, 0)),
                JointSpec::new("LEFT", (0, 170), 85, 0, 50, Rgb::new(0, 0, 255)),
                JointSpec::new("RIGHT", (0, 170), 85, 0, 0, Rgb::new(255, 0, 0)),
            ],
            motion: MotionConfig::default(),
            mode: ModeSettings::default(),
            dispatcher: DispatcherConfig::default(),
            stabilizer: StabilizerConfig::default(),
            feedback_interval: Duration::from_millis(50),
            blink_interval: Duration::from_millis(500),
            brightness: 0.3,
            attach_retries: 3,
            attach_spacing: Duration::from_millis(200),
            power_settle: Duration::from_millis(500),
            startup_steps_per_degree: 3,
            posture_timeout: Duration::from_millis(8000),
            warmup: Duration::from_millis(1000),
        }
    }
}

impl ControllerConfig {
    fn postures(&self) -> Postures {
        let posture = |name: &str, target: fn(&JointSpec) -> i32| {
            let steps = self
                .joints
                .iter()
                .enumerate()
                .map(|(joint, spec)| PostureStep {
                    joint,
                    target_deg: target(spec),
                    settle: spec.settle,
                })
                .collect();
            Posture::new(name, steps)
        };
        Postures {
            upright: posture("upright", |s| s.upright_deg),
            downward: posture("downward", |s| s.downward_deg),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Controller
// ────────────────────────────────────────────────────────────────────────────

/// A running arm controller.
pub struct Controller {
    engine: Arc<MotionEngine>,
    machine: Arc<ModeStateMachine>,
    shutdown: Arc<AtomicBool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Controller {
    /// Bring the arm up and start the runtime tasks.
    ///
    /// # Errors
    ///
    /// - [`GripError::Config`] if the registry is incomplete or its actuator
    ///   count does not match `config.joints`.
    /// - [`GripError::AttachFailed`] if an actuator cannot be attached.
    /// - Motion errors from the startup posture.
    pub async fn start(hardware: HardwareRegistry, config: ControllerConfig) -> Result<Self, GripError> {
        let HardwareParts {
            actuators,
            mut left,
            mut right,
            indicator,
        } = hardware.into_parts()?;
        if actuators.len() != config.joints.len() {
            return Err(GripError::Config(format!(
                "{} actuators registered for {} joints",
                actuators.len(),
                config.joints.len()
            )));
        }

        let mut joints = Vec::with_capacity(actuators.len());
        for (index, (mut actuator, spec)) in actuators.into_iter().zip(&config.joints).enumerate() {
            attach_with_retry(actuator.as_mut(), spec.range.clamp(0), config.attach_retries)?;
            info!(joint = %spec.label, actuator = actuator.id(), "actuator attached");
            joints.push(Arc::new(Joint::new(index, spec.label.clone(), spec.range, actuator)));
            sleep(config.attach_spacing).await;
        }

        let engine = Arc::new(MotionEngine::new(joints.clone(), config.motion.clone()));
        let locks = JointLockManager::new(joints);
        let postures = config.postures();

        sleep(config.power_settle).await;
        postures
            .upright
            .run(&engine, Easing::Cos, config.startup_steps_per_degree)
            .await?;
        if !engine.wait_for_idle(config.posture_timeout).await {
            warn!(
                timeout_ms = config.posture_timeout.as_millis() as u64,
                "startup posture still moving after timeout"
            );
        }
        engine.stop_all().await;

        for sensor in [&mut left, &mut right] {
            if let Err(e) = sensor.init() {
                warn!(side = %sensor.side(), error = %e, "gesture sensor init failed");
            }
        }
        let discarded = discard_warmup(
            left.as_mut(),
            right.as_mut(),
            config.warmup,
            config.dispatcher.poll_interval,
        )
        .await;
        info!(discarded, "sensor warm-up complete");

        let machine = Arc::new(ModeStateMachine::new(
            Arc::clone(&engine),
            locks.clone(),
            EventSlot::new(),
            postures,
            config.mode.clone(),
        ));
        let shutdown = Arc::new(AtomicBool::new(false));
        let mut tasks = Vec::with_capacity(4);

        let dispatcher =
            GestureDispatcher::new(left, right, Arc::clone(&machine), config.dispatcher.clone());
        tasks.push(("dispatcher", tokio::spawn(dispatcher.run(Arc::clone(&shutdown)))));
        tasks.push((
            "consumer",
            tokio::spawn(Arc::clone(&machine).run(Arc::clone(&shutdown))),
        ));
        tasks.push((
            "stabilizer",
            tokio::spawn(run_stabilizer(
                locks,
                machine.subscribe(),
                config.stabilizer.clone(),
                Arc::clone(&shutdown),
            )),
        ));
        if let Some(indicator) = indicator {
            let policy = FeedbackPolicy::new(
                config.joints.iter().map(|j| j.color).collect(),
                config.brightness,
                config.blink_interval,
            );
            tasks.push((
                "feedback",
                tokio::spawn(run_feedback(
                    indicator,
                    policy,
                    machine.subscribe(),
                    config.feedback_interval,
                    Arc::clone(&shutdown),
                )),
            ));
        }

        info!(joints = engine.joint_count(), tasks = tasks.len(), "controller running");
        Ok(Self {
            engine,
            machine,
            shutdown,
            tasks,
        })
    }

    pub fn engine(&self) -> &Arc<MotionEngine> {
        &self.engine
    }

    pub fn machine(&self) -> &Arc<ModeStateMachine> {
        &self.machine
    }

    pub fn snapshot(&self) -> ModeSnapshot {
        self.machine.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<ModeSnapshot> {
        self.machine.subscribe()
    }

    /// Stop every task, wait for them to exit, then stop all motion.
    pub async fn shutdown(self) {
        self.shutdown.store(true, Ordering::Release);
        for (name, handle) in self.tasks {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "task ended abnormally");
            }
        }
        self.engine.stop_all().await;
        info!("controller stopped");
    }
}

async fn discard_warmup(
    left: &mut dyn GestureSource,
    right: &mut dyn GestureSource,
    window: Duration,
    poll_interval: Duration,
) -> usize {
    let deadline = Instant::now() + window;
    let mut discarded = 0;
    while Instant::now() < deadline {
        discarded += usize::from(left.poll().is_some());
        discarded += usize::from(right.poll().is_some());
        sleep(poll_interval).await;
    }
    discarded
}
