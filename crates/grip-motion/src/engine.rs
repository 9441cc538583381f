//! [`MotionEngine`] – smooth, interruptible single-joint trajectories.
//!
//! Each joint has at most one trajectory task at a time.  Starting a new
//! move on a joint first signals the running task to stop and then awaits
//! it, so two trajectories can never write to the same actuator
//! concurrently.
//!
//! # Trajectory
//!
//! For a move from `start` to `target` the task runs
//! `|target − start| × steps_per_degree` steps.  Step `i` maps
//! `r = i / steps` through the requested [`Easing`] and computes
//! `start + direction · eased · distance`.  A write is issued only when that
//! angle is at least `jitter_deg` away from the last written angle, and the
//! task sleeps `step_interval` between steps.  The stop flag is observed once
//! per step; a cancelled task leaves the joint where it is, a completed task
//! finishes with an exact write of `target`.
//!
//! Targets closer than `deadzone_deg` to the current angle are written
//! directly without spawning a task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use grip_types::GripError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::easing::Easing;
use crate::joint::Joint;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning knobs for [`MotionEngine`].
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Moves shorter than this are written directly.
    pub deadzone_deg: i32,
    /// Minimum change between two consecutive trajectory writes.
    pub jitter_deg: i32,
    /// Sleep between trajectory steps.
    pub step_interval: Duration,
    /// Polling period of [`MotionEngine::wait_for_idle`].
    pub idle_poll: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            deadzone_deg: 5,
            jitter_deg: 3,
            step_interval: Duration::from_millis(20),
            idle_poll: Duration::from_millis(50),
        }
    }
}

/// How a [`MotionEngine::move_to`] request was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Inside the deadzone: the clamped target was written at once.
    Immediate { angle: i32 },
    /// A trajectory task was started.
    Trajectory { from: i32, to: i32 },
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal task bookkeeping
// ─────────────────────────────────────────────────────────────────────────────

struct ActiveTrajectory {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

struct Trajectory {
    start: i32,
    target: i32,
    easing: Easing,
    steps_per_degree: u32,
}

/// Clears the joint's moving flag when the trajectory task ends, however it
/// ends.
struct MovingGuard(Arc<Joint>);

impl MovingGuard {
    fn engage(joint: Arc<Joint>) -> Self {
        joint.set_moving(true);
        Self(joint)
    }
}

impl Drop for MovingGuard {
    fn drop(&mut self) {
        self.0.set_moving(false);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MotionEngine
// ─────────────────────────────────────────────────────────────────────────────

/// Drives the arm's joints through eased trajectories.
pub struct MotionEngine {
    joints: Vec<Arc<Joint>>,
    slots: Vec<Mutex<Option<ActiveTrajectory>>>,
    config: MotionConfig,
}

impl MotionEngine {
    /// Take charge of `joints`; index `i` in the vector is joint `i`.
    pub fn new(joints: Vec<Arc<Joint>>, config: MotionConfig) -> Self {
        let slots = joints.iter().map(|_| Mutex::new(None)).collect();
        Self {
            joints,
            slots,
            config,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn joints(&self) -> &[Arc<Joint>] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Look up joint `index`.
    ///
    /// # Errors
    ///
    /// [`GripError::InvalidJoint`] when `index` is out of bounds.
    pub fn joint(&self, index: usize) -> Result<&Arc<Joint>, GripError> {
        self.joints.get(index).ok_or(GripError::InvalidJoint(index))
    }

    /// `true` while a trajectory is running on joint `index`.
    pub fn is_moving(&self, index: usize) -> bool {
        self.joints.get(index).is_some_and(|j| j.is_moving())
    }

    /// `true` while any joint is running a trajectory.
    pub fn any_moving(&self) -> bool {
        self.joints.iter().any(|j| j.is_moving())
    }

    /// Move joint `index` towards `target_deg`.
    ///
    /// The target is clamped to the joint range.  Any trajectory already
    /// running on the joint is stopped and joined before anything is
    /// written.
    ///
    /// # Errors
    ///
    /// [`GripError::InvalidJoint`] for a bad index, or the actuator's
    /// [`GripError::HardwareFault`] for a failed direct write.  Failures
    /// inside a spawned trajectory are logged and end that trajectory.
    pub async fn move_to(
        &self,
        index: usize,
        target_deg: i32,
        easing: Easing,
        steps_per_degree: u32,
    ) -> Result<MoveOutcome, GripError> {
        let joint = Arc::clone(self.joint(index)?);
        let mut slot = self.slots[index].lock().await;
        Self::stop_slot(&joint, &mut slot).await;

        let target = joint.clamp(target_deg);
        let start = joint.angle();

        if (target - start).abs() < self.config.deadzone_deg {
            let angle = joint.set_angle(target)?;
            debug!(joint = joint.label(), angle, "deadzone move written directly");
            return Ok(MoveOutcome::Immediate { angle });
        }

        debug!(
            joint = joint.label(),
            from = start,
            to = target,
            %easing,
            steps_per_degree,
            "starting trajectory"
        );
        let stop = Arc::new(AtomicBool::new(false));
        let guard = MovingGuard::engage(joint);
        let trajectory = Trajectory {
            start,
            target,
            easing,
            steps_per_degree: steps_per_degree.max(1),
        };
        let handle = tokio::spawn(run_trajectory(
            guard,
            trajectory,
            Arc::clone(&stop),
            self.config.jitter_deg,
            self.config.step_interval,
        ));
        *slot = Some(ActiveTrajectory { stop, handle });

        Ok(MoveOutcome::Trajectory {
            from: start,
            to: target,
        })
    }

    /// Stop the trajectory on joint `index`, if any, and wait for it to exit.
    /// The joint keeps its last written angle.
    pub async fn cancel(&self, index: usize) -> Result<(), GripError> {
        let joint = self.joint(index)?;
        let mut slot = self.slots[index].lock().await;
        Self::stop_slot(joint, &mut slot).await;
        Ok(())
    }

    /// Stop and join every running trajectory.
    pub async fn stop_all(&self) {
        for (joint, slot) in self.joints.iter().zip(&self.slots) {
            let mut slot = slot.lock().await;
            Self::stop_slot(joint, &mut slot).await;
        }
    }

    /// Wait until no joint is moving, polling every `idle_poll`.
    ///
    /// Returns `false` if joints are still moving after `timeout`.
    pub async fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if !self.any_moving() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(self.config.idle_poll).await;
        }
    }

    async fn stop_slot(joint: &Joint, slot: &mut Option<ActiveTrajectory>) {
        if let Some(active) = slot.take() {
            active.stop.store(true, Ordering::Release);
            if let Err(e) = active.handle.await {
                warn!(joint = joint.label(), error = %e, "trajectory task ended abnormally");
            }
        }
    }
}

async fn run_trajectory(
    guard: MovingGuard,
    trajectory: Trajectory,
    stop: Arc<AtomicBool>,
    jitter_deg: i32,
    step_interval: Duration,
) {
    let joint = &guard.0;
    let Trajectory {
        start,
        target,
        easing,
        steps_per_degree,
    } = trajectory;

    let distance = (target - start).abs();
    let direction = (target - start).signum();
    let total_steps = (distance as u32).saturating_mul(steps_per_degree).max(1);
    let mut last_written = start;

    for step in 1..=total_steps {
        if stop.load(Ordering::Acquire) {
            debug!(joint = joint.label(), angle = joint.angle(), "trajectory cancelled");
            return;
        }

        let eased = easing.apply(step as f32 / total_steps as f32);
        let angle = start + direction * (eased * distance as f32).round() as i32;
        if (angle - last_written).abs() >= jitter_deg {
            match joint.set_angle(angle) {
                Ok(applied) => last_written = applied,
                Err(e) => {
                    warn!(joint = joint.label(), angle, error = %e, "trajectory write failed");
                    return;
                }
            }
        }

        sleep(step_interval).await;
    }

    if stop.load(Ordering::Acquire) {
        debug!(joint = joint.label(), angle = joint.angle(), "trajectory cancelled");
        return;
    }
    match joint.set_angle(target) {
        Ok(_) => debug!(joint = joint.label(), angle = target, "trajectory complete"),
        Err(e) => warn!(joint = joint.label(), angle = target, error = %e, "final write failed"),
    }
}
