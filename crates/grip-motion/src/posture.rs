//! Canned whole-arm postures.
//!
//! A [`Posture`] is an ordered list of single-joint moves.  Each move is
//! started on the [`MotionEngine`] and followed by a short settle delay
//! before the next joint starts, so several servos never stall at once and
//! brown out the supply.  Trajectories still overlap in time; the postures
//! are sequenced, not coordinated.

use std::time::Duration;

use grip_types::GripError;
use tokio::time::sleep;
use tracing::info;

use crate::easing::Easing;
use crate::engine::MotionEngine;

/// One joint move within a [`Posture`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostureStep {
    pub joint: usize,
    pub target_deg: i32,
    /// Delay after starting this move, before the next step begins.
    pub settle: Duration,
}

/// A named sequence of joint moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posture {
    name: String,
    steps: Vec<PostureStep>,
}

impl Posture {
    pub fn new(name: impl Into<String>, steps: Vec<PostureStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[PostureStep] {
        &self.steps
    }

    /// Start every step on `engine` with the given easing, pausing for each
    /// step's settle delay.  Returns once the last move has been started;
    /// use [`MotionEngine::wait_for_idle`] to wait for arrival.
    ///
    /// # Errors
    ///
    /// Stops at the first failing [`MotionEngine::move_to`].
    pub async fn run(
        &self,
        engine: &MotionEngine,
        easing: Easing,
        steps_per_degree: u32,
    ) -> Result<(), GripError> {
        info!(posture = %self.name, "moving to posture");
        for step in &self.steps {
            engine
                .move_to(step.joint, step.target_deg, easing, steps_per_degree)
                .await?;
            if !step.settle.is_zero() {
                sleep(step.settle).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::MotionConfig;
    use crate::joint::{Joint, JointRange};
    use grip_hal::Actuator;
    use grip_hal::sim::SimActuator;

    fn engine(ranges: &[(i32, i32)]) -> MotionEngine {
        let joints = ranges
            .iter()
            .enumerate()
            .map(|(i, &(min, max))| {
                let mut act = SimActuator::new(format!("servo_{i}"));
                act.attach(min).unwrap();
                Arc::new(Joint::new(i, format!("J{i}"), JointRange::new(min, max).unwrap(), Box::new(act)))
            })
            .collect();
        MotionEngine::new(joints, MotionConfig::default())
    }

    fn step(joint: usize, target_deg: i32, settle_ms: u64) -> PostureStep {
        PostureStep {
            joint,
            target_deg,
            settle: Duration::from_millis(settle_ms),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn posture_drives_each_joint_to_its_clamped_target() {
        let engine = engine(&[(20, 80), (0, 80), (0, 180)]);
        let downward = Posture::new("downward", vec![step(0, 75, 300), step(1, 100, 300), step(2, 0, 0)]);
        downward.run(&engine, Easing::Cos, 1).await.unwrap();
        assert!(engine.wait_for_idle(Duration::from_secs(10)).await);

        let angles: Vec<i32> = engine.joints().iter().map(|j| j.angle()).collect();
        // joint 1 is clamped to its 80° limit, joint 2 was already at 0°
        assert_eq!(angles, vec![75, 80, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delays_stagger_joint_starts() {
        let engine = engine(&[(0, 180), (0, 180)]);
        let posture = Posture::new("staggered", vec![step(0, 90, 300), step(1, 90, 0)]);
        let started = tokio::time::Instant::now();
        posture.run(&engine, Easing::Linear, 1).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
        assert!(engine.is_moving(1));
        engine.stop_all().await;
    }

    #[tokio::test]
    async fn invalid_joint_aborts_posture() {
        let engine = engine(&[(0, 180)]);
        let posture = Posture::new("broken", vec![step(3, 90, 0)]);
        assert!(matches!(
            posture.run(&engine, Easing::Cos, 1).await,
            Err(GripError::InvalidJoint(3))
        ));
    }
}
