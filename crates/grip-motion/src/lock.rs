//! [`JointLockManager`] – holds idle joints in place while a sibling moves.
//!
//! Cheap servos sag or oscillate under the reaction torque of a neighbouring
//! joint.  Re-commanding each idle joint's own angle counters that drift
//! without starting a trajectory.  Joints that are currently running a
//! trajectory are skipped: the trajectory task is their only writer.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::joint::Joint;

/// Issues hold commands to every joint but the active one.
#[derive(Clone)]
pub struct JointLockManager {
    joints: Vec<Arc<Joint>>,
}

impl JointLockManager {
    pub fn new(joints: Vec<Arc<Joint>>) -> Self {
        Self { joints }
    }

    /// Hold every joint except `active` (`None` holds them all).
    ///
    /// Returns the number of joints that received a hold command.  Write
    /// failures are logged and skipped.
    pub fn lock_all_except(&self, active: Option<usize>) -> usize {
        let mut held = 0;
        for joint in &self.joints {
            if Some(joint.index()) == active || joint.is_moving() {
                continue;
            }
            match joint.hold() {
                Ok(angle) => {
                    trace!(joint = joint.label(), angle, "joint held");
                    held += 1;
                }
                Err(e) => warn!(joint = joint.label(), error = %e, "hold failed"),
            }
        }
        held
    }
}
