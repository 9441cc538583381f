//! Background hold loop for Adjust mode.
//!
//! While a joint is being fine-tuned its neighbours are re-held every
//! `active_interval`; otherwise the loop only wakes every `idle_interval`
//! to re-check the mode.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use grip_motion::JointLockManager;
use grip_types::{ControlMode, ModeSnapshot};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct StabilizerConfig {
    pub active_interval: Duration,
    pub idle_interval: Duration,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            active_interval: Duration::from_millis(100),
            idle_interval: Duration::from_millis(500),
        }
    }
}

/// The joint to keep free, if the stabilizer should be holding at all.
pub fn hold_target(snapshot: &ModeSnapshot) -> Option<usize> {
    match snapshot.mode {
        ControlMode::Adjust => snapshot.selection,
        _ => None,
    }
}

pub async fn run_stabilizer(
    locks: JointLockManager,
    snapshots: watch::Receiver<ModeSnapshot>,
    config: StabilizerConfig,
    shutdown: Arc<AtomicBool>,
) {
    debug!("stabilizer started");
    while !shutdown.load(Ordering::Acquire) {
        let snapshot = *snapshots.borrow();
        match hold_target(&snapshot) {
            Some(active) => {
                locks.lock_all_except(Some(active));
                sleep(config.active_interval).await;
            }
            None => sleep(config.idle_interval).await,
        }
    }
    debug!("stabilizer stopped");
}
