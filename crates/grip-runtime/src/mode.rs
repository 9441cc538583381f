//! [`ModeStateMachine`] – Direct / Select / Adjust interpretation of gestures.
//!
//! Mode and selection have exactly one writer: this type.  Transitions are
//! triggered by the dispatcher through [`ModeStateMachine::advance`];
//! directional events are consumed from the [`EventSlot`] by
//! [`ModeStateMachine::run`].  Every change is published on a
//! [`watch`] channel so the feedback and stabilizer tasks can read it
//! without touching the state lock.
//!
//! | Mode   | Up                 | Down               | Left     | Right   |
//! |--------|--------------------|--------------------|----------|---------|
//! | Direct | –                  | –                  | downward | upright |
//! | Select | previous joint     | next joint         | –        | –       |
//! | Adjust | +step on selection | −step on selection | –        | –       |

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use grip_motion::{Easing, JointLockManager, MotionEngine, Posture};
use grip_types::{ControlMode, GestureEvent, GestureSymbol, GripError, ModeSnapshot};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::slot::EventSlot;

/// Tunables for event handling.
#[derive(Debug, Clone)]
pub struct ModeSettings {
    /// Degrees added or removed per Up/Down in Adjust mode.
    pub adjust_step_deg: i32,
    /// Pause between commanding an adjustment and re-locking the others.
    pub relock_delay: Duration,
    pub posture_easing: Easing,
    pub posture_steps_per_degree: u32,
    /// How long the consumer waits on the slot per iteration.
    pub receive_timeout: Duration,
    /// Pause between consumer iterations.
    pub consumer_interval: Duration,
}

impl Default for ModeSettings {
    fn default() -> Self {
        Self {
            adjust_step_deg: 5,
            relock_delay: Duration::from_millis(10),
            posture_easing: Easing::Cos,
            posture_steps_per_degree: 1,
            receive_timeout: Duration::from_millis(10),
            consumer_interval: Duration::from_millis(20),
        }
    }
}

/// Canned whole-arm postures used in Direct mode.
#[derive(Debug, Clone)]
pub struct Postures {
    pub upright: Posture,
    pub downward: Posture,
}

pub struct ModeStateMachine {
    engine: Arc<MotionEngine>,
    locks: JointLockManager,
    events: EventSlot<GestureEvent>,
    postures: Postures,
    settings: ModeSettings,
    state: Mutex<ModeSnapshot>,
    snapshot_tx: watch::Sender<ModeSnapshot>,
}

impl ModeStateMachine {
    pub fn new(
        engine: Arc<MotionEngine>,
        locks: JointLockManager,
        events: EventSlot<GestureEvent>,
        postures: Postures,
        settings: ModeSettings,
    ) -> Self {
        let initial = ModeSnapshot::default();
        let (snapshot_tx, _) = watch::channel(initial);
        Self {
            engine,
            locks,
            events,
            postures,
            settings,
            state: Mutex::new(initial),
            snapshot_tx,
        }
    }

    /// Current mode and selection.
    pub fn snapshot(&self) -> ModeSnapshot {
        *self.state()
    }

    /// Receiver that observes every published [`ModeSnapshot`].
    pub fn subscribe(&self) -> watch::Receiver<ModeSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn events(&self) -> &EventSlot<GestureEvent> {
        &self.events
    }

    pub fn settings(&self) -> &ModeSettings {
        &self.settings
    }

    // ────────────────────────────────────────────────────────────────────────
    // Transitions
    // ────────────────────────────────────────────────────────────────────────

    /// Move to the next mode in the Direct → Select → Adjust cycle and run
    /// its entry action.  Any pending directional event is discarded.
    pub fn advance(&self) -> ModeSnapshot {
        let flushed = self.events.drain();
        let snapshot = {
            let mut state = self.state();
            let mode = state.mode.next();
            state.mode = mode;
            state.selection = match mode {
                ControlMode::Direct => None,
                ControlMode::Select => Some(0),
                ControlMode::Adjust => state.selection,
            };
            self.snapshot_tx.send_replace(*state);
            *state
        };
        info!(
            mode = %snapshot.mode,
            selection = snapshot.selection_index(),
            flushed,
            "mode changed"
        );

        match (snapshot.mode, snapshot.selection) {
            (ControlMode::Select, Some(index)) => self.announce(index),
            (ControlMode::Adjust, Some(index)) => {
                self.locks.lock_all_except(Some(index));
            }
            _ => {}
        }
        snapshot
    }

    // ────────────────────────────────────────────────────────────────────────
    // Event handling
    // ────────────────────────────────────────────────────────────────────────

    /// Interpret one directional event according to the current mode.
    /// Events that mean nothing in the current mode are ignored.
    ///
    /// # Errors
    ///
    /// Propagates motion errors from posture runs and adjustments.
    pub async fn handle_event(&self, event: GestureEvent) -> Result<(), GripError> {
        let snapshot = self.snapshot();
        match (snapshot.mode, event.symbol) {
            (ControlMode::Direct, GestureSymbol::Right) => {
                self.run_posture(&self.postures.upright).await
            }
            (ControlMode::Direct, GestureSymbol::Left) => {
                self.run_posture(&self.postures.downward).await
            }
            (ControlMode::Select, GestureSymbol::Up) => {
                self.step_selection(-1);
                Ok(())
            }
            (ControlMode::Select, GestureSymbol::Down) => {
                self.step_selection(1);
                Ok(())
            }
            (ControlMode::Adjust, GestureSymbol::Up) => match snapshot.selection {
                Some(index) => self.adjust(index, self.settings.adjust_step_deg).await,
                None => Ok(()),
            },
            (ControlMode::Adjust, GestureSymbol::Down) => match snapshot.selection {
                Some(index) => self.adjust(index, -self.settings.adjust_step_deg).await,
                None => Ok(()),
            },
            (mode, symbol) => {
                debug!(%mode, %symbol, side = %event.side, "event ignored in this mode");
                Ok(())
            }
        }
    }

    /// Consume events from the slot until `shutdown` is set.
    ///
    /// After each handled event anything that arrived in the meantime is
    /// flushed: gestures made while the arm was busy are stale.
    pub async fn run(self: Arc<Self>, shutdown: Arc<AtomicBool>) {
        debug!("mode consumer started");
        while !shutdown.load(Ordering::Acquire) {
            if let Some(event) = self.events.recv_timeout(self.settings.receive_timeout).await {
                debug!(symbol = %event.symbol, side = %event.side, "handling event");
                if let Err(e) = self.handle_event(event).await {
                    warn!(error = %e, "event handling failed");
                }
                let flushed = self.events.drain();
                if flushed > 0 {
                    debug!(flushed, "flushed events received while busy");
                }
            }
            sleep(self.settings.consumer_interval).await;
        }
        debug!("mode consumer stopped");
    }

    fn step_selection(&self, delta: isize) {
        let count = self.engine.joint_count();
        if count == 0 {
            return;
        }
        let index = {
            let mut state = self.state();
            // the mode may have moved on since the event was read
            if state.mode != ControlMode::Select {
                return;
            }
            let current = state.selection.unwrap_or(0) as isize;
            let next = (current + delta).rem_euclid(count as isize) as usize;
            state.selection = Some(next);
            self.snapshot_tx.send_replace(*state);
            next
        };
        self.announce(index);
    }

    async fn adjust(&self, index: usize, delta: i32) -> Result<(), GripError> {
        let joint = Arc::clone(self.engine.joint(index)?);
        self.locks.lock_all_except(Some(index));

        let from = joint.angle();
        let to = joint.clamp(from + delta);
        info!("{}: {from}° -> {to}° (step: {delta:+}°)", joint.label());
        self.engine.move_to(index, to, Easing::Linear, 1).await?;

        sleep(self.settings.relock_delay).await;
        self.locks.lock_all_except(Some(index));
        Ok(())
    }

    async fn run_posture(&self, posture: &Posture) -> Result<(), GripError> {
        posture
            .run(
                &self.engine,
                self.settings.posture_easing,
                self.settings.posture_steps_per_degree,
            )
            .await
    }

    fn announce(&self, index: usize) {
        if let Ok(joint) = self.engine.joint(index) {
            info!("[{index}] {} @ {}°", joint.label(), joint.angle());
        }
    }

    fn state(&self) -> MutexGuard<'_, ModeSnapshot> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grip_hal::Actuator;
    use grip_hal::sim::{SimActuator, WriteLog};
    use grip_motion::{Joint, JointRange, MotionConfig, PostureStep};
    use grip_types::SensorSide;

    const LABELS: [&str; 5] = ["BASE", "MIDDLE", "CROSS", "LEFT", "RIGHT"];

    struct Rig {
        machine: Arc<ModeStateMachine>,
        engine: Arc<MotionEngine>,
        writes: Vec<WriteLog>,
    }

    fn rig(angles: [i32; 5]) -> Rig {
        let ranges = [(20, 80), (0, 80), (0, 180), (0, 170), (0, 170)];
        let mut writes = Vec::new();
        let joints: Vec<Arc<Joint>> = LABELS
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let mut act = SimActuator::new(format!("servo_{i}"));
                act.attach(angles[i]).unwrap();
                let log = act.write_log();
                log.clear();
                writes.push(log);
                let (min, max) = ranges[i];
                Arc::new(Joint::new(i, *label, JointRange::new(min, max).unwrap(), Box::new(act)))
            })
            .collect();
        let engine = Arc::new(MotionEngine::new(joints.clone(), MotionConfig::default()));
        let step = |joint, target_deg| PostureStep {
            joint,
            target_deg,
            settle: Duration::from_millis(50),
        };
        let postures = Postures {
            upright: Posture::new("upright", (0..5).map(|j| step(j, [50, 60, 90, 85, 85][j])).collect()),
            downward: Posture::new("downward", (0..5).map(|j| step(j, [75, 100, 0, 0, 0][j])).collect()),
        };
        let machine = Arc::new(ModeStateMachine::new(
            Arc::clone(&engine),
            JointLockManager::new(joints),
            EventSlot::new(),
            postures,
            ModeSettings::default(),
        ));
        Rig {
            machine,
            engine,
            writes,
        }
    }

    fn ev(symbol: GestureSymbol) -> GestureEvent {
        GestureEvent::new(symbol, SensorSide::Right)
    }

    #[test]
    fn modes_cycle_and_return_to_direct() {
        let rig = rig([50, 60, 90, 85, 85]);
        assert_eq!(rig.machine.snapshot(), ModeSnapshot::default());

        let s = rig.machine.advance();
        assert_eq!((s.mode, s.selection), (ControlMode::Select, Some(0)));
        let s = rig.machine.advance();
        assert_eq!((s.mode, s.selection), (ControlMode::Adjust, Some(0)));
        let s = rig.machine.advance();
        assert_eq!((s.mode, s.selection_index()), (ControlMode::Direct, -1));
    }

    #[test]
    fn transition_drains_pending_event() {
        let rig = rig([50, 60, 90, 85, 85]);
        rig.machine.events().publish(ev(GestureSymbol::Up));
        rig.machine.advance();
        assert!(rig.machine.events().is_empty());
    }

    #[test]
    fn transitions_are_published_to_subscribers() {
        let rig = rig([50, 60, 90, 85, 85]);
        let rx = rig.machine.subscribe();
        rig.machine.advance();
        assert_eq!(rx.borrow().mode, ControlMode::Select);
        assert_eq!(rx.borrow().selection, Some(0));
    }

    #[test]
    fn entering_adjust_holds_all_but_selected() {
        let rig = rig([50, 60, 90, 85, 85]);
        rig.machine.advance();
        for log in &rig.writes {
            log.clear();
        }
        rig.machine.advance();
        assert!(rig.writes[0].is_empty());
        assert_eq!(rig.writes[1].snapshot(), vec![60]);
        assert_eq!(rig.writes[4].snapshot(), vec![85]);
    }

    #[tokio::test]
    async fn selection_wraps_in_both_directions() {
        let rig = rig([50, 60, 90, 85, 85]);
        rig.machine.advance();

        rig.machine.handle_event(ev(GestureSymbol::Up)).await.unwrap();
        assert_eq!(rig.machine.snapshot().selection, Some(4));

        rig.machine.handle_event(ev(GestureSymbol::Down)).await.unwrap();
        assert_eq!(rig.machine.snapshot().selection, Some(0));

        rig.machine.handle_event(ev(GestureSymbol::Down)).await.unwrap();
        assert_eq!(rig.machine.snapshot().selection, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn adjust_steps_selected_joint() {
        let rig = rig([50, 60, 90, 85, 85]);
        rig.machine.advance();
        rig.machine.handle_event(ev(GestureSymbol::Down)).await.unwrap(); // MIDDLE
        rig.machine.advance();

        rig.machine.handle_event(ev(GestureSymbol::Down)).await.unwrap();
        assert!(rig.engine.wait_for_idle(Duration::from_secs(1)).await);
        assert_eq!(rig.engine.joints()[1].angle(), 55);
        rig.machine.handle_event(ev(GestureSymbol::Up)).await.unwrap();
        assert!(rig.engine.wait_for_idle(Duration::from_secs(1)).await);
        assert_eq!(rig.engine.joints()[1].angle(), 60);
        // neighbours untouched
        assert_eq!(rig.engine.joints()[0].angle(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn adjust_holds_neighbours_before_and_after_the_move() {
        let rig = rig([50, 60, 90, 85, 85]);
        rig.machine.advance();
        rig.machine.handle_event(ev(GestureSymbol::Down)).await.unwrap(); // MIDDLE
        rig.machine.advance();
        for log in &rig.writes {
            log.clear();
        }

        rig.machine.handle_event(ev(GestureSymbol::Down)).await.unwrap();
        assert!(rig.engine.wait_for_idle(Duration::from_secs(1)).await);

        assert_eq!(rig.writes[0].snapshot(), vec![50, 50]);
        assert_eq!(rig.writes[2].snapshot(), vec![90, 90]);
        assert_eq!(rig.writes[3].snapshot(), vec![85, 85]);
        assert_eq!(rig.writes[4].snapshot(), vec![85, 85]);
        assert_eq!(rig.writes[1].snapshot().last(), Some(&55));
    }

    #[tokio::test]
    async fn adjust_is_clamped_at_range_limit() {
        let rig = rig([78, 60, 90, 85, 85]);
        rig.machine.advance();
        rig.machine.advance(); // Adjust on BASE (20..=80)

        rig.machine.handle_event(ev(GestureSymbol::Up)).await.unwrap();
        assert_eq!(rig.engine.joints()[0].angle(), 80);
        rig.machine.handle_event(ev(GestureSymbol::Up)).await.unwrap();
        assert_eq!(rig.engine.joints()[0].angle(), 80);
    }

    #[tokio::test]
    async fn stray_events_are_ignored() {
        let rig = rig([50, 60, 90, 85, 85]);
        // Up/Down in Direct
        rig.machine.handle_event(ev(GestureSymbol::Up)).await.unwrap();
        assert!(!rig.engine.any_moving());

        rig.machine.advance();
        rig.machine.handle_event(ev(GestureSymbol::Left)).await.unwrap();
        assert_eq!(rig.machine.snapshot().selection, Some(0));
        assert!(!rig.engine.any_moving());
    }

    #[tokio::test(start_paused = true)]
    async fn direct_right_runs_upright_posture() {
        let rig = rig([20, 0, 0, 0, 0]);
        rig.machine.handle_event(ev(GestureSymbol::Right)).await.unwrap();
        assert!(rig.engine.wait_for_idle(Duration::from_secs(10)).await);
        let angles: Vec<i32> = rig.engine.joints().iter().map(|j| j.angle()).collect();
        assert_eq!(angles, vec![50, 60, 90, 85, 85]);
    }

    #[tokio::test(start_paused = true)]
    async fn direct_left_runs_downward_posture() {
        let rig = rig([50, 60, 90, 85, 85]);
        rig.machine.handle_event(ev(GestureSymbol::Left)).await.unwrap();
        assert!(rig.engine.wait_for_idle(Duration::from_secs(10)).await);
        let angles: Vec<i32> = rig.engine.joints().iter().map(|j| j.angle()).collect();
        assert_eq!(angles, vec![75, 80, 0, 0, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn consumer_handles_event_and_stops_on_shutdown() {
        let rig = rig([50, 60, 90, 85, 85]);
        rig.machine.advance();
        let shutdown = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(Arc::clone(&rig.machine).run(Arc::clone(&shutdown)));

        rig.machine.events().publish(ev(GestureSymbol::Down));
        sleep(Duration::from_millis(100)).await;
        assert_eq!(rig.machine.snapshot().selection, Some(1));

        shutdown.store(true, Ordering::Release);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn events_arriving_during_a_posture_are_discarded() {
        let rig = rig([20, 0, 0, 0, 0]);
        let shutdown = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(Arc::clone(&rig.machine).run(Arc::clone(&shutdown)));

        rig.machine.events().publish(ev(GestureSymbol::Right));
        sleep(Duration::from_millis(30)).await;
        // the upright posture is still stepping through its settle delays
        rig.machine.events().publish(ev(GestureSymbol::Left));

        sleep(Duration::from_secs(5)).await;
        assert!(rig.engine.wait_for_idle(Duration::from_secs(5)).await);
        assert!(rig.machine.events().is_empty());
        let angles: Vec<i32> = rig.engine.joints().iter().map(|j| j.angle()).collect();
        assert_eq!(angles, vec![50, 60, 90, 85, 85]);

        shutdown.store(true, Ordering::Release);
        task.await.unwrap();
    }
}
