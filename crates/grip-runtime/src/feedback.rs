//! Status LED feedback.
//!
//! | Mode   | Colour                                          |
//! |--------|-------------------------------------------------|
//! | Direct | white                                           |
//! | Select | selected joint's colour, blinking               |
//! | Adjust | selected joint's colour, solid                  |
//!
//! Every colour is dimmed by the configured brightness.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use grip_hal::Indicator;
use grip_types::{ControlMode, ModeSnapshot, Rgb};
use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

/// Maps a [`ModeSnapshot`] to an indicator colour.
#[derive(Debug, Clone)]
pub struct FeedbackPolicy {
    joint_colors: Vec<Rgb>,
    brightness: f32,
    blink_interval: Duration,
    blink_on: bool,
    last_toggle: Option<Instant>,
}

impl FeedbackPolicy {
    pub fn new(joint_colors: Vec<Rgb>, brightness: f32, blink_interval: Duration) -> Self {
        Self {
            joint_colors,
            brightness,
            blink_interval,
            blink_on: false,
            last_toggle: None,
        }
    }

    /// Colour to show at `now`.  Advances the blink phase in Select mode.
    pub fn color_for(&mut self, snapshot: &ModeSnapshot, now: Instant) -> Rgb {
        let base = match snapshot.mode {
            ControlMode::Direct => Rgb::WHITE,
            ControlMode::Select => {
                let due = self
                    .last_toggle
                    .is_none_or(|t| now.saturating_duration_since(t) >= self.blink_interval);
                if due {
                    self.blink_on = !self.blink_on;
                    self.last_toggle = Some(now);
                }
                if self.blink_on {
                    self.joint_color(snapshot.selection)
                } else {
                    Rgb::OFF
                }
            }
            ControlMode::Adjust => self.joint_color(snapshot.selection),
        };
        base.scaled(self.brightness)
    }

    fn joint_color(&self, selection: Option<usize>) -> Rgb {
        selection
            .and_then(|i| self.joint_colors.get(i).copied())
            .unwrap_or(Rgb::WHITE)
    }
}

/// Refresh `indicator` every `interval` until `shutdown` is set.  The LED
/// is only written when the colour actually changes.
pub async fn run_feedback(
    mut indicator: Box<dyn Indicator>,
    mut policy: FeedbackPolicy,
    snapshots: watch::Receiver<ModeSnapshot>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
) {
    debug!(indicator = indicator.id(), "feedback started");
    while !shutdown.load(Ordering::Acquire) {
        let snapshot = *snapshots.borrow();
        let color = policy.color_for(&snapshot, Instant::now());
        if color != indicator.color() {
            if let Err(e) = indicator.set_color(color) {
                warn!(indicator = indicator.id(), error = %e, "indicator write failed");
            }
        }
        sleep(interval).await;
    }
    if let Err(e) = indicator.set_color(Rgb::OFF) {
        warn!(indicator = indicator.id(), error = %e, "indicator write failed");
    }
    debug!("feedback stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use grip_hal::sim::SimIndicator;

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn policy() -> FeedbackPolicy {
        FeedbackPolicy::new(vec![RED, BLUE], 1.0, Duration::from_millis(500))
    }

    fn snap(mode: ControlMode, selection: Option<usize>) -> ModeSnapshot {
        ModeSnapshot { mode, selection }
    }

    #[test]
    fn direct_is_white() {
        let mut p = policy();
        assert_eq!(p.color_for(&ModeSnapshot::default(), Instant::now()), Rgb::WHITE);
    }

    #[test]
    fn adjust_is_solid_joint_colour() {
        let mut p = policy();
        let t0 = Instant::now();
        let s = snap(ControlMode::Adjust, Some(1));
        assert_eq!(p.color_for(&s, t0), BLUE);
        assert_eq!(p.color_for(&s, t0 + Duration::from_millis(600)), BLUE);
    }

    #[test]
    fn select_blinks_selected_colour() {
        let mut p = policy();
        let t0 = Instant::now();
        let s = snap(ControlMode::Select, Some(0));
        assert_eq!(p.color_for(&s, t0), RED);
        assert_eq!(p.color_for(&s, t0 + Duration::from_millis(200)), RED);
        assert_eq!(p.color_for(&s, t0 + Duration::from_millis(500)), Rgb::OFF);
        assert_eq!(p.color_for(&s, t0 + Duration::from_millis(1000)), RED);
    }

    #[test]
    fn brightness_dims_output() {
        let mut p = FeedbackPolicy::new(vec![RED], 0.3, Duration::from_millis(500));
        let s = snap(ControlMode::Adjust, Some(0));
        assert_eq!(p.color_for(&s, Instant::now()), Rgb::new(76, 0, 0));
    }

    #[test]
    fn unknown_selection_falls_back_to_white() {
        let mut p = policy();
        let s = snap(ControlMode::Adjust, Some(9));
        assert_eq!(p.color_for(&s, Instant::now()), Rgb::WHITE);
    }

    #[tokio::test(start_paused = true)]
    async fn task_tracks_mode_and_turns_off_on_shutdown() {
        let led = SimIndicator::new("status_led");
        let monitor = led.monitor();
        let (tx, rx) = watch::channel(ModeSnapshot::default());
        let shutdown = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_feedback(
            Box::new(led),
            policy(),
            rx,
            Duration::from_millis(50),
            Arc::clone(&shutdown),
        ));

        sleep(Duration::from_millis(60)).await;
        assert_eq!(monitor.current(), Rgb::WHITE);

        tx.send_replace(snap(ControlMode::Adjust, Some(0)));
        sleep(Duration::from_millis(60)).await;
        assert_eq!(monitor.current(), RED);

        shutdown.store(true, Ordering::Release);
        task.await.unwrap();
        assert_eq!(monitor.current(), Rgb::OFF);
    }
}
