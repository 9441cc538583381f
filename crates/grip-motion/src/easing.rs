//! Easing curves mapping linear progress `r ∈ [0, 1]` to positional
//! progress.

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Shape of a trajectory's velocity profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Easing {
    /// Constant speed: `r`.
    Linear,
    /// Fast start, gentle arrival: `sin(r·π/2)`.
    Sin,
    /// Gentle start and arrival: `(1 − cos(r·π)) / 2`.
    #[default]
    Cos,
}

impl Easing {
    /// Map progress `r` (clamped to `0.0..=1.0`) through the curve.
    pub fn apply(self, r: f32) -> f32 {
        let r = r.clamp(0.0, 1.0);
        match self {
            Easing::Linear => r,
            Easing::Sin => (r * FRAC_PI_2).sin(),
            Easing::Cos => (1.0 - (r * PI).cos()) / 2.0,
        }
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("linear"),
            Easing::Sin => f.write_str("sin"),
            Easing::Cos => f.write_str("cos"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 3] = [Easing::Linear, Easing::Sin, Easing::Cos];

    #[test]
    fn endpoints_are_fixed() {
        for e in ALL {
            assert!(e.apply(0.0).abs() < 1e-6, "{e} at 0");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-6, "{e} at 1");
        }
    }

    #[test]
    fn midpoints_match_curve_definitions() {
        assert!((Easing::Linear.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((Easing::Sin.apply(0.5) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-5);
        assert!((Easing::Cos.apply(0.5) - 0.5).abs() < 1e-6);
        // ease-in-out starts slower than linear
        assert!(Easing::Cos.apply(0.1) < Easing::Linear.apply(0.1));
        // ease-out starts faster than linear
        assert!(Easing::Sin.apply(0.1) > Easing::Linear.apply(0.1));
    }

    #[test]
    fn curves_are_monotonic() {
        for e in ALL {
            let mut prev = e.apply(0.0);
            for i in 1..=100 {
                let v = e.apply(i as f32 / 100.0);
                assert!(v >= prev - 1e-6, "{e} decreased at step {i}");
                prev = v;
            }
        }
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        for e in ALL {
            assert_eq!(e.apply(-0.5), e.apply(0.0));
            assert_eq!(e.apply(3.0), e.apply(1.0));
        }
    }
}
