//! Volume ramp math
//!
//! A ramp moves one channel's gain from a start value to an end value in a
//! fixed number of equal time slices. This module holds the pure part of
//! that: how far along the ramp a given step is, and which volume that
//! step writes. Scheduling lives in the engine crate.
//!
//! Two interpolation policies exist:
//! - **Normalized**: `t = step / steps`
//! - **Accumulated**: `t = step * step_seconds`, i.e. the accumulated elapsed
//!   time in seconds fed directly into the lerp. This only matches
//!   `Normalized` when the whole ramp lasts exactly one second.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default ramp length
pub const DEFAULT_RAMP_DURATION: Duration = Duration::from_secs(1);

/// Default number of discrete steps per ramp
pub const DEFAULT_RAMP_STEPS: u32 = 60;

/// How the lerp parameter is derived from the step counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RampInterpolation {
    /// `t = step / steps`
    #[default]
    Normalized,

    /// `t = step * step_duration` in seconds, clamped to 1.0
    Accumulated,
}

impl RampInterpolation {
    /// Lerp parameter (0.0 to 1.0) for the given step
    pub fn progress(&self, step: u32, steps: u32, step_duration: Duration) -> f32 {
        if steps == 0 {
            return 1.0;
        }

        let t = match self {
            RampInterpolation::Normalized => step as f32 / steps as f32,
            RampInterpolation::Accumulated => step as f32 * step_duration.as_secs_f32(),
        };

        t.clamp(0.0, 1.0)
    }
}

/// What happens when a ramp is requested on a channel that is already ramping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RampOverlap {
    /// All ramps keep running; the latest write wins
    #[default]
    Concurrent,

    /// The new ramp aborts any in-flight ramp on the same channel
    Supersede,
}

/// Where add/sub ramps begin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RampStart {
    /// Fade-ins start at 0, fade-outs at the full layer level
    #[default]
    Nominal,

    /// Start from the channel's volume at call time
    Current,
}

/// Linear interpolation with the parameter clamped to [0, 1]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    from + (to - from) * t
}

/// Timing and interpolation shared by every ramp of a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampProfile {
    pub duration: Duration,
    pub steps: u32,
    pub interpolation: RampInterpolation,
    /// Write the exact end volume after the last step
    pub settle_on_target: bool,
}

impl RampProfile {
    /// Length of one time slice
    pub fn step_duration(&self) -> Duration {
        if self.steps == 0 {
            return Duration::ZERO;
        }
        self.duration / self.steps
    }

    /// Volume written at `step` (0-based) of a ramp from `from` to `to`
    pub fn volume_at(&self, from: f32, to: f32, step: u32) -> f32 {
        let t = self
            .interpolation
            .progress(step, self.steps, self.step_duration());
        lerp(from, to, t)
    }

    /// Volume the ramp leaves behind once every step has run
    pub fn final_volume(&self, from: f32, to: f32) -> f32 {
        if self.settle_on_target || self.steps == 0 {
            to
        } else {
            self.volume_at(from, to, self.steps - 1)
        }
    }
}

impl Default for RampProfile {
    fn default() -> Self {
        Self {
            duration: DEFAULT_RAMP_DURATION,
            steps: DEFAULT_RAMP_STEPS,
            interpolation: RampInterpolation::Normalized,
            settle_on_target: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Largest change a single step makes
    fn step_increment(profile: &RampProfile, from: f32, to: f32) -> f32 {
        (to - from).abs() / profile.steps as f32
    }

    #[test]
    fn test_lerp_clamps_parameter() {
        assert_eq!(lerp(0.0, 0.5, -1.0), 0.0);
        assert_eq!(lerp(0.0, 0.5, 2.0), 0.5);
        assert!((lerp(0.0, 0.5, 0.5) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_default_step_duration_is_one_sixtieth() {
        let profile = RampProfile::default();
        assert_eq!(profile.step_duration(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn test_policies_agree_for_one_second_ramp() {
        let profile = RampProfile::default();
        let step = profile.step_duration();

        for k in 0..profile.steps {
            let normalized = RampInterpolation::Normalized.progress(k, profile.steps, step);
            let accumulated = RampInterpolation::Accumulated.progress(k, profile.steps, step);
            assert!(
                (normalized - accumulated).abs() < 1e-4,
                "step {}: normalized={} accumulated={}",
                k,
                normalized,
                accumulated
            );
        }
    }

    #[test]
    fn test_accumulated_saturates_early_for_long_ramp() {
        // Two-second ramp: accumulated time reaches 1.0 halfway through
        let step = Duration::from_secs(2) / 60;
        let t = RampInterpolation::Accumulated.progress(30, 60, step);
        assert!((t - 1.0).abs() < 1e-4);

        let t = RampInterpolation::Normalized.progress(30, 60, step);
        assert!((t - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_final_volume_without_settle_is_one_step_short() {
        let profile = RampProfile {
            settle_on_target: false,
            ..RampProfile::default()
        };
        let target = 1.0 / 3.0;

        let last = profile.final_volume(0.0, target);
        assert!(last < target);
        assert!(target - last <= step_increment(&profile, 0.0, target) + 1e-6);
    }

    #[test]
    fn test_final_volume_with_settle_is_exact() {
        let profile = RampProfile::default();
        assert_eq!(profile.final_volume(0.25, 0.0), 0.0);
    }

    #[test]
    fn test_zero_steps_jumps_to_target() {
        let profile = RampProfile {
            steps: 0,
            ..RampProfile::default()
        };
        assert_eq!(profile.step_duration(), Duration::ZERO);
        assert_eq!(profile.final_volume(0.0, 0.5), 0.5);
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&RampInterpolation::Accumulated).unwrap();
        assert_eq!(json, "\"accumulated\"");
        let overlap: RampOverlap = serde_json::from_str("\"supersede\"").unwrap();
        assert_eq!(overlap, RampOverlap::Supersede);
    }
}
