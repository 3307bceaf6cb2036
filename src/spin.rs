// Spin timing model
//
// A spin picks its duration and final angle up front, then every tick maps
// wall-clock progress through a cubic ease-out onto [start_angle, target_angle].
// Because the end angle is fixed at start, the animation can never overshoot
// or jitter, and forcing t = 1 lands on exactly the same spot.

use std::f64::consts::TAU;

use spacetimedb::rand::Rng;
use spacetimedb::SpacetimeType;

use crate::config::WheelConfig;

/// In-flight animation state. Angles are radians, times are milliseconds.
#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct SpinState {
    pub current_angle: f64,
    pub start_angle: f64,
    pub target_angle: f64,
    pub start_time_ms: u64,
    pub duration_ms: f64,
    pub is_spinning: bool,
}

/// Cubic ease-out: fast start, velocity -> 0 as t -> 1
pub fn ease_out_cubic(t: f64) -> f64 {
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}

/// Linear progress through the spin, clamped to [0, 1]
pub fn progress(elapsed_ms: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    (elapsed_ms / duration_ms).clamp(0.0, 1.0)
}

impl SpinState {
    /// Begin a spin from `resting_angle`: random duration in [min, max] ms and
    /// [min_turns, max_turns) full rotations forward.
    pub fn begin<R: Rng + ?Sized>(
        resting_angle: f64,
        now_ms: u64,
        config: &WheelConfig,
        rng: &mut R,
    ) -> Self {
        let duration_ms = rng.gen_range(config.min_duration_ms as f64..=config.max_duration_ms as f64);
        let turns = rng.gen_range(config.min_turns..config.max_turns);

        Self {
            current_angle: resting_angle,
            start_angle: resting_angle,
            target_angle: resting_angle + TAU * turns,
            start_time_ms: now_ms,
            duration_ms,
            is_spinning: true,
        }
    }

    /// Angle at linear progress `t` (clamped). angle_at(0) == start, angle_at(1) == target.
    pub fn angle_at(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t >= 1.0 {
            // start + (target - start) * 1.0 can be off by an ulp
            return self.target_angle;
        }
        self.start_angle + (self.target_angle - self.start_angle) * ease_out_cubic(t)
    }

    pub fn progress_at(&self, now_ms: u64) -> f64 {
        let elapsed = now_ms.saturating_sub(self.start_time_ms) as f64;
        progress(elapsed, self.duration_ms)
    }

    /// Move the animation to `now_ms`. Returns true once the spin has landed.
    pub fn advance(&mut self, now_ms: u64) -> bool {
        if !self.is_spinning {
            return true;
        }
        let t = self.progress_at(now_ms);
        self.current_angle = self.angle_at(t);
        if t >= 1.0 {
            self.is_spinning = false;
        }
        !self.is_spinning
    }

    /// Force t = 1: snap to the target angle and stop
    pub fn finish(&mut self) {
        self.current_angle = self.target_angle;
        self.is_spinning = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacetimedb::rand::rngs::mock::StepRng;

    fn fixed_spin() -> SpinState {
        SpinState {
            current_angle: 1.25,
            start_angle: 1.25,
            target_angle: 1.25 + TAU * 7.5,
            start_time_ms: 10_000,
            duration_ms: 4000.0,
            is_spinning: true,
        }
    }

    #[test]
    fn test_ease_out_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_progress_clamps() {
        assert_eq!(progress(-50.0, 1000.0), 0.0);
        assert_eq!(progress(500.0, 1000.0), 0.5);
        assert_eq!(progress(2500.0, 1000.0), 1.0);
        assert_eq!(progress(10.0, 0.0), 1.0);
    }

    #[test]
    fn test_angle_endpoints_exact() {
        let spin = fixed_spin();
        assert_eq!(spin.angle_at(0.0), spin.start_angle);
        assert_eq!(spin.angle_at(1.0), spin.target_angle);
        assert_eq!(spin.angle_at(3.0), spin.target_angle);
        assert_eq!(spin.angle_at(-1.0), spin.start_angle);
    }

    #[test]
    fn test_angle_monotonic_non_decreasing() {
        let spin = fixed_spin();
        let mut last = spin.angle_at(0.0);
        for step in 1..=1000 {
            let angle = spin.angle_at(step as f64 / 1000.0);
            assert!(angle >= last, "angle went backwards at step {}", step);
            last = angle;
        }
    }

    #[test]
    fn test_velocity_vanishes_near_end() {
        let spin = fixed_spin();
        let early = spin.angle_at(0.01) - spin.angle_at(0.0);
        let late = spin.angle_at(1.0) - spin.angle_at(0.99);
        assert!(late < early / 1000.0);
    }

    #[test]
    fn test_begin_uses_lower_bounds_with_zero_rng() {
        let mut rng = StepRng::new(0, 0);
        let spin = SpinState::begin(0.5, 1_000, &WheelConfig::default(), &mut rng);
        assert_eq!(spin.duration_ms, 3000.0);
        assert!((spin.target_angle - (0.5 + TAU * 5.0)).abs() < 1e-9);
        assert_eq!(spin.start_angle, 0.5);
        assert_eq!(spin.start_time_ms, 1_000);
        assert!(spin.is_spinning);
    }

    #[test]
    fn test_begin_stays_in_bounds() {
        let config = WheelConfig::default();
        for seed in 0..200u64 {
            let mut rng = StepRng::new(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15), 0xA076_1D64_78BD_642F);
            let spin = SpinState::begin(2.0, 0, &config, &mut rng);
            assert!(spin.duration_ms >= 3000.0 && spin.duration_ms <= 5000.0);
            let turns = (spin.target_angle - spin.start_angle) / TAU;
            assert!(turns >= 5.0 - 1e-9 && turns < 10.0 + 1e-9, "turns {}", turns);
        }
    }

    #[test]
    fn test_advance_lands_after_duration() {
        let mut spin = fixed_spin();
        assert!(!spin.advance(12_000));
        assert!(spin.is_spinning);
        assert!(spin.current_angle > spin.start_angle && spin.current_angle < spin.target_angle);

        assert!(spin.advance(14_000));
        assert!(!spin.is_spinning);
        assert_eq!(spin.current_angle, spin.target_angle);
    }

    #[test]
    fn test_advance_before_start_holds_start_angle() {
        let mut spin = fixed_spin();
        assert!(!spin.advance(9_000));
        assert_eq!(spin.current_angle, spin.start_angle);
    }

    #[test]
    fn test_finish_snaps_to_target() {
        let mut spin = fixed_spin();
        spin.advance(11_000);
        spin.finish();
        assert_eq!(spin.current_angle, spin.target_angle);
        assert!(!spin.is_spinning);
    }
}
