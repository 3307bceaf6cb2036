use spacetimedb::SpacetimeType;

/// Default spin duration bounds (milliseconds)
pub const DEFAULT_MIN_DURATION_MS: u32 = 3000;
pub const DEFAULT_MAX_DURATION_MS: u32 = 5000;

/// Default number of full turns added to the resting angle, [min, max)
pub const DEFAULT_MIN_TURNS: f64 = 5.0;
pub const DEFAULT_MAX_TURNS: f64 = 10.0;

/// Pause between the wheel landing and the winners being drawn
pub const DEFAULT_SETTLE_DELAY_MS: u32 = 500;

/// Animation tick for the scheduled spin loop (~20 frames/s for subscribers)
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 50;

/// Tunables for one wheel. Stored in the `picker_config` singleton.
#[derive(SpacetimeType, Debug, Clone, PartialEq)]
pub struct WheelConfig {
    pub min_duration_ms: u32,
    pub max_duration_ms: u32,
    pub min_turns: f64,
    pub max_turns: f64,
    pub settle_delay_ms: u32,
    pub tick_interval_ms: u32,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: DEFAULT_MIN_DURATION_MS,
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
            min_turns: DEFAULT_MIN_TURNS,
            max_turns: DEFAULT_MAX_TURNS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl WheelConfig {
    /// Reject configs the timing model cannot sample from
    pub fn validate(&self) -> Result<(), String> {
        if self.min_duration_ms == 0 {
            return Err("Spin duration must be positive".to_string());
        }
        if self.min_duration_ms > self.max_duration_ms {
            return Err(format!(
                "min_duration_ms ({}) exceeds max_duration_ms ({})",
                self.min_duration_ms, self.max_duration_ms
            ));
        }
        // gen_range panics on an empty half-open range
        if !(self.min_turns.is_finite() && self.max_turns.is_finite()) {
            return Err("Turn bounds must be finite".to_string());
        }
        if self.min_turns < 0.0 {
            return Err("min_turns must not be negative (wheel only rotates forward)".to_string());
        }
        if self.min_turns >= self.max_turns {
            return Err(format!(
                "min_turns ({}) must be below max_turns ({})",
                self.min_turns, self.max_turns
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = WheelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_duration_ms, 3000);
        assert_eq!(config.max_duration_ms, 5000);
        assert_eq!(config.settle_delay_ms, 500);
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let swapped = WheelConfig { min_duration_ms: 6000, ..WheelConfig::default() };
        assert!(swapped.validate().is_err());

        let empty_turns = WheelConfig { min_turns: 7.0, max_turns: 7.0, ..WheelConfig::default() };
        assert!(empty_turns.validate().is_err());

        let backwards = WheelConfig { min_turns: -1.0, ..WheelConfig::default() };
        assert!(backwards.validate().is_err());

        let no_tick = WheelConfig { tick_interval_ms: 0, ..WheelConfig::default() };
        assert!(no_tick.validate().is_err());

        let nan = WheelConfig { max_turns: f64::NAN, ..WheelConfig::default() };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_fixed_duration_is_allowed() {
        let fixed = WheelConfig { min_duration_ms: 4000, max_duration_ms: 4000, ..WheelConfig::default() };
        assert!(fixed.validate().is_ok());
    }
}
