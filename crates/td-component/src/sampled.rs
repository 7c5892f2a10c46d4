//! Sampled execution primitives for periodic components.
//!
//! A component runs at a fixed period. [`SampleClock`] tracks when the next
//! sample is due on a monotonic time axis; clocks use it to decide which
//! subscriptions to fire.

use std::time::Duration;

use crate::error::{ComponentError, ComponentResult};

/// Sample configuration for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleConfig {
    /// Sample period.
    pub period: Duration,
}

impl SampleConfig {
    /// Create a new sample configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::InvalidArg`] if `period` is zero.
    pub fn new(period: Duration) -> ComponentResult<Self> {
        if period.is_zero() {
            return Err(ComponentError::InvalidArg {
                what: "sample period must be positive",
            });
        }
        Ok(Self { period })
    }
}

/// Tracks when a periodic subscription should next execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleClock {
    pub config: SampleConfig,
    /// Time of next scheduled sample.
    pub next_sample_time: Duration,
}

impl SampleClock {
    /// Create a sample clock whose first sample is one period after `initial_time`.
    pub fn new(config: SampleConfig, initial_time: Duration) -> Self {
        Self {
            config,
            next_sample_time: initial_time + config.period,
        }
    }

    /// Returns `true` if `current_time >= next_sample_time`.
    pub fn should_sample(&self, current_time: Duration) -> bool {
        current_time >= self.next_sample_time
    }

    /// Advance to the next sample time.
    ///
    /// The schedule keeps its phase; a late sample stays due until advanced past.
    pub fn advance(&mut self) {
        self.next_sample_time += self.config.period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn sample_config_creation() {
        let config = SampleConfig::new(ms(100)).unwrap();
        assert_eq!(config.period, ms(100));
    }

    #[test]
    fn sample_config_rejects_zero_period() {
        assert!(SampleConfig::new(Duration::ZERO).is_err());
    }

    #[test]
    fn sample_clock_basic() {
        let config = SampleConfig::new(ms(100)).unwrap();
        let mut clock = SampleClock::new(config, Duration::ZERO);

        assert!(!clock.should_sample(Duration::ZERO));
        assert!(clock.should_sample(ms(100)));

        clock.advance();
        assert!(!clock.should_sample(ms(100)));
        assert!(clock.should_sample(ms(200)));
    }

    #[test]
    fn late_sample_keeps_phase() {
        let config = SampleConfig::new(ms(100)).unwrap();
        let mut clock = SampleClock::new(config, Duration::ZERO);

        assert!(clock.should_sample(ms(250)));
        clock.advance();
        assert!(clock.should_sample(ms(250)));
        clock.advance();
        assert_eq!(clock.next_sample_time, ms(300));
        assert!(!clock.should_sample(ms(250)));
    }
}
