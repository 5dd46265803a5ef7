//! Timing policy for the scheduler

use rand::Rng;
use std::time::Duration;

use crate::config::{MAX_CHECK_INTERVAL_SECS, MAX_REFRESH_WINDOW_SECS, ScheduleConfig};
use crate::error::{Error, Result};

/// How often to check the address and how often to refresh unconditionally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulePolicy {
    /// Interval between address checks
    pub check_interval: Duration,

    /// Base interval between unconditional refreshes
    pub refresh_interval: Duration,

    /// Upper bound (exclusive) of the random delay added to each refresh
    pub refresh_jitter: Duration,
}

impl SchedulePolicy {
    /// Create a new policy
    pub fn new(check_interval: Duration, refresh_interval: Duration, refresh_jitter: Duration) -> Self {
        Self {
            check_interval,
            refresh_interval,
            refresh_jitter,
        }
    }

    /// Delay until the next refresh, drawn fresh on every call
    ///
    /// Base interval plus a uniform random number of whole seconds in
    /// `[0, refresh_jitter)`.
    pub fn next_refresh_delay(&self) -> Duration {
        let jitter_secs = self.refresh_jitter.as_secs();
        if jitter_secs == 0 {
            return self.refresh_interval;
        }

        let extra = rand::rng().random_range(0..jitter_secs);
        self.refresh_interval.saturating_add(Duration::from_secs(extra))
    }

    /// Check the bounds the timers rely on
    ///
    /// The check interval must be non-zero and at most
    /// [`MAX_CHECK_INTERVAL_SECS`]. The refresh interval must exceed it, and
    /// refresh plus jitter must stay within [`MAX_REFRESH_WINDOW_SECS`].
    pub fn validate(&self) -> Result<()> {
        let check_secs = self.check_interval.as_secs();
        if self.check_interval.is_zero() {
            return Err(Error::config("check_interval_secs must be > 0"));
        }
        if check_secs > MAX_CHECK_INTERVAL_SECS {
            return Err(Error::config(format!(
                "check_interval_secs ({}) must be at most {}",
                check_secs, MAX_CHECK_INTERVAL_SECS
            )));
        }
        if self.refresh_interval <= self.check_interval {
            return Err(Error::config(format!(
                "refresh_interval_secs ({}) must be greater than check_interval_secs ({})",
                self.refresh_interval.as_secs(),
                check_secs
            )));
        }

        let window = self.refresh_interval.saturating_add(self.refresh_jitter);
        if window > Duration::from_secs(MAX_REFRESH_WINDOW_SECS) {
            return Err(Error::config(format!(
                "refresh_interval_secs plus refresh_jitter_secs ({}) must be at most {}",
                window.as_secs(),
                MAX_REFRESH_WINDOW_SECS
            )));
        }
        Ok(())
    }
}

impl From<&ScheduleConfig> for SchedulePolicy {
    fn from(config: &ScheduleConfig) -> Self {
        Self::new(
            config.check_interval(),
            config.refresh_interval(),
            config.refresh_jitter(),
        )
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self::from(&ScheduleConfig::default())
    }
}
