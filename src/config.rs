//! Driver configuration

use std::time::Duration;

use crate::error::{Mma865xError, Result};
use crate::poll::{clamp_interval_ms, POLL_INTERVAL_DEFAULT_MS, POLL_PARKED_MS};
use crate::registers::Range;

/// Delay after a mode-changing write before output is valid
pub const MODE_CHANGE_DELAY: Duration = Duration::from_millis(100);

/// What the platform does to the sensor supply while suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StandbyMode {
    /// Supply stays up; register contents survive suspend
    #[default]
    Normal,
    /// Supply is cut; the range register is captured at suspend and
    /// rewritten at resume
    Super,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DriverConfig {
    pub range: Range,
    /// Poll period while active, clamped to [1, 500] ms
    pub poll_interval_ms: u32,
    /// Poll period while standby
    pub parked_interval_ms: u32,
    pub settle_delay: Duration,
    pub standby: StandbyMode,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            range: Range::G2,
            poll_interval_ms: POLL_INTERVAL_DEFAULT_MS,
            parked_interval_ms: POLL_PARKED_MS,
            settle_delay: MODE_CHANGE_DELAY,
            standby: StandbyMode::Normal,
        }
    }
}

impl DriverConfig {
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    /// Set the active poll period; out-of-range values are clamped
    pub fn with_poll_interval_ms(mut self, ms: u32) -> Self {
        self.poll_interval_ms = clamp_interval_ms(ms);
        self
    }

    pub fn with_parked_interval_ms(mut self, ms: u32) -> Self {
        self.parked_interval_ms = ms;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_standby(mut self, standby: StandbyMode) -> Self {
        self.standby = standby;
        self
    }

    /// Check the settings that cannot be clamped
    pub fn validate(&self) -> Result<()> {
        if self.parked_interval_ms == 0 {
            return Err(Mma865xError::InvalidConfig(
                "parked poll interval must be at least 1 ms".to_string(),
            ));
        }

        Ok(())
    }
}
