use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub read_timeout_ms: u64,
    /// Homing can take a long time, so `$H` has its own limit.
    pub homing_timeout_ms: u64,
    pub boot_delay_ms: u64,
    /// Quiet period that ends a drain of unsolicited lines.
    pub drain_window_ms: u64,
    pub max_line_length: usize,
}

impl LinkConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn homing_timeout(&self) -> Duration {
        Duration::from_millis(self.homing_timeout_ms)
    }

    pub fn boot_delay(&self) -> Duration {
        Duration::from_millis(self.boot_delay_ms)
    }

    pub fn drain_window(&self) -> Duration {
        Duration::from_millis(self.drain_window_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.read_timeout_ms == 0 {
            return Err(ConfigurationError::invalid("read_timeout_ms", "must not be zero"));
        }
        if self.homing_timeout_ms == 0 {
            return Err(ConfigurationError::invalid("homing_timeout_ms", "must not be zero"));
        }
        if self.drain_window_ms == 0 {
            return Err(ConfigurationError::invalid("drain_window_ms", "must not be zero"));
        }
        if self.max_line_length == 0 {
            return Err(ConfigurationError::invalid("max_line_length", "must not be zero"));
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 2_000,
            homing_timeout_ms: 60_000,
            boot_delay_ms: 1_000,
            drain_window_ms: 100,
            max_line_length: 256,
        }
    }
}
