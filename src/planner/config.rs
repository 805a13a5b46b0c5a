use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Maximum jog feedrate in mm/min.
    pub max_feedrate: f64,
    /// Maximum acceleration in mm/s².
    pub max_acceleration: f64,
    /// Number of planner blocks the firmware can queue.
    pub planner_blocks: usize,
    /// Time the firmware needs to parse and plan a single jog command.
    pub min_tick_ms: u64,
}

impl PlannerConfig {
    /// Maximum velocity in mm/s.
    pub fn max_velocity(&self) -> f64 {
        self.max_feedrate / 60.0
    }

    pub fn min_tick(&self) -> Duration {
        Duration::from_millis(self.min_tick_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.max_feedrate.is_finite() && self.max_feedrate > 0.0) {
            return Err(ConfigurationError::invalid(
                "max_feedrate",
                format!("must be a positive number, got {}", self.max_feedrate),
            ));
        }
        if !(self.max_acceleration.is_finite() && self.max_acceleration > 0.0) {
            return Err(ConfigurationError::invalid(
                "max_acceleration",
                format!("must be a positive number, got {}", self.max_acceleration),
            ));
        }
        if self.planner_blocks < 2 {
            return Err(ConfigurationError::invalid(
                "planner_blocks",
                format!("at least 2 blocks are required, got {}", self.planner_blocks),
            ));
        }
        if self.min_tick_ms == 0 {
            return Err(ConfigurationError::invalid("min_tick_ms", "must not be zero"));
        }
        Ok(())
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_feedrate: 3000.0,
            max_acceleration: 1000.0,
            planner_blocks: 15,
            min_tick_ms: 10,
        }
    }
}
