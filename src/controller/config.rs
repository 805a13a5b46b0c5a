use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::planner::config::PlannerConfig;
use crate::protocol::config::LinkConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Serial device path. Without one the offline firmware stub is used.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub idle_tick_ms: u64,
    pub dead_zone: f64,
    /// Clear the alarm lock with `$X` at startup and skip homing.
    pub unlock_on_connect: bool,
    pub planner: PlannerConfig,
    pub link: LinkConfig,
}

impl ControllerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: ControllerConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn idle_tick(&self) -> Duration {
        Duration::from_millis(self.idle_tick_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.idle_tick_ms == 0 {
            return Err(ConfigurationError::invalid("idle_tick_ms", "must not be zero"));
        }
        if !(0.0..1.0).contains(&self.dead_zone) {
            return Err(ConfigurationError::invalid(
                "dead_zone",
                format!("must be within [0, 1), got {}", self.dead_zone),
            ));
        }
        if self.baud_rate == 0 {
            return Err(ConfigurationError::invalid("baud_rate", "must not be zero"));
        }
        self.planner.validate()?;
        self.link.validate()
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 115_200,
            idle_tick_ms: 100,
            dead_zone: 0.2,
            unlock_on_connect: false,
            planner: PlannerConfig::default(),
            link: LinkConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_partial_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"port": "/dev/ttyUSB0", "planner": {{"max_feedrate": 6000.0}}, "link": {{"read_timeout_ms": 500}}}}"#
        )
        .unwrap();

        let config = ControllerConfig::load(file.path()).unwrap();

        assert_eq!(config.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(config.planner.max_feedrate, 6000.0);
        assert_eq!(config.planner.max_velocity(), 100.0);
        assert_eq!(config.planner.planner_blocks, 15);
        assert_eq!(config.link.read_timeout(), Duration::from_millis(500));
        assert_eq!(config.idle_tick(), Duration::from_millis(100));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dead_zone": 1.5}}"#).unwrap();

        let err = ControllerConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("dead_zone"));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ControllerConfig::load("/nonexistent/grbljog.json").is_err());
    }

    #[test]
    fn test_default_is_valid() {
        assert!(ControllerConfig::default().validate().is_ok());
    }
}
