use crate::protocol::error::{LinkError, ProtocolError};

#[derive(Debug)]
pub enum ConfigurationError {
    InitialStateRejected(&'static str),
    InvalidSetting { name: &'static str, reason: String },
}

impl ConfigurationError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidSetting {
            name,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::InitialStateRejected(state) => {
                write!(f, "Initial state {} refused to be entered", state)
            }
            ConfigurationError::InvalidSetting { name, reason } => {
                write!(f, "Invalid setting '{}': {}", name, reason)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Anything that stops the control loop.
#[derive(Debug)]
pub enum FatalControlError {
    Configuration(ConfigurationError),
    Homing(ProtocolError),
    Protocol(ProtocolError),
    Link(LinkError),
}

impl std::fmt::Display for FatalControlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatalControlError::Configuration(err) => write!(f, "Configuration error: {}", err),
            FatalControlError::Homing(err) => write!(f, "Homing failed: {}", err),
            FatalControlError::Protocol(err) => write!(f, "Protocol error: {}", err),
            FatalControlError::Link(err) => write!(f, "Link error: {}", err),
        }
    }
}

impl std::error::Error for FatalControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FatalControlError::Configuration(err) => Some(err),
            FatalControlError::Homing(err) | FatalControlError::Protocol(err) => Some(err),
            FatalControlError::Link(err) => Some(err),
        }
    }
}

impl From<ConfigurationError> for FatalControlError {
    fn from(err: ConfigurationError) -> Self {
        FatalControlError::Configuration(err)
    }
}

impl From<ProtocolError> for FatalControlError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Link(link) => FatalControlError::Link(link),
            other => FatalControlError::Protocol(other),
        }
    }
}

impl From<LinkError> for FatalControlError {
    fn from(err: LinkError) -> Self {
        FatalControlError::Link(err)
    }
}
