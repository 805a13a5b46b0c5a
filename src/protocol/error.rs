use std::time::Duration;

use tokio_util::codec::LinesCodecError;

#[derive(Debug)]
pub enum LinkError {
    Closed,
    Timeout(Duration),
    Io(std::io::Error),
}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkError::Closed => write!(f, "Serial link closed"),
            LinkError::Timeout(limit) => {
                write!(f, "No complete response within {} ms", limit.as_millis())
            }
            LinkError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for LinkError {}

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Io(err)
    }
}

#[derive(Debug)]
pub enum ProtocolError {
    Firmware {
        code: u32,
        description: String,
        command: String,
    },
    Alarm {
        line: String,
        command: String,
    },
    MalformedFrame {
        line: String,
        command: String,
    },
    Link(LinkError),
}

impl ProtocolError {
    /// Firmware error code, if the firmware reported one.
    pub fn code(&self) -> Option<u32> {
        match self {
            ProtocolError::Firmware { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn from_codec(err: LinesCodecError, command: &str) -> Self {
        match err {
            LinesCodecError::MaxLineLengthExceeded => ProtocolError::MalformedFrame {
                line: "line exceeds maximum length".to_string(),
                command: command.to_string(),
            },
            LinesCodecError::Io(err) => ProtocolError::Link(LinkError::Io(err)),
        }
    }
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Firmware {
                code,
                description,
                command,
            } => write!(f, "error:{} ({}) after '{}'", code, description, command),
            ProtocolError::Alarm { line, command } => {
                write!(f, "Firmware raised {} after '{}'", line, command)
            }
            ProtocolError::MalformedFrame { line, command } => {
                write!(f, "Malformed frame '{}' after '{}'", line, command)
            }
            ProtocolError::Link(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::Link(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LinkError> for ProtocolError {
    fn from(err: LinkError) -> Self {
        ProtocolError::Link(err)
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        ProtocolError::Link(LinkError::Io(err))
    }
}
