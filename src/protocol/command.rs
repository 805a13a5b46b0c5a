use std::fmt;

use crate::planner::JogCommand;

/// Terminal markers for line-oriented commands.
pub const DEFAULT_TERMINALS: &[&str] = &["ok", "error", "ALARM"];
/// Status queries additionally end on a report, a message or a reset banner.
pub const STATUS_TERMINALS: &[&str] = &["ok", "error", "ALARM", "<", "[", "Grbl"];

/// Error codes a jog may be answered with without stopping the loop:
/// 8 (firmware busy) and 15 (target exceeds travel).
pub const JOG_ALLOWED_ERRORS: &[u32] = &[8, 15];

pub const STATUS_QUERY: u8 = b'?';
pub const JOG_CANCEL: u8 = 0x85;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Home,
    Unlock,
    Jog(JogCommand),
    JogCancel,
}

impl Command {
    /// Real-time commands are single unframed bytes.
    pub fn realtime_byte(&self) -> Option<u8> {
        match self {
            Command::Status => Some(STATUS_QUERY),
            Command::JogCancel => Some(JOG_CANCEL),
            _ => None,
        }
    }

    pub fn terminals(&self) -> &'static [&'static str] {
        match self {
            Command::Status => STATUS_TERMINALS,
            _ => DEFAULT_TERMINALS,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Status => write!(f, "?"),
            Command::Home => write!(f, "$H"),
            Command::Unlock => write!(f, "$X"),
            Command::Jog(jog) => write!(
                f,
                "$J=G91X{:.3}Y{:.3}Z{:.3}F{:.3}",
                jog.dx,
                jog.dy,
                jog.dz,
                jog.feedrate()
            ),
            Command::JogCancel => write!(f, "0x{:02X}", JOG_CANCEL),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jog_wire_format() {
        let jog = JogCommand {
            dx: 1.23456,
            dy: -0.5,
            dz: 0.0,
            velocity: 25.0,
        };
        assert_eq!(
            Command::Jog(jog).to_string(),
            "$J=G91X1.235Y-0.500Z0.000F1500.000"
        );
    }

    #[test]
    fn test_realtime_commands() {
        assert_eq!(Command::Status.realtime_byte(), Some(b'?'));
        assert_eq!(Command::JogCancel.realtime_byte(), Some(0x85));
        assert_eq!(Command::Home.realtime_byte(), None);
    }

    #[test]
    fn test_status_has_its_own_terminals() {
        assert!(Command::Status.terminals().contains(&"<"));
        assert!(!Command::Unlock.terminals().contains(&"["));
    }
}
