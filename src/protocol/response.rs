use super::error::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Ok,
    Error(u32),
    Alarm(String),
    Status(String),
}

impl Terminal {
    /// Classifies `line` if it starts with one of `terminals`.
    ///
    /// Returns `Ok(None)` for informational lines. An `error:` line without a
    /// numeric code is a malformed frame.
    pub fn classify(
        line: &str,
        terminals: &[&str],
        command: &str,
    ) -> Result<Option<Terminal>, ProtocolError> {
        if !terminals.iter().any(|marker| line.starts_with(marker)) {
            return Ok(None);
        }

        if line.starts_with("ok") {
            Ok(Some(Terminal::Ok))
        } else if let Some(rest) = line.strip_prefix("error") {
            rest.strip_prefix(':')
                .and_then(|code| code.trim().parse::<u32>().ok())
                .map(|code| Some(Terminal::Error(code)))
                .ok_or_else(|| ProtocolError::MalformedFrame {
                    line: line.to_string(),
                    command: command.to_string(),
                })
        } else if line.starts_with("ALARM") {
            Ok(Some(Terminal::Alarm(line.to_string())))
        } else {
            Ok(Some(Terminal::Status(line.to_string())))
        }
    }
}

/// Lines received for one command, the last of which is the terminal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareResponse {
    pub lines: Vec<String>,
    pub terminal: Terminal,
}

impl FirmwareResponse {
    pub fn is_ok(&self) -> bool {
        self.terminal == Terminal::Ok
    }

    pub fn last_line(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::command::{DEFAULT_TERMINALS, STATUS_TERMINALS};

    #[test]
    fn test_classify_terminals() {
        assert_eq!(
            Terminal::classify("ok", DEFAULT_TERMINALS, "$H").unwrap(),
            Some(Terminal::Ok)
        );
        assert_eq!(
            Terminal::classify("error:15", DEFAULT_TERMINALS, "$J").unwrap(),
            Some(Terminal::Error(15))
        );
        assert_eq!(
            Terminal::classify("ALARM:1", DEFAULT_TERMINALS, "$H").unwrap(),
            Some(Terminal::Alarm("ALARM:1".to_string()))
        );
    }

    #[test]
    fn test_informational_lines_are_not_terminal() {
        assert_eq!(
            Terminal::classify("[MSG:Caution: Unlocked]", DEFAULT_TERMINALS, "$X").unwrap(),
            None
        );
        assert_eq!(
            Terminal::classify("<Idle|MPos:0.000,0.000,0.000|FS:0,0>", DEFAULT_TERMINALS, "$H")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_status_terminals() {
        assert_eq!(
            Terminal::classify("<Idle|MPos:0.000,0.000,0.000|FS:0,0>", STATUS_TERMINALS, "?")
                .unwrap(),
            Some(Terminal::Status(
                "<Idle|MPos:0.000,0.000,0.000|FS:0,0>".to_string()
            ))
        );
        assert_eq!(
            Terminal::classify("Grbl 1.1h ['$' for help]", STATUS_TERMINALS, "?").unwrap(),
            Some(Terminal::Status("Grbl 1.1h ['$' for help]".to_string()))
        );
    }

    #[test]
    fn test_error_code_beyond_table_is_kept() {
        assert_eq!(
            Terminal::classify("error:70000", DEFAULT_TERMINALS, "$H").unwrap(),
            Some(Terminal::Error(70000))
        );
    }

    #[test]
    fn test_malformed_error_frame() {
        let err = Terminal::classify("error:abc", DEFAULT_TERMINALS, "$H").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedFrame { ref line, .. } if line == "error:abc"));
    }
}
