pub mod command;
pub mod config;
pub mod error;
pub mod error_codes;
pub mod response;

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

use crate::planner::JogCommand;
use command::{Command, JOG_ALLOWED_ERRORS};
use config::LinkConfig;
use error::{LinkError, ProtocolError};
use response::{FirmwareResponse, Terminal};

/// Client for the Grbl request/response dialect.
///
/// Owns the transport for its whole lifetime. Every call that expects an
/// answer blocks until the terminal line arrives or the read timeout expires.
pub struct GrblClient<T> {
    framed: Framed<T, LinesCodec>,
    config: LinkConfig,
}

impl<T> GrblClient<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps `transport` without talking to the firmware.
    pub fn new(transport: T, config: LinkConfig) -> Self {
        let codec = LinesCodec::new_with_max_length(config.max_line_length);
        Self {
            framed: Framed::new(transport, codec),
            config,
        }
    }

    /// Wraps `transport` and runs the startup handshake.
    pub async fn connect(transport: T, config: LinkConfig) -> Result<Self, ProtocolError> {
        let mut client = Self::new(transport, config);

        for line in client.drain().await? {
            info!("Firmware: {}", line);
        }
        tokio::time::sleep(client.config.boot_delay()).await;
        client.drain().await?;

        let status = client.status().await?;
        info!("Firmware status: {}", status.last_line());
        Ok(client)
    }

    pub async fn send(&mut self, line: &str) -> Result<(), ProtocolError> {
        debug!(">> {}", line);
        self.framed
            .send(line)
            .await
            .map_err(|e| ProtocolError::from_codec(e, line))
    }

    /// Writes a single real-time byte outside the line framing.
    pub async fn send_realtime(&mut self, byte: u8) -> Result<(), ProtocolError> {
        debug!(">> 0x{:02X}", byte);
        let transport = self.framed.get_mut();
        transport.write_all(&[byte]).await?;
        transport.flush().await?;
        Ok(())
    }

    /// Reads lines until one starts with a marker from `terminals`.
    pub async fn read(
        &mut self,
        terminals: &[&str],
        limit: Duration,
        command: &str,
    ) -> Result<FirmwareResponse, ProtocolError> {
        let deadline = Instant::now() + limit;
        let mut lines = Vec::new();

        loop {
            let line = match timeout_at(deadline, self.framed.next()).await {
                Err(_) => return Err(LinkError::Timeout(limit).into()),
                Ok(None) => return Err(LinkError::Closed.into()),
                Ok(Some(line)) => line.map_err(|e| ProtocolError::from_codec(e, command))?,
            };
            if line.is_empty() {
                continue;
            }
            debug!("<< {}", line);

            let terminal = Terminal::classify(&line, terminals, command)?;
            lines.push(line);
            if let Some(terminal) = terminal {
                return Ok(FirmwareResponse { lines, terminal });
            }
        }
    }

    /// Writes `command` framed or as its real-time byte and returns the wire text.
    async fn dispatch(&mut self, command: &Command) -> Result<String, ProtocolError> {
        let wire = command.to_string();
        match command.realtime_byte() {
            Some(byte) => self.send_realtime(byte).await?,
            None => self.send(&wire).await?,
        }
        Ok(wire)
    }

    /// Sends `command` and reads its response.
    ///
    /// Error codes listed in `allowed_errors` are returned as a normal
    /// response. Any other error code, or an alarm, fails.
    pub async fn response(
        &mut self,
        command: &Command,
        allowed_errors: &[u32],
    ) -> Result<FirmwareResponse, ProtocolError> {
        let wire = self.dispatch(command).await?;

        let limit = match command {
            Command::Home => self.config.homing_timeout(),
            _ => self.config.read_timeout(),
        };
        let response = self.read(command.terminals(), limit, &wire).await?;

        match &response.terminal {
            Terminal::Error(code) => {
                let description = error_codes::describe_or_unknown(*code);
                if allowed_errors.contains(code) {
                    debug!("Tolerated error:{} ({}) after '{}'", code, description, wire);
                    Ok(response)
                } else {
                    Err(ProtocolError::Firmware {
                        code: *code,
                        description,
                        command: wire,
                    })
                }
            }
            Terminal::Alarm(line) => Err(ProtocolError::Alarm {
                line: line.clone(),
                command: wire,
            }),
            Terminal::Ok | Terminal::Status(_) => Ok(response),
        }
    }

    /// Issues one relative jog. `false` means the firmware refused it with a
    /// tolerated error (busy, or target beyond travel).
    pub async fn jog(&mut self, jog: &JogCommand) -> Result<bool, ProtocolError> {
        let response = self.response(&Command::Jog(*jog), JOG_ALLOWED_ERRORS).await?;
        Ok(response.is_ok())
    }

    /// Flushes all queued jog motion. The firmware does not answer.
    pub async fn jog_cancel(&mut self) -> Result<(), ProtocolError> {
        self.dispatch(&Command::JogCancel).await?;
        Ok(())
    }

    pub async fn home(&mut self) -> Result<(), ProtocolError> {
        info!("Homing");
        self.response(&Command::Home, &[]).await?;
        info!("Homing complete");
        Ok(())
    }

    /// Clears the alarm lock without homing.
    pub async fn unlock(&mut self) -> Result<(), ProtocolError> {
        self.response(&Command::Unlock, &[]).await?;
        warn!("Alarm lock cleared without homing, machine position is not referenced");
        Ok(())
    }

    pub async fn status(&mut self) -> Result<FirmwareResponse, ProtocolError> {
        self.response(&Command::Status, &[]).await
    }

    /// Consumes unsolicited lines until the link stays quiet for one drain window.
    pub async fn drain(&mut self) -> Result<Vec<String>, ProtocolError> {
        let mut lines = Vec::new();
        loop {
            match timeout(self.config.drain_window(), self.framed.next()).await {
                Err(_) => return Ok(lines),
                Ok(None) => return Err(LinkError::Closed.into()),
                Ok(Some(line)) => {
                    let line = line.map_err(|e| ProtocolError::from_codec(e, "drain"))?;
                    if !line.is_empty() {
                        debug!("<< {}", line);
                        lines.push(line);
                    }
                }
            }
        }
    }

    /// Releases the transport.
    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }
}
