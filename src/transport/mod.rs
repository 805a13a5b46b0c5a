use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::{debug, info};

use crate::protocol::command::{JOG_CANCEL, STATUS_QUERY};

const BANNER: &[u8] = b"\r\nGrbl 1.1h ['$' for help]\r\n";
const IDLE_REPORT: &[u8] = b"<Idle|MPos:0.000,0.000,0.000|FS:0,0>\r\n";

/// In-memory stand-in for a Grbl controller.
///
/// Every framed line is acknowledged with `ok` and logged, status queries get
/// an idle report and jog cancels are swallowed. Lets the controller run
/// without hardware attached.
pub struct OfflineFirmware {
    line: Vec<u8>,
    replies: VecDeque<u8>,
    reader: Option<Waker>,
}

impl OfflineFirmware {
    pub fn new() -> Self {
        Self {
            line: Vec::new(),
            replies: BANNER.iter().copied().collect(),
            reader: None,
        }
    }

    fn accept(&mut self, byte: u8) {
        match byte {
            STATUS_QUERY => self.reply(IDLE_REPORT),
            JOG_CANCEL => debug!("Offline firmware: jog cancel"),
            b'\r' => {}
            b'\n' => {
                let line = String::from_utf8_lossy(&self.line).into_owned();
                self.line.clear();
                info!("Offline firmware: {}", line);
                self.reply(b"ok\r\n");
            }
            other => self.line.push(other),
        }
    }

    fn reply(&mut self, bytes: &[u8]) {
        self.replies.extend(bytes);
        if let Some(reader) = self.reader.take() {
            reader.wake();
        }
    }
}

impl Default for OfflineFirmware {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncRead for OfflineFirmware {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.replies.is_empty() {
            this.reader = Some(cx.waker().clone());
            return Poll::Pending;
        }
        let n = buf.remaining().min(this.replies.len());
        let chunk: Vec<u8> = this.replies.drain(..n).collect();
        buf.put_slice(&chunk);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for OfflineFirmware {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        for &byte in buf {
            this.accept(byte);
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
