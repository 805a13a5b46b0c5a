//! JSON-lines input bridge.
//!
//! An external process (gamepad or keyboard reader) writes one `InputFrame`
//! object per line. Frames are published through a watch channel, so the
//! control loop always samples the most recent one. Haptic requests go back
//! out as `{"rumble":true}` lines.
//!
//! Both directions run on their own OS threads. A blocking read on an
//! interactive stdin cannot be cancelled, and it must not keep the runtime
//! alive once the control loop has finished.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::thread;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use super::{dead_zone, InputSource};
use crate::planner::vector::Vector3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputFrame {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub speed: f64,
    pub home: bool,
    pub speed_lock: bool,
}

impl Default for InputFrame {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            speed: 1.0,
            home: false,
            speed_lock: false,
        }
    }
}

/// Request sent back to the input process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Feedback {
    pub rumble: bool,
}

impl Feedback {
    pub const RUMBLE: Feedback = Feedback { rumble: true };
}

pub struct BridgeInput {
    frames: watch::Receiver<InputFrame>,
    dead_zone: f64,
    feedback: mpsc::UnboundedSender<Feedback>,
}

impl BridgeInput {
    pub fn new(
        frames: watch::Receiver<InputFrame>,
        dead_zone: f64,
        feedback: mpsc::UnboundedSender<Feedback>,
    ) -> Self {
        Self {
            frames,
            dead_zone,
            feedback,
        }
    }

    /// Starts the reader and feedback threads and returns the bridge they feed.
    ///
    /// The threads are detached. The reader stops at end of stream, the writer
    /// once the bridge is dropped.
    pub fn spawn<R, W>(reader: R, feedback: W, dead_zone: f64) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (frame_tx, frame_rx) = watch::channel(InputFrame::default());
        thread::Builder::new()
            .name("input-bridge".to_string())
            .spawn(move || {
                let accepted = pump(BufReader::new(reader), &frame_tx);
                info!("Input bridge closed after {} frames", accepted);
            })?;

        let (feedback_tx, feedback_rx) = mpsc::unbounded_channel();
        thread::Builder::new()
            .name("input-feedback".to_string())
            .spawn(move || {
                let mut feedback = feedback;
                write_feedback(&mut feedback, feedback_rx);
            })?;

        Ok(Self::new(frame_rx, dead_zone, feedback_tx))
    }

    fn frame(&self) -> InputFrame {
        *self.frames.borrow()
    }
}

/// Publishes every well-formed frame read from `reader`.
///
/// Malformed lines are skipped. When the stream ends a neutral frame is
/// published so that motion stops. Returns the number of accepted frames.
pub fn pump<R: BufRead>(reader: R, tx: &watch::Sender<InputFrame>) -> usize {
    let mut accepted = 0;

    for line in reader.lines() {
        match line {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) => match serde_json::from_str::<InputFrame>(&line) {
                Ok(frame) => {
                    accepted += 1;
                    let _ = tx.send(frame);
                }
                Err(e) => warn!("Ignoring malformed input frame '{}': {}", line, e),
            },
            Err(e) => {
                error!("Input stream error: {}", e);
                break;
            }
        }
    }

    let _ = tx.send(InputFrame::default());
    accepted
}

/// Writes each feedback request as one JSON line until every sender is gone
/// or the output fails. Returns the number of lines written.
pub fn write_feedback<W: Write>(
    out: &mut W,
    mut requests: mpsc::UnboundedReceiver<Feedback>,
) -> usize {
    let mut written = 0;
    while let Some(request) = requests.blocking_recv() {
        let line = serde_json::to_writer(&mut *out, &request)
            .map_err(io::Error::from)
            .and_then(|_| out.write_all(b"\n"))
            .and_then(|_| out.flush());
        match line {
            Ok(()) => written += 1,
            Err(e) => {
                warn!("Failed to send haptic feedback: {}", e);
                break;
            }
        }
    }
    written
}

impl InputSource for BridgeInput {
    fn name(&self) -> &str {
        "json-lines bridge"
    }

    fn xyz(&mut self) -> Vector3 {
        let frame = self.frame();
        Vector3::new(
            dead_zone(frame.x, self.dead_zone),
            dead_zone(frame.y, self.dead_zone),
            dead_zone(frame.z, self.dead_zone),
        )
    }

    fn home_pressed(&mut self) -> bool {
        self.frame().home
    }

    fn speed(&mut self) -> f64 {
        let speed = self.frame().speed;
        if speed.is_finite() {
            speed.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn speed_lock_pressed(&mut self) -> bool {
        self.frame().speed_lock
    }

    fn rumble(&mut self) {
        info!("Rumble");
        if self.feedback.send(Feedback::RUMBLE).is_err() {
            warn!("Haptic feedback writer has stopped");
        }
    }
}
