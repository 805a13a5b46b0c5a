use tracing::info;

use crate::error::FatalControlError;
use crate::fsm::State;

/// Fires once on a released-to-pressed transition and re-arms on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeDetector {
    armed: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self { armed: true }
    }

    pub fn rising(&mut self, pressed: bool) -> bool {
        let fired = pressed && self.armed;
        self.armed = !pressed;
        fired
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedInput {
    pub speed: f64,
    pub lock_pressed: bool,
}

/// Orthogonal sub-machine that either follows the speed input or holds it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedLock {
    Variable { scale: f64, edge: EdgeDetector },
    Locked { scale: f64, edge: EdgeDetector },
}

impl SpeedLock {
    pub fn new() -> Self {
        SpeedLock::Variable {
            scale: 1.0,
            edge: EdgeDetector::new(),
        }
    }

    pub fn scale(&self) -> f64 {
        match self {
            SpeedLock::Variable { scale, .. } | SpeedLock::Locked { scale, .. } => *scale,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, SpeedLock::Locked { .. })
    }
}

impl Default for SpeedLock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait(?Send)]
impl State<SpeedInput> for SpeedLock {
    type Error = FatalControlError;

    fn name(&self) -> &'static str {
        match self {
            SpeedLock::Variable { .. } => "Variable",
            SpeedLock::Locked { .. } => "Locked",
        }
    }

    async fn event(&mut self, input: &mut SpeedInput) -> Result<Option<Self>, Self::Error> {
        match self {
            SpeedLock::Variable { scale, edge } => {
                *scale = input.speed;
                if edge.rising(input.lock_pressed) {
                    return Ok(Some(SpeedLock::Locked {
                        scale: *scale,
                        edge: *edge,
                    }));
                }
            }
            SpeedLock::Locked { scale, edge } => {
                if edge.rising(input.lock_pressed) {
                    return Ok(Some(SpeedLock::Variable {
                        scale: *scale,
                        edge: *edge,
                    }));
                }
            }
        }
        Ok(None)
    }

    async fn enter(&mut self, input: &mut SpeedInput) -> Result<bool, Self::Error> {
        match self {
            SpeedLock::Variable { scale, .. } => *scale = input.speed,
            SpeedLock::Locked { scale, .. } => {
                *scale = input.speed;
                info!("Speed locked at {:.0}%", *scale * 100.0);
            }
        }
        Ok(true)
    }
}
