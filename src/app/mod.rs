pub mod speed_lock;

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tracing::warn;

use crate::error::FatalControlError;
use crate::fsm::State;
use crate::input::InputSource;
use crate::planner::{vector::Vector3, MotionPlanner};
use crate::protocol::GrblClient;

/// Per-tick values owned by the control loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Context {
    /// Unit direction of the requested motion.
    pub direction: Vector3,
    /// Requested path velocity in mm/s.
    pub velocity: f64,
    /// Time left to wait before the next tick.
    pub dt: Duration,
    pub speed_scale: f64,
}

impl Context {
    pub fn new(idle_tick: Duration) -> Self {
        Self {
            direction: Vector3::ZERO,
            velocity: 0.0,
            dt: idle_tick,
            speed_scale: 1.0,
        }
    }
}

/// Everything a device state may touch during one tick.
pub struct Tick<'a, T> {
    pub ctx: &'a mut Context,
    pub client: &'a mut GrblClient<T>,
    pub input: &'a mut dyn InputSource,
    pub planner: &'a MotionPlanner,
    pub idle_tick: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogState {
    Off,
    Ready,
    Jogging,
}

#[async_trait::async_trait(?Send)]
impl<'a, T> State<Tick<'a, T>> for JogState
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    type Error = FatalControlError;

    fn name(&self) -> &'static str {
        match self {
            JogState::Off => "Off",
            JogState::Ready => "Ready",
            JogState::Jogging => "Jogging",
        }
    }

    async fn event(&mut self, tick: &mut Tick<'a, T>) -> Result<Option<Self>, Self::Error> {
        match self {
            JogState::Off => {
                if !tick.input.home_pressed() {
                    return Ok(None);
                }
                tick.client.home().await.map_err(FatalControlError::Homing)?;
                Ok(Some(JogState::Ready))
            }
            JogState::Ready => {
                if tick.ctx.velocity > 0.0 {
                    Ok(Some(JogState::Jogging))
                } else {
                    Ok(None)
                }
            }
            JogState::Jogging => {
                if tick.ctx.velocity == 0.0 {
                    return Ok(Some(JogState::Ready));
                }

                let (jog, dt) = tick.planner.plan(tick.ctx.direction, tick.ctx.velocity);
                let started = Instant::now();
                if !tick.client.jog(&jog).await? {
                    warn!("Jog rejected by firmware");
                    tick.input.rumble();
                }
                tick.ctx.dt = MotionPlanner::remaining(dt, started.elapsed());
                Ok(None)
            }
        }
    }

    async fn exit(&mut self, tick: &mut Tick<'a, T>) -> Result<bool, Self::Error> {
        if *self == JogState::Jogging {
            // Queued jog motion must never outlive the Jogging state.
            tick.client.jog_cancel().await?;
        }
        Ok(true)
    }

    fn entered(&mut self, tick: &mut Tick<'a, T>) {
        match self {
            JogState::Off => tick.ctx.dt = tick.idle_tick,
            JogState::Ready => {
                tick.ctx.dt = tick.idle_tick;
                tick.input.rumble();
            }
            JogState::Jogging => {
                tick.ctx.dt = Duration::ZERO;
                tick.input.rumble();
            }
        }
    }
}
