pub mod config;

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use crate::app::speed_lock::{SpeedInput, SpeedLock};
use crate::app::{Context, JogState, Tick};
use crate::error::FatalControlError;
use crate::fsm::Machine;
use crate::input::InputSource;
use crate::planner::MotionPlanner;
use crate::protocol::GrblClient;
use config::ControllerConfig;

/// Tick-driven control loop.
///
/// One tick samples the input, derives direction and velocity, advances the
/// device machine and then the speed-lock machine. All firmware I/O happens
/// inline, so a slow reply stretches the tick.
pub struct Controller<T> {
    client: GrblClient<T>,
    input: Box<dyn InputSource>,
    planner: MotionPlanner,
    jog: Machine<JogState>,
    speed_lock: Machine<SpeedLock>,
    ctx: Context,
    idle_tick: Duration,
}

impl<T> Controller<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub async fn new(
        mut client: GrblClient<T>,
        mut input: Box<dyn InputSource>,
        config: &ControllerConfig,
    ) -> Result<Self, FatalControlError> {
        config.validate()?;
        let planner = MotionPlanner::new(&config.planner)?;
        let idle_tick = config.idle_tick();
        info!(
            "v_max: {:.3} mm/s, dt_max: {:.3} s, input: {}",
            planner.v_max(),
            planner.calc_dt(planner.v_max()).as_secs_f64(),
            input.name()
        );

        let initial = if config.unlock_on_connect {
            client.unlock().await?;
            JogState::Ready
        } else {
            JogState::Off
        };

        let mut ctx = Context::new(idle_tick);
        let mut speed = SpeedInput {
            speed: unit(input.speed()),
            lock_pressed: false,
        };
        let speed_lock = Machine::start(SpeedLock::new(), &mut speed).await?;
        ctx.speed_scale = speed_lock.current().scale();

        let mut tick = Tick {
            ctx: &mut ctx,
            client: &mut client,
            input: &mut *input,
            planner: &planner,
            idle_tick,
        };
        let jog = Machine::start(initial, &mut tick).await?;

        Ok(Self {
            client,
            input,
            planner,
            jog,
            speed_lock,
            ctx,
            idle_tick,
        })
    }

    pub fn state(&self) -> JogState {
        *self.jog.current()
    }

    pub fn speed_lock(&self) -> &SpeedLock {
        self.speed_lock.current()
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Runs one tick and returns how long to wait before the next.
    pub async fn tick(&mut self) -> Result<Duration, FatalControlError> {
        let (direction, v) = self.planner.normalize(self.input.xyz());
        self.ctx.direction = direction;
        self.ctx.velocity = v * self.ctx.speed_scale;

        let mut tick = Tick {
            ctx: &mut self.ctx,
            client: &mut self.client,
            input: &mut *self.input,
            planner: &self.planner,
            idle_tick: self.idle_tick,
        };
        self.jog.event(&mut tick).await?;

        let mut speed = SpeedInput {
            speed: unit(self.input.speed()),
            lock_pressed: self.input.speed_lock_pressed(),
        };
        self.speed_lock.event(&mut speed).await?;
        self.ctx.speed_scale = self.speed_lock.current().scale();

        Ok(self.ctx.dt)
    }

    /// Ticks until `shutdown` resolves or an error stops the loop.
    ///
    /// `shutdown` is only observed between ticks. Queued motion is cancelled
    /// on the way out and the transport is released.
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), FatalControlError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let outcome = loop {
            let pause = match self.tick().await {
                Ok(pause) => pause,
                Err(e) => break Err(e),
            };
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                _ = tokio::time::sleep(pause) => {}
            }
        };

        let stopped = self.stop_motion().await;
        drop(self.client.into_inner());
        info!("Transport released");
        outcome.and(stopped)
    }

    async fn stop_motion(&mut self) -> Result<(), FatalControlError> {
        if self.state() != JogState::Jogging {
            return Ok(());
        }
        self.client.jog_cancel().await.map_err(|e| {
            warn!("Failed to cancel queued motion: {}", e);
            FatalControlError::from(e)
        })
    }
}

/// Connects, builds the controller and runs it, all under one shutdown signal.
///
/// `shutdown` is polled from the start, so an interrupt during the handshake
/// ends the call cleanly instead of waiting for the control loop.
pub async fn connect_and_run<T, F>(
    transport: T,
    input: Box<dyn InputSource>,
    config: &ControllerConfig,
    shutdown: F,
) -> Result<(), FatalControlError>
where
    T: AsyncRead + AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let startup = async {
        let client = GrblClient::connect(transport, config.link.clone()).await?;
        Controller::new(client, input, config).await
    };
    let controller = tokio::select! {
        biased;
        _ = &mut shutdown => {
            info!("Shutdown requested before the control loop started");
            return Ok(());
        }
        controller = startup => controller?,
    };

    controller.run(shutdown).await
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::testing::{Sample, ScriptedInput};
    use crate::planner::config::PlannerConfig;
    use crate::protocol::config::LinkConfig;
    use tokio_test::io::{Builder, Mock};

    fn jog_line(v: f64) -> Vec<u8> {
        let planner = MotionPlanner::new(&PlannerConfig::default()).unwrap();
        let s = planner.calc_s(v, planner.calc_dt(v));
        format!("$J=G91X{:.3}Y0.000Z0.000F{:.3}\n", s, 60.0 * v).into_bytes()
    }

    async fn controller(
        mock: Mock,
        input: ScriptedInput,
        config: ControllerConfig,
    ) -> Controller<Mock> {
        let client = GrblClient::new(mock, LinkConfig::default());
        Controller::new(client, Box::new(input), &config)
            .await
            .unwrap()
    }

    fn unlocked() -> ControllerConfig {
        ControllerConfig {
            unlock_on_connect: true,
            ..ControllerConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_deflection_after_homing() {
        assert_eq!(jog_line(50.0), b"$J=G91X4.464Y0.000Z0.000F3000.000\n");

        let mock = Builder::new()
            .write(b"$H\n")
            .read(b"ok\r\n")
            .write(&jog_line(50.0))
            .read(b"ok\r\n")
            .build();
        let input = ScriptedInput::new([Sample::home(), Sample::axes(1.0, 0.0, 0.0)]);
        let mut controller = controller(mock, input, ControllerConfig::default()).await;
        assert_eq!(controller.state(), JogState::Off);

        controller.tick().await.unwrap();
        assert_eq!(controller.state(), JogState::Ready);

        let pause = controller.tick().await.unwrap();
        assert_eq!(controller.state(), JogState::Jogging);
        assert_eq!(pause, Duration::ZERO);

        let pause = controller.tick().await.unwrap();
        assert_eq!(controller.state(), JogState::Jogging);
        assert_eq!(controller.context().velocity, 50.0);
        assert!(pause <= controller.planner.calc_dt(50.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_travel_limit_rumbles_and_keeps_jogging() {
        let mock = Builder::new()
            .write(b"$X\n")
            .read(b"ok\r\n")
            .write(&jog_line(50.0))
            .read(b"error:15\r\n")
            .build();
        let input = ScriptedInput::new([Sample::axes(1.0, 0.0, 0.0)]);
        let rumbles = input.rumbles();
        let mut controller = controller(mock, input, unlocked()).await;

        controller.tick().await.unwrap();
        let before = rumbles.get();
        controller.tick().await.unwrap();

        assert_eq!(controller.state(), JogState::Jogging);
        assert_eq!(rumbles.get(), before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_homing_error_stops_the_loop() {
        let mock = Builder::new().write(b"$H\n").read(b"error:3\r\n").build();
        let input = ScriptedInput::new([Sample::home()]);
        let controller = controller(mock, input, ControllerConfig::default()).await;

        let result = controller.run(std::future::pending()).await;

        assert!(matches!(
            result,
            Err(FatalControlError::Homing(ref e)) if e.code() == Some(3)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_queued_motion() {
        let mock = Builder::new()
            .write(b"$X\n")
            .read(b"ok\r\n")
            .write(&jog_line(50.0))
            .read(b"ok\r\n")
            .write(&jog_line(50.0))
            .read(b"ok\r\n")
            .write(&jog_line(50.0))
            .read(b"ok\r\n")
            .write(&[0x85])
            .build();
        let input = ScriptedInput::new([Sample::axes(1.0, 0.0, 0.0)]);
        let controller = controller(mock, input, unlocked()).await;

        let result = controller
            .run(tokio::time::sleep(Duration::from_millis(250)))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_scale_limits_velocity() {
        let half = Sample {
            speed: 0.5,
            ..Sample::axes(1.0, 0.0, 0.0)
        };
        let mock = Builder::new()
            .write(b"$X\n")
            .read(b"ok\r\n")
            .write(&jog_line(25.0))
            .read(b"ok\r\n")
            .build();
        let input = ScriptedInput::new([half]);
        let mut controller = controller(mock, input, unlocked()).await;

        controller.tick().await.unwrap();
        assert_eq!(controller.speed_lock().scale(), 0.5);
        controller.tick().await.unwrap();
        assert_eq!(controller.context().velocity, 25.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_handshake_is_clean() {
        // Banner, then silence through the boot delay. No status query may go out.
        let mock = Builder::new()
            .read(b"\r\nGrbl 1.1h ['$' for help]\r\n")
            .wait(Duration::from_secs(10))
            .build();
        let input = ScriptedInput::new([Sample::axes(0.0, 0.0, 0.0)]);

        let result = connect_and_run(
            mock,
            Box::new(input),
            &ControllerConfig::default(),
            tokio::time::sleep(Duration::from_millis(500)),
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_and_run_reports_handshake_failure() {
        let mock = Builder::new().build();
        let input = ScriptedInput::new([Sample::axes(0.0, 0.0, 0.0)]);

        let result = connect_and_run(
            mock,
            Box::new(input),
            &ControllerConfig::default(),
            std::future::pending(),
        )
        .await;

        assert!(matches!(result, Err(FatalControlError::Link(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_releasing_the_stick_returns_to_ready() {
        let mock = Builder::new()
            .write(b"$X\n")
            .read(b"ok\r\n")
            .write(&jog_line(50.0))
            .read(b"ok\r\n")
            .write(&[0x85])
            .build();
        let input = ScriptedInput::new([
            Sample::axes(1.0, 0.0, 0.0),
            Sample::axes(1.0, 0.0, 0.0),
            Sample::axes(0.0, 0.0, 0.0),
        ]);
        let mut controller = controller(mock, input, unlocked()).await;

        controller.tick().await.unwrap();
        controller.tick().await.unwrap();
        let pause = controller.tick().await.unwrap();

        assert_eq!(controller.state(), JogState::Ready);
        assert_eq!(pause, Duration::from_millis(100));
    }
}
