pub mod config;
pub mod vector;

use std::time::Duration;

use config::PlannerConfig;
use vector::Vector3;

use crate::error::ConfigurationError;

/// Velocity and relative displacement for one control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JogCommand {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    /// Path velocity in mm/s.
    pub velocity: f64,
}

impl JogCommand {
    pub fn new(displacement: Vector3, velocity: f64) -> Self {
        Self {
            dx: displacement.x,
            dy: displacement.y,
            dz: displacement.z,
            velocity,
        }
    }

    /// Feedrate in mm/min, the unit the firmware expects on the wire.
    pub fn feedrate(&self) -> f64 {
        self.velocity * 60.0
    }
}

/// Kinematics for incremental jogging.
///
/// Each tick asks the firmware for a constant-velocity segment whose duration
/// is long enough that the firmware can always come to a stop within its
/// planner buffer without exceeding the acceleration limit.
#[derive(Debug, Clone)]
pub struct MotionPlanner {
    v_max: f64,
    a_max: f64,
    blocks: usize,
    dt_min: Duration,
}

impl MotionPlanner {
    pub fn new(config: &PlannerConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            v_max: config.max_velocity(),
            a_max: config.max_acceleration,
            blocks: config.planner_blocks,
            dt_min: config.min_tick(),
        })
    }

    pub fn v_max(&self) -> f64 {
        self.v_max
    }

    pub fn dt_min(&self) -> Duration {
        self.dt_min
    }

    /// Splits operator intent into a unit direction and a velocity clipped to `v_max`.
    pub fn normalize(&self, axes: Vector3) -> (Vector3, f64) {
        if !axes.is_finite() {
            return (Vector3::ZERO, 0.0);
        }
        let n = axes.norm();
        if !n.is_finite() || n <= 0.0 {
            return (Vector3::ZERO, 0.0);
        }
        (axes.scale(1.0 / n), self.v_max * n.min(1.0))
    }

    pub fn calc_dt(&self, v: f64) -> Duration {
        let dt = v * v / (2.0 * self.a_max * (self.blocks - 1) as f64);
        Duration::try_from_secs_f64(dt)
            .unwrap_or_default()
            .max(self.dt_min)
    }

    pub fn calc_s(&self, v: f64, dt: Duration) -> f64 {
        v * dt.as_secs_f64()
    }

    /// Budget left after `elapsed`, never negative.
    pub fn remaining(budget: Duration, elapsed: Duration) -> Duration {
        budget.saturating_sub(elapsed)
    }

    /// Plans the jog for one tick and returns it with the tick budget.
    pub fn plan(&self, direction: Vector3, v: f64) -> (JogCommand, Duration) {
        let dt = self.calc_dt(v);
        let s = self.calc_s(v, dt);
        (JogCommand::new(direction.scale(s), v), dt)
    }
}
