pub mod bridge;

use crate::planner::vector::Vector3;

/// Operator input, sampled once per control tick.
pub trait InputSource {
    fn name(&self) -> &str;

    /// Axis deflections in [-1, 1] with the dead zone already applied.
    fn xyz(&mut self) -> Vector3;

    fn home_pressed(&mut self) -> bool {
        false
    }

    /// Speed scale in [0, 1].
    fn speed(&mut self) -> f64 {
        1.0
    }

    fn speed_lock_pressed(&mut self) -> bool {
        false
    }

    /// Haptic feedback, fire-and-forget.
    fn rumble(&mut self) {}
}

/// Zeroes `value` inside the dead zone and rescales the rest back to [-1, 1].
pub fn dead_zone(value: f64, threshold: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let value = value.clamp(-1.0, 1.0);
    if value.abs() < threshold {
        0.0
    } else {
        value.signum() * (value.abs() - threshold) / (1.0 - threshold)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::InputSource;
    use crate::planner::vector::Vector3;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct Sample {
        pub xyz: Vector3,
        pub home: bool,
        pub speed: f64,
        pub speed_lock: bool,
    }

    impl Sample {
        pub fn axes(x: f64, y: f64, z: f64) -> Self {
            Self {
                xyz: Vector3::new(x, y, z),
                speed: 1.0,
                ..Self::default()
            }
        }

        pub fn home() -> Self {
            Self {
                home: true,
                speed: 1.0,
                ..Self::default()
            }
        }
    }

    /// Replays queued samples, repeating the last one once the queue runs dry.
    pub struct ScriptedInput {
        queue: VecDeque<Sample>,
        current: Sample,
        rumbles: Rc<Cell<usize>>,
    }

    impl ScriptedInput {
        pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
            Self {
                queue: samples.into_iter().collect(),
                current: Sample::axes(0.0, 0.0, 0.0),
                rumbles: Rc::new(Cell::new(0)),
            }
        }

        pub fn rumbles(&self) -> Rc<Cell<usize>> {
            self.rumbles.clone()
        }

        fn sample(&mut self) -> Sample {
            if let Some(next) = self.queue.pop_front() {
                self.current = next;
            }
            self.current
        }
    }

    impl InputSource for ScriptedInput {
        fn name(&self) -> &str {
            "scripted"
        }

        // The controller always samples xyz first, so it advances the script.
        fn xyz(&mut self) -> Vector3 {
            self.sample().xyz
        }

        fn home_pressed(&mut self) -> bool {
            self.current.home
        }

        fn speed(&mut self) -> f64 {
            self.current.speed
        }

        fn speed_lock_pressed(&mut self) -> bool {
            self.current.speed_lock
        }

        fn rumble(&mut self) {
            self.rumbles.set(self.rumbles.get() + 1);
        }
    }
}
