use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickPhase {
    // runs zero or more times per frame, always with the same dt
    Fixed,
    // runs once per frame with however long the frame took
    Variable,
}

type System<W> = Box<dyn FnMut(&mut W, Duration)>;

// more than this and we'd rather drop time than never catch up
const MAX_FIXED_STEPS_PER_FRAME: usize = 8;

/// Update functions registered per phase, run in the order they were added.
pub struct Schedule<W> {
    systems: HashMap<TickPhase, Vec<(&'static str, System<W>)>>,
    fixed_step: Duration,
    accumulator: Duration,
}

impl<W> Schedule<W> {
    pub fn new(fixed_step: Duration) -> Self {
        let fixed_step = if fixed_step.is_zero() {
            warn!("fixed step of zero requested, using 1ms");
            Duration::from_millis(1)
        } else {
            fixed_step
        };
        Self {
            systems: HashMap::new(),
            fixed_step,
            accumulator: Duration::ZERO,
        }
    }

    pub fn fixed_step(&self) -> Duration {
        self.fixed_step
    }

    pub fn add<F>(&mut self, phase: TickPhase, label: &'static str, system: F)
    where
        F: FnMut(&mut W, Duration) + 'static,
    {
        self.systems
            .entry(phase)
            .or_default()
            .push((label, Box::new(system)));
    }

    fn call(&mut self, phase: TickPhase, world: &mut W, dt: Duration) {
        if let Some(systems) = self.systems.get_mut(&phase) {
            for (label, system) in systems.iter_mut() {
                debug!(?phase, system = label, "running system");
                system(world, dt);
            }
        }
    }

    /// Runs as many fixed steps as `frame_dt` pays for, then the variable
    /// phase once. Returns how many fixed steps ran.
    pub fn run(&mut self, world: &mut W, frame_dt: Duration) -> usize {
        self.accumulator += frame_dt;

        let mut steps = 0;
        while self.accumulator >= self.fixed_step {
            if steps == MAX_FIXED_STEPS_PER_FRAME {
                warn!(
                    dropped_ms = self.accumulator.as_millis() as u64,
                    "simulation fell behind, dropping time"
                );
                self.accumulator = Duration::ZERO;
                break;
            }
            self.accumulator -= self.fixed_step;
            self.call(TickPhase::Fixed, world, self.fixed_step);
            steps += 1;
        }

        self.call(TickPhase::Variable, world, frame_dt);
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        entries: Vec<String>,
    }

    #[test]
    fn test_systems_run_in_registration_order() {
        let mut schedule = Schedule::new(Duration::from_millis(10));
        schedule.add(TickPhase::Variable, "render", |log: &mut Log, _| {
            log.entries.push("render".to_string())
        });
        schedule.add(TickPhase::Fixed, "first", |log: &mut Log, _| {
            log.entries.push("first".to_string())
        });
        schedule.add(TickPhase::Fixed, "second", |log: &mut Log, _| {
            log.entries.push("second".to_string())
        });

        let mut log = Log::default();
        assert_eq!(schedule.run(&mut log, Duration::from_millis(10)), 1);
        assert_eq!(log.entries, vec!["first", "second", "render"]);
    }

    #[test]
    fn test_fixed_steps_accumulate() {
        let mut schedule = Schedule::new(Duration::from_millis(10));
        schedule.add(TickPhase::Fixed, "count", |count: &mut u32, dt| {
            assert_eq!(dt, Duration::from_millis(10));
            *count += 1;
        });

        let mut count = 0;
        assert_eq!(schedule.run(&mut count, Duration::from_millis(4)), 0);
        assert_eq!(schedule.run(&mut count, Duration::from_millis(4)), 0);
        assert_eq!(schedule.run(&mut count, Duration::from_millis(4)), 1);
        assert_eq!(schedule.run(&mut count, Duration::from_millis(25)), 2);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_long_frames_are_capped() {
        let mut schedule = Schedule::new(Duration::from_millis(10));
        schedule.add(TickPhase::Fixed, "count", |count: &mut usize, _| *count += 1);

        let mut count = 0;
        let steps = schedule.run(&mut count, Duration::from_secs(5));
        assert_eq!(steps, MAX_FIXED_STEPS_PER_FRAME);
        // the backlog is gone rather than carried over
        assert_eq!(schedule.run(&mut count, Duration::from_millis(5)), 0);
    }

    #[test]
    fn test_zero_step_is_replaced() {
        let schedule: Schedule<()> = Schedule::new(Duration::ZERO);
        assert_eq!(schedule.fixed_step(), Duration::from_millis(1));
    }
}
