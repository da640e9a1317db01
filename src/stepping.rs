//! Fixed-timestep stepping driven by variable-rate frames.
//!
//! [`SteppingLoop::advance`] is the only place in the crate that calls
//! [`Simulation::step`].

use crate::options::SteppingOptions;
use crate::sim::{Simulation, SimulationWarning};

/// Slack for floating point error when dividing elapsed time into steps.
const STEP_EPSILON: f64 = 1e-9;

/// Lifecycle of the stepping loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    /// No scene loaded, or torn down for a reload.
    #[default]
    Idle,
    /// Stepping every frame.
    Running,
    /// Frames still sync and render, physics time is frozen.
    Paused,
}

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Physics steps run.
    pub steps: u32,
    /// The frame exceeded the stall threshold and the accumulator was reset.
    pub stalled: bool,
    /// The step count hit the per-frame cap and the backlog was dropped.
    pub capped: bool,
    /// Numeric warnings raised by the steps.
    pub warnings: Vec<SimulationWarning>,
}

/// Accumulates wall-clock time and converts it into whole physics steps.
#[derive(Debug, Clone)]
pub struct SteppingLoop {
    state: RunState,
    accumulator: f64,
    stall_threshold: f64,
    max_steps_per_frame: u32,
    start_paused: bool,
    total_steps: u64,
}

impl SteppingLoop {
    /// Idle loop configured from `options`.
    #[must_use]
    pub fn new(options: &SteppingOptions) -> Self {
        let mut stepping = Self {
            state: RunState::Idle,
            accumulator: 0.0,
            stall_threshold: 0.0,
            max_steps_per_frame: 1,
            start_paused: false,
            total_steps: 0,
        };
        stepping.apply_options(options);
        stepping
    }

    /// Update thresholds without changing the run state.
    pub fn apply_options(&mut self, options: &SteppingOptions) {
        self.stall_threshold = options.stall_threshold_ms.max(0.0) / 1000.0;
        self.max_steps_per_frame = options.max_steps_per_frame.max(1);
        self.start_paused = options.start_paused;
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Whether frames currently step the simulation.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Whether stepping is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == RunState::Paused
    }

    /// Steps run since the last [`start`](Self::start).
    #[must_use]
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Unconsumed wall-clock time in seconds.
    #[must_use]
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Leave `Idle` after a scene load.
    pub fn start(&mut self) {
        self.accumulator = 0.0;
        self.total_steps = 0;
        self.state = if self.start_paused {
            RunState::Paused
        } else {
            RunState::Running
        };
        log::debug!("stepping started ({:?})", self.state);
    }

    /// Return to `Idle`, dropping accumulated time.
    pub fn stop(&mut self) {
        self.state = RunState::Idle;
        self.accumulator = 0.0;
        log::debug!("stepping stopped");
    }

    /// Freeze physics time.
    pub fn pause(&mut self) {
        if self.state == RunState::Running {
            self.state = RunState::Paused;
            self.accumulator = 0.0;
        }
    }

    /// Continue stepping.
    pub fn resume(&mut self) {
        if self.state == RunState::Paused {
            self.state = RunState::Running;
            self.accumulator = 0.0;
        }
    }

    /// Flip between running and paused. Returns the new state.
    pub fn toggle_pause(&mut self) -> RunState {
        match self.state {
            RunState::Running => self.pause(),
            RunState::Paused => self.resume(),
            RunState::Idle => {}
        }
        log::info!("stepping {:?}", self.state);
        self.state
    }

    /// Restore the default configuration and clear accumulated time.
    pub fn reset(&mut self, sim: &mut dyn Simulation) {
        sim.reset();
        self.accumulator = 0.0;
    }

    /// Load keyframe `index` and clear accumulated time. Returns `false` if
    /// the keyframe does not exist.
    pub fn reset_to_keyframe(&mut self, sim: &mut dyn Simulation, index: usize) -> bool {
        let loaded = sim.reset_to_keyframe(index);
        if loaded {
            self.accumulator = 0.0;
        }
        loaded
    }

    /// Consume `elapsed` seconds of wall-clock time.
    ///
    /// Runs `floor(accumulated / timestep)` steps, calling `before_step`
    /// ahead of each one so per-step inputs (controls, drag forces) are
    /// written first. A frame longer than the stall threshold runs no steps
    /// and resets the accumulator instead of catching up.
    pub fn advance(
        &mut self,
        sim: &mut dyn Simulation,
        elapsed: f64,
        mut before_step: impl FnMut(&mut dyn Simulation),
    ) -> FrameReport {
        let mut report = FrameReport::default();
        if self.state != RunState::Running {
            return report;
        }

        let dt = sim.model().opt.timestep;
        if !(dt.is_finite() && dt > 0.0) || !elapsed.is_finite() || elapsed < 0.0 {
            log::warn!("skipping frame: timestep {dt}, elapsed {elapsed}");
            return report;
        }

        if elapsed > self.stall_threshold {
            log::warn!(
                "frame took {:.1} ms (threshold {:.1} ms), dropping backlog",
                elapsed * 1000.0,
                self.stall_threshold * 1000.0
            );
            self.accumulator = 0.0;
            report.stalled = true;
            return report;
        }

        self.accumulator += elapsed;
        let due = (self.accumulator / dt + STEP_EPSILON).floor();
        let steps = if due > f64::from(self.max_steps_per_frame) {
            report.capped = true;
            self.max_steps_per_frame
        } else {
            due as u32
        };

        for _ in 0..steps {
            before_step(sim);
            if let Err(warning) = sim.step() {
                log::warn!("simulation warning at t={:.4}: {warning}", sim.data().time);
                report.warnings.push(warning);
            }
        }

        report.steps = steps;
        self.total_steps += u64::from(steps);
        if report.capped {
            log::debug!("step cap {} reached, dropping backlog", self.max_steps_per_frame);
            self.accumulator = 0.0;
        } else {
            self.accumulator = (self.accumulator - f64::from(steps) * dt).max(0.0);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{BodySpec, ModelBuilder, RapierSimulation};

    fn sim() -> RapierSimulation {
        let mut builder = ModelBuilder::new().timestep(0.002).gravity([0.0; 3]);
        let _ = builder.add_body(BodySpec {
            name: "box".to_owned(),
            mass: 1.0,
            ..BodySpec::default()
        });
        RapierSimulation::new(builder.build().unwrap()).unwrap()
    }

    fn running() -> SteppingLoop {
        let mut stepping = SteppingLoop::new(&SteppingOptions::default());
        stepping.start();
        stepping
    }

    #[test]
    fn idle_until_started() {
        let mut sim = sim();
        let mut stepping = SteppingLoop::new(&SteppingOptions::default());
        assert_eq!(stepping.state(), RunState::Idle);
        assert_eq!(stepping.advance(&mut sim, 0.01, |_| {}).steps, 0);
        stepping.start();
        assert_eq!(stepping.state(), RunState::Running);
    }

    #[test]
    fn runs_floor_of_elapsed_over_dt() {
        let mut sim = sim();
        let mut stepping = running();
        let mut calls = 0;
        let report = stepping.advance(&mut sim, 0.0201, |_| calls += 1);
        assert_eq!(report.steps, 10);
        assert_eq!(calls, 10);
        assert!((sim.data().time - 0.02).abs() < 1e-9);
        assert!((stepping.accumulator() - 0.0001).abs() < 1e-9);
    }

    #[test]
    fn remainder_carries_over() {
        let mut sim = sim();
        let mut stepping = running();
        let total: u32 = (0..10)
            .map(|_| stepping.advance(&mut sim, 0.0015, |_| {}).steps)
            .sum();
        // 10 * 1.5 ms = 15 ms -> 7 whole steps of 2 ms.
        assert_eq!(total, 7);
        assert_eq!(stepping.total_steps(), 7);
    }

    #[test]
    fn stall_resets_accumulator() {
        let mut sim = sim();
        let mut stepping = running();
        let _ = stepping.advance(&mut sim, 0.001, |_| {});
        let report = stepping.advance(&mut sim, 0.5, |_| {});
        assert!(report.stalled);
        assert_eq!(report.steps, 0);
        assert_eq!(stepping.accumulator(), 0.0);
        assert_eq!(stepping.advance(&mut sim, 0.004, |_| {}).steps, 2);
    }

    #[test]
    fn step_cap_drops_backlog() {
        let mut sim = sim();
        let mut stepping = SteppingLoop::new(&SteppingOptions {
            max_steps_per_frame: 5,
            ..SteppingOptions::default()
        });
        stepping.start();
        let report = stepping.advance(&mut sim, 0.03, |_| {});
        assert!(report.capped);
        assert_eq!(report.steps, 5);
        assert_eq!(stepping.accumulator(), 0.0);
    }

    #[test]
    fn paused_does_not_step() {
        let mut sim = sim();
        let mut stepping = running();
        assert_eq!(stepping.toggle_pause(), RunState::Paused);
        assert_eq!(stepping.advance(&mut sim, 0.01, |_| {}).steps, 0);
        assert_eq!(sim.data().time, 0.0);
        assert_eq!(stepping.toggle_pause(), RunState::Running);
        assert_eq!(stepping.advance(&mut sim, 0.01, |_| {}).steps, 5);
    }

    #[test]
    fn reset_rewinds_time() {
        let mut sim = sim();
        let mut stepping = running();
        let _ = stepping.advance(&mut sim, 0.01, |_| {});
        assert!(sim.data().time > 0.0);
        stepping.reset(&mut sim);
        assert_eq!(sim.data().time, 0.0);
        assert_eq!(stepping.accumulator(), 0.0);
        assert!(stepping.is_running());
    }

    #[test]
    fn start_paused_option() {
        let mut stepping = SteppingLoop::new(&SteppingOptions {
            start_paused: true,
            ..SteppingOptions::default()
        });
        stepping.start();
        assert!(stepping.is_paused());
        stepping.stop();
        assert_eq!(stepping.state(), RunState::Idle);
    }
}
