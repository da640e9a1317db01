//! Per-step actuator commands: policy targets or manual setpoints, tracked
//! with a PD law and written into `ctrl`.

use super::noise::ActuatorNoise;
use super::observation::{build_frame, frame_len, ObservationHistory};
use super::pd::pd_torque;
use super::policy::PolicyRunner;
use crate::options::{ControlMode, ControlOptions, VelocityCommand};
use crate::sim::{JointType, Model, Simulation};

const NOISE_SEED: u64 = 0x5eed;

/// An actuator driving a single-DOF joint, with everything the PD law
/// needs resolved at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlledJoint {
    /// Actuator index into `ctrl`.
    pub actuator: usize,
    /// Joint index.
    pub joint: usize,
    /// Joint name, used for gain and default-pose lookup.
    pub name: String,
    /// Offset of the joint coordinate in `qpos`.
    pub qpos_adr: usize,
    /// Offset of the joint velocity in `qvel`.
    pub dof_adr: usize,
    /// Angle the policy action is relative to.
    pub default_angle: f64,
    /// Proportional gain.
    pub kp: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Symmetric torque limit.
    pub torque_limit: f64,
}

/// Resolve the controlled joints of `model`, in actuator order. Actuators
/// on free or ball joints are skipped.
#[must_use]
pub fn controlled_joints(model: &Model, options: &ControlOptions) -> Vec<ControlledJoint> {
    (0..model.nu)
        .filter_map(|actuator| {
            let joint = model.actuator_trnid[actuator];
            if !matches!(model.jnt_type[joint], JointType::Hinge | JointType::Slide) {
                log::debug!(
                    "actuator {} drives a multi-DOF joint, not PD controlled",
                    model.actuator_name[actuator]
                );
                return None;
            }
            let name = model.jnt_name[joint].clone();
            let gains = options.gains_for(&name);
            Some(ControlledJoint {
                actuator,
                joint,
                qpos_adr: model.jnt_qposadr[joint],
                dof_adr: model.jnt_dofadr[joint],
                default_angle: options.default_angle(&name),
                kp: gains.kp,
                kd: gains.kd,
                torque_limit: gains.limit(),
                name,
            })
        })
        .collect()
}

/// The configured base body, or the first body on a free joint.
fn resolve_base_body(model: &Model, options: &ControlOptions) -> Option<usize> {
    if let Some(name) = &options.base_body {
        let body = model.body_id(name);
        if body.is_none() {
            log::warn!("base body {name:?} not found");
        }
        return body;
    }
    (1..model.nbody).find(|&b| {
        model.body_jntadr[b].is_some_and(|j| model.jnt_type[j] == JointType::Free)
    })
}

/// Writes actuator commands before every physics step.
///
/// In [`ControlMode::Policy`] the policy runs every `decimation` steps on the
/// stacked observation history; its action becomes joint targets
/// `action · action_scale + default_angle`, and a PD law tracks those
/// targets on every step. A policy tick without a result holds the previous
/// action.
#[derive(Debug)]
pub struct ControlLoop {
    options: ControlOptions,
    mode: ControlMode,
    command: VelocityCommand,
    joints: Vec<ControlledJoint>,
    base_body: Option<usize>,
    /// Manual setpoint per actuator: a `ctrl` value in direct mode, an offset
    /// from the default angle in PD setpoint mode.
    setpoints: Vec<f64>,
    targets: Vec<f64>,
    last_action: Vec<f32>,
    history: ObservationHistory,
    steps: u64,
    policy: PolicyRunner,
    noise: ActuatorNoise,
}

impl ControlLoop {
    /// Detached loop; call [`attach`](Self::attach) once a model is loaded.
    #[must_use]
    pub fn new(options: &ControlOptions) -> Self {
        Self {
            options: options.clone(),
            mode: options.mode,
            command: options.command,
            joints: Vec::new(),
            base_body: None,
            setpoints: Vec::new(),
            targets: Vec::new(),
            last_action: Vec::new(),
            history: ObservationHistory::new(frame_len(0), options.frame_stack),
            steps: 0,
            policy: PolicyRunner::None,
            noise: ActuatorNoise::new(&options.noise, NOISE_SEED),
        }
    }

    /// Replace the options. Takes effect on the next [`attach`](Self::attach)
    /// for anything derived from the model.
    pub fn apply_options(&mut self, options: &ControlOptions) {
        self.options = options.clone();
        self.noise = ActuatorNoise::new(&options.noise, NOISE_SEED);
    }

    /// Install the policy.
    pub fn set_policy(&mut self, policy: PolicyRunner) {
        log::info!("policy attached ({policy:?})");
        self.policy = policy;
    }

    /// Whether a policy is installed.
    #[must_use]
    pub fn has_policy(&self) -> bool {
        self.policy.is_some()
    }

    /// Whether a background inference is running. While it is, policy
    /// ticks hold the previous action.
    #[must_use]
    pub fn policy_in_flight(&self) -> bool {
        self.policy.is_busy()
    }

    /// Resolve joints, gains and the base body for a freshly loaded model.
    pub fn attach(&mut self, model: &Model) {
        self.joints = controlled_joints(model, &self.options);
        self.base_body = resolve_base_body(model, &self.options);
        self.setpoints = vec![0.0; model.nu];
        log::info!(
            "control: {} joints, base body {:?}, mode {:?}",
            self.joints.len(),
            self.base_body,
            self.mode
        );
        self.reset();
    }

    /// Forget the model.
    pub fn detach(&mut self) {
        self.joints.clear();
        self.setpoints.clear();
        self.base_body = None;
        self.reset();
    }

    /// Clear history, actions and setpoints and restart the decimation
    /// counter.
    pub fn reset(&mut self) {
        self.steps = 0;
        self.last_action = vec![0.0; self.joints.len()];
        self.targets = self.joints.iter().map(|j| j.default_angle).collect();
        self.setpoints.fill(0.0);
        self.history =
            ObservationHistory::new(frame_len(self.joints.len()), self.options.frame_stack);
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    /// Switch mode.
    pub fn set_mode(&mut self, mode: ControlMode) {
        if mode != self.mode {
            log::info!("control mode {:?} -> {mode:?}", self.mode);
            self.mode = mode;
        }
    }

    /// Flip between policy and direct control. Returns the new mode.
    pub fn toggle_mode(&mut self) -> ControlMode {
        let next = if self.mode == ControlMode::Policy {
            ControlMode::Direct
        } else {
            ControlMode::Policy
        };
        self.set_mode(next);
        next
    }

    /// Commanded base velocity.
    #[must_use]
    pub fn command(&self) -> VelocityCommand {
        self.command
    }

    /// Replace the commanded base velocity.
    pub fn set_command(&mut self, command: VelocityCommand) {
        self.command = command;
    }

    /// Controlled joints, in actuator order.
    #[must_use]
    pub fn joints(&self) -> &[ControlledJoint] {
        &self.joints
    }

    /// Base body used for the observation.
    #[must_use]
    pub fn base_body(&self) -> Option<usize> {
        self.base_body
    }

    /// Most recent policy action.
    #[must_use]
    pub fn last_action(&self) -> &[f32] {
        &self.last_action
    }

    /// Current PD joint targets.
    #[must_use]
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Manual setpoints per actuator.
    #[must_use]
    pub fn setpoints(&self) -> &[f64] {
        &self.setpoints
    }

    /// Observation history fed to the policy.
    #[must_use]
    pub fn history(&self) -> &ObservationHistory {
        &self.history
    }

    /// Adjust the setpoint of every actuator whose name starts with
    /// `prefix`, clamped to its control range. Returns how many matched.
    pub fn nudge(&mut self, model: &Model, prefix: &str, delta: f64) -> usize {
        let mut matched = 0;
        for (actuator, setpoint) in self.setpoints.iter_mut().enumerate() {
            if !model.actuator_name[actuator].starts_with(prefix) {
                continue;
            }
            let mut value = *setpoint + delta;
            if let Some((lo, hi)) = model.ctrl_range(actuator) {
                value = value.clamp(lo, hi);
            }
            *setpoint = value;
            matched += 1;
        }
        if matched == 0 {
            log::debug!("no actuator matches {prefix:?}");
        }
        matched
    }

    /// Write `ctrl` for the coming physics step.
    pub fn before_step(&mut self, sim: &mut dyn Simulation) {
        match self.mode {
            ControlMode::Off => {
                sim.data_mut().ctrl.fill(0.0);
                self.steps += 1;
                return;
            }
            ControlMode::Direct => self.write_direct(sim),
            ControlMode::Policy => {
                if self.steps % u64::from(self.options.decimation.max(1)) == 0 {
                    self.policy_tick(&*sim);
                }
                self.write_pd(sim);
            }
            ControlMode::PdSetpoint => {
                for (target, joint) in self.targets.iter_mut().zip(&self.joints) {
                    *target = joint.default_angle
                        + self.setpoints.get(joint.actuator).copied().unwrap_or(0.0);
                }
                self.write_pd(sim);
            }
        }
        let dt = sim.model().opt.timestep;
        self.noise.apply(&mut sim.data_mut().ctrl, dt);
        self.steps += 1;
    }

    fn policy_tick(&mut self, sim: &dyn Simulation) {
        let frame = build_frame(
            sim,
            &self.joints,
            self.base_body,
            &self.command,
            &self.last_action,
            &self.options,
        );
        self.history.push(frame);
        let Some(action) = self.policy.tick(&self.history.flatten()) else {
            return;
        };
        if action.len() != self.joints.len() {
            log::warn!(
                "policy returned {} values for {} joints, holding previous action",
                action.len(),
                self.joints.len()
            );
            return;
        }
        let clip = self.options.clip_actions.abs() as f32;
        self.last_action = action
            .into_iter()
            .map(|a| if a.is_finite() { a.clamp(-clip, clip) } else { 0.0 })
            .collect();
        let scale = self.options.action_scale;
        for ((target, joint), a) in self
            .targets
            .iter_mut()
            .zip(&self.joints)
            .zip(&self.last_action)
        {
            *target = f64::from(*a) * scale + joint.default_angle;
        }
    }

    fn write_pd(&self, sim: &mut dyn Simulation) {
        let data = sim.data_mut();
        for (joint, &target) in self.joints.iter().zip(&self.targets) {
            data.ctrl[joint.actuator] = pd_torque(
                joint.kp,
                joint.kd,
                target,
                data.qpos[joint.qpos_adr],
                data.qvel[joint.dof_adr],
                joint.torque_limit,
            );
        }
    }

    fn write_direct(&self, sim: &mut dyn Simulation) {
        let ranges: Vec<_> = (0..self.setpoints.len())
            .map(|a| sim.model().ctrl_range(a))
            .collect();
        let ctrl = &mut sim.data_mut().ctrl;
        for ((value, &setpoint), range) in ctrl.iter_mut().zip(&self.setpoints).zip(ranges) {
            *value = range.map_or(setpoint, |(lo, hi)| setpoint.clamp(lo, hi));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::control::{FnPolicy, PolicyWorker};
    use crate::sim::{fixtures, RapierSimulation};

    fn walker() -> RapierSimulation {
        RapierSimulation::new(fixtures::walker()).unwrap()
    }

    fn attached(sim: &RapierSimulation, options: &ControlOptions) -> ControlLoop {
        let mut control = ControlLoop::new(options);
        control.attach(sim.model());
        control
    }

    #[test]
    fn resolves_joints_and_base() {
        let sim = walker();
        let control = attached(&sim, &ControlOptions::default());
        let names: Vec<_> = control.joints().iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, ["left_knee_pitch", "right_knee_pitch"]);
        assert_eq!(control.joints()[0].actuator, 0);
        assert_eq!(control.joints()[0].qpos_adr, 7);
        assert_eq!(control.joints()[1].dof_adr, 7);
        assert!((control.joints()[0].default_angle - 0.441).abs() < 1e-12);
        assert_eq!(control.base_body(), sim.model().body_id("torso"));
        assert_eq!(control.history().flatten().len(), frame_len(2) * 15);
    }

    #[test]
    fn pd_tracks_default_pose_without_policy() {
        let mut sim = walker();
        let mut control = attached(&sim, &ControlOptions::default());
        control.before_step(&mut sim);
        // q = 0, dq = 0, target 0.441, kp = 102.
        assert!((sim.data().ctrl[0] - 102.0 * 0.441).abs() < 1e-9);
        assert!((sim.data().ctrl[1] - 102.0 * 0.441).abs() < 1e-9);
    }

    #[test]
    fn policy_runs_every_decimation_steps() {
        let mut sim = walker();
        let mut control = attached(&sim, &ControlOptions::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let lengths = Arc::new(Mutex::new(Vec::new()));
        let (c, l) = (Arc::clone(&calls), Arc::clone(&lengths));
        control.set_policy(PolicyRunner::Inline(Box::new(FnPolicy(move |obs: &[f32]| {
            let _ = c.fetch_add(1, Ordering::SeqCst);
            l.lock().unwrap().push(obs.len());
            Some(vec![0.0, 0.0])
        }))));
        for _ in 0..25 {
            control.before_step(&mut sim);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(lengths.lock().unwrap().iter().all(|&n| n == 17 * 15));
    }

    #[test]
    fn action_sets_targets_and_is_held_on_none() {
        let mut sim = walker();
        let mut control = attached(
            &sim,
            &ControlOptions {
                decimation: 1,
                ..ControlOptions::default()
            },
        );
        let mut first = true;
        control.set_policy(PolicyRunner::Inline(Box::new(FnPolicy(move |_: &[f32]| {
            let out = first.then(|| vec![1.0, 100.0]);
            first = false;
            out
        }))));

        control.before_step(&mut sim);
        // Second value is clipped to 18.
        assert_eq!(control.last_action(), &[1.0, 18.0]);
        assert!((control.targets()[0] - (0.25 + 0.441)).abs() < 1e-6);
        assert!((control.targets()[1] - (18.0 * 0.25 + 0.441)).abs() < 1e-6);

        control.before_step(&mut sim);
        assert_eq!(control.last_action(), &[1.0, 18.0]);
        // Torque limit kp = 102 bounds the large target.
        assert!(sim.data().ctrl[1] <= 102.0 + 1e-9);
    }

    #[test]
    fn background_policy_holds_action_while_in_flight() {
        let mut sim = walker();
        let mut control = attached(
            &sim,
            &ControlOptions {
                decimation: 1,
                ..ControlOptions::default()
            },
        );
        let started = Arc::new(AtomicUsize::new(0));
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate = Mutex::new(gate_rx);
        let s = Arc::clone(&started);
        let worker = PolicyWorker::spawn(Box::new(FnPolicy(move |_: &[f32]| {
            let _ = s.fetch_add(1, Ordering::SeqCst);
            gate.lock().ok()?.recv().ok()?;
            Some(vec![2.0, -2.0])
        })))
        .unwrap();
        control.set_policy(PolicyRunner::Background(worker));

        let targets = control.targets().to_vec();
        for _ in 0..5 {
            control.before_step(&mut sim);
            assert!(control.policy_in_flight());
            assert_eq!(control.last_action(), &[0.0, 0.0]);
            assert_eq!(control.targets(), targets.as_slice());
        }

        gate_tx.send(()).unwrap();
        for _ in 0..500 {
            if !control.policy_in_flight() {
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        assert!(!control.policy_in_flight());
        assert_eq!(started.load(Ordering::SeqCst), 1);

        control.before_step(&mut sim);
        assert_eq!(control.last_action(), &[2.0, -2.0]);
        assert!((control.targets()[0] - (0.5 + 0.441)).abs() < 1e-6);
        assert!((control.targets()[1] - (-0.5 + 0.441)).abs() < 1e-6);

        // The worker is blocked on the next request; closing the gate lets
        // it shut down.
        drop(gate_tx);
        drop(control);
    }

    #[test]
    fn wrong_length_action_is_ignored() {
        let mut sim = walker();
        let mut control = attached(&sim, &ControlOptions::default());
        control.set_policy(PolicyRunner::Inline(Box::new(FnPolicy(|_: &[f32]| {
            Some(vec![1.0])
        }))));
        control.before_step(&mut sim);
        assert_eq!(control.last_action(), &[0.0, 0.0]);
    }

    #[test]
    fn direct_mode_writes_clamped_setpoints() {
        let mut sim = walker();
        let mut control = attached(&sim, &ControlOptions::default());
        assert_eq!(control.toggle_mode(), ControlMode::Direct);
        assert_eq!(control.nudge(sim.model(), "knee_", 1000.0), 2);
        assert_eq!(control.nudge(sim.model(), "knee_left", -50.0), 1);
        assert_eq!(control.nudge(sim.model(), "elbow", 1.0), 0);
        assert_eq!(control.setpoints(), &[100.0, 150.0]);
        control.before_step(&mut sim);
        assert_eq!(sim.data().ctrl, vec![100.0, 150.0]);
        assert_eq!(control.toggle_mode(), ControlMode::Policy);
    }

    #[test]
    fn setpoint_mode_offsets_default_pose() {
        let mut sim = walker();
        let mut control = attached(&sim, &ControlOptions::default());
        control.set_mode(ControlMode::PdSetpoint);
        let _ = control.nudge(sim.model(), "knee_left", 0.1);
        control.before_step(&mut sim);
        assert!((control.targets()[0] - 0.541).abs() < 1e-12);
        assert!((control.targets()[1] - 0.441).abs() < 1e-12);
    }

    #[test]
    fn off_mode_zeroes_ctrl() {
        let mut sim = walker();
        let mut control = attached(&sim, &ControlOptions::default());
        sim.data_mut().ctrl.fill(3.0);
        control.set_mode(ControlMode::Off);
        control.before_step(&mut sim);
        assert_eq!(sim.data().ctrl, vec![0.0, 0.0]);
    }

    #[test]
    fn observation_reflects_state() {
        let mut sim = walker();
        let mut control = attached(
            &sim,
            &ControlOptions {
                command: VelocityCommand {
                    vx: 0.5,
                    vy: 0.0,
                    dyaw: 0.0,
                },
                ..ControlOptions::default()
            },
        );
        control.before_step(&mut sim);
        let frame = control.history().latest().unwrap().to_vec();
        assert_eq!(frame.len(), 17);
        // t = 0: sin 0, cos 1.
        assert_eq!(&frame[..2], &[0.0, 1.0]);
        assert!((frame[2] - 1.0).abs() < 1e-6);
        // q − q0 for both knees.
        assert!((frame[5] + 0.441).abs() < 1e-6);
        // Upright base sees gravity straight down.
        assert!((frame[16] + 1.0).abs() < 1e-6);
    }
}
