//! Policy observations: one frame per control tick, stacked into a fixed
//! length history.

use std::collections::VecDeque;

use glam::DVec3;

use super::controller::ControlledJoint;
use crate::options::{ControlOptions, VelocityCommand};
use crate::sim::kinematics::{quat_at, vec3_at};
use crate::sim::Simulation;

/// Values per frame that do not depend on the joint count: phase (2),
/// command (3), base angular velocity (3), projected gravity (3).
const FIXED_FRAME_LEN: usize = 11;

/// Length of one observation frame for `joints` controlled joints.
#[must_use]
pub const fn frame_len(joints: usize) -> usize {
    FIXED_FRAME_LEN + 3 * joints
}

/// FIFO of the last `capacity` frames, oldest first. Starts filled with
/// zero frames so the flattened length never changes.
#[derive(Debug, Clone)]
pub struct ObservationHistory {
    frame_len: usize,
    capacity: usize,
    frames: VecDeque<Vec<f32>>,
}

impl ObservationHistory {
    /// History of `capacity` zero frames of `frame_len` values.
    #[must_use]
    pub fn new(frame_len: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frame_len,
            capacity,
            frames: std::iter::repeat_with(|| vec![0.0; frame_len])
                .take(capacity)
                .collect(),
        }
    }

    /// Append the newest frame, evicting the oldest. Frames of the wrong
    /// length are padded or truncated.
    pub fn push(&mut self, mut frame: Vec<f32>) {
        frame.resize(self.frame_len, 0.0);
        if self.frames.len() == self.capacity {
            let _ = self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// All frames, oldest first, as one vector.
    #[must_use]
    pub fn flatten(&self) -> Vec<f32> {
        self.frames.iter().flatten().copied().collect()
    }

    /// Newest frame.
    #[must_use]
    pub fn latest(&self) -> Option<&[f32]> {
        self.frames.back().map(Vec::as_slice)
    }

    /// Number of frames held (always the capacity).
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the history holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Refill with zero frames.
    pub fn clear(&mut self) {
        for frame in &mut self.frames {
            frame.fill(0.0);
        }
    }
}

/// Assemble one frame, in physics axes:
/// `[sin φ, cos φ, vx, vy, dyaw, q − q₀ …, dq …, last action …, ω (3), g (3)]`
/// where φ is the gait phase, ω the base angular velocity in the base frame
/// and g gravity's direction in the base frame. Every value is scaled per
/// channel and clipped to `±clip_observations`.
#[must_use]
pub fn build_frame(
    sim: &dyn Simulation,
    joints: &[ControlledJoint],
    base_body: Option<usize>,
    command: &VelocityCommand,
    last_action: &[f32],
    options: &ControlOptions,
) -> Vec<f32> {
    let data = sim.data();
    let scales = &options.obs_scales;
    let mut frame = Vec::with_capacity(frame_len(joints.len()));

    let phase = std::f64::consts::TAU * data.time / options.phase_period.max(1e-6);
    frame.extend([phase.sin(), phase.cos()]);
    frame.extend([
        command.vx * scales.lin_vel,
        command.vy * scales.lin_vel,
        command.dyaw * scales.ang_vel,
    ]);
    frame.extend(
        joints
            .iter()
            .map(|j| (data.qpos[j.qpos_adr] - j.default_angle) * scales.dof_pos),
    );
    frame.extend(joints.iter().map(|j| data.qvel[j.dof_adr] * scales.dof_vel));
    frame.extend(
        (0..joints.len()).map(|i| f64::from(last_action.get(i).copied().unwrap_or(0.0))),
    );

    let (omega, gravity) = base_body.map_or((DVec3::ZERO, DVec3::NEG_Z), |body| {
        let inv = quat_at(&data.xquat, body).inverse();
        (inv * vec3_at(&data.xangvel, body), inv * DVec3::NEG_Z)
    });
    frame.extend((omega * scales.ang_vel).to_array());
    frame.extend(gravity.to_array());

    let clip = options.clip_observations.abs();
    frame
        .into_iter()
        .map(|v| if v.is_finite() { v.clamp(-clip, clip) as f32 } else { 0.0 })
        .collect()
}
