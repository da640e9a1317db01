//! Mutable simulation state buffers.

use super::model::Model;

/// Per-step state of a simulation, sized from a [`Model`].
///
/// Buffers are flat and addressed by the same ids as the model; vector
/// quantities are packed 3 per entity, quaternions 4 per entity
/// (scalar-first).
#[derive(Debug, Clone, Default)]
pub struct Data {
    /// Simulated time in seconds.
    pub time: f64,
    /// Joint positions.
    pub qpos: Vec<f64>,
    /// Joint velocities.
    pub qvel: Vec<f64>,
    /// Actuator commands.
    pub ctrl: Vec<f64>,
    /// Body frame world positions.
    pub xpos: Vec<f64>,
    /// Body frame world orientations.
    pub xquat: Vec<f64>,
    /// Body linear velocity at the center of mass, world axes.
    pub xlinvel: Vec<f64>,
    /// Body angular velocity, world axes.
    pub xangvel: Vec<f64>,
    /// Applied force and torque per body, 6 per body, acting at the center
    /// of mass. Cleared only explicitly.
    pub xfrc_applied: Vec<f64>,
    /// Mocap body target positions.
    pub mocap_pos: Vec<f64>,
    /// Mocap body target orientations.
    pub mocap_quat: Vec<f64>,
    /// Sensor outputs.
    pub sensordata: Vec<f64>,
    /// Site world positions.
    pub site_xpos: Vec<f64>,
    /// Light world positions.
    pub light_xpos: Vec<f64>,
    /// Light world directions.
    pub light_xdir: Vec<f64>,
    /// Camera world positions.
    pub cam_xpos: Vec<f64>,
    /// Camera world viewing directions.
    pub cam_xdir: Vec<f64>,
    /// First valid wrap point of each tendon this step.
    pub ten_wrapadr: Vec<usize>,
    /// Number of wrap points of each tendon this step.
    pub ten_wrapnum: Vec<usize>,
    /// Wrap point world positions.
    pub wrap_xpos: Vec<f64>,
}

impl Data {
    /// State buffers for `model` at its default configuration. Derived
    /// quantities are zero until the first `forward()`.
    #[must_use]
    pub fn new(model: &Model) -> Self {
        let mut xquat = vec![0.0; model.nbody * 4];
        for q in xquat.chunks_exact_mut(4) {
            q[0] = 1.0;
        }
        let mut mocap_pos = vec![0.0; model.nmocap * 3];
        let mut mocap_quat = vec![0.0; model.nmocap * 4];
        for b in 0..model.nbody {
            if let Some(m) = model.body_mocapid[b] {
                mocap_pos[m * 3..m * 3 + 3].copy_from_slice(&model.body_pos[b * 3..b * 3 + 3]);
                mocap_quat[m * 4..m * 4 + 4].copy_from_slice(&model.body_quat[b * 4..b * 4 + 4]);
            }
        }
        Self {
            time: 0.0,
            qpos: model.qpos0.clone(),
            qvel: vec![0.0; model.nv],
            ctrl: vec![0.0; model.nu],
            xpos: vec![0.0; model.nbody * 3],
            xquat,
            xlinvel: vec![0.0; model.nbody * 3],
            xangvel: vec![0.0; model.nbody * 3],
            xfrc_applied: vec![0.0; model.nbody * 6],
            mocap_pos,
            mocap_quat,
            sensordata: vec![0.0; model.nsensordata],
            site_xpos: vec![0.0; model.nsite * 3],
            light_xpos: vec![0.0; model.nlight * 3],
            light_xdir: vec![0.0; model.nlight * 3],
            cam_xpos: vec![0.0; model.ncam * 3],
            cam_xdir: vec![0.0; model.ncam * 3],
            ten_wrapadr: model.tendon_adr.clone(),
            ten_wrapnum: model.tendon_num.clone(),
            wrap_xpos: vec![0.0; model.nwrap * 3],
        }
    }

    /// Restore the default configuration: `qpos0`, zero velocities, zero
    /// controls and applied forces, time zero. Derived quantities need a
    /// subsequent `forward()`.
    pub fn reset(&mut self, model: &Model) {
        *self = Self::new(model);
    }

    /// Whether body poses contain any non-finite value.
    #[must_use]
    pub fn first_non_finite_body(&self) -> Option<usize> {
        let nbody = self.xpos.len() / 3;
        (0..nbody).find(|&b| {
            self.xpos[b * 3..b * 3 + 3].iter().any(|v| !v.is_finite())
                || self.xquat[b * 4..b * 4 + 4].iter().any(|v| !v.is_finite())
        })
    }
}
