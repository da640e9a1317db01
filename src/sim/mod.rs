//! Boundary to the physics engine.
//!
//! The rest of the crate only sees a [`Simulation`]: a loaded [`Model`], its
//! mutable [`Data`] buffers, and a handful of operations. The bundled
//! [`RapierSimulation`] implements it on top of rapier3d; anything else that
//! can fill the same buffers can be plugged in through a
//! [`SimulationLoader`].

mod builder;
mod data;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod kinematics;
mod loader;
mod model;
mod rapier;

use std::fmt;

pub use builder::{
    ActuatorSpec, BodySpec, CameraSpec, GeomSpec, JointSpec, LightSpec, MaterialSpec, MeshSpec,
    ModelBuilder, SensorSpec, SiteSpec, TendonSpec, TextureSpec,
};
pub use data::Data;
pub use loader::{FnLoader, ModelFileLoader, SimulationLoader};
pub use model::{GeomType, JointType, Model, ModelOptions, SensorType};
pub use rapier::RapierSimulation;

use kinematics::{quat_at, vec3_at};

/// Owned, type-erased simulation. Created on load, dropped wholesale on
/// reload.
pub type SimulationHandle = Box<dyn Simulation>;

/// Runtime numeric problem reported by a step. Never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationWarning {
    /// A body pose became NaN or infinite.
    NonFinite {
        /// First offending body.
        body: usize,
    },
    /// A body moved further than the engine considers plausible in one
    /// step.
    Diverged {
        /// First offending body.
        body: usize,
    },
}

impl fmt::Display for SimulationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { body } => write!(f, "non-finite pose on body {body}"),
            Self::Diverged { body } => write!(f, "body {body} diverged"),
        }
    }
}

/// A loaded model plus mutable state, driven one fixed timestep at a time.
pub trait Simulation {
    /// The immutable model.
    fn model(&self) -> &Model;

    /// Current state buffers.
    fn data(&self) -> &Data;

    /// Mutable state buffers (`ctrl`, `qpos`, `mocap_*`, `xfrc_applied`).
    fn data_mut(&mut self) -> &mut Data;

    /// Advance by exactly one `model().opt.timestep`.
    ///
    /// # Errors
    ///
    /// Returns a [`SimulationWarning`] when the new state is numerically
    /// degraded. The step itself has still happened.
    fn step(&mut self) -> Result<(), SimulationWarning>;

    /// Recompute derived quantities from `qpos` without integrating.
    fn forward(&mut self);

    /// Restore the default configuration.
    fn reset(&mut self);

    /// Load keyframe `index` into `qpos` with zero velocity. Returns `false`
    /// when the keyframe does not exist.
    fn reset_to_keyframe(&mut self, index: usize) -> bool {
        let Some(qpos) = self.model().keyframe(index).map(<[f64]>::to_vec) else {
            return false;
        };
        self.reset();
        self.data_mut().qpos.copy_from_slice(&qpos);
        self.forward();
        true
    }

    /// Accumulate a force and torque acting at world `point` on `body`, all
    /// in physics axes. The force at `point` is converted into a force and
    /// torque about the body's center of mass.
    fn apply_force(&mut self, force: [f64; 3], torque: [f64; 3], point: [f64; 3], body: usize) {
        if body == 0 || body >= self.model().nbody {
            return;
        }
        let com_local = vec3_at(&self.model().body_ipos, body);
        let data = self.data();
        let com = vec3_at(&data.xpos, body) + quat_at(&data.xquat, body) * com_local;
        let f = glam::DVec3::from_array(force);
        let t = glam::DVec3::from_array(torque) + (glam::DVec3::from_array(point) - com).cross(f);

        let frc = &mut self.data_mut().xfrc_applied[body * 6..body * 6 + 6];
        for k in 0..3 {
            frc[k] += f[k];
            frc[k + 3] += t[k];
        }
    }

    /// Zero every applied force and torque.
    fn clear_applied_forces(&mut self) {
        self.data_mut().xfrc_applied.fill(0.0);
    }
}
