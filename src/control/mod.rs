//! Control loop: observation assembly, policy inference and PD tracking.
//!
//! [`ControlLoop::before_step`] runs ahead of every physics step and is the
//! only writer of `ctrl`.

mod controller;
mod noise;
pub mod observation;
mod pd;
mod policy;

pub use controller::{controlled_joints, ControlLoop, ControlledJoint};
pub use noise::ActuatorNoise;
pub use observation::ObservationHistory;
pub use pd::pd_torque;
pub use policy::{FnPolicy, Policy, PolicyResult, PolicyRunner, PolicyWorker};
