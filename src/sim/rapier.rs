//! [`Simulation`] implementation backed by rapier3d.
//!
//! Every body of the model becomes one rapier rigid body: bodies welded to
//! the world are fixed, mocap bodies are kinematic, everything else is
//! dynamic and connected to its parent by an impulse joint (or welded with a
//! fixed joint when the body has none). Joint coordinates are recovered from
//! the relative body poses after each step.

use std::f64::consts::{FRAC_PI_2, TAU};

use glam::{DQuat, DVec3};
use nalgebra::{Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3};
use rapier3d::dynamics::{
    CCDSolver, GenericJoint, GenericJointBuilder, ImpulseJointSet, IntegrationParameters,
    IslandManager, JointAxesMask, JointAxis, MultibodyJointSet, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet, RigidBodyType,
};
use rapier3d::geometry::{BroadPhaseMultiSap, ColliderBuilder, ColliderSet, NarrowPhase};
use rapier3d::pipeline::PhysicsPipeline;
use rapier3d::prelude::MassProperties;

use super::data::Data;
use super::kinematics::{
    forward_kinematics, joint_frame, quat_at, set_quat, set_vec3, update_derived, vec3_at,
};
use super::model::{GeomType, JointType, Model};
use super::{Simulation, SimulationWarning};
use crate::error::SimviewError;

/// Linear speed above which a body is reported as diverged.
const DIVERGENCE_SPEED: f64 = 1.0e6;

/// Rigid-body simulation of a [`Model`] using rapier3d.
pub struct RapierSimulation {
    model: Model,
    data: Data,

    pipeline: PhysicsPipeline,
    gravity: Vector3<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,

    body_handles: Vec<RigidBodyHandle>,
    body_kind: Vec<RigidBodyType>,
}

impl RapierSimulation {
    /// Build the rapier world for `model` at its default configuration.
    ///
    /// # Errors
    ///
    /// Returns the [`Model::validate`] error for an inconsistent model.
    pub fn new(model: Model) -> Result<Self, SimviewError> {
        model.validate()?;
        let mut data = Data::new(&model);
        forward_kinematics(&model, &mut data);

        let [gx, gy, gz] = model.opt.gravity;
        let mut integration_params = IntegrationParameters::default();
        integration_params.dt = model.opt.timestep as f32;

        let mut sim = Self {
            data,
            pipeline: PhysicsPipeline::new(),
            gravity: Vector3::new(gx as f32, gy as f32, gz as f32),
            integration_params,
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            body_handles: Vec::with_capacity(model.nbody),
            body_kind: Vec::with_capacity(model.nbody),
            model,
        };
        sim.create_bodies();
        sim.create_joints();
        sim.create_colliders();
        update_derived(&sim.model, &mut sim.data);

        log::info!(
            "rapier simulation ready: {} bodies ({} dynamic), {} colliders, {} joints",
            sim.model.nbody,
            sim.body_kind
                .iter()
                .filter(|k| **k == RigidBodyType::Dynamic)
                .count(),
            sim.colliders.len(),
            sim.impulse_joints.len()
        );
        Ok(sim)
    }

    /// Mass of a body as seen by the solver.
    #[must_use]
    pub fn body_mass(&self, body: usize) -> Option<f64> {
        let handle = *self.body_handles.get(body)?;
        self.bodies.get(handle).map(|rb| f64::from(rb.mass()))
    }

    fn create_bodies(&mut self) {
        let m = &self.model;
        for b in 0..m.nbody {
            let kind = if b == 0 || m.is_static_body(b) {
                RigidBodyType::Fixed
            } else if m.body_mocapid[b].is_some() {
                RigidBodyType::KinematicPositionBased
            } else {
                RigidBodyType::Dynamic
            };
            let pose = isometry(vec3_at(&self.data.xpos, b), quat_at(&self.data.xquat, b));
            let mut builder = RigidBodyBuilder::new(kind).position(pose).can_sleep(false);
            if kind == RigidBodyType::Dynamic {
                let com = vec3_at(&m.body_ipos, b);
                let inertia = vec3_at(&m.body_inertia, b);
                builder = builder.additional_mass_properties(MassProperties::new(
                    Point3::new(com.x as f32, com.y as f32, com.z as f32),
                    m.body_mass[b] as f32,
                    Vector3::new(inertia.x as f32, inertia.y as f32, inertia.z as f32),
                ));
            }
            self.body_handles.push(self.bodies.insert(builder.build()));
            self.body_kind.push(kind);
        }
    }

    fn create_joints(&mut self) {
        for b in 1..self.model.nbody {
            if self.body_kind[b] != RigidBodyType::Dynamic {
                continue;
            }
            let Some(joint) = joint_for(&self.model, b) else {
                continue;
            };
            let parent = self.body_handles[self.model.body_parentid[b]];
            let _ = self
                .impulse_joints
                .insert(parent, self.body_handles[b], joint, true);
        }
    }

    fn create_colliders(&mut self) {
        for g in 0..self.model.ngeom {
            let Some(builder) = collider_for(&self.model, g) else {
                continue;
            };
            let handle = self.body_handles[self.model.geom_bodyid[g]];
            let _ = self
                .colliders
                .insert_with_parent(builder.build(), handle, &mut self.bodies);
        }
    }

    /// Push `xfrc_applied`, actuator torques and mocap targets into rapier.
    fn apply_inputs(&mut self) {
        let m = &self.model;
        let d = &self.data;

        for b in 1..m.nbody {
            if self.body_kind[b] != RigidBodyType::Dynamic {
                continue;
            }
            if let Some(rb) = self.bodies.get_mut(self.body_handles[b]) {
                rb.reset_forces(false);
                rb.reset_torques(false);
                let frc = &d.xfrc_applied[b * 6..b * 6 + 6];
                if frc.iter().any(|v| *v != 0.0) {
                    rb.add_force(vector(DVec3::new(frc[0], frc[1], frc[2])), true);
                    rb.add_torque(vector(DVec3::new(frc[3], frc[4], frc[5])), true);
                }
            }
        }

        for u in 0..m.nu {
            let j = m.actuator_trnid[u];
            let b = m.jnt_bodyid[j];
            if self.body_kind[b] != RigidBodyType::Dynamic {
                continue;
            }
            let mut ctrl = d.ctrl[u];
            if let Some((lo, hi)) = m.ctrl_range(u) {
                ctrl = ctrl.clamp(lo, hi);
            }
            let effort = m.actuator_gear[u] * ctrl;
            if effort == 0.0 || !effort.is_finite() {
                continue;
            }
            let axis = quat_at(&d.xquat, b) * vec3_at(&m.jnt_axis, j);
            let parent = m.body_parentid[b];
            let rotational = m.jnt_type[j] == JointType::Hinge;
            for (body, sign) in [(b, 1.0), (parent, -1.0)] {
                if self.body_kind[body] != RigidBodyType::Dynamic {
                    continue;
                }
                if let Some(rb) = self.bodies.get_mut(self.body_handles[body]) {
                    let v = vector(axis * (effort * sign));
                    if rotational {
                        rb.add_torque(v, true);
                    } else {
                        rb.add_force(v, true);
                    }
                }
            }
        }

        for b in 1..m.nbody {
            if let Some(mocap) = m.body_mocapid[b] {
                if let Some(rb) = self.bodies.get_mut(self.body_handles[b]) {
                    rb.set_next_kinematic_position(isometry(
                        vec3_at(&d.mocap_pos, mocap),
                        quat_at(&d.mocap_quat, mocap).normalize(),
                    ));
                }
            }
        }
    }

    /// Pull body poses and velocities out of rapier and recover joint
    /// coordinates from them.
    fn extract_state(&mut self) {
        for b in 1..self.model.nbody {
            if self.body_kind[b] == RigidBodyType::Fixed {
                continue;
            }
            let Some(rb) = self.bodies.get(self.body_handles[b]) else {
                continue;
            };
            let pose = rb.position();
            set_vec3(&mut self.data.xpos, b, point_to_dvec(&pose.translation.vector));
            let q = &pose.rotation;
            let quat = DQuat::from_xyzw(
                f64::from(q.i),
                f64::from(q.j),
                f64::from(q.k),
                f64::from(q.w),
            );
            set_quat(&mut self.data.xquat, b, quat);
            set_vec3(&mut self.data.xlinvel, b, point_to_dvec(rb.linvel()));
            set_vec3(&mut self.data.xangvel, b, point_to_dvec(rb.angvel()));
        }

        for j in 0..self.model.njnt {
            self.extract_joint(j);
        }
    }

    fn extract_joint(&mut self, j: usize) {
        let m = &self.model;
        let d = &mut self.data;
        let b = m.jnt_bodyid[j];
        let parent = m.body_parentid[b];
        let adr = m.jnt_qposadr[j];
        let dof = m.jnt_dofadr[j];
        let axis = vec3_at(&m.jnt_axis, j);
        let pos = vec3_at(&d.xpos, b);
        let quat = quat_at(&d.xquat, b);
        let omega = vec3_at(&d.xangvel, b);
        let omega_parent = vec3_at(&d.xangvel, parent);

        match m.jnt_type[j] {
            JointType::Free => {
                d.qpos[adr..adr + 3].copy_from_slice(&pos.to_array());
                d.qpos[adr + 3..adr + 7].copy_from_slice(&[quat.w, quat.x, quat.y, quat.z]);
                let v = point_velocity(m, d, b, pos);
                d.qvel[dof..dof + 3].copy_from_slice(&v.to_array());
                d.qvel[dof + 3..dof + 6].copy_from_slice(&(quat.inverse() * omega).to_array());
            }
            JointType::Ball => {
                let (_, q0) = joint_frame(m, d, b);
                let rel = (q0.inverse() * quat).normalize();
                d.qpos[adr..adr + 4].copy_from_slice(&[rel.w, rel.x, rel.y, rel.z]);
                let local = quat.inverse() * (omega - omega_parent);
                d.qvel[dof..dof + 3].copy_from_slice(&local.to_array());
            }
            JointType::Hinge => {
                let (_, q0) = joint_frame(m, d, b);
                let rel = q0.inverse() * quat;
                let angle = 2.0 * DVec3::new(rel.x, rel.y, rel.z).dot(axis).atan2(rel.w);
                // Keep the angle continuous across the +-pi seam.
                let prev = d.qpos[adr];
                d.qpos[adr] = angle + TAU * ((prev - angle) / TAU).round();
                d.qvel[dof] = (omega - omega_parent).dot(quat * axis);
            }
            JointType::Slide => {
                let (x0, q0) = joint_frame(m, d, b);
                let axis_world = q0 * axis;
                d.qpos[adr] = (pos - x0).dot(axis_world);
                let rel = point_velocity(m, d, b, pos) - point_velocity(m, d, parent, pos);
                d.qvel[dof] = rel.dot(axis_world);
            }
        }
    }

    /// Propagate `qvel` down the tree into world body velocities.
    fn velocity_kinematics(&mut self) {
        let m = &self.model;
        let d = &mut self.data;
        set_vec3(&mut d.xlinvel, 0, DVec3::ZERO);
        set_vec3(&mut d.xangvel, 0, DVec3::ZERO);

        for b in 1..m.nbody {
            let parent = m.body_parentid[b];
            let pos = vec3_at(&d.xpos, b);
            let quat = quat_at(&d.xquat, b);
            let (mut omega, mut v_origin) = if m.body_mocapid[b].is_some() {
                (DVec3::ZERO, DVec3::ZERO)
            } else {
                (vec3_at(&d.xangvel, parent), point_velocity(m, d, parent, pos))
            };
            if let Some(j) = m.body_jntadr[b] {
                let dof = m.jnt_dofadr[j];
                let axis = vec3_at(&m.jnt_axis, j);
                match m.jnt_type[j] {
                    JointType::Free => {
                        v_origin = DVec3::new(d.qvel[dof], d.qvel[dof + 1], d.qvel[dof + 2]);
                        omega = quat
                            * DVec3::new(d.qvel[dof + 3], d.qvel[dof + 4], d.qvel[dof + 5]);
                    }
                    JointType::Ball => {
                        let local = DVec3::new(d.qvel[dof], d.qvel[dof + 1], d.qvel[dof + 2]);
                        let w = quat * local;
                        let anchor = pos + quat * vec3_at(&m.jnt_pos, j);
                        v_origin += w.cross(pos - anchor);
                        omega += w;
                    }
                    JointType::Hinge => {
                        let w = quat * axis * d.qvel[dof];
                        let anchor = pos + quat * vec3_at(&m.jnt_pos, j);
                        v_origin += w.cross(pos - anchor);
                        omega += w;
                    }
                    JointType::Slide => v_origin += quat * axis * d.qvel[dof],
                }
            }
            let com = pos + quat * vec3_at(&m.body_ipos, b);
            set_vec3(&mut d.xangvel, b, omega);
            set_vec3(&mut d.xlinvel, b, v_origin + omega.cross(com - pos));
        }
    }

    /// Write the current `xpos`/`xquat` and velocities into rapier.
    fn push_state(&mut self) {
        for b in 1..self.model.nbody {
            let kind = self.body_kind[b];
            if kind == RigidBodyType::Fixed {
                continue;
            }
            let pose = isometry(vec3_at(&self.data.xpos, b), quat_at(&self.data.xquat, b));
            let linvel = vector(vec3_at(&self.data.xlinvel, b));
            let angvel = vector(vec3_at(&self.data.xangvel, b));
            if let Some(rb) = self.bodies.get_mut(self.body_handles[b]) {
                rb.set_position(pose, true);
                if kind == RigidBodyType::Dynamic {
                    rb.set_linvel(linvel, true);
                    rb.set_angvel(angvel, true);
                } else {
                    rb.set_next_kinematic_position(pose);
                }
            }
        }
    }

    fn check_state(&self) -> Result<(), SimulationWarning> {
        if let Some(body) = self.data.first_non_finite_body() {
            return Err(SimulationWarning::NonFinite { body });
        }
        let diverged = (1..self.model.nbody)
            .find(|&b| vec3_at(&self.data.xlinvel, b).length() > DIVERGENCE_SPEED);
        match diverged {
            Some(body) => Err(SimulationWarning::Diverged { body }),
            None => Ok(()),
        }
    }
}

impl Simulation for RapierSimulation {
    fn model(&self) -> &Model {
        &self.model
    }

    fn data(&self) -> &Data {
        &self.data
    }

    fn data_mut(&mut self) -> &mut Data {
        &mut self.data
    }

    fn step(&mut self) -> Result<(), SimulationWarning> {
        self.apply_inputs();
        self.integration_params.dt = self.model.opt.timestep as f32;
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        self.data.time += self.model.opt.timestep;
        self.extract_state();
        update_derived(&self.model, &mut self.data);
        self.check_state()
    }

    fn forward(&mut self) {
        forward_kinematics(&self.model, &mut self.data);
        self.velocity_kinematics();
        self.push_state();
        update_derived(&self.model, &mut self.data);
    }

    fn reset(&mut self) {
        self.data.reset(&self.model);
        self.forward();
    }
}

/// Velocity of a material point of `body` located at world `point`.
fn point_velocity(model: &Model, data: &Data, body: usize, point: DVec3) -> DVec3 {
    if body == 0 {
        return DVec3::ZERO;
    }
    let com = vec3_at(&data.xpos, body) + quat_at(&data.xquat, body) * vec3_at(&model.body_ipos, body);
    vec3_at(&data.xlinvel, body) + vec3_at(&data.xangvel, body).cross(point - com)
}

/// Joint tying body `b` to its parent, or `None` for free bodies.
fn joint_for(model: &Model, b: usize) -> Option<GenericJoint> {
    let body_pos = vec3_at(&model.body_pos, b);
    let body_quat = quat_at(&model.body_quat, b);
    let Some(j) = model.body_jntadr[b] else {
        return Some(
            GenericJointBuilder::new(JointAxesMask::LOCKED_FIXED_AXES)
                .local_frame1(isometry(body_pos, body_quat))
                .local_frame2(Isometry3::identity())
                .contacts_enabled(false)
                .build(),
        );
    };

    let (mask, limited_axis) = match model.jnt_type[j] {
        JointType::Free => return None,
        JointType::Ball => (JointAxesMask::LOCKED_SPHERICAL_AXES, None),
        JointType::Hinge => (JointAxesMask::LOCKED_REVOLUTE_AXES, Some(JointAxis::AngX)),
        JointType::Slide => (JointAxesMask::LOCKED_PRISMATIC_AXES, Some(JointAxis::LinX)),
    };
    let anchor = vec3_at(&model.jnt_pos, j);
    let align = DQuat::from_rotation_arc(DVec3::X, vec3_at(&model.jnt_axis, j));
    let mut builder = GenericJointBuilder::new(mask)
        .local_frame1(isometry(body_pos + body_quat * anchor, body_quat * align))
        .local_frame2(isometry(anchor, align))
        .contacts_enabled(false);
    if let (Some(axis), true) = (limited_axis, model.jnt_limited[j]) {
        builder = builder.limits(
            axis,
            [model.jnt_range[j * 2] as f32, model.jnt_range[j * 2 + 1] as f32],
        );
    }
    Some(builder.build())
}

/// Collision shape for geom `g`, or `None` when the geom has no collider.
fn collider_for(model: &Model, g: usize) -> Option<ColliderBuilder> {
    let s = vec3_at(&model.geom_size, g);
    let (r, h) = (s.x as f32, s.y as f32);
    let mut local = quat_at(&model.geom_quat, g);
    let builder = match model.geom_type[g] {
        GeomType::HeightField => return None,
        GeomType::Plane => ColliderBuilder::halfspace(Vector3::z_axis()),
        GeomType::Sphere => ColliderBuilder::ball(r),
        GeomType::Capsule => ColliderBuilder::capsule_z(h, r),
        // Approximated by a sphere of the mean semi-axis.
        GeomType::Ellipsoid => ColliderBuilder::ball(((s.x + s.y + s.z) / 3.0) as f32),
        GeomType::Cylinder => {
            // rapier cylinders run along Y.
            local *= DQuat::from_rotation_x(FRAC_PI_2);
            ColliderBuilder::cylinder(h, r)
        }
        GeomType::Box => ColliderBuilder::cuboid(r, h, s.z as f32),
        GeomType::Mesh => {
            let mesh = model.geom_dataid[g].filter(|&id| id < model.nmesh)?;
            let start = model.mesh_vertadr[mesh] * 3;
            let end = start + model.mesh_vertnum[mesh] * 3;
            let points: Vec<Point3<f32>> = model.mesh_vert[start..end]
                .chunks_exact(3)
                .map(|p| Point3::new(p[0], p[1], p[2]))
                .collect();
            ColliderBuilder::convex_hull(&points)?
        }
    };
    Some(
        builder
            .position(isometry(vec3_at(&model.geom_pos, g), local))
            .density(0.0)
            .friction(1.0),
    )
}

fn isometry(pos: DVec3, quat: DQuat) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::new(pos.x as f32, pos.y as f32, pos.z as f32),
        UnitQuaternion::from_quaternion(Quaternion::new(
            quat.w as f32,
            quat.x as f32,
            quat.y as f32,
            quat.z as f32,
        )),
    )
}

fn vector(v: DVec3) -> Vector3<f32> {
    Vector3::new(v.x as f32, v.y as f32, v.z as f32)
}

fn point_to_dvec(v: &Vector3<f32>) -> DVec3 {
    DVec3::new(f64::from(v.x), f64::from(v.y), f64::from(v.z))
}
