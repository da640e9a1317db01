//! Forward kinematics and derived quantities computed from `qpos`.
//!
//! These are engine-independent: any [`super::Simulation`] can use them to
//! implement `forward()`, and the bundled rapier adapter uses
//! [`update_derived`] after every step.

use glam::{DQuat, DVec3};

use super::data::Data;
use super::model::{JointType, Model, SensorType};

/// Read a packed 3-vector.
#[inline]
#[must_use]
pub fn vec3_at(buffer: &[f64], index: usize) -> DVec3 {
    let i = index * 3;
    DVec3::new(buffer[i], buffer[i + 1], buffer[i + 2])
}

/// Read a packed scalar-first quaternion.
#[inline]
#[must_use]
pub fn quat_at(buffer: &[f64], index: usize) -> DQuat {
    let i = index * 4;
    DQuat::from_xyzw(buffer[i + 1], buffer[i + 2], buffer[i + 3], buffer[i])
}

/// Write a packed 3-vector.
#[inline]
pub fn set_vec3(buffer: &mut [f64], index: usize, v: DVec3) {
    buffer[index * 3..index * 3 + 3].copy_from_slice(&v.to_array());
}

/// Write a packed scalar-first quaternion.
#[inline]
pub fn set_quat(buffer: &mut [f64], index: usize, q: DQuat) {
    let i = index * 4;
    buffer[i] = q.w;
    buffer[i + 1] = q.x;
    buffer[i + 2] = q.y;
    buffer[i + 3] = q.z;
}

/// Read a quaternion stored at an arbitrary `qpos` offset.
#[inline]
#[must_use]
pub fn quat_at_offset(buffer: &[f64], adr: usize) -> DQuat {
    DQuat::from_xyzw(buffer[adr + 1], buffer[adr + 2], buffer[adr + 3], buffer[adr])
        .normalize()
}

/// World pose of `body`'s frame before its joint is applied: the parent's
/// world pose composed with the body's fixed offset.
#[must_use]
pub fn joint_frame(model: &Model, data: &Data, body: usize) -> (DVec3, DQuat) {
    let parent = model.body_parentid[body];
    let (ppos, pquat) = if body == 0 {
        (DVec3::ZERO, DQuat::IDENTITY)
    } else {
        (vec3_at(&data.xpos, parent), quat_at(&data.xquat, parent))
    };
    let pos = ppos + pquat * vec3_at(&model.body_pos, body);
    let quat = (pquat * quat_at(&model.body_quat, body)).normalize();
    (pos, quat)
}

/// Compute body world poses from `qpos` (and `mocap_*` for mocap bodies).
pub fn forward_kinematics(model: &Model, data: &mut Data) {
    set_vec3(&mut data.xpos, 0, DVec3::ZERO);
    set_quat(&mut data.xquat, 0, DQuat::IDENTITY);

    for b in 1..model.nbody {
        if let Some(m) = model.body_mocapid[b] {
            let pos = vec3_at(&data.mocap_pos, m);
            let quat = quat_at(&data.mocap_quat, m).normalize();
            set_vec3(&mut data.xpos, b, pos);
            set_quat(&mut data.xquat, b, quat);
            continue;
        }

        let (x0, q0) = joint_frame(model, data, b);
        let (pos, quat) = match model.body_jntadr[b] {
            None => (x0, q0),
            Some(j) => {
                let adr = model.jnt_qposadr[j];
                let anchor_local = vec3_at(&model.jnt_pos, j);
                match model.jnt_type[j] {
                    JointType::Free => (
                        DVec3::new(data.qpos[adr], data.qpos[adr + 1], data.qpos[adr + 2]),
                        quat_at_offset(&data.qpos, adr + 3),
                    ),
                    JointType::Ball => {
                        let quat = (q0 * quat_at_offset(&data.qpos, adr)).normalize();
                        let anchor = x0 + q0 * anchor_local;
                        (anchor - quat * anchor_local, quat)
                    }
                    JointType::Hinge => {
                        let axis = q0 * vec3_at(&model.jnt_axis, j);
                        let quat = (DQuat::from_axis_angle(axis, data.qpos[adr]) * q0).normalize();
                        let anchor = x0 + q0 * anchor_local;
                        (anchor - quat * anchor_local, quat)
                    }
                    JointType::Slide => {
                        let axis = q0 * vec3_at(&model.jnt_axis, j);
                        (x0 + axis * data.qpos[adr], q0)
                    }
                }
            }
        };
        set_vec3(&mut data.xpos, b, pos);
        set_quat(&mut data.xquat, b, quat);
    }
}

/// Recompute everything that depends only on body poses and velocities:
/// sites, lights, cameras, tendon wrap points, and sensors.
pub fn update_derived(model: &Model, data: &mut Data) {
    for s in 0..model.nsite {
        let b = model.site_bodyid[s];
        let p = vec3_at(&data.xpos, b) + quat_at(&data.xquat, b) * vec3_at(&model.site_pos, s);
        set_vec3(&mut data.site_xpos, s, p);
    }

    for l in 0..model.nlight {
        let b = model.light_bodyid[l];
        let q = quat_at(&data.xquat, b);
        let p = vec3_at(&data.xpos, b) + q * vec3_at(&model.light_pos, l);
        set_vec3(&mut data.light_xpos, l, p);
        set_vec3(&mut data.light_xdir, l, q * vec3_at(&model.light_dir, l));
    }

    for c in 0..model.ncam {
        let b = model.cam_bodyid[c];
        let q = quat_at(&data.xquat, b);
        let p = vec3_at(&data.xpos, b) + q * vec3_at(&model.cam_pos, c);
        set_vec3(&mut data.cam_xpos, c, p);
        set_vec3(&mut data.cam_xdir, c, q * vec3_at(&model.cam_dir, c));
    }

    for w in 0..model.nwrap {
        let p = vec3_at(&data.site_xpos, model.wrap_objid[w]);
        set_vec3(&mut data.wrap_xpos, w, p);
    }
    data.ten_wrapadr.copy_from_slice(&model.tendon_adr);
    data.ten_wrapnum.copy_from_slice(&model.tendon_num);

    update_sensors(model, data);
}

fn update_sensors(model: &Model, data: &mut Data) {
    for s in 0..model.nsensor {
        let adr = model.sensor_adr[s];
        let obj = model.sensor_objid[s];
        match model.sensor_type[s] {
            SensorType::JointPos => data.sensordata[adr] = data.qpos[model.jnt_qposadr[obj]],
            SensorType::JointVel => data.sensordata[adr] = data.qvel[model.jnt_dofadr[obj]],
            SensorType::FrameQuat => {
                let q = quat_at(&data.xquat, obj);
                data.sensordata[adr..adr + 4].copy_from_slice(&[q.w, q.x, q.y, q.z]);
            }
            SensorType::FramePos => {
                let p = vec3_at(&data.xpos, obj);
                data.sensordata[adr..adr + 3].copy_from_slice(&p.to_array());
            }
            SensorType::Gyro => {
                let local = quat_at(&data.xquat, obj).inverse() * vec3_at(&data.xangvel, obj);
                data.sensordata[adr..adr + 3].copy_from_slice(&local.to_array());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use super::*;
    use crate::sim::builder::{BodySpec, JointSpec, ModelBuilder, SiteSpec};

    fn arm() -> Model {
        let mut b = ModelBuilder::new();
        let upper = b.add_body(BodySpec {
            pos: [0.0, 0.0, 1.0],
            ..BodySpec::default()
        });
        let _ = b.add_joint(JointSpec {
            body: upper,
            kind: JointType::Hinge,
            axis: [0.0, 0.0, 1.0],
            ..JointSpec::default()
        });
        let fore = b.add_body(BodySpec {
            parent: upper,
            pos: [1.0, 0.0, 0.0],
            ..BodySpec::default()
        });
        let _ = b.add_joint(JointSpec {
            body: fore,
            kind: JointType::Slide,
            axis: [1.0, 0.0, 0.0],
            ..JointSpec::default()
        });
        let _ = b.add_site(SiteSpec {
            body: fore,
            pos: [0.5, 0.0, 0.0],
            ..SiteSpec::default()
        });
        b.build().unwrap()
    }

    #[test]
    fn hinge_rotates_children() {
        let model = arm();
        let mut data = Data::new(&model);
        data.qpos[0] = FRAC_PI_2;
        data.qpos[1] = 0.25;
        forward_kinematics(&model, &mut data);
        update_derived(&model, &mut data);

        let fore = vec3_at(&data.xpos, 2);
        assert!((fore - DVec3::new(0.0, 1.25, 1.0)).length() < 1e-9);
        let site = vec3_at(&data.site_xpos, 0);
        assert!((site - DVec3::new(0.0, 1.75, 1.0)).length() < 1e-9);
    }

    #[test]
    fn default_pose_matches_body_offsets() {
        let model = arm();
        let mut data = Data::new(&model);
        forward_kinematics(&model, &mut data);
        assert!((vec3_at(&data.xpos, 1) - DVec3::new(0.0, 0.0, 1.0)).length() < 1e-12);
        assert!((vec3_at(&data.xpos, 2) - DVec3::new(1.0, 0.0, 1.0)).length() < 1e-12);
    }
}
