//! Immutable description of a loaded simulation model.
//!
//! All per-entity attributes are stored as flat structure-of-arrays buffers
//! indexed by small integer ids. Vector attributes are packed (3 values per
//! entity for positions, 4 for scalar-first quaternions) so they can be read
//! with [`crate::coords`] directly.

use serde::{Deserialize, Serialize};

use crate::error::SimviewError;

/// Joint kinds understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointType {
    /// Six degrees of freedom; `qpos` holds an absolute position and
    /// quaternion.
    Free,
    /// Three rotational degrees of freedom; `qpos` holds a quaternion.
    Ball,
    /// One translational degree of freedom along the joint axis.
    Slide,
    /// One rotational degree of freedom about the joint axis.
    Hinge,
}

impl JointType {
    /// Number of `qpos` entries this joint occupies.
    #[must_use]
    pub const fn nq(self) -> usize {
        match self {
            Self::Free => 7,
            Self::Ball => 4,
            Self::Slide | Self::Hinge => 1,
        }
    }

    /// Number of `qvel` entries this joint occupies.
    #[must_use]
    pub const fn nv(self) -> usize {
        match self {
            Self::Free => 6,
            Self::Ball => 3,
            Self::Slide | Self::Hinge => 1,
        }
    }
}

/// Visual/collision shape type of a geom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeomType {
    /// Infinite ground plane (rendered as a large finite quad).
    Plane,
    /// Height field; not visualised.
    HeightField,
    /// Sphere, `size[0]` is the radius.
    Sphere,
    /// Capsule along local Z, `size = [radius, half_length, _]`.
    Capsule,
    /// Ellipsoid with semi-axes `size`.
    Ellipsoid,
    /// Cylinder along local Z, `size = [radius, half_length, _]`.
    Cylinder,
    /// Box with half extents `size`.
    Box,
    /// Imported triangle mesh referenced by `geom_dataid`.
    Mesh,
}

/// Sensor kinds written into `sensordata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    /// Scalar joint position of a hinge or slide joint.
    JointPos,
    /// Scalar joint velocity of a hinge or slide joint.
    JointVel,
    /// World orientation of a body, scalar-first quaternion.
    FrameQuat,
    /// World position of a body.
    FramePos,
    /// Angular velocity of a body expressed in its local frame.
    Gyro,
}

impl SensorType {
    /// Number of `sensordata` entries this sensor writes.
    #[must_use]
    pub const fn dim(self) -> usize {
        match self {
            Self::JointPos | Self::JointVel => 1,
            Self::FrameQuat => 4,
            Self::FramePos | Self::Gyro => 3,
        }
    }
}

/// Global physics options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Fixed integration timestep in seconds.
    pub timestep: f64,
    /// Gravity vector in physics axes.
    pub gravity: [f64; 3],
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            timestep: 0.002,
            gravity: [0.0, 0.0, -9.81],
        }
    }
}

/// A loaded model. Produced by [`super::ModelBuilder::build`] and owned by a
/// [`super::Simulation`] for its whole lifetime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    /// Global physics options.
    pub opt: ModelOptions,

    /// Number of bodies including the world body 0.
    pub nbody: usize,
    /// Number of joints.
    pub njnt: usize,
    /// Length of `qpos`.
    pub nq: usize,
    /// Length of `qvel`.
    pub nv: usize,
    /// Number of actuators (length of `ctrl`).
    pub nu: usize,
    /// Number of geoms.
    pub ngeom: usize,
    /// Number of meshes.
    pub nmesh: usize,
    /// Number of materials.
    pub nmat: usize,
    /// Number of textures.
    pub ntex: usize,
    /// Number of lights.
    pub nlight: usize,
    /// Number of tendons.
    pub ntendon: usize,
    /// Total number of tendon wrap points across all tendons.
    pub nwrap: usize,
    /// Number of sites.
    pub nsite: usize,
    /// Number of keyframes.
    pub nkey: usize,
    /// Number of sensors.
    pub nsensor: usize,
    /// Length of `sensordata`.
    pub nsensordata: usize,
    /// Number of cameras.
    pub ncam: usize,
    /// Number of mocap bodies.
    pub nmocap: usize,

    /// Parent body of each body (body 0 is its own parent).
    pub body_parentid: Vec<usize>,
    /// Top-level ancestor below the world for each body.
    pub body_rootid: Vec<usize>,
    /// Joint attached to each body, if any.
    pub body_jntadr: Vec<Option<usize>>,
    /// First geom of each body.
    pub body_geomadr: Vec<usize>,
    /// Number of geoms attached to each body.
    pub body_geomnum: Vec<usize>,
    /// Mass of each body.
    pub body_mass: Vec<f64>,
    /// Diagonal inertia of each body (3 per body).
    pub body_inertia: Vec<f64>,
    /// Center of mass in the body frame (3 per body).
    pub body_ipos: Vec<f64>,
    /// Body frame position relative to the parent (3 per body).
    pub body_pos: Vec<f64>,
    /// Body frame orientation relative to the parent (4 per body).
    pub body_quat: Vec<f64>,
    /// Mocap slot for bodies driven directly by `mocap_pos`/`mocap_quat`.
    pub body_mocapid: Vec<Option<usize>>,
    /// Body names (may be empty).
    pub body_name: Vec<String>,

    /// Type of each joint.
    pub jnt_type: Vec<JointType>,
    /// Body each joint moves.
    pub jnt_bodyid: Vec<usize>,
    /// Offset of each joint into `qpos`.
    pub jnt_qposadr: Vec<usize>,
    /// Offset of each joint into `qvel`.
    pub jnt_dofadr: Vec<usize>,
    /// Joint anchor in the child body frame (3 per joint).
    pub jnt_pos: Vec<f64>,
    /// Joint axis in the child body frame (3 per joint).
    pub jnt_axis: Vec<f64>,
    /// Whether the joint range is enforced.
    pub jnt_limited: Vec<bool>,
    /// Joint range (2 per joint).
    pub jnt_range: Vec<f64>,
    /// Joint names (may be empty).
    pub jnt_name: Vec<String>,

    /// Type of each geom.
    pub geom_type: Vec<GeomType>,
    /// Body each geom is attached to.
    pub geom_bodyid: Vec<usize>,
    /// Type-dependent size parameters (3 per geom).
    pub geom_size: Vec<f64>,
    /// Geom position in the body frame (3 per geom).
    pub geom_pos: Vec<f64>,
    /// Geom orientation in the body frame (4 per geom).
    pub geom_quat: Vec<f64>,
    /// Fallback color (4 per geom).
    pub geom_rgba: Vec<f32>,
    /// Material of each geom, if any.
    pub geom_matid: Vec<Option<usize>>,
    /// Mesh of each mesh geom. May reference a missing mesh.
    pub geom_dataid: Vec<Option<usize>>,
    /// Visibility group.
    pub geom_group: Vec<i32>,

    /// First vertex of each mesh.
    pub mesh_vertadr: Vec<usize>,
    /// Vertex count of each mesh.
    pub mesh_vertnum: Vec<usize>,
    /// First texcoord of each mesh, if it has any.
    pub mesh_texcoordadr: Vec<Option<usize>>,
    /// First face of each mesh.
    pub mesh_faceadr: Vec<usize>,
    /// Face count of each mesh.
    pub mesh_facenum: Vec<usize>,
    /// Packed vertex positions (3 per vertex).
    pub mesh_vert: Vec<f32>,
    /// Packed vertex normals (3 per vertex).
    pub mesh_normal: Vec<f32>,
    /// Packed texture coordinates (2 per vertex).
    pub mesh_texcoord: Vec<f32>,
    /// Packed triangle indices, local to each mesh (3 per face).
    pub mesh_face: Vec<u32>,

    /// Material color (4 per material).
    pub mat_rgba: Vec<f32>,
    /// Texture of each material, if any.
    pub mat_texid: Vec<Option<usize>>,
    /// Texture repeat (2 per material).
    pub mat_texrepeat: Vec<f32>,
    /// Specular intensity.
    pub mat_specular: Vec<f32>,
    /// Shininess in `[0, 1]`.
    pub mat_shininess: Vec<f32>,
    /// Reflectance in `[0, 1]`.
    pub mat_reflectance: Vec<f32>,
    /// Emission in `[0, 1]`.
    pub mat_emission: Vec<f32>,

    /// Texture width in pixels.
    pub tex_width: Vec<usize>,
    /// Texture height in pixels.
    pub tex_height: Vec<usize>,
    /// Byte offset of each texture into `tex_rgb`.
    pub tex_adr: Vec<usize>,
    /// Packed RGB texel data (3 bytes per texel).
    pub tex_rgb: Vec<u8>,

    /// Body each light is attached to.
    pub light_bodyid: Vec<usize>,
    /// Light position in the body frame (3 per light).
    pub light_pos: Vec<f64>,
    /// Light direction in the body frame (3 per light).
    pub light_dir: Vec<f64>,
    /// Directional (true) or spot (false).
    pub light_directional: Vec<bool>,
    /// Whether the light casts shadows.
    pub light_castshadow: Vec<bool>,
    /// Diffuse color (3 per light).
    pub light_diffuse: Vec<f32>,
    /// Attenuation coefficients (3 per light).
    pub light_attenuation: Vec<f32>,
    /// Spot cutoff angle in degrees.
    pub light_cutoff: Vec<f32>,

    /// Body each site is attached to.
    pub site_bodyid: Vec<usize>,
    /// Site position in the body frame (3 per site).
    pub site_pos: Vec<f64>,
    /// Site names (may be empty).
    pub site_name: Vec<String>,

    /// First wrap point of each tendon.
    pub tendon_adr: Vec<usize>,
    /// Wrap point count of each tendon.
    pub tendon_num: Vec<usize>,
    /// Rendered width of each tendon.
    pub tendon_width: Vec<f64>,
    /// Tendon color (4 per tendon).
    pub tendon_rgba: Vec<f32>,
    /// Site referenced by each wrap point.
    pub wrap_objid: Vec<usize>,

    /// Joint driven by each actuator.
    pub actuator_trnid: Vec<usize>,
    /// Transmission gear of each actuator.
    pub actuator_gear: Vec<f64>,
    /// Whether `ctrl` is clamped to `actuator_ctrlrange`.
    pub actuator_ctrllimited: Vec<bool>,
    /// Control range (2 per actuator).
    pub actuator_ctrlrange: Vec<f64>,
    /// Actuator names (may be empty).
    pub actuator_name: Vec<String>,

    /// Type of each sensor.
    pub sensor_type: Vec<SensorType>,
    /// Joint or body observed by each sensor.
    pub sensor_objid: Vec<usize>,
    /// Offset of each sensor into `sensordata`.
    pub sensor_adr: Vec<usize>,

    /// Body each camera is attached to.
    pub cam_bodyid: Vec<usize>,
    /// Camera position in the body frame (3 per camera).
    pub cam_pos: Vec<f64>,
    /// Camera viewing direction in the body frame (3 per camera).
    pub cam_dir: Vec<f64>,
    /// Vertical field of view in degrees.
    pub cam_fovy: Vec<f64>,

    /// Keyframe joint positions (`nq` per keyframe).
    pub key_qpos: Vec<f64>,
    /// Default joint configuration.
    pub qpos0: Vec<f64>,
}

impl Model {
    /// Look up a body by name.
    #[must_use]
    pub fn body_id(&self, name: &str) -> Option<usize> {
        self.body_name.iter().position(|n| n == name)
    }

    /// Look up an actuator by name.
    #[must_use]
    pub fn actuator_id(&self, name: &str) -> Option<usize> {
        self.actuator_name.iter().position(|n| n == name)
    }

    /// Keyframe `index` as a `qpos` slice.
    #[must_use]
    pub fn keyframe(&self, index: usize) -> Option<&[f64]> {
        if index >= self.nkey {
            return None;
        }
        self.key_qpos.get(index * self.nq..(index + 1) * self.nq)
    }

    /// Whether a body never moves: jointless, not mocap-driven, and welded
    /// (transitively) to the world.
    #[must_use]
    pub fn is_static_body(&self, body: usize) -> bool {
        let mut b = body;
        loop {
            if b == 0 {
                return true;
            }
            if self.body_jntadr[b].is_some() || self.body_mocapid[b].is_some() {
                return false;
            }
            b = self.body_parentid[b];
        }
    }

    /// Control range of an actuator, or `None` when unlimited.
    #[must_use]
    pub fn ctrl_range(&self, actuator: usize) -> Option<(f64, f64)> {
        self.actuator_ctrllimited[actuator].then(|| {
            (
                self.actuator_ctrlrange[actuator * 2],
                self.actuator_ctrlrange[actuator * 2 + 1],
            )
        })
    }

    /// Check that every buffer matches its count field and that every
    /// cross reference lands inside the array it indexes.
    ///
    /// Models from [`super::ModelBuilder`] always pass; models read from
    /// disk must be checked before anything indexes into them.
    ///
    /// # Errors
    ///
    /// Returns [`SimviewError::InvalidModel`] for a buffer of the wrong
    /// length and [`SimviewError::MissingReference`] for a dangling id.
    pub fn validate(&self) -> Result<(), SimviewError> {
        if self.nbody == 0 {
            return Err(SimviewError::InvalidModel("model has no world body".to_owned()));
        }
        if !(self.opt.timestep.is_finite() && self.opt.timestep > 0.0) {
            return Err(SimviewError::InvalidModel(format!(
                "timestep must be positive, got {}",
                self.opt.timestep
            )));
        }
        self.check_lengths()?;
        self.check_tree()?;
        self.check_joints()?;
        self.check_assets()?;
        self.check_attachments()
    }

    fn check_lengths(&self) -> Result<(), SimviewError> {
        let (nb, nj, ng) = (self.nbody, self.njnt, self.ngeom);
        let (nl, nt, nc) = (self.nlight, self.ntendon, self.ncam);
        let expected = [
            ("body_parentid", self.body_parentid.len(), nb),
            ("body_rootid", self.body_rootid.len(), nb),
            ("body_jntadr", self.body_jntadr.len(), nb),
            ("body_geomadr", self.body_geomadr.len(), nb),
            ("body_geomnum", self.body_geomnum.len(), nb),
            ("body_mass", self.body_mass.len(), nb),
            ("body_inertia", self.body_inertia.len(), nb * 3),
            ("body_ipos", self.body_ipos.len(), nb * 3),
            ("body_pos", self.body_pos.len(), nb * 3),
            ("body_quat", self.body_quat.len(), nb * 4),
            ("body_mocapid", self.body_mocapid.len(), nb),
            ("body_name", self.body_name.len(), nb),
            ("jnt_type", self.jnt_type.len(), nj),
            ("jnt_bodyid", self.jnt_bodyid.len(), nj),
            ("jnt_qposadr", self.jnt_qposadr.len(), nj),
            ("jnt_dofadr", self.jnt_dofadr.len(), nj),
            ("jnt_pos", self.jnt_pos.len(), nj * 3),
            ("jnt_axis", self.jnt_axis.len(), nj * 3),
            ("jnt_limited", self.jnt_limited.len(), nj),
            ("jnt_range", self.jnt_range.len(), nj * 2),
            ("jnt_name", self.jnt_name.len(), nj),
            ("geom_type", self.geom_type.len(), ng),
            ("geom_bodyid", self.geom_bodyid.len(), ng),
            ("geom_size", self.geom_size.len(), ng * 3),
            ("geom_pos", self.geom_pos.len(), ng * 3),
            ("geom_quat", self.geom_quat.len(), ng * 4),
            ("geom_rgba", self.geom_rgba.len(), ng * 4),
            ("geom_matid", self.geom_matid.len(), ng),
            ("geom_dataid", self.geom_dataid.len(), ng),
            ("geom_group", self.geom_group.len(), ng),
            ("mesh_vertadr", self.mesh_vertadr.len(), self.nmesh),
            ("mesh_vertnum", self.mesh_vertnum.len(), self.nmesh),
            ("mesh_texcoordadr", self.mesh_texcoordadr.len(), self.nmesh),
            ("mesh_faceadr", self.mesh_faceadr.len(), self.nmesh),
            ("mesh_facenum", self.mesh_facenum.len(), self.nmesh),
            ("mesh_normal", self.mesh_normal.len(), self.mesh_vert.len()),
            ("mat_rgba", self.mat_rgba.len(), self.nmat * 4),
            ("mat_texid", self.mat_texid.len(), self.nmat),
            ("mat_texrepeat", self.mat_texrepeat.len(), self.nmat * 2),
            ("mat_specular", self.mat_specular.len(), self.nmat),
            ("mat_shininess", self.mat_shininess.len(), self.nmat),
            ("mat_reflectance", self.mat_reflectance.len(), self.nmat),
            ("mat_emission", self.mat_emission.len(), self.nmat),
            ("tex_width", self.tex_width.len(), self.ntex),
            ("tex_height", self.tex_height.len(), self.ntex),
            ("tex_adr", self.tex_adr.len(), self.ntex),
            ("light_bodyid", self.light_bodyid.len(), nl),
            ("light_pos", self.light_pos.len(), nl * 3),
            ("light_dir", self.light_dir.len(), nl * 3),
            ("light_directional", self.light_directional.len(), nl),
            ("light_castshadow", self.light_castshadow.len(), nl),
            ("light_diffuse", self.light_diffuse.len(), nl * 3),
            ("light_attenuation", self.light_attenuation.len(), nl * 3),
            ("light_cutoff", self.light_cutoff.len(), nl),
            ("site_bodyid", self.site_bodyid.len(), self.nsite),
            ("site_pos", self.site_pos.len(), self.nsite * 3),
            ("site_name", self.site_name.len(), self.nsite),
            ("tendon_adr", self.tendon_adr.len(), nt),
            ("tendon_num", self.tendon_num.len(), nt),
            ("tendon_width", self.tendon_width.len(), nt),
            ("tendon_rgba", self.tendon_rgba.len(), nt * 4),
            ("wrap_objid", self.wrap_objid.len(), self.nwrap),
            ("actuator_trnid", self.actuator_trnid.len(), self.nu),
            ("actuator_gear", self.actuator_gear.len(), self.nu),
            ("actuator_ctrllimited", self.actuator_ctrllimited.len(), self.nu),
            ("actuator_ctrlrange", self.actuator_ctrlrange.len(), self.nu * 2),
            ("actuator_name", self.actuator_name.len(), self.nu),
            ("sensor_type", self.sensor_type.len(), self.nsensor),
            ("sensor_objid", self.sensor_objid.len(), self.nsensor),
            ("sensor_adr", self.sensor_adr.len(), self.nsensor),
            ("cam_bodyid", self.cam_bodyid.len(), nc),
            ("cam_pos", self.cam_pos.len(), nc * 3),
            ("cam_dir", self.cam_dir.len(), nc * 3),
            ("cam_fovy", self.cam_fovy.len(), nc),
            ("key_qpos", self.key_qpos.len(), self.nkey * self.nq),
            ("qpos0", self.qpos0.len(), self.nq),
        ];
        for (name, len, want) in expected {
            if len != want {
                return Err(SimviewError::InvalidModel(format!(
                    "{name} has {len} entries, expected {want}"
                )));
            }
        }
        Ok(())
    }

    fn check_tree(&self) -> Result<(), SimviewError> {
        for b in 0..self.nbody {
            let parent = self.body_parentid[b];
            if (b == 0 && parent != 0) || (b > 0 && parent >= b) {
                return Err(SimviewError::InvalidModel(format!(
                    "body {b} has parent {parent} which is not defined before it"
                )));
            }
            check_index("body", self.body_rootid[b], self.nbody)?;
            if let Some(m) = self.body_mocapid[b] {
                check_index("mocap", m, self.nmocap)?;
            }
            if let Some(j) = self.body_jntadr[b] {
                check_index("joint", j, self.njnt)?;
                if self.jnt_bodyid[j] != b {
                    return Err(SimviewError::InvalidModel(format!(
                        "body {b} lists joint {j}, which moves body {}",
                        self.jnt_bodyid[j]
                    )));
                }
            }
            if self.body_geomadr[b] + self.body_geomnum[b] > self.ngeom {
                return Err(SimviewError::InvalidModel(format!(
                    "geoms of body {b} run past ngeom {}",
                    self.ngeom
                )));
            }
        }
        Ok(())
    }

    fn check_joints(&self) -> Result<(), SimviewError> {
        for j in 0..self.njnt {
            let b = self.jnt_bodyid[j];
            if b == 0 || b >= self.nbody {
                return Err(SimviewError::MissingReference { kind: "body", index: b });
            }
            let kind = self.jnt_type[j];
            if self.jnt_qposadr[j] + kind.nq() > self.nq
                || self.jnt_dofadr[j] + kind.nv() > self.nv
            {
                return Err(SimviewError::InvalidModel(format!(
                    "joint {j} addresses state past nq {} / nv {}",
                    self.nq, self.nv
                )));
            }
        }
        for u in 0..self.nu {
            let j = self.actuator_trnid[u];
            check_index("joint", j, self.njnt)?;
            if !matches!(self.jnt_type[j], JointType::Hinge | JointType::Slide) {
                return Err(SimviewError::InvalidModel(format!(
                    "actuator {u} must drive a hinge or slide joint"
                )));
            }
        }
        for s in 0..self.nsensor {
            let kind = self.sensor_type[s];
            let object = self.sensor_objid[s];
            match kind {
                SensorType::JointPos | SensorType::JointVel => {
                    check_index("joint", object, self.njnt)?;
                }
                SensorType::FrameQuat | SensorType::FramePos | SensorType::Gyro => {
                    check_index("body", object, self.nbody)?;
                }
            }
            if self.sensor_adr[s] + kind.dim() > self.nsensordata {
                return Err(SimviewError::InvalidModel(format!(
                    "sensor {s} writes past nsensordata {}",
                    self.nsensordata
                )));
            }
        }
        Ok(())
    }

    fn check_assets(&self) -> Result<(), SimviewError> {
        let nvert = self.mesh_vert.len() / 3;
        let nface = self.mesh_face.len() / 3;
        let ntexcoord = self.mesh_texcoord.len() / 2;
        for i in 0..self.nmesh {
            let (vadr, vnum) = (self.mesh_vertadr[i], self.mesh_vertnum[i]);
            let (fadr, fnum) = (self.mesh_faceadr[i], self.mesh_facenum[i]);
            let texcoords_fit = self.mesh_texcoordadr[i]
                .is_none_or(|t| t + vnum <= ntexcoord);
            if vadr + vnum > nvert || fadr + fnum > nface || !texcoords_fit {
                return Err(SimviewError::InvalidModel(format!(
                    "mesh {i} runs past its vertex, face or texcoord buffer"
                )));
            }
            let faces = &self.mesh_face[fadr * 3..(fadr + fnum) * 3];
            if faces.iter().any(|&v| v as usize >= vnum) {
                return Err(SimviewError::InvalidModel(format!(
                    "mesh {i} has a face index out of range"
                )));
            }
        }
        for t in 0..self.ntex {
            if self.tex_adr[t] + self.tex_width[t] * self.tex_height[t] * 3 > self.tex_rgb.len() {
                return Err(SimviewError::InvalidModel(format!(
                    "texture {t} runs past tex_rgb"
                )));
            }
        }
        for t in self.mat_texid.iter().flatten() {
            check_index("texture", *t, self.ntex)?;
        }
        for m in self.geom_matid.iter().flatten() {
            check_index("material", *m, self.nmat)?;
        }
        Ok(())
    }

    fn check_attachments(&self) -> Result<(), SimviewError> {
        let bodies = self
            .geom_bodyid
            .iter()
            .chain(&self.light_bodyid)
            .chain(&self.site_bodyid)
            .chain(&self.cam_bodyid);
        for &b in bodies {
            check_index("body", b, self.nbody)?;
        }
        for t in 0..self.ntendon {
            if self.tendon_adr[t] + self.tendon_num[t] > self.nwrap {
                return Err(SimviewError::InvalidModel(format!(
                    "tendon {t} runs past nwrap {}",
                    self.nwrap
                )));
            }
        }
        for &s in &self.wrap_objid {
            check_index("site", s, self.nsite)?;
        }
        Ok(())
    }
}

fn check_index(kind: &'static str, index: usize, count: usize) -> Result<(), SimviewError> {
    if index >= count {
        return Err(SimviewError::MissingReference { kind, index });
    }
    Ok(())
}
