//! Programmatic model construction with validation.
//!
//! Entities are added through plain spec structs (most fields have sensible
//! defaults, so struct-update syntax keeps call sites short) and packed into
//! flat [`Model`] buffers by [`ModelBuilder::build`].

use glam::Vec3;

use super::model::{GeomType, JointType, Model, ModelOptions, SensorType};
use crate::error::SimviewError;

/// A rigid body. Parents must be added before their children.
#[derive(Debug, Clone)]
pub struct BodySpec {
    /// Optional name for lookups.
    pub name: String,
    /// Parent body; 0 is the world.
    pub parent: usize,
    /// Frame position relative to the parent.
    pub pos: [f64; 3],
    /// Frame orientation relative to the parent, scalar-first.
    pub quat: [f64; 4],
    /// Mass in kilograms.
    pub mass: f64,
    /// Diagonal inertia. Zero means "derive from mass".
    pub inertia: [f64; 3],
    /// Center of mass in the body frame.
    pub com: [f64; 3],
    /// Driven kinematically through `mocap_pos`/`mocap_quat`.
    pub mocap: bool,
}

impl Default for BodySpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: 0,
            pos: [0.0; 3],
            quat: [1.0, 0.0, 0.0, 0.0],
            mass: 1.0,
            inertia: [0.0; 3],
            com: [0.0; 3],
            mocap: false,
        }
    }
}

/// A joint connecting a body to its parent.
#[derive(Debug, Clone)]
pub struct JointSpec {
    /// Optional name.
    pub name: String,
    /// Body this joint moves.
    pub body: usize,
    /// Joint kind.
    pub kind: JointType,
    /// Anchor in the body frame.
    pub pos: [f64; 3],
    /// Axis in the body frame (hinge/slide).
    pub axis: [f64; 3],
    /// Enforced range, if any.
    pub range: Option<[f64; 2]>,
}

impl Default for JointSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            body: 1,
            kind: JointType::Hinge,
            pos: [0.0; 3],
            axis: [0.0, 0.0, 1.0],
            range: None,
        }
    }
}

/// A visual/collision shape attached to a body.
#[derive(Debug, Clone)]
pub struct GeomSpec {
    /// Owning body.
    pub body: usize,
    /// Shape type.
    pub kind: GeomType,
    /// Type-dependent size parameters.
    pub size: [f64; 3],
    /// Position in the body frame.
    pub pos: [f64; 3],
    /// Orientation in the body frame.
    pub quat: [f64; 4],
    /// Fallback color.
    pub rgba: [f32; 4],
    /// Material, if any.
    pub material: Option<usize>,
    /// Mesh for [`GeomType::Mesh`]. Left unchecked here; a dangling id is
    /// reported when the scene is built.
    pub mesh: Option<usize>,
    /// Visibility group.
    pub group: i32,
}

impl Default for GeomSpec {
    fn default() -> Self {
        Self {
            body: 0,
            kind: GeomType::Sphere,
            size: [0.1, 0.0, 0.0],
            pos: [0.0; 3],
            quat: [1.0, 0.0, 0.0, 0.0],
            rgba: [0.5, 0.5, 0.5, 1.0],
            material: None,
            mesh: None,
            group: 0,
        }
    }
}

/// An imported triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct MeshSpec {
    /// Vertex positions in the mesh frame.
    pub vertices: Vec<[f32; 3]>,
    /// Vertex normals; computed from faces when absent.
    pub normals: Option<Vec<[f32; 3]>>,
    /// Texture coordinates, one per vertex.
    pub texcoords: Option<Vec<[f32; 2]>>,
    /// Triangles as vertex index triples.
    pub faces: Vec<[u32; 3]>,
}

/// A texture stored as packed RGB bytes.
#[derive(Debug, Clone, Default)]
pub struct TextureSpec {
    /// Width in texels.
    pub width: usize,
    /// Height in texels.
    pub height: usize,
    /// `width * height * 3` bytes.
    pub rgb: Vec<u8>,
}

/// Surface appearance shared by geoms.
#[derive(Debug, Clone)]
pub struct MaterialSpec {
    /// Base color.
    pub rgba: [f32; 4],
    /// Texture, if any.
    pub texture: Option<usize>,
    /// Texture repeat in U and V.
    pub texrepeat: [f32; 2],
    /// Specular intensity.
    pub specular: f32,
    /// Shininess.
    pub shininess: f32,
    /// Reflectance.
    pub reflectance: f32,
    /// Emission.
    pub emission: f32,
}

impl Default for MaterialSpec {
    fn default() -> Self {
        Self {
            rgba: [1.0; 4],
            texture: None,
            texrepeat: [1.0, 1.0],
            specular: 0.5,
            shininess: 0.5,
            reflectance: 0.0,
            emission: 0.0,
        }
    }
}

/// A light attached to a body.
#[derive(Debug, Clone)]
pub struct LightSpec {
    /// Owning body.
    pub body: usize,
    /// Position in the body frame.
    pub pos: [f64; 3],
    /// Direction in the body frame.
    pub dir: [f64; 3],
    /// Directional or spot.
    pub directional: bool,
    /// Casts shadows.
    pub castshadow: bool,
    /// Diffuse color.
    pub diffuse: [f32; 3],
    /// Attenuation coefficients.
    pub attenuation: [f32; 3],
    /// Spot cutoff in degrees.
    pub cutoff: f32,
}

impl Default for LightSpec {
    fn default() -> Self {
        Self {
            body: 0,
            pos: [0.0, 0.0, 3.0],
            dir: [0.0, 0.0, -1.0],
            directional: false,
            castshadow: true,
            diffuse: [0.7, 0.7, 0.7],
            attenuation: [1.0, 0.0, 0.0],
            cutoff: 45.0,
        }
    }
}

/// A named point on a body.
#[derive(Debug, Clone, Default)]
pub struct SiteSpec {
    /// Optional name.
    pub name: String,
    /// Owning body.
    pub body: usize,
    /// Position in the body frame.
    pub pos: [f64; 3],
}

/// A tendon path through a sequence of sites.
#[derive(Debug, Clone)]
pub struct TendonSpec {
    /// Sites visited in order.
    pub sites: Vec<usize>,
    /// Rendered width.
    pub width: f64,
    /// Color.
    pub rgba: [f32; 4],
}

impl Default for TendonSpec {
    fn default() -> Self {
        Self {
            sites: Vec::new(),
            width: 0.003,
            rgba: [0.8, 0.3, 0.3, 1.0],
        }
    }
}

/// A joint-space motor.
#[derive(Debug, Clone)]
pub struct ActuatorSpec {
    /// Optional name.
    pub name: String,
    /// Driven hinge or slide joint.
    pub joint: usize,
    /// Transmission gear.
    pub gear: f64,
    /// Clamp range for `ctrl`, if any.
    pub ctrlrange: Option<[f64; 2]>,
}

impl Default for ActuatorSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            joint: 0,
            gear: 1.0,
            ctrlrange: None,
        }
    }
}

/// A sensor reading. `object` is a joint id for joint sensors and a body id
/// otherwise.
#[derive(Debug, Clone, Copy)]
pub struct SensorSpec {
    /// Sensor kind.
    pub kind: SensorType,
    /// Observed joint or body.
    pub object: usize,
}

/// A camera attached to a body.
#[derive(Debug, Clone)]
pub struct CameraSpec {
    /// Owning body.
    pub body: usize,
    /// Position in the body frame.
    pub pos: [f64; 3],
    /// Viewing direction in the body frame.
    pub dir: [f64; 3],
    /// Vertical field of view in degrees.
    pub fovy: f64,
}

impl Default for CameraSpec {
    fn default() -> Self {
        Self {
            body: 0,
            pos: [0.0; 3],
            dir: [1.0, 0.0, 0.0],
            fovy: 45.0,
        }
    }
}

/// Collects entity specs and packs them into a validated [`Model`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    opt: ModelOptions,
    bodies: Vec<BodySpec>,
    joints: Vec<JointSpec>,
    geoms: Vec<GeomSpec>,
    meshes: Vec<MeshSpec>,
    textures: Vec<TextureSpec>,
    materials: Vec<MaterialSpec>,
    lights: Vec<LightSpec>,
    sites: Vec<SiteSpec>,
    tendons: Vec<TendonSpec>,
    actuators: Vec<ActuatorSpec>,
    sensors: Vec<SensorSpec>,
    cameras: Vec<CameraSpec>,
    keyframes: Vec<Vec<f64>>,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    /// Empty builder containing only the world body.
    #[must_use]
    pub fn new() -> Self {
        Self {
            opt: ModelOptions::default(),
            bodies: vec![BodySpec {
                name: "world".to_owned(),
                mass: 0.0,
                ..BodySpec::default()
            }],
            joints: Vec::new(),
            geoms: Vec::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            materials: Vec::new(),
            lights: Vec::new(),
            sites: Vec::new(),
            tendons: Vec::new(),
            actuators: Vec::new(),
            sensors: Vec::new(),
            cameras: Vec::new(),
            keyframes: Vec::new(),
        }
    }

    /// Set the integration timestep.
    #[must_use]
    pub fn timestep(mut self, dt: f64) -> Self {
        self.opt.timestep = dt;
        self
    }

    /// Set gravity in physics axes.
    #[must_use]
    pub fn gravity(mut self, gravity: [f64; 3]) -> Self {
        self.opt.gravity = gravity;
        self
    }

    /// Add a body, returning its id.
    pub fn add_body(&mut self, spec: BodySpec) -> usize {
        self.bodies.push(spec);
        self.bodies.len() - 1
    }

    /// Add a joint, returning its id.
    pub fn add_joint(&mut self, spec: JointSpec) -> usize {
        self.joints.push(spec);
        self.joints.len() - 1
    }

    /// Add a geom.
    pub fn add_geom(&mut self, spec: GeomSpec) {
        self.geoms.push(spec);
    }

    /// Add a mesh, returning its id.
    pub fn add_mesh(&mut self, spec: MeshSpec) -> usize {
        self.meshes.push(spec);
        self.meshes.len() - 1
    }

    /// Add a texture, returning its id.
    pub fn add_texture(&mut self, spec: TextureSpec) -> usize {
        self.textures.push(spec);
        self.textures.len() - 1
    }

    /// Add a material, returning its id.
    pub fn add_material(&mut self, spec: MaterialSpec) -> usize {
        self.materials.push(spec);
        self.materials.len() - 1
    }

    /// Add a light.
    pub fn add_light(&mut self, spec: LightSpec) {
        self.lights.push(spec);
    }

    /// Add a site, returning its id.
    pub fn add_site(&mut self, spec: SiteSpec) -> usize {
        self.sites.push(spec);
        self.sites.len() - 1
    }

    /// Add a tendon.
    pub fn add_tendon(&mut self, spec: TendonSpec) {
        self.tendons.push(spec);
    }

    /// Add an actuator, returning its id.
    pub fn add_actuator(&mut self, spec: ActuatorSpec) -> usize {
        self.actuators.push(spec);
        self.actuators.len() - 1
    }

    /// Add a sensor.
    pub fn add_sensor(&mut self, spec: SensorSpec) {
        self.sensors.push(spec);
    }

    /// Add a camera.
    pub fn add_camera(&mut self, spec: CameraSpec) {
        self.cameras.push(spec);
    }

    /// Add a keyframe. Its length must equal the model's `nq`.
    pub fn add_keyframe(&mut self, qpos: Vec<f64>) {
        self.keyframes.push(qpos);
    }

    /// Validate and pack everything into a [`Model`].
    ///
    /// # Errors
    ///
    /// Returns [`SimviewError::InvalidModel`] or
    /// [`SimviewError::MissingReference`] when the specs are inconsistent.
    pub fn build(self) -> Result<Model, SimviewError> {
        if !(self.opt.timestep > 0.0) {
            return Err(SimviewError::InvalidModel(format!(
                "timestep must be positive, got {}",
                self.opt.timestep
            )));
        }

        let mut m = Model {
            opt: self.opt,
            ..Model::default()
        };
        self.pack_bodies(&mut m)?;
        self.pack_joints(&mut m)?;
        self.pack_assets(&mut m)?;
        self.pack_geoms(&mut m)?;
        self.pack_decorations(&mut m)?;
        self.pack_actuators(&mut m)?;
        self.pack_sensors(&mut m)?;
        self.pack_keyframes(&mut m)?;
        m.validate()?;
        check_masses(&m)?;

        log::debug!(
            "built model: {} bodies, {} joints, {} geoms, {} actuators",
            m.nbody,
            m.njnt,
            m.ngeom,
            m.nu
        );
        Ok(m)
    }

    fn pack_bodies(&self, m: &mut Model) -> Result<(), SimviewError> {
        m.nbody = self.bodies.len();
        for (b, body) in self.bodies.iter().enumerate() {
            if b > 0 && body.parent >= b {
                return Err(SimviewError::InvalidModel(format!(
                    "body {b} has parent {} which is not defined before it",
                    body.parent
                )));
            }
            let parent = if b == 0 { 0 } else { body.parent };
            m.body_parentid.push(parent);
            let root = if b == 0 || parent == 0 {
                b
            } else {
                m.body_rootid[parent]
            };
            m.body_rootid.push(root);
            m.body_jntadr.push(None);
            m.body_mass.push(body.mass);
            m.body_inertia.extend(derived_inertia(body.mass, body.inertia));
            m.body_ipos.extend(body.com);
            m.body_pos.extend(body.pos);
            m.body_quat.extend(normalized(body.quat));
            m.body_name.push(body.name.clone());
            if body.mocap && b > 0 {
                if parent != 0 {
                    return Err(SimviewError::InvalidModel(format!(
                        "mocap body {b} must be a child of the world"
                    )));
                }
                m.body_mocapid.push(Some(m.nmocap));
                m.nmocap += 1;
            } else {
                m.body_mocapid.push(None);
            }
        }
        Ok(())
    }

    fn pack_joints(&self, m: &mut Model) -> Result<(), SimviewError> {
        m.njnt = self.joints.len();
        for (j, joint) in self.joints.iter().enumerate() {
            let b = joint.body;
            if b == 0 || b >= m.nbody {
                return Err(SimviewError::MissingReference { kind: "body", index: b });
            }
            if m.body_jntadr[b].is_some() {
                return Err(SimviewError::InvalidModel(format!(
                    "body {b} has more than one joint"
                )));
            }
            if m.body_mocapid[b].is_some() {
                return Err(SimviewError::InvalidModel(format!(
                    "mocap body {b} cannot have joints"
                )));
            }
            if joint.kind == JointType::Free && m.body_parentid[b] != 0 {
                return Err(SimviewError::InvalidModel(format!(
                    "free joint on body {b} whose parent is not the world"
                )));
            }
            m.body_jntadr[b] = Some(j);
            m.jnt_type.push(joint.kind);
            m.jnt_bodyid.push(b);
            m.jnt_qposadr.push(m.nq);
            m.jnt_dofadr.push(m.nv);
            m.jnt_pos.extend(joint.pos);
            let axis = Vec3::from_array(joint.axis.map(|v| v as f32));
            if matches!(joint.kind, JointType::Hinge | JointType::Slide)
                && axis.length_squared() < 1e-12
            {
                return Err(SimviewError::InvalidModel(format!(
                    "joint {j} has a zero axis"
                )));
            }
            m.jnt_axis.extend(unit(joint.axis));
            m.jnt_limited.push(joint.range.is_some());
            m.jnt_range.extend(joint.range.unwrap_or([0.0, 0.0]));
            m.jnt_name.push(joint.name.clone());

            match joint.kind {
                JointType::Free => {
                    m.qpos0.extend(&m.body_pos[b * 3..b * 3 + 3]);
                    let q = [
                        m.body_quat[b * 4],
                        m.body_quat[b * 4 + 1],
                        m.body_quat[b * 4 + 2],
                        m.body_quat[b * 4 + 3],
                    ];
                    m.qpos0.extend(q);
                }
                JointType::Ball => m.qpos0.extend([1.0, 0.0, 0.0, 0.0]),
                JointType::Slide | JointType::Hinge => m.qpos0.push(0.0),
            }
            m.nq += joint.kind.nq();
            m.nv += joint.kind.nv();
        }
        Ok(())
    }

    fn pack_assets(&self, m: &mut Model) -> Result<(), SimviewError> {
        m.ntex = self.textures.len();
        for (t, tex) in self.textures.iter().enumerate() {
            if tex.rgb.len() != tex.width * tex.height * 3 {
                return Err(SimviewError::InvalidModel(format!(
                    "texture {t} has {} bytes, expected {}",
                    tex.rgb.len(),
                    tex.width * tex.height * 3
                )));
            }
            m.tex_width.push(tex.width);
            m.tex_height.push(tex.height);
            m.tex_adr.push(m.tex_rgb.len());
            m.tex_rgb.extend_from_slice(&tex.rgb);
        }

        m.nmat = self.materials.len();
        for mat in &self.materials {
            if let Some(t) = mat.texture {
                if t >= m.ntex {
                    return Err(SimviewError::MissingReference { kind: "texture", index: t });
                }
            }
            m.mat_rgba.extend(mat.rgba);
            m.mat_texid.push(mat.texture);
            m.mat_texrepeat.extend(mat.texrepeat);
            m.mat_specular.push(mat.specular);
            m.mat_shininess.push(mat.shininess);
            m.mat_reflectance.push(mat.reflectance);
            m.mat_emission.push(mat.emission);
        }

        m.nmesh = self.meshes.len();
        for (i, mesh) in self.meshes.iter().enumerate() {
            let nvert = mesh.vertices.len();
            if mesh.faces.iter().flatten().any(|&v| v as usize >= nvert) {
                return Err(SimviewError::InvalidModel(format!(
                    "mesh {i} has a face index out of range"
                )));
            }
            m.mesh_vertadr.push(m.mesh_vert.len() / 3);
            m.mesh_vertnum.push(nvert);
            m.mesh_faceadr.push(m.mesh_face.len() / 3);
            m.mesh_facenum.push(mesh.faces.len());
            m.mesh_vert.extend(mesh.vertices.iter().flatten());
            match &mesh.normals {
                Some(normals) if normals.len() == nvert => {
                    m.mesh_normal.extend(normals.iter().flatten());
                }
                _ => m
                    .mesh_normal
                    .extend(face_normals(&mesh.vertices, &mesh.faces).iter().flatten()),
            }
            match &mesh.texcoords {
                Some(uv) if uv.len() == nvert => {
                    m.mesh_texcoordadr.push(Some(m.mesh_texcoord.len() / 2));
                    m.mesh_texcoord.extend(uv.iter().flatten());
                }
                _ => m.mesh_texcoordadr.push(None),
            }
            m.mesh_face.extend(mesh.faces.iter().flatten());
        }
        Ok(())
    }

    fn pack_geoms(&self, m: &mut Model) -> Result<(), SimviewError> {
        // Geoms are stored contiguously per body.
        let mut order: Vec<usize> = (0..self.geoms.len()).collect();
        order.sort_by_key(|&g| self.geoms[g].body);

        m.ngeom = self.geoms.len();
        m.body_geomadr = vec![0; m.nbody];
        m.body_geomnum = vec![0; m.nbody];
        for (g, &src) in order.iter().enumerate() {
            let geom = &self.geoms[src];
            if geom.body >= m.nbody {
                return Err(SimviewError::MissingReference { kind: "body", index: geom.body });
            }
            if let Some(mat) = geom.material {
                if mat >= m.nmat {
                    return Err(SimviewError::MissingReference { kind: "material", index: mat });
                }
            }
            if m.body_geomnum[geom.body] == 0 {
                m.body_geomadr[geom.body] = g;
            }
            m.body_geomnum[geom.body] += 1;
            m.geom_type.push(geom.kind);
            m.geom_bodyid.push(geom.body);
            m.geom_size.extend(geom.size);
            m.geom_pos.extend(geom.pos);
            m.geom_quat.extend(normalized(geom.quat));
            m.geom_rgba.extend(geom.rgba);
            m.geom_matid.push(geom.material);
            m.geom_dataid.push(geom.mesh);
            m.geom_group.push(geom.group);
        }
        Ok(())
    }

    fn pack_decorations(&self, m: &mut Model) -> Result<(), SimviewError> {
        m.nlight = self.lights.len();
        for light in &self.lights {
            check_body(m, light.body)?;
            m.light_bodyid.push(light.body);
            m.light_pos.extend(light.pos);
            m.light_dir.extend(unit(light.dir));
            m.light_directional.push(light.directional);
            m.light_castshadow.push(light.castshadow);
            m.light_diffuse.extend(light.diffuse);
            m.light_attenuation.extend(light.attenuation);
            m.light_cutoff.push(light.cutoff);
        }

        m.nsite = self.sites.len();
        for site in &self.sites {
            check_body(m, site.body)?;
            m.site_bodyid.push(site.body);
            m.site_pos.extend(site.pos);
            m.site_name.push(site.name.clone());
        }

        m.ntendon = self.tendons.len();
        for tendon in &self.tendons {
            if let Some(&s) = tendon.sites.iter().find(|&&s| s >= m.nsite) {
                return Err(SimviewError::MissingReference { kind: "site", index: s });
            }
            m.tendon_adr.push(m.wrap_objid.len());
            m.tendon_num.push(tendon.sites.len());
            m.tendon_width.push(tendon.width);
            m.tendon_rgba.extend(tendon.rgba);
            m.wrap_objid.extend(&tendon.sites);
        }
        m.nwrap = m.wrap_objid.len();

        m.ncam = self.cameras.len();
        for cam in &self.cameras {
            check_body(m, cam.body)?;
            m.cam_bodyid.push(cam.body);
            m.cam_pos.extend(cam.pos);
            m.cam_dir.extend(unit(cam.dir));
            m.cam_fovy.push(cam.fovy);
        }
        Ok(())
    }

    fn pack_actuators(&self, m: &mut Model) -> Result<(), SimviewError> {
        m.nu = self.actuators.len();
        for act in &self.actuators {
            if act.joint >= m.njnt {
                return Err(SimviewError::MissingReference { kind: "joint", index: act.joint });
            }
            if !matches!(m.jnt_type[act.joint], JointType::Hinge | JointType::Slide) {
                return Err(SimviewError::InvalidModel(format!(
                    "actuator '{}' must drive a hinge or slide joint",
                    act.name
                )));
            }
            m.actuator_trnid.push(act.joint);
            m.actuator_gear.push(act.gear);
            m.actuator_ctrllimited.push(act.ctrlrange.is_some());
            m.actuator_ctrlrange.extend(act.ctrlrange.unwrap_or([0.0, 0.0]));
            m.actuator_name.push(act.name.clone());
        }
        Ok(())
    }

    fn pack_sensors(&self, m: &mut Model) -> Result<(), SimviewError> {
        m.nsensor = self.sensors.len();
        for sensor in &self.sensors {
            match sensor.kind {
                SensorType::JointPos | SensorType::JointVel => {
                    if sensor.object >= m.njnt {
                        return Err(SimviewError::MissingReference {
                            kind: "joint",
                            index: sensor.object,
                        });
                    }
                }
                SensorType::FrameQuat | SensorType::FramePos | SensorType::Gyro => {
                    check_body(m, sensor.object)?;
                }
            }
            m.sensor_type.push(sensor.kind);
            m.sensor_objid.push(sensor.object);
            m.sensor_adr.push(m.nsensordata);
            m.nsensordata += sensor.kind.dim();
        }
        Ok(())
    }

    fn pack_keyframes(&self, m: &mut Model) -> Result<(), SimviewError> {
        m.nkey = self.keyframes.len();
        for (k, qpos) in self.keyframes.iter().enumerate() {
            if qpos.len() != m.nq {
                return Err(SimviewError::InvalidModel(format!(
                    "keyframe {k} has {} values, expected {}",
                    qpos.len(),
                    m.nq
                )));
            }
            m.key_qpos.extend(qpos);
        }
        Ok(())
    }
}

fn check_body(m: &Model, body: usize) -> Result<(), SimviewError> {
    if body >= m.nbody {
        return Err(SimviewError::MissingReference { kind: "body", index: body });
    }
    Ok(())
}

fn check_masses(m: &Model) -> Result<(), SimviewError> {
    for b in 1..m.nbody {
        if !m.is_static_body(b) && m.body_mocapid[b].is_none() && !(m.body_mass[b] > 0.0) {
            return Err(SimviewError::InvalidModel(format!(
                "dynamic body {b} needs a positive mass"
            )));
        }
    }
    Ok(())
}

fn derived_inertia(mass: f64, inertia: [f64; 3]) -> [f64; 3] {
    if inertia.iter().any(|&i| i > 0.0) {
        inertia
    } else {
        // Solid sphere of radius 0.1.
        let i = 0.4 * mass * 0.01;
        [i, i, i]
    }
}

fn normalized(q: [f64; 4]) -> [f64; 4] {
    let n = q.iter().map(|v| v * v).sum::<f64>().sqrt();
    if n < 1e-12 {
        [1.0, 0.0, 0.0, 0.0]
    } else {
        q.map(|v| v / n)
    }
}

fn unit(v: [f64; 3]) -> [f64; 3] {
    let n = v.iter().map(|c| c * c).sum::<f64>().sqrt();
    if n < 1e-12 {
        v
    } else {
        v.map(|c| c / n)
    }
}

/// Area-weighted vertex normals.
fn face_normals(vertices: &[[f32; 3]], faces: &[[u32; 3]]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; vertices.len()];
    for face in faces {
        let [a, b, c] = face.map(|i| Vec3::from_array(vertices[i as usize]));
        let n = (b - a).cross(c - a);
        for &i in face {
            acc[i as usize] += n;
        }
    }
    acc.into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Z).to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pendulum() -> ModelBuilder {
        let mut b = ModelBuilder::new();
        let link = b.add_body(BodySpec {
            name: "link".to_owned(),
            pos: [0.0, 0.0, 1.0],
            ..BodySpec::default()
        });
        let _ = b.add_joint(JointSpec {
            body: link,
            kind: JointType::Hinge,
            axis: [0.0, 1.0, 0.0],
            ..JointSpec::default()
        });
        b.add_geom(GeomSpec {
            body: link,
            kind: GeomType::Capsule,
            size: [0.05, 0.2, 0.0],
            ..GeomSpec::default()
        });
        b
    }

    #[test]
    fn packs_addresses() {
        let m = pendulum().build().unwrap();
        assert_eq!(m.nbody, 2);
        assert_eq!(m.njnt, 1);
        assert_eq!(m.nq, 1);
        assert_eq!(m.body_jntadr[1], Some(0));
        assert_eq!(m.body_geomadr[1], 0);
        assert_eq!(m.body_geomnum[1], 1);
        assert_eq!(m.body_geomnum[0], 0);
        assert_eq!(m.body_id("link"), Some(1));
        assert_eq!(m.qpos0, vec![0.0]);
    }

    #[test]
    fn free_joint_qpos0_is_body_pose() {
        let mut b = ModelBuilder::new();
        let body = b.add_body(BodySpec {
            pos: [1.0, 2.0, 3.0],
            ..BodySpec::default()
        });
        let _ = b.add_joint(JointSpec {
            body,
            kind: JointType::Free,
            ..JointSpec::default()
        });
        let m = b.build().unwrap();
        assert_eq!(m.nq, 7);
        assert_eq!(m.nv, 6);
        assert_eq!(m.qpos0, vec![1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_second_joint_on_body() {
        let mut b = pendulum();
        let _ = b.add_joint(JointSpec {
            body: 1,
            ..JointSpec::default()
        });
        assert!(matches!(b.build(), Err(SimviewError::InvalidModel(_))));
    }

    #[test]
    fn rejects_nested_free_joint() {
        let mut b = pendulum();
        let child = b.add_body(BodySpec {
            parent: 1,
            ..BodySpec::default()
        });
        let _ = b.add_joint(JointSpec {
            body: child,
            kind: JointType::Free,
            ..JointSpec::default()
        });
        assert!(b.build().is_err());
    }

    #[test]
    fn rejects_massless_dynamic_body() {
        let mut b = pendulum();
        b.bodies[1].mass = 0.0;
        assert!(b.build().is_err());
    }

    #[test]
    fn dangling_mesh_id_is_accepted() {
        let mut b = pendulum();
        b.add_geom(GeomSpec {
            body: 1,
            kind: GeomType::Mesh,
            mesh: Some(7),
            ..GeomSpec::default()
        });
        let m = b.build().unwrap();
        assert_eq!(m.geom_dataid[1], Some(7));
    }

    #[test]
    fn geoms_grouped_by_body() {
        let mut b = pendulum();
        b.add_geom(GeomSpec {
            body: 0,
            kind: GeomType::Plane,
            ..GeomSpec::default()
        });
        let m = b.build().unwrap();
        assert_eq!(m.geom_bodyid, vec![0, 1]);
        assert_eq!(m.body_geomadr[1], 1);
    }

    #[test]
    fn computes_missing_normals() {
        let mut b = ModelBuilder::new();
        let _ = b.add_mesh(MeshSpec {
            vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            faces: vec![[0, 1, 2]],
            ..MeshSpec::default()
        });
        let m = b.build().unwrap();
        assert_eq!(&m.mesh_normal[0..3], &[0.0, 0.0, 1.0]);
        assert_eq!(m.mesh_texcoordadr, vec![None]);
    }

    #[test]
    fn keyframe_length_checked() {
        let mut b = pendulum();
        b.add_keyframe(vec![0.1, 0.2]);
        assert!(b.build().is_err());

        let mut b = pendulum();
        b.add_keyframe(vec![0.3]);
        let m = b.build().unwrap();
        assert_eq!(m.keyframe(0), Some(&[0.3][..]));
        assert_eq!(m.keyframe(1), None);
    }
}
