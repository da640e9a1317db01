use glam::{Mat4, Quat, Vec3};
use rustc_hash::FxHashMap;

use super::tendon::TendonPools;

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Rigid transform (rotation then translation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation.
    pub translation: Vec3,
    /// Rotation.
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Transform from parts.
    #[must_use]
    pub const fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// `self` followed by `child`, i.e. `child` expressed in `self`'s frame.
    #[must_use]
    pub fn compose(&self, child: &Self) -> Self {
        Self {
            translation: self.translation + self.rotation * child.translation,
            rotation: (self.rotation * child.rotation).normalize(),
        }
    }

    /// Inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            translation: rotation * -self.translation,
            rotation,
        }
    }

    /// Map a local point to the parent frame.
    #[must_use]
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.translation + self.rotation * p
    }

    /// Map a parent-frame point into this local frame.
    #[must_use]
    pub fn inverse_transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.inverse() * (p - self.translation)
    }

    /// Rotate a local direction into the parent frame.
    #[must_use]
    pub fn transform_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    /// Column-major model matrix.
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Whether every component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.translation.is_finite() && self.rotation.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Geometry and appearance
// ---------------------------------------------------------------------------

/// Render primitive of a visual. Dimensions are full extents in render axes;
/// axial shapes run along local Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    /// Ground quad in the local XZ plane.
    Plane {
        /// Extent along X.
        width: f32,
        /// Extent along Z.
        depth: f32,
    },
    /// Sphere.
    Sphere {
        /// Radius.
        radius: f32,
    },
    /// Capsule along Y.
    Capsule {
        /// Radius of the caps and shaft.
        radius: f32,
        /// Length of the cylindrical shaft (caps excluded).
        length: f32,
    },
    /// Ellipsoid with the given semi-axes.
    Ellipsoid {
        /// Semi-axes along X, Y, Z.
        radii: Vec3,
    },
    /// Cylinder along Y.
    Cylinder {
        /// Radius.
        radius: f32,
        /// Height.
        length: f32,
    },
    /// Box.
    Box {
        /// Half extents along X, Y, Z.
        half_extents: Vec3,
    },
    /// Triangle mesh stored in [`SceneGraph::meshes`].
    Mesh {
        /// Index into [`SceneGraph::meshes`].
        mesh: usize,
    },
}

/// Triangle mesh in render axes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex positions.
    pub positions: Vec<[f32; 3]>,
    /// Vertex normals.
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinates, if any.
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

/// RGBA8 texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub rgba: Vec<u8>,
}

/// Surface appearance of a visual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Base color.
    pub color: [f32; 4],
    /// Index into [`SceneGraph::textures`].
    pub texture: Option<usize>,
    /// Texture repeat in U and V.
    pub texrepeat: [f32; 2],
    /// Specular intensity.
    pub specular: f32,
    /// Shininess.
    pub shininess: f32,
    /// Reflectance.
    pub reflectance: f32,
    /// Emissive intensity.
    pub emission: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: [0.5, 0.5, 0.5, 1.0],
            texture: None,
            texrepeat: [1.0, 1.0],
            specular: 0.5,
            shininess: 0.5,
            reflectance: 0.0,
            emission: 0.0,
        }
    }
}

impl Material {
    /// Whether the material needs alpha blending.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.color[3] < 1.0
    }
}

/// One drawable shape attached to a body node.
#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    /// Geom this visual was built from.
    pub geom: usize,
    /// Owning body.
    pub body: usize,
    /// Shape.
    pub geometry: Geometry,
    /// Pose relative to the owning node.
    pub local: Transform,
    /// Appearance.
    pub material: Material,
    /// Casts shadows.
    pub cast_shadow: bool,
    /// Receives shadows.
    pub receive_shadow: bool,
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// Transform node of one body.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    /// Body index (equal to the node index).
    pub body: usize,
    /// Body name, possibly empty.
    pub name: String,
    /// Parent node; `None` only for the root.
    pub parent: Option<usize>,
    /// Child nodes.
    pub children: Vec<usize>,
    /// Pose relative to the parent node.
    pub local: Transform,
    /// Pose in the world.
    pub world: Transform,
    /// Indices into [`SceneGraph::visuals`].
    pub visuals: Vec<usize>,
    /// Highlighted by user selection.
    pub selected: bool,
}

/// Kind of a light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Parallel rays along the direction.
    Directional,
    /// Cone of light from the position.
    Spot {
        /// Half-angle in degrees.
        cutoff: f32,
    },
}

/// A light following its body.
#[derive(Debug, Clone, PartialEq)]
pub struct LightNode {
    /// Model light index, `None` for the fallback light.
    pub source: Option<usize>,
    /// Kind.
    pub kind: LightKind,
    /// World position.
    pub position: Vec3,
    /// Unit direction.
    pub direction: Vec3,
    /// Look-at point (`position + direction`).
    pub target: Vec3,
    /// Diffuse color.
    pub color: [f32; 3],
    /// Distance decay.
    pub decay: f32,
    /// Casts shadows.
    pub cast_shadow: bool,
}

/// A model camera that can be tracked by the view.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraNode {
    /// Model camera index.
    pub camera: usize,
    /// World position.
    pub position: Vec3,
    /// Unit viewing direction.
    pub direction: Vec3,
    /// Look-at point.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fovy: f32,
}

// ---------------------------------------------------------------------------
// SceneGraph
// ---------------------------------------------------------------------------

/// Render scene built from one loaded simulation.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    pub(crate) nodes: Vec<SceneNode>,
    pub(crate) visuals: Vec<Visual>,
    pub(crate) meshes: Vec<MeshData>,
    pub(crate) textures: Vec<Texture>,
    pub(crate) lights: Vec<LightNode>,
    pub(crate) cameras: Vec<CameraNode>,
    pub(crate) tendons: TendonPools,
    pub(crate) names: FxHashMap<String, usize>,
}

impl SceneGraph {
    /// Number of body nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The world root node.
    #[must_use]
    pub fn root(&self) -> Option<&SceneNode> {
        self.nodes.first()
    }

    /// Node of body `body`.
    #[must_use]
    pub fn node(&self, body: usize) -> Option<&SceneNode> {
        self.nodes.get(body)
    }

    /// All nodes indexed by body.
    #[must_use]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Node looked up by body name.
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<&SceneNode> {
        self.names.get(name).and_then(|&b| self.nodes.get(b))
    }

    /// All visuals.
    #[must_use]
    pub fn visuals(&self) -> &[Visual] {
        &self.visuals
    }

    /// Shared mesh buffers.
    #[must_use]
    pub fn meshes(&self) -> &[MeshData] {
        &self.meshes
    }

    /// Textures referenced by materials.
    #[must_use]
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    /// Lights.
    #[must_use]
    pub fn lights(&self) -> &[LightNode] {
        &self.lights
    }

    /// Model cameras.
    #[must_use]
    pub fn cameras(&self) -> &[CameraNode] {
        &self.cameras
    }

    /// Tendon bead and link pools.
    #[must_use]
    pub fn tendons(&self) -> &TendonPools {
        &self.tendons
    }

    /// World pose of a visual.
    #[must_use]
    pub fn visual_world(&self, visual: &Visual) -> Transform {
        self.nodes
            .get(visual.body)
            .map_or(visual.local, |node| node.world.compose(&visual.local))
    }

    /// Toggle the selection highlight of a body. Returns the new state.
    pub fn toggle_selected(&mut self, body: usize) -> bool {
        self.nodes.get_mut(body).is_some_and(|node| {
            node.selected = !node.selected;
            node.selected
        })
    }

    /// Remove every selection highlight.
    pub fn clear_selection(&mut self) {
        for node in &mut self.nodes {
            node.selected = false;
        }
    }

    /// Bodies currently highlighted.
    pub fn selected_bodies(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes.iter().filter(|n| n.selected).map(|n| n.body)
    }

    /// Render-space world positions of all body nodes (for camera fitting).
    #[must_use]
    pub fn body_positions(&self) -> Vec<Vec3> {
        self.nodes
            .iter()
            .skip(1)
            .map(|n| n.world.translation)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_inverse_round_trip() {
        let t = Transform::new(
            Vec3::new(1.0, -2.0, 0.5),
            Quat::from_rotation_y(0.8) * Quat::from_rotation_x(-0.3),
        );
        let p = Vec3::new(0.3, 0.7, -1.1);
        let q = t.inverse().transform_point(t.transform_point(p));
        assert!((p - q).length() < 1e-5);
        assert!((t.inverse_transform_point(t.transform_point(p)) - p).length() < 1e-5);
    }

    #[test]
    fn compose_matches_matrix_product() {
        let a = Transform::new(Vec3::X, Quat::from_rotation_z(0.5));
        let b = Transform::new(Vec3::Y, Quat::from_rotation_x(1.0));
        let m = a.to_matrix() * b.to_matrix();
        let c = a.compose(&b).to_matrix();
        assert!(m.abs_diff_eq(c, 1e-5));
    }
}
