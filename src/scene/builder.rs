//! One-shot construction of a [`SceneGraph`] from a loaded simulation.

use std::fmt;

use glam::Vec3;
use rustc_hash::FxHashMap;

use super::graph::{
    CameraNode, Geometry, LightKind, LightNode, Material, MeshData, SceneGraph, SceneNode,
    Texture, Transform, Visual,
};
use super::sync;
use super::tendon::TendonPools;
use crate::coords::{to_render_orientation, to_render_position};
use crate::options::SceneOptions;
use crate::sim::{GeomType, Model, Simulation};

/// Load-time problem with one visual element. The element is skipped or
/// degraded; the rest of the scene is still built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A mesh geom references a mesh that does not exist.
    MissingMesh {
        /// Offending geom.
        geom: usize,
        /// Referenced mesh id, if any.
        mesh: Option<usize>,
    },
    /// A mesh's address/count pairs point outside the mesh buffers.
    MalformedMesh {
        /// Offending mesh.
        mesh: usize,
    },
    /// A geom references a material that does not exist.
    MissingMaterial {
        /// Offending geom.
        geom: usize,
        /// Referenced material id.
        material: usize,
    },
    /// A material references a texture that does not exist or is truncated.
    MissingTexture {
        /// Offending material.
        material: usize,
        /// Referenced texture id.
        texture: usize,
    },
    /// A geom type with no visual representation.
    UnsupportedGeom {
        /// Offending geom.
        geom: usize,
        /// Its type.
        kind: GeomType,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMesh { geom, mesh: Some(mesh) } => {
                write!(f, "geom {geom}: mesh {mesh} not found, skipped")
            }
            Self::MissingMesh { geom, mesh: None } => {
                write!(f, "geom {geom}: mesh geom without a mesh id, skipped")
            }
            Self::MalformedMesh { mesh } => {
                write!(f, "mesh {mesh}: buffer ranges out of bounds, skipped")
            }
            Self::MissingMaterial { geom, material } => write!(
                f,
                "geom {geom}: material {material} not found, using default"
            ),
            Self::MissingTexture { material, texture } => write!(
                f,
                "material {material}: texture {texture} not found, untextured"
            ),
            Self::UnsupportedGeom { geom, kind } => {
                write!(f, "geom {geom}: {kind:?} is not rendered")
            }
        }
    }
}

/// Build the scene graph for `sim`'s model and sync it to the current state.
///
/// Every body gets a node, even without visuals. Problems with individual
/// visual elements are reported through `on_diagnostic` and never abort the
/// build.
pub fn build(
    sim: &dyn Simulation,
    options: &SceneOptions,
    on_diagnostic: &mut dyn FnMut(Diagnostic),
) -> SceneGraph {
    let model = sim.model();
    let mut ctx = BuildContext {
        model,
        options,
        graph: SceneGraph {
            tendons: TendonPools::for_model(model, options.min_tendon_capacity),
            ..SceneGraph::default()
        },
        mesh_cache: FxHashMap::default(),
        texture_cache: FxHashMap::default(),
        on_diagnostic,
    };

    ctx.add_nodes();
    for g in 0..model.ngeom {
        ctx.add_geom(g);
    }
    ctx.add_lights();
    ctx.add_cameras();

    let mut graph = ctx.graph;
    let _ = sync::sync(&mut graph, sim);
    log::info!(
        "scene built: {} nodes, {} visuals, {} meshes, {} textures, {} lights",
        graph.nodes.len(),
        graph.visuals.len(),
        graph.meshes.len(),
        graph.textures.len(),
        graph.lights.len()
    );
    graph
}

struct BuildContext<'a> {
    model: &'a Model,
    options: &'a SceneOptions,
    graph: SceneGraph,
    mesh_cache: FxHashMap<usize, usize>,
    texture_cache: FxHashMap<usize, usize>,
    on_diagnostic: &'a mut dyn FnMut(Diagnostic),
}

impl BuildContext<'_> {
    fn report(&mut self, diagnostic: Diagnostic) {
        log::warn!("{diagnostic}");
        (self.on_diagnostic)(diagnostic);
    }

    fn add_nodes(&mut self) {
        let m = self.model;
        for b in 0..m.nbody {
            let parent = (b > 0).then(|| m.body_parentid[b]);
            let name = m.body_name.get(b).cloned().unwrap_or_default();
            if !name.is_empty() {
                let _ = self.graph.names.entry(name.clone()).or_insert(b);
            }
            self.graph.nodes.push(SceneNode {
                body: b,
                name,
                parent,
                children: Vec::new(),
                local: Transform::IDENTITY,
                world: Transform::IDENTITY,
                visuals: Vec::new(),
                selected: false,
            });
            if let Some(p) = parent {
                self.graph.nodes[p].children.push(b);
            }
        }
    }

    fn add_geom(&mut self, g: usize) {
        let m = self.model;
        if m.geom_group[g] >= self.options.max_visible_group {
            return;
        }
        let Some(geometry) = self.geometry_for(g) else {
            return;
        };
        let body = m.geom_bodyid[g];
        if body >= self.graph.nodes.len() {
            return;
        }
        let material = self.material_for(g);
        let kind = m.geom_type[g];
        let local = Transform::new(
            to_render_position(&m.geom_pos, g),
            to_render_orientation(&m.geom_quat, g).normalize(),
        );

        let index = self.graph.visuals.len();
        self.graph.visuals.push(Visual {
            geom: g,
            body,
            geometry,
            local,
            material,
            cast_shadow: body != 0,
            receive_shadow: kind != GeomType::Mesh,
        });
        self.graph.nodes[body].visuals.push(index);
    }

    fn geometry_for(&mut self, g: usize) -> Option<Geometry> {
        let m = self.model;
        let s = [
            m.geom_size[g * 3] as f32,
            m.geom_size[g * 3 + 1] as f32,
            m.geom_size[g * 3 + 2] as f32,
        ];
        let geometry = match m.geom_type[g] {
            GeomType::Plane => {
                let extent = |half: f32| {
                    if half > 0.0 {
                        half * 2.0
                    } else {
                        self.options.infinite_plane_size
                    }
                };
                Geometry::Plane {
                    width: extent(s[0]),
                    depth: extent(s[1]),
                }
            }
            GeomType::HeightField => {
                self.report(Diagnostic::UnsupportedGeom {
                    geom: g,
                    kind: GeomType::HeightField,
                });
                return None;
            }
            GeomType::Sphere => Geometry::Sphere { radius: s[0] },
            GeomType::Capsule => Geometry::Capsule {
                radius: s[0],
                length: s[1] * 2.0,
            },
            GeomType::Ellipsoid => Geometry::Ellipsoid {
                radii: Vec3::new(s[0], s[2], s[1]),
            },
            GeomType::Cylinder => Geometry::Cylinder {
                radius: s[0],
                length: s[1] * 2.0,
            },
            GeomType::Box => Geometry::Box {
                half_extents: Vec3::new(s[0], s[2], s[1]),
            },
            GeomType::Mesh => {
                let mesh = self.mesh_for(g)?;
                Geometry::Mesh { mesh }
            }
        };
        Some(geometry)
    }

    /// Scene mesh for mesh geom `g`, converting and caching the model mesh on
    /// first use.
    fn mesh_for(&mut self, g: usize) -> Option<usize> {
        let m = self.model;
        let Some(id) = m.geom_dataid[g].filter(|&id| id < m.nmesh) else {
            self.report(Diagnostic::MissingMesh {
                geom: g,
                mesh: m.geom_dataid[g],
            });
            return None;
        };
        if let Some(&cached) = self.mesh_cache.get(&id) {
            return Some(cached);
        }
        let Some(data) = convert_mesh(m, id) else {
            self.report(Diagnostic::MalformedMesh { mesh: id });
            return None;
        };
        let index = self.graph.meshes.len();
        self.graph.meshes.push(data);
        let _ = self.mesh_cache.insert(id, index);
        Some(index)
    }

    fn material_for(&mut self, g: usize) -> Material {
        let m = self.model;
        let geom_rgba = [
            m.geom_rgba[g * 4],
            m.geom_rgba[g * 4 + 1],
            m.geom_rgba[g * 4 + 2],
            m.geom_rgba[g * 4 + 3],
        ];
        let Some(mat) = m.geom_matid[g] else {
            return Material {
                color: geom_rgba,
                ..Material::default()
            };
        };
        if mat >= m.nmat {
            self.report(Diagnostic::MissingMaterial { geom: g, material: mat });
            return Material {
                color: geom_rgba,
                ..Material::default()
            };
        }

        let texture = m.mat_texid[mat].and_then(|tex| self.texture_for(mat, tex));
        Material {
            color: [
                m.mat_rgba[mat * 4],
                m.mat_rgba[mat * 4 + 1],
                m.mat_rgba[mat * 4 + 2],
                m.mat_rgba[mat * 4 + 3],
            ],
            texture,
            texrepeat: [m.mat_texrepeat[mat * 2], m.mat_texrepeat[mat * 2 + 1]],
            specular: m.mat_specular[mat],
            shininess: m.mat_shininess[mat],
            reflectance: m.mat_reflectance[mat],
            emission: m.mat_emission[mat],
        }
    }

    fn texture_for(&mut self, material: usize, tex: usize) -> Option<usize> {
        if let Some(&cached) = self.texture_cache.get(&tex) {
            return Some(cached);
        }
        let Some(texture) = expand_texture(self.model, tex) else {
            self.report(Diagnostic::MissingTexture {
                material,
                texture: tex,
            });
            return None;
        };
        let index = self.graph.textures.len();
        self.graph.textures.push(texture);
        let _ = self.texture_cache.insert(tex, index);
        Some(index)
    }

    fn add_lights(&mut self) {
        let m = self.model;
        for l in 0..m.nlight {
            let kind = if m.light_directional[l] {
                LightKind::Directional
            } else {
                LightKind::Spot {
                    cutoff: m.light_cutoff[l],
                }
            };
            self.graph.lights.push(LightNode {
                source: Some(l),
                kind,
                position: Vec3::ZERO,
                direction: Vec3::NEG_Y,
                target: Vec3::NEG_Y,
                color: [
                    m.light_diffuse[l * 3],
                    m.light_diffuse[l * 3 + 1],
                    m.light_diffuse[l * 3 + 2],
                ],
                decay: m.light_attenuation[l * 3] * 100.0,
                cast_shadow: m.light_castshadow[l],
            });
        }
        if m.nlight == 0 && self.options.default_light {
            let direction = Vec3::new(-0.3, -1.0, -0.5).normalize();
            let position = Vec3::new(1.5, 5.0, 2.5);
            self.graph.lights.push(LightNode {
                source: None,
                kind: LightKind::Directional,
                position,
                direction,
                target: position + direction,
                color: [1.0, 1.0, 1.0],
                decay: 0.0,
                cast_shadow: true,
            });
        }
    }

    fn add_cameras(&mut self) {
        let m = self.model;
        for c in 0..m.ncam {
            self.graph.cameras.push(CameraNode {
                camera: c,
                position: Vec3::ZERO,
                direction: Vec3::NEG_Z,
                target: Vec3::NEG_Z,
                fovy: m.cam_fovy[c] as f32,
            });
        }
    }
}

/// Slice mesh `id` out of the model buffers and convert it to render axes.
fn convert_mesh(m: &Model, id: usize) -> Option<MeshData> {
    let vstart = m.mesh_vertadr[id] * 3;
    let vend = vstart + m.mesh_vertnum[id] * 3;
    let fstart = m.mesh_faceadr[id] * 3;
    let fend = fstart + m.mesh_facenum[id] * 3;

    let to_render = |c: &[f32]| [c[0], c[2], -c[1]];
    let positions: Vec<[f32; 3]> = m
        .mesh_vert
        .get(vstart..vend)?
        .chunks_exact(3)
        .map(to_render)
        .collect();
    let normals: Vec<[f32; 3]> = m
        .mesh_normal
        .get(vstart..vend)?
        .chunks_exact(3)
        .map(to_render)
        .collect();
    let uvs = match m.mesh_texcoordadr[id] {
        Some(adr) => Some(
            m.mesh_texcoord
                .get(adr * 2..(adr + m.mesh_vertnum[id]) * 2)?
                .chunks_exact(2)
                .map(|c| [c[0], c[1]])
                .collect(),
        ),
        None => None,
    };
    let indices = m.mesh_face.get(fstart..fend)?.to_vec();
    if indices.iter().any(|&i| i as usize >= positions.len()) {
        return None;
    }
    Some(MeshData {
        positions,
        normals,
        uvs,
        indices,
    })
}

/// Expand packed RGB texels into RGBA with opaque alpha.
fn expand_texture(m: &Model, tex: usize) -> Option<Texture> {
    let width = *m.tex_width.get(tex)?;
    let height = *m.tex_height.get(tex)?;
    let start = *m.tex_adr.get(tex)?;
    let rgb = m.tex_rgb.get(start..start + width * height * 3)?;
    let mut rgba = Vec::with_capacity(width * height * 4);
    for texel in rgb.chunks_exact(3) {
        rgba.extend_from_slice(&[texel[0], texel[1], texel[2], 255]);
    }
    Some(Texture {
        width: width as u32,
        height: height as u32,
        rgba,
    })
}
