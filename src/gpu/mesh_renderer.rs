//! Instanced mesh pass for scene visuals and tendon pools.
//!
//! Every visual gets its own vertex/index buffers, tessellated once per
//! scene, and one instance slot that is rewritten each frame from the
//! synced node transforms. Tendon beads and links share a unit sphere and a
//! unit cylinder. Opaque geometry is drawn first, then blended visuals with
//! depth writes off.

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use super::dynamic_buffer::DynamicBuffer;
use super::render_context::{RenderContext, DEPTH_FORMAT};
use crate::camera::{Camera, CameraUniform};
use crate::scene::tessellate::tessellate;
use crate::scene::{Geometry, Instance, LightKind, MeshData, SceneGraph, Visual};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.11,
    g: 0.13,
    b: 0.16,
    a: 1.0,
};

const AMBIENT: f32 = 0.25;

/// Key light used when the model declares no directional light.
const DEFAULT_LIGHT_DIRECTION: Vec3 = Vec3::new(-0.35, -1.0, -0.45);

/// Shading parameters of tendon instances: emission, specular, shininess.
const TENDON_SHADING: [f32; 3] = [0.0, 0.3, 0.5];

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    const fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Per-instance shader input.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    /// Column-major model matrix.
    pub model: [[f32; 4]; 4],
    /// Base color.
    pub color: [f32; 4],
    /// Emission, specular, shininess, selected (0 or 1).
    pub params: [f32; 4],
}

impl InstanceRaw {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
    ];

    const fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct LightUniform {
    direction: [f32; 4],
    color: [f32; 4],
    ambient: [f32; 4],
}

/// Instance of `visual` at its owning node's current pose.
#[must_use]
pub fn visual_instance(graph: &SceneGraph, visual: &Visual) -> InstanceRaw {
    let selected = graph.node(visual.body).is_some_and(|node| node.selected);
    let material = visual.material;
    InstanceRaw {
        model: graph.visual_world(visual).to_matrix().to_cols_array_2d(),
        color: material.color,
        params: [
            material.emission,
            material.specular,
            material.shininess,
            if selected { 1.0 } else { 0.0 },
        ],
    }
}

/// Instance of a pooled tendon primitive.
#[must_use]
pub fn pooled_instance(instance: &Instance) -> InstanceRaw {
    let model = Mat4::from_scale_rotation_translation(
        instance.scale,
        instance.rotation,
        instance.translation,
    );
    let [emission, specular, shininess] = TENDON_SHADING;
    InstanceRaw {
        model: model.to_cols_array_2d(),
        color: instance.color,
        params: [emission, specular, shininess, 0.0],
    }
}

/// First directional light of the scene, or the default key light.
fn light_uniform(graph: &SceneGraph) -> LightUniform {
    let (direction, color) = graph
        .lights()
        .iter()
        .find(|light| light.kind == LightKind::Directional)
        .map_or((DEFAULT_LIGHT_DIRECTION, [1.0; 3]), |light| {
            (light.direction, light.color)
        });
    let direction = direction.try_normalize().unwrap_or(Vec3::NEG_Y);
    LightUniform {
        direction: direction.extend(0.0).to_array(),
        color: [color[0], color[1], color[2], 1.0],
        ambient: [AMBIENT, AMBIENT, AMBIENT, 1.0],
    }
}

/// Vertex and index buffers of one mesh.
struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &MeshData) -> Option<Self> {
        if mesh.indices.is_empty() || mesh.positions.len() != mesh.normals.len() {
            return None;
        }
        let index_count = u32::try_from(mesh.indices.len()).ok()?;
        let vertices: Vec<Vertex> = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .map(|(&position, &normal)| Vertex { position, normal })
            .collect();
        Some(Self {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count,
        })
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        pass.set_vertex_buffer(0, self.vertices.slice(..));
        pass.set_index_buffer(self.indices.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.index_count, 0, instances);
    }
}

/// Draws scene visuals and tendon pools.
pub struct MeshRenderer {
    opaque_pipeline: wgpu::RenderPipeline,
    blended_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    light_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    camera_uniform: CameraUniform,
    /// One slot per scene visual, `None` where tessellation failed.
    visual_meshes: Vec<Option<GpuMesh>>,
    opaque_visuals: Vec<u32>,
    blended_visuals: Vec<u32>,
    visual_instances: DynamicBuffer<InstanceRaw>,
    bead_mesh: Option<GpuMesh>,
    link_mesh: Option<GpuMesh>,
    bead_instances: DynamicBuffer<InstanceRaw>,
    link_instances: DynamicBuffer<InstanceRaw>,
}

impl MeshRenderer {
    /// Pipelines and buffers for the surface of `context`.
    #[must_use]
    pub fn new(context: &RenderContext) -> Self {
        let device = &context.device;
        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform"),
            contents: bytemuck::bytes_of(&camera_uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Uniform"),
            contents: bytemuck::bytes_of(&light_uniform(&SceneGraph::default())),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Mesh Bind Group Layout"),
            entries: &[uniform_entry(0), uniform_entry(1)],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Bind Group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: light_buffer.as_entire_binding(),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::include_wgsl!("shaders/mesh.wgsl"));
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let format = context.format();
        let opaque_pipeline = create_pipeline(device, &pipeline_layout, &shader, format, true);
        let blended_pipeline = create_pipeline(device, &pipeline_layout, &shader, format, false);

        let instance_usage = wgpu::BufferUsages::VERTEX;
        let unit_sphere = tessellate(&Geometry::Sphere { radius: 1.0 }, &[]);
        let unit_cylinder = tessellate(
            &Geometry::Cylinder {
                radius: 1.0,
                length: 1.0,
            },
            &[],
        );

        Self {
            opaque_pipeline,
            blended_pipeline,
            camera_buffer,
            light_buffer,
            bind_group,
            camera_uniform,
            visual_meshes: Vec::new(),
            opaque_visuals: Vec::new(),
            blended_visuals: Vec::new(),
            visual_instances: DynamicBuffer::new(device, "Visual Instances", 0, instance_usage),
            bead_mesh: unit_sphere.and_then(|m| GpuMesh::upload(device, "Tendon Bead", &m)),
            link_mesh: unit_cylinder.and_then(|m| GpuMesh::upload(device, "Tendon Link", &m)),
            bead_instances: DynamicBuffer::new(device, "Bead Instances", 0, instance_usage),
            link_instances: DynamicBuffer::new(device, "Link Instances", 0, instance_usage),
        }
    }

    /// Upload the meshes of a newly built scene, replacing the previous ones.
    pub fn set_scene(&mut self, context: &RenderContext, graph: &SceneGraph) {
        self.visual_meshes = graph
            .visuals()
            .iter()
            .map(|visual| {
                let mesh = tessellate(&visual.geometry, graph.meshes());
                if mesh.is_none() {
                    log::warn!("visual of geom {} has no mesh", visual.geom);
                }
                mesh.and_then(|m| GpuMesh::upload(&context.device, "Visual Mesh", &m))
            })
            .collect();

        self.opaque_visuals.clear();
        self.blended_visuals.clear();
        for (index, visual) in graph.visuals().iter().enumerate() {
            let Ok(index) = u32::try_from(index) else {
                break;
            };
            if visual.material.is_transparent() {
                self.blended_visuals.push(index);
            } else {
                self.opaque_visuals.push(index);
            }
        }

        context.queue.write_buffer(
            &self.light_buffer,
            0,
            bytemuck::bytes_of(&light_uniform(graph)),
        );
        log::debug!(
            "mesh renderer: {} opaque, {} blended visuals",
            self.opaque_visuals.len(),
            self.blended_visuals.len()
        );
    }

    /// Write this frame's camera and instance data.
    pub fn prepare(&mut self, context: &RenderContext, graph: &SceneGraph, camera: &Camera) {
        self.camera_uniform.update_view_proj(camera);
        context.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&self.camera_uniform),
        );

        let visuals: Vec<InstanceRaw> = graph
            .visuals()
            .iter()
            .map(|visual| visual_instance(graph, visual))
            .collect();
        let _ = self
            .visual_instances
            .write(&context.device, &context.queue, &visuals);

        let tendons = graph.tendons();
        let beads: Vec<InstanceRaw> = tendons.beads.instances().iter().map(pooled_instance).collect();
        let links: Vec<InstanceRaw> = tendons.links.instances().iter().map(pooled_instance).collect();
        let _ = self
            .bead_instances
            .write(&context.device, &context.queue, &beads);
        let _ = self
            .link_instances
            .write(&context.device, &context.queue, &links);
    }

    /// Clear `target` and draw everything prepared for this frame.
    pub fn render(&self, context: &RenderContext, target: &wgpu::TextureView) {
        let mut encoder = context.create_encoder();
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: context.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            pass.set_bind_group(0, &self.bind_group, &[]);

            pass.set_pipeline(&self.opaque_pipeline);
            self.draw_visuals(&mut pass, &self.opaque_visuals);
            self.draw_tendons(&mut pass);

            pass.set_pipeline(&self.blended_pipeline);
            self.draw_visuals(&mut pass, &self.blended_visuals);
        }
        context.submit(encoder);
    }

    fn draw_visuals(&self, pass: &mut wgpu::RenderPass<'_>, indices: &[u32]) {
        if self.visual_instances.is_empty() {
            return;
        }
        pass.set_vertex_buffer(1, self.visual_instances.buffer().slice(..));
        for &index in indices {
            if let Some(Some(mesh)) = self.visual_meshes.get(index as usize) {
                mesh.draw(pass, index..index + 1);
            }
        }
    }

    fn draw_tendons(&self, pass: &mut wgpu::RenderPass<'_>) {
        for (mesh, instances) in [
            (&self.bead_mesh, &self.bead_instances),
            (&self.link_mesh, &self.link_instances),
        ] {
            let (Some(mesh), Ok(count)) = (mesh, u32::try_from(instances.len())) else {
                continue;
            };
            if count == 0 {
                continue;
            }
            pass.set_vertex_buffer(1, instances.buffer().slice(..));
            mesh.draw(pass, 0..count);
        }
    }
}

const fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    opaque: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(if opaque { "Opaque Mesh Pipeline" } else { "Blended Mesh Pipeline" }),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[Vertex::layout(), InstanceRaw::layout()],
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: opaque,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(if opaque {
                    wgpu::BlendState::REPLACE
                } else {
                    wgpu::BlendState::ALPHA_BLENDING
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::options::SceneOptions;
    use crate::sim::{fixtures, RapierSimulation};

    fn walker_graph() -> SceneGraph {
        let sim = RapierSimulation::new(fixtures::walker()).unwrap();
        crate::scene::build(&sim, &SceneOptions::default(), &mut |_| {})
    }

    #[test]
    fn instance_layout_matches_shader() {
        assert_eq!(size_of::<InstanceRaw>(), 96);
        assert_eq!(size_of::<Vertex>(), 24);
        assert_eq!(size_of::<LightUniform>(), 48);
    }

    #[test]
    fn selection_sets_the_tint_flag() {
        let mut graph = walker_graph();
        let visual = graph
            .visuals()
            .iter()
            .find(|v| v.body != 0)
            .cloned()
            .unwrap();
        assert_eq!(visual_instance(&graph, &visual).params[3], 0.0);
        let _ = graph.toggle_selected(visual.body);
        let instance = visual_instance(&graph, &visual);
        assert_eq!(instance.params[3], 1.0);
        assert_eq!(instance.color, visual.material.color);
    }

    #[test]
    fn visual_instance_uses_world_pose() {
        let graph = walker_graph();
        let visual = &graph.visuals()[0];
        let model = Mat4::from_cols_array_2d(&visual_instance(&graph, visual).model);
        let expected = graph.visual_world(visual).translation;
        assert!((model.w_axis.truncate() - expected).length() < 1e-6);
    }

    #[test]
    fn pooled_instance_scales_unit_primitive() {
        let instance = Instance {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::new(0.1, 2.0, 0.1),
            color: [1.0, 0.0, 0.0, 1.0],
        };
        let model = Mat4::from_cols_array_2d(&pooled_instance(&instance).model);
        let top = model.transform_point3(Vec3::new(0.0, 0.5, 0.0));
        assert!((top - Vec3::new(1.0, 3.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn default_light_without_directional_lights() {
        let light = light_uniform(&SceneGraph::default());
        let direction = Vec3::from_slice(&light.direction[..3]);
        assert!((direction - DEFAULT_LIGHT_DIRECTION.normalize()).length() < 1e-6);
        assert_eq!(light.color, [1.0; 4]);
    }
}
