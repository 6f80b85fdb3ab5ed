use std::collections::{BTreeMap, BTreeSet};

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use hatchlight_common::{GeometryId, MaterialId, NodeId};
use hatchlight_render::PerspectiveCamera;
use hatchlight_scene::{Geometry, Scene};
use hatchlight_shading::ShaderProgramBinding;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct NodeUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

struct MeshBuffers {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct UniformBlock {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// wgpu-based scene renderer.
pub struct WgpuRenderer {
    surface_format: wgpu::TextureFormat,
    node_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    camera: UniformBlock,
    pipelines: BTreeMap<String, wgpu::RenderPipeline>,
    meshes: BTreeMap<GeometryId, MeshBuffers>,
    nodes: BTreeMap<NodeId, UniformBlock>,
    materials: BTreeMap<MaterialId, UniformBlock>,
    depth_texture: wgpu::TextureView,
    clear_color: wgpu::Color,
}

fn uniform_layout(
    device: &wgpu::Device,
    label: &str,
    visibility: wgpu::ShaderStages,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn uniform_block(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    contents: &[u8],
) -> UniformBlock {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
    });
    UniformBlock { buffer, bind_group }
}

fn node_uniform(model: Mat4) -> NodeUniform {
    NodeUniform {
        model: model.to_cols_array_2d(),
        normal: model.inverse().transpose().to_cols_array_2d(),
    }
}

impl WgpuRenderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let camera_layout = uniform_layout(device, "camera_layout", wgpu::ShaderStages::VERTEX);
        let node_layout = uniform_layout(device, "node_layout", wgpu::ShaderStages::VERTEX);
        let material_layout =
            uniform_layout(device, "material_layout", wgpu::ShaderStages::FRAGMENT);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&camera_layout, &node_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let camera = uniform_block(
            device,
            &camera_layout,
            "camera_uniform",
            bytemuck::bytes_of(&CameraUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }),
        );

        Self {
            surface_format,
            node_layout,
            material_layout,
            pipeline_layout,
            camera,
            pipelines: BTreeMap::new(),
            meshes: BTreeMap::new(),
            nodes: BTreeMap::new(),
            materials: BTreeMap::new(),
            depth_texture: Self::create_depth_texture(device, width, height),
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.0,
                a: 1.0,
            },
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture = Self::create_depth_texture(device, width, height);
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn set_clear_color(&mut self, color: wgpu::Color) {
        self.clear_color = color;
    }

    /// Number of cached pipelines (one per distinct program).
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    fn pipeline_for(
        &mut self,
        device: &wgpu::Device,
        binding: &ShaderProgramBinding,
    ) -> &wgpu::RenderPipeline {
        let format = self.surface_format;
        let layout = &self.pipeline_layout;
        self.pipelines.entry(binding.label().to_string()).or_insert_with(|| {
            let source = binding.source();
            let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{}_vertex", source.label)),
                source: wgpu::ShaderSource::Wgsl(source.vertex.as_str().into()),
            });
            let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{}_fragment", source.label)),
                source: wgpu::ShaderSource::Wgsl(source.fragment.as_str().into()),
            });
            tracing::debug!(program = %source.label, "pipeline created");

            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&source.label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &vertex_module,
                    entry_point: binding.compiled().vertex_entry.as_deref(),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                        ],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment_module,
                    entry_point: binding.compiled().fragment_entry.as_deref(),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: Some(wgpu::Face::Back),
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: Default::default(),
                    bias: Default::default(),
                }),
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
        })
    }

    fn upload_mesh(device: &wgpu::Device, geometry: &Geometry) -> MeshBuffers {
        let vertices: Vec<Vertex> = geometry
            .positions
            .iter()
            .zip(&geometry.normals)
            .map(|(position, normal)| Vertex {
                position: *position,
                normal: *normal,
            })
            .collect();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}_vertices", geometry.name)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{}_indices", geometry.name)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        MeshBuffers {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
        }
    }

    /// Bring GPU resources in line with the scene and upload changed data.
    fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &mut Scene) {
        let live_geometries: BTreeSet<GeometryId> = scene.geometries().map(|(id, _)| id).collect();
        self.meshes.retain(|id, _| live_geometries.contains(id));
        for (id, geometry) in scene.geometries() {
            self.meshes
                .entry(id)
                .or_insert_with(|| Self::upload_mesh(device, geometry));
        }

        let live_nodes: BTreeSet<NodeId> = scene.nodes().map(|(id, _)| id).collect();
        self.nodes.retain(|id, _| live_nodes.contains(id));
        for (id, node) in scene.nodes() {
            let uniform = node_uniform(node.transform().matrix());
            match self.nodes.get(&id) {
                Some(block) => queue.write_buffer(&block.buffer, 0, bytemuck::bytes_of(&uniform)),
                None => {
                    let bytes = bytemuck::bytes_of(&uniform);
                    let block = uniform_block(device, &self.node_layout, node.name(), bytes);
                    self.nodes.insert(id, block);
                }
            }
        }

        let live_materials: BTreeSet<MaterialId> = scene.materials().map(|(id, _)| id).collect();
        self.materials.retain(|id, _| live_materials.contains(id));
        for (id, material) in scene.materials_mut() {
            let fresh = !self.materials.contains_key(&id);
            if !fresh && !material.needs_upload() {
                continue;
            }
            let slots = match material.pack_slots() {
                Ok(slots) => slots,
                Err(err) => {
                    tracing::warn!(%err, "material upload skipped");
                    continue;
                }
            };
            let bytes: &[u8] = bytemuck::cast_slice(&slots);
            match self.materials.get(&id) {
                Some(block) => queue.write_buffer(&block.buffer, 0, bytes),
                None => {
                    let block =
                        uniform_block(device, &self.material_layout, material.name(), bytes);
                    self.materials.insert(id, block);
                }
            }
            material.mark_uploaded();
        }
    }

    /// Render one frame of `scene` into `view`.
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        scene: &mut Scene,
        camera: &PerspectiveCamera,
    ) {
        queue.write_buffer(
            &self.camera.buffer,
            0,
            bytemuck::bytes_of(&CameraUniform {
                view_proj: camera.view_projection().to_cols_array_2d(),
            }),
        );
        self.sync(device, queue, scene);

        // Draw list first so pipeline creation can borrow self mutably.
        let draws: Vec<_> = scene
            .nodes()
            .filter_map(|(id, node)| {
                let material = scene.material(node.material())?;
                Some((id, node.geometry(), node.material(), material.binding().clone()))
            })
            .collect();
        for (_, _, _, binding) in &draws {
            self.pipeline_for(device, binding);
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.camera.bind_group, &[]);
            for (node, geometry, material, binding) in &draws {
                let (Some(pipeline), Some(mesh), Some(node_block), Some(material_block)) = (
                    self.pipelines.get(binding.label()),
                    self.meshes.get(geometry),
                    self.nodes.get(node),
                    self.materials.get(material),
                ) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &node_block.bind_group, &[]);
                pass.set_bind_group(2, &material_block.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&Default::default())
    }
}
