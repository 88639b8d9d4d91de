// src/rendering_lib/renderer.rs

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::engine_lib::camera::PerspectiveCamera;
use crate::engine_lib::uniforms::UniformTable;
use crate::error::SceneError;
use crate::rendering_lib::backend::{GeometryHandle, MaterialHandle, MeshHandle, RenderBackend};
use crate::rendering_lib::geometry::{GeometryDescriptor, Topology};
use crate::rendering_lib::material::{BlendMode, MaterialDescriptor, Side};
use crate::rendering_lib::shader::compose;
use crate::rendering_lib::vertex::AttributeLayouts;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const UNIFORM_SLOT_BYTES: u64 = 16;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct TransformsUniform {
    view: [[f32; 4]; 4],
    projection: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    camera_position: [f32; 4],
}

impl TransformsUniform {
    fn new(camera: &PerspectiveCamera, model: Mat4) -> Self {
        Self {
            view: camera.view_matrix().to_cols_array_2d(),
            projection: camera.projection_matrix().to_cols_array_2d(),
            model: model.to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
        }
    }
}

struct GpuGeometry {
    buffers: Vec<wgpu::Buffer>,
    indices: Option<(wgpu::Buffer, u32)>,
    vertex_count: u32,
    topology: Topology,
    layouts: AttributeLayouts,
}

struct GpuMaterial {
    label: String,
    vertex_module: wgpu::ShaderModule,
    fragment_module: wgpu::ShaderModule,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    blend: BlendMode,
    depth_write: bool,
    side: Side,
    transparent: bool,
}

struct GpuMesh {
    handle: MeshHandle,
    geometry: GeometryHandle,
    material: MaterialHandle,
    model: Mat4,
    pipeline: wgpu::RenderPipeline,
    transforms_buffer: wgpu::Buffer,
    transforms_bind_group: wgpu::BindGroup,
}

/// A frame whose scene pass is recorded but not yet presented.
struct PendingFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

/// `RenderBackend` on top of wgpu, drawing into a winit window surface.
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    logical_size: (u32, u32),
    pixel_ratio: f32,
    clear_color: wgpu::Color,
    depth_view: wgpu::TextureView,

    transforms_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,

    next_id: u64,
    geometries: HashMap<GeometryHandle, GpuGeometry>,
    materials: HashMap<MaterialHandle, GpuMaterial>,
    meshes: Vec<GpuMesh>,
    pending: Option<PendingFrame>,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>, present_mode: wgpu::PresentMode) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create window surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: Some("Scene Device"),
                },
                None,
            )
            .await
            .context("failed to open GPU device")?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth_view = create_depth_view(&device, config.width, config.height);

        let transforms_layout = create_uniform_layout(&device, "transforms_bind_group_layout");
        let material_layout = create_uniform_layout(&device, "material_bind_group_layout");
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&transforms_layout, &material_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            logical_size: (size.width, size.height),
            pixel_ratio: 1.0,
            clear_color: wgpu::Color::BLACK,
            depth_view,
            transforms_layout,
            material_layout,
            pipeline_layout,
            next_id: 0,
            geometries: HashMap::new(),
            materials: HashMap::new(),
            meshes: Vec::new(),
            pending: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Physical size of the configured surface.
    pub fn surface_size(&self) -> [u32; 2] {
        [self.config.width, self.config.height]
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Reconfigures the surface after it was lost or outdated.
    pub fn reconfigure(&mut self) {
        let width = ((self.logical_size.0 as f32) * self.pixel_ratio).round() as u32;
        let height = ((self.logical_size.1 as f32) * self.pixel_ratio).round() as u32;
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_view(&self.device, width, height);
    }

    /// Runs `overlay` on the pending frame (if any), then submits and
    /// presents it.
    pub fn present_with<F>(&mut self, overlay: F)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let Some(mut frame) = self.pending.take() else {
            return;
        };
        overlay(&self.device, &self.queue, &mut frame.encoder, &frame.view);
        self.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Runs `f` inside a validation error scope.
    fn validated<T>(&self, what: &str, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, SceneError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(SceneError::resource(format!("{}: {}", what, err))),
            None => Ok(value),
        }
    }

    fn build_pipeline(&self, geometry: &GpuGeometry, material: &GpuMaterial) -> Result<wgpu::RenderPipeline, SceneError> {
        let blend = match (material.blend, material.transparent) {
            (BlendMode::Additive, _) => wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            },
            (BlendMode::Normal, true) => wgpu::BlendState::ALPHA_BLENDING,
            (BlendMode::Normal, false) => wgpu::BlendState::REPLACE,
        };
        let cull_mode = match material.side {
            Side::Front => Some(wgpu::Face::Back),
            Side::Double => None,
        };
        let buffers = geometry.layouts.desc();

        self.validated(&format!("pipeline for '{}'", material.label), |device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(material.label.as_str()),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &material.vertex_module,
                    entry_point: "vs_main",
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &material.fragment_module,
                    entry_point: "fs_main",
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.format,
                        blend: Some(blend),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: material.depth_write,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
            })
        })
    }

    fn acquire(&mut self) -> Result<Option<wgpu::SurfaceTexture>, SceneError> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(Some(texture)),
            Err(wgpu::SurfaceError::OutOfMemory) => Err(SceneError::resource("GPU out of memory")),
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out, skipping frame");
                Ok(None)
            }
            Err(err) => {
                log::warn!("surface {:?}, reconfiguring", err);
                self.reconfigure();
                Ok(None)
            }
        }
    }
}

fn create_uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

fn create_depth_view(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Scene Depth Texture"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl RenderBackend for WgpuBackend {
    fn create_geometry(&mut self, geometry: &GeometryDescriptor) -> Result<GeometryHandle, SceneError> {
        let vertex_count = u32::try_from(geometry.vertex_count())
            .map_err(|_| SceneError::resource("too many vertices for one draw"))?;

        let buffers = geometry
            .attributes()
            .iter()
            .map(|attr| {
                self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(attr.name()),
                    contents: bytemuck::cast_slice(attr.data()),
                    usage: wgpu::BufferUsages::VERTEX,
                })
            })
            .collect();
        let indices = geometry.indices().map(|indices| {
            let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Scene Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, indices.len() as u32)
        });

        let handle = GeometryHandle(self.next_id());
        self.geometries.insert(
            handle,
            GpuGeometry {
                buffers,
                indices,
                vertex_count,
                topology: geometry.topology(),
                layouts: AttributeLayouts::for_geometry(geometry),
            },
        );
        Ok(handle)
    }

    fn create_material(&mut self, material: &MaterialDescriptor) -> Result<MaterialHandle, SceneError> {
        let uniforms = material.uniforms.borrow();
        let vertex_source = compose(material.vertex_source, &uniforms);
        let fragment_source = compose(material.fragment_source, &uniforms);

        let (vertex_module, fragment_module) = self.validated(&format!("shaders of '{}'", material.label), |device| {
            let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Vertex Shader Module"),
                source: wgpu::ShaderSource::Wgsl(vertex_source.into()),
            });
            let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Fragment Shader Module"),
                source: wgpu::ShaderSource::Wgsl(fragment_source.into()),
            });
            (vertex, fragment)
        })?;

        let slots = uniforms.len().max(1) as u64;
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Material Uniform Buffer"),
            size: slots * UNIFORM_SLOT_BYTES,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if !uniforms.is_empty() {
            self.queue
                .write_buffer(&uniform_buffer, 0, bytemuck::cast_slice(&uniforms.to_std140()));
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.material_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("material_bind_group"),
        });
        drop(uniforms);

        let handle = MaterialHandle(self.next_id());
        self.materials.insert(
            handle,
            GpuMaterial {
                label: material.label.clone(),
                vertex_module,
                fragment_module,
                uniform_buffer,
                bind_group,
                blend: material.blend,
                depth_write: material.depth_write,
                side: material.side,
                transparent: material.transparent,
            },
        );
        Ok(handle)
    }

    fn create_mesh(
        &mut self,
        geometry: GeometryHandle,
        material: MaterialHandle,
        transform: Mat4,
    ) -> Result<MeshHandle, SceneError> {
        let (gpu_geometry, gpu_material) = match (self.geometries.get(&geometry), self.materials.get(&material)) {
            (Some(g), Some(m)) => (g, m),
            _ => return Err(SceneError::resource("mesh references a released resource")),
        };
        let pipeline = self.build_pipeline(gpu_geometry, gpu_material)?;

        let transforms_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Transforms Uniform Buffer"),
            size: std::mem::size_of::<TransformsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let transforms_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &self.transforms_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: transforms_buffer.as_entire_binding(),
            }],
            label: Some("transforms_bind_group"),
        });

        let handle = MeshHandle(self.next_id());
        self.meshes.push(GpuMesh {
            handle,
            geometry,
            material,
            model: transform,
            pipeline,
            transforms_buffer,
            transforms_bind_group,
        });
        Ok(handle)
    }

    fn remove_mesh(&mut self, mesh: MeshHandle) {
        if let Some(pos) = self.meshes.iter().position(|m| m.handle == mesh) {
            let removed = self.meshes.remove(pos);
            removed.transforms_buffer.destroy();
        }
    }

    fn write_uniforms(&mut self, material: MaterialHandle, uniforms: &UniformTable) {
        let Some(gpu_material) = self.materials.get(&material) else {
            log::warn!("uniform upload for unknown material {:?}", material);
            return;
        };
        let packed = uniforms.to_std140();
        let bytes: &[u8] = bytemuck::cast_slice(&packed);
        if bytes.is_empty() {
            return;
        }
        if bytes.len() as u64 > gpu_material.uniform_buffer.size() {
            log::warn!("uniform table of '{}' grew after creation", gpu_material.label);
            return;
        }
        self.queue.write_buffer(&gpu_material.uniform_buffer, 0, bytes);
    }

    fn dispose_geometry(&mut self, geometry: GeometryHandle) {
        if let Some(gpu_geometry) = self.geometries.remove(&geometry) {
            for buffer in &gpu_geometry.buffers {
                buffer.destroy();
            }
            if let Some((buffer, _)) = &gpu_geometry.indices {
                buffer.destroy();
            }
        }
    }

    fn dispose_material(&mut self, material: MaterialHandle) {
        if let Some(gpu_material) = self.materials.remove(&material) {
            gpu_material.uniform_buffer.destroy();
        }
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.logical_size = (width, height);
        self.reconfigure();
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
        self.reconfigure();
    }

    fn set_clear_color(&mut self, color: [f32; 3]) {
        self.clear_color = wgpu::Color {
            r: color[0] as f64,
            g: color[1] as f64,
            b: color[2] as f64,
            a: 1.0,
        };
    }

    fn render(&mut self, camera: &PerspectiveCamera) -> Result<(), SceneError> {
        // A frame nobody presented still has to reach the screen.
        self.present_with(|_, _, _, _| {});

        let Some(surface_texture) = self.acquire()? else {
            return Ok(());
        };
        let view = surface_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Main Command Encoder"),
        });

        for mesh in &self.meshes {
            let transforms = TransformsUniform::new(camera, mesh.model);
            self.queue
                .write_buffer(&mesh.transforms_buffer, 0, bytemuck::bytes_of(&transforms));
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for mesh in &self.meshes {
                let (Some(geometry), Some(material)) =
                    (self.geometries.get(&mesh.geometry), self.materials.get(&mesh.material))
                else {
                    log::error!("mesh {:?} references a disposed resource, skipping", mesh.handle);
                    continue;
                };
                if geometry.vertex_count == 0 {
                    continue;
                }

                render_pass.set_pipeline(&mesh.pipeline);
                render_pass.set_bind_group(0, &mesh.transforms_bind_group, &[]);
                render_pass.set_bind_group(1, &material.bind_group, &[]);
                for (slot, buffer) in geometry.buffers.iter().enumerate() {
                    render_pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                }

                match (&geometry.indices, geometry.topology) {
                    (_, Topology::Points) => render_pass.draw(0..6, 0..geometry.vertex_count),
                    (Some((index_buffer, index_count)), Topology::TriangleList) => {
                        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..*index_count, 0, 0..1);
                    }
                    (None, Topology::TriangleList) => render_pass.draw(0..geometry.vertex_count, 0..1),
                }
            }
        }

        self.pending = Some(PendingFrame { surface_texture, view, encoder });
        Ok(())
    }
}
