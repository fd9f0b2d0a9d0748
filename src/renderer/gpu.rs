use std::sync::Arc;

use anyhow::Context;
use glam::Mat4;

use crate::math::TriangleMesh;
use crate::renderer::camera::{Camera, CameraUniform};
use crate::renderer::mesh_buffers::{MeshBuffers, MeshUniform, mesh_vertex_layout};
use crate::sketch::{SceneNode, Sketcher};

const STROKE_VERTEX_CAPACITY: usize = 4096;
const STROKE_INDEX_CAPACITY: usize = 12_288;

pub struct GpuState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    pub pipeline_mesh: wgpu::RenderPipeline,

    pub camera_buffer: wgpu::Buffer,
    pub camera_bind_group: wgpu::BindGroup,
    pub mesh_bind_group_layout: wgpu::BindGroupLayout,

    pub ground: MeshBuffers,
    pub sky: MeshBuffers,
    pub stroke: MeshBuffers,
    pub billboards: Vec<MeshBuffers>,

    pub depth_texture: wgpu::TextureView,
}

impl GpuState {
    pub async fn new(window: Arc<winit::window::Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible graphics adapter")?;
        log::info!("using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .context("failed to open graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .context("surface reports no texture formats")?;
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
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders.wgsl").into()),
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let camera_bind_group_layout = uniform_layout(&device, "Camera Bind Group Layout");
        let mesh_bind_group_layout = uniform_layout(&device, "Mesh Bind Group Layout");

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &mesh_bind_group_layout],
            push_constant_ranges: &[],
        });

        // Ribbons are seen from both sides and the sky from inside: no culling.
        let pipeline_mesh = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_mesh"),
                buffers: &[mesh_vertex_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_mesh"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let ground = MeshBuffers::new(&device, &mesh_bind_group_layout, "Ground", 0, 0);
        let sky = MeshBuffers::new(&device, &mesh_bind_group_layout, "Sky", 24, 36);
        let stroke = MeshBuffers::new(
            &device,
            &mesh_bind_group_layout,
            "Stroke",
            STROKE_VERTEX_CAPACITY,
            STROKE_INDEX_CAPACITY,
        );

        let depth_texture = Self::create_depth_texture(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            pipeline_mesh,
            camera_buffer,
            camera_bind_group,
            mesh_bind_group_layout,
            ground,
            sky,
            stroke,
            billboards: Vec::new(),
            depth_texture,
        })
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Depth32Float,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Self::create_depth_texture(&self.device, &self.config);
        }
    }

    pub fn update_camera(&self, camera: &Camera) {
        let uniform = CameraUniform::from_camera(camera);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn set_vsync(&mut self, enabled: bool) {
        self.config.present_mode = if enabled {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        self.surface.configure(&self.device, &self.config);
    }

    pub fn upload_sky(&mut self, sky: &TriangleMesh) {
        self.sky.upload(&self.device, &self.queue, sky);
    }

    /// Mirrors changed meshes to the GPU and refreshes every draw uniform.
    pub fn sync_scene(&mut self, sketcher: &mut Sketcher) {
        let config = sketcher.config().clone();

        if sketcher.ground_mut().take_dirty() {
            self.ground
                .upload(&self.device, &self.queue, sketcher.ground().mesh());
        }
        self.ground.set_uniform(
            &self.queue,
            MeshUniform::new(Mat4::IDENTITY, config.ground_color, true),
        );
        self.sky.set_uniform(
            &self.queue,
            MeshUniform::new(Mat4::IDENTITY, config.sky_color, false),
        );

        for (i, billboard) in sketcher.billboards_mut().iter_mut().enumerate() {
            let fresh = i >= self.billboards.len();
            if fresh {
                let mesh = billboard.ribbon().mesh();
                self.billboards.push(MeshBuffers::new(
                    &self.device,
                    &self.mesh_bind_group_layout,
                    &format!("Billboard {i}"),
                    mesh.vertices.len(),
                    mesh.indices.len(),
                ));
            }

            let buffers = &mut self.billboards[i];
            if billboard.take_dirty() || fresh {
                buffers.upload(&self.device, &self.queue, billboard.ribbon().mesh());
            }
            buffers.set_uniform(
                &self.queue,
                MeshUniform::new(billboard.world_matrix(), billboard.color(), false),
            );
        }

        match sketcher.active_stroke_mut() {
            Some(stroke) => {
                if stroke.take_dirty() {
                    self.stroke
                        .upload(&self.device, &self.queue, stroke.ribbon().mesh());
                }
                self.stroke.set_uniform(
                    &self.queue,
                    MeshUniform::new(stroke.world_matrix(), stroke.color(), false),
                );
            }
            None => self.stroke.clear(),
        }
    }

    pub fn render_scene(
        &self,
        view: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
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
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline_mesh);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

        self.sky.draw(&mut render_pass);
        self.ground.draw(&mut render_pass);
        for billboard in &self.billboards {
            billboard.draw(&mut render_pass);
        }
        self.stroke.draw(&mut render_pass);
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
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
