use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use winit::window::Window;

use crate::mesh::MeshData;
use crate::renderer::camera::SceneUniform;
use crate::renderer::mesh_buffers::{MeshBuffers, normal_layout, position_layout};
use crate::settings::ViewerSettings;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Tried in order; 4x is the only count every device allows without adapter-specific features.
const MSAA_CANDIDATES: [u32; 2] = [8, 4];

/// Highest candidate sample count accepted by `supported`, or 1 for no multisampling.
pub fn choose_sample_count(supported: impl Fn(u32) -> bool) -> u32 {
    MSAA_CANDIDATES
        .into_iter()
        .find(|&count| supported(count))
        .unwrap_or(1)
}

/// Exponent applied to the shaded color before it is written out. sRGB surfaces encode on
/// write; anything else gets an approximate 2.2 gamma in the shader.
pub fn output_gamma(format: wgpu::TextureFormat) -> f32 {
    if format.is_srgb() { 1.0 } else { 1.0 / 2.2 }
}

fn gamma_encode(color: wgpu::Color, exponent: f32) -> wgpu::Color {
    let exponent = f64::from(exponent);
    wgpu::Color {
        r: color.r.powf(exponent),
        g: color.g.powf(exponent),
        b: color.b.powf(exponent),
        a: color.a,
    }
}

pub struct GpuState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,

    pub pipeline_fill: wgpu::RenderPipeline,
    /// `None` when the adapter lacks `POLYGON_MODE_LINE`.
    pub pipeline_line: Option<wgpu::RenderPipeline>,

    pub scene_buffer: wgpu::Buffer,
    pub scene_bind_group: wgpu::BindGroup,

    pub mesh_buffers: MeshBuffers,
    pub clear_color: wgpu::Color,
    pub output_gamma: f32,

    pub sample_count: u32,
    /// Multisampled color target resolved into the swapchain; `None` at 1 sample.
    pub msaa_texture: Option<wgpu::TextureView>,
    pub depth_texture: wgpu::TextureView,
}

impl GpuState {
    pub async fn new(
        window: Arc<Window>,
        mesh: &MeshData,
        settings: &ViewerSettings,
    ) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window)
            .context("create render surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("no compatible GPU adapter found"))?;

        let adapter_info = adapter.get_info();
        info!(
            "using adapter: {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let wireframe_supported = adapter
            .features()
            .contains(wgpu::Features::POLYGON_MODE_LINE);
        if !wireframe_supported {
            warn!("adapter does not support line polygon mode, wireframe is unavailable");
        }
        let adapter_format_features = adapter
            .features()
            .contains(wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES);

        let mut required_features = wgpu::Features::empty();
        if wireframe_supported {
            required_features |= wgpu::Features::POLYGON_MODE_LINE;
        }
        if adapter_format_features {
            required_features |= wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES;
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Viewer Device"),
                    required_features,
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .context("request GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no supported formats"))?;
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

        let gamma = output_gamma(surface_format);
        if gamma != 1.0 {
            warn!("surface format {surface_format:?} is not sRGB, applying gamma in the shader");
        }

        let color_flags = adapter.get_texture_format_features(surface_format).flags;
        let depth_flags = adapter.get_texture_format_features(DEPTH_FORMAT).flags;
        let sample_count = choose_sample_count(|count| {
            (adapter_format_features || count <= 4)
                && color_flags.sample_count_supported(count)
                && depth_flags.sample_count_supported(count)
        });
        info!("multisampling: {sample_count}x");

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let scene_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniform Buffer"),
            size: std::mem::size_of::<SceneUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let scene_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Bind Group Layout"),
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
            });

        let scene_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Bind Group"),
            layout: &scene_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: scene_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&scene_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline_fill = Self::create_mesh_pipeline(
            &device,
            &pipeline_layout,
            &shader,
            config.format,
            sample_count,
            wgpu::PolygonMode::Fill,
        );
        let pipeline_line = wireframe_supported.then(|| {
            Self::create_mesh_pipeline(
                &device,
                &pipeline_layout,
                &shader,
                config.format,
                sample_count,
                wgpu::PolygonMode::Line,
            )
        });

        let mesh_buffers = MeshBuffers::new(&device, mesh)?;
        let msaa_texture = Self::create_msaa_texture(&device, &config, sample_count);
        let depth_texture = Self::create_depth_texture(&device, &config, sample_count);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            pipeline_fill,
            pipeline_line,
            scene_buffer,
            scene_bind_group,
            mesh_buffers,
            clear_color: gamma_encode(settings.clear_color, gamma),
            output_gamma: gamma,
            sample_count,
            msaa_texture,
            depth_texture,
        })
    }

    fn create_mesh_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        format: wgpu::TextureFormat,
        sample_count: u32,
        polygon_mode: wgpu::PolygonMode,
    ) -> wgpu::RenderPipeline {
        let label = match polygon_mode {
            wgpu::PolygonMode::Line => "Mesh Wireframe Pipeline",
            _ => "Mesh Fill Pipeline",
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[position_layout(), normal_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    fn create_msaa_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> Option<wgpu::TextureView> {
        if sample_count <= 1 {
            return None;
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("MSAA Color Texture"),
            size: target_extent(config),
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: config.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: target_extent(config),
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
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
            self.msaa_texture =
                Self::create_msaa_texture(&self.device, &self.config, self.sample_count);
            self.depth_texture =
                Self::create_depth_texture(&self.device, &self.config, self.sample_count);
        }
    }

    pub fn supports_wireframe(&self) -> bool {
        self.pipeline_line.is_some()
    }

    pub fn update_scene(&self, uniform: &SceneUniform) {
        let uniform = uniform.with_output_gamma(self.output_gamma);
        self.queue
            .write_buffer(&self.scene_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    /// Falls back to the filled pipeline when line mode is unavailable. With multisampling the
    /// pass draws into the MSAA target and resolves into `view`.
    pub fn render_mesh(
        &self,
        view: &wgpu::TextureView,
        encoder: &mut wgpu::CommandEncoder,
        wireframe: bool,
    ) {
        let pipeline = match (&self.pipeline_line, wireframe) {
            (Some(line), true) => line,
            _ => &self.pipeline_fill,
        };

        let (target, resolve_target, store) = match &self.msaa_texture {
            Some(msaa) => (msaa, Some(view), wgpu::StoreOp::Discard),
            None => (view, None, wgpu::StoreOp::Store),
        };

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Mesh Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store,
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

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.scene_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.mesh_buffers.position_buffer().slice(..));
        render_pass.set_vertex_buffer(1, self.mesh_buffers.normal_buffer().slice(..));
        render_pass.draw(0..self.mesh_buffers.vertex_count(), 0..1);
    }
}

fn target_extent(config: &wgpu::SurfaceConfiguration) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: config.width.max(1),
        height: config.height.max(1),
        depth_or_array_layers: 1,
    }
}
