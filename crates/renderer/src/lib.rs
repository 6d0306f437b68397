//! Renderer: wgpu surface + depth, the textured model pipeline and the
//! overlay pass.
//! wgpu = 27.x, winit = 0.30.x

pub mod gpu_model;
pub mod gpu_texture;
pub mod uniform;

use std::sync::Arc;

use anyhow::{Context, Result};
use asset::Model;
use corelib::Camera;
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoder, CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device,
    DeviceDescriptor, Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits,
    LoadOp, Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface, SurfaceConfiguration,
    SurfaceError, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor, VertexState,
};
use winit::{dpi::PhysicalSize, window::Window};

pub use gpu_model::{Fallbacks, GpuModel, MESH_VERTEX_LAYOUT};
pub use gpu_texture::{GpuTexture, WgpuTextureBackend};
pub use uniform::{UniformBlock, UniformValue};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Specular exponent used by the model shader.
pub const DEFAULT_SHININESS: f32 = 32.0;

/// Per-frame camera uniforms. Field order fixes the WGSL `Camera` struct.
pub fn camera_block(camera: &Camera, width: u32, height: u32, shininess: f32) -> UniformBlock {
    let model = camera.model_matrix();
    UniformBlock::new()
        .with("model", UniformValue::Mat4(model))
        .with("view", UniformValue::Mat4(camera.view_matrix()))
        .with("projection", UniformValue::Mat4(camera.projection_matrix(width, height)))
        .with("normal_matrix", UniformValue::Mat3(corelib::transform::normal_matrix(&model)))
        .with("view_position", UniformValue::Vec3(camera.position))
        .with("shininess", UniformValue::Float(shininess))
}

/// Tessellated egui output for one frame.
pub struct OverlayFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline
    pipeline: RenderPipeline,
    material_bgl: BindGroupLayout,
    fallbacks: Fallbacks,
    model: Option<GpuModel>,

    // Camera
    camera_bg: BindGroup,
    camera_buf: Buffer,

    // Overlay
    egui_renderer: egui_wgpu::Renderer,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,

    /// Linear RGB the frame is cleared to.
    pub clear_color: [f32; 3],
    pub shininess: f32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window>, restricted to `backends`.
    pub async fn new(window: Arc<Window>, backends: wgpu::Backends) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("Failed to create window surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .with_context(|| format!("No suitable GPU adapter for backends {backends:?}"))?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("Orbview Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                experimental_features: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("Failed to create GPU device")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no supported formats")?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Camera BGL/BG ====
        let camera_init = camera_block(&Camera::default(), width, height, DEFAULT_SHININESS);
        let camera_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Camera BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX_FRAGMENT,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(camera_init.size() as u64),
                },
                count: None,
            }],
        });
        let camera_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera UBO"),
            size: camera_init.size() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&camera_buf, 0, &camera_init.bytes());
        let camera_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera BG"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buf.as_entire_binding(),
            }],
        });

        let material_bgl = gpu_model::material_bind_group_layout(&device);
        let fallbacks = Fallbacks::new(&mut WgpuTextureBackend::new(&device, &queue));

        // ==== Shaders ====
        let shader_src = format!(
            "{}\n{}\n{}",
            camera_init.wgsl_struct("Camera"),
            gpu_model::material_block().wgsl_struct("Material"),
            include_str!("shaders/model.wgsl")
        );
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Model WGSL"),
            source: ShaderSource::Wgsl(shader_src.into()),
        });

        // ==== Pipeline ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Model PipelineLayout"),
            bind_group_layouts: &[&camera_bgl, &material_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Model Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[MESH_VERTEX_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // Imported winding is not trusted, so nothing is culled.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_format,
            egui_wgpu::RendererOptions::default(),
        );

        log::info!("Renderer ready: {}x{}, surface {:?}", width, height, surface_format);
        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            material_bgl,
            fallbacks,
            model: None,
            camera_bg,
            camera_buf,
            egui_renderer,
            depth_view,
            width,
            height,
            clear_color: [0.05, 0.05, 0.08],
            shininess: DEFAULT_SHININESS,
        })
    }

    /// Upload target for [`asset::import`].
    pub fn texture_backend(&self) -> WgpuTextureBackend<'_> {
        WgpuTextureBackend::new(&self.device, &self.queue)
    }

    /// Replace the drawn model.
    pub fn set_model(&mut self, model: Model<GpuTexture>) -> Result<()> {
        let gpu = GpuModel::new(&self.device, &self.material_bgl, &self.fallbacks, model)
            .context("Failed to upload model")?;
        self.model = Some(gpu);
        Ok(())
    }

    pub fn model(&self) -> Option<&Model<GpuTexture>> {
        self.model.as_ref().map(GpuModel::model)
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
    }

    /// Render one frame: camera uniforms, model pass, then the overlay.
    pub fn render(&mut self, camera: &Camera, overlay: Option<OverlayFrame>) -> Result<(), SurfaceError> {
        let block = camera_block(camera, self.width, self.height, self.shininess);
        self.queue.write_buffer(&self.camera_buf, 0, &block.bytes());

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let [r, g, b] = self.clear_color.map(f64::from);
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color { r, g, b, a: 1.0 }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.camera_bg, &[]);
            if let Some(model) = &self.model {
                model.draw(&mut rpass);
            }
        }

        let mut command_buffers = Vec::new();
        if let Some(overlay) = overlay {
            command_buffers = self.render_overlay(&mut encoder, &view, overlay);
        }

        command_buffers.push(encoder.finish());
        self.queue.submit(command_buffers);
        frame.present();
        Ok(())
    }

    fn render_overlay(
        &mut self,
        encoder: &mut CommandEncoder,
        view: &TextureView,
        overlay: OverlayFrame,
    ) -> Vec<wgpu::CommandBuffer> {
        for (id, delta) in &overlay.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.width, self.height],
            pixels_per_point: overlay.pixels_per_point,
        };
        let extra = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &overlay.primitives,
            &screen,
        );

        {
            let mut pass = encoder
                .begin_render_pass(&RenderPassDescriptor {
                    label: Some("OverlayPass"),
                    color_attachments: &[Some(RenderPassColorAttachment {
                        view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: Operations {
                            load: LoadOp::Load,
                            store: StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    occlusion_query_set: None,
                    timestamp_writes: None,
                })
                .forget_lifetime();
            self.egui_renderer
                .render(&mut pass, &overlay.primitives, &screen);
        }

        for id in &overlay.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
        extra
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}
