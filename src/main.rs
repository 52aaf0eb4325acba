use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use glam::Vec2;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

mod mesh;
mod renderer;
mod settings;
mod ui;

use mesh::{Bounds, LoadedMesh, MeshData};
use renderer::{Camera, GpuState, SceneUniform};
use settings::ViewerSettings;
use ui::{
    InteractionState, KeyAction, OverlayStats, PointerDrag, apply_theme, draw_overlay, key_action,
};

/// Pixel-precise wheels report far larger deltas than line-based ones.
const PIXELS_PER_SCROLL_LINE: f32 = 50.0;

#[derive(Parser, Debug)]
#[command(name = "objview", version, about = "Interactive viewer for OBJ triangle/quad meshes")]
struct Cli {
    /// Path to the .obj mesh file
    path: PathBuf,
}

struct App {
    settings: ViewerSettings,

    /// Handed to the GPU on first resume, then dropped.
    pending_mesh: Option<MeshData>,
    bounds: Bounds,
    vertex_count: usize,
    triangle_count: usize,
    normals_synthesized: bool,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    egui_state: Option<egui_winit::State>,
    egui_renderer: Option<egui_wgpu::Renderer>,
    egui_ctx: egui::Context,

    camera: Camera,
    state: InteractionState,
    drag: PointerDrag,
    show_overlay: bool,
    wireframe_warned: bool,

    frame_count: u32,
    fps_timer: Instant,
    fps: f32,

    fatal: Option<anyhow::Error>,
}

impl App {
    fn new(settings: ViewerSettings, mesh: LoadedMesh) -> Self {
        let camera = Camera::new(&settings);

        Self {
            bounds: mesh.data.bounds(),
            vertex_count: mesh.data.vertex_count(),
            triangle_count: mesh.data.triangle_count(),
            normals_synthesized: mesh.normals_synthesized,
            pending_mesh: Some(mesh.data),
            settings,

            window: None,
            gpu: None,
            egui_state: None,
            egui_renderer: None,
            egui_ctx: egui::Context::default(),

            camera,
            state: InteractionState::default(),
            drag: PointerDrag::default(),
            show_overlay: true,
            wireframe_warned: false,

            frame_count: 0,
            fps_timer: Instant::now(),
            fps: 0.0,

            fatal: None,
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let mesh = self
            .pending_mesh
            .take()
            .context("mesh was already uploaded")?;
        let gpu = pollster::block_on(GpuState::new(window.clone(), &mesh, &self.settings))?;

        let egui_state = egui_winit::State::new(
            self.egui_ctx.clone(),
            self.egui_ctx.viewport_id(),
            &window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        let egui_renderer =
            egui_wgpu::Renderer::new(&gpu.device, gpu.config.format, None, 1, false);

        apply_theme(&self.egui_ctx);

        let size = window.inner_size();
        self.camera
            .set_aspect(size.width as f32, size.height as f32);

        self.window = Some(window);
        self.gpu = Some(gpu);
        self.egui_state = Some(egui_state);
        self.egui_renderer = Some(egui_renderer);

        Ok(())
    }

    fn update_fps(&mut self) {
        self.frame_count += 1;
        let elapsed = self.fps_timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            self.fps = self.frame_count as f32 / elapsed;
            self.frame_count = 0;
            self.fps_timer = Instant::now();
        }
    }

    fn render(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(egui_state)) = (&self.window, &mut self.egui_state) else {
            return;
        };

        let size = window.inner_size();
        if size.width == 0 || size.height == 0 {
            return;
        }

        let raw_input = egui_state.take_egui_input(window);

        let stats = OverlayStats {
            vertex_count: self.vertex_count,
            triangle_count: self.triangle_count,
            normals_synthesized: self.normals_synthesized,
            wireframe: self.state.wireframe,
            wireframe_supported: self.gpu.as_ref().is_some_and(GpuState::supports_wireframe),
            rotation: [self.state.rotation_x, self.state.rotation_y],
            zoom_distance: self.state.zoom_distance,
            fps: self.fps,
        };
        let show_overlay = self.show_overlay;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            if show_overlay {
                draw_overlay(ctx, &stats);
            }
        });

        egui_state.handle_platform_output(window, full_output.platform_output);

        let Some(gpu) = &mut self.gpu else { return };
        let Some(egui_renderer) = &mut self.egui_renderer else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.resize(gpu.size);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("GPU out of memory, shutting down");
                event_loop.exit();
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("timed out acquiring a frame, skipping");
                return;
            }
        };

        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        gpu.update_scene(&SceneUniform::new(
            &self.camera,
            &self.state,
            &self.bounds,
            &self.settings,
        ));

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [gpu.config.width, gpu.config.height],
            pixels_per_point: full_output.pixels_per_point,
        };

        for (id, delta) in full_output.textures_delta.set {
            egui_renderer.update_texture(&gpu.device, &gpu.queue, id, &delta);
        }

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Main Encoder"),
            });

        egui_renderer.update_buffers(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &paint_jobs,
            &screen_descriptor,
        );

        gpu.render_mesh(&view, &mut encoder, self.state.wireframe);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            egui_renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in full_output.textures_delta.free {
            egui_renderer.free_texture(&id);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        window.request_redraw();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, action: KeyAction) {
        match action {
            KeyAction::ToggleWireframe => {
                let enabled = self.state.toggle_wireframe();
                info!("wireframe: {}", if enabled { "on" } else { "off" });
                let supported = self.gpu.as_ref().is_some_and(GpuState::supports_wireframe);
                if enabled && !supported && !self.wireframe_warned {
                    self.wireframe_warned = true;
                    warn!("line polygon mode unavailable, still drawing filled");
                }
            }
            KeyAction::ToggleOverlay => self.show_overlay = !self.show_overlay,
            KeyAction::Exit => event_loop.exit(),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let (width, height) = self.settings.window_size;
        let window_attrs = Window::default_attributes()
            .with_title(self.settings.window_title)
            .with_inner_size(PhysicalSize::new(width, height));

        let result = event_loop
            .create_window(window_attrs)
            .context("create window")
            .and_then(|window| self.init_gpu(Arc::new(window)));

        if let Err(err) = result {
            self.fatal = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        if let (Some(egui_state), Some(window)) = (&mut self.egui_state, &self.window) {
            let response = egui_state.on_window_event(window, &event);
            if response.consumed {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(size);
                }
                self.camera
                    .set_aspect(size.width as f32, size.height as f32);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                if let PhysicalKey::Code(key) = event.physical_key {
                    if let Some(action) = key_action(key) {
                        self.handle_key(event_loop, action);
                    }
                }
            }

            WindowEvent::MouseInput {
                button: MouseButton::Left,
                state,
                ..
            } => match state {
                ElementState::Pressed => self.drag.press(),
                ElementState::Released => self.drag.release(),
            },

            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                if let Some(delta) = self.drag.moved(position) {
                    self.state.rotate(delta.x, delta.y);
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / PIXELS_PER_SCROLL_LINE,
                };
                // wheel away from the user zooms in
                self.state.scroll(-scroll);
            }

            WindowEvent::RedrawRequested => {
                self.update_fps();
                self.render(event_loop);
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn log_controls() {
    info!("controls: left drag rotates, scroll zooms, W toggles wireframe, H toggles help, Esc quits");
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mesh = mesh::load_mesh(&cli.path)?;
    if mesh.data.triangle_count() == 0 {
        bail!("mesh contains no renderable triangles: {}", cli.path.display());
    }

    log_controls();

    let event_loop = EventLoop::new().context("create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(ViewerSettings::default(), mesh);
    event_loop.run_app(&mut app).context("run event loop")?;

    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
