//! Platform layer: window, event loop, input and overlay around the renderer.
//!
//! Design goals:
//! - Import happens once, right after the GPU is up and before the first frame.
//! - Resize/minimise/close are handled; rendering pauses while minimised.
//! - Failures during startup end the event loop and are returned to `main`.

pub mod input;
pub mod overlay;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use asset::ImportOptions;
use corelib::Camera;
use renderer::GpuState;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::input::{InputState, zoom_from_scroll};
use crate::overlay::{FrameTimer, Overlay, OverlayTargets};

/// Everything the viewer needs to start.
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    pub model_path: PathBuf,
    pub backends: wgpu::Backends,
    pub width: u32,
    pub height: u32,
    pub show_fps: bool,
    pub import: ImportOptions,
    /// Initial camera (speed, sensitivity and fov come from the CLI).
    pub camera: Camera,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("resource/model/model.obj"),
            backends: wgpu::Backends::all(),
            width: 1600,
            height: 1024,
            show_fps: false,
            import: ImportOptions::default(),
            camera: Camera::default(),
        }
    }
}

struct Viewer {
    config: ViewerConfig,
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    overlay: Option<Overlay>,
    camera: Camera,
    input: InputState,
    timer: FrameTimer,
    minimized: bool,
    error: Option<anyhow::Error>,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Self {
        let camera = config.camera.clone();
        Self {
            config,
            window: None,
            gpu: None,
            overlay: None,
            camera,
            input: InputState::default(),
            timer: FrameTimer::default(),
            minimized: false,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = Window::default_attributes()
            .with_title("Orbview")
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .context("Failed to create window")?,
        );
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let mut gpu = pollster::block_on(GpuState::new(window.clone(), self.config.backends))?;

        let path = &self.config.model_path;
        let model = asset::import(path, &self.config.import, &mut gpu.texture_backend())
            .with_context(|| format!("Failed to import model {}", path.display()))?;
        gpu.set_model(model)?;

        self.overlay = Some(Overlay::new(&window));
        self.gpu = Some(gpu);
        self.window = Some(window);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{err:#}");
        self.error = Some(err);
        event_loop.exit();
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        let pressed = event.state == ElementState::Pressed;
        if code == KeyCode::Escape && pressed {
            log::info!("Escape pressed. Exiting event loop.");
            event_loop.exit();
            return;
        }
        self.input.set_key(code, pressed);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(gpu), Some(overlay)) =
            (self.window.as_ref(), self.gpu.as_mut(), self.overlay.as_mut())
        else {
            return;
        };
        if self.minimized {
            return;
        }

        for direction in self.input.moves() {
            self.camera.apply_move(direction);
        }

        let stats = gpu.model().map(|m| m.stats());
        let frame = overlay.frame(
            window,
            &mut OverlayTargets {
                camera: &mut self.camera,
                clear_color: &mut gpu.clear_color,
                stats,
                timer: &self.timer,
            },
        );

        match gpu.render(&self.camera, Some(frame)) {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated: {e:?}. Recreating...");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory. Exiting event loop.");
                self.error = Some(anyhow!("GPU out of memory"));
                event_loop.exit();
                return;
            }
            Err(e) => log::warn!("Frame skipped: {e:?}"),
        }

        if self.timer.tick(Instant::now()) && self.config.show_fps {
            window.set_title(&format!(
                "Orbview - {:.1} FPS ({:.2} ms)",
                self.timer.fps(),
                self.timer.frame_ms()
            ));
            log::debug!("FPS: {:.1}", self.timer.fps());
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.start(event_loop) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        // Let egui see the event first.
        if let (Some(overlay), Some(window)) = (self.overlay.as_mut(), self.window.as_ref()) {
            if overlay.on_window_event(window, &event) {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.minimized = size.width == 0 || size.height == 0;
                if let Some(gpu) = self.gpu.as_mut().filter(|_| !self.minimized) {
                    log::debug!("Resized: {}x{}", size.width, size.height);
                    gpu.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(false) => self.input.clear(),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, &event),
            WindowEvent::MouseWheel { delta, .. } => {
                let step = zoom_from_scroll(delta);
                if step != 0.0 {
                    self.camera.apply_zoom(step);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            if self.overlay.as_ref().is_some_and(Overlay::wants_pointer) {
                return;
            }
            if let Some((x, y)) = self.input.look_delta(dx, dy) {
                self.camera.apply_look(x, y);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Open the viewer window and run until it is closed.
pub fn run_viewer(config: ViewerConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer::new(config);
    event_loop
        .run_app(&mut viewer)
        .map_err(|e| anyhow!("Event loop error: {e:?}"))?;

    match viewer.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
