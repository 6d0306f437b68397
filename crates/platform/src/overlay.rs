//! egui overlay: live camera/renderer tweaking and model statistics.

use std::time::{Duration, Instant};

use asset::ModelStats;
use corelib::Camera;
use egui::{Context, Slider, SliderClamping};
use renderer::OverlayFrame;
use winit::event::WindowEvent;
use winit::window::Window;

const FPS_WINDOW: Duration = Duration::from_secs(1);

/// Averages frame times over roughly one second.
#[derive(Debug)]
pub struct FrameTimer {
    window_start: Instant,
    frames: u32,
    fps: f32,
    frame_ms: f32,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl FrameTimer {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: 0.0,
            frame_ms: 0.0,
        }
    }

    /// Count a frame finished at `now`. Returns `true` when the averages
    /// were refreshed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.frames += 1;
        let elapsed = now.duration_since(self.window_start);
        if elapsed < FPS_WINDOW {
            return false;
        }
        let secs = elapsed.as_secs_f32();
        self.fps = self.frames as f32 / secs;
        self.frame_ms = secs * 1000.0 / self.frames as f32;
        self.frames = 0;
        self.window_start = now;
        true
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_ms(&self) -> f32 {
        self.frame_ms
    }
}

/// Values the overlay may edit besides the camera.
pub struct OverlayTargets<'a> {
    pub camera: &'a mut Camera,
    pub clear_color: &'a mut [f32; 3],
    pub stats: Option<ModelStats>,
    pub timer: &'a FrameTimer,
}

/// Draw the "Renderer", "Camera" and "Model" windows.
pub fn draw_panels(ctx: &Context, targets: &mut OverlayTargets<'_>) {
    egui::Window::new("Renderer").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.label("clear color");
            // The picker round-trips through its own colour space, so only
            // write back what the user actually changed.
            let mut color = *targets.clear_color;
            if ui.color_edit_button_rgb(&mut color).changed() {
                *targets.clear_color = color;
            }
        });
        ui.label(format!(
            "{:.3} ms/frame ({:.1} FPS)",
            targets.timer.frame_ms(),
            targets.timer.fps()
        ));
    });

    egui::Window::new("Camera").show(ctx, |ui| {
        let camera = &mut *targets.camera;
        // The starting yaw of -90 shows as 270 so the slider does not clamp it.
        let (mut yaw, mut pitch) = (camera.yaw().rem_euclid(360.0), camera.pitch());
        let pitch_changed = ui.add(Slider::new(&mut pitch, -89.0..=89.0).text("Pitch")).changed();
        let yaw_changed = ui.add(Slider::new(&mut yaw, 0.0..=360.0).text("Yaw")).changed();
        if pitch_changed || yaw_changed {
            camera.set_orientation(yaw, pitch);
        }
        // Wheel zoom and CLI values may leave these ranges.
        for (value, range, label) in [
            (&mut camera.fov, 1.0..=100.0, "FOV"),
            (&mut camera.speed, 0.01..=10.0, "Speed"),
            (&mut camera.sensitivity, 0.01..=10.0, "Sensitivity"),
        ] {
            ui.add(Slider::new(value, range).clamping(SliderClamping::Never).text(label));
        }

        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Position");
            ui.add(egui::DragValue::new(&mut camera.position.x).speed(0.1));
            ui.add(egui::DragValue::new(&mut camera.position.y).speed(0.1));
            ui.add(egui::DragValue::new(&mut camera.position.z).speed(0.1));
        });
        for (name, v) in [
            ("Front", camera.front()),
            ("Up", camera.up()),
            ("Right", camera.right()),
            ("World", camera.world_up()),
        ] {
            ui.label(format!("{name}: [{:.3}, {:.3}, {:.3}]", v.x, v.y, v.z));
        }
    });

    egui::Window::new("Model").show(ctx, |ui| match targets.stats {
        Some(stats) => {
            ui.label(format!("meshes: {}", stats.meshes));
            ui.label(format!("vertices: {}", stats.vertices));
            ui.label(format!("triangles: {}", stats.triangles));
            ui.label(format!("textures: {}", stats.textures));
        }
        None => {
            ui.label("no model loaded");
        }
    });
}

/// egui context plus its winit integration.
pub struct Overlay {
    ctx: Context,
    state: egui_winit::State,
}

impl Overlay {
    pub fn new(window: &Window) -> Self {
        let ctx = Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        Self { ctx, state }
    }

    /// Feed a window event to egui. Returns `true` if egui consumed it.
    pub fn on_window_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    /// Whether egui currently wants pointer input for itself.
    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    /// Run one UI frame and tessellate it for the renderer.
    pub fn frame(&mut self, window: &Window, targets: &mut OverlayTargets<'_>) -> OverlayFrame {
        let raw_input = self.state.take_egui_input(window);
        let output = self.ctx.run(raw_input, |ctx| draw_panels(ctx, targets));
        self.state
            .handle_platform_output(window, output.platform_output);

        let pixels_per_point = output.pixels_per_point;
        OverlayFrame {
            primitives: self.ctx.tessellate(output.shapes, pixels_per_point),
            textures_delta: output.textures_delta,
            pixels_per_point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn timer_averages_over_one_second() {
        let start = Instant::now();
        let mut timer = FrameTimer::new(start);
        for i in 1..60 {
            assert!(!timer.tick(start + Duration::from_millis(i * 16)));
        }
        assert!(timer.tick(start + Duration::from_millis(1000)));
        assert_relative_eq!(timer.fps(), 60.0, epsilon = 1e-3);
        assert_relative_eq!(timer.frame_ms(), 1000.0 / 60.0, epsilon = 1e-3);
    }

    #[test]
    fn idle_panels_leave_camera_and_clear_color_untouched() {
        let ctx = Context::default();
        let mut camera = Camera::default();
        let before = camera.clone();
        let mut clear = [0.1, 0.2, 0.3];
        let timer = FrameTimer::default();
        let mut targets = OverlayTargets {
            camera: &mut camera,
            clear_color: &mut clear,
            stats: Some(ModelStats {
                meshes: 1,
                vertices: 3,
                triangles: 1,
                textures: 0,
            }),
            timer: &timer,
        };

        for _ in 0..3 {
            let output = ctx.run(egui::RawInput::default(), |ctx| draw_panels(ctx, &mut targets));
            assert!(!output.shapes.is_empty());
        }
        assert_eq!(camera, before);
        assert_eq!(clear, [0.1, 0.2, 0.3]);
    }
}
