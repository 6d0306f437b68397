//! Command line options.

use std::path::PathBuf;

use asset::{DEFAULT_MAX_DEPTH, ImportOptions};
use clap::{Parser, ValueEnum};
use corelib::Camera;
use platform::ViewerConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum GpuBackend {
    #[default]
    Auto,
    #[value(alias = "vk")]
    Vulkan,
    #[value(alias = "d3d12")]
    Dx12,
    #[value(alias = "mtl")]
    Metal,
    #[value(aliases = ["opengl", "gles"])]
    Gl,
}

impl GpuBackend {
    pub fn backends(self) -> wgpu::Backends {
        match self {
            Self::Auto => wgpu::Backends::all(),
            Self::Vulkan => wgpu::Backends::VULKAN,
            Self::Dx12 => wgpu::Backends::DX12,
            Self::Metal => wgpu::Backends::METAL,
            Self::Gl => wgpu::Backends::GL,
        }
    }
}

/// Parse `WIDTHxHEIGHT`, e.g. `1600x1024`.
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    if w == 0 || h == 0 {
        return Err("window size must be non-zero".into());
    }
    Ok((w, h))
}

/// Interactive viewer for OBJ and glTF models.
#[derive(Debug, Parser)]
#[command(name = "orbview", version)]
pub struct Cli {
    /// Model file to load (.obj, .gltf or .glb).
    #[arg(default_value = "resource/model/model.obj")]
    pub model: PathBuf,

    #[arg(long, value_enum, default_value_t = GpuBackend::Auto)]
    pub gpu_backend: GpuBackend,

    /// Window size as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size, default_value = "1600x1024")]
    pub size: (u32, u32),

    /// Put the frame rate in the window title.
    #[arg(long)]
    pub show_fps: bool,

    /// Camera movement per frame.
    #[arg(long, default_value_t = 0.5)]
    pub speed: f32,

    /// Degrees of rotation per pixel of mouse motion.
    #[arg(long, default_value_t = 0.1)]
    pub sensitivity: f32,

    /// Vertical field of view in degrees.
    #[arg(long, default_value_t = 45.0)]
    pub fov: f32,

    #[arg(long)]
    pub no_flip_uvs: bool,

    #[arg(long)]
    pub no_smooth_normals: bool,

    #[arg(long)]
    pub no_tangents: bool,

    /// Bake node transforms into vertex positions.
    #[arg(long)]
    pub bake_transforms: bool,

    /// Maximum node hierarchy depth.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

impl Cli {
    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            flip_uvs: !self.no_flip_uvs,
            generate_smooth_normals: !self.no_smooth_normals,
            calc_tangent_space: !self.no_tangents,
            bake_node_transforms: self.bake_transforms,
            max_depth: self.max_depth,
            ..ImportOptions::default()
        }
    }

    pub fn viewer_config(&self) -> ViewerConfig {
        let (width, height) = self.size;
        let camera = Camera::new(
            Camera::default().position,
            self.speed,
            self.sensitivity,
            self.fov.clamp(1.0, 100.0),
        );
        ViewerConfig {
            model_path: self.model.clone(),
            backends: self.gpu_backend.backends(),
            width,
            height,
            show_fps: self.show_fps,
            import: self.import_options(),
            camera,
        }
    }
}
