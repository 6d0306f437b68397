//! GPU copies of an imported model: one vertex/index buffer pair and one
//! material bind group per mesh.

use anyhow::Result;
use asset::{Mesh, MeshVertex, Model, SamplerDesc, TextureBackend, TextureData, TextureRole};
use wgpu::util::DeviceExt;
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    Buffer, BufferUsages, Device, RenderPass, SamplerBindingType, ShaderStages,
    TextureSampleType, TextureViewDimension, VertexBufferLayout, VertexStepMode,
};

use crate::gpu_texture::{GpuTexture, WgpuTextureBackend};
use crate::uniform::{UniformBlock, UniformValue};

/// Vertex buffer layout matching [`MeshVertex`].
pub const MESH_VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<MeshVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x3,
        4 => Float32x3
    ],
};

/// Roles bound by the material bind group, in binding order. Height maps
/// are imported but not sampled by the shader.
const BOUND_ROLES: [TextureRole; 3] = [TextureRole::Diffuse, TextureRole::Specular, TextureRole::Normal];

/// Per-mesh material flags. The field set also declares the WGSL struct.
pub fn material_block() -> UniformBlock {
    UniformBlock::new()
        .with("use_normal_map", UniformValue::Int(0))
        .with("use_specular_map", UniformValue::Int(0))
}

pub fn material_bind_group_layout(device: &Device) -> BindGroupLayout {
    let mut entries = Vec::with_capacity(BOUND_ROLES.len() * 2 + 1);
    for slot in 0..BOUND_ROLES.len() as u32 {
        entries.push(BindGroupLayoutEntry {
            binding: slot * 2,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Texture {
                sample_type: TextureSampleType::Float { filterable: true },
                view_dimension: TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(BindGroupLayoutEntry {
            binding: slot * 2 + 1,
            visibility: ShaderStages::FRAGMENT,
            ty: BindingType::Sampler(SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries.push(BindGroupLayoutEntry {
        binding: BOUND_ROLES.len() as u32 * 2,
        visibility: ShaderStages::FRAGMENT,
        ty: BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    });

    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Material BGL"),
        entries: &entries,
    })
}

/// Textures bound for roles a mesh has no texture for.
pub struct Fallbacks {
    diffuse: GpuTexture,
    specular: GpuTexture,
    normal: GpuTexture,
}

impl Fallbacks {
    pub fn new(backend: &mut WgpuTextureBackend<'_>) -> Self {
        let sampler = SamplerDesc::REPEAT_TRILINEAR;
        let checker = TextureData::create_test_texture(64).mip_chain();
        Self {
            diffuse: backend.upload("Fallback diffuse", TextureRole::Diffuse, &checker, &sampler),
            specular: backend.upload(
                "Fallback specular",
                TextureRole::Specular,
                &[TextureData::solid([0, 0, 0, 255])],
                &sampler,
            ),
            normal: backend.upload(
                "Fallback normal",
                TextureRole::Normal,
                &[TextureData::solid([128, 128, 255, 255])],
                &sampler,
            ),
        }
    }

    fn for_role(&self, role: TextureRole) -> &GpuTexture {
        match role {
            TextureRole::Specular => &self.specular,
            TextureRole::Normal => &self.normal,
            TextureRole::Diffuse | TextureRole::Height => &self.diffuse,
        }
    }
}

struct GpuMesh {
    vertex_buf: Buffer,
    index_buf: Buffer,
    index_count: u32,
    material_bg: BindGroup,
    // Kept alive for the bind group.
    _material_buf: Buffer,
}

/// An imported model uploaded for drawing. Owns the [`Model`], so its
/// textures live as long as the bind groups that sample them.
pub struct GpuModel {
    model: Model<GpuTexture>,
    meshes: Vec<GpuMesh>,
}

impl GpuModel {
    pub fn new(
        device: &Device,
        layout: &BindGroupLayout,
        fallbacks: &Fallbacks,
        model: Model<GpuTexture>,
    ) -> Result<Self> {
        let mut meshes = Vec::with_capacity(model.meshes().len());
        for mesh in model.meshes() {
            if !mesh.is_valid() {
                log::debug!("Skipping empty mesh '{}'", mesh.name());
                continue;
            }
            meshes.push(upload_mesh(device, layout, fallbacks, mesh)?);
        }
        log::info!(
            "Uploaded {} of {} meshes from {:?}",
            meshes.len(),
            model.meshes().len(),
            model.source()
        );
        Ok(Self { model, meshes })
    }

    pub fn model(&self) -> &Model<GpuTexture> {
        &self.model
    }

    /// Record draws for every mesh. Expects the model pipeline and the
    /// camera bind group (group 0) to be set already.
    pub fn draw(&self, pass: &mut RenderPass<'_>) {
        for mesh in &self.meshes {
            pass.set_bind_group(1, &mesh.material_bg, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buf.slice(..));
            pass.set_index_buffer(mesh.index_buf.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }
}

fn upload_mesh(
    device: &Device,
    layout: &BindGroupLayout,
    fallbacks: &Fallbacks,
    mesh: &Mesh<GpuTexture>,
) -> Result<GpuMesh> {
    let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(mesh.name()),
        contents: bytemuck::cast_slice(mesh.vertices()),
        usage: BufferUsages::VERTEX,
    });
    let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(mesh.name()),
        contents: bytemuck::cast_slice(mesh.indices()),
        usage: BufferUsages::INDEX,
    });

    // Without UVs the tangent frame is zero and the normal map is unusable.
    let has_tangents = mesh.vertices().iter().any(|v| v.tangent != [0.0; 3]);
    let use_normal_map = has_tangents && mesh.texture(TextureRole::Normal).is_some();
    let use_specular_map = mesh.texture(TextureRole::Specular).is_some();

    let mut material = material_block();
    material.set("use_normal_map", UniformValue::Int(use_normal_map as i32))?;
    material.set("use_specular_map", UniformValue::Int(use_specular_map as i32))?;
    let material_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Material UBO"),
        contents: &material.bytes(),
        usage: BufferUsages::UNIFORM,
    });

    let textures: Vec<&GpuTexture> = BOUND_ROLES
        .iter()
        .map(|&role| {
            mesh.texture(role)
                .map_or_else(|| fallbacks.for_role(role), |t| t.handle())
        })
        .collect();
    let mut entries = Vec::with_capacity(textures.len() * 2 + 1);
    for (slot, texture) in textures.iter().enumerate() {
        entries.push(wgpu::BindGroupEntry {
            binding: slot as u32 * 2,
            resource: wgpu::BindingResource::TextureView(&texture.view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: slot as u32 * 2 + 1,
            resource: wgpu::BindingResource::Sampler(&texture.sampler),
        });
    }
    entries.push(wgpu::BindGroupEntry {
        binding: textures.len() as u32 * 2,
        resource: material_buf.as_entire_binding(),
    });
    let material_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(mesh.name()),
        layout,
        entries: &entries,
    });

    log::debug!(
        "Mesh '{}': {} vertices, {} triangles, {} textures",
        mesh.name(),
        mesh.vertices().len(),
        mesh.triangle_count(),
        mesh.textures().len()
    );
    Ok(GpuMesh {
        vertex_buf,
        index_buf,
        index_count: mesh.indices().len() as u32,
        material_bg,
        _material_buf: material_buf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_mesh_vertex() {
        assert_eq!(MESH_VERTEX_LAYOUT.array_stride, 56);
        let offsets: Vec<_> = MESH_VERTEX_LAYOUT.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, [0, 12, 24, 32, 44]);
    }

    #[test]
    fn material_block_declares_flags() {
        let block = material_block();
        assert_eq!(block.offset_of("use_specular_map"), Some(4));
        assert_eq!(block.size(), 16);
        assert!(block.wgsl_struct("Material").contains("use_normal_map: i32"));
    }
}
