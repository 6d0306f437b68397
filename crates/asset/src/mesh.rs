//! Renderer-facing mesh representation produced by the importer.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::error::{ImportError, ImportResult};
use crate::texture::{Texture, TextureRole};

/// Interleaved vertex, uploaded as-is. Values are in object space.
///
/// `tangent` and `bitangent` are zero when the source mesh has no texture
/// coordinates; a renderer must not rely on them in that case.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            ..Self::default()
        }
    }
}

/// Indexed triangle list plus the textures bound to it, in role order
/// (diffuse, specular, normal, height).
///
/// Immutable once built; [`Mesh::new`] rejects out-of-range indices.
#[derive(Debug)]
pub struct Mesh<H> {
    name: String,
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
    textures: Vec<Arc<Texture<H>>>,
}

impl<H> Mesh<H> {
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<MeshVertex>,
        indices: Vec<u32>,
        textures: Vec<Arc<Texture<H>>>,
    ) -> ImportResult<Self> {
        let name = name.into();
        if indices.len() % 3 != 0 {
            return Err(ImportError::malformed(
                &name,
                format!("{} indices do not form whole triangles", indices.len()),
            ));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(ImportError::malformed(
                &name,
                format!("index {bad} out of range for {} vertices", vertices.len()),
            ));
        }
        Ok(Self {
            name,
            vertices,
            indices,
            textures,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn textures(&self) -> &[Arc<Texture<H>>] {
        &self.textures
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// First bound texture with the given role, if any.
    pub fn texture(&self, role: TextureRole) -> Option<&Arc<Texture<H>>> {
        self.textures.iter().find(|t| t.role() == role)
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }
}
