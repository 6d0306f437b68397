//! A loaded model: its meshes plus the texture cache that owns their GPU
//! textures.

use std::path::{Path, PathBuf};

use crate::cache::TextureCache;
use crate::mesh::Mesh;

/// Summary counts, e.g. for the overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModelStats {
    pub meshes: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub textures: usize,
}

/// Meshes are kept in scene traversal order. Dropping the model releases
/// every texture handle it created (once the renderer has dropped any
/// clones it took).
#[derive(Debug)]
pub struct Model<H> {
    source: PathBuf,
    meshes: Vec<Mesh<H>>,
    textures: TextureCache<H>,
}

impl<H> Model<H> {
    pub fn new(source: impl Into<PathBuf>, meshes: Vec<Mesh<H>>, textures: TextureCache<H>) -> Self {
        Self {
            source: source.into(),
            meshes,
            textures,
        }
    }

    /// File the model was imported from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Directory texture paths were resolved against.
    pub fn directory(&self) -> &Path {
        self.textures.directory()
    }

    pub fn meshes(&self) -> &[Mesh<H>] {
        &self.meshes
    }

    pub fn textures(&self) -> &TextureCache<H> {
        &self.textures
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            meshes: self.meshes.len(),
            vertices: self.meshes.iter().map(|m| m.vertices().len()).sum(),
            triangles: self.meshes.iter().map(Mesh::triangle_count).sum(),
            textures: self.textures.len(),
        }
    }
}
