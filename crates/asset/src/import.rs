//! Scene import: read a file, preprocess its meshes, walk the node
//! hierarchy and flatten every referenced mesh into a [`Model`].

use std::path::{Path, PathBuf};

use glam::Mat4;

use crate::backend::TextureBackend;
use crate::cache::TextureCache;
use crate::error::{ImportError, ImportResult};
use crate::formats;
use crate::mesh::{Mesh, MeshVertex};
use crate::model::Model;
use crate::process;
use crate::scene::{RawMaterial, RawMesh, RawScene};
use crate::texture::TextureRole;

/// Deepest node nesting accepted by default.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Postprocessing applied during import.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    /// Fan-split polygons into triangles, dropping points and lines.
    pub triangulate: bool,
    /// Generate area-weighted smooth normals for meshes that have none.
    pub generate_smooth_normals: bool,
    /// `v' = 1 - v` so image row 0 maps to the top of the texture.
    pub flip_uvs: bool,
    pub calc_tangent_space: bool,
    /// Bake each node's accumulated transform into its meshes. Off by
    /// default: meshes keep their local coordinates.
    pub bake_node_transforms: bool,
    pub max_depth: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            triangulate: true,
            generate_smooth_normals: true,
            flip_uvs: true,
            calc_tangent_space: true,
            bake_node_transforms: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Import the scene at `path`. Textures are resolved relative to the
/// file's directory and uploaded through `backend`.
///
/// Either the whole model is returned or an error; texture failures are
/// logged and only leave the affected texture out.
pub fn import<B: TextureBackend>(
    path: impl AsRef<Path>,
    options: &ImportOptions,
    backend: &mut B,
) -> ImportResult<Model<B::Handle>> {
    let path = path.as_ref();
    log::info!("Importing {:?}", path);
    let scene = formats::read_scene(path)?;
    let directory = path.parent().map(Path::to_path_buf).unwrap_or_default();
    import_scene(path, scene, directory, options, backend)
}

/// Turn an already-read scene into a [`Model`]. `source` only labels the
/// model and errors; `directory` is where texture paths are resolved.
pub fn import_scene<B: TextureBackend>(
    source: &Path,
    mut scene: RawScene,
    directory: impl Into<PathBuf>,
    options: &ImportOptions,
    backend: &mut B,
) -> ImportResult<Model<B::Handle>> {
    if scene.incomplete {
        return Err(ImportError::load_failed(source, "scene is incomplete"));
    }
    let Some(root) = scene.root.filter(|&r| r < scene.nodes.len()) else {
        return Err(ImportError::load_failed(source, "scene has no root node"));
    };

    for mesh in &mut scene.meshes {
        preprocess(mesh, options)?;
    }

    let mut textures = TextureCache::new(directory);
    let mut meshes = Vec::new();

    // Pre-order walk: a node's meshes, then its children left to right.
    let mut stack = vec![(root, 0usize, Mat4::IDENTITY)];
    while let Some((index, depth, parent)) = stack.pop() {
        if depth > options.max_depth {
            return Err(ImportError::DepthLimitExceeded {
                limit: options.max_depth,
            });
        }
        let Some(node) = scene.nodes.get(index) else {
            return Err(ImportError::load_failed(
                source,
                format!("node {index} does not exist"),
            ));
        };
        let world = parent * node.transform;

        for &mesh_index in &node.meshes {
            let Some(raw) = scene.meshes.get(mesh_index) else {
                return Err(ImportError::load_failed(
                    source,
                    format!("node '{}' refers to missing mesh {mesh_index}", node.name),
                ));
            };
            let transform = options.bake_node_transforms.then_some(&world);
            meshes.push(extract_mesh(
                raw,
                transform,
                &scene.materials,
                &mut textures,
                backend,
            )?);
        }

        for &child in node.children.iter().rev() {
            stack.push((child, depth + 1, world));
        }
    }

    let model = Model::new(source, meshes, textures);
    let stats = model.stats();
    log::info!(
        "Imported {:?}: {} meshes, {} vertices, {} triangles, {} textures",
        source,
        stats.meshes,
        stats.vertices,
        stats.triangles,
        stats.textures
    );
    Ok(model)
}

fn preprocess(mesh: &mut RawMesh, options: &ImportOptions) -> ImportResult<()> {
    let count = mesh.positions.len();
    let lengths = [
        mesh.normals.as_ref().map(Vec::len),
        mesh.uvs.as_ref().map(Vec::len),
        mesh.tangents.as_ref().map(Vec::len),
        mesh.bitangents.as_ref().map(Vec::len),
    ];
    if lengths.iter().flatten().any(|&len| len != count) {
        return Err(ImportError::malformed(
            &mesh.name,
            format!("vertex attributes do not all have {count} entries"),
        ));
    }

    if options.triangulate {
        let dropped = process::triangulate(mesh);
        if dropped > 0 {
            log::debug!("Dropped {} point/line faces from '{}'", dropped, mesh.name);
        }
    }
    if options.generate_smooth_normals {
        process::generate_smooth_normals(mesh);
    }
    if options.flip_uvs {
        process::flip_uvs(mesh);
    }
    if options.calc_tangent_space {
        process::calc_tangent_space(mesh);
    }
    Ok(())
}

fn extract_mesh<B: TextureBackend>(
    raw: &RawMesh,
    transform: Option<&Mat4>,
    materials: &[RawMaterial],
    textures: &mut TextureCache<B::Handle>,
    backend: &mut B,
) -> ImportResult<Mesh<B::Handle>> {
    let baked;
    let raw = match transform {
        Some(transform) => {
            let mut copy = raw.clone();
            process::bake_transform(&mut copy, transform);
            baked = copy;
            &baked
        }
        None => raw,
    };

    let vertices = (0..raw.positions.len())
        .map(|i| {
            let mut vertex = MeshVertex {
                position: raw.positions[i],
                ..MeshVertex::default()
            };
            if let Some(normals) = &raw.normals {
                vertex.normal = normals[i];
            }
            // Tangent space is only meaningful with texture coordinates.
            if let Some(uvs) = &raw.uvs {
                vertex.uv = uvs[i];
                if let (Some(t), Some(b)) = (&raw.tangents, &raw.bitangents) {
                    vertex.tangent = t[i];
                    vertex.bitangent = b[i];
                }
            }
            vertex
        })
        .collect();

    let mut indices = Vec::with_capacity(raw.faces.len() * 3);
    for (f, face) in raw.faces.iter().enumerate() {
        if face.len() != 3 {
            return Err(ImportError::malformed(
                &raw.name,
                format!("face {f} has {} indices, expected 3", face.len()),
            ));
        }
        indices.extend_from_slice(face);
    }

    let mut bound = Vec::new();
    match raw.material.map(|i| (i, materials.get(i))) {
        Some((_, Some(material))) => {
            for role in TextureRole::ALL {
                bound.extend(textures.resolve(material, role, backend));
            }
        }
        Some((i, None)) => {
            log::warn!("Mesh '{}' uses missing material {}; no textures bound", raw.name, i);
        }
        None => {}
    }

    Mesh::new(&raw.name, vertices, indices, bound)
}
