//! Wavefront OBJ/MTL reader built on `tobj`.
//!
//! Every OBJ object/group becomes one child node of the root carrying a
//! single mesh. Polygons are kept as written; triangulation is left to the
//! importer so it can be switched off.

use std::path::Path;

use crate::error::{ImportError, ImportResult};
use crate::scene::{RawMaterial, RawMesh, RawNode, RawScene, TextureSlot};

pub fn read(path: &Path) -> ImportResult<RawScene> {
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: false,
        ignore_points: false,
        ignore_lines: false,
        ..Default::default()
    };
    let (models, materials) =
        tobj::load_obj(path, &options).map_err(|err| ImportError::load_failed(path, err))?;

    let materials = materials.unwrap_or_else(|err| {
        log::warn!("Ignoring material library of {:?}: {}", path, err);
        Vec::new()
    });

    let root_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("obj")
        .to_owned();
    let mut scene = RawScene::with_root(root_name);
    for material in &materials {
        scene.add_material(convert_material(material));
    }

    for model in models {
        let mesh = convert_mesh(&model.name, model.mesh)?;
        if let Some(id) = mesh.material.filter(|&id| id >= scene.materials.len()) {
            log::warn!("Mesh '{}' refers to unknown material {}", mesh.name, id);
        }
        let mut node = RawNode::new(model.name);
        node.meshes.push(scene.add_mesh(mesh));
        scene.add_child(0, node);
    }

    log::debug!(
        "Read OBJ {:?}: {} meshes, {} materials",
        path,
        scene.meshes.len(),
        scene.materials.len()
    );
    Ok(scene)
}

fn convert_material(material: &tobj::Material) -> RawMaterial {
    let slots = [
        (TextureSlot::Diffuse, &material.diffuse_texture),
        (TextureSlot::Specular, &material.specular_texture),
        (TextureSlot::Ambient, &material.ambient_texture),
        (TextureSlot::Height, &material.normal_texture),
    ];
    slots
        .into_iter()
        .filter_map(|(slot, path)| Some((slot, path.as_deref()?)))
        .filter(|(_, path)| !path.is_empty())
        .fold(RawMaterial::new(&material.name), |mat, (slot, path)| {
            mat.with_texture(slot, path)
        })
}

fn convert_mesh(name: &str, mesh: tobj::Mesh) -> ImportResult<RawMesh> {
    let positions: Vec<[f32; 3]> = mesh
        .positions
        .chunks_exact(3)
        .map(|p| [p[0], p[1], p[2]])
        .collect();
    let count = positions.len();

    let normals = (!mesh.normals.is_empty()).then(|| {
        mesh.normals
            .chunks_exact(3)
            .map(|n| [n[0], n[1], n[2]])
            .collect::<Vec<_>>()
    });
    let uvs = (!mesh.texcoords.is_empty()).then(|| {
        mesh.texcoords
            .chunks_exact(2)
            .map(|t| [t[0], t[1]])
            .collect::<Vec<_>>()
    });
    if normals.as_ref().is_some_and(|n| n.len() != count)
        || uvs.as_ref().is_some_and(|t| t.len() != count)
    {
        return Err(ImportError::malformed(
            name,
            "vertex attribute counts do not match the position count",
        ));
    }

    // An empty arity list means the mesh is all triangles.
    let faces = if mesh.face_arities.is_empty() {
        RawMesh::faces_from_flat(&mesh.indices, 3)
    } else {
        let mut faces = Vec::with_capacity(mesh.face_arities.len());
        let mut start = 0usize;
        for &arity in &mesh.face_arities {
            let end = start + arity as usize;
            let Some(face) = mesh.indices.get(start..end) else {
                return Err(ImportError::malformed(name, "face list runs past the index buffer"));
            };
            faces.push(face.to_vec());
            start = end;
        }
        faces
    };

    Ok(RawMesh {
        name: name.to_owned(),
        positions,
        normals,
        uvs,
        tangents: None,
        bitangents: None,
        faces,
        material: mesh.material_id,
    })
}
