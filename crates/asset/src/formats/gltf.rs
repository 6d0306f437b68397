//! glTF 2.0 reader (`.gltf` with external or embedded buffers, `.glb`).
//!
//! Only geometry, the node hierarchy and texture *paths* are read here;
//! images are decoded later by the texture cache, so textures that are
//! embedded in the file (buffer views or data URIs) are skipped.
//!
//! glTF puts `v = 0` at the top of the image. The reader stores `1 - v`
//! and the matching bitangent so that, like OBJ, the importer's default
//! `flip_uvs` step yields top-left texture coordinates.

use std::collections::HashSet;
use std::path::Path;

use glam::{Mat4, Vec3};

use crate::error::{ImportError, ImportResult};
use crate::scene::{RawMaterial, RawMesh, RawNode, RawScene, TextureSlot};

pub fn read(path: &Path) -> ImportResult<RawScene> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::open(path).map_err(|err| ImportError::load_failed(path, err))?;
    let buffers = gltf::import_buffers(&document, path.parent(), blob)
        .map_err(|err| ImportError::load_failed(path, err))?;

    let Some(source_scene) = document.default_scene().or_else(|| document.scenes().next()) else {
        return Err(ImportError::load_failed(path, "file contains no scene"));
    };

    let mut scene = RawScene::with_root(source_scene.name().unwrap_or("scene"));
    for material in document.materials() {
        scene.add_material(convert_material(&material));
    }

    // One raw mesh per triangle-based primitive, indexed by glTF mesh.
    let mut primitives: Vec<Vec<usize>> = Vec::new();
    for mesh in document.meshes() {
        let name = mesh.name().map_or_else(|| format!("mesh{}", mesh.index()), str::to_owned);
        let mut indices = Vec::new();
        for primitive in mesh.primitives() {
            if let Some(raw) = convert_primitive(&name, &primitive, &buffers)? {
                indices.push(scene.add_mesh(raw));
            }
        }
        primitives.push(indices);
    }

    let mut visited = HashSet::new();
    let mut stack: Vec<(gltf::Node, usize)> = source_scene.nodes().map(|node| (node, 0)).collect();
    stack.reverse();
    while let Some((node, parent)) = stack.pop() {
        if !visited.insert(node.index()) {
            log::warn!("glTF node {} is referenced more than once; ignoring repeat", node.index());
            continue;
        }
        let mut raw = RawNode::new(node.name().unwrap_or_default());
        raw.transform = Mat4::from_cols_array_2d(&node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            raw.meshes = primitives[mesh.index()].clone();
        }
        let index = scene.add_child(parent, raw);
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|child| (child, index)));
    }

    log::debug!(
        "Read glTF {:?}: {} nodes, {} meshes, {} materials",
        path,
        scene.nodes.len(),
        scene.meshes.len(),
        scene.materials.len()
    );
    Ok(scene)
}

fn texture_uri(texture: gltf::Texture<'_>) -> Option<String> {
    match texture.source().source() {
        gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
            match urlencoding::decode(uri) {
                Ok(path) => Some(path.into_owned()),
                Err(err) => {
                    log::warn!("Skipping glTF image with malformed URI '{}': {}", uri, err);
                    None
                }
            }
        }
        _ => {
            log::warn!(
                "Skipping embedded glTF image {}; only external image files are supported",
                texture.source().index()
            );
            None
        }
    }
}

fn convert_material(material: &gltf::Material<'_>) -> RawMaterial {
    let name = material
        .name()
        .map_or_else(|| format!("material{}", material.index().unwrap_or_default()), str::to_owned);
    let mut raw = RawMaterial::new(name);

    let base_color = material.pbr_metallic_roughness().base_color_texture();
    if let Some(uri) = base_color.and_then(|info| texture_uri(info.texture())) {
        raw = raw.with_texture(TextureSlot::Diffuse, uri);
    }
    if let Some(uri) = material.normal_texture().and_then(|n| texture_uri(n.texture())) {
        raw = raw.with_texture(TextureSlot::Normals, uri);
    }
    raw
}

fn convert_primitive(
    name: &str,
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> ImportResult<Option<RawMesh>> {
    use gltf::mesh::Mode;

    let mode = primitive.mode();
    if matches!(mode, Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip) {
        log::warn!("Skipping {:?} primitive of mesh '{}'", mode, name);
        return Ok(None);
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| ImportError::malformed(name, "primitive has no POSITION attribute"))?
        .collect();
    let count = positions.len();

    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
    let uvs: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|tc| tc.into_f32().map(|[u, v]| [u, 1.0 - v]).collect());
    if normals.as_ref().is_some_and(|n| n.len() != count)
        || uvs.as_ref().is_some_and(|t| t.len() != count)
    {
        return Err(ImportError::malformed(
            name,
            "vertex attribute counts do not match the position count",
        ));
    }

    // Source tangents carry the bitangent handedness in w; it is negated
    // along with v.
    let (tangents, bitangents) = match (reader.read_tangents(), normals.as_ref()) {
        (Some(iter), Some(normals)) => {
            let tangents: Vec<[f32; 4]> = iter.collect();
            if tangents.len() == count {
                let bitangents = tangents
                    .iter()
                    .zip(normals)
                    .map(|(t, n)| {
                        (Vec3::from_array(*n).cross(Vec3::new(t[0], t[1], t[2])) * -t[3]).to_array()
                    })
                    .collect();
                let tangents = tangents.iter().map(|t| [t[0], t[1], t[2]]).collect();
                (Some(tangents), Some(bitangents))
            } else {
                (None, None)
            }
        }
        _ => (None, None),
    };

    let indices: Vec<u32> = reader
        .read_indices()
        .map(|iter| iter.into_u32().collect())
        .unwrap_or_else(|| (0..count as u32).collect());
    let faces = match mode {
        Mode::TriangleStrip => (2..indices.len())
            .map(|i| {
                if i % 2 == 0 {
                    vec![indices[i - 2], indices[i - 1], indices[i]]
                } else {
                    vec![indices[i - 1], indices[i - 2], indices[i]]
                }
            })
            .collect(),
        Mode::TriangleFan => (2..indices.len())
            .map(|i| vec![indices[0], indices[i - 1], indices[i]])
            .collect(),
        _ => RawMesh::faces_from_flat(&indices, 3),
    };

    Ok(Some(RawMesh {
        name: name.to_owned(),
        positions,
        normals,
        uvs,
        tangents,
        bitangents,
        faces,
        material: primitive.material().index(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CountingBackend, scratch_dir};

    const TRIANGLE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "name": "Stage", "nodes": [0] }],
  "nodes": [
    { "name": "Parent", "translation": [0.0, 0.0, -2.0], "children": [1] },
    { "name": "Child", "mesh": 0 }
  ],
  "meshes": [{
    "name": "Tri",
    "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
  }],
  "materials": [{
    "name": "Painted",
    "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } },
    "normalTexture": { "index": 1 }
  }],
  "textures": [{ "source": 0 }, { "source": 1 }],
  "images": [{ "uri": "albedo.png" }, { "uri": "data:image/png;base64,AAAA" }],
  "buffers": [{ "uri": "tri.bin", "byteLength": 42 }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ]
}"#;

    fn write_triangle(dir: &Path) -> std::path::PathBuf {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices: [u16; 3] = [0, 1, 2];
        let mut bin = bytemuck::cast_slice::<f32, u8>(&positions).to_vec();
        bin.extend_from_slice(bytemuck::cast_slice(&indices));
        std::fs::write(dir.join("tri.bin"), bin).unwrap();
        let path = dir.join("tri.gltf");
        std::fs::write(&path, TRIANGLE_GLTF).unwrap();
        path
    }

    #[test]
    fn hierarchy_geometry_and_texture_paths_are_read() {
        let dir = scratch_dir("gltf-tri");
        let scene = read(&write_triangle(&dir)).unwrap();

        assert_eq!(scene.nodes[0].name, "Stage");
        assert_eq!(scene.nodes[0].children, [1]);
        assert_eq!(scene.nodes[1].name, "Parent");
        assert_eq!(scene.nodes[1].children, [2]);
        assert_eq!(scene.nodes[1].transform, Mat4::from_translation(Vec3::new(0.0, 0.0, -2.0)));
        assert_eq!(scene.nodes[2].meshes, [0]);

        let mesh = &scene.meshes[0];
        assert_eq!(mesh.name, "Tri");
        assert_eq!(mesh.positions[1], [1.0, 0.0, 0.0]);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2]]);
        assert!(mesh.normals.is_none());
        assert_eq!(mesh.material, Some(0));

        // The data-URI normal map is skipped.
        assert_eq!(
            scene.materials[0].textures,
            vec![(TextureSlot::Diffuse, "albedo.png".to_owned())]
        );
    }

    // Normal, TEXCOORD_0 and TANGENT, no indices, one percent-encoded image.
    const SURFACE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "mesh": 0 }],
  "meshes": [{
    "name": "Surface",
    "primitives": [{
      "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2, "TANGENT": 3 },
      "material": 0
    }]
  }],
  "materials": [{ "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }],
  "textures": [{ "source": 0 }],
  "images": [{ "uri": "my%20tex.png" }],
  "buffers": [{ "uri": "surface.bin", "byteLength": 144 }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 36 },
    { "buffer": 0, "byteOffset": 72, "byteLength": 24 },
    { "buffer": 0, "byteOffset": 96, "byteLength": 48 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
    { "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" },
    { "bufferView": 3, "componentType": 5126, "count": 3, "type": "VEC4" }
  ]
}"#;

    const SURFACE_UVS: [[f32; 2]; 3] = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0]];

    fn write_surface(dir: &Path) -> std::path::PathBuf {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals: [f32; 9] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let tangents: [f32; 12] = [1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0];
        let mut bin = Vec::new();
        bin.extend_from_slice(bytemuck::cast_slice::<f32, u8>(&positions));
        bin.extend_from_slice(bytemuck::cast_slice::<f32, u8>(&normals));
        bin.extend_from_slice(bytemuck::cast_slice::<[f32; 2], u8>(&SURFACE_UVS));
        bin.extend_from_slice(bytemuck::cast_slice::<f32, u8>(&tangents));
        std::fs::write(dir.join("surface.bin"), bin).unwrap();
        let path = dir.join("surface.gltf");
        std::fs::write(&path, SURFACE_GLTF).unwrap();
        path
    }

    #[test]
    fn texcoords_are_stored_bottom_up_with_matching_bitangents() {
        let dir = scratch_dir("gltf-uv");
        let scene = read(&write_surface(&dir)).unwrap();
        let mesh = &scene.meshes[0];
        assert_eq!(mesh.uvs, Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]));
        assert_eq!(mesh.tangents.as_ref().unwrap()[0], [1.0, 0.0, 0.0]);
        assert_eq!(mesh.bitangents.as_ref().unwrap()[0], [0.0, -1.0, 0.0]);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn default_import_restores_native_texcoords() {
        let dir = scratch_dir("gltf-uv-import");
        let path = write_surface(&dir);
        let model =
            crate::import(&path, &crate::ImportOptions::default(), &mut CountingBackend::default())
                .unwrap();
        let vertices = model.meshes()[0].vertices();
        let uvs: Vec<[f32; 2]> = vertices.iter().map(|v| v.uv).collect();
        assert_eq!(uvs, SURFACE_UVS);
        // Source tangent frame comes through unchanged: B = N x T * w.
        assert_eq!(vertices[0].tangent, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[0].bitangent, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn percent_encoded_image_uris_are_decoded() {
        let dir = scratch_dir("gltf-uri");
        let scene = read(&write_surface(&dir)).unwrap();
        assert_eq!(
            scene.materials[0].textures,
            vec![(TextureSlot::Diffuse, "my tex.png".to_owned())]
        );
    }

    #[test]
    fn invalid_json_fails_to_load() {
        let dir = scratch_dir("gltf-bad");
        let path = dir.join("bad.gltf");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(read(&path), Err(ImportError::LoadFailed { .. })));
    }
}
