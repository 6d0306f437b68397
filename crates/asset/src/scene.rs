//! Format-neutral scene graph produced by the format readers and consumed by
//! the importer. Nodes, meshes and materials live in flat arrays and refer
//! to each other by index.

use glam::Mat4;

use crate::texture::TextureRole;

/// Texture slot as named by the source format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Diffuse,
    Specular,
    Ambient,
    /// OBJ `map_Bump` / `bump`; most exporters put normal maps here.
    Height,
    /// Dedicated normal-map slot (glTF `normalTexture`).
    Normals,
}

impl TextureSlot {
    /// Source slots feeding a material role, in lookup order.
    pub fn for_role(role: TextureRole) -> &'static [TextureSlot] {
        match role {
            TextureRole::Diffuse => &[TextureSlot::Diffuse],
            TextureRole::Specular => &[TextureSlot::Specular],
            TextureRole::Normal => &[TextureSlot::Height, TextureSlot::Normals],
            TextureRole::Height => &[TextureSlot::Ambient],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMaterial {
    pub name: String,
    /// Declared textures in source order. Paths are kept verbatim.
    pub textures: Vec<(TextureSlot, String)>,
}

impl RawMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            textures: Vec::new(),
        }
    }

    pub fn with_texture(mut self, slot: TextureSlot, path: impl Into<String>) -> Self {
        self.textures.push((slot, path.into()));
        self
    }

    /// Declared paths for `role`, grouped by slot then in source order.
    pub fn declared(&self, role: TextureRole) -> Vec<&str> {
        TextureSlot::for_role(role)
            .iter()
            .flat_map(move |slot| {
                self.textures
                    .iter()
                    .filter(move |(s, _)| s == slot)
                    .map(|(_, path)| path.as_str())
            })
            .collect()
    }
}

/// Geometry as read from the file, before preprocessing. All per-vertex
/// arrays that are present have `positions.len()` entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    /// First texture-coordinate channel.
    pub uvs: Option<Vec<[f32; 2]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    pub bitangents: Option<Vec<[f32; 3]>>,
    /// Polygon faces as vertex indices; triangles once preprocessed.
    pub faces: Vec<Vec<u32>>,
    pub material: Option<usize>,
}

impl RawMesh {
    pub fn new(name: impl Into<String>, positions: Vec<[f32; 3]>, faces: Vec<Vec<u32>>) -> Self {
        Self {
            name: name.into(),
            positions,
            faces,
            ..Self::default()
        }
    }

    /// Split a flat index list into faces of `arity` indices.
    pub fn faces_from_flat(indices: &[u32], arity: usize) -> Vec<Vec<u32>> {
        indices.chunks(arity).map(<[u32]>::to_vec).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawNode {
    pub name: String,
    /// Local transform relative to the parent node.
    pub transform: Mat4,
    pub meshes: Vec<usize>,
    pub children: Vec<usize>,
}

impl RawNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawScene {
    pub nodes: Vec<RawNode>,
    pub root: Option<usize>,
    pub meshes: Vec<RawMesh>,
    pub materials: Vec<RawMaterial>,
    /// Set by a reader that could not produce the whole scene.
    pub incomplete: bool,
}

impl RawScene {
    /// Empty scene with a root node already in place.
    pub fn with_root(name: impl Into<String>) -> Self {
        Self {
            nodes: vec![RawNode::new(name)],
            root: Some(0),
            ..Self::default()
        }
    }

    /// Append `node` as the last child of `parent` and return its index.
    pub fn add_child(&mut self, parent: usize, node: RawNode) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        self.nodes[parent].children.push(index);
        index
    }

    pub fn add_mesh(&mut self, mesh: RawMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    pub fn add_material(&mut self, material: RawMaterial) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_role_reads_height_slot_before_normals_slot() {
        let mat = RawMaterial::new("m")
            .with_texture(TextureSlot::Normals, "n.png")
            .with_texture(TextureSlot::Diffuse, "d0.png")
            .with_texture(TextureSlot::Height, "bump.png")
            .with_texture(TextureSlot::Diffuse, "d1.png")
            .with_texture(TextureSlot::Ambient, "ka.png");

        assert_eq!(mat.declared(TextureRole::Diffuse), ["d0.png", "d1.png"]);
        assert_eq!(mat.declared(TextureRole::Normal), ["bump.png", "n.png"]);
        assert_eq!(mat.declared(TextureRole::Height), ["ka.png"]);
        assert!(mat.declared(TextureRole::Specular).is_empty());
    }

    #[test]
    fn add_child_links_parent() {
        let mut scene = RawScene::with_root("root");
        let a = scene.add_child(0, RawNode::new("a"));
        let b = scene.add_child(a, RawNode::new("b"));
        assert_eq!(scene.nodes[0].children, [a]);
        assert_eq!(scene.nodes[a].children, [b]);
    }

    #[test]
    fn flat_indices_split_into_faces() {
        let faces = RawMesh::faces_from_flat(&[0, 1, 2, 2, 3, 0], 3);
        assert_eq!(faces, vec![vec![0, 1, 2], vec![2, 3, 0]]);
    }
}
