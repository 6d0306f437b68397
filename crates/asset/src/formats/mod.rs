//! Scene file readers. Each one turns a file into a [`RawScene`].

pub mod gltf;
pub mod obj;

use std::path::Path;

use crate::error::{ImportError, ImportResult};
use crate::scene::RawScene;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SceneFormat {
    Obj,
    Gltf,
}

impl SceneFormat {
    /// Pick a reader from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "obj" => Some(SceneFormat::Obj),
            "gltf" | "glb" => Some(SceneFormat::Gltf),
            _ => None,
        }
    }
}

/// Read `path` with the reader matching its extension.
pub fn read_scene(path: &Path) -> ImportResult<RawScene> {
    match SceneFormat::from_path(path) {
        Some(SceneFormat::Obj) => obj::read(path),
        Some(SceneFormat::Gltf) => gltf::read(path),
        None => Err(ImportError::load_failed(
            path,
            "unsupported scene format (expected .obj, .gltf or .glb)",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(SceneFormat::from_path(Path::new("a/b.OBJ")), Some(SceneFormat::Obj));
        assert_eq!(SceneFormat::from_path(Path::new("scene.glb")), Some(SceneFormat::Gltf));
        assert_eq!(SceneFormat::from_path(Path::new("scene.fbx")), None);
        assert_eq!(SceneFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn unsupported_extension_fails_to_load() {
        let err = read_scene(Path::new("model.fbx")).unwrap_err();
        assert!(matches!(err, ImportError::LoadFailed { .. }));
        assert!(err.to_string().contains("unsupported"));
    }
}
