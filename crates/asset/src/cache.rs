//! Per-model texture cache: each distinct declared path is decoded and
//! uploaded at most once, then shared between meshes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{SamplerDesc, TextureBackend};
use crate::error::TextureError;
use crate::scene::RawMaterial;
use crate::texture::{Texture, TextureData, TextureRole};

/// Keys are declared paths compared as plain strings: `a/b.png` and
/// `a/./b.png` are two different entries even when they name the same file.
pub struct TextureCache<H> {
    directory: PathBuf,
    textures: Vec<Arc<Texture<H>>>,
    by_path: HashMap<String, usize>,
}

impl<H> TextureCache<H> {
    /// Cache resolving relative texture paths against `directory`
    /// (normally the model file's directory).
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            textures: Vec::new(),
            by_path: HashMap::new(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn get(&self, path: &str) -> Option<&Arc<Texture<H>>> {
        self.by_path.get(path).map(|&i| &self.textures[i])
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Cached textures in first-load order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Texture<H>>> {
        self.textures.iter()
    }

    /// Return the cached texture for `path`, or decode `<directory>/<path>`,
    /// upload it with its full mip chain and cache it. On a hit the stored
    /// record is returned unchanged, including the role it was first
    /// loaded with. Failed decodes are not cached.
    pub fn load_or_reuse<B>(
        &mut self,
        path: &str,
        role: TextureRole,
        backend: &mut B,
    ) -> Result<Arc<Texture<H>>, TextureError>
    where
        B: TextureBackend<Handle = H>,
    {
        if let Some(texture) = self.get(path) {
            log::trace!("Texture cache hit: {}", path);
            return Ok(Arc::clone(texture));
        }

        let file = self.directory.join(path);
        let data = TextureData::load(&file).map_err(|source| TextureError::DecodeFailed {
            path: path.to_owned(),
            source,
        })?;

        let mips = data.mip_chain();
        let handle = backend.upload(path, role, &mips, &SamplerDesc::REPEAT_TRILINEAR);
        let texture = Arc::new(Texture::new(path, role, data.width, data.height, handle));
        log::debug!(
            "Loaded {} {:?} ({}x{}, {} mips)",
            role.as_str(),
            file,
            data.width,
            data.height,
            mips.len()
        );

        self.by_path.insert(path.to_owned(), self.textures.len());
        self.textures.push(Arc::clone(&texture));
        Ok(texture)
    }

    /// Every texture `material` declares for `role`, in declaration order.
    /// Textures that fail to load are logged and left out.
    pub fn resolve<B>(
        &mut self,
        material: &RawMaterial,
        role: TextureRole,
        backend: &mut B,
    ) -> Vec<Arc<Texture<H>>>
    where
        B: TextureBackend<Handle = H>,
    {
        material
            .declared(role)
            .into_iter()
            .filter_map(|path| match self.load_or_reuse(path, role, backend) {
                Ok(texture) => Some(texture),
                Err(err) => {
                    log::warn!("Skipping {} of material '{}': {}", role.as_str(), material.name, err);
                    None
                }
            })
            .collect()
    }
}

impl<H> std::fmt::Debug for TextureCache<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureCache")
            .field("directory", &self.directory)
            .field("paths", &self.textures.iter().map(|t| t.path()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::scene::TextureSlot;
    use crate::testing::{CountingBackend, scratch_dir, write_png};

    #[test]
    fn same_path_is_uploaded_once_and_shared() {
        let dir = scratch_dir("cache-hit");
        write_png(&dir, "wood.png", 4);
        let mut backend = CountingBackend::default();
        let mut cache = TextureCache::new(&dir);

        let a = cache.load_or_reuse("wood.png", TextureRole::Diffuse, &mut backend).unwrap();
        let b = cache.load_or_reuse("wood.png", TextureRole::Specular, &mut backend).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.role(), TextureRole::Diffuse);
        assert_eq!(backend.upload_count(), 1);
        assert_eq!(cache.len(), 1);
        // 4x4 -> 4, 2, 1
        assert_eq!(backend.uploads[0].2, 3);
        assert_eq!(backend.samplers[0], SamplerDesc::REPEAT_TRILINEAR);
    }

    #[test]
    fn different_spelling_is_a_cache_miss() {
        let dir = scratch_dir("cache-spelling");
        write_png(&dir, "tex/wood.png", 2);
        let mut backend = CountingBackend::default();
        let mut cache = TextureCache::new(&dir);

        let a = cache.load_or_reuse("tex/wood.png", TextureRole::Diffuse, &mut backend).unwrap();
        let b = cache.load_or_reuse("tex/./wood.png", TextureRole::Diffuse, &mut backend).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(backend.upload_count(), 2);
        assert_eq!(backend.uploaded_labels(), ["tex/wood.png", "tex/./wood.png"]);
    }

    #[test]
    fn missing_file_is_reported_and_not_cached() {
        let dir = scratch_dir("cache-missing");
        let mut backend = CountingBackend::default();
        let mut cache = TextureCache::<_>::new(&dir);

        let err = cache
            .load_or_reuse("nope.png", TextureRole::Diffuse, &mut backend)
            .unwrap_err();
        assert!(matches!(err, TextureError::DecodeFailed { ref path, .. } if path == "nope.png"));
        assert!(cache.is_empty());
        assert_eq!(backend.upload_count(), 0);

        // A later attempt tries again instead of remembering the failure.
        write_png(&dir, "nope.png", 1);
        assert!(cache.load_or_reuse("nope.png", TextureRole::Diffuse, &mut backend).is_ok());
    }

    #[test]
    fn resolve_skips_broken_textures_and_keeps_order() {
        let dir = scratch_dir("cache-resolve");
        write_png(&dir, "a.png", 2);
        write_png(&dir, "c.png", 2);
        std::fs::write(dir.join("b.png"), b"not an image").unwrap();

        let material = RawMaterial::new("mat")
            .with_texture(TextureSlot::Diffuse, "a.png")
            .with_texture(TextureSlot::Diffuse, "b.png")
            .with_texture(TextureSlot::Diffuse, "c.png");

        let mut backend = CountingBackend::default();
        let mut cache = TextureCache::new(&dir);
        let resolved = cache.resolve(&material, TextureRole::Diffuse, &mut backend);

        let paths: Vec<_> = resolved.iter().map(|t| t.path()).collect();
        assert_eq!(paths, ["a.png", "c.png"]);
        assert!(cache.resolve(&material, TextureRole::Specular, &mut backend).is_empty());
    }

    #[test]
    fn handles_are_released_when_cache_and_users_drop() {
        let dir = scratch_dir("cache-release");
        write_png(&dir, "a.png", 2);
        let mut backend = CountingBackend::default();
        let released = Rc::clone(&backend.released);

        let mut cache = TextureCache::new(&dir);
        let user = cache.load_or_reuse("a.png", TextureRole::Diffuse, &mut backend).unwrap();
        drop(cache);
        assert_eq!(released.get(), 0);
        drop(user);
        assert_eq!(released.get(), 1);
    }
}
