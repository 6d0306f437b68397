//! Test helpers: a counting texture backend and scratch directories.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{Rgba, RgbaImage};

use crate::backend::{SamplerDesc, TextureBackend};
use crate::texture::{TextureData, TextureRole};

/// Records every upload; handles count their own release.
#[derive(Default)]
pub struct CountingBackend {
    pub uploads: Vec<(String, TextureRole, usize)>,
    pub released: Rc<Cell<usize>>,
    pub samplers: Vec<SamplerDesc>,
}

#[derive(Debug)]
pub struct CountingHandle {
    pub id: usize,
    released: Rc<Cell<usize>>,
}

impl Drop for CountingHandle {
    fn drop(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

impl CountingBackend {
    pub fn upload_count(&self) -> usize {
        self.uploads.len()
    }

    pub fn uploaded_labels(&self) -> Vec<String> {
        self.uploads.iter().map(|(l, _, _)| l.clone()).collect()
    }
}

impl TextureBackend for CountingBackend {
    type Handle = CountingHandle;

    fn upload(
        &mut self,
        label: &str,
        role: TextureRole,
        mips: &[TextureData],
        sampler: &SamplerDesc,
    ) -> CountingHandle {
        self.uploads.push((label.to_owned(), role, mips.len()));
        self.samplers.push(*sampler);
        CountingHandle {
            id: self.uploads.len(),
            released: Rc::clone(&self.released),
        }
    }
}

/// Fresh, empty directory under the system temp dir.
pub fn scratch_dir(tag: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "orbview-asset-{tag}-{}-{n}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

pub fn write_png(dir: &Path, name: &str, size: u32) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create texture dir");
    }
    RgbaImage::from_pixel(size, size, Rgba([255, 128, 0, 255]))
        .save(&path)
        .expect("write png");
}
