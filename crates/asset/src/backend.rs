//! Seam between the texture cache and whatever owns GPU memory.

use crate::texture::{TextureData, TextureRole};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressMode {
    Repeat,
    ClampToEdge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

/// Sampling state requested for an uploaded texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SamplerDesc {
    pub address_mode: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: FilterMode,
}

impl SamplerDesc {
    /// Wrap-repeat with trilinear filtering. Used for every material texture.
    pub const REPEAT_TRILINEAR: SamplerDesc = SamplerDesc {
        address_mode: AddressMode::Repeat,
        mag_filter: FilterMode::Linear,
        min_filter: FilterMode::Linear,
        mipmap_filter: FilterMode::Linear,
    };
}

/// Uploads decoded images and hands back an owned handle.
///
/// `Handle` is move-only from the cache's point of view: it is stored once
/// inside an `Arc<Texture<Handle>>` and released by its `Drop` when the last
/// mesh and the owning cache let go of it.
pub trait TextureBackend {
    type Handle;

    /// Upload `mips` (base level first) for a texture used as `role`.
    fn upload(
        &mut self,
        label: &str,
        role: TextureRole,
        mips: &[TextureData],
        sampler: &SamplerDesc,
    ) -> Self::Handle;
}
