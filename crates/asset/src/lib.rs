//! Model import: OBJ/glTF scenes flattened into renderable meshes with
//! their textures decoded, mip-mapped and uploaded once per path.

pub mod backend;
pub mod cache;
pub mod error;
pub mod formats;
pub mod import;
pub mod mesh;
pub mod model;
pub mod process;
pub mod scene;
pub mod texture;

#[cfg(test)]
mod testing;

pub use backend::{AddressMode, FilterMode, SamplerDesc, TextureBackend};
pub use cache::TextureCache;
pub use error::{ImportError, ImportResult, TextureError};
pub use import::{DEFAULT_MAX_DEPTH, ImportOptions, import, import_scene};
pub use mesh::{Mesh, MeshVertex};
pub use model::{Model, ModelStats};
pub use texture::{Texture, TextureData, TextureFormat, TextureRole};
