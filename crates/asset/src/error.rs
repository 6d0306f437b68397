//! Error taxonomy for scene import and texture loading.

use std::path::PathBuf;

use thiserror::Error;

/// Scene-level failure. No partial [`crate::model::Model`] is ever returned
/// alongside one of these.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Unreadable, unsupported, unparsable or incomplete scene. `reason` is
    /// the parser's own diagnostic.
    #[error("failed to load scene {}: {reason}", path.display())]
    LoadFailed { path: PathBuf, reason: String },

    /// Geometry that breaks the triangle-list contract after preprocessing.
    #[error("malformed geometry in mesh '{mesh}': {detail}")]
    MalformedGeometry { mesh: String, detail: String },

    #[error("scene hierarchy is deeper than the configured limit of {limit} levels")]
    DepthLimitExceeded { limit: usize },
}

impl ImportError {
    pub(crate) fn load_failed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::LoadFailed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(mesh: &str, detail: impl Into<String>) -> Self {
        Self::MalformedGeometry {
            mesh: mesh.to_owned(),
            detail: detail.into(),
        }
    }
}

/// Per-texture failure. Never aborts an import; the texture is skipped.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode texture '{path}': {source}")]
    DecodeFailed {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

pub type ImportResult<T> = Result<T, ImportError>;
