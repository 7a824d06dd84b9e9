use std::path::PathBuf;

use thiserror::Error;

use crate::slots::SlotId;

/// Library error type for slideshow operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The photo directory is unreadable or holds no eligible `.jpg` file.
    #[error("no eligible .jpg file in {}", dir.display())]
    NoEligibleFile { dir: PathBuf },

    /// The file could not be opened or is not a decodable JPEG.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// The presenter rejected a pixel buffer for a texture slot.
    #[error("failed to upload into slot {slot}: {reason}")]
    Upload { slot: SlotId, reason: String },

    /// The display was closed by the user or the window system.
    #[error("display closed")]
    DisplayClosed,

    /// Window or graphics backend failure.
    #[error("display error: {0}")]
    Display(anyhow::Error),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
