//! Custom error types specific to the `adapters` crate.
//!
//! This module defines errors that can occur while persisting uploads or
//! rendering QR codes, providing a unified error type for every adapter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    /// Upload is neither an image nor a 3D model.
    #[error("only images or 3D models are allowed (got {0})")]
    UnsupportedFileType(String),

    #[error("file exceeds the {limit} byte limit")]
    FileTooLarge { limit: u64 },

    #[error("upload has no usable file name")]
    MissingFileName,

    /// Name handed to `remove` is not a bare file name.
    #[error("'{0}' is not a stored upload name")]
    ForeignFileName(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("QR encoding failed: {0}")]
    QrEncoding(String),
}

impl AdapterError {
    /// True when the failure was caused by the client's input rather than by
    /// the adapter's environment.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFileType(_) | Self::FileTooLarge { .. } | Self::MissingFileName
        )
    }
}
