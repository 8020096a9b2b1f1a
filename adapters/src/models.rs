//! Generic data models for the `adapters` crate.
//!
//! These models describe what crosses the boundary between the backend and
//! the external collaborators it delegates to: a raw upload on its way into
//! storage, the reference that storage hands back, and an encoded QR image.

use serde::Serialize;

/// A file received from a client that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// File name as supplied by the client. Never trusted as a path.
    pub original_name: String,
    /// MIME type declared by the client, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(
        original_name: impl Into<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            content_type,
            bytes,
        }
    }

    /// Lowercased extension of the original name, without the dot.
    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Reference to a file that a [`crate::FileStore`] has persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// Name the file was stored under, unique within the store.
    pub file_name: String,
    /// Path clients use to fetch the file back, e.g. `/uploads/<file_name>`.
    pub public_path: String,
    pub size: u64,
}

/// A QR code rendered to an embeddable image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    /// `data:` URL that can be dropped straight into an `<img src>`.
    pub data_url: String,
}
