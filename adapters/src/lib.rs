//! Core `adapters` crate for the collaborators the webar backend delegates to.
//!
//! This crate defines the [`FileStore`] and [`QrEncoder`] traits, which outline
//! what the backend needs from upload storage and QR rendering, and provides
//! the concrete implementations used in production ([`DiskFileStore`],
//! [`SvgQrEncoder`]).

pub mod disk;
pub mod errors;
pub mod models;
pub mod qr;

use async_trait::async_trait;

pub use disk::DiskFileStore;
pub use errors::AdapterError;
pub use models::{IncomingFile, QrImage, StoredFile};
pub use qr::SvgQrEncoder;

/// Persists uploaded binary attachments and returns where they can be fetched.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn store(&self, file: IncomingFile) -> Result<StoredFile, AdapterError>;

    /// Deletes a file previously returned by [`FileStore::store`]. Removing
    /// a file that is already gone is not an error.
    async fn remove(&self, file_name: &str) -> Result<(), AdapterError>;
}

/// Renders a string payload (usually a URL) as a QR image.
pub trait QrEncoder: Send + Sync {
    fn encode(&self, payload: &str) -> Result<QrImage, AdapterError>;
}
