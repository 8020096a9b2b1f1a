//! Local-disk implementation of the [`FileStore`] adapter.
//!
//! Uploads are filtered to images and glTF models, size-capped, and written
//! under a single root directory as `<unix-millis>-<sanitized name>`. The
//! public path handed back is rooted at `/uploads`, which the backend serves
//! statically from the same directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::errors::AdapterError;
use crate::models::{IncomingFile, StoredFile};
use crate::FileStore;

/// Extensions accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "gltf", "glb"];

/// Default upload cap, 50 MiB.
pub const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;

const PUBLIC_PREFIX: &str = "/uploads";
const MAX_NAME_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone)]
pub struct DiskFileStore {
    root: PathBuf,
    max_bytes: u64,
}

impl DiskFileStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root directory if it does not exist yet.
    pub async fn ensure_root(&self) -> Result<(), AdapterError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn check(&self, file: &IncomingFile) -> Result<(), AdapterError> {
        let extension = file.extension().unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AdapterError::UnsupportedFileType(file.original_name.clone()));
        }

        // Browsers send glTF binaries as octet-stream, so that is let through
        // on the strength of the extension alone.
        if let Some(content_type) = file.content_type.as_deref() {
            let content_type = content_type.to_ascii_lowercase();
            let declared_ok = content_type == "application/octet-stream"
                || ALLOWED_EXTENSIONS
                    .iter()
                    .any(|allowed| content_type.contains(allowed));
            if !declared_ok {
                return Err(AdapterError::UnsupportedFileType(content_type));
            }
        }

        if file.bytes.len() as u64 > self.max_bytes {
            return Err(AdapterError::FileTooLarge {
                limit: self.max_bytes,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl FileStore for DiskFileStore {
    async fn store(&self, file: IncomingFile) -> Result<StoredFile, AdapterError> {
        self.check(&file)?;
        let base = sanitize_file_name(&file.original_name).ok_or(AdapterError::MissingFileName)?;
        self.ensure_root().await?;

        let millis = chrono::Utc::now().timestamp_millis();
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                format!("{millis}-{base}")
            } else {
                format!("{millis}-{attempt}-{base}")
            };
            let path = self.root.join(&file_name);

            let mut handle = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(handle) => handle,
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };
            let written = match handle.write_all(&file.bytes).await {
                Ok(()) => handle.flush().await,
                Err(err) => Err(err),
            };
            if let Err(err) = written {
                drop(handle);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(err.into());
            }

            log::debug!("stored upload {} ({} bytes)", file_name, file.bytes.len());
            return Ok(StoredFile {
                public_path: format!("{PUBLIC_PREFIX}/{file_name}"),
                file_name,
                size: file.bytes.len() as u64,
            });
        }

        Err(AdapterError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "could not allocate a unique upload name",
        )))
    }

    async fn remove(&self, file_name: &str) -> Result<(), AdapterError> {
        if sanitize_file_name(file_name).as_deref() != Some(file_name) {
            return Err(AdapterError::ForeignFileName(file_name.to_string()));
        }
        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Ok(()) => {
                log::debug!("removed upload {}", file_name);
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// Reduces a client-supplied name to a single safe path component.
fn sanitize_file_name(name: &str) -> Option<String> {
    // Clients on Windows send backslash-separated paths.
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str, size: usize) -> IncomingFile {
        IncomingFile::new(name, Some("image/png".to_string()), vec![7u8; size])
    }

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd.png").as_deref(), Some("passwd.png"));
        assert_eq!(sanitize_file_name("C:\\tmp\\my scene.glb").as_deref(), Some("my_scene.glb"));
        assert_eq!(sanitize_file_name("..."), None);
        assert_eq!(sanitize_file_name(""), None);
    }

    #[tokio::test]
    async fn stores_accepted_file_under_uploads_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path(), DEFAULT_MAX_BYTES);

        let stored = store.store(png("crane.png", 10)).await.unwrap();

        assert!(stored.file_name.ends_with("-crane.png"));
        assert_eq!(stored.public_path, format!("/uploads/{}", stored.file_name));
        assert_eq!(stored.size, 10);
        let on_disk = std::fs::read(dir.path().join(&stored.file_name)).unwrap();
        assert_eq!(on_disk.len(), 10);
    }

    #[tokio::test]
    async fn same_name_twice_gets_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path(), DEFAULT_MAX_BYTES);

        let first = store.store(png("a.png", 1)).await.unwrap();
        let second = store.store(png("a.png", 2)).await.unwrap();

        assert_ne!(first.file_name, second.file_name);
    }

    #[tokio::test]
    async fn accepts_glb_sent_as_octet_stream() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path(), DEFAULT_MAX_BYTES);
        let file = IncomingFile::new(
            "beam.glb",
            Some("application/octet-stream".to_string()),
            vec![1, 2, 3],
        );

        assert!(store.store(file).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_disallowed_extension() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path(), DEFAULT_MAX_BYTES);
        let file = IncomingFile::new("run.exe", Some("image/png".to_string()), vec![0]);

        let err = store.store(file).await.unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedFileType(_)));
    }

    #[tokio::test]
    async fn rejects_mismatched_content_type() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path(), DEFAULT_MAX_BYTES);
        let file = IncomingFile::new("photo.png", Some("text/html".to_string()), vec![0]);

        let err = store.store(file).await.unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedFileType(_)));
    }

    #[tokio::test]
    async fn remove_deletes_stored_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path(), DEFAULT_MAX_BYTES);
        let stored = store.store(png("crane.png", 3)).await.unwrap();

        store.remove(&stored.file_name).await.unwrap();
        assert!(!dir.path().join(&stored.file_name).exists());
        // Already gone.
        store.remove(&stored.file_name).await.unwrap();
    }

    #[tokio::test]
    async fn remove_refuses_paths_outside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path().join("uploads"), DEFAULT_MAX_BYTES);
        std::fs::write(dir.path().join("keep.png"), b"x").unwrap();

        for name in ["../keep.png", "/etc/passwd", "a/b.png", ""] {
            let err = store.remove(name).await.unwrap_err();
            assert!(matches!(err, AdapterError::ForeignFileName(_)), "{name}");
        }
        assert!(dir.path().join("keep.png").exists());
    }

    #[tokio::test]
    async fn rejects_oversized_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileStore::new(dir.path(), 4);

        let err = store.store(png("big.png", 5)).await.unwrap_err();
        assert!(matches!(err, AdapterError::FileTooLarge { limit: 4 }));
    }
}
