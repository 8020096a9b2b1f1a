//! Module for database connection setup and common utilities.
//!
//! This module owns the store handle shared by every service. The handle is
//! created once at startup from `DATABASE_URL` and cloned into the services;
//! there is no process-wide connection object.

pub mod memory;
pub mod models;
pub mod queries;
pub mod sqlite;

use std::sync::Arc;

use thiserror::Error;

pub use memory::MemoryStore;
pub use models::*;
pub use queries::{ProjectQueries, Store, UserQueries};
pub use sqlite::SqliteStore;

/// `DATABASE_URL` value that selects the in-process store.
pub const MEMORY_URL: &str = "memory";

/// Shared handle to the document store.
pub type Database = Arc<dyn Store>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate value for unique field '{field}'")]
    DuplicateKey { field: &'static str },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded into a document.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Emails are kept trimmed and lowercased by every store.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Opens the store named by `url`: [`MEMORY_URL`] or a `sqlite:` URL.
pub async fn connect(url: &str) -> Result<Database, StoreError> {
    if url == MEMORY_URL {
        return Ok(connect_in_memory());
    }
    if url.starts_with("sqlite:") {
        let store = SqliteStore::connect(url).await?;
        tracing::info!(%url, "opened sqlite document store");
        return Ok(Arc::new(store));
    }

    let scheme = url.split_once(':').map_or(url, |(scheme, _)| scheme);
    Err(StoreError::Unavailable(format!(
        "unsupported database scheme '{scheme}'"
    )))
}

/// Opens the in-process document store. Nothing survives a restart.
pub fn connect_in_memory() -> Database {
    tracing::info!("using in-memory document store");
    Arc::new(MemoryStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_picks_the_store_from_the_url() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("app.db").display());
        assert!(connect(&url).await.is_ok());
        assert!(connect(MEMORY_URL).await.is_ok());

        let err = connect("postgres://user:secret@db/app").await.err().unwrap();
        assert!(matches!(&err, StoreError::Unavailable(msg) if msg.contains("'postgres'")));
        assert!(!err.to_string().contains("secret"));
    }
}
