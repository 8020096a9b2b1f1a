//! Database query interfaces (Data Access Objects).
//!
//! This module centralizes the operations the services may perform against
//! the document store. Every method is a single-document read or write; the
//! store guarantees atomicity per document and nothing more.

use async_trait::async_trait;

use super::models::{
    NewProject, NewUser, ProjectDocument, ProjectFilter, RecordId, UserChanges, UserDocument,
};
use super::StoreError;

#[async_trait]
pub trait UserQueries: Send + Sync {
    /// Fails with [`StoreError::DuplicateKey`] when the email is taken,
    /// compared case-insensitively.
    async fn insert_user(&self, user: NewUser) -> Result<UserDocument, StoreError>;

    async fn find_user_by_id(&self, id: &RecordId) -> Result<Option<UserDocument>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDocument>, StoreError>;

    /// Ordered by `created_at` then id.
    async fn list_users(&self) -> Result<Vec<UserDocument>, StoreError>;

    /// Returns `Ok(None)` when the user does not exist.
    async fn update_user(
        &self,
        id: &RecordId,
        changes: UserChanges,
    ) -> Result<Option<UserDocument>, StoreError>;

    /// Returns whether a user was removed.
    async fn delete_user(&self, id: &RecordId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait ProjectQueries: Send + Sync {
    async fn insert_project(&self, project: NewProject) -> Result<ProjectDocument, StoreError>;

    async fn find_project_by_id(
        &self,
        id: &RecordId,
    ) -> Result<Option<ProjectDocument>, StoreError>;

    /// Projects matching `filter`, ordered by `created_at` then id.
    async fn list_projects(&self, filter: ProjectFilter)
        -> Result<Vec<ProjectDocument>, StoreError>;

    /// Overwrites the stored document with the same id. Last write wins.
    /// Returns `Ok(None)` when the project was deleted in the meantime.
    async fn save_project(
        &self,
        project: ProjectDocument,
    ) -> Result<Option<ProjectDocument>, StoreError>;

    async fn delete_project(&self, id: &RecordId) -> Result<bool, StoreError>;
}

/// Everything the backend needs from a document store.
pub trait Store: UserQueries + ProjectQueries {}

impl<T: UserQueries + ProjectQueries> Store for T {}
