//! In-process document store.
//!
//! Keeps every collection in process memory, so nothing survives a restart.
//! Used by tests and by `DATABASE_URL=memory`. Each collection sits behind
//! its own `RwLock`; a lock is held only for the duration of one document
//! operation, never across requests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::models::{
    NewProject, NewUser, ProjectDocument, ProjectFilter, RecordId, UserChanges, UserDocument,
};
use super::queries::{ProjectQueries, UserQueries};
use super::{normalize_email, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<RecordId, UserDocument>>,
    projects: RwLock<BTreeMap<RecordId, ProjectDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(
    users: &BTreeMap<RecordId, UserDocument>,
    email: &str,
    except: Option<&RecordId>,
) -> bool {
    users
        .values()
        .any(|user| user.email == email && Some(&user.id) != except)
}

#[async_trait]
impl UserQueries for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserDocument, StoreError> {
        let email = normalize_email(&user.email);
        let mut users = self.users.write().await;
        if email_taken(&users, &email, None) {
            return Err(StoreError::DuplicateKey { field: "email" });
        }

        let now = Utc::now();
        let document = UserDocument {
            id: RecordId::generate(),
            first_name: user.first_name,
            last_name: user.last_name,
            email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(document.id, document.clone());
        Ok(document)
    }

    async fn find_user_by_id(&self, id: &RecordId) -> Result<Option<UserDocument>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDocument>, StoreError> {
        let email = normalize_email(email);
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<UserDocument>, StoreError> {
        let mut users: Vec<_> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|user| (user.created_at, user.id));
        Ok(users)
    }

    async fn update_user(
        &self,
        id: &RecordId,
        changes: UserChanges,
    ) -> Result<Option<UserDocument>, StoreError> {
        let mut users = self.users.write().await;
        let new_email = changes.email.as_deref().map(normalize_email);
        if let Some(email) = &new_email {
            if email_taken(&users, email, Some(id)) {
                return Err(StoreError::DuplicateKey { field: "email" });
            }
        }

        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = new_email {
            user.email = email;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: &RecordId) -> Result<bool, StoreError> {
        Ok(self.users.write().await.remove(id).is_some())
    }
}

#[async_trait]
impl ProjectQueries for MemoryStore {
    async fn insert_project(&self, project: NewProject) -> Result<ProjectDocument, StoreError> {
        let now = Utc::now();
        let document = ProjectDocument {
            id: RecordId::generate(),
            name: project.name,
            description: project.description,
            owner: project.owner,
            thumbnail: project.thumbnail,
            scene_data: project.scene_data,
            assets: project.assets,
            settings: project.settings,
            tags: project.tags,
            is_public: project.is_public,
            is_archived: project.is_archived,
            file_url: project.file_url,
            qr_code: project.qr_code,
            created_at: now,
            updated_at: now,
        };
        self.projects
            .write()
            .await
            .insert(document.id, document.clone());
        Ok(document)
    }

    async fn find_project_by_id(
        &self,
        id: &RecordId,
    ) -> Result<Option<ProjectDocument>, StoreError> {
        Ok(self.projects.read().await.get(id).cloned())
    }

    async fn list_projects(
        &self,
        filter: ProjectFilter,
    ) -> Result<Vec<ProjectDocument>, StoreError> {
        let mut projects: Vec<_> = self
            .projects
            .read()
            .await
            .values()
            .filter(|project| filter.matches(project))
            .cloned()
            .collect();
        projects.sort_by_key(|project| (project.created_at, project.id));
        Ok(projects)
    }

    async fn save_project(
        &self,
        mut project: ProjectDocument,
    ) -> Result<Option<ProjectDocument>, StoreError> {
        let mut projects = self.projects.write().await;
        let Some(slot) = projects.get_mut(&project.id) else {
            return Ok(None);
        };
        project.created_at = slot.created_at;
        project.updated_at = Utc::now();
        *slot = project.clone();
        Ok(Some(project))
    }

    async fn delete_project(&self, id: &RecordId) -> Result<bool, StoreError> {
        Ok(self.projects.write().await.remove(id).is_some())
    }
}
