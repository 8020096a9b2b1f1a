//! Projects: creation from a template, listing and per-project CRUD.
//!
//! Reads and writes of a single project are gated by the ownership policy.
//! Every project id from a request is parsed before the store is touched,
//! so a malformed id is always a 400 and never a lookup.

use std::sync::Arc;

use adapters::{FileStore, IncomingFile, QrEncoder, StoredFile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::{self, Action};
use super::templates::TemplateCatalog;
use crate::auth::Principal;
use crate::database::{
    Database, NewProject, ProjectDocument, ProjectSettings, RecordId, UserDocument,
};
use crate::errors::{ApiError, ApiResult};

const PROJECT_NOT_FOUND: &str = "Project not found";

/// Owner field of a project response: the bare id, or a summary of the
/// owning user when the response is populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OwnerRef {
    Id(RecordId),
    Summary(OwnerSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&UserDocument> for OwnerSummary {
    fn from(user: &UserDocument) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub owner: OwnerRef,
    pub thumbnail: String,
    pub scene_data: serde_json::Value,
    pub assets: Vec<serde_json::Value>,
    pub settings: ProjectSettings,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub is_archived: bool,
    pub file_url: String,
    pub qr_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectView {
    fn new(project: ProjectDocument, owner: OwnerRef) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            owner,
            thumbnail: project.thumbnail,
            scene_data: project.scene_data,
            assets: project.assets,
            settings: project.settings,
            tags: project.tags,
            is_public: project.is_public,
            is_archived: project.is_archived,
            file_url: project.file_url,
            qr_code: project.qr_code,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

impl From<ProjectDocument> for ProjectView {
    fn from(project: ProjectDocument) -> Self {
        let owner = OwnerRef::Id(project.owner);
        Self::new(project, owner)
    }
}

/// Parsed create-from-template form.
#[derive(Debug, Default)]
pub struct CreateFromTemplate {
    pub template_id: Option<String>,
    /// Honored only for admins.
    pub owner: Option<String>,
    pub file: Option<IncomingFile>,
}

/// Partial update of a project. Absent fields are left untouched; fields
/// outside this set cannot be changed through the API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub scene_data: Option<serde_json::Value>,
    pub assets: Option<Vec<serde_json::Value>>,
    pub settings: Option<ProjectSettings>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
    pub is_archived: Option<bool>,
    /// Reassignment; honored only for admins.
    pub owner: Option<String>,
}

pub struct ProjectService {
    db: Database,
    templates: Arc<TemplateCatalog>,
    files: Arc<dyn FileStore>,
    qr: Arc<dyn QrEncoder>,
    frontend_url: String,
}

impl ProjectService {
    pub fn new(
        db: Database,
        templates: Arc<TemplateCatalog>,
        files: Arc<dyn FileStore>,
        qr: Arc<dyn QrEncoder>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            db,
            templates,
            files,
            qr,
            frontend_url: frontend_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub async fn create_from_template(
        &self,
        caller: &Principal,
        request: CreateFromTemplate,
    ) -> ApiResult<ProjectView> {
        let template_id = request
            .template_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::bad_request("Template ID is required"))?;
        let template = self
            .templates
            .get(&template_id)
            .ok_or_else(|| ApiError::not_found("Template not found"))?;

        let owner = self.resolve_owner(caller, request.owner).await?;

        let draft = NewProject {
            name: template.name.clone(),
            description: template.description.clone(),
            owner,
            thumbnail: template.thumbnail.clone(),
            scene_data: serde_json::json!({}),
            assets: Vec::new(),
            settings: ProjectSettings::default(),
            tags: vec![template.kind.clone()],
            is_public: false,
            is_archived: false,
            file_url: String::new(),
            qr_code: String::new(),
        };

        let project = match request.file {
            None => self.db.insert_project(draft).await?,
            Some(file) => {
                let stored = self.files.store(file).await?;
                match self.insert_with_upload(draft, &stored).await {
                    Ok(project) => project,
                    Err(err) => {
                        self.discard_upload(&stored).await;
                        return Err(err);
                    }
                }
            }
        };

        tracing::info!(
            user_id = %caller.id,
            project_id = %project.id,
            owner_id = %project.owner,
            template = %template.id,
            "project created from template"
        );
        Ok(project.into())
    }

    /// Encodes the viewer link for an already stored upload and inserts the
    /// project pointing at it.
    async fn insert_with_upload(
        &self,
        mut draft: NewProject,
        stored: &StoredFile,
    ) -> ApiResult<ProjectDocument> {
        let view_url = format!("{}/ar-view/{}", self.frontend_url, stored.file_name);
        draft.qr_code = self.qr.encode(&view_url)?.data_url;
        draft.file_url = stored.public_path.clone();
        Ok(self.db.insert_project(draft).await?)
    }

    /// No project refers to the upload, so it must not stay on disk.
    async fn discard_upload(&self, stored: &StoredFile) {
        if let Err(err) = self.files.remove(&stored.file_name).await {
            tracing::warn!(file = %stored.file_name, error = %err, "failed to remove orphaned upload");
        }
    }

    /// Projects visible to the caller, oldest first, with owners populated.
    pub async fn list(&self, caller: &Principal) -> ApiResult<Vec<ProjectView>> {
        let projects = self.db.list_projects(policy::listing_scope(caller)).await?;
        let mut views = Vec::with_capacity(projects.len());
        for project in projects {
            views.push(self.populate(project).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, caller: &Principal, raw_id: &str) -> ApiResult<ProjectView> {
        let project = self.load(caller, raw_id, Action::Read).await?;
        self.populate(project).await
    }

    pub async fn update(
        &self,
        caller: &Principal,
        raw_id: &str,
        update: ProjectUpdate,
    ) -> ApiResult<ProjectView> {
        let mut project = self.load(caller, raw_id, Action::Update).await?;

        if let Some(name) = update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ApiError::bad_request("Project name cannot be empty"));
            }
            project.name = name.to_string();
        }
        if let Some(description) = update.description {
            project.description = description.trim().to_string();
        }
        if let Some(thumbnail) = update.thumbnail {
            project.thumbnail = thumbnail;
        }
        if let Some(scene_data) = update.scene_data {
            project.scene_data = scene_data;
        }
        if let Some(assets) = update.assets {
            project.assets = assets;
        }
        if let Some(settings) = update.settings {
            project.settings = settings;
        }
        if let Some(tags) = update.tags {
            project.tags = tags;
        }
        if let Some(is_public) = update.is_public {
            project.is_public = is_public;
        }
        if let Some(is_archived) = update.is_archived {
            project.is_archived = is_archived;
        }
        if update.owner.is_some() && caller.is_admin() {
            project.owner = self.resolve_owner(caller, update.owner).await?;
        }

        let saved = self
            .db
            .save_project(project)
            .await?
            .ok_or_else(|| ApiError::not_found(PROJECT_NOT_FOUND))?;
        tracing::debug!(user_id = %caller.id, project_id = %saved.id, "project updated");
        Ok(saved.into())
    }

    pub async fn delete(&self, caller: &Principal, raw_id: &str) -> ApiResult<()> {
        let project = self.load(caller, raw_id, Action::Delete).await?;
        self.db.delete_project(&project.id).await?;
        tracing::info!(user_id = %caller.id, project_id = %project.id, "project deleted");
        Ok(())
    }

    async fn load(&self, caller: &Principal, raw_id: &str, action: Action) -> ApiResult<ProjectDocument> {
        let id = RecordId::parse(raw_id)
            .map_err(|_| ApiError::bad_request("Invalid project ID format"))?;
        let project = self
            .db
            .find_project_by_id(&id)
            .await?
            .ok_or_else(|| ApiError::not_found(PROJECT_NOT_FOUND))?;
        policy::ensure_access(caller, &project, action)?;
        Ok(project)
    }

    /// Admin-requested owners must name an existing user. A non-admin's
    /// request never reaches the store.
    async fn resolve_owner(&self, caller: &Principal, requested: Option<String>) -> ApiResult<RecordId> {
        let requested = match requested.filter(|o| !o.trim().is_empty()) {
            Some(raw) if caller.is_admin() => {
                let id = RecordId::parse(raw.trim())
                    .map_err(|_| ApiError::bad_request("Invalid owner ID format"))?;
                if self.db.find_user_by_id(&id).await?.is_none() {
                    return Err(ApiError::not_found(format!("Owner not found with id of {id}")));
                }
                Some(id)
            }
            _ => None,
        };
        Ok(policy::assign_owner(caller, requested))
    }

    /// The owner's summary replaces the bare id. An owner that no longer
    /// exists is left as the id.
    async fn populate(&self, project: ProjectDocument) -> ApiResult<ProjectView> {
        let owner = match self.db.find_user_by_id(&project.owner).await? {
            Some(user) => OwnerRef::Summary(OwnerSummary::from(&user)),
            None => OwnerRef::Id(project.owner),
        };
        Ok(ProjectView::new(project, owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{PasswordHasher, Role};
    use crate::database::connect_in_memory;
    use crate::services::users::{NewAccount, UserService};
    use adapters::{DiskFileStore, SvgQrEncoder};

    struct Fixture {
        projects: ProjectService,
        users: UserService,
        uploads: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        fixture_with_frontend("http://localhost:5173/")
    }

    fn fixture_with_frontend(frontend_url: &str) -> Fixture {
        let db = connect_in_memory();
        let uploads = tempfile::tempdir().unwrap();
        let files = DiskFileStore::new(uploads.path(), adapters::disk::DEFAULT_MAX_BYTES);
        let projects = ProjectService::new(
            db.clone(),
            Arc::new(TemplateCatalog::builtin()),
            Arc::new(files),
            Arc::new(SvgQrEncoder::default()),
            frontend_url,
        );
        let users = UserService::new(db, Arc::new(PasswordHasher::new(8, 1).unwrap()));
        Fixture {
            projects,
            users,
            uploads,
        }
    }

    async fn principal(fx: &Fixture, email: &str, role: Role) -> Principal {
        let account = NewAccount::new("Test", "User", email, "secret1")
            .unwrap()
            .with_role(role);
        let user = fx.users.create_account(account).await.unwrap();
        Principal {
            id: user.id,
            role: user.role,
        }
    }

    fn from_template(id: &str) -> CreateFromTemplate {
        CreateFromTemplate {
            template_id: Some(id.to_string()),
            ..CreateFromTemplate::default()
        }
    }

    #[tokio::test]
    async fn project_is_seeded_from_the_template() {
        let fx = fixture();
        let user = principal(&fx, "u@example.com", Role::User).await;

        let project = fx
            .projects
            .create_from_template(&user, from_template("template-1"))
            .await
            .unwrap();

        assert_eq!(project.name, "Crane Operation AR Simulator");
        assert_eq!(project.tags, ["Equipment Simulation"]);
        assert_eq!(project.settings, ProjectSettings::default());
        assert_eq!(project.owner, OwnerRef::Id(user.id));
        assert!(!project.is_public && !project.is_archived);
        assert_eq!(project.file_url, "");
        assert_eq!(project.qr_code, "");
    }

    #[tokio::test]
    async fn template_id_is_required_and_must_exist() {
        let fx = fixture();
        let user = principal(&fx, "u@example.com", Role::User).await;

        let missing = fx
            .projects
            .create_from_template(&user, CreateFromTemplate::default())
            .await;
        assert!(matches!(missing, Err(ApiError::BadRequest(ref m)) if m == "Template ID is required"));

        let unknown = fx
            .projects
            .create_from_template(&user, from_template("template-42"))
            .await;
        assert!(matches!(unknown, Err(ApiError::NotFound(ref m)) if m == "Template not found"));
    }

    #[tokio::test]
    async fn upload_gets_a_url_and_qr_code() {
        let fx = fixture();
        let user = principal(&fx, "u@example.com", Role::User).await;
        let request = CreateFromTemplate {
            file: Some(IncomingFile::new(
                "scene.glb",
                Some("model/gltf-binary".into()),
                vec![1, 2, 3],
            )),
            ..from_template("template-2")
        };

        let project = fx.projects.create_from_template(&user, request).await.unwrap();
        assert!(project.file_url.starts_with("/uploads/"));
        assert!(project.file_url.ends_with("-scene.glb"));
        assert!(project.qr_code.starts_with("data:image/svg+xml;base64,"));
    }

    #[tokio::test]
    async fn failed_qr_encoding_leaves_no_upload_behind() {
        // No QR version holds a link this long.
        let fx = fixture_with_frontend(&format!("http://localhost/{}", "a".repeat(3_000)));
        let user = principal(&fx, "u@example.com", Role::User).await;
        let request = CreateFromTemplate {
            file: Some(IncomingFile::new(
                "scene.glb",
                Some("model/gltf-binary".into()),
                vec![1, 2, 3],
            )),
            ..from_template("template-2")
        };

        let result = fx.projects.create_from_template(&user, request).await;
        assert!(matches!(result, Err(ApiError::Internal(_))));

        let leftovers = std::fs::read_dir(fx.uploads.path()).unwrap().count();
        assert_eq!(leftovers, 0);
        assert!(fx.projects.list(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_admin_owner_request_is_ignored() {
        let fx = fixture();
        let user = principal(&fx, "u@example.com", Role::User).await;
        let other = principal(&fx, "v@example.com", Role::User).await;

        let request = CreateFromTemplate {
            owner: Some(other.id.to_string()),
            ..from_template("template-1")
        };
        let project = fx.projects.create_from_template(&user, request).await.unwrap();
        assert_eq!(project.owner, OwnerRef::Id(user.id));
    }

    #[tokio::test]
    async fn admin_may_create_for_an_existing_user_only() {
        let fx = fixture();
        let admin = principal(&fx, "admin@example.com", Role::Admin).await;
        let user = principal(&fx, "u@example.com", Role::User).await;

        let request = CreateFromTemplate {
            owner: Some(user.id.to_string()),
            ..from_template("template-3")
        };
        let project = fx.projects.create_from_template(&admin, request).await.unwrap();
        assert_eq!(project.owner, OwnerRef::Id(user.id));

        let ghost = CreateFromTemplate {
            owner: Some(RecordId::generate().to_string()),
            ..from_template("template-3")
        };
        assert!(matches!(
            fx.projects.create_from_template(&admin, ghost).await,
            Err(ApiError::NotFound(_))
        ));

        let malformed = CreateFromTemplate {
            owner: Some("bogus".into()),
            ..from_template("template-3")
        };
        assert!(matches!(
            fx.projects.create_from_template(&admin, malformed).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn listing_is_scoped_and_populated() {
        let fx = fixture();
        let admin = principal(&fx, "admin@example.com", Role::Admin).await;
        let u = principal(&fx, "u@example.com", Role::User).await;
        let v = principal(&fx, "v@example.com", Role::User).await;

        for caller in [&u, &v, &u] {
            fx.projects
                .create_from_template(caller, from_template("template-1"))
                .await
                .unwrap();
        }

        let mine = fx.projects.list(&u).await.unwrap();
        assert_eq!(mine.len(), 2);
        for project in &mine {
            match &project.owner {
                OwnerRef::Summary(owner) => {
                    assert_eq!(owner.id, u.id);
                    assert_eq!(owner.email, "u@example.com");
                }
                other => panic!("expected populated owner, got {other:?}"),
            }
        }
        assert!(mine[0].created_at <= mine[1].created_at);

        assert_eq!(fx.projects.list(&v).await.unwrap().len(), 1);
        assert_eq!(fx.projects.list(&admin).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_touch_a_project() {
        let fx = fixture();
        let admin = principal(&fx, "admin@example.com", Role::Admin).await;
        let u = principal(&fx, "u@example.com", Role::User).await;
        let v = principal(&fx, "v@example.com", Role::User).await;
        let id = fx
            .projects
            .create_from_template(&u, from_template("template-1"))
            .await
            .unwrap()
            .id
            .to_string();

        assert!(fx.projects.get(&u, &id).await.is_ok());
        assert!(matches!(fx.projects.get(&v, &id).await, Err(ApiError::Forbidden(_))));
        assert!(matches!(
            fx.projects.update(&v, &id, ProjectUpdate::default()).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(fx.projects.delete(&v, &id).await, Err(ApiError::Forbidden(_))));

        assert!(fx.projects.get(&admin, &id).await.is_ok());
        fx.projects.delete(&admin, &id).await.unwrap();
        assert!(matches!(fx.projects.get(&u, &id).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn owner_may_delete_their_own_project() {
        let fx = fixture();
        let u = principal(&fx, "u@example.com", Role::User).await;
        let id = fx
            .projects
            .create_from_template(&u, from_template("template-2"))
            .await
            .unwrap()
            .id
            .to_string();

        fx.projects.delete(&u, &id).await.unwrap();
        assert!(matches!(fx.projects.get(&u, &id).await, Err(ApiError::NotFound(_))));
        assert!(fx.projects.list(&u).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_applies_patch_and_ignores_non_admin_owner() {
        let fx = fixture();
        let u = principal(&fx, "u@example.com", Role::User).await;
        let v = principal(&fx, "v@example.com", Role::User).await;
        let id = fx
            .projects
            .create_from_template(&u, from_template("template-1"))
            .await
            .unwrap()
            .id
            .to_string();

        let update: ProjectUpdate = serde_json::from_value(serde_json::json!({
            "name": "Tower crane, night shift",
            "isPublic": true,
            "owner": v.id.to_string(),
        }))
        .unwrap();
        let updated = fx.projects.update(&u, &id, update).await.unwrap();
        assert_eq!(updated.name, "Tower crane, night shift");
        assert!(updated.is_public);
        assert_eq!(updated.owner, OwnerRef::Id(u.id));
        assert_eq!(updated.description, "Interactive training for crane operators with real-time physics feedback");
    }

    #[tokio::test]
    async fn malformed_id_is_rejected_before_lookup() {
        let fx = fixture();
        let u = principal(&fx, "u@example.com", Role::User).await;
        for result in [
            fx.projects.get(&u, "not-an-objectid").await.map(|_| ()),
            fx.projects
                .update(&u, "not-an-objectid", ProjectUpdate::default())
                .await
                .map(|_| ()),
            fx.projects.delete(&u, "not-an-objectid").await,
        ] {
            assert!(matches!(result, Err(ApiError::BadRequest(ref m)) if m == "Invalid project ID format"));
        }
    }
}
