//! SQLite document store.
//!
//! Users and projects are rows; the free-form project parts (scene data,
//! assets, settings and tags) are JSON text columns. Email uniqueness is
//! enforced by a unique index on `lower(email)`, so two processes sharing
//! a database file cannot both register the same address.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use super::models::{
    NewProject, NewUser, ProjectDocument, ProjectFilter, RecordId, UserChanges, UserDocument,
};
use super::queries::{ProjectQueries, UserQueries};
use super::{normalize_email, StoreError};

const EMAIL_INDEX: &str = "users_email_key";

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS users (
        id            TEXT PRIMARY KEY NOT NULL,
        first_name    TEXT NOT NULL,
        last_name     TEXT NOT NULL,
        email         TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        role          TEXT NOT NULL,
        created_at    INTEGER NOT NULL,
        updated_at    INTEGER NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (lower(email))",
    "CREATE TABLE IF NOT EXISTS projects (
        id          TEXT PRIMARY KEY NOT NULL,
        name        TEXT NOT NULL,
        description TEXT NOT NULL,
        owner       TEXT NOT NULL,
        thumbnail   TEXT NOT NULL,
        scene_data  TEXT NOT NULL,
        assets      TEXT NOT NULL,
        settings    TEXT NOT NULL,
        tags        TEXT NOT NULL,
        is_public   INTEGER NOT NULL,
        is_archived INTEGER NOT NULL,
        file_url    TEXT NOT NULL,
        qr_code     TEXT NOT NULL,
        created_at  INTEGER NOT NULL,
        updated_at  INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS projects_owner_created ON projects (owner, created_at)",
];

macro_rules! user_columns {
    () => {
        "id, first_name, last_name, email, password_hash, role, created_at, updated_at"
    };
}

macro_rules! project_columns {
    () => {
        "id, name, description, owner, thumbnail, scene_data, assets, settings, tags, \
         is_public, is_archived, file_url, qr_code, created_at, updated_at"
    };
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                if db.message().contains(EMAIL_INDEX) {
                    Self::DuplicateKey { field: "email" }
                } else {
                    Self::DuplicateKey { field: "id" }
                }
            }
            _ => Self::Unavailable(err.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens the database named by a `sqlite:` URL, creating the file and
    /// the schema when missing.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?;
        Self::open_with(options).await
    }

    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_with(SqliteConnectOptions::new().filename(path)).await
    }

    async fn open_with(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        let options = options
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Timestamps are stored as microseconds, so documents handed back from a
/// write carry the same precision as documents read later.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn timestamp(column: &str, micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::Corrupt(format!("{column} out of range: {micros}")))
}

fn record_id(column: &str, raw: &str) -> Result<RecordId, StoreError> {
    RecordId::parse(raw).map_err(|err| StoreError::Corrupt(format!("{column}: {err}")))
}

fn to_json<T: Serialize>(column: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|err| StoreError::Corrupt(format!("{column}: {err}")))
}

fn from_json<T: DeserializeOwned>(column: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|err| StoreError::Corrupt(format!("{column}: {err}")))
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<UserRow> for UserDocument {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record_id("users.id", &row.id)?,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.password_hash,
            role: row
                .role
                .parse()
                .map_err(|err| StoreError::Corrupt(format!("users.role: {err}")))?,
            created_at: timestamp("users.created_at", row.created_at)?,
            updated_at: timestamp("users.updated_at", row.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    description: String,
    owner: String,
    thumbnail: String,
    scene_data: String,
    assets: String,
    settings: String,
    tags: String,
    is_public: bool,
    is_archived: bool,
    file_url: String,
    qr_code: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ProjectRow> for ProjectDocument {
    type Error = StoreError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record_id("projects.id", &row.id)?,
            name: row.name,
            description: row.description,
            owner: record_id("projects.owner", &row.owner)?,
            thumbnail: row.thumbnail,
            scene_data: from_json("projects.scene_data", &row.scene_data)?,
            assets: from_json("projects.assets", &row.assets)?,
            settings: from_json("projects.settings", &row.settings)?,
            tags: from_json("projects.tags", &row.tags)?,
            is_public: row.is_public,
            is_archived: row.is_archived,
            file_url: row.file_url,
            qr_code: row.qr_code,
            created_at: timestamp("projects.created_at", row.created_at)?,
            updated_at: timestamp("projects.updated_at", row.updated_at)?,
        })
    }
}

#[async_trait]
impl UserQueries for SqliteStore {
    async fn insert_user(&self, user: NewUser) -> Result<UserDocument, StoreError> {
        let now = now();
        let document = UserDocument {
            id: RecordId::generate(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: normalize_email(&user.email),
            password_hash: user.password_hash,
            role: user.role,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(concat!(
            "INSERT INTO users (",
            user_columns!(),
            ") VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(document.id.to_string())
        .bind(&document.first_name)
        .bind(&document.last_name)
        .bind(&document.email)
        .bind(&document.password_hash)
        .bind(document.role.as_str())
        .bind(now.timestamp_micros())
        .bind(now.timestamp_micros())
        .execute(&self.pool)
        .await?;

        Ok(document)
    }

    async fn find_user_by_id(&self, id: &RecordId) -> Result<Option<UserDocument>, StoreError> {
        sqlx::query_as::<_, UserRow>(concat!("SELECT ", user_columns!(), " FROM users WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(UserDocument::try_from)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserDocument>, StoreError> {
        sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE lower(email) = ?"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?
        .map(UserDocument::try_from)
        .transpose()
    }

    async fn list_users(&self) -> Result<Vec<UserDocument>, StoreError> {
        sqlx::query_as::<_, UserRow>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(UserDocument::try_from)
        .collect()
    }

    async fn update_user(
        &self,
        id: &RecordId,
        changes: UserChanges,
    ) -> Result<Option<UserDocument>, StoreError> {
        sqlx::query_as::<_, UserRow>(concat!(
            "UPDATE users SET ",
            "first_name = COALESCE(?, first_name), ",
            "last_name = COALESCE(?, last_name), ",
            "email = COALESCE(?, email), ",
            "role = COALESCE(?, role), ",
            "updated_at = ? ",
            "WHERE id = ? RETURNING ",
            user_columns!()
        ))
        .bind(changes.first_name)
        .bind(changes.last_name)
        .bind(changes.email.as_deref().map(normalize_email))
        .bind(changes.role.map(|role| role.as_str()))
        .bind(now().timestamp_micros())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(UserDocument::try_from)
        .transpose()
    }

    async fn delete_user(&self, id: &RecordId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProjectQueries for SqliteStore {
    async fn insert_project(&self, project: NewProject) -> Result<ProjectDocument, StoreError> {
        let now = now();
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

        sqlx::query(concat!(
            "INSERT INTO projects (",
            project_columns!(),
            ") VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(document.id.to_string())
        .bind(&document.name)
        .bind(&document.description)
        .bind(document.owner.to_string())
        .bind(&document.thumbnail)
        .bind(to_json("scene_data", &document.scene_data)?)
        .bind(to_json("assets", &document.assets)?)
        .bind(to_json("settings", &document.settings)?)
        .bind(to_json("tags", &document.tags)?)
        .bind(document.is_public)
        .bind(document.is_archived)
        .bind(&document.file_url)
        .bind(&document.qr_code)
        .bind(now.timestamp_micros())
        .bind(now.timestamp_micros())
        .execute(&self.pool)
        .await?;

        Ok(document)
    }

    async fn find_project_by_id(
        &self,
        id: &RecordId,
    ) -> Result<Option<ProjectDocument>, StoreError> {
        sqlx::query_as::<_, ProjectRow>(concat!(
            "SELECT ",
            project_columns!(),
            " FROM projects WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(ProjectDocument::try_from)
        .transpose()
    }

    async fn list_projects(
        &self,
        filter: ProjectFilter,
    ) -> Result<Vec<ProjectDocument>, StoreError> {
        let rows = match filter {
            ProjectFilter::All => {
                sqlx::query_as::<_, ProjectRow>(concat!(
                    "SELECT ",
                    project_columns!(),
                    " FROM projects ORDER BY created_at, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            ProjectFilter::OwnedBy(owner) => {
                sqlx::query_as::<_, ProjectRow>(concat!(
                    "SELECT ",
                    project_columns!(),
                    " FROM projects WHERE owner = ? ORDER BY created_at, id"
                ))
                .bind(owner.to_string())
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.into_iter().map(ProjectDocument::try_from).collect()
    }

    async fn save_project(
        &self,
        project: ProjectDocument,
    ) -> Result<Option<ProjectDocument>, StoreError> {
        sqlx::query_as::<_, ProjectRow>(concat!(
            "UPDATE projects SET ",
            "name = ?, description = ?, owner = ?, thumbnail = ?, scene_data = ?, ",
            "assets = ?, settings = ?, tags = ?, is_public = ?, is_archived = ?, ",
            "file_url = ?, qr_code = ?, updated_at = ? ",
            "WHERE id = ? RETURNING ",
            project_columns!()
        ))
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.owner.to_string())
        .bind(&project.thumbnail)
        .bind(to_json("scene_data", &project.scene_data)?)
        .bind(to_json("assets", &project.assets)?)
        .bind(to_json("settings", &project.settings)?)
        .bind(to_json("tags", &project.tags)?)
        .bind(project.is_public)
        .bind(project.is_archived)
        .bind(&project.file_url)
        .bind(&project.qr_code)
        .bind(now().timestamp_micros())
        .bind(project.id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .map(ProjectDocument::try_from)
        .transpose()
    }

    async fn delete_project(&self, id: &RecordId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
