//! HTTP backend for webar: accounts, cookie sessions and AR projects.
//!
//! The binary in `main.rs` only parses configuration and serves [`app`];
//! everything else lives here so the integration tests can drive the same
//! router in-process.

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod middleware;
pub mod services;

use std::sync::Arc;

use adapters::{DiskFileStore, SvgQrEncoder};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;

use crate::auth::{auth_router, AuthError, AuthService, PasswordHasher, TokenService};
use crate::config::Config;
use crate::database::Database;
use crate::errors::ApiError;
use crate::services::projects::ProjectService;
use crate::services::templates::TemplateCatalog;
use crate::services::users::UserService;

/// Shared handles passed to every handler and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub tokens: Arc<TokenService>,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub projects: Arc<ProjectService>,
}

impl AppState {
    /// Wires the services over `db`. Uploads go to `config.upload_dir`,
    /// which is not created here.
    pub fn build(config: Config, db: Database) -> Result<Self, AuthError> {
        let passwords = Arc::new(PasswordHasher::new(
            config.argon2_memory_kib,
            config.argon2_iterations,
        )?);
        let tokens = Arc::new(TokenService::new(
            config.jwt_secret.as_bytes(),
            config.session_ttl(),
            config.remember_me_ttl(),
        ));
        let users = Arc::new(UserService::new(db.clone(), passwords.clone()));
        let auth = Arc::new(AuthService::new(
            db.clone(),
            users.clone(),
            tokens.clone(),
            passwords,
        )?);
        let projects = Arc::new(ProjectService::new(
            db.clone(),
            Arc::new(TemplateCatalog::builtin()),
            Arc::new(DiskFileStore::new(
                config.upload_dir.clone(),
                config.max_upload_bytes(),
            )),
            Arc::new(SvgQrEncoder::default()),
            config.frontend_url.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            tokens,
            auth,
            users,
            projects,
        })
    }
}

/// The complete router with all layers applied.
pub fn app(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health))
        .nest("/api/v1/auth", auth_router(state.clone()))
        .nest("/api/v1/projects", api::project::project_router(state.clone()))
        .nest("/api/v1/users", api::user::user_router(state.clone()))
        .nest_service("/uploads", uploads)
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(middleware::panic_layer())
                .layer(middleware::trace_layer())
                .layer(middleware::cors_layer(&state.config)),
        )
        .with_state(state)
}

async fn welcome() -> &'static str {
    "Welcome to the WebAR API"
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
