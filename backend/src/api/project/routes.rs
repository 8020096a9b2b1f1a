//! Defines the HTTP routes for projects.
//!
//! Every route requires a session. The router is nested under
//! `/api/v1/projects`.

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    create_from_template, delete_project, get_project, list_projects, list_templates,
    update_project,
};
use crate::auth::require_session;
use crate::AppState;

/// Room for the multipart framing and text fields around the largest file.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn project_router(state: AppState) -> Router<AppState> {
    let upload_limit = usize::try_from(state.config.max_upload_bytes())
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);

    Router::new()
        .route(
            "/template",
            post(create_from_template).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/templates", get(list_templates))
        .route("/", get(list_projects))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route_layer(from_fn_with_state(state, require_session))
}
