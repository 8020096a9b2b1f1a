//! Handler functions for the project API.
//!
//! These functions extract the caller and request data, delegate to
//! [`ProjectService`] and wrap the result in the `{success, data}` envelope.
//!
//! [`ProjectService`]: crate::services::projects::ProjectService

use adapters::IncomingFile;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::auth::CurrentUser;
use crate::errors::{ApiJson, ApiResult};
use crate::services::projects::{CreateFromTemplate, ProjectUpdate};
use crate::AppState;

/// Collects the `templateId`, `owner` and `file` parts of the create form.
/// Unknown parts are skipped; a file part without a file name is ignored.
async fn read_create_form(mut multipart: Multipart) -> ApiResult<CreateFromTemplate> {
    let mut form = CreateFromTemplate::default();

    while let Some(field) = multipart.next_field().await? {
        let part = field.name().map(str::to_string);
        match part.as_deref() {
            Some("templateId") => form.template_id = Some(field.text().await?),
            Some("owner") => form.owner = Some(field.text().await?),
            Some("file") => {
                let Some(name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if !name.is_empty() {
                    form.file = Some(IncomingFile::new(name, content_type, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// `POST /template`
pub async fn create_from_template(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_create_form(multipart).await?;
    let project = state
        .projects
        .create_from_template(&user.principal(), form)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": project })),
    ))
}

/// `GET /templates`
pub async fn list_templates(State(state): State<AppState>) -> impl IntoResponse {
    let templates = state.projects.templates().all();
    Json(json!({ "success": true, "count": templates.len(), "data": templates }))
}

/// `GET /`
pub async fn list_projects(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let projects = state.projects.list(&user.principal()).await?;
    Ok(Json(json!({ "success": true, "data": projects })))
}

/// `GET /:id`
pub async fn get_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let project = state.projects.get(&user.principal(), &id).await?;
    Ok(Json(json!({ "success": true, "data": project })))
}

/// `PUT /:id`
pub async fn update_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<ProjectUpdate>,
) -> ApiResult<impl IntoResponse> {
    let project = state.projects.update(&user.principal(), &id, update).await?;
    Ok(Json(json!({ "success": true, "data": project })))
}

/// `DELETE /:id`
pub async fn delete_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.projects.delete(&user.principal(), &id).await?;
    Ok(Json(json!({ "success": true, "data": {} })))
}
