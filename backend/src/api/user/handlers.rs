//! Handler functions for user management API endpoints.
//!
//! Listing and creation are admin-only and gated by role at the router.
//! Per-user routes are open to any session; [`UserService`] lets a caller
//! act on their own record and an admin on any record.
//!
//! [`UserService`]: crate::services::users::UserService

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::auth::CurrentUser;
use crate::errors::{ApiJson, ApiResult};
use crate::services::users::{CreateUserRequest, UpdateUserRequest};
use crate::AppState;

/// `GET /`
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<impl IntoResponse> {
    let users = state.users.list(&user.principal()).await?;
    Ok(Json(json!({ "success": true, "count": users.len(), "data": users })))
}

/// `POST /`
pub async fn create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let created = state.users.create(&user.principal(), request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": created })),
    ))
}

/// `GET /:id`
pub async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let found = state.users.get(&user.principal(), &id).await?;
    Ok(Json(json!({ "success": true, "data": found })))
}

/// `PUT /:id`
pub async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    let updated = state.users.update(&user.principal(), &id, request).await?;
    Ok(Json(json!({ "success": true, "data": updated })))
}

/// `DELETE /:id`
pub async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state.users.delete(&user.principal(), &id).await?;
    Ok(Json(json!({ "success": true, "data": {} })))
}
