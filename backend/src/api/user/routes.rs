//! Defines the HTTP routes for user management.
//!
//! The collection routes are admin-only; the per-user routes only need a
//! session. The router is nested under `/api/v1/users`.

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;

use super::handlers::{create_user, delete_user, get_user, list_users, update_user};
use crate::auth::{authorize, require_session, RoleSet};
use crate::AppState;

pub fn user_router(state: AppState) -> Router<AppState> {
    let admin = Router::new()
        .route("/", get(list_users).post(create_user))
        .route_layer(from_fn_with_state(RoleSet::admin_only(), authorize));

    Router::new()
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .merge(admin)
        .route_layer(from_fn_with_state(state, require_session))
}
