//! Defines the HTTP routes specifically for authentication.
//!
//! Registration, login and logout are public; `/me` sits behind the access
//! guard. The router is nested under `/api/v1/auth`.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use super::handlers::{login, logout, me, register};
use super::middleware::require_session;
use crate::AppState;

pub fn auth_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/me", get(me))
        .route_layer(from_fn_with_state(state, require_session));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .merge(protected)
}
