//! Middleware for protecting authenticated routes and handling authorization.
//!
//! [`require_session`] is the access guard: it reads the session cookie,
//! verifies the token, reloads the user and attaches a [`CurrentUser`] to
//! the request. [`authorize`] runs after it and gates a route on the role of
//! the stored account.
//!
//! ```ignore
//! Router::new()
//!     .route("/", get(list_users))
//!     .route_layer(from_fn_with_state(RoleSet::admin_only(), authorize))
//!     .route_layer(from_fn_with_state(state, require_session));
//! ```

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;

use super::errors::AuthError;
use super::models::{CurrentUser, Role};
use crate::errors::ApiError;
use crate::AppState;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// Rejects the request with 401 unless it carries a valid session for a
/// user that still exists. Missing, expired, tampered and stale tokens are
/// indistinguishable to the caller.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let verified = state.tokens.verify(&token)?;
    let user = state
        .db
        .find_user_by_id(&verified.subject)
        .await?
        .ok_or_else(|| {
            tracing::debug!(user_id = %verified.subject, "session subject no longer exists");
            AuthError::StaleSubject
        })?;

    // The stored role is authoritative; the claim may predate a role change.
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Roles admitted by an [`authorize`] layer.
#[derive(Debug, Clone)]
pub struct RoleSet {
    allowed: Vec<Role>,
}

impl RoleSet {
    pub fn new(allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn admin_only() -> Self {
        Self::new([Role::Admin])
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }
}

/// 403 unless the caller's role is in the set. Must be layered inside
/// [`require_session`]; without a [`CurrentUser`] the request is a 401.
pub async fn authorize(
    State(roles): State<RoleSet>,
    user: CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let role = user.role();
    if !roles.permits(role) {
        tracing::info!(user_id = %user.id(), %role, "role not permitted");
        return Err(AuthError::RoleNotPermitted { role }.into());
    }
    Ok(next.run(request).await)
}
