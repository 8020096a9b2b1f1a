//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse request bodies, delegate to [`AuthService`] and
//! set or clear the session cookie. The token is also echoed in the body
//! for clients that cannot read cookies.
//!
//! [`AuthService`]: super::service::AuthService

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::middleware::SESSION_COOKIE;
use super::models::{AuthResponse, CurrentUser, IssuedToken, LoginRequest, RegisterRequest, UserProfile};
use crate::database::UserDocument;
use crate::errors::{ApiJson, ApiResult};
use crate::AppState;

fn session_cookie(token: &IssuedToken, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.token.clone()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(token.ttl.num_seconds()))
        .build()
}

fn session_response(
    state: &AppState,
    jar: CookieJar,
    user: &UserDocument,
    token: IssuedToken,
) -> (CookieJar, Json<AuthResponse>) {
    let jar = jar.add(session_cookie(&token, state.config.is_production()));
    let body = AuthResponse {
        success: true,
        token: token.token,
        data: UserProfile::from(user),
    };
    (jar, Json(body))
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, token) = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, session_response(&state, jar, &user, token)))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, token) = state.auth.login(request).await?;
    Ok(session_response(&state, jar, &user, token))
}

/// `GET /me`
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<impl IntoResponse> {
    let view = state.users.me(&user.principal()).await?;
    Ok(Json(json!({ "success": true, "data": view })))
}

/// `POST /logout`. Tokens are stateless, so this only clears the cookie.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(json!({ "success": true, "data": {} })))
}
