//! Accounts outlive the process when the store is a sqlite file.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use backend::config::Config;
use backend::database::{self, Database};
use backend::{app, AppState};
use clap::Parser;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

const SECRET: &str = "integration-secret-0123456789abcdef";

fn config(dir: &TempDir) -> Config {
    let upload_dir = dir.path().join("uploads");
    Config::parse_from([
        "webar-backend",
        "--jwt-secret",
        SECRET,
        "--argon2-memory-kib",
        "8",
        "--argon2-iterations",
        "1",
        "--upload-dir",
        upload_dir.to_str().unwrap(),
    ])
}

fn database_url(dir: &TempDir) -> String {
    format!("sqlite://{}", dir.path().join("webar.db").display())
}

async fn boot(dir: &TempDir, db: Database) -> AppState {
    let state = AppState::build(config(dir), db).unwrap();
    state
        .users
        .ensure_admin("admin@example.com", "adminpass")
        .await
        .unwrap();
    state
}

/// Logs in and returns the status plus the session token, if one was set.
async fn login(state: &AppState, email: &str, password: &str) -> (StatusCode, Option<String>) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "email": email, "password": password }).to_string()))
        .unwrap();
    let response = app(state.clone()).oneshot(request).await.unwrap();
    let token = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.strip_prefix("token="))
        .and_then(|rest| rest.split(';').next())
        .map(str::to_string);
    (response.status(), token)
}

async fn register(state: &AppState, email: &str) -> StatusCode {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "firstName": "Grace",
                "lastName": "Hopper",
                "email": email,
                "password": "cobol-forever",
                "confirmPassword": "cobol-forever",
                "agreedToPrivacyPolicy": true
            })
            .to_string(),
        ))
        .unwrap();
    app(state.clone()).oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn accounts_survive_a_restart_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let url = database_url(&dir);

    let first = boot(&dir, database::connect(&url).await.unwrap()).await;
    assert_eq!(register(&first, "grace@example.com").await, StatusCode::CREATED);
    let (status, token) = login(&first, "admin@example.com", "adminpass").await;
    assert_eq!(status, StatusCode::OK);
    let token = token.unwrap();
    drop(first);

    // Second boot over the same file: the bootstrap admin is not recreated
    // and both accounts still log in.
    let second = boot(&dir, database::connect(&url).await.unwrap()).await;
    assert_eq!(login(&second, "admin@example.com", "adminpass").await.0, StatusCode::OK);
    assert_eq!(login(&second, "Grace@Example.com", "cobol-forever").await.0, StatusCode::OK);
    assert_eq!(
        register(&second, "GRACE@example.com").await,
        StatusCode::BAD_REQUEST
    );

    // A session issued before the restart still resolves to its user.
    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::COOKIE, format!("token={token}"))
        .body(Body::empty())
        .unwrap();
    let response = app(second.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["data"]["email"], "admin@example.com");
    assert_eq!(body["data"]["role"], "admin");
}

#[tokio::test]
async fn the_memory_store_forgets_everything() {
    let dir = tempfile::tempdir().unwrap();
    let first = boot(&dir, database::connect(database::MEMORY_URL).await.unwrap()).await;
    assert_eq!(register(&first, "grace@example.com").await, StatusCode::CREATED);
    drop(first);

    let second = boot(&dir, database::connect_in_memory()).await;
    assert_eq!(
        login(&second, "grace@example.com", "cobol-forever").await.0,
        StatusCode::UNAUTHORIZED
    );
}
