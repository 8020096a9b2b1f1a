//! Global application error types and handlers.
//!
//! This module defines [`ApiError`], the single error type every handler
//! returns, and the conversions from the errors of the lower layers. All of
//! them render as the envelope `{"success": false, "message": ...}`; details
//! of internal failures are logged and never sent to the caller.

use std::any::Any;

use adapters::AdapterError;
use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::MultipartError;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::database::{InvalidRecordId, StoreError};

const SERVER_ERROR: &str = "Server Error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input, including malformed ids.
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid or stale session; bad credentials.
    #[error("{0}")]
    Unauthenticated(String),

    /// Valid session, but the role or ownership check failed.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Duplicate unique value. Reported with status 400.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    success: bool,
    message: &'a str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Conflict(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                SERVER_ERROR
            }
            Self::BadRequest(message)
            | Self::Unauthenticated(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message) => message.as_str(),
        };

        (
            status,
            Json(ErrorEnvelope {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey { field: "email" } => {
                Self::Conflict("Email is already registered".to_string())
            }
            StoreError::DuplicateKey { field } => Self::Conflict(format!("Duplicate {field}")),
            StoreError::Unavailable(_) | StoreError::Corrupt(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<InvalidRecordId> for ApiError {
    fn from(_: InvalidRecordId) -> Self {
        Self::BadRequest("Invalid ID format".to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

/// `Json` extractor whose rejection uses the API envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Turns a handler panic into the generic 500 envelope. Installed once at
/// the top of the router through `CatchPanicLayer`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    ApiError::Internal(format!("handler panicked: {detail}")).into_response()
}
