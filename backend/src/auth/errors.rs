//! Custom error types specific to authentication failures.
//!
//! Every token problem (absent, malformed, tampered, expired, or naming a
//! user that no longer exists) converts to the same `401` body, so a caller
//! cannot tell them apart. The variants stay distinct for logging.

use thiserror::Error;

use super::models::Role;
use crate::errors::ApiError;

pub(crate) const NOT_AUTHORIZED: &str = "Not authorized to access this route";
pub(crate) const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no session token presented")]
    MissingToken,

    /// Bad signature, malformed structure or past expiry.
    #[error("session token rejected")]
    InvalidToken,

    #[error("session token names a user that no longer exists")]
    StaleSubject,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("role '{role}' is not permitted here")]
    RoleNotPermitted { role: Role },

    #[error("could not issue token: {0}")]
    TokenIssue(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::StaleSubject => {
                ApiError::Unauthenticated(NOT_AUTHORIZED.to_string())
            }
            AuthError::InvalidCredentials => {
                ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string())
            }
            AuthError::RoleNotPermitted { role } => ApiError::Forbidden(format!(
                "User role {role} is not authorized to access this route"
            )),
            AuthError::TokenIssue(_) | AuthError::PasswordHash(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failures_are_indistinguishable() {
        let messages: Vec<String> = [
            AuthError::MissingToken,
            AuthError::InvalidToken,
            AuthError::StaleSubject,
        ]
        .into_iter()
        .map(|err| match ApiError::from(err) {
            ApiError::Unauthenticated(message) => message,
            other => panic!("unexpected mapping: {other:?}"),
        })
        .collect();

        assert!(messages.iter().all(|m| m == NOT_AUTHORIZED));
    }

    #[test]
    fn role_rejection_is_forbidden() {
        let err = ApiError::from(AuthError::RoleNotPermitted { role: Role::User });
        assert!(matches!(err, ApiError::Forbidden(ref m) if m.contains("user")));
    }
}
