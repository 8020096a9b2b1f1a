//! Data structures for authentication-related entities.
//!
//! This module defines the user role, the JWT claims, the session lifetimes,
//! the request and response bodies of the auth endpoints, and the resolved
//! caller identity that the access guard attaches to a request.

use std::fmt;
use std::str::FromStr;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::AuthError;
use crate::database::{RecordId, UserDocument};
use crate::errors::ApiError;

/// The only two roles the system knows. Parsed once at the boundary and
/// compared as a value everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact match only; `"Admin"` is not a role.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// JWT claims embedded in session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user id.
    pub sub: RecordId,
    pub role: Role,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// How long an issued session should last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifetime {
    Standard,
    /// "Remember me": the fixed long window, regardless of the standard one.
    Extended,
}

impl SessionLifetime {
    pub fn from_remember_me(remember_me: bool) -> Self {
        if remember_me {
            Self::Extended
        } else {
            Self::Standard
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// Lifetime of the token, reused as the cookie's max-age.
    pub ttl: chrono::Duration,
}

/// What a token proves once its signature and expiry check out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: RecordId,
    pub role: Role,
}

/// Identity and role of the caller, as far as authorization cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: RecordId,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// The authenticated caller, attached to the request by the access guard.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserDocument);

impl CurrentUser {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.0.id,
            role: self.0.role,
        }
    }

    pub fn id(&self) -> RecordId {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| AuthError::MissingToken.into())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    #[serde(default)]
    pub agreed_to_privacy_policy: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub remember_me: bool,
    /// Sent by the login form. The role always comes from the stored
    /// account, so this is accepted and ignored.
    #[serde(default)]
    pub role: Option<String>,
}

/// Public part of a user, as echoed by register and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

impl From<&UserDocument> for UserProfile {
    fn from(user: &UserDocument) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    /// Same token as the session cookie, for clients that cannot read it.
    pub token: String,
    pub data: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_exact() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!("Admin".parse::<Role>(), Err(UnknownRole("Admin".into())));
        assert!(serde_json::from_str::<Role>("\"ADMIN\"").is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn login_request_tolerates_missing_optional_fields() {
        let req: LoginRequest = serde_json::from_str(r#"{"email":"a@b.co"}"#).unwrap();
        assert!(!req.remember_me);
        assert!(req.password.is_none());
        assert!(req.role.is_none());
    }
}
