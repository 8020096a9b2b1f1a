//! Authentication module for managing user accounts, sessions, and access control.
//!
//! This module provides the public interface for authentication: the token
//! service and password hashing, registration and login, the cookie-based
//! access guard and role gating, and the auth HTTP routes.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;

// Re-exports for convenience
pub use errors::AuthError;
pub use middleware::{authorize, require_session, RoleSet, SESSION_COOKIE};
pub use models::*;
pub use routes::auth_router;
pub use service::{AuthService, PasswordHasher, TokenService};
