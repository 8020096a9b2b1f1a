//! Module for user management API endpoints.
//!
//! This module handles user records outside the core authentication flow:
//! admin listing and creation, and per-user reads, updates and deletes.

pub mod handlers;
pub mod routes;

pub use routes::user_router;
