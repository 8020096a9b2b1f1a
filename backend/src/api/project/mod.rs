//! Module for the project API.
//!
//! This module defines the HTTP surface for creating projects from templates
//! and reading, updating and deleting them.

pub mod handlers;
pub mod routes;

pub use routes::project_router;
