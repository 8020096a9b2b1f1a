//! Central module for organizing the application's main API endpoints.
//!
//! This module acts as a top-level container for the resource APIs, projects
//! and users, excluding core authentication routes which are handled
//! separately by [`crate::auth`].

pub mod project;
pub mod user;
