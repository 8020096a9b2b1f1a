//! Module for core business logic services.
//!
//! This module encapsulates the services that perform the business
//! operations behind the HTTP handlers: user administration, project CRUD
//! seeded from the template catalog, and the ownership policy both of them
//! consult before acting on a single resource.

pub mod policy;
pub mod projects;
pub mod templates;
pub mod users;
