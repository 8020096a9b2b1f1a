//! Rust structs that represent stored documents.
//!
//! These models define the structure of users and projects as they are kept
//! in the document store. They differ from the API-facing views: a
//! [`UserDocument`] carries the password hash and is never serialized to a
//! caller, and a [`ProjectDocument`] holds the bare owner id that the project
//! service may later populate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Role;

/// Document identifier: a UUIDv7, rendered in hyphenated form.
///
/// The leading 48 bits are the creation time in milliseconds, so ids from
/// the same clock sort roughly by creation. Listings still order by
/// `created_at` rather than by id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(Uuid);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a valid record id")]
pub struct InvalidRecordId(pub String);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn parse(input: &str) -> Result<Self, InvalidRecordId> {
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|_| InvalidRecordId(input.to_string()))
    }
}

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0.hyphenated())
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone)]
pub struct UserDocument {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    /// Always stored trimmed and lowercased.
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a user. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update of a user. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    pub version_control: bool,
    pub auto_save: bool,
    /// Milliseconds between autosaves.
    pub save_interval: u64,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            version_control: false,
            auto_save: true,
            save_interval: 300_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectDocument {
    pub id: RecordId,
    pub name: String,
    pub description: String,
    pub owner: RecordId,
    pub thumbnail: String,
    pub scene_data: serde_json::Value,
    pub assets: Vec<serde_json::Value>,
    pub settings: ProjectSettings,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub is_archived: bool,
    pub file_url: String,
    pub qr_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub owner: RecordId,
    pub thumbnail: String,
    pub scene_data: serde_json::Value,
    pub assets: Vec<serde_json::Value>,
    pub settings: ProjectSettings,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub is_archived: bool,
    pub file_url: String,
    pub qr_code: String,
}

/// Which projects a listing query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFilter {
    All,
    OwnedBy(RecordId),
}

impl ProjectFilter {
    pub fn matches(&self, project: &ProjectDocument) -> bool {
        match self {
            Self::All => true,
            Self::OwnedBy(owner) => project.owner == *owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "01928c3e-5f7a-7b2c-9d4e-1a2b3c4d5e6f";

    #[test]
    fn generated_ids_round_trip_through_text() {
        let id = RecordId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), 36);
        assert_eq!(RecordId::parse(&text).unwrap(), id);
    }

    #[test]
    fn generated_ids_are_version_7() {
        let RecordId(uuid) = RecordId::generate();
        assert_eq!(uuid.get_version_num(), 7);
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        for bad in [
            "not-an-objectid",
            "",
            "abc",
            "65a1b2c3d4e5f60718293a4b",
            "zzzzzzzz-5f7a-7b2c-9d4e-1a2b3c4d5e6f",
        ] {
            assert_eq!(RecordId::parse(bad), Err(InvalidRecordId(bad.to_string())));
        }
    }

    #[test]
    fn parse_normalizes_case() {
        let id = RecordId::parse(&SAMPLE.to_uppercase()).unwrap();
        assert_eq!(id.to_string(), SAMPLE);
    }

    #[test]
    fn record_id_serializes_as_string() {
        let id = RecordId::parse(SAMPLE).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{SAMPLE}\""));
        let back: RecordId = serde_json::from_str(&format!("\"{SAMPLE}\"")).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RecordId>("\"nope\"").is_err());
    }

    #[test]
    fn default_settings_match_new_project_defaults() {
        let json = serde_json::to_value(ProjectSettings::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"versionControl": false, "autoSave": true, "saveInterval": 300000})
        );
    }
}
