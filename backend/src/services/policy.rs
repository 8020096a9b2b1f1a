//! Ownership policy.
//!
//! One rule decides who may act on an owned resource: an admin may act on
//! anything, anyone else only on what they own. The same rule scopes listing
//! queries and fixes the owner of newly created resources.

use std::fmt;

use crate::auth::Principal;
use crate::database::{ProjectDocument, ProjectFilter, RecordId, UserDocument};
use crate::errors::{ApiError, ApiResult};

/// Something with exactly one owning user.
pub trait Owned {
    fn owner_id(&self) -> RecordId;

    /// Noun used in denial messages.
    fn kind(&self) -> &'static str;
}

impl Owned for ProjectDocument {
    fn owner_id(&self) -> RecordId {
        self.owner
    }

    fn kind(&self) -> &'static str {
        "project"
    }
}

/// A user record is owned by the user it describes.
impl Owned for UserDocument {
    fn owner_id(&self) -> RecordId {
        self.id
    }

    fn kind(&self) -> &'static str {
        "user"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "view",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

pub fn can_access(caller: &Principal, resource: &impl Owned) -> bool {
    caller.is_admin() || resource.owner_id() == caller.id
}

/// [`can_access`] as a `Forbidden` error. A denial is reported as such even
/// though it confirms that the resource exists.
pub fn ensure_access(caller: &Principal, resource: &impl Owned, action: Action) -> ApiResult<()> {
    if can_access(caller, resource) {
        return Ok(());
    }

    tracing::info!(
        user_id = %caller.id,
        role = %caller.role,
        %action,
        resource = resource.kind(),
        owner_id = %resource.owner_id(),
        "ownership check denied"
    );
    Err(ApiError::forbidden(format!(
        "Not authorized to {action} this {}",
        resource.kind()
    )))
}

/// Owner of a resource the caller is creating. Only an admin may name
/// someone else; a non-admin's request is silently overridden.
pub fn assign_owner(caller: &Principal, requested: Option<RecordId>) -> RecordId {
    match requested {
        Some(owner) if caller.is_admin() => owner,
        _ => caller.id,
    }
}

pub fn listing_scope(caller: &Principal) -> ProjectFilter {
    if caller.is_admin() {
        ProjectFilter::All
    } else {
        ProjectFilter::OwnedBy(caller.id)
    }
}
