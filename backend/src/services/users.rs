//! User accounts: creation, self-service and administration.
//!
//! Every operation on a single user goes through the ownership policy with
//! the user treated as owning their own record, so a caller may act on
//! themselves and an admin may act on anyone.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::policy::{self, Action};
use crate::auth::{PasswordHasher, Principal, Role};
use crate::database::{Database, NewUser, RecordId, UserChanges, UserDocument};
use crate::errors::{ApiError, ApiResult};

pub const MIN_PASSWORD_LEN: usize = 6;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"))
}

fn normalize_email(email: &str) -> ApiResult<String> {
    let email = email.trim().to_lowercase();
    if email_pattern().is_match(&email) {
        Ok(email)
    } else {
        Err(ApiError::bad_request("Please provide a valid email"))
    }
}

/// Validated input for a new account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

impl NewAccount {
    /// Trims names, normalizes the email and checks the password length.
    /// The account gets the default role.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: &str,
        password: impl Into<String>,
    ) -> ApiResult<Self> {
        let password = password.into();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ApiError::bad_request(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(Self {
            first_name: first_name.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
            email: normalize_email(email)?,
            password,
            role: Role::default(),
        })
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// A user as returned to callers: everything except the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserDocument> for UserView {
    fn from(user: UserDocument) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Body of the admin-only user creation endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

pub struct UserService {
    db: Database,
    passwords: Arc<PasswordHasher>,
}

impl UserService {
    pub fn new(db: Database, passwords: Arc<PasswordHasher>) -> Self {
        Self { db, passwords }
    }

    /// Hashes the password and inserts the account. A taken email is a
    /// conflict whether the pre-check or the store's unique index catches it.
    pub async fn create_account(&self, account: NewAccount) -> ApiResult<UserDocument> {
        if self.db.find_user_by_email(&account.email).await?.is_some() {
            return Err(ApiError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = self.passwords.hash(&account.password)?;
        let user = self
            .db
            .insert_user(NewUser {
                first_name: account.first_name,
                last_name: account.last_name,
                email: account.email,
                password_hash,
                role: account.role,
            })
            .await?;
        Ok(user)
    }

    /// Creates the configured admin account unless the email is already
    /// registered. Returns whether an account was created.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> ApiResult<bool> {
        let account = NewAccount::new("Admin", "User", email, password)?.with_role(Role::Admin);
        if self.db.find_user_by_email(&account.email).await?.is_some() {
            return Ok(false);
        }
        let admin = self.create_account(account).await?;
        tracing::info!(user_id = %admin.id, "bootstrap admin created");
        Ok(true)
    }

    pub async fn create(&self, caller: &Principal, request: CreateUserRequest) -> ApiResult<UserView> {
        if !caller.is_admin() {
            return Err(ApiError::forbidden(format!(
                "User {} is not authorized to create users",
                caller.id
            )));
        }

        let (Some(first_name), Some(last_name), Some(email), Some(password)) = (
            request.first_name.filter(|v| !v.trim().is_empty()),
            request.last_name.filter(|v| !v.trim().is_empty()),
            request.email.filter(|v| !v.trim().is_empty()),
            request.password.filter(|v| !v.is_empty()),
        ) else {
            return Err(ApiError::bad_request(
                "Please provide firstName, lastName, email and password",
            ));
        };

        let account = NewAccount::new(first_name, last_name, &email, password)?
            .with_role(request.role.unwrap_or_default());
        let user = self.create_account(account).await?;
        tracing::info!(admin_id = %caller.id, user_id = %user.id, role = %user.role, "user created");
        Ok(user.into())
    }

    pub async fn list(&self, caller: &Principal) -> ApiResult<Vec<UserView>> {
        if !caller.is_admin() {
            return Err(ApiError::forbidden(format!(
                "User {} is not authorized to access all users",
                caller.id
            )));
        }
        let users = self.db.list_users().await?;
        Ok(users.into_iter().map(UserView::from).collect())
    }

    pub async fn me(&self, caller: &Principal) -> ApiResult<UserView> {
        self.db
            .find_user_by_id(&caller.id)
            .await?
            .map(UserView::from)
            .ok_or_else(|| ApiError::not_found("User not found"))
    }

    async fn load(&self, caller: &Principal, raw_id: &str, action: Action) -> ApiResult<UserDocument> {
        let id = RecordId::parse(raw_id)?;
        let user = self
            .db
            .find_user_by_id(&id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User not found with id of {id}")))?;
        policy::ensure_access(caller, &user, action)?;
        Ok(user)
    }

    pub async fn get(&self, caller: &Principal, raw_id: &str) -> ApiResult<UserView> {
        self.load(caller, raw_id, Action::Read).await.map(UserView::from)
    }

    pub async fn update(
        &self,
        caller: &Principal,
        raw_id: &str,
        request: UpdateUserRequest,
    ) -> ApiResult<UserView> {
        let user = self.load(caller, raw_id, Action::Update).await?;

        if let Some(role) = request.role {
            if role != user.role && !caller.is_admin() {
                tracing::info!(user_id = %caller.id, requested = %role, "role change denied");
                return Err(ApiError::forbidden(format!(
                    "User {} is not authorized to change roles",
                    caller.id
                )));
            }
        }

        let email = match request.email.filter(|e| !e.trim().is_empty()) {
            Some(email) => Some(normalize_email(&email)?),
            None => None,
        };
        let changes = UserChanges {
            first_name: non_blank(request.first_name),
            last_name: non_blank(request.last_name),
            email,
            role: request.role,
        };

        self.db
            .update_user(&user.id, changes)
            .await?
            .map(UserView::from)
            .ok_or_else(|| ApiError::not_found(format!("User not found with id of {}", user.id)))
    }

    pub async fn delete(&self, caller: &Principal, raw_id: &str) -> ApiResult<()> {
        let user = self.load(caller, raw_id, Action::Delete).await?;
        self.db.delete_user(&user.id).await?;
        tracing::info!(user_id = %caller.id, deleted = %user.id, "user deleted");
        Ok(())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_in_memory;

    fn service() -> UserService {
        let hasher = PasswordHasher::new(8, 1).unwrap();
        UserService::new(connect_in_memory(), Arc::new(hasher))
    }

    async fn account(service: &UserService, email: &str, role: Role) -> Principal {
        let account = NewAccount::new("Test", "User", email, "secret1")
            .unwrap()
            .with_role(role);
        let user = service.create_account(account).await.unwrap();
        Principal {
            id: user.id,
            role: user.role,
        }
    }

    #[test]
    fn new_account_validates_input() {
        assert!(matches!(
            NewAccount::new("a", "b", "nope", "secret1"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            NewAccount::new("a", "b", "a@b.co", "12345"),
            Err(ApiError::BadRequest(_))
        ));
        let account = NewAccount::new(" a ", "b", " A@B.co ", "123456").unwrap();
        assert_eq!(account.first_name, "a");
        assert_eq!(account.email, "a@b.co");
        assert_eq!(account.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_regardless_of_case() {
        let service = service();
        account(&service, "dup@example.com", Role::User).await;
        let again = NewAccount::new("Other", "Name", "DUP@Example.com", "another1").unwrap();
        assert!(matches!(
            service.create_account(again).await,
            Err(ApiError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn only_admins_create_and_list() {
        let service = service();
        let admin = account(&service, "admin@example.com", Role::Admin).await;
        let user = account(&service, "user@example.com", Role::User).await;

        let request = CreateUserRequest {
            first_name: Some("New".into()),
            last_name: Some("Editor".into()),
            email: Some("editor@example.com".into()),
            password: Some("secret1".into()),
            role: Some(Role::Admin),
        };
        assert!(matches!(
            service.create(&user, request.clone()).await,
            Err(ApiError::Forbidden(_))
        ));
        let created = service.create(&admin, request).await.unwrap();
        assert_eq!(created.role, Role::Admin);

        assert!(matches!(service.list(&user).await, Err(ApiError::Forbidden(_))));
        assert_eq!(service.list(&admin).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn self_service_but_not_on_others() {
        let service = service();
        let alice = account(&service, "alice@example.com", Role::User).await;
        let bob = account(&service, "bob@example.com", Role::User).await;

        assert!(service.get(&alice, &alice.id.to_string()).await.is_ok());
        assert!(matches!(
            service.get(&alice, &bob.id.to_string()).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            service.delete(&alice, &bob.id.to_string()).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn non_admin_cannot_promote_themselves() {
        let service = service();
        let alice = account(&service, "alice@example.com", Role::User).await;

        let promote = UpdateUserRequest {
            role: Some(Role::Admin),
            ..UpdateUserRequest::default()
        };
        assert!(matches!(
            service.update(&alice, &alice.id.to_string(), promote).await,
            Err(ApiError::Forbidden(_))
        ));

        let rename = UpdateUserRequest {
            first_name: Some("Alicia".into()),
            role: Some(Role::User),
            ..UpdateUserRequest::default()
        };
        let updated = service
            .update(&alice, &alice.id.to_string(), rename)
            .await
            .unwrap();
        assert_eq!(updated.first_name, "Alicia");
        assert_eq!(updated.role, Role::User);
    }

    #[tokio::test]
    async fn admin_can_change_roles_and_delete() {
        let service = service();
        let admin = account(&service, "admin@example.com", Role::Admin).await;
        let bob = account(&service, "bob@example.com", Role::User).await;

        let promote = UpdateUserRequest {
            role: Some(Role::Admin),
            ..UpdateUserRequest::default()
        };
        let updated = service
            .update(&admin, &bob.id.to_string(), promote)
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Admin);

        service.delete(&admin, &bob.id.to_string()).await.unwrap();
        assert!(matches!(
            service.get(&admin, &bob.id.to_string()).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn malformed_id_is_a_bad_request() {
        let service = service();
        let admin = account(&service, "admin@example.com", Role::Admin).await;
        assert!(matches!(
            service.get(&admin, "not-an-objectid").await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let service = service();
        assert!(service.ensure_admin("root@example.com", "rootpass").await.unwrap());
        assert!(!service.ensure_admin("ROOT@example.com", "rootpass").await.unwrap());
        let root = service
            .db
            .find_user_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(root.role, Role::Admin);
    }
}
