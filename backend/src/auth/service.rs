//! Core business logic for the authentication system.
//!
//! This service handles password hashing, token issuance and validation,
//! registration and login. It orchestrates interactions between the auth
//! handlers, the user service and the document store.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use super::errors::AuthError;
use super::models::{
    Claims, IssuedToken, LoginRequest, RegisterRequest, SessionLifetime, VerifiedToken,
};
use crate::database::{Database, UserDocument};
use crate::errors::{ApiError, ApiResult};
use crate::services::users::{NewAccount, UserService};

/// Issues and validates signed, time-limited session tokens (HS256).
///
/// Tokens are stateless: nothing is stored server-side and there is no
/// revocation list. A token stays valid until it expires.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    standard_ttl: Duration,
    extended_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], standard_ttl: Duration, extended_ttl: Duration) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            standard_ttl,
            extended_ttl,
        }
    }

    pub fn ttl(&self, lifetime: SessionLifetime) -> Duration {
        match lifetime {
            SessionLifetime::Standard => self.standard_ttl,
            SessionLifetime::Extended => self.extended_ttl,
        }
    }

    pub fn issue(
        &self,
        user: &UserDocument,
        lifetime: SessionLifetime,
    ) -> Result<IssuedToken, AuthError> {
        let ttl = self.ttl(lifetime);
        let now = Utc::now();
        let expires_at = now + ttl;
        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|err| AuthError::TokenIssue(err.to_string()))?;

        Ok(IssuedToken {
            token,
            expires_at,
            ttl,
        })
    }

    /// Every failure, whatever its cause, is [`AuthError::InvalidToken`].
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            tracing::debug!(reason = ?err.kind(), "session token rejected");
            AuthError::InvalidToken
        })?;

        Ok(VerifiedToken {
            subject: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// Salted Argon2id password hashing.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// `memory_kib` and `iterations` are the Argon2 m and t costs.
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, AuthError> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|err| AuthError::PasswordHash(err.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AuthError::PasswordHash(err.to_string()))
    }

    /// False for a wrong password and for an unparseable hash alike.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

/// Registration, login and session lookups.
pub struct AuthService {
    db: Database,
    users: Arc<UserService>,
    tokens: Arc<TokenService>,
    passwords: Arc<PasswordHasher>,
    /// Verified against when the email is unknown, so that a miss costs as
    /// much as a wrong password.
    decoy_hash: String,
}

impl AuthService {
    pub fn new(
        db: Database,
        users: Arc<UserService>,
        tokens: Arc<TokenService>,
        passwords: Arc<PasswordHasher>,
    ) -> Result<Self, AuthError> {
        let decoy_hash = passwords.hash("decoy-password-never-matches")?;
        Ok(Self {
            db,
            users,
            tokens,
            passwords,
            decoy_hash,
        })
    }

    /// Creates a `user` account and opens a standard session for it.
    pub async fn register(
        &self,
        request: RegisterRequest,
    ) -> ApiResult<(UserDocument, IssuedToken)> {
        let account = validate_registration(request)?;
        let user = self.users.create_account(account).await?;
        tracing::info!(user_id = %user.id, "user registered");

        let token = self.tokens.issue(&user, SessionLifetime::Standard)?;
        Ok((user, token))
    }

    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, request: LoginRequest) -> ApiResult<(UserDocument, IssuedToken)> {
        let (Some(email), Some(password)) = (
            non_blank(request.email),
            request.password.filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::InvalidCredentials.into());
        };

        let user = self.db.find_user_by_email(&email).await?;
        let hash = user
            .as_ref()
            .map_or(self.decoy_hash.as_str(), |u| u.password_hash.as_str());
        let matches = self.passwords.verify(&password, hash);

        let user = match user {
            Some(user) if matches => user,
            _ => {
                tracing::info!("login rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let lifetime = SessionLifetime::from_remember_me(request.remember_me);
        let token = self.tokens.issue(&user, lifetime)?;
        tracing::info!(user_id = %user.id, ?lifetime, "user logged in");
        Ok((user, token))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_registration(request: RegisterRequest) -> ApiResult<NewAccount> {
    let (Some(first_name), Some(last_name), Some(email), Some(password), Some(confirm)) = (
        non_blank(request.first_name),
        non_blank(request.last_name),
        non_blank(request.email),
        request.password.filter(|p| !p.is_empty()),
        request.confirm_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    if password != confirm {
        return Err(ApiError::bad_request("Passwords do not match"));
    }
    if !request.agreed_to_privacy_policy {
        return Err(ApiError::bad_request("You must agree to the privacy policy"));
    }

    NewAccount::new(first_name, last_name, &email, password)
}
