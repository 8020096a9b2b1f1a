//! Central module for application-wide configuration settings.
//!
//! Every setting can be given as a command-line flag or an environment
//! variable; flags win. The parsed [`Config`] is validated once at startup
//! and shared read-only through the application state.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;

/// Shortest accepted HMAC secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// One year.
pub const MAX_SESSION_TTL_MINUTES: i64 = 525_600;
/// Ten years.
pub const MAX_REMEMBER_ME_DAYS: i64 = 3_650;
pub const MAX_UPLOAD_MB: u64 = 4_096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be at least {MIN_SECRET_LEN} bytes")]
    WeakSecret,

    #[error("CLIENT_URLS must name at least one origin")]
    NoClientOrigins,

    #[error("{0} must be greater than zero")]
    NonPositive(&'static str),

    #[error("{name} must be at most {max}")]
    TooLarge { name: &'static str, max: u64 },

    #[error("ADMIN_EMAIL and ADMIN_PASSWORD must be set together")]
    PartialAdmin,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "webar-backend", author, version, about = "WebAR project backend", long_about = None)]
pub struct Config {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3005)]
    pub port: u16,

    /// `memory` or a `sqlite:` URL such as `sqlite://webar.db`.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://webar.db")]
    pub database_url: String,

    /// Production turns on the `Secure` cookie attribute.
    #[arg(long = "env", env = "APP_ENV", value_enum, default_value_t = Environment::Development)]
    pub environment: Environment,

    /// HMAC key for session tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Lifetime of an ordinary session.
    #[arg(long, env = "SESSION_TTL_MINUTES", default_value_t = 60)]
    pub session_ttl_minutes: i64,

    /// Lifetime of a "remember me" session.
    #[arg(long, env = "REMEMBER_ME_DAYS", default_value_t = 30)]
    pub remember_me_days: i64,

    /// Origins allowed to make credentialed cross-origin requests.
    #[arg(
        long,
        env = "CLIENT_URLS",
        value_delimiter = ',',
        default_value = "http://localhost:5173"
    )]
    pub client_urls: Vec<String>,

    /// Base of the AR viewer links encoded in project QR codes.
    #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:5173")]
    pub frontend_url: String,

    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 50)]
    pub max_upload_mb: u64,

    /// Admin account created at startup if the email is not yet registered.
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    /// Argon2 memory cost in KiB.
    #[arg(long, env = "ARGON2_MEMORY_KIB", default_value_t = 19_456)]
    pub argon2_memory_kib: u32,

    /// Argon2 time cost.
    #[arg(long, env = "ARGON2_ITERATIONS", default_value_t = 2)]
    pub argon2_iterations: u32,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret);
        }
        if self.client_urls.iter().all(|url| url.trim().is_empty()) {
            return Err(ConfigError::NoClientOrigins);
        }
        if self.session_ttl_minutes <= 0 {
            return Err(ConfigError::NonPositive("SESSION_TTL_MINUTES"));
        }
        if self.session_ttl_minutes > MAX_SESSION_TTL_MINUTES {
            return Err(ConfigError::TooLarge {
                name: "SESSION_TTL_MINUTES",
                max: MAX_SESSION_TTL_MINUTES as u64,
            });
        }
        if self.remember_me_days <= 0 {
            return Err(ConfigError::NonPositive("REMEMBER_ME_DAYS"));
        }
        if self.remember_me_days > MAX_REMEMBER_ME_DAYS {
            return Err(ConfigError::TooLarge {
                name: "REMEMBER_ME_DAYS",
                max: MAX_REMEMBER_ME_DAYS as u64,
            });
        }
        if self.max_upload_mb == 0 {
            return Err(ConfigError::NonPositive("MAX_UPLOAD_MB"));
        }
        if self.max_upload_mb > MAX_UPLOAD_MB {
            return Err(ConfigError::TooLarge {
                name: "MAX_UPLOAD_MB",
                max: MAX_UPLOAD_MB,
            });
        }
        if self.admin_email.is_some() != self.admin_password.is_some() {
            return Err(ConfigError::PartialAdmin);
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Clamped to the validated range, so an unvalidated config cannot
    /// overflow the duration arithmetic.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes.clamp(1, MAX_SESSION_TTL_MINUTES))
    }

    pub fn remember_me_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.remember_me_days.clamp(1, MAX_REMEMBER_ME_DAYS))
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.min(MAX_UPLOAD_MB) * 1024 * 1024
    }

    /// Non-empty, trimmed entries of `client_urls`.
    pub fn allowed_origins(&self) -> impl Iterator<Item = &str> {
        self.client_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
    }
}
