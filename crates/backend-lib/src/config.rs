// ============================
// recruit-auth/src/config.rs
// ============================
//! Configuration management.
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `config/default.{toml,yaml,json}` (or an explicit path), then
//! `RECRUIT_AUTH_*` environment variables with `__` separating nested keys.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::http::Uri;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "RECRUIT_AUTH";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, overridden by `RUST_LOG` when set
    pub log_level: String,
    pub log_format: LogFormat,
    /// Base URL for links in emails; also the only trusted CORS origin
    pub app_url: String,
    pub storage: StorageSettings,
    /// Lifetime of verification and reset tokens
    pub token_ttl_secs: u64,
    pub session: SessionSettings,
    pub password_requirements: PasswordRequirements,
    pub hashing: HashingSettings,
    /// Per-client-IP request window
    pub rate_limit: RateLimitSettings,
    /// Failure lockout for sign-in and forgot-password
    pub auth_lockout: LockoutSettings,
    pub email: EmailSettings,
    /// Purge interval for stale tokens and sessions; 0 disables the task
    pub housekeeping_interval_secs: u64,
    /// Resend a verification link when an unverified user signs in correctly
    pub resend_verification_on_sign_in: bool,
    /// Take the client address from `X-Forwarded-For` / `X-Real-IP`.
    /// Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    FlatFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Data directory for the flat-file backend
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Lifetime when the client asked to be remembered
    pub ttl_secs: u64,
    /// Lifetime otherwise
    pub short_ttl_secs: u64,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

/// Password complexity requirements
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordRequirements {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Require uppercase letters
    pub require_uppercase: bool,
    /// Require lowercase letters
    pub require_lowercase: bool,
    /// Require digits
    pub require_digit: bool,
    /// Require special characters
    pub require_special: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Argon2id,
    Scrypt,
}

/// KDF parameters and the size of the hashing pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    pub algorithm: HashAlgorithm,
    /// Argon2 memory cost
    pub memory_kib: u32,
    /// Argon2 time cost
    pub iterations: u32,
    pub parallelism: u32,
    /// Concurrent hash/verify jobs allowed on the blocking pool
    pub max_concurrent: usize,
}

/// Rate limiting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window size in seconds
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockoutSettings {
    /// Failures tolerated before the key is locked out
    pub max_attempts: u32,
    pub lockout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    /// `From` header of outbound mail
    pub from: String,
    /// Per-attempt delivery timeout
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Backoff grows linearly: attempt n waits n * retry_backoff_ms
    pub retry_backoff_ms: u64,
    pub queue_capacity: usize,
    /// Without SMTP settings outbound mail is only logged
    pub smtp: Option<SmtpSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            app_url: "http://localhost:3000".to_string(),
            storage: StorageSettings::default(),
            token_ttl_secs: 60 * 60,
            session: SessionSettings::default(),
            password_requirements: PasswordRequirements::default(),
            hashing: HashingSettings::default(),
            rate_limit: RateLimitSettings::default(),
            auth_lockout: LockoutSettings::default(),
            email: EmailSettings::default(),
            housekeeping_interval_secs: 15 * 60,
            resend_verification_on_sign_in: true,
            trust_proxy_headers: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data"),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 60 * 60 * 24 * 7, // 7 days
            short_ttl_secs: 60 * 60 * 24,
            cookie_name: "recruit_session".to_string(),
            cookie_secure: true,
        }
    }
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 72,
            require_uppercase: false,
            require_lowercase: false,
            require_digit: false,
            require_special: false,
        }
    }
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Argon2id,
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
            max_concurrent: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl HashingSettings {
    /// Minimal KDF cost. Only for tests.
    pub fn for_tests() -> Self {
        Self {
            algorithm: HashAlgorithm::Argon2id,
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
            max_concurrent: 4,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

impl Default for LockoutSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_secs: 300,
        }
    }
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            from: "Recruit <no-reply@localhost>".to_string(),
            timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 500,
            queue_capacity: 1024,
            smtp: None,
        }
    }
}

impl Settings {
    /// Load from `config/default.*` (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with an explicit config file, which then must exist
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("config/default").required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            bail!("unknown log level: {}", self.log_level);
        }
        if self.token_ttl_secs == 0 {
            bail!("token_ttl_secs must be positive");
        }
        if self.session.ttl_secs == 0 || self.session.short_ttl_secs == 0 {
            bail!("session TTLs must be positive");
        }
        if self.session.cookie_name.is_empty() {
            bail!("session.cookie_name must not be empty");
        }

        let pw = &self.password_requirements;
        if pw.min_length < 8 {
            bail!("password_requirements.min_length must be at least 8");
        }
        if pw.max_length < pw.min_length {
            bail!("password_requirements.max_length must not be below min_length");
        }

        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            bail!("rate_limit values must be positive");
        }
        if self.auth_lockout.max_attempts == 0 || self.auth_lockout.lockout_secs == 0 {
            bail!("auth_lockout values must be positive");
        }
        if self.hashing.max_concurrent == 0 {
            bail!("hashing.max_concurrent must be positive");
        }
        if self.email.queue_capacity == 0 {
            bail!("email.queue_capacity must be positive");
        }

        let uri: Uri = self
            .app_url
            .parse()
            .with_context(|| format!("app_url is not a valid URL: {}", self.app_url))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            bail!("app_url must be absolute: {}", self.app_url);
        }

        Ok(())
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs as i64)
    }

    /// `app_url` without a trailing slash
    pub fn app_base_url(&self) -> &str {
        self.app_url.trim_end_matches('/')
    }
}

impl SessionSettings {
    /// Session lifetime for the given remember-me choice
    pub fn ttl_for(&self, remember_me: bool) -> chrono::Duration {
        let secs = if remember_me {
            self.ttl_secs
        } else {
            self.short_ttl_secs
        };
        chrono::Duration::seconds(secs as i64)
    }
}

impl EmailSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
