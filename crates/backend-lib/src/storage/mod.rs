// ============================
// recruit-auth/src/storage/mod.rs
// ============================
//! Credential Store abstraction with in-memory and flat-file adapters.
//!
//! Every adapter must make each operation atomic per affected row, and must
//! implement [`CredentialStore::consume_token`] as a single compare-and-set on
//! `consumed_at`: of N concurrent consumers of one token exactly one succeeds.
//! The token's [`TokenEffect`] lands in the same step, so a spent token always
//! has its effect and a failed write leaves the token usable.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{NewUser, SecretHash, Session, Token, TokenPurpose, User, UserId};

mod flat_file;
mod memory;

pub use flat_file::FlatFileStore;
pub use memory::MemoryStore;

/// Failures reported by a store adapter
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,

    #[error("token already consumed")]
    TokenAlreadyUsed,

    #[error("record not found")]
    NotFound,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Rows removed by a housekeeping pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub tokens: usize,
    pub sessions: usize,
}

/// Change applied to the token's owner together with consumption
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEffect {
    /// Mark the email verified
    VerifyEmail,
    /// Store a new password hash and revoke every session of the user
    ResetPassword { password_hash: String },
}

impl TokenEffect {
    /// The only purpose this effect may spend
    pub fn purpose(&self) -> TokenPurpose {
        match self {
            TokenEffect::VerifyEmail => TokenPurpose::EmailVerify,
            TokenEffect::ResetPassword { .. } => TokenPurpose::PasswordReset,
        }
    }

    pub fn revokes_sessions(&self) -> bool {
        matches!(self, TokenEffect::ResetPassword { .. })
    }

    /// Apply the user-row part of the effect
    pub(crate) fn apply(&self, user: &mut User, now: DateTime<Utc>) {
        match self {
            TokenEffect::VerifyEmail => user.email_verified = true,
            TokenEffect::ResetPassword { password_hash } => {
                user.password_hash = password_hash.clone();
            },
        }
        user.updated_at = now;
    }
}

/// What a successful consumption did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumed {
    pub user_id: UserId,
    pub sessions_revoked: usize,
}

/// Trait for credential storage backends
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user; fails with `DuplicateEmail` when the normalized email exists.
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    /// Look up a user by normalized email
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    async fn update_password(
        &self,
        user_id: UserId,
        new_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn set_email_verified(&self, user_id: UserId, now: DateTime<Utc>)
        -> Result<(), StoreError>;

    async fn create_token(&self, token: Token) -> Result<(), StoreError>;

    async fn find_token(&self, token_hash: &SecretHash) -> Result<Option<Token>, StoreError>;

    /// Atomically set `consumed_at` if it is still unset and apply `effect`
    /// to the token's user. Either both happen or neither does.
    ///
    /// Fails with `TokenAlreadyUsed` if another consumer got there first, and
    /// with `NotFound` for an unknown token, a purpose other than
    /// `effect.purpose()`, or a missing user.
    async fn consume_token(
        &self,
        token_hash: &SecretHash,
        now: DateTime<Utc>,
        effect: TokenEffect,
    ) -> Result<Consumed, StoreError>;

    async fn create_session(&self, session: Session) -> Result<(), StoreError>;

    async fn find_session(&self, session_hash: &SecretHash)
        -> Result<Option<Session>, StoreError>;

    /// Mark one session revoked. Unknown handles are not an error.
    async fn revoke_session(&self, session_hash: &SecretHash) -> Result<(), StoreError>;

    /// Revoke every session of a user, returning how many were still active.
    async fn revoke_all_sessions(&self, user_id: UserId) -> Result<usize, StoreError>;

    /// Drop consumed or expired tokens and revoked or expired sessions.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<PurgeReport, StoreError>;
}

/// Whether housekeeping may drop this token
pub(crate) fn token_is_stale(token: &Token, now: DateTime<Utc>) -> bool {
    token.consumed_at.is_some() || token.is_expired(now)
}
