// ============================
// recruit-auth/src/auth/session.rs
// ============================
//! Session token handling and management.
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{debug, info};

use super::token_generator::generate_secret;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::metrics::{SESSION_CREATED, SESSION_REVOKED};
use crate::models::{SecretHash, Session, UserId};
use crate::storage::CredentialStore;

/// Handle returned to the client; only its hash is stored
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Session manager for handling authentication tokens
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Create a new session; `ttl = None` never expires on its own
    pub async fn create_session(
        &self,
        user_id: UserId,
        ttl: Option<Duration>,
    ) -> Result<IssuedSession, AuthError> {
        let secret = generate_secret();
        let issued_at = self.clock.now();
        let expires_at = ttl.map(|ttl| issued_at + ttl);

        self.store
            .create_session(Session {
                session_hash: secret.hash,
                user_id,
                issued_at,
                expires_at,
                revoked: false,
            })
            .await?;

        counter!(SESSION_CREATED).increment(1);
        debug!(user_id = %user_id, ?expires_at, "session created");

        Ok(IssuedSession {
            token: secret.plaintext,
            expires_at,
        })
    }

    /// Resolve a handle to its owner
    pub async fn validate_session(&self, token: &str) -> Result<UserId, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidSession);
        }

        let session = self
            .store
            .find_session(&SecretHash::of(token))
            .await?
            .ok_or(AuthError::InvalidSession)?;

        if session.revoked {
            return Err(AuthError::RevokedSession);
        }
        if session.is_expired(self.clock.now()) {
            return Err(AuthError::ExpiredSession);
        }

        Ok(session.user_id)
    }

    /// Revoke one session. Unknown or already revoked handles are fine.
    pub async fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        if token.is_empty() {
            return Ok(());
        }
        self.store.revoke_session(&SecretHash::of(token)).await?;
        counter!(SESSION_REVOKED, "scope" => "single").increment(1);
        Ok(())
    }

    /// Revoke every active session of a user
    pub async fn revoke_all_sessions(&self, user_id: UserId) -> Result<usize, AuthError> {
        let revoked = self.store.revoke_all_sessions(user_id).await?;
        counter!(SESSION_REVOKED, "scope" => "all").increment(revoked as u64);
        info!(user_id = %user_id, revoked, "all sessions revoked");
        Ok(revoked)
    }
}
