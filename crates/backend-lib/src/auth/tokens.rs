// ============================
// recruit-auth/src/auth/tokens.rs
// ============================
//! Token Issuer: single-use, purpose-tagged, time-limited tokens.
use std::sync::Arc;

use chrono::Duration;
use metrics::counter;
use tracing::{debug, info, warn};

use super::token_generator::generate_secret;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::metrics::{TOKEN_CONSUMED, TOKEN_ISSUED, TOKEN_REJECTED};
use crate::models::{SecretHash, Token, TokenPurpose, User, UserId};
use crate::notify::templates::{
    build_link, password_reset_email, verification_email, RESET_PATH, VERIFY_PATH,
};
use crate::notify::Dispatcher;
use crate::storage::{Consumed, CredentialStore, StoreError, TokenEffect};
use crate::validation::{normalize_email, redact_email};

/// Creates and consumes verification and reset tokens
#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    dispatcher: Dispatcher,
    ttl: Duration,
    app_url: String,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        dispatcher: Dispatcher,
        ttl: Duration,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            dispatcher,
            ttl,
            app_url: app_url.into(),
        }
    }

    async fn issue(&self, user_id: UserId, purpose: TokenPurpose) -> Result<String, AuthError> {
        let secret = generate_secret();
        let issued_at = self.clock.now();

        self.store
            .create_token(Token {
                token_hash: secret.hash,
                user_id,
                purpose,
                issued_at,
                expires_at: issued_at + self.ttl,
                consumed_at: None,
            })
            .await?;

        counter!(TOKEN_ISSUED, "purpose" => purpose.as_str()).increment(1);
        Ok(secret.plaintext)
    }

    /// Store a new email_verify token and queue the link for delivery.
    /// Delivery problems never fail this call.
    pub async fn issue_verification_token(&self, user: &User) -> Result<String, AuthError> {
        let token = self.issue(user.id, TokenPurpose::EmailVerify).await?;
        let link = build_link(&self.app_url, VERIFY_PATH, &token);
        self.dispatcher.enqueue(verification_email(&user.email, &link));

        info!(user_id = %user.id, "verification token issued");
        Ok(token)
    }

    /// Issue a reset link if the address belongs to a user.
    /// Returns `Ok(())` either way so callers cannot tell the cases apart.
    pub async fn issue_password_reset_token(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            debug!(email = %redact_email(&email), "password reset requested for unknown email");
            return Ok(());
        };

        let token = self.issue(user.id, TokenPurpose::PasswordReset).await?;
        let link = build_link(&self.app_url, RESET_PATH, &token);
        self.dispatcher.enqueue(password_reset_email(&user.email, &link));

        info!(user_id = %user.id, "password reset token issued");
        Ok(())
    }

    /// Spend a token and apply `effect` to its user in the same store write.
    /// Exactly one caller wins for a given token. The token's purpose must
    /// match the effect.
    pub async fn consume_token(
        &self,
        plaintext: &str,
        effect: TokenEffect,
    ) -> Result<Consumed, AuthError> {
        let expected = effect.purpose();
        let outcome = self.try_consume(plaintext, effect).await;
        match &outcome {
            Ok(consumed) => {
                counter!(TOKEN_CONSUMED, "purpose" => expected.as_str()).increment(1);
                info!(user_id = %consumed.user_id, purpose = expected.as_str(), "token consumed");
            },
            Err(err) => {
                counter!(TOKEN_REJECTED, "reason" => err.error_code()).increment(1);
                warn!(purpose = expected.as_str(), reason = err.error_code(), "token rejected");
            },
        }
        outcome
    }

    async fn try_consume(
        &self,
        plaintext: &str,
        effect: TokenEffect,
    ) -> Result<Consumed, AuthError> {
        if plaintext.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let token_hash = SecretHash::of(plaintext);
        let token = match self.store.find_token(&token_hash).await? {
            Some(token) if token.purpose == effect.purpose() => token,
            _ => return Err(AuthError::InvalidToken),
        };

        let now = self.clock.now();
        if token.is_expired(now) {
            return Err(AuthError::ExpiredToken);
        }

        match self.store.consume_token(&token_hash, now, effect).await {
            Ok(consumed) => Ok(consumed),
            // Purged, or its user removed, between lookup and consume
            Err(StoreError::NotFound) => Err(AuthError::InvalidToken),
            Err(err) => Err(err.into()),
        }
    }
}
