use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{error, info, instrument, warn};
use zeroize::Zeroizing;

use super::{AuthService, PasswordHasherPool, SessionManager, SignedIn, TokenIssuer};
use crate::clock::Clock;
use crate::config::{PasswordRequirements, SessionSettings, Settings};
use crate::error::AuthError;
use crate::metrics::{AUTH_SIGN_IN_FAILURE, AUTH_SIGN_IN_SUCCESS, AUTH_SIGN_UP, SESSION_REVOKED};
use crate::models::{NewUser, User};
use crate::notify::Dispatcher;
use crate::storage::{CredentialStore, TokenEffect};
use crate::validation::{
    normalize_email, redact_email, validate_email, validate_name, validate_password,
};

/// Knobs the orchestration reads from `Settings`
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    pub password_requirements: PasswordRequirements,
    pub session: SessionSettings,
    pub resend_verification_on_sign_in: bool,
}

impl From<&Settings> for AuthPolicy {
    fn from(settings: &Settings) -> Self {
        Self {
            password_requirements: settings.password_requirements.clone(),
            session: settings.session.clone(),
            resend_verification_on_sign_in: settings.resend_verification_on_sign_in,
        }
    }
}

/// Default `AuthService`: explicitly wired, no globals.
pub struct DefaultAuth {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    tokens: TokenIssuer,
    sessions: SessionManager,
    hasher: PasswordHasherPool,
    policy: AuthPolicy,
}

impl DefaultAuth {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        dispatcher: Dispatcher,
        settings: &Settings,
    ) -> Self {
        let tokens = TokenIssuer::new(
            store.clone(),
            clock.clone(),
            dispatcher,
            settings.token_ttl(),
            settings.app_base_url(),
        );
        let sessions = SessionManager::new(store.clone(), clock.clone());
        let hasher = PasswordHasherPool::new(settings.hashing.clone());

        Self {
            store,
            clock,
            tokens,
            sessions,
            hasher,
            policy: AuthPolicy::from(settings),
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Prepare state that would otherwise be built on the first request
    pub async fn warm_up(&self) -> Result<(), AuthError> {
        self.hasher.warm_up().await
    }

    async fn check_credentials(
        &self,
        email: &str,
        password: Zeroizing<String>,
    ) -> Result<User, AuthError> {
        let Some(user) = self.store.find_user_by_email(email).await? else {
            self.hasher.verify_dummy(password).await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !self
            .hasher
            .verify(password, user.password_hash.clone())
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(user)
    }
}

#[async_trait]
impl AuthService for DefaultAuth {
    #[instrument(skip_all, name = "auth.sign_up")]
    async fn sign_up(
        &self,
        name: Option<String>,
        email: &str,
        password: Zeroizing<String>,
    ) -> Result<User, AuthError> {
        let email = normalize_email(email);
        validate_email(&email)?;
        validate_password(&password, &self.policy.password_requirements)?;
        let name = validate_name(name.as_deref())?;

        let password_hash = self.hasher.hash(password).await?;
        let user = self
            .store
            .create_user(NewUser {
                email,
                name,
                password_hash,
                created_at: self.clock.now(),
            })
            .await?;

        // The account exists either way; an unverified sign-in resends the link
        if let Err(err) = self.tokens.issue_verification_token(&user).await {
            error!(
                user_id = %user.id,
                error = %err,
                "could not issue verification link at sign-up"
            );
        }

        counter!(AUTH_SIGN_UP).increment(1);
        info!(user_id = %user.id, email = %redact_email(&user.email), "user signed up");
        Ok(user)
    }

    #[instrument(skip_all, name = "auth.sign_in")]
    async fn sign_in(
        &self,
        email: &str,
        password: Zeroizing<String>,
        remember_me: bool,
    ) -> Result<SignedIn, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }

        let user = match self.check_credentials(&email, password).await {
            Ok(user) => user,
            Err(err) => {
                counter!(AUTH_SIGN_IN_FAILURE, "reason" => err.error_code()).increment(1);
                return Err(err);
            },
        };

        if !user.email_verified {
            if self.policy.resend_verification_on_sign_in {
                if let Err(err) = self.tokens.issue_verification_token(&user).await {
                    warn!(user_id = %user.id, error = %err, "could not resend verification link");
                }
            }
            counter!(AUTH_SIGN_IN_FAILURE, "reason" => "EMAIL_NOT_VERIFIED").increment(1);
            info!(user_id = %user.id, "sign-in refused, email not verified");
            return Err(AuthError::EmailNotVerified);
        }

        let ttl = self.policy.session.ttl_for(remember_me);
        let session = self.sessions.create_session(user.id, Some(ttl)).await?;

        counter!(AUTH_SIGN_IN_SUCCESS).increment(1);
        info!(user_id = %user.id, remember_me, "user signed in");
        Ok(SignedIn { user, session })
    }

    #[instrument(skip_all, name = "auth.sign_out")]
    async fn sign_out(&self, session_token: &str) -> Result<(), AuthError> {
        self.sessions.revoke_session(session_token).await
    }

    #[instrument(skip_all, name = "auth.forgot_password")]
    async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        // Failures stay in the log; the answer is the same for every input.
        if let Err(err) = self.tokens.issue_password_reset_token(email).await {
            error!(error = %err, "password reset issue failed");
        }
        Ok(())
    }

    #[instrument(skip_all, name = "auth.reset_password")]
    async fn reset_password(
        &self,
        token: &str,
        new_password: Zeroizing<String>,
    ) -> Result<(), AuthError> {
        validate_password(&new_password, &self.policy.password_requirements)?;

        // Hash first so the KDF never runs after the token is spent
        let password_hash = self.hasher.hash(new_password).await?;
        let consumed = self
            .tokens
            .consume_token(token, TokenEffect::ResetPassword { password_hash })
            .await?;

        counter!(SESSION_REVOKED, "scope" => "all").increment(consumed.sessions_revoked as u64);
        info!(
            user_id = %consumed.user_id,
            revoked = consumed.sessions_revoked,
            "password reset"
        );
        Ok(())
    }

    #[instrument(skip_all, name = "auth.verify_email")]
    async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let consumed = self
            .tokens
            .consume_token(token, TokenEffect::VerifyEmail)
            .await?;

        info!(user_id = %consumed.user_id, "email verified");
        Ok(())
    }

    async fn current_user(&self, session_token: &str) -> Result<User, AuthError> {
        let user_id = self.sessions.validate_session(session_token).await?;
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidSession)
    }
}
