use async_trait::async_trait;
use zeroize::Zeroizing;

use super::IssuedSession;
use crate::error::AuthError;
use crate::models::User;

/// Result of a successful sign-in
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub session: IssuedSession,
}

/// The six public operations plus current-session lookup.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register an unverified user and send a verification link. No session.
    async fn sign_up(
        &self,
        name: Option<String>,
        email: &str,
        password: Zeroizing<String>,
    ) -> Result<User, AuthError>;

    /// Unknown email and wrong password are indistinguishable.
    async fn sign_in(
        &self,
        email: &str,
        password: Zeroizing<String>,
        remember_me: bool,
    ) -> Result<SignedIn, AuthError>;

    /// Idempotent
    async fn sign_out(&self, session_token: &str) -> Result<(), AuthError>;

    /// Always succeeds from the caller's point of view
    async fn forgot_password(&self, email: &str) -> Result<(), AuthError>;

    /// Spend a reset token, store the new password, wipe every session
    async fn reset_password(
        &self,
        token: &str,
        new_password: Zeroizing<String>,
    ) -> Result<(), AuthError>;

    async fn verify_email(&self, token: &str) -> Result<(), AuthError>;

    /// Who is behind this session handle
    async fn current_user(&self, session_token: &str) -> Result<User, AuthError>;
}
