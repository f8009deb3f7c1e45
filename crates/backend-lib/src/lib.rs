// ============================
// recruit-auth/src/lib.rs
// ============================
//! Email and password authentication service: sign-up, verified sign-in,
//! sessions, and self-service password reset.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod housekeeping;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod router;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{AuthRateLimiter, AuthService, RateLimitHook};
use crate::config::Settings;
use crate::middleware::RateLimiter;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Authentication service
    pub auth: Arc<dyn AuthService>,
    /// Settings the handlers read (cookie shape, limits)
    pub settings: Arc<Settings>,
    /// Per-IP request window
    pub rate_limiter: Arc<RateLimiter>,
    /// Sign-in and forgot-password throttle
    pub auth_limiter: Arc<dyn RateLimitHook>,
}

impl AppState {
    /// Create application state with limiters built from `settings`
    pub fn new(auth: Arc<dyn AuthService>, settings: Settings) -> Self {
        let rate_limiter = Arc::new(RateLimiter::from_settings(&settings.rate_limit));
        let auth_limiter = Arc::new(AuthRateLimiter::from_settings(&settings.auth_lockout));
        Self {
            auth,
            settings: Arc::new(settings),
            rate_limiter,
            auth_limiter,
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_auth_limiter(mut self, auth_limiter: Arc<dyn RateLimitHook>) -> Self {
        self.auth_limiter = auth_limiter;
        self
    }
}
