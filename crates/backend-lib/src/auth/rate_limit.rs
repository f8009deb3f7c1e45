// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Rate limiting hook for sign-in and forgot-password.
//!
//! Keys are opaque strings chosen by the caller, conventionally
//! `ip:<addr>` or `email:<normalized address>`.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::config::LockoutSettings;

/// Flows that consult the hook
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateLimitAction {
    SignIn,
    ForgotPassword,
}

impl RateLimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitAction::SignIn => "sign_in",
            RateLimitAction::ForgotPassword => "forgot_password",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

/// Throttling hook consulted by the auth handlers
pub trait RateLimitHook: Send + Sync {
    fn check(&self, action: RateLimitAction, key: &str) -> RateLimitDecision;
    /// A failed attempt, or for forgot-password any request
    fn record_failure(&self, action: RateLimitAction, key: &str);
    fn record_success(&self, action: RateLimitAction, key: &str);
}

/// Hook that never limits
#[derive(Clone, Debug, Default)]
pub struct NoopRateLimiter;

impl RateLimitHook for NoopRateLimiter {
    fn check(&self, _action: RateLimitAction, _key: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }

    fn record_failure(&self, _action: RateLimitAction, _key: &str) {}

    fn record_success(&self, _action: RateLimitAction, _key: &str) {}
}

/// Entry in the rate limit map
#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Number of failed attempts
    failed_attempts: u32,
    /// Time of the last failed attempt
    last_failure: Instant,
    /// When the lockout expires
    lockout_expiry: Option<Instant>,
}

/// Failure lockout per (action, key)
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<(RateLimitAction, String), RateLimitEntry>>,
    /// Maximum number of failed attempts before lockout
    max_attempts: u32,
    /// Duration of lockout period
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::from_settings(&LockoutSettings::default())
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts: max_attempts.max(1),
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &LockoutSettings) -> Self {
        Self::new(
            settings.max_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
    }

    /// Drop expired lockouts and entries idle for longer than a lockout period
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.attempts.retain(|_, entry| match entry.lockout_expiry {
            Some(expiry) => now < expiry,
            None => now.duration_since(entry.last_failure) < self.lockout_duration,
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.attempts.len()
    }
}

impl RateLimitHook for AuthRateLimiter {
    fn check(&self, action: RateLimitAction, key: &str) -> RateLimitDecision {
        let locked = self
            .attempts
            .get(&(action, key.to_string()))
            .and_then(|entry| entry.lockout_expiry)
            .is_some_and(|expiry| Instant::now() < expiry);

        if locked {
            RateLimitDecision::Limited
        } else {
            RateLimitDecision::Allowed
        }
    }

    fn record_failure(&self, action: RateLimitAction, key: &str) {
        let now = Instant::now();
        let mut entry = self
            .attempts
            .entry((action, key.to_string()))
            .or_insert_with(|| RateLimitEntry {
                failed_attempts: 0,
                last_failure: now,
                lockout_expiry: None,
            });

        // A finished lockout, or a long quiet period, starts the count over
        let stale = match entry.lockout_expiry {
            Some(expiry) => now >= expiry,
            None => now.duration_since(entry.last_failure) >= self.lockout_duration,
        };
        if stale {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none() {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            warn!(
                action = action.as_str(),
                attempts = entry.failed_attempts,
                "auth key locked out"
            );
        }
    }

    fn record_success(&self, action: RateLimitAction, key: &str) {
        self.attempts.remove(&(action, key.to_string()));
    }
}
