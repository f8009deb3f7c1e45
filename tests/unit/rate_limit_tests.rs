//! Limiters built from settings
use std::time::Duration;

use recruit_auth::{
    auth::{AuthRateLimiter, RateLimitAction, RateLimitDecision, RateLimitHook},
    config::{LockoutSettings, RateLimitSettings},
    middleware::RateLimiter,
};

#[test]
fn test_window_limiter_from_settings() {
    let limiter = RateLimiter::from_settings(&RateLimitSettings {
        max_requests: 2,
        window_secs: 60,
    });

    assert!(limiter.check("203.0.113.1"));
    assert!(limiter.check("203.0.113.1"));
    assert!(!limiter.check("203.0.113.1"));
    assert!(limiter.check("203.0.113.2"));
}

#[test]
fn test_lockout_from_settings() {
    let limiter = AuthRateLimiter::from_settings(&LockoutSettings {
        max_attempts: 2,
        lockout_secs: 60,
    });
    let key = "email:someone@example.com";

    limiter.record_failure(RateLimitAction::SignIn, key);
    assert_eq!(
        limiter.check(RateLimitAction::SignIn, key),
        RateLimitDecision::Allowed
    );
    limiter.record_failure(RateLimitAction::SignIn, key);
    assert_eq!(
        limiter.check(RateLimitAction::SignIn, key),
        RateLimitDecision::Limited
    );

    // Success does not lift an active lockout early for other keys
    limiter.record_success(RateLimitAction::SignIn, "ip:203.0.113.9");
    assert_eq!(
        limiter.check(RateLimitAction::SignIn, key),
        RateLimitDecision::Limited
    );
}

#[test]
fn test_default_lockout_matches_default_settings() {
    let limiter = AuthRateLimiter::default();
    let key = "ip:198.51.100.1";
    for _ in 0..4 {
        limiter.record_failure(RateLimitAction::ForgotPassword, key);
    }
    assert_eq!(
        limiter.check(RateLimitAction::ForgotPassword, key),
        RateLimitDecision::Allowed
    );
    limiter.record_failure(RateLimitAction::ForgotPassword, key);
    assert_eq!(
        limiter.check(RateLimitAction::ForgotPassword, key),
        RateLimitDecision::Limited
    );
}

#[test]
fn test_cleanup_keeps_active_lockouts() {
    let limiter = AuthRateLimiter::new(1, Duration::from_secs(60));
    limiter.record_failure(RateLimitAction::SignIn, "ip:1");
    limiter.cleanup();
    assert_eq!(limiter.tracked_keys(), 1);
}
