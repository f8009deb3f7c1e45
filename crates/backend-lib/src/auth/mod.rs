// ============================
// recruit-auth/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod rate_limit;
pub mod session;
pub mod token_generator;
pub mod tokens;
mod service;
mod service_impl;

pub use password::PasswordHasherPool;
pub use rate_limit::{
    AuthRateLimiter, NoopRateLimiter, RateLimitAction, RateLimitDecision, RateLimitHook,
};
pub use service::{AuthService, SignedIn};
pub use service_impl::{AuthPolicy, DefaultAuth};
pub use session::{IssuedSession, SessionManager};
pub use tokens::TokenIssuer;
