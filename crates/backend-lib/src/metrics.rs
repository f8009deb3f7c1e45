// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const AUTH_SIGN_UP: &str = "auth.sign_up";
pub const AUTH_SIGN_IN_SUCCESS: &str = "auth.sign_in.success";
pub const AUTH_SIGN_IN_FAILURE: &str = "auth.sign_in.failure";
pub const TOKEN_ISSUED: &str = "token.issued";
pub const TOKEN_CONSUMED: &str = "token.consumed";
pub const TOKEN_REJECTED: &str = "token.rejected";
pub const SESSION_CREATED: &str = "session.created";
pub const SESSION_REVOKED: &str = "session.revoked";
pub const EMAIL_SENT: &str = "email.sent";
pub const EMAIL_FAILED: &str = "email.failed";
pub const STORE_PURGED: &str = "store.purged";
