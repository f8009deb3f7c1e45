// ============================
// crates/backend-lib/src/handlers/mod.rs
// ============================
//! HTTP handlers.

pub mod auth;
pub mod extract;

pub use extract::{ClientIp, CurrentUser};
