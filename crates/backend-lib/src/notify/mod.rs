// ============================
// recruit-auth/src/notify/mod.rs
// ============================
//! Notification Gateway: outbound email for verification and reset links.
//!
//! Callers never await delivery. Messages go through the [`Dispatcher`] queue
//! and a worker task hands them to a [`NotificationGateway`]; failures are
//! logged and counted but never reach the request that caused them.
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::validation::redact_email;

mod dispatcher;
mod memory;
mod smtp;
pub mod templates;

pub use dispatcher::{DeliveryPolicy, Dispatcher};
pub use memory::MemoryGateway;
pub use smtp::SmtpGateway;

/// Delivery failures. Logged only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("delivery timed out")]
    Timeout,
}

/// A rendered message waiting for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Email delivery abstraction used by the dispatcher worker
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotificationError>;
}

/// Gateway for local development: logs the message instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogGateway;

#[async_trait]
impl NotificationGateway for LogGateway {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotificationError> {
        info!(
            to = %redact_email(to),
            subject,
            bytes = html.len(),
            "email send stub"
        );
        // Links are only useful to a developer reading the log
        tracing::debug!(body = html, "email body");
        Ok(())
    }
}
