//! Capturing gateway used by the test suites.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{NotificationError, NotificationGateway, OutboundEmail};

/// Records every delivered message. Can be switched to fail every send.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successfully delivered messages, oldest first
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, to: &str) -> Vec<OutboundEmail> {
        self.sent
            .lock()
            .iter()
            .filter(|email| email.to == to)
            .cloned()
            .collect()
    }

    /// Calls to `send`, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Poll until at least `count` messages were delivered or `timeout` passes.
    pub async fn wait_for_messages(&self, count: usize, timeout: Duration) -> Vec<OutboundEmail> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let sent = self.sent();
            if sent.len() >= count || tokio::time::Instant::now() >= deadline {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Poll until `count` send attempts happened or `timeout` passes.
    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let attempts = self.attempts();
            if attempts >= count || tokio::time::Instant::now() >= deadline {
                return attempts;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl NotificationGateway for MemoryGateway {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Transport("gateway switched off".to_string()));
        }
        self.sent.lock().push(OutboundEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}
