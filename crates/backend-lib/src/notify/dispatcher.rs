//! Bounded outbound queue plus a delivery worker.
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn, Instrument};

use super::{NotificationError, NotificationGateway, OutboundEmail};
use crate::config::EmailSettings;
use crate::metrics::{EMAIL_FAILED, EMAIL_SENT};
use crate::validation::redact_email;

/// Timeout and retry behaviour of the worker
#[derive(Debug, Clone, Copy)]
pub struct DeliveryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    /// Retry n waits `n * backoff`
    pub backoff: Duration,
}

impl From<&EmailSettings> for DeliveryPolicy {
    fn from(settings: &EmailSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            max_retries: settings.max_retries,
            backoff: settings.retry_backoff(),
        }
    }
}

/// Fire-and-forget handle to the delivery worker. Clones share the queue.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<OutboundEmail>,
}

impl Dispatcher {
    /// Start the worker. It exits once every `Dispatcher` clone is dropped
    /// and the queue has drained.
    pub fn spawn(
        gateway: Arc<dyn NotificationGateway>,
        policy: DeliveryPolicy,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<OutboundEmail>(capacity.max(1));

        let worker = tokio::spawn(
            async move {
                while let Some(email) = rx.recv().await {
                    deliver(gateway.as_ref(), &email, policy).await;
                }
                debug!("email queue closed");
            }
            .instrument(tracing::info_span!("email_worker")),
        );

        (Self { tx }, worker)
    }

    pub fn from_settings(
        gateway: Arc<dyn NotificationGateway>,
        settings: &EmailSettings,
    ) -> (Self, JoinHandle<()>) {
        Self::spawn(gateway, DeliveryPolicy::from(settings), settings.queue_capacity)
    }

    /// Queue a message without waiting. A full or closed queue drops it.
    pub fn enqueue(&self, email: OutboundEmail) {
        if let Err(err) = self.tx.try_send(email) {
            let (reason, email) = match err {
                mpsc::error::TrySendError::Full(email) => ("queue full", email),
                mpsc::error::TrySendError::Closed(email) => ("queue closed", email),
            };
            counter!(EMAIL_FAILED, "reason" => reason).increment(1);
            error!(to = %redact_email(&email.to), reason, "dropping outbound email");
        }
    }
}

async fn deliver(gateway: &dyn NotificationGateway, email: &OutboundEmail, policy: DeliveryPolicy) {
    let to = redact_email(&email.to);

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            tokio::time::sleep(policy.backoff * attempt).await;
        }

        let outcome = tokio::time::timeout(
            policy.timeout,
            gateway.send(&email.to, &email.subject, &email.html),
        )
        .await
        .unwrap_or(Err(NotificationError::Timeout));

        match outcome {
            Ok(()) => {
                counter!(EMAIL_SENT).increment(1);
                debug!(%to, subject = %email.subject, attempt, "email delivered");
                return;
            },
            Err(err) => {
                warn!(%to, attempt, error = %err, "email delivery attempt failed");
            },
        }
    }

    counter!(EMAIL_FAILED, "reason" => "exhausted").increment(1);
    error!(%to, subject = %email.subject, "giving up on email delivery");
}
