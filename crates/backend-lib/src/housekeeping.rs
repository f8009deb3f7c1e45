//! Periodic purge of stale tokens and sessions. Storage hygiene only;
//! expiry is always enforced at validation time.
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::AuthRateLimiter;
use crate::clock::Clock;
use crate::metrics::STORE_PURGED;
use crate::middleware::RateLimiter;
use crate::storage::{CredentialStore, PurgeReport, StoreError};

/// Run one purge pass
pub async fn purge_once(
    store: &dyn CredentialStore,
    clock: &dyn Clock,
) -> Result<PurgeReport, StoreError> {
    let report = store.purge_expired(clock.now()).await?;
    if report.tokens > 0 || report.sessions > 0 {
        counter!(STORE_PURGED, "kind" => "token").increment(report.tokens as u64);
        counter!(STORE_PURGED, "kind" => "session").increment(report.sessions as u64);
        info!(tokens = report.tokens, sessions = report.sessions, "purged stale credentials");
    } else {
        debug!("nothing to purge");
    }
    Ok(report)
}

/// Spawn the interval task. Returns `None` when `interval` is zero.
pub fn spawn(
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    limiters: Option<(Arc<RateLimiter>, Arc<AuthRateLimiter>)>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = purge_once(store.as_ref(), clock.as_ref()).await {
                warn!(error = %err, "housekeeping pass failed");
            }
            if let Some((window, lockout)) = &limiters {
                window.cleanup();
                lockout.cleanup();
            }
        }
    }))
}
