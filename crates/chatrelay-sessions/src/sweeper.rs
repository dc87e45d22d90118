use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::store::SessionStore;

/// Background janitor that evicts expired sessions on a fixed cadence.
///
/// Reads already ignore expired entries; the sweeper only bounds memory
/// for users who never come back.
pub struct SessionSweeper {
    store: Arc<SessionStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<SessionStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Sweep every `interval` until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "session sweeper started");

        let mut interval = tokio::time::interval(self.interval);
        // The first tick completes immediately; nothing can be expired yet.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = self.store.purge_expired();
                    if evicted > 0 {
                        debug!(evicted, remaining = self.store.len(), "expired sessions swept");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("session sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }
}
