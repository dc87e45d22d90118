use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, instrument};

use chatrelay_core::types::{Turn, UserId};

/// Deadline used when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A stored conversation plus the instant after which it is forgotten.
#[derive(Debug, Clone)]
struct Entry {
    turns: Arc<Vec<Turn>>,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Thread-safe, expiry-bounded map from user identity to conversation turns.
///
/// Writes replace the whole turn sequence under the shard lock, so a
/// concurrent `get` sees either the old or the new sequence, never a mix.
/// Concurrent writes for the same user are last-writer-wins.
pub struct SessionStore {
    entries: DashMap<UserId, Entry>,
    timeout: Duration,
}

impl SessionStore {
    /// Create an empty store whose entries live `timeout` past their last write.
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            timeout,
        }
    }

    /// Return the turns stored for `user_id`, or `None` if absent or expired.
    ///
    /// An expired entry found here is evicted on the spot.
    pub fn get(&self, user_id: &UserId) -> Option<Vec<Turn>> {
        let now = Instant::now();
        let turns = {
            let entry = self.entries.get(user_id)?;
            if entry.is_expired(now) {
                None
            } else {
                Some(Arc::clone(&entry.turns))
            }
        };

        match turns {
            Some(turns) => Some(turns.as_ref().clone()),
            None => {
                // Guard is dropped above; re-check under the write lock so a
                // fresh `set` racing with us is not thrown away.
                self.entries.remove_if(user_id, |_, e| e.is_expired(now));
                debug!(user = %user_id, "session expired on read");
                None
            }
        }
    }

    /// Replace the turns for `user_id` and restart its expiry window.
    #[instrument(skip(self, turns), fields(user = %user_id, turns = turns.len()))]
    pub fn set(&self, user_id: &UserId, turns: Vec<Turn>) {
        let now = Instant::now();
        let expires_at = now
            .checked_add(self.timeout)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let entry = Entry {
            turns: Arc::new(turns),
            expires_at,
        };
        self.entries.insert(user_id.clone(), entry);
        debug!("session stored");
    }

    /// Forget the conversation for `user_id`. Returns whether one existed.
    #[instrument(skip(self), fields(user = %user_id))]
    pub fn clear(&self, user_id: &UserId) -> bool {
        let removed = self.entries.remove(user_id).is_some();
        debug!(removed, "session cleared");
        removed
    }

    /// Evict every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of entries currently held, including ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
