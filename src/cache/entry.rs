//! Generic cache entry with expiry and access tracking

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One cached value with its lifecycle metadata.
///
/// An entry is logically absent once `expires_at` has passed, even while
/// still physically present until a read or the sweeper evicts it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub payload: T,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub access_count: u64,
    pub last_accessed: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    /// Wrap a payload with an absolute expiry computed from `ttl`.
    /// An out-of-range `ttl` saturates to the maximum representable time.
    pub fn new(payload: T, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            payload,
            created_at: now,
            expires_at,
            access_count: 0,
            last_accessed: now,
        }
    }

    /// Whether the entry is logically absent
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Record one access
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }
}
