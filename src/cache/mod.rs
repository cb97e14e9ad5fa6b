//! Tiered cache manager for validation and processing results
//!
//! Two tiers: a bounded in-process LRU map in front of an optional
//! persistent store. Reads check the fast tier first and promote slow-tier
//! hits; writes go to both tiers. Expired entries behave as misses and are
//! evicted on read; a background sweep bounds growth for keys nobody
//! re-reads. Slow-tier failures are logged and swallowed: caching is an
//! optimization, never a correctness dependency.

pub mod entry;
pub mod store;

pub use entry::CacheEntry;
pub use store::{MemoryStore, PROCESSING_NS, PersistentStore, SqliteStore, VALIDATION_NS};

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::PipelineError;
use crate::schema::{ProcessedLink, ValidationResult};

/// Cache diagnostics surfaced to callers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub memory_misses: u64,
    pub storage_hits: u64,
    pub storage_misses: u64,
    pub memory_size: usize,
    pub storage_size: u64,
    /// Combined hit rate across both tiers, 0.0 when no reads happened
    pub hit_rate: f64,
}

/// Two-tier cache with typed validation and processing domains.
///
/// The manager exclusively owns its entries; callers get clones of the
/// payload and never references into the tiers.
pub struct CacheManager {
    validation: Mutex<LruCache<String, CacheEntry<ValidationResult>>>,
    processing: Mutex<LruCache<String, CacheEntry<Vec<ProcessedLink>>>>,
    store: Option<Arc<dyn PersistentStore>>,
    validation_ttl: Duration,
    processing_ttl: Duration,
    memory_hits: AtomicU64,
    memory_misses: AtomicU64,
    storage_hits: AtomicU64,
    storage_misses: AtomicU64,
}

impl CacheManager {
    /// Create a manager with the given fast-tier capacity and default TTLs.
    ///
    /// `store` is the optional slow tier; `None` degrades the cache to
    /// fast-tier-only behavior.
    #[must_use]
    pub fn new(
        max_entries: usize,
        validation_ttl: Duration,
        processing_ttl: Duration,
        store: Option<Arc<dyn PersistentStore>>,
    ) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            validation: Mutex::new(LruCache::new(capacity)),
            processing: Mutex::new(LruCache::new(capacity)),
            store,
            validation_ttl,
            processing_ttl,
            memory_hits: AtomicU64::new(0),
            memory_misses: AtomicU64::new(0),
            storage_hits: AtomicU64::new(0),
            storage_misses: AtomicU64::new(0),
        }
    }

    /// Cheap order-sensitive content key: identical text maps to the same
    /// key. Collisions are a performance edge case, not a correctness one.
    #[must_use]
    pub fn content_key(text: &str) -> String {
        format!("{:016x}", xxh3_64(text.as_bytes()))
    }

    /// Cache a validation result under its URL with the default TTL
    pub async fn cache_validation_result(&self, url: &str, result: ValidationResult) {
        self.cache_validation_result_ttl(url, result, self.validation_ttl)
            .await;
    }

    /// Cache a validation result with an explicit (tier-derived) TTL.
    ///
    /// Slow-tier failures are logged and swallowed; use
    /// [`Self::try_cache_validation_result_ttl`] to observe them.
    pub async fn cache_validation_result_ttl(
        &self,
        url: &str,
        result: ValidationResult,
        ttl: Duration,
    ) {
        if let Err(e) = self.try_cache_validation_result_ttl(url, result, ttl).await {
            // Best-effort: the fast tier already holds the entry
            warn!(target: "linkpipe::cache", "{e}");
        }
    }

    /// Cache a validation result, surfacing slow-tier failures to the
    /// caller. The fast tier takes the entry regardless.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Cache`] when the entry cannot be
    /// serialized or the persistent store rejects the write.
    pub async fn try_cache_validation_result_ttl(
        &self,
        url: &str,
        result: ValidationResult,
        ttl: Duration,
    ) -> Result<(), PipelineError> {
        let entry = CacheEntry::new(result, ttl);
        let slow = self.serialize_for_store(&entry);
        self.validation.lock().put(url.to_string(), entry);
        self.write_slow_tier(&format!("{VALIDATION_NS}{url}"), slow?)
            .await
    }

    /// Look up a cached validation result; expired entries behave as a
    /// miss and are evicted
    pub async fn get_validation_result(&self, url: &str) -> Option<ValidationResult> {
        // Fast tier
        {
            let mut tier = self.validation.lock();
            match tier.get_mut(url) {
                Some(entry) if !entry.is_expired() => {
                    entry.touch();
                    self.memory_hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.payload.clone());
                }
                Some(_) => {
                    tier.pop(url);
                    self.memory_misses.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    self.memory_misses.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        // Slow tier, promote on hit
        let key = format!("{VALIDATION_NS}{url}");
        let entry: CacheEntry<ValidationResult> = self.read_slow_tier(&key).await?;
        self.validation.lock().put(url.to_string(), entry.clone());
        Some(entry.payload)
    }

    /// Cache a processed link collection under a content key
    pub async fn cache_processing_result(&self, content_key: &str, results: Vec<ProcessedLink>) {
        self.cache_processing_result_ttl(content_key, results, self.processing_ttl)
            .await;
    }

    /// Cache a processed link collection with an explicit TTL
    pub async fn cache_processing_result_ttl(
        &self,
        content_key: &str,
        results: Vec<ProcessedLink>,
        ttl: Duration,
    ) {
        if let Err(e) = self
            .try_cache_processing_result_ttl(content_key, results, ttl)
            .await
        {
            warn!(target: "linkpipe::cache", "{e}");
        }
    }

    /// Cache a processed link collection, surfacing slow-tier failures
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Cache`] when the entry cannot be
    /// serialized or the persistent store rejects the write.
    pub async fn try_cache_processing_result_ttl(
        &self,
        content_key: &str,
        results: Vec<ProcessedLink>,
        ttl: Duration,
    ) -> Result<(), PipelineError> {
        let entry = CacheEntry::new(results, ttl);
        let slow = self.serialize_for_store(&entry);
        self.processing.lock().put(content_key.to_string(), entry);
        self.write_slow_tier(&format!("{PROCESSING_NS}{content_key}"), slow?)
            .await
    }

    /// Look up a cached processed link collection
    pub async fn get_processing_result(&self, content_key: &str) -> Option<Vec<ProcessedLink>> {
        {
            let mut tier = self.processing.lock();
            match tier.get_mut(content_key) {
                Some(entry) if !entry.is_expired() => {
                    entry.touch();
                    self.memory_hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.payload.clone());
                }
                Some(_) => {
                    tier.pop(content_key);
                    self.memory_misses.fetch_add(1, Ordering::Relaxed);
                }
                None => {
                    self.memory_misses.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let key = format!("{PROCESSING_NS}{content_key}");
        let entry: CacheEntry<Vec<ProcessedLink>> = self.read_slow_tier(&key).await?;
        self.processing
            .lock()
            .put(content_key.to_string(), entry.clone());
        Some(entry.payload)
    }

    /// Drop every entry from both tiers
    pub async fn clear_all(&self) {
        self.validation.lock().clear();
        self.processing.lock().clear();
        if let Some(store) = &self.store {
            if let Err(e) = store.clear().await {
                warn!(target: "linkpipe::cache", "Slow-tier clear failed: {e:#}");
            }
        }
    }

    /// Drop validation entries for URLs on the given host.
    ///
    /// Processing entries are keyed by content hash and carry no host, so
    /// domain-scoped invalidation only applies to the validation domain.
    pub async fn clear_by_domain(&self, domain: &str) {
        let domain = crate::utils::normalize_host(domain);

        {
            let mut tier = self.validation.lock();
            let stale: Vec<String> = tier
                .iter()
                .filter(|(url, _)| {
                    crate::utils::extract_host(url).is_some_and(|h| h == domain)
                })
                .map(|(url, _)| url.clone())
                .collect();
            for url in stale {
                tier.pop(&url);
            }
        }

        if let Some(store) = &self.store {
            let keys = match store.keys(VALIDATION_NS).await {
                Ok(keys) => keys,
                Err(e) => {
                    warn!(target: "linkpipe::cache", "Slow-tier key scan failed: {e:#}");
                    return;
                }
            };
            for key in keys {
                let url = &key[VALIDATION_NS.len()..];
                if crate::utils::extract_host(url).is_some_and(|h| h == domain) {
                    if let Err(e) = store.remove(&key).await {
                        warn!(target: "linkpipe::cache", "Slow-tier delete failed: {e:#}");
                    }
                }
            }
        }
    }

    /// Current hit/miss counters and tier sizes
    pub async fn stats(&self) -> CacheStats {
        let memory_size = self.validation.lock().len() + self.processing.lock().len();
        let storage_size = match &self.store {
            Some(store) => store.len().await.unwrap_or(0),
            None => 0,
        };

        let memory_hits = self.memory_hits.load(Ordering::Relaxed);
        let memory_misses = self.memory_misses.load(Ordering::Relaxed);
        let storage_hits = self.storage_hits.load(Ordering::Relaxed);
        let storage_misses = self.storage_misses.load(Ordering::Relaxed);
        // Every read touches the fast tier first, so fast-tier counters
        // give the total read count; slow-tier hits rescue fast misses.
        let reads = memory_hits + memory_misses;
        let hits = memory_hits + storage_hits;
        let hit_rate = if reads == 0 {
            0.0
        } else {
            hits as f64 / reads as f64
        };

        CacheStats {
            memory_hits,
            memory_misses,
            storage_hits,
            storage_misses,
            memory_size,
            storage_size,
            hit_rate,
        }
    }

    /// Delete expired entries from both tiers, independent of read traffic
    pub async fn sweep(&self) {
        let swept_fast = {
            let mut removed = 0usize;
            let mut validation = self.validation.lock();
            let stale: Vec<String> = validation
                .iter()
                .filter(|(_, e)| e.is_expired())
                .map(|(k, _)| k.clone())
                .collect();
            for key in stale {
                validation.pop(&key);
                removed += 1;
            }
            drop(validation);

            let mut processing = self.processing.lock();
            let stale: Vec<String> = processing
                .iter()
                .filter(|(_, e)| e.is_expired())
                .map(|(k, _)| k.clone())
                .collect();
            for key in stale {
                processing.pop(&key);
                removed += 1;
            }
            removed
        };

        let mut swept_slow = 0u64;
        if let Some(store) = &self.store {
            match store.remove_expired(Utc::now().timestamp()).await {
                Ok(n) => swept_slow = n,
                Err(e) => warn!(target: "linkpipe::cache", "Slow-tier sweep failed: {e:#}"),
            }
        }

        if swept_fast > 0 || swept_slow > 0 {
            debug!(
                target: "linkpipe::cache",
                "Sweep removed {swept_fast} fast-tier and {swept_slow} slow-tier entries"
            );
        }
    }

    /// Spawn the periodic background sweep task
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh manager
            // does not sweep before anything is cached
            ticker.tick().await;
            loop {
                ticker.tick().await;
                manager.sweep().await;
            }
        })
    }

    fn serialize_for_store<T: Serialize>(
        &self,
        entry: &CacheEntry<T>,
    ) -> Result<Option<(String, i64)>, PipelineError> {
        if self.store.is_none() {
            return Ok(None);
        }
        match serde_json::to_string(entry) {
            Ok(json) => Ok(Some((json, entry.expires_at.timestamp()))),
            Err(e) => Err(PipelineError::Cache(format!(
                "entry serialization failed: {e}"
            ))),
        }
    }

    async fn write_slow_tier(
        &self,
        key: &str,
        payload: Option<(String, i64)>,
    ) -> Result<(), PipelineError> {
        let (Some(store), Some((json, expires_at))) = (&self.store, payload) else {
            return Ok(());
        };
        store.set(key, json, expires_at).await.map_err(|e| {
            PipelineError::Cache(format!("slow-tier write for '{key}' failed: {e:#}"))
        })
    }

    async fn read_slow_tier<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let store = self.store.as_ref()?;
        let json = match store.get(key).await {
            Ok(Some(json)) => json,
            Ok(None) => {
                self.storage_misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(e) => {
                warn!(target: "linkpipe::cache", "Slow-tier read for '{key}' failed: {e:#}");
                self.storage_misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let mut entry: CacheEntry<T> = match serde_json::from_str(&json) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(target: "linkpipe::cache", "Corrupt slow-tier entry '{key}': {e}");
                let _ = store.remove(key).await;
                self.storage_misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if entry.is_expired() {
            if let Err(e) = store.remove(key).await {
                warn!(target: "linkpipe::cache", "Stale entry eviction failed: {e:#}");
            }
            self.storage_misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        entry.touch();
        self.storage_hits.fetch_add(1, Ordering::Relaxed);
        Some(entry)
    }
}
