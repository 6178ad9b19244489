//! In-memory group-membership cache with TTL expiration.
//!
//! Each write stamps the entry with an expiry deadline; reads check the
//! deadline and evict lazily, backed by a single periodic sweep task owned
//! by the store. There is no timer per write, so an old write's expiry can
//! never delete a newer value for the same key.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::task::JoinHandle;

use authgate_metrics::{MetricTag, MetricsSink, names};

use crate::types::{Entry, UserGroupData};

// =============================================================================
// Cache Error
// =============================================================================

/// Errors that can occur when writing to the cache store.
///
/// Reads are infallible by contract: a read either finds a live entry or
/// reports not-found.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The store has been shut down and no longer accepts writes.
    #[error("group cache is shut down")]
    Closed,
}

// =============================================================================
// Cached Record
// =============================================================================

/// A stored record plus its expiry deadline.
#[derive(Debug, Clone)]
struct CachedGroups {
    data: UserGroupData,
    /// `None` when expiration is disabled for this store.
    expires_at: Option<Instant>,
}

impl CachedGroups {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= Instant::now())
    }
}

// =============================================================================
// Local Cache
// =============================================================================

/// Concurrency-safe mapping from identity to [`UserGroupData`] with per-write
/// TTL expiration and explicit bulk purge.
///
/// Any number of callers may invoke [`get`](Self::get), [`set`](Self::set)
/// and [`purge`](Self::purge) concurrently without external synchronization;
/// last write wins for concurrent writers to the same key. Callers always
/// receive owned copies, never references into the store.
///
/// A TTL of [`Duration::ZERO`] disables expiration entirely: entries live
/// until purged or the store is dropped. With a positive TTL the store also
/// owns one background sweep task that removes expired entries that are
/// never read again; the task is cancelled on [`shutdown`](Self::shutdown)
/// and on drop.
pub struct LocalCache {
    /// Cache configuration.
    ttl: Duration,
    sink: Arc<dyn MetricsSink>,
    tags: Vec<MetricTag>,

    /// Cache data.
    entries: Arc<DashMap<String, CachedGroups>>,

    closed: Arc<AtomicBool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl LocalCache {
    /// Creates a cache that sweeps at the TTL period.
    ///
    /// Must be called within a Tokio runtime when `ttl` is positive, since
    /// the sweep task is spawned here.
    #[must_use]
    pub fn new(ttl: Duration, sink: Arc<dyn MetricsSink>, tags: Vec<MetricTag>) -> Self {
        Self::with_sweep_interval(ttl, ttl, sink, tags)
    }

    /// Creates a cache with an explicit sweep interval.
    ///
    /// The interval only controls how promptly never-read entries are
    /// reclaimed; reads never observe an expired entry regardless.
    #[must_use]
    pub fn with_sweep_interval(
        ttl: Duration,
        sweep_interval: Duration,
        sink: Arc<dyn MetricsSink>,
        tags: Vec<MetricTag>,
    ) -> Self {
        let entries: Arc<DashMap<String, CachedGroups>> = Arc::new(DashMap::new());
        let closed = Arc::new(AtomicBool::new(false));

        let sweeper = if ttl.is_zero() {
            None
        } else {
            Some(Self::spawn_sweeper(
                Arc::clone(&entries),
                sweep_interval.max(Duration::from_millis(1)),
            ))
        };

        Self {
            ttl,
            sink,
            tags,
            entries,
            closed,
            sweeper: Mutex::new(sweeper),
        }
    }

    fn spawn_sweeper(
        entries: Arc<DashMap<String, CachedGroups>>,
        period: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let before = entries.len();
                entries.retain(|_, cached| !cached.is_expired());
                let removed = before.saturating_sub(entries.len());
                if removed > 0 {
                    tracing::trace!(removed, "group cache sweep");
                }
            }
        })
    }

    /// Retrieves the entry stored for `key`, if it exists and has not
    /// expired. Emits a hit or miss counter reflecting the outcome.
    ///
    /// An expired entry is evicted on access through the same race-tolerant
    /// removal path as [`purge`](Self::purge); the deadline is re-checked
    /// under the map guard so a concurrent overwrite with a fresh deadline
    /// survives.
    pub fn get(&self, key: &str) -> Option<Entry> {
        let live = self
            .entries
            .get(key)
            .and_then(|cached| (!cached.is_expired()).then(|| cached.data.clone()));

        match live {
            Some(data) => {
                self.sink
                    .increment(names::GROUP_CACHE_HITS_TOTAL, &self.tags, 1.0);
                tracing::debug!(key = %key, "group cache hit");
                Some(Entry {
                    key: key.to_string(),
                    data,
                })
            }
            None => {
                self.entries.remove_if(key, |_, cached| cached.is_expired());
                self.sink
                    .increment(names::GROUP_CACHE_MISSES_TOTAL, &self.tags, 1.0);
                tracing::debug!(key = %key, "group cache miss");
                None
            }
        }
    }

    /// Stores `entry`, replacing any existing record for the same key
    /// wholesale. With a positive TTL the entry's expiry deadline is stamped
    /// here.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Closed`] if the store has been shut down. The
    /// outcome is also emitted as a `group_cache_sets_total` counter tagged
    /// with `outcome`.
    pub fn set(&self, entry: Entry) -> Result<(), CacheError> {
        if self.closed.load(Ordering::Acquire) {
            self.emit_set_outcome("error");
            return Err(CacheError::Closed);
        }

        let expires_at = (!self.ttl.is_zero()).then(|| Instant::now() + self.ttl);
        self.entries.insert(
            entry.key,
            CachedGroups {
                data: entry.data,
                expires_at,
            },
        );
        self.emit_set_outcome("success");
        Ok(())
    }

    /// Removes the given keys immediately, regardless of remaining TTL.
    ///
    /// Idempotent: purging an absent key is a no-op, not an error.
    pub fn purge(&self, keys: &[String]) {
        for key in keys {
            self.entries.remove(key);
        }
        tracing::debug!(keys = keys.len(), "group cache purge");
    }

    /// Cancels the sweep task and marks the store closed; subsequent writes
    /// fail with [`CacheError::Closed`] while reads keep serving whatever is
    /// still stored. Idempotent.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Number of stored entries, including any that have expired but not yet
    /// been evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn emit_set_outcome(&self, outcome: &str) {
        let mut tags = self.tags.clone();
        tags.push(MetricTag::new("outcome", outcome));
        self.sink
            .increment(names::GROUP_CACHE_SETS_TOTAL, &tags, 1.0);
    }
}

impl Drop for LocalCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.entries.len())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct CountingSink {
        counts: Mutex<HashMap<String, u64>>,
    }

    impl CountingSink {
        fn count(&self, key: &str) -> u64 {
            self.counts
                .lock()
                .unwrap()
                .get(key)
                .copied()
                .unwrap_or_default()
        }
    }

    impl MetricsSink for CountingSink {
        fn increment(&self, name: &str, tags: &[MetricTag], _sample_rate: f64) {
            let key = tags
                .iter()
                .find(|tag| tag.key == "outcome")
                .map_or_else(|| name.to_string(), |tag| format!("{name}:{}", tag.value));
            *self.counts.lock().unwrap().entry(key).or_default() += 1;
        }
    }

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn test_entry() -> Entry {
        Entry::new("testkey", &groups(&["testGroup"]), &groups(&["testGroup"]))
    }

    fn cache_with_ttl(ttl: Duration) -> (LocalCache, Arc<CountingSink>) {
        let sink = Arc::new(CountingSink::default());
        let cache = LocalCache::new(
            ttl,
            sink.clone(),
            vec![MetricTag::new("service", "test")],
        );
        (cache, sink)
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let (cache, _sink) = cache_with_ttl(Duration::from_secs(10));
        let entry = test_entry();
        cache.set(entry.clone()).unwrap();

        assert_eq!(cache.get("testkey"), Some(entry));
    }

    #[tokio::test]
    async fn set_overwrites_wholesale() {
        let (cache, _sink) = cache_with_ttl(Duration::from_secs(10));
        cache.set(test_entry()).unwrap();

        let replacement = Entry::new("testkey", &groups(&["eng", "ops"]), &groups(&["eng"]));
        cache.set(replacement.clone()).unwrap();

        assert_eq!(cache.get("testkey"), Some(replacement));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn missing_key_is_a_miss() {
        let (cache, sink) = cache_with_ttl(Duration::from_secs(10));

        assert!(cache.get("nobody").is_none());
        assert_eq!(sink.count(names::GROUP_CACHE_MISSES_TOTAL), 1);
        assert_eq!(sink.count(names::GROUP_CACHE_HITS_TOTAL), 0);
    }

    #[tokio::test]
    async fn not_available_after_ttl() {
        let (cache, _sink) = cache_with_ttl(Duration::from_millis(20));
        cache.set(test_entry()).unwrap();

        assert!(cache.get("testkey").is_some());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get("testkey").is_none());
    }

    #[tokio::test]
    async fn zero_ttl_disables_expiration() {
        let (cache, _sink) = cache_with_ttl(Duration::ZERO);
        cache.set(test_entry()).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.get("testkey").is_some());
    }

    #[tokio::test]
    async fn sweeper_reclaims_entries_that_are_never_read() {
        let (cache, _sink) = cache_with_ttl(Duration::from_millis(20));
        cache.set(test_entry()).unwrap();
        assert_eq!(cache.len(), 1);

        // No reads happen; only the sweep task can reclaim the entry.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn not_available_after_purge() {
        let (cache, _sink) = cache_with_ttl(Duration::from_secs(10));
        cache.set(test_entry()).unwrap();
        assert!(cache.get("testkey").is_some());

        cache.purge(&[String::from("testkey")]);
        assert!(cache.get("testkey").is_none());
    }

    #[tokio::test]
    async fn purging_an_absent_key_is_a_noop() {
        let (cache, _sink) = cache_with_ttl(Duration::from_secs(10));
        cache.set(test_entry()).unwrap();

        cache.purge(&[String::from("not-there")]);

        assert_eq!(cache.len(), 1);
        assert!(cache.get("testkey").is_some());
    }

    #[tokio::test]
    async fn set_fails_after_shutdown() {
        let (cache, sink) = cache_with_ttl(Duration::from_secs(10));
        cache.shutdown();

        let err = cache.set(test_entry()).unwrap_err();
        assert!(matches!(err, CacheError::Closed));
        assert_eq!(
            sink.count(&format!("{}:error", names::GROUP_CACHE_SETS_TOTAL)),
            1
        );
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_reads_keep_working() {
        let (cache, _sink) = cache_with_ttl(Duration::from_secs(10));
        cache.set(test_entry()).unwrap();

        cache.shutdown();
        cache.shutdown();

        assert!(cache.get("testkey").is_some());
    }

    #[tokio::test]
    async fn hit_and_set_metrics_are_emitted() {
        let (cache, sink) = cache_with_ttl(Duration::from_secs(10));
        cache.set(test_entry()).unwrap();
        let _ = cache.get("testkey");

        assert_eq!(sink.count(names::GROUP_CACHE_HITS_TOTAL), 1);
        assert_eq!(
            sink.count(&format!("{}:success", names::GROUP_CACHE_SETS_TOTAL)),
            1
        );
    }

    #[tokio::test]
    async fn concurrent_readers_and_writers_do_not_interfere() {
        let (cache, _sink) = cache_with_ttl(Duration::from_secs(10));
        let cache = Arc::new(cache);

        let mut handles = Vec::new();
        for worker in 0..8u32 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                for i in 0..50u32 {
                    let key = format!("user-{}@x.com", (worker + i) % 4);
                    let entry =
                        Entry::new(key.as_str(), &groups(&["eng", "ops"]), &groups(&["eng"]));
                    cache.set(entry).unwrap();
                    let _ = cache.get(&key);
                    cache.purge(std::slice::from_ref(&key));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
