//! Byte-budgeted cache of source records with grace-window LRU eviction.

use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{SourceRecord, now_millis};

/// Eviction protection span for recently touched records.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_secs(1);

/// Bounded collection of source records, keyed by source identifier.
///
/// The budget counts estimated bytes (raw plus variants per record).
/// Eviction is least-recently-used with a grace window: a record touched
/// within the window is never evicted, so the cache may transiently exceed
/// its budget rather than drop records that are mid-use.
pub struct SourceCache {
    records: Mutex<LruCache<String, Arc<SourceRecord>>>,
    max_bytes: u64,
    grace: Duration,
}

impl SourceCache {
    /// Creates a cache with the given byte budget and the default grace
    /// window.
    #[must_use]
    pub fn new(max_bytes: u64) -> Self {
        Self::with_grace(max_bytes, DEFAULT_GRACE_WINDOW)
    }

    /// Creates a cache with an explicit grace window.
    #[must_use]
    pub fn with_grace(max_bytes: u64, grace: Duration) -> Self {
        Self {
            records: Mutex::new(LruCache::unbounded()),
            max_bytes,
            grace,
        }
    }

    /// Returns the record for `src` and marks it as just used.
    pub fn get(&self, src: &str) -> Option<Arc<SourceRecord>> {
        let mut records = self.records.lock();
        if let Some(record) = records.get(src) {
            record.touch();
            trace!(src = %src, "Source cache hit");
            Some(record.clone())
        } else {
            trace!(src = %src, "Source cache miss");
            None
        }
    }

    /// Inserts `record` under `src`, sweeping first.
    ///
    /// Insertion is unconditional: an over-budget cache still accepts the
    /// record and relies on later sweeps to shed stale ones.
    pub fn put(&self, src: impl Into<String>, record: Arc<SourceRecord>) {
        let mut records = self.records.lock();
        Self::sweep_locked(&mut records, self.max_bytes, self.grace);
        record.touch();
        records.put(src.into(), record);
    }

    /// Returns the record for `src`, inserting the one built by `make` on a
    /// miss.
    ///
    /// Check and insert happen under one lock, so concurrent misses for the
    /// same source converge on a single record and coalesce on its memoized
    /// initialization.
    pub fn get_or_insert_with(
        &self,
        src: &str,
        make: impl FnOnce() -> Arc<SourceRecord>,
    ) -> Arc<SourceRecord> {
        let mut records = self.records.lock();
        if let Some(record) = records.get(src) {
            record.touch();
            trace!(src = %src, "Source cache hit");
            return record.clone();
        }
        Self::sweep_locked(&mut records, self.max_bytes, self.grace);
        let record = make();
        record.touch();
        records.put(src.to_owned(), record.clone());
        debug!(src = %src, "Source record created");
        record
    }

    /// Re-evaluates the byte budget, evicting stale records oldest-first.
    /// Returns the post-sweep total.
    pub fn sweep(&self) -> u64 {
        let mut records = self.records.lock();
        Self::sweep_locked(&mut records, self.max_bytes, self.grace)
    }

    fn sweep_locked(
        records: &mut LruCache<String, Arc<SourceRecord>>,
        max_bytes: u64,
        grace: Duration,
    ) -> u64 {
        let mut total: u64 = records.iter().map(|(_, r)| r.cache_footprint()).sum();
        if total <= max_bytes {
            return total;
        }

        let grace_millis = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        let cutoff = now_millis().saturating_sub(grace_millis);

        while total > max_bytes {
            // LRU order doubles as last-access order: once the tail entry is
            // inside the grace window, so is everything fresher than it.
            let evict = match records.peek_lru() {
                Some((src, record)) if record.last_access_millis() < cutoff => {
                    Some((src.clone(), record.cache_footprint()))
                }
                Some(_) => {
                    debug!(
                        total = total,
                        max_bytes = max_bytes,
                        "Sweep stopped at grace window"
                    );
                    None
                }
                None => None,
            };
            let Some((src, freed)) = evict else { break };
            records.pop_lru();
            total = total.saturating_sub(freed);
            debug!(src = %src, freed = freed, total = total, "Evicted source record");
        }
        total
    }

    /// Current estimated total size in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.records
            .lock()
            .iter()
            .map(|(_, r)| r.cache_footprint())
            .sum()
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if no records are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `src` is cached, without promoting it.
    #[must_use]
    pub fn contains(&self, src: &str) -> bool {
        self.records.lock().peek(src).is_some()
    }
}

impl std::fmt::Debug for SourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceCache")
            .field("len", &self.len())
            .field("max_bytes", &self.max_bytes)
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{LoadContext, OutputFormat};
    use crate::domain::ports::mocks::{MockAssetLoader, MockCodec, MockSourceTransport};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MB: u64 = 1024 * 1024;

    fn bare_record(src: &str) -> Arc<SourceRecord> {
        let codec = Arc::new(MockCodec::new(4000, 3000));
        Arc::new(SourceRecord::new(src, &[360, 640], codec as _))
    }

    /// Builds an initialized record whose footprint is 10 raw bytes plus one
    /// variant of `variant_len` bytes.
    async fn sized_record(src: &str, variant_len: usize) -> Arc<SourceRecord> {
        let codec = Arc::new(MockCodec::new(4000, 3000).with_encoded_len(variant_len));
        let loader = Arc::new(MockAssetLoader::new(&b"0123456789"[..]));
        let transport = Arc::new(MockSourceTransport::new(&b""[..]));
        let record = Arc::new(SourceRecord::new(src, &[360, 640], codec as _));
        let ctx = LoadContext::new(transport).with_loader(Some(loader as _));
        record.initialize(ctx).await.unwrap();
        record.variant(360, OutputFormat::Webp, 65).await.unwrap();
        record
    }

    #[tokio::test]
    async fn test_get_miss_then_hit() {
        let cache = SourceCache::new(MB);
        assert!(cache.get("/a.png").is_none());

        let record = bare_record("/a.png");
        cache.put("/a.png", record.clone());

        let hit = cache.get("/a.png").unwrap();
        assert!(Arc::ptr_eq(&hit, &record));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_get_or_insert_is_atomic_per_source() {
        let cache = SourceCache::new(MB);
        let makes = AtomicUsize::new(0);

        let first = cache.get_or_insert_with("/a.png", || {
            makes.fetch_add(1, Ordering::SeqCst);
            bare_record("/a.png")
        });
        let second = cache.get_or_insert_with("/a.png", || {
            makes.fetch_add(1, Ordering::SeqCst);
            bare_record("/a.png")
        });

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(makes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_uninitialized_record_counts_one_byte() {
        let cache = SourceCache::new(MB);
        cache.put("/a.png", bare_record("/a.png"));
        assert_eq!(cache.total_bytes(), 1);
    }

    #[tokio::test]
    async fn test_grace_window_blocks_eviction() {
        let cache = SourceCache::with_grace(100, Duration::from_millis(50));
        cache.put("/a.png", sized_record("/a.png", 500).await);

        let total = cache.sweep();
        assert!(total > 100);
        assert!(cache.contains("/a.png"));
    }

    #[tokio::test]
    async fn test_sweep_evicts_stale_records() {
        let cache = SourceCache::with_grace(100, Duration::from_millis(20));
        cache.put("/a.png", sized_record("/a.png", 500).await);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let total = cache.sweep();

        assert_eq!(total, 0);
        assert!(!cache.contains("/a.png"));
    }

    #[tokio::test]
    async fn test_eviction_is_oldest_first() {
        let cache = SourceCache::with_grace(600, Duration::from_millis(20));
        cache.put("/a.png", sized_record("/a.png", 400).await);
        cache.put("/b.png", sized_record("/b.png", 400).await);

        tokio::time::sleep(Duration::from_millis(40)).await;
        // Touching /a.png makes /b.png the eviction candidate.
        cache.get("/a.png").unwrap();
        cache.sweep();

        assert!(cache.contains("/a.png"));
        assert!(!cache.contains("/b.png"));
    }

    #[tokio::test]
    async fn test_insert_is_never_refused() {
        let cache = SourceCache::with_grace(1, Duration::from_millis(500));
        cache.put("/a.png", sized_record("/a.png", 500).await);
        cache.put("/b.png", sized_record("/b.png", 500).await);

        // Both above budget, both fresh, both kept.
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_two_sources_under_one_megabyte_budget() {
        let cache = SourceCache::with_grace(MB, Duration::from_millis(20));
        cache.put("/a.png", sized_record("/a.png", 600_000).await);

        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.put("/b.png", sized_record("/b.png", 600_000).await);
        cache.sweep();

        assert!(!cache.contains("/a.png"));
        assert!(cache.contains("/b.png"));
        assert!(cache.total_bytes() <= MB);
    }
}
