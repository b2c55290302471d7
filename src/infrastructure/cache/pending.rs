//! Coalescing table for in-flight variant computations.

use std::collections::HashMap;

use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::trace;

use crate::domain::entities::RequestKey;

/// A cloneable handle to one in-flight computation.
pub type SharedComputation<T> = Shared<BoxFuture<'static, T>>;

/// Maps exact request keys to their in-flight computations.
///
/// The first caller for a key starts the computation and owns its lifecycle;
/// everyone else clones the shared handle and awaits the same settled value.
/// Entries are removed explicitly once settled, so the table only ever holds
/// work that is still running.
pub struct PendingTable<T> {
    inner: Mutex<HashMap<RequestKey, SharedComputation<T>>>,
}

impl<T: Clone + 'static> PendingTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Joins the computation for `key`, starting it via `start` when absent.
    ///
    /// Returns the shared handle and whether this caller started it. Lookup
    /// and insert happen under one lock, so exactly one caller per key
    /// observes `true`.
    pub fn join_or_start(
        &self,
        key: &RequestKey,
        start: impl FnOnce() -> SharedComputation<T>,
    ) -> (SharedComputation<T>, bool) {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.get(key) {
            trace!(key = %key, "Joined in-flight computation");
            return (existing.clone(), false);
        }
        let task = start();
        inner.insert(key.clone(), task.clone());
        (task, true)
    }

    /// Drops the entry for `key` once its computation has settled.
    pub fn remove(&self, key: &RequestKey) {
        if self.inner.lock().remove(key).is_some() {
            trace!(key = %key, "Pending entry settled");
        }
    }

    /// Number of computations currently in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true when nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns true if a computation for `key` is in flight.
    #[must_use]
    pub fn contains(&self, key: &RequestKey) -> bool {
        self.inner.lock().contains_key(key)
    }
}

impl<T: Clone + 'static> Default for PendingTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for PendingTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTable")
            .field("len", &self.inner.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::OutputFormat;
    use futures_util::FutureExt;

    fn key(src: &str) -> RequestKey {
        RequestKey::new(src, 640, OutputFormat::Webp, 65)
    }

    #[tokio::test]
    async fn test_first_caller_starts_later_callers_join() {
        let table: PendingTable<u32> = PendingTable::new();
        let k = key("/a.png");

        let (first, started_first) = table.join_or_start(&k, || async { 7 }.boxed().shared());
        let (second, started_second) =
            table.join_or_start(&k, || unreachable!("entry already in flight"));

        assert!(started_first);
        assert!(!started_second);
        assert_eq!(first.await, 7);
        assert_eq!(second.await, 7);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let table: PendingTable<u32> = PendingTable::new();

        let (_, a_started) = table.join_or_start(&key("/a.png"), || async { 1 }.boxed().shared());
        let (_, b_started) = table.join_or_start(&key("/b.png"), || async { 2 }.boxed().shared());

        assert!(a_started);
        assert!(b_started);
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_removed_key_restarts() {
        let table: PendingTable<u32> = PendingTable::new();
        let k = key("/a.png");

        let (task, _) = table.join_or_start(&k, || async { 1 }.boxed().shared());
        assert_eq!(task.await, 1);
        table.remove(&k);
        assert!(table.is_empty());

        let (task, started) = table.join_or_start(&k, || async { 2 }.boxed().shared());
        assert!(started);
        assert_eq!(task.await, 2);
    }
}
