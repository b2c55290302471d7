//! Port definition for HTTP source fetching.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::errors::OptimizeResult;

/// Port for fetching source bytes over HTTP.
/// Covers both remote sources and the same-origin loopback fallback used
/// for local sources when no asset loader is configured.
#[async_trait]
pub trait SourceTransportPort: Send + Sync {
    /// Fetches a remote source URL.
    async fn fetch_remote(&self, url: &str) -> OptimizeResult<Bytes>;

    /// Fetches a local path through `http://localhost:{port}{path}`,
    /// forwarding the caller's cookie header when present.
    async fn fetch_loopback(
        &self,
        port: u16,
        path: &str,
        cookie: Option<&str>,
    ) -> OptimizeResult<Bytes>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use crate::domain::errors::OptimizeError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Mock transport serving a fixed payload and recording calls.
    pub struct MockSourceTransport {
        payload: Bytes,
        remote_calls: AtomicUsize,
        loopback_calls: AtomicUsize,
        last_url: Mutex<Option<String>>,
        last_loopback: Mutex<Option<(u16, String, Option<String>)>>,
        fail: AtomicBool,
    }

    impl MockSourceTransport {
        /// Creates a mock returning the given payload for every fetch.
        pub fn new(payload: impl Into<Bytes>) -> Self {
            Self {
                payload: payload.into(),
                remote_calls: AtomicUsize::new(0),
                loopback_calls: AtomicUsize::new(0),
                last_url: Mutex::new(None),
                last_loopback: Mutex::new(None),
                fail: AtomicBool::new(false),
            }
        }

        /// Makes subsequent fetches fail.
        pub fn set_fail(&self, value: bool) {
            self.fail.store(value, Ordering::SeqCst);
        }

        /// Number of remote fetches.
        pub fn remote_calls(&self) -> usize {
            self.remote_calls.load(Ordering::SeqCst)
        }

        /// Number of loopback fetches.
        pub fn loopback_calls(&self) -> usize {
            self.loopback_calls.load(Ordering::SeqCst)
        }

        /// Last remote URL fetched.
        pub fn last_url(&self) -> Option<String> {
            self.last_url.lock().clone()
        }

        /// Last loopback fetch as (port, path, cookie).
        pub fn last_loopback(&self) -> Option<(u16, String, Option<String>)> {
            self.last_loopback.lock().clone()
        }
    }

    #[async_trait]
    impl SourceTransportPort for MockSourceTransport {
        async fn fetch_remote(&self, url: &str) -> OptimizeResult<Bytes> {
            self.remote_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_url.lock() = Some(url.to_owned());
            if self.fail.load(Ordering::SeqCst) {
                return Err(OptimizeError::load("mock transport failure"));
            }
            Ok(self.payload.clone())
        }

        async fn fetch_loopback(
            &self,
            port: u16,
            path: &str,
            cookie: Option<&str>,
        ) -> OptimizeResult<Bytes> {
            self.loopback_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_loopback.lock() =
                Some((port, path.to_owned(), cookie.map(ToOwned::to_owned)));
            if self.fail.load(Ordering::SeqCst) {
                return Err(OptimizeError::load("mock transport failure"));
            }
            Ok(self.payload.clone())
        }
    }
}
