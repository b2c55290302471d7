//! HTTP transport for remote and loopback source fetching.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::domain::errors::{OptimizeError, OptimizeResult};
use crate::domain::ports::SourceTransportPort;

/// Transport backed by a shared `reqwest` client.
///
/// Remote sources are fetched as given; local sources without a configured
/// asset loader go through `http://localhost:{port}{path}` with the caller's
/// cookie forwarded, so protected assets resolve under the caller's session.
pub struct HttpSourceTransport {
    client: reqwest::Client,
}

impl HttpSourceTransport {
    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns [`OptimizeError::Load`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> OptimizeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OptimizeError::load(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn read_success_body(response: reqwest::Response) -> OptimizeResult<Bytes> {
        if !response.status().is_success() {
            return Err(OptimizeError::load(format!(
                "HTTP {}: {}",
                response.status(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| OptimizeError::load(format!("Failed to read body: {e}")))
    }
}

impl std::fmt::Debug for HttpSourceTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSourceTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl SourceTransportPort for HttpSourceTransport {
    async fn fetch_remote(&self, url: &str) -> OptimizeResult<Bytes> {
        debug!(url = %url, "Fetching remote source");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OptimizeError::load(format!("Request failed: {e}")))?;
        Self::read_success_body(response).await
    }

    async fn fetch_loopback(
        &self,
        port: u16,
        path: &str,
        cookie: Option<&str>,
    ) -> OptimizeResult<Bytes> {
        let url = format!("http://localhost:{port}{path}");
        debug!(url = %url, forwards_cookie = cookie.is_some(), "Fetching loopback source");

        let mut request = self.client.get(&url);
        if let Some(cookie) = cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| OptimizeError::load(format!("Request failed: {e}")))?;
        Self::read_success_body(response).await
    }
}
