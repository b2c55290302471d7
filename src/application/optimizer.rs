//! Request orchestration: parse, allow-list, coalesce, compute, respond.

use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, warn};
use url::{Url, form_urlencoded};

use crate::application::dto::{OptimizeRequest, OptimizeResponse};
use crate::application::services::{ParsedRequest, negotiate_format, parse_request};
use crate::domain::entities::{
    LoadContext, OutputFormat, RequestKey, SourceRecord, VariantOutcome,
};
use crate::domain::errors::{OptimizeError, OptimizeResult};
use crate::domain::ports::{AssetLoaderPort, ImageCodecPort, SourceTransportPort};
use crate::infrastructure::cache::{PendingTable, SharedComputation, SourceCache};
use crate::infrastructure::config::OptimizerConfig;

/// On-demand image variant optimizer.
///
/// One instance owns the source cache and the pending-request table; request
/// handlers share it by cloning (all state is behind [`Arc`]s). Two
/// coalescing layers hold at once: identical `(src, size, format, quality)`
/// requests join one in-flight computation here, and different variants of
/// one source share a single load+decode inside the source record.
#[derive(Clone)]
pub struct Optimizer {
    config: Arc<OptimizerConfig>,
    cache: Arc<SourceCache>,
    pending: Arc<PendingTable<OptimizeResponse>>,
    codec: Arc<dyn ImageCodecPort>,
    transport: Arc<dyn SourceTransportPort>,
    loader: Option<Arc<dyn AssetLoaderPort>>,
}

impl Optimizer {
    /// Creates an optimizer over the given codec and transport.
    #[must_use]
    pub fn new(
        config: OptimizerConfig,
        codec: Arc<dyn ImageCodecPort>,
        transport: Arc<dyn SourceTransportPort>,
    ) -> Self {
        let cache = Arc::new(SourceCache::with_grace(
            config.cache_size_bytes(),
            config.grace_window(),
        ));
        Self {
            config: Arc::new(config),
            cache,
            pending: Arc::new(PendingTable::new()),
            codec,
            transport,
            loader: None,
        }
    }

    /// Sets the default loader for local sources.
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn AssetLoaderPort>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Number of sources currently cached.
    #[must_use]
    pub fn cached_sources(&self) -> usize {
        self.cache.len()
    }

    /// Estimated cache size in bytes.
    #[must_use]
    pub fn cache_bytes(&self) -> u64 {
        self.cache.total_bytes()
    }

    /// Number of coalesced computations currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Handles one optimize request end to end.
    ///
    /// Never fails: every error maps onto a `400` response, with detail kept
    /// to the logs. A request for a width above the source's intrinsic width
    /// yields a `302` pointing at the corrected size.
    pub async fn optimize(&self, request: OptimizeRequest) -> OptimizeResponse {
        let OptimizeRequest {
            target,
            headers,
            loader,
        } = request;

        let parsed = match parse_request(&target) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(url = %target, error = %err, "Rejected unparseable request");
                return OptimizeResponse::bad_request_empty();
            }
        };

        if let Err(err) = self.check_domain(&parsed.src) {
            return match err {
                OptimizeError::DomainNotAllowed { host } => {
                    warn!(src = %parsed.src, host = %host, "Rejected source by domain policy");
                    OptimizeResponse::bad_request(format!("Domain not allowed: {host}"))
                }
                other => {
                    debug!(src = %parsed.src, error = %other, "Rejected malformed source");
                    OptimizeResponse::bad_request_empty()
                }
            };
        }

        let Some(preference) = negotiate_format(&self.config.formats, headers.accept()) else {
            warn!("No output formats configured");
            return OptimizeResponse::bad_request("Bad request");
        };
        let quality = parsed.quality.unwrap_or(preference.quality);
        let key = RequestKey::new(parsed.src.as_str(), parsed.size, preference.format, quality);

        let ctx = LoadContext::new(Arc::clone(&self.transport))
            .with_loader(loader.or_else(|| self.loader.clone()))
            .with_fallback_port(
                parsed
                    .port
                    .or_else(|| headers.host().and_then(host_port))
                    .or(self.config.fallback_port),
            )
            .with_cookie(headers.cookie().map(ToOwned::to_owned));

        let (task, started) = self.pending.join_or_start(&key, || {
            self.start_compute(key.clone(), parsed, preference.format, quality, ctx)
        });
        if !started {
            debug!(key = %key, "Joined in-flight request");
        }
        task.await
    }

    /// Spawns the computation for one dedup key.
    ///
    /// The task runs detached so joiners still observe the outcome if the
    /// originating caller goes away, and it clears its own pending entry the
    /// moment the outcome settles.
    fn start_compute(
        &self,
        key: RequestKey,
        parsed: ParsedRequest,
        format: OutputFormat,
        quality: u8,
        ctx: LoadContext,
    ) -> SharedComputation<OptimizeResponse> {
        let this = self.clone();
        let pending = Arc::clone(&self.pending);
        let cleanup_key = key.clone();

        let handle = tokio::spawn(async move {
            let response = this.compute(&parsed, format, quality, ctx).await;
            this.pending.remove(&key);
            response
        });

        handle
            .map(move |joined| {
                joined.unwrap_or_else(|err| {
                    pending.remove(&cleanup_key);
                    warn!(error = %err, "Variant computation task failed");
                    OptimizeResponse::bad_request("Bad request")
                })
            })
            .boxed()
            .shared()
    }

    async fn compute(
        &self,
        parsed: &ParsedRequest,
        format: OutputFormat,
        quality: u8,
        ctx: LoadContext,
    ) -> OptimizeResponse {
        match self.compute_variant(parsed, format, quality, ctx).await {
            Ok(VariantOutcome::Ready(body)) => {
                self.cache.sweep();
                OptimizeResponse::ok(body, format)
            }
            Ok(VariantOutcome::Redirect { width }) => {
                debug!(
                    src = %parsed.src,
                    requested = parsed.size,
                    corrected = width,
                    "Redirecting to intrinsic width"
                );
                OptimizeResponse::redirect(redirect_location(parsed, width))
            }
            Err(err) => {
                warn!(src = %parsed.src, size = parsed.size, error = %err, "Variant request failed");
                OptimizeResponse::bad_request("Bad request")
            }
        }
    }

    async fn compute_variant(
        &self,
        parsed: &ParsedRequest,
        format: OutputFormat,
        quality: u8,
        ctx: LoadContext,
    ) -> OptimizeResult<VariantOutcome> {
        // Inserting before initialization makes the record visible to
        // concurrent lookups, which then coalesce on its memoized init.
        let record = self.cache.get_or_insert_with(&parsed.src, || {
            Arc::new(SourceRecord::new(
                parsed.src.as_str(),
                &self.config.sizes,
                Arc::clone(&self.codec),
            ))
        });

        record.initialize(ctx).await?;
        record.variant(parsed.size, format, quality).await
    }

    fn check_domain(&self, src: &str) -> OptimizeResult<()> {
        if src.starts_with('/') {
            return Ok(());
        }
        let url = Url::parse(src)
            .map_err(|e| OptimizeError::bad_request(format!("Invalid source URL: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| OptimizeError::bad_request("Source URL has no host"))?;
        if self.config.domains.allows(host) {
            Ok(())
        } else {
            Err(OptimizeError::domain_not_allowed(host))
        }
    }
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("config", &self.config)
            .field("cached_sources", &self.cache.len())
            .field("in_flight", &self.pending.len())
            .finish_non_exhaustive()
    }
}

fn host_port(host: &str) -> Option<u16> {
    host.rsplit_once(':').and_then(|(_, port)| port.parse().ok())
}

/// Location for the redirect-to-corrected-size outcome: the same endpoint,
/// same source, size replaced by the intrinsic width.
fn redirect_location(parsed: &ParsedRequest, width: u32) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("src", &parsed.src);
    query.append_pair("size", &width.to_string());
    if let Some(quality) = parsed.quality {
        query.append_pair("quality", &quality.to_string());
    }
    format!("{}?{}", parsed.path, query.finish())
}
