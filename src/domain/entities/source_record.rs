//! Per-source record: memoized load+decode and the variant store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::domain::entities::{OutputFormat, VariantKey, VariantOutcome};
use crate::domain::errors::{OptimizeError, OptimizeResult};
use crate::domain::ports::{AssetLoaderPort, ImageCodecPort, SourceTransportPort};

/// Milliseconds since the Unix epoch, the recency unit for eviction.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Everything needed to resolve a source into bytes during initialization.
///
/// Built per request by the optimizer: the loader may come from the request
/// or from configuration, the port from the request URL or configuration.
#[derive(Clone)]
pub struct LoadContext {
    /// Pluggable local asset loader, when one is available.
    pub loader: Option<Arc<dyn AssetLoaderPort>>,
    /// HTTP transport for remote sources and the loopback fallback.
    pub transport: Arc<dyn SourceTransportPort>,
    /// Port for the same-origin loopback fallback.
    pub fallback_port: Option<u16>,
    /// Cookie header to forward on loopback fetches.
    pub cookie: Option<String>,
}

impl LoadContext {
    /// Creates a context with only a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn SourceTransportPort>) -> Self {
        Self {
            loader: None,
            transport,
            fallback_port: None,
            cookie: None,
        }
    }

    /// Sets the local asset loader.
    #[must_use]
    pub fn with_loader(mut self, loader: Option<Arc<dyn AssetLoaderPort>>) -> Self {
        self.loader = loader;
        self
    }

    /// Sets the loopback fallback port.
    #[must_use]
    pub const fn with_fallback_port(mut self, port: Option<u16>) -> Self {
        self.fallback_port = port;
        self
    }

    /// Sets the cookie to forward on loopback fetches.
    #[must_use]
    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        self.cookie = cookie;
        self
    }
}

impl std::fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("has_loader", &self.loader.is_some())
            .field("fallback_port", &self.fallback_port)
            .field("has_cookie", &self.cookie.is_some())
            .finish_non_exhaustive()
    }
}

/// Immutable outcome of a successful initialization.
struct DecodedSource {
    raw: Bytes,
    image: Arc<image::DynamicImage>,
    intrinsic_width: u32,
    allowed_sizes: HashSet<u32>,
}

type InitFuture = Shared<BoxFuture<'static, OptimizeResult<Arc<DecodedSource>>>>;

enum InitState {
    NotStarted,
    InFlight { attempt: u64, task: InitFuture },
    Ready(Arc<DecodedSource>),
}

/// One logical source image: raw bytes loaded once, decoded once, plus a
/// grow-only store of encoded variants.
///
/// Initialization is memoized: every concurrent caller awaits the same
/// attempt, so the loader and decoder run once per attempt no matter how
/// many requests pile up. A failed attempt resets the record so a later
/// request can retry; joiners of the failed attempt all observe its error.
pub struct SourceRecord {
    src: String,
    ladder: Vec<u32>,
    codec: Arc<dyn ImageCodecPort>,
    state: Mutex<InitState>,
    next_attempt: AtomicU64,
    variants: RwLock<HashMap<VariantKey, Bytes>>,
    last_access: AtomicU64,
}

impl SourceRecord {
    /// Creates a record for `src` with the configured size ladder.
    #[must_use]
    pub fn new(src: impl Into<String>, ladder: &[u32], codec: Arc<dyn ImageCodecPort>) -> Self {
        Self {
            src: src.into(),
            ladder: ladder.to_vec(),
            codec,
            state: Mutex::new(InitState::NotStarted),
            next_attempt: AtomicU64::new(0),
            variants: RwLock::new(HashMap::new()),
            last_access: AtomicU64::new(now_millis()),
        }
    }

    /// Returns the source identifier.
    #[must_use]
    pub fn src(&self) -> &str {
        &self.src
    }

    /// Loads and decodes the source, memoized across callers.
    ///
    /// # Errors
    /// Returns [`OptimizeError::Load`] if the bytes cannot be fetched and
    /// [`OptimizeError::Decode`] if they are not a decodable image. Both
    /// reset the record so a later call re-attempts.
    pub async fn initialize(&self, ctx: LoadContext) -> OptimizeResult<()> {
        let (attempt, task) = {
            let mut state = self.state.lock();
            match &*state {
                InitState::Ready(_) => return Ok(()),
                InitState::InFlight { attempt, task } => (*attempt, task.clone()),
                InitState::NotStarted => {
                    let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
                    let task = Self::start_init(
                        self.src.clone(),
                        self.ladder.clone(),
                        self.codec.clone(),
                        ctx,
                    );
                    *state = InitState::InFlight {
                        attempt,
                        task: task.clone(),
                    };
                    (attempt, task)
                }
            }
        };

        match task.await {
            Ok(decoded) => {
                let mut state = self.state.lock();
                if !matches!(&*state, InitState::Ready(_)) {
                    *state = InitState::Ready(decoded);
                }
                Ok(())
            }
            Err(err) => {
                let mut state = self.state.lock();
                if matches!(&*state, InitState::InFlight { attempt: a, .. } if *a == attempt) {
                    *state = InitState::NotStarted;
                }
                Err(err)
            }
        }
    }

    /// Builds the shared initialization future for one attempt.
    fn start_init(
        src: String,
        ladder: Vec<u32>,
        codec: Arc<dyn ImageCodecPort>,
        ctx: LoadContext,
    ) -> InitFuture {
        async move {
            let raw = load_source_bytes(&src, &ctx).await?;
            let image = codec.decode(raw.clone()).await?;
            let intrinsic_width = image.width();
            let mut allowed_sizes: HashSet<u32> = ladder.iter().copied().collect();
            allowed_sizes.insert(intrinsic_width);
            debug!(
                src = %src,
                bytes = raw.len(),
                width = intrinsic_width,
                "Source initialized"
            );
            Ok(Arc::new(DecodedSource {
                raw,
                image,
                intrinsic_width,
                allowed_sizes,
            }))
        }
        .boxed()
        .shared()
    }

    /// Returns the variant for `(size, format)`, computing and storing it on
    /// first request.
    ///
    /// # Errors
    /// Returns [`OptimizeError::NotInitialized`] if [`Self::initialize`] was
    /// never called, [`OptimizeError::SizeNotAllowed`] for targets outside
    /// the ladder and intrinsic width, and [`OptimizeError::Encode`] when
    /// the codec fails. A target above the intrinsic width is not an error;
    /// it yields [`VariantOutcome::Redirect`].
    pub async fn variant(
        &self,
        size: u32,
        format: OutputFormat,
        quality: u8,
    ) -> OptimizeResult<VariantOutcome> {
        let key = VariantKey::new(format, size);
        let stored = self.variants.read().get(&key).cloned();
        if let Some(bytes) = stored {
            trace!(src = %self.src, variant = %key, "Variant store hit");
            return Ok(VariantOutcome::Ready(bytes));
        }

        let decoded = self.await_initialized().await?;

        if !decoded.allowed_sizes.contains(&size) {
            return Err(OptimizeError::size_not_allowed(size));
        }

        if size > decoded.intrinsic_width {
            debug!(
                src = %self.src,
                requested = size,
                intrinsic = decoded.intrinsic_width,
                "Refusing upscale, redirecting to intrinsic width"
            );
            return Ok(VariantOutcome::Redirect {
                width: decoded.intrinsic_width,
            });
        }

        let encoded = self
            .codec
            .encode(decoded.image.clone(), size, format, quality)
            .await?;
        debug!(src = %self.src, variant = %key, bytes = encoded.len(), "Variant encoded");

        // Quality is not part of the key; last writer wins for a slot.
        self.variants.write().insert(key, encoded.clone());

        Ok(VariantOutcome::Ready(encoded))
    }

    /// Awaits the memoized initialization outcome without starting one.
    async fn await_initialized(&self) -> OptimizeResult<Arc<DecodedSource>> {
        let task = {
            let state = self.state.lock();
            match &*state {
                InitState::Ready(decoded) => return Ok(decoded.clone()),
                InitState::InFlight { task, .. } => task.clone(),
                InitState::NotStarted => {
                    return Err(OptimizeError::not_initialized(self.src.as_str()));
                }
            }
        };
        task.await
    }

    /// Estimated bytes this record pins in the cache: raw length plus all
    /// stored variants, floored at 1 so pending records are never weightless.
    #[must_use]
    pub fn cache_footprint(&self) -> u64 {
        let raw = match &*self.state.lock() {
            InitState::Ready(decoded) => decoded.raw.len() as u64,
            _ => 0,
        };
        let variants: u64 = self
            .variants
            .read()
            .values()
            .map(|b| b.len() as u64)
            .sum();
        (raw + variants).max(1)
    }

    /// Returns the intrinsic width once initialized.
    #[must_use]
    pub fn intrinsic_width(&self) -> Option<u32> {
        match &*self.state.lock() {
            InitState::Ready(decoded) => Some(decoded.intrinsic_width),
            _ => None,
        }
    }

    /// Returns true once initialization has completed successfully.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        matches!(&*self.state.lock(), InitState::Ready(_))
    }

    /// Number of stored variants.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.variants.read().len()
    }

    /// Bumps the last-access timestamp to now.
    pub(crate) fn touch(&self) {
        self.last_access.store(now_millis(), Ordering::Relaxed);
    }

    /// Last-access timestamp in epoch milliseconds.
    pub(crate) fn last_access_millis(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SourceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRecord")
            .field("src", &self.src)
            .field("initialized", &self.is_initialized())
            .field("variants", &self.variant_count())
            .finish_non_exhaustive()
    }
}

/// Resolves a source identifier into raw bytes.
///
/// Local sources go through the loader when present, then the loopback
/// fallback when a port is known; remote sources are fetched directly.
async fn load_source_bytes(src: &str, ctx: &LoadContext) -> OptimizeResult<Bytes> {
    if src.starts_with('/') {
        if let Some(loader) = &ctx.loader {
            return loader.load(src).await;
        }
        if let Some(port) = ctx.fallback_port {
            debug!(src = %src, port = port, "Resolving local source via loopback fallback");
            return ctx
                .transport
                .fetch_loopback(port, src, ctx.cookie.as_deref())
                .await;
        }
        return Err(OptimizeError::load(
            "asset loader required for local sources",
        ));
    }
    ctx.transport.fetch_remote(src).await
}
