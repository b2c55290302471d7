//! Optimization pipeline error types.

use thiserror::Error;

/// Result type for optimization operations.
pub type OptimizeResult<T> = std::result::Result<T, OptimizeError>;

/// Errors raised while resolving a variant request.
///
/// Clone-able on purpose: a single failure fans out to every caller that
/// coalesced onto the same in-flight computation.
#[derive(Debug, Clone, Error)]
pub enum OptimizeError {
    /// Missing or unparsable request parameters.
    #[error("bad request: {reason}")]
    BadRequest {
        /// What was wrong with the request.
        reason: String,
    },

    /// Remote source host rejected by the domain policy.
    #[error("domain not allowed: {host}")]
    DomainNotAllowed {
        /// The rejected hostname.
        host: String,
    },

    /// Requested width is neither on the ladder nor the intrinsic width.
    #[error("size {size} is not an allowed target")]
    SizeNotAllowed {
        /// The rejected width in pixels.
        size: u32,
    },

    /// A variant was requested before `initialize` was called.
    #[error("source not initialized: {src}")]
    NotInitialized {
        /// The source identifier.
        src: String,
    },

    /// Fetching the source bytes failed.
    #[error("failed to load source: {message}")]
    Load {
        /// Loader or transport detail.
        message: String,
    },

    /// The source bytes are not a decodable image.
    #[error("failed to decode source: {message}")]
    Decode {
        /// Codec detail.
        message: String,
    },

    /// Resizing or re-encoding failed.
    #[error("failed to encode variant: {message}")]
    Encode {
        /// Codec detail.
        message: String,
    },
}

impl OptimizeError {
    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
        }
    }

    /// Creates a domain rejection error.
    #[must_use]
    pub fn domain_not_allowed(host: impl Into<String>) -> Self {
        Self::DomainNotAllowed { host: host.into() }
    }

    /// Creates a size rejection error.
    #[must_use]
    pub const fn size_not_allowed(size: u32) -> Self {
        Self::SizeNotAllowed { size }
    }

    /// Creates a not-initialized error.
    #[must_use]
    pub fn not_initialized(src: impl Into<String>) -> Self {
        Self::NotInitialized { src: src.into() }
    }

    /// Creates a load error.
    #[must_use]
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates an encode error.
    #[must_use]
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    /// Returns whether the error was caused by the request itself rather
    /// than a collaborator failure.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest { .. }
                | Self::DomainNotAllowed { .. }
                | Self::SizeNotAllowed { .. }
                | Self::NotInitialized { .. }
        )
    }

    /// Returns whether the error came from a loader, transport, or codec.
    #[must_use]
    pub const fn is_collaborator_error(&self) -> bool {
        matches!(
            self,
            Self::Load { .. } | Self::Decode { .. } | Self::Encode { .. }
        )
    }
}
