//! Domain layer with core entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{
    DEFAULT_SIZE_LADDER, FormatPreference, LoadContext, OutputFormat, RequestKey, SourceRecord,
    VariantKey, VariantOutcome,
};
pub use errors::{OptimizeError, OptimizeResult};
pub use ports::{AssetLoaderPort, ImageCodecPort, SourceTransportPort};
