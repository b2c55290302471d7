//! Domain entity definitions.

mod format;
mod source_record;
mod variant;

pub use format::{FormatPreference, OutputFormat};
pub use source_record::{LoadContext, SourceRecord};
pub use variant::{DEFAULT_SIZE_LADDER, RequestKey, VariantKey, VariantOutcome};

pub(crate) use source_record::now_millis;
