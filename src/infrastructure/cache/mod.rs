//! In-memory caching: the source cache and the pending-request table.

mod pending;
mod source_cache;

pub use pending::{PendingTable, SharedComputation};
pub use source_cache::{DEFAULT_GRACE_WINDOW, SourceCache};
