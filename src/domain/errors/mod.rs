//! Domain error types.

mod optimize_error;

pub use optimize_error::{OptimizeError, OptimizeResult};
