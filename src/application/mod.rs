//! Application layer with the optimizer, its services, and DTOs.

/// Data transfer objects.
pub mod dto;
mod optimizer;
/// Stateless request services.
pub mod services;

pub use dto::{HeaderSource, OptimizeRequest, OptimizeResponse};
pub use optimizer::Optimizer;
pub use services::{DEFAULT_ENDPOINT, SrcSetBuilder};
