//! Data transfer objects for the application layer.

mod optimize_request;
mod optimize_response;

pub use optimize_request::{HeaderSource, OptimizeRequest};
pub use optimize_response::OptimizeResponse;
