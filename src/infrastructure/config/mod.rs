//! Configuration types and parsing.

mod optimizer_config;

pub use optimizer_config::{DomainPolicy, OptimizerConfig};
