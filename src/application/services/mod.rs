//! Application services: request parsing, negotiation, URL building.

mod format_negotiator;
mod request_parser;
mod srcset;

pub use format_negotiator::negotiate_format;
pub use request_parser::{ParsedRequest, parse_request};
pub use srcset::{DEFAULT_ENDPOINT, SrcSetBuilder};
