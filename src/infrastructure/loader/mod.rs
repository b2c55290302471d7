//! Source loading adapters: filesystem assets and HTTP transport.

mod fs_loader;
mod http_transport;

pub use fs_loader::FsAssetLoader;
pub use http_transport::HttpSourceTransport;
