//! Port definitions for external collaborators.

mod asset_loader_port;
mod codec_port;
mod transport_port;

pub use asset_loader_port::AssetLoaderPort;
pub use codec_port::ImageCodecPort;
pub use transport_port::SourceTransportPort;
