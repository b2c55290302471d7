//! Codec adapter for decoding sources and encoding delivery formats.

mod image_codec;

pub use image_codec::ImageCodec;
