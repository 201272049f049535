//! clickseg-export: Encoders and marker rendering (sans-IO)
//!
//! Turns the rasters produced by `clickseg-core` into files: PNG, JPEG
//! or WebP byte streams, and previews with click markers drawn in.

pub mod encode;
pub mod markers;

pub use encode::{
    DEFAULT_FILENAME, DEFAULT_JPEG_QUALITY, EncodeError, EncodedImage, ImageFormat, encode,
    encode_png,
};
pub use markers::render_markers;
