//! Image decoding and resizing

pub mod decode;
pub mod resize;

pub use decode::{Decoder, ImageCrateDecoder};
pub use resize::{fitted_dimensions, resize, resize_offloaded};
