//! Image decoding

use image::DynamicImage;
use tracing::debug;

/// Decode collaborator: raw bytes to a decoded image
///
/// Returns `None` for anything that is not a valid image; never fails.
pub trait Decoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Option<DynamicImage>;
}

/// Decoder backed by the `image` crate, format sniffed from the bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl Decoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Option<DynamicImage> {
        match image::load_from_memory(bytes) {
            Ok(image) => Some(image),
            Err(e) => {
                debug!(size = bytes.len(), error = %e, "Payload is not a decodable image");
                None
            }
        }
    }
}
