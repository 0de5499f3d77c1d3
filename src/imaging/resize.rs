//! Aspect-preserving resize
//!
//! The output fits inside the target box: `ratio = min(tw / w, th / h)` is
//! applied to both sides, so nothing is cropped. Dimensions are computed in
//! integer arithmetic and floored, with a one pixel minimum.

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::{trace, warn};

use crate::cache::SharedImage;
use crate::key::TargetSize;

/// Resampling filter used for every resize
const FILTER: FilterType = FilterType::Triangle;

/// Dimensions of `width`×`height` scaled to fit inside `target`
///
/// Returns `None` when either the source or the target has a zero side.
pub fn fitted_dimensions(width: u32, height: u32, target: TargetSize) -> Option<(u32, u32)> {
    if width == 0 || height == 0 || target.is_empty() {
        return None;
    }

    let (w, h) = (u64::from(width), u64::from(height));
    let (tw, th) = (u64::from(target.width), u64::from(target.height));

    // tw/w <= th/h, cross-multiplied
    let (new_w, new_h) = if tw * h <= th * w {
        (tw, h * tw / w)
    } else {
        (w * th / h, th)
    };

    Some((new_w.max(1) as u32, new_h.max(1) as u32))
}

/// Resize an image to fit inside `target`
///
/// An absent source yields an absent result; this never fails.
pub fn resize(image: Option<&DynamicImage>, target: TargetSize) -> Option<DynamicImage> {
    let image = image?;
    let (width, height) = fitted_dimensions(image.width(), image.height(), target)?;

    trace!(
        source_width = image.width(),
        source_height = image.height(),
        width,
        height,
        "Resizing image"
    );

    Some(image.resize_exact(width, height, FILTER))
}

/// Resize on the blocking pool so large images do not stall async workers
pub async fn resize_offloaded(image: Option<SharedImage>, target: TargetSize) -> Option<DynamicImage> {
    let image = image?;
    match tokio::task::spawn_blocking(move || resize(Some(&image), target)).await {
        Ok(resized) => resized,
        Err(e) => {
            warn!(error = %e, "Resize task failed");
            None
        }
    }
}
