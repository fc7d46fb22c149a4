//! The fixed-size bilinear resize.

use crate::common::*;
use image::{imageops, imageops::FilterType, RgbImage};

/// Resizes to an exact `(height, width)`, ignoring aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resize {
    pub height: NonZeroUsize,
    pub width: NonZeroUsize,
}

impl Resize {
    pub fn forward(&self, image: RgbImage) -> RgbImage {
        imageops::resize(
            &image,
            self.width.get() as u32,
            self.height.get() as u32,
            FilterType::Triangle,
        )
    }
}
