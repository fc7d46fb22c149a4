//! The random horizontal flip.

use crate::common::*;
use image::{imageops, RgbImage};

/// Flips the image left-to-right with probability `p`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RandomHorizontalFlip {
    pub p: R64,
}

impl Default for RandomHorizontalFlip {
    fn default() -> Self {
        Self { p: r64(0.5) }
    }
}

impl RandomHorizontalFlip {
    pub fn forward(&self, image: RgbImage) -> RgbImage {
        let mut rng = StdRng::from_entropy();
        if rng.gen::<f64>() < self.p.raw() {
            imageops::flip_horizontal(&image)
        } else {
            image
        }
    }
}
