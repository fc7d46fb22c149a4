//! Transform pipeline composition.

use super::{RandomHorizontalFlip, Resize};
use crate::common::*;
use image::RgbImage;

/// One configurable image-space transform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransformStep {
    Resize(Resize),
    RandomHorizontalFlip(RandomHorizontalFlip),
}

impl TransformStep {
    pub fn forward(&self, image: RgbImage) -> RgbImage {
        match self {
            Self::Resize(resize) => resize.forward(image),
            Self::RandomHorizontalFlip(flip) => flip.forward(image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformPipelineInit {
    pub steps: Vec<TransformStep>,
}

impl TransformPipelineInit {
    pub fn build(self) -> TransformPipeline {
        let Self { steps } = self;
        TransformPipeline { steps }
    }
}

/// Applies the configured steps in order, then converts to a
/// channels-first tensor. An empty pipeline is just the conversion.
#[derive(Debug, Clone)]
pub struct TransformPipeline {
    steps: Vec<TransformStep>,
}

impl TransformPipeline {
    pub fn forward(&self, image: RgbImage) -> Array3<f32> {
        let image = self
            .steps
            .iter()
            .fold(image, |image, step| step.forward(image));
        to_tensor(&image)
    }
}

/// Convert to `(3, height, width)` f32 scaled to `[0, 1]`.
pub fn to_tensor(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array3::zeros((3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        for (channel, &value) in pixel.0.iter().enumerate() {
            tensor[[channel, y as usize, x as usize]] = value as f32 / 255.0;
        }
    }
    tensor
}
