//! COCO-style annotation index.

mod index;
mod instances;
mod mask;

pub use index::*;
pub use instances::*;
pub use mask::*;
