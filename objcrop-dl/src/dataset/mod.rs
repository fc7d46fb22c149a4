//! Dataset adapter toolkit.

mod coco_;
mod dataset_;
mod record;
mod sanitized;
mod utils;

pub use coco_::*;
pub use dataset_::*;
pub use record::*;
pub use sanitized::*;
pub use utils::*;
