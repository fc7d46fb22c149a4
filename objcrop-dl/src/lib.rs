//! Object-crop dataset loading toolkit.

mod common;
pub mod coco;
pub mod dataset;
pub mod processor;
