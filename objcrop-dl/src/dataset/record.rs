use crate::{
    coco::{Annotation, Category, Image},
    common::*,
};

/// The record produced by one annotation lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    /// Processed image in `(channel, height, width)` layout, scaled to
    /// `[0, 1]`.
    pub image: Array3<f32>,
    /// Contiguous 1-based category label.
    pub class: i64,
    /// The dataset position the record was looked up at.
    pub index: usize,
}

/// The raw metadata behind a record, bypassing the crop and transform
/// pipeline.
#[derive(Debug, Clone, Copy)]
pub struct InfoRecord<'a> {
    pub image: &'a Image,
    pub annotation: &'a Annotation,
    pub category: &'a Category,
}
