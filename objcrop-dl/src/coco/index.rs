use super::{Annotation, Category, Image, Instances};
use crate::common::*;

/// Read-only ID-keyed view over a parsed instance file.
///
/// Lookup tables are built once at construction and never mutated, so
/// concurrent reads are safe. Iteration orders follow ascending IDs.
#[derive(Debug, Clone)]
pub struct InstanceIndex {
    annotations: IndexMap<usize, Annotation>,
    images: IndexMap<usize, Image>,
    categories: IndexMap<usize, Category>,
    image_to_annotations: IndexMap<usize, Vec<usize>>,
}

impl InstanceIndex {
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        Self::new(Instances::open(path)?)
    }

    pub fn new(instances: Instances) -> Result<Self> {
        let Instances {
            images,
            annotations,
            categories,
        } = instances;

        let annotations: IndexMap<_, _> = annotations
            .into_iter()
            .map(|ann| (ann.id, ann))
            .sorted_by_key(|(id, _)| *id)
            .collect();
        let images: IndexMap<_, _> = images
            .into_iter()
            .map(|image| (image.id, image))
            .sorted_by_key(|(id, _)| *id)
            .collect();
        let categories: IndexMap<_, _> = categories
            .into_iter()
            .map(|cat| (cat.id, cat))
            .sorted_by_key(|(id, _)| *id)
            .collect();

        let image_to_annotations: IndexMap<usize, Vec<usize>> = annotations
            .values()
            .map(|ann| (ann.image_id, ann.id))
            .into_group_map()
            .into_iter()
            .sorted_by_key(|(image_id, _)| *image_id)
            .collect();

        Ok(Self {
            annotations,
            images,
            categories,
            image_to_annotations,
        })
    }

    /// Annotation IDs in ascending order.
    pub fn annotation_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.annotations.keys().copied()
    }

    /// Category IDs in ascending order.
    pub fn category_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.categories.keys().copied()
    }

    pub fn annotation(&self, id: usize) -> Result<&Annotation> {
        self.annotations
            .get(&id)
            .ok_or_else(|| format_err!("no annotation with id {}", id))
    }

    pub fn image(&self, id: usize) -> Result<&Image> {
        self.images
            .get(&id)
            .ok_or_else(|| format_err!("no image with id {}", id))
    }

    pub fn category(&self, id: usize) -> Result<&Category> {
        self.categories
            .get(&id)
            .ok_or_else(|| format_err!("no category with id {}", id))
    }

    /// IDs of the annotations belonging to an image.
    pub fn image_annotation_ids(&self, image_id: usize) -> &[usize] {
        self.image_to_annotations
            .get(&image_id)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn num_annotations(&self) -> usize {
        self.annotations.len()
    }

    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    pub fn num_categories(&self) -> usize {
        self.categories.len()
    }
}
