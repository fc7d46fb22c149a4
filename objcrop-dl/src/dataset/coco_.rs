use super::*;
use crate::{
    coco::{Annotation, InstanceIndex},
    common::*,
    processor::{BoxCropper, BoxCropperInit, TransformPipeline},
};

/// The COCO/ADE20k object-crop dataset.
///
/// One record per object annotation, so an image with N annotated objects
/// yields N records. Raw category IDs are relabeled to a contiguous
/// 1-based space in ascending ID order.
#[derive(Debug)]
pub struct CocoDataset {
    index: InstanceIndex,
    image_dir: PathBuf,
    ids: Vec<usize>,
    classes: IndexSet<String>,
    category_to_class: IndexMap<usize, usize>,
    class_to_category: IndexMap<usize, usize>,
    cropper: BoxCropper,
    transform: TransformPipeline,
}

impl GenericDataset for CocoDataset {
    fn input_channels(&self) -> usize {
        3
    }

    fn classes(&self) -> &IndexSet<String> {
        &self.classes
    }
}

impl RandomAccessDataset for CocoDataset {
    fn num_records(&self) -> usize {
        self.ids.len()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        let annotation = self.annotation(index)?;
        let class = self
            .class_for_category(annotation.category_id)
            .ok_or_else(|| {
                format_err!(
                    "annotation {} has category id {} which is not in the category mapping",
                    annotation.id,
                    annotation.category_id
                )
            })?;
        let image_meta = self.index.image(annotation.image_id)?;

        let path = self.image_dir.join(&image_meta.file_name);
        let image = image::open(&path)
            .with_context(|| format!("failed to load image file {}", path.display()))?
            .to_rgb8();

        let cropped = self.cropper.forward(image_to_array(image).view(), annotation.bbox);
        let image = self.transform.forward(array_to_image(cropped)?);

        Ok(DataRecord {
            image,
            class: class as i64,
            index,
        })
    }
}

impl CocoDataset {
    pub fn load(
        image_dir: impl AsRef<Path>,
        ann_file: impl AsRef<Path>,
        margin: R64,
        transform: TransformPipeline,
    ) -> Result<Self> {
        let index = InstanceIndex::load(ann_file)?;
        Self::new(index, image_dir, margin, transform)
    }

    pub fn new(
        index: InstanceIndex,
        image_dir: impl AsRef<Path>,
        margin: R64,
        transform: TransformPipeline,
    ) -> Result<Self> {
        let image_dir = image_dir.as_ref();
        let ids: Vec<_> = index.annotation_ids().collect();

        // position i in ascending category ID order becomes label i + 1
        let category_to_class: IndexMap<_, _> = index
            .category_ids()
            .enumerate()
            .map(|(position, category_id)| (category_id, position + 1))
            .collect();
        let class_to_category: IndexMap<_, _> = category_to_class
            .iter()
            .map(|(&category_id, &class)| (class, category_id))
            .collect();
        let classes: IndexSet<_> = category_to_class
            .keys()
            .map(|&category_id| -> Result<_> {
                Ok(index.category(category_id)?.name.clone())
            })
            .try_collect()?;

        // sanity check
        {
            let unmapped = ids
                .iter()
                .filter(|&&id| {
                    index
                        .annotation(id)
                        .map(|ann| !category_to_class.contains_key(&ann.category_id))
                        .unwrap_or(false)
                })
                .count();
            if unmapped > 0 {
                warn!(
                    "{} annotations reference category ids missing from the category list; \
                     looking them up will fail",
                    unmapped
                );
            }
        }

        let cropper = BoxCropperInit { margin }.build();

        Ok(Self {
            index,
            image_dir: image_dir.to_owned(),
            ids,
            classes,
            category_to_class,
            class_to_category,
            cropper,
            transform,
        })
    }

    /// The annotation behind the record at `index`.
    pub fn annotation(&self, index: usize) -> Result<&Annotation> {
        let ann_id = *self
            .ids
            .get(index)
            .ok_or_else(|| format_err!("invalid index {}", index))?;
        self.index.annotation(ann_id)
    }

    /// Raw (image, annotation, category) metadata for the record at
    /// `index`, bypassing the crop and transform pipeline.
    pub fn info(&self, index: usize) -> Result<InfoRecord<'_>> {
        let annotation = self.annotation(index)?;
        let image = self.index.image(annotation.image_id)?;
        let category = self.index.category(annotation.category_id)?;

        Ok(InfoRecord {
            image,
            annotation,
            category,
        })
    }

    /// Contiguous 1-based label for a raw category ID.
    pub fn class_for_category(&self, category_id: usize) -> Option<usize> {
        self.category_to_class.get(&category_id).copied()
    }

    /// Raw category ID for a contiguous 1-based label.
    pub fn category_for_class(&self, class: usize) -> Option<usize> {
        self.class_to_category.get(&class).copied()
    }

    pub fn index(&self) -> &InstanceIndex {
        &self.index
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    pub fn cropper(&self) -> &BoxCropper {
        &self.cropper
    }
}
