use super::*;
use crate::{coco::Annotation, common::*};

pub const MIN_KEYPOINTS_PER_IMAGE: usize = 10;

/// Count keypoints whose visibility flag is positive across a group of
/// annotations.
pub fn count_visible_keypoints<'a>(
    annotations: impl IntoIterator<Item = &'a Annotation>,
) -> usize {
    annotations
        .into_iter()
        .filter_map(|ann| ann.keypoints.as_deref())
        .map(|keypoints| {
            keypoints
                .iter()
                .skip(2)
                .step_by(3)
                .filter(|&&visibility| visibility > 0.0)
                .count()
        })
        .sum()
}

/// Whether every box in the group has some dimension of one pixel or less.
pub fn has_only_empty_bbox<'a>(annotations: impl IntoIterator<Item = &'a Annotation>) -> bool {
    annotations
        .into_iter()
        .all(|ann| ann.bbox[2..].iter().any(|&side| side <= 1.0))
}

/// Whether an image's annotation group is usable.
///
/// A group counts as usable when it is non-empty, not all of its boxes are
/// degenerate, and, for keypoint-annotated categories, it carries at least
/// [`MIN_KEYPOINTS_PER_IMAGE`] visible keypoints.
pub fn has_valid_annotation(annotations: &[&Annotation]) -> bool {
    if annotations.is_empty() {
        return false;
    }
    if has_only_empty_bbox(annotations.iter().copied()) {
        return false;
    }
    if annotations[0].keypoints.is_none() {
        return true;
    }
    count_visible_keypoints(annotations.iter().copied()) >= MIN_KEYPOINTS_PER_IMAGE
}

/// The dataset that drops records of images without a valid annotation
/// group.
///
/// Records keep the wrapped dataset's positions in their `index` field, so
/// [`CocoDataset::info`] stays addressable through them.
#[derive(Debug)]
pub struct SanitizedDataset {
    dataset: CocoDataset,
    indices: Vec<usize>,
}

impl SanitizedDataset {
    pub fn new(dataset: CocoDataset) -> Result<Self> {
        let positions_by_image: IndexMap<usize, Vec<usize>> = (0..dataset.num_records())
            .map(|position| -> Result<_> {
                let annotation = dataset.annotation(position)?;
                Ok((annotation.image_id, position))
            })
            .try_collect::<_, Vec<_>, _>()?
            .into_iter()
            .into_group_map()
            .into_iter()
            .collect();

        let mut indices: Vec<usize> = Vec::new();
        for (_image_id, positions) in &positions_by_image {
            let annotations: Vec<_> = positions
                .iter()
                .map(|&position| dataset.annotation(position))
                .try_collect()?;
            if has_valid_annotation(&annotations) {
                indices.extend(positions.iter().copied());
            }
        }
        indices.sort_unstable();

        let num_filtered = dataset.num_records() - indices.len();
        if num_filtered > 0 {
            warn!(
                "filtered out {} records without a valid annotation group",
                num_filtered
            );
        }

        Ok(Self { dataset, indices })
    }

    pub fn inner(&self) -> &CocoDataset {
        &self.dataset
    }

    /// The wrapped dataset's position behind this dataset's `index`.
    pub fn inner_index(&self, index: usize) -> Option<usize> {
        self.indices.get(index).copied()
    }
}

impl GenericDataset for SanitizedDataset {
    fn input_channels(&self) -> usize {
        self.dataset.input_channels()
    }

    fn classes(&self) -> &IndexSet<String> {
        self.dataset.classes()
    }
}

impl RandomAccessDataset for SanitizedDataset {
    fn num_records(&self) -> usize {
        self.indices.len()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        let inner_index = self
            .inner_index(index)
            .ok_or_else(|| format_err!("invalid index {}", index))?;
        self.dataset.nth(inner_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        coco::{Category, Image, Instances},
        processor::TransformPipelineInit,
    };

    fn annotation(bbox: [f64; 4], keypoints: Option<Vec<f64>>) -> Annotation {
        Annotation {
            id: 0,
            image_id: 0,
            category_id: 1,
            bbox,
            segmentation: None,
            keypoints,
            area: None,
            score: None,
            iscrowd: 0,
        }
    }

    #[test]
    fn empty_group_is_invalid() {
        assert!(!has_valid_annotation(&[]));
    }

    #[test]
    fn all_tiny_boxes_are_invalid() {
        let a = annotation([3.0, 3.0, 1.0, 20.0], None);
        let b = annotation([5.0, 5.0, 0.5, 0.5], None);
        assert!(!has_valid_annotation(&[&a, &b]));

        // one usable box is enough
        let c = annotation([5.0, 5.0, 10.0, 10.0], None);
        assert!(has_valid_annotation(&[&a, &c]));
    }

    #[test]
    fn keypoint_groups_need_ten_visible_keypoints() {
        let visible = vec![1.0, 1.0, 2.0];
        let hidden = vec![1.0, 1.0, 0.0];

        let nine: Vec<f64> = visible
            .iter()
            .cycle()
            .take(3 * 9)
            .copied()
            .chain(hidden.iter().copied())
            .collect();
        let a = annotation([0.0, 0.0, 10.0, 10.0], Some(nine));
        assert!(!has_valid_annotation(&[&a]));

        let ten: Vec<f64> = visible.iter().cycle().take(3 * 10).copied().collect();
        let b = annotation([0.0, 0.0, 10.0, 10.0], Some(ten));
        assert!(has_valid_annotation(&[&b]));
    }

    #[test]
    fn sanitizing_drops_invalid_images_and_keeps_inner_indices() {
        let dir = tempfile::tempdir().unwrap();
        for file_name in ["a.png", "b.png"] {
            image::RgbImage::from_pixel(16, 16, image::Rgb([50, 60, 70]))
                .save(dir.path().join(file_name))
                .unwrap();
        }

        let numbered = |id: usize, image_id: usize, bbox| Annotation {
            id,
            image_id,
            ..annotation(bbox, None)
        };
        let instances = Instances {
            images: vec![
                Image {
                    id: 1,
                    width: 16,
                    height: 16,
                    file_name: "a.png".into(),
                },
                Image {
                    id: 2,
                    width: 16,
                    height: 16,
                    file_name: "b.png".into(),
                },
            ],
            annotations: vec![
                // image 1 carries a usable box
                numbered(10, 1, [2.0, 2.0, 8.0, 8.0]),
                numbered(11, 1, [0.0, 0.0, 1.0, 1.0]),
                // image 2 carries only degenerate boxes
                numbered(12, 2, [3.0, 3.0, 0.5, 4.0]),
            ],
            categories: vec![Category {
                id: 1,
                name: "object".into(),
                supercategory: None,
                keypoints: None,
            }],
        };
        let ann_file = dir.path().join("instances.json");
        std::fs::write(&ann_file, serde_json::to_string(&instances).unwrap()).unwrap();

        let dataset = CocoDataset::load(
            dir.path(),
            &ann_file,
            r64(0.2),
            TransformPipelineInit::default().build(),
        )
        .unwrap();
        assert_eq!(dataset.num_records(), 3);

        let sanitized = SanitizedDataset::new(dataset).unwrap();
        assert_eq!(sanitized.num_records(), 2);
        assert_eq!(sanitized.inner_index(0), Some(0));
        assert_eq!(sanitized.inner_index(1), Some(1));

        // records report the inner dataset's position
        let record = sanitized.nth(1).unwrap();
        assert_eq!(record.index, 1);
        assert_eq!(sanitized.inner().info(record.index).unwrap().annotation.id, 11);
    }

    #[test]
    fn visible_keypoints_sum_over_the_group() {
        let five: Vec<f64> = [1.0, 1.0, 1.0].iter().cycle().take(3 * 5).copied().collect();
        let a = annotation([0.0, 0.0, 10.0, 10.0], Some(five.clone()));
        let b = annotation([2.0, 2.0, 10.0, 10.0], Some(five));
        assert_eq!(count_visible_keypoints([&a, &b]), 10);
        assert!(has_valid_annotation(&[&a, &b]));
    }
}
