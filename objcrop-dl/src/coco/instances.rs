use super::Segmentation;
use crate::common::*;

/// A parsed COCO-style instance annotation file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instances {
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Instances {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let reader = BufReader::new(
            File::open(path)
                .with_context(|| format!("failed to open annotation file '{}'", path.display()))?,
        );
        let instances: Self = serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse annotation file '{}'", path.display()))?;
        Ok(instances)
    }
}

/// The image metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: usize,
    pub width: usize,
    pub height: usize,
    pub file_name: String,
}

/// One object annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: usize,
    pub image_id: usize,
    pub category_id: usize,
    /// Box in `[x, y, w, h]` pixel units.
    pub bbox: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<Segmentation>,
    /// Flattened `[x, y, visibility]` triples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
    /// Detector confidence, present in prediction files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub iscrowd: usize,
}

impl Annotation {
    /// Decode the segmentation to an `(height, width)` binary mask.
    pub fn decode_mask(&self) -> Result<Array2<u8>> {
        let segmentation = self
            .segmentation
            .as_ref()
            .ok_or_else(|| format_err!("annotation {} has no segmentation", self.id))?;
        segmentation
            .decode()
            .with_context(|| format!("failed to decode mask of annotation {}", self.id))
    }
}

/// The category record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: usize,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
    /// Keypoint names, present on keypoint-annotated categories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keypoints: Option<Vec<String>>,
}
