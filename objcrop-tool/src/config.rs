//! Dataset browsing configuration format.

use anyhow::{format_err, Result};
use indexmap::IndexMap;
use noisy_float::prelude::*;
use objcrop_dl::processor::TransformPipelineInit;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Component, Path, PathBuf},
};

/// The tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory prefixed to bare relative dataset paths.
    pub data_dir: PathBuf,
    /// The named dataset path table.
    pub datasets: IndexMap<String, DatasetPaths>,
    pub preprocessor: PreprocessorConfig,
}

/// Where a dataset's images and annotation file live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetPaths {
    pub image_dir: PathBuf,
    pub ann_file: PathBuf,
}

/// Crop and transform options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    /// Box margin as a fraction of the mean box side.
    pub margin: R64,
    pub train_transforms: TransformPipelineInit,
    pub eval_transforms: TransformPipelineInit,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    /// Look up a dataset entry and resolve its paths against `data_dir`.
    pub fn dataset_paths(&self, name: &str) -> Result<DatasetPaths> {
        let paths = self
            .datasets
            .get(name)
            .ok_or_else(|| format_err!("no dataset named '{}' in the config", name))?;

        Ok(DatasetPaths {
            image_dir: resolve(&self.data_dir, &paths.image_dir),
            ann_file: resolve(&self.data_dir, &paths.ann_file),
        })
    }
}

/// Absolute and `.`-prefixed paths are taken verbatim; bare relative paths
/// live under the data directory.
fn resolve(data_dir: &Path, path: &Path) -> PathBuf {
    match path.components().next() {
        Some(Component::CurDir | Component::ParentDir) => path.to_owned(),
        _ if path.is_absolute() => path.to_owned(),
        _ => data_dir.join(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_relative_paths_join_the_data_dir() {
        let data_dir = Path::new("data");
        assert_eq!(
            resolve(data_dir, Path::new("ade20k/images")),
            Path::new("data/ade20k/images")
        );
        assert_eq!(
            resolve(data_dir, Path::new("/data/vision/ade20k")),
            Path::new("/data/vision/ade20k")
        );
        assert_eq!(
            resolve(data_dir, Path::new("./local/images")),
            Path::new("./local/images")
        );
        assert_eq!(
            resolve(data_dir, Path::new("../elsewhere")),
            Path::new("../elsewhere")
        );
    }

    #[test]
    fn config_parses_from_json5() {
        let config: Config = json5::from_str(
            r#"{
                data_dir: "data",
                datasets: {
                    ade20k_val: {
                        image_dir: "ade20k/images",
                        ann_file: "ade20k/annotations/instances_val.json",
                    },
                },
                preprocessor: {
                    margin: 0.2,
                    train_transforms: [
                        { type: "Resize", height: 256, width: 256 },
                        { type: "RandomHorizontalFlip", p: 0.5 },
                    ],
                    eval_transforms: [
                        { type: "Resize", height: 256, width: 256 },
                    ],
                },
            }"#,
        )
        .unwrap();

        assert_eq!(config.preprocessor.margin, r64(0.2));
        assert_eq!(config.preprocessor.train_transforms.steps.len(), 2);
        assert_eq!(config.preprocessor.eval_transforms.steps.len(), 1);

        let paths = config.dataset_paths("ade20k_val").unwrap();
        assert_eq!(paths.image_dir, Path::new("data/ade20k/images"));
        assert!(config.dataset_paths("coco_2017_val").is_err());
    }
}
