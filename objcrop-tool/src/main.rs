mod config;

use anyhow::{ensure, Context, Result};
use config::Config;
use image::RgbImage;
use indexmap::IndexMap;
use log::{info, warn};
use ndarray::Array3;
use objcrop_dl::dataset::{
    array_to_image, image_to_array, CocoDataset, GenericDataset, InfoRecord, RandomAccessDataset,
    SanitizedDataset,
};
use prettytable::{cell, row, Table};
use std::{
    collections::HashSet,
    fs,
    io::{self, BufRead as _, Write as _},
    path::{Path, PathBuf},
};
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Browse and check object-crop datasets
struct Args {
    #[structopt(long, default_value = "objcrop.json5")]
    /// configuration file
    config_file: PathBuf,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, StructOpt)]
enum Command {
    /// Walk dataset records and dump the cropped images
    Browse(BrowseOpts),
    /// Verify image files and summarize categories
    Check(CheckOpts),
}

#[derive(Debug, Clone, StructOpt)]
struct BrowseOpts {
    #[structopt(long)]
    /// dataset name from the config
    dataset: String,
    #[structopt(long, default_value = "out")]
    /// directory the crops are written into
    output_dir: PathBuf,
    #[structopt(long, default_value = "0")]
    /// first record position to visit
    start: usize,
    #[structopt(long)]
    /// maximum number of records to visit
    limit: Option<usize>,
    #[structopt(long)]
    /// use the training transform pipeline
    train: bool,
    #[structopt(long)]
    /// drop records without a valid annotation group
    sanitize: bool,
    #[structopt(long)]
    /// additionally write raw crops with out-of-mask pixels dimmed
    overlay_mask: bool,
    #[structopt(long)]
    /// do not wait for Enter between records
    no_pause: bool,
}

#[derive(Debug, Clone, StructOpt)]
struct CheckOpts {
    #[structopt(long)]
    /// dataset name from the config
    dataset: String,
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let Args {
        config_file,
        command,
    } = Args::from_args();
    let config = Config::open(&config_file)
        .with_context(|| format!("failed to load config file '{}'", config_file.display()))?;

    match command {
        Command::Browse(opts) => browse(&config, opts),
        Command::Check(opts) => check(&config, opts),
    }
}

fn load_dataset(config: &Config, name: &str, train: bool) -> Result<CocoDataset> {
    let paths = config.dataset_paths(name)?;
    let transforms = if train {
        config.preprocessor.train_transforms.clone()
    } else {
        config.preprocessor.eval_transforms.clone()
    };

    CocoDataset::load(
        &paths.image_dir,
        &paths.ann_file,
        config.preprocessor.margin,
        transforms.build(),
    )
}

fn browse(config: &Config, opts: BrowseOpts) -> Result<()> {
    let BrowseOpts {
        dataset,
        output_dir,
        start,
        limit,
        train,
        sanitize,
        overlay_mask,
        no_pause,
    } = opts;

    let coco = load_dataset(config, &dataset, train)?;
    info!("dataset size: {}", coco.num_records());
    fs::create_dir_all(&output_dir)?;

    if sanitize {
        let sanitized = SanitizedDataset::new(coco)?;
        info!("{} records after sanitizing", sanitized.num_records());
        walk(
            &sanitized,
            sanitized.inner(),
            &output_dir,
            start,
            limit,
            overlay_mask,
            no_pause,
        )
    } else {
        walk(
            &coco,
            &coco,
            &output_dir,
            start,
            limit,
            overlay_mask,
            no_pause,
        )
    }
}

fn walk<D>(
    dataset: &D,
    coco: &CocoDataset,
    output_dir: &Path,
    start: usize,
    limit: Option<usize>,
    overlay_mask: bool,
    no_pause: bool,
) -> Result<()>
where
    D: RandomAccessDataset,
{
    let end = limit
        .map(|limit| (start + limit).min(dataset.num_records()))
        .unwrap_or_else(|| dataset.num_records());

    let stdin = io::stdin();
    for position in start..end {
        let record = dataset.nth(position)?;
        let InfoRecord {
            image,
            annotation,
            category,
        } = coco.info(record.index)?;

        println!("index: {}", record.index);
        println!("shape: {:?}", record.image.dim());
        println!("class: {} ({})", record.class, category.name);
        println!(
            "image: {} ({}x{}), bbox: {:?}",
            image.file_name, image.width, image.height, annotation.bbox
        );

        let crop_file = output_dir.join(format!("{:06}.png", record.index));
        tensor_to_image(&record.image)?.save(&crop_file)?;
        println!("crop: {}", crop_file.display());

        if overlay_mask {
            match write_mask_overlay(coco, record.index, output_dir) {
                Ok(Some(path)) => println!("overlay: {}", path.display()),
                Ok(None) => {}
                Err(err) => warn!(
                    "cannot write mask overlay for annotation {}: {:#}",
                    annotation.id, err
                ),
            }
        }

        if !no_pause {
            print!("Press Enter to continue...");
            io::stdout().flush()?;
            stdin.lock().read_line(&mut String::new())?;
        }
    }

    Ok(())
}

/// Write the raw crop with pixels outside the segmentation mask dimmed,
/// the way the mask channel is visualized during debugging.
fn write_mask_overlay(
    coco: &CocoDataset,
    index: usize,
    output_dir: &Path,
) -> Result<Option<PathBuf>> {
    let InfoRecord {
        image, annotation, ..
    } = coco.info(index)?;
    let segmentation = match &annotation.segmentation {
        Some(segmentation) => segmentation,
        None => return Ok(None),
    };
    let mask = segmentation.decode()?;

    let path = coco.image_dir().join(&image.file_name);
    let pixels = image_to_array(image::open(&path)?.to_rgb8());
    let mut crop = coco.cropper().forward(pixels.view(), annotation.bbox);
    let mask_crop = coco.cropper().forward_mask(mask.view(), annotation.bbox);

    for ((row, col, _channel), value) in crop.indexed_iter_mut() {
        if mask_crop[[row, col]] == 0 {
            *value = (*value as f32 * 0.3) as u8;
        }
    }

    let overlay_file = output_dir.join(format!("{:06}_overlay.png", index));
    array_to_image(crop)?.save(&overlay_file)?;
    Ok(Some(overlay_file))
}

fn check(config: &Config, opts: CheckOpts) -> Result<()> {
    let CheckOpts { dataset } = opts;
    let coco = load_dataset(config, &dataset, false)?;

    let mut category_counts: IndexMap<&str, usize> = IndexMap::new();
    let mut checked_images = HashSet::new();
    let mut num_unmapped = 0;
    let mut num_missing = 0;
    let mut num_mismatched = 0;

    for position in 0..coco.num_records() {
        let info = match coco.info(position) {
            Ok(info) => info,
            Err(err) => {
                warn!("record {}: {:#}", position, err);
                num_unmapped += 1;
                continue;
            }
        };
        *category_counts
            .entry(info.category.name.as_str())
            .or_default() += 1;

        // probe each image file once
        if checked_images.insert(info.image.id) {
            let path = coco.image_dir().join(&info.image.file_name);
            if !path.is_file() {
                warn!("missing image file '{}'", path.display());
                num_missing += 1;
                continue;
            }

            match imagesize::size(&path) {
                Ok(size) => {
                    if size.width != info.image.width || size.height != info.image.height {
                        warn!(
                            "image '{}' is {}x{} on disk but {}x{} in the annotation file",
                            path.display(),
                            size.width,
                            size.height,
                            info.image.width,
                            info.image.height
                        );
                        num_mismatched += 1;
                    }
                }
                Err(err) => {
                    warn!("cannot probe image '{}': {}", path.display(), err);
                    num_mismatched += 1;
                }
            }
        }
    }

    // per-category record counts
    {
        let mut table = Table::new();
        table.add_row(row!["label", "category id", "name", "records"]);

        coco.classes()
            .iter()
            .enumerate()
            .for_each(|(position, name)| {
                let class = position + 1;
                let category_id = coco.category_for_class(class).unwrap();
                let count = category_counts.get(name.as_str()).copied().unwrap_or(0);
                table.add_row(row![class, category_id, name, count]);
            });

        table.printstd();
    }

    println!("records: {}", coco.num_records());
    println!(
        "images: {} ({} missing, {} size-mismatched)",
        coco.index().num_images(),
        num_missing,
        num_mismatched
    );
    if num_unmapped > 0 {
        println!("records with unmapped categories: {}", num_unmapped);
    }

    Ok(())
}

/// Undo the to-tensor conversion for dumping: `(3, h, w)` floats back to
/// 8-bit RGB.
fn tensor_to_image(tensor: &Array3<f32>) -> Result<RgbImage> {
    let (channels, height, width) = tensor.dim();
    ensure!(
        channels == 3,
        "expected 3 channels, but the tensor has {}",
        channels
    );

    Ok(RgbImage::from_fn(width as u32, height as u32, |x, y| {
        let pixel = [0, 1, 2].map(|channel| {
            (tensor[[channel, y as usize, x as usize]] * 255.0).clamp(0.0, 255.0) as u8
        });
        image::Rgb(pixel)
    }))
}
