use crate::common::*;

/// A segmentation payload attached to an annotation.
///
/// RLE comes in two forms, a compressed character string and raw integer
/// counts. Polygon outlines are carried through parsing but cannot be
/// decoded to a mask here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    Rle(RleMask),
    Polygons(Vec<Vec<f64>>),
}

impl Segmentation {
    /// Decode to an `(height, width)` binary mask.
    pub fn decode(&self) -> Result<Array2<u8>> {
        match self {
            Self::Rle(rle) => rle.decode(),
            Self::Polygons(_) => {
                bail!("polygon segmentation is not run-length encoded")
            }
        }
    }
}

/// A run-length encoded mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RleMask {
    /// Mask size as `[height, width]`.
    pub size: [usize; 2],
    pub counts: RleCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RleCounts {
    Encoded(String),
    Raw(Vec<usize>),
}

impl RleMask {
    /// Expand the runs to an `(height, width)` mask of zeros and ones.
    ///
    /// Runs alternate between background and foreground starting with
    /// background, and fill the mask in column-major order.
    pub fn decode(&self) -> Result<Array2<u8>> {
        let [height, width] = self.size;
        let counts = match &self.counts {
            RleCounts::Raw(counts) => counts.clone(),
            RleCounts::Encoded(text) => decode_counts(text)?,
        };

        let total: usize = counts.iter().sum();
        ensure!(
            total == height * width,
            "run lengths sum to {} but the mask has {}x{} = {} pixels",
            total,
            height,
            width,
            height * width
        );

        let mut buf = Vec::with_capacity(total);
        let mut value = 0u8;
        for &count in &counts {
            buf.resize(buf.len() + count, value);
            value = 1 - value;
        }

        let mask = Array2::from_shape_vec((height, width).f(), buf).unwrap();
        Ok(mask.as_standard_layout().to_owned())
    }
}

/// Decode the compressed count string.
///
/// Each count is stored in 6-bit chunks offset by 48, low chunk first,
/// with bit 5 marking continuation and bit 4 of the last chunk carrying
/// the sign. Every count after the second is a delta against the count
/// two places back.
fn decode_counts(text: &str) -> Result<Vec<usize>> {
    let bytes = text.as_bytes();
    let mut counts: Vec<i64> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let mut x: i64 = 0;
        let mut shift = 0u32;
        loop {
            ensure!(pos < bytes.len(), "truncated RLE count string");
            let chunk = bytes[pos] as i64 - 48;
            ensure!(
                (0..64).contains(&chunk),
                "invalid character {:?} in RLE count string",
                bytes[pos] as char
            );
            x |= (chunk & 0x1f) << (5 * shift);
            pos += 1;
            shift += 1;
            if chunk & 0x20 == 0 {
                if chunk & 0x10 != 0 {
                    x |= -1i64 << (5 * shift);
                }
                break;
            }
        }
        if counts.len() > 2 {
            x += counts[counts.len() - 2];
        }
        counts.push(x);
    }

    counts
        .into_iter()
        .map(|count| {
            ensure!(count >= 0, "negative run length {} in RLE counts", count);
            Ok(count as usize)
        })
        .try_collect()
}
