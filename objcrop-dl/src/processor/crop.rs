//! The bounding-box crop with margin and zero padding.

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoxCropperInit {
    /// Margin added to each side of the box as a fraction of the mean of
    /// its width and height.
    pub margin: R64,
}

impl BoxCropperInit {
    pub fn build(self) -> BoxCropper {
        let Self { margin } = self;
        BoxCropper {
            margin: margin.raw(),
        }
    }
}

impl Default for BoxCropperInit {
    fn default() -> Self {
        Self { margin: r64(0.2) }
    }
}

/// Crops a margin-expanded bounding box out of an image, zero-filling the
/// parts of the box that fall outside the image bounds.
#[derive(Debug, Clone)]
pub struct BoxCropper {
    margin: f64,
}

impl BoxCropper {
    /// Crop an `(height, width, channel)` image to the box `[x, y, w, h]`
    /// expanded by the margin.
    ///
    /// The output always has the expanded box's dimensions. A box entirely
    /// outside the image yields an all-zero output; a degenerate box yields
    /// an empty one. No error is raised for malformed boxes.
    pub fn forward(&self, image: ArrayView3<u8>, bbox: [f64; 4]) -> Array3<u8> {
        let (rows, cols, channels) = image.dim();
        let place = Placement::new(bbox, self.margin, rows, cols);
        let mut output = Array3::zeros((place.out_h, place.out_w, channels));

        if let Some([src_rows, src_cols, dst_rows, dst_cols]) = place.regions() {
            output
                .slice_mut(s![dst_rows, dst_cols, ..])
                .assign(&image.slice(s![src_rows, src_cols, ..]));
        }
        output
    }

    /// The 2-D variant, for masks decoded alongside the image.
    pub fn forward_mask(&self, mask: ArrayView2<u8>, bbox: [f64; 4]) -> Array2<u8> {
        let (rows, cols) = mask.dim();
        let place = Placement::new(bbox, self.margin, rows, cols);
        let mut output = Array2::zeros((place.out_h, place.out_w));

        if let Some([src_rows, src_cols, dst_rows, dst_cols]) = place.regions() {
            output
                .slice_mut(s![dst_rows, dst_cols])
                .assign(&mask.slice(s![src_rows, src_cols]));
        }
        output
    }
}

/// Where the clipped source region lands inside the padded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placement {
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
    pad_l: usize,
    pad_t: usize,
    out_h: usize,
    out_w: usize,
}

impl Placement {
    fn new(bbox: [f64; 4], margin: f64, rows: usize, cols: usize) -> Self {
        let [x, y, w, h] = bbox;
        let space = margin * (w + h) / 2.0;
        let x = (x - space).round() as i64;
        let y = (y - space).round() as i64;
        let w = (w + space * 2.0).round().max(0.0) as i64;
        let h = (h + space * 2.0).round().max(0.0) as i64;

        let x0 = x.clamp(0, cols as i64) as usize;
        let x1 = (x + w).clamp(0, cols as i64) as usize;
        let y0 = y.clamp(0, rows as i64) as usize;
        let y1 = (y + h).clamp(0, rows as i64) as usize;

        Self {
            x0,
            x1,
            y0,
            y1,
            pad_l: (-x).max(0) as usize,
            pad_t: (-y).max(0) as usize,
            out_h: h as usize,
            out_w: w as usize,
        }
    }

    /// Source row/col and destination row/col ranges, or `None` when the
    /// clipped region is empty.
    fn regions(&self) -> Option<[std::ops::Range<usize>; 4]> {
        let Self {
            x0,
            x1,
            y0,
            y1,
            pad_l,
            pad_t,
            ..
        } = *self;

        (y1 > y0 && x1 > x0).then(|| {
            [
                y0..y1,
                x0..x1,
                pad_t..pad_t + (y1 - y0),
                pad_l..pad_l + (x1 - x0),
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image(rows: usize, cols: usize) -> Array3<u8> {
        Array3::from_shape_fn((rows, cols, 3), |(row, col, channel)| {
            (row * 31 + col * 7 + channel) as u8
        })
    }

    #[test]
    fn interior_box_matches_source_pixels() {
        let image = gradient_image(32, 32);
        let cropper = BoxCropperInit { margin: r64(0.0) }.build();

        let output = cropper.forward(image.view(), [4.0, 6.0, 10.0, 8.0]);
        assert_eq!(output.dim(), (8, 10, 3));
        assert_eq!(output, image.slice(s![6..14, 4..14, ..]));
    }

    #[test]
    fn margin_expansion_keeps_declared_size() {
        // space = 0.2 * (20 + 20) / 2 = 4, expanded box = (6, 6, 28, 28)
        let image = gradient_image(12, 12);
        let cropper = BoxCropperInit { margin: r64(0.2) }.build();

        let output = cropper.forward(image.view(), [10.0, 10.0, 20.0, 20.0]);
        assert_eq!(output.dim(), (28, 28, 3));

        // the clipped 6x6 patch lands at offset (0, 0)
        assert_eq!(
            output.slice(s![0..6, 0..6, ..]),
            image.slice(s![6..12, 6..12, ..])
        );
        // everything else is zero padding
        assert!(output.slice(s![6.., .., ..]).iter().all(|&v| v == 0));
        assert!(output.slice(s![.., 6.., ..]).iter().all(|&v| v == 0));
    }

    #[test]
    fn box_outside_image_is_all_zeros() {
        let image = gradient_image(16, 16);
        let cropper = BoxCropperInit { margin: r64(0.0) }.build();

        let output = cropper.forward(image.view(), [100.0, 100.0, 5.0, 7.0]);
        assert_eq!(output.dim(), (7, 5, 3));
        assert!(output.iter().all(|&v| v == 0));

        let output = cropper.forward(image.view(), [-30.0, -30.0, 5.0, 7.0]);
        assert_eq!(output.dim(), (7, 5, 3));
        assert!(output.iter().all(|&v| v == 0));
    }

    #[test]
    fn box_overlapping_top_left_pads_before_the_patch() {
        let image = gradient_image(16, 16);
        let cropper = BoxCropperInit { margin: r64(0.0) }.build();

        let output = cropper.forward(image.view(), [-3.0, -2.0, 8.0, 8.0]);
        assert_eq!(output.dim(), (8, 8, 3));
        assert!(output.slice(s![0..2, .., ..]).iter().all(|&v| v == 0));
        assert!(output.slice(s![.., 0..3, ..]).iter().all(|&v| v == 0));
        assert_eq!(
            output.slice(s![2.., 3.., ..]),
            image.slice(s![0..6, 0..5, ..])
        );
    }

    #[test]
    fn fractional_box_rounds_expanded_dimensions() {
        let image = gradient_image(64, 64);
        let cropper = BoxCropperInit { margin: r64(0.1) }.build();

        // space = 0.1 * (13.4 + 7.6) / 2 = 1.05
        // w = round(13.4 + 2.1) = 16 (round(15.5) away from zero)
        // h = round(7.6 + 2.1) = 10
        let output = cropper.forward(image.view(), [5.2, 9.9, 13.4, 7.6]);
        assert_eq!(output.dim(), (10, 16, 3));
    }

    #[test]
    fn degenerate_margin_produces_empty_output() {
        let image = gradient_image(16, 16);
        let cropper = BoxCropperInit { margin: r64(-2.0) }.build();

        let output = cropper.forward(image.view(), [4.0, 4.0, 4.0, 4.0]);
        assert_eq!(output.dim(), (0, 0, 3));
    }

    #[test]
    fn mask_crop_follows_the_same_placement() {
        let mask = Array2::from_shape_fn((12, 12), |(row, col)| ((row + col) % 2) as u8);
        let cropper = BoxCropperInit { margin: r64(0.2) }.build();

        let output = cropper.forward_mask(mask.view(), [10.0, 10.0, 20.0, 20.0]);
        assert_eq!(output.dim(), (28, 28));
        assert_eq!(output.slice(s![0..6, 0..6]), mask.slice(s![6..12, 6..12]));
        assert!(output.slice(s![6.., ..]).iter().all(|&v| v == 0));
    }
}
