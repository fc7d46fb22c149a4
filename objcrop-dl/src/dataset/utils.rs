use crate::common::*;
use image::RgbImage;

/// Reinterpret an RGB image as an `(height, width, channel)` array.
pub fn image_to_array(image: RgbImage) -> Array3<u8> {
    let (width, height) = image.dimensions();
    Array3::from_shape_vec((height as usize, width as usize, 3), image.into_raw()).unwrap()
}

/// The inverse of [`image_to_array`].
pub fn array_to_image(array: Array3<u8>) -> Result<RgbImage> {
    let (height, width, channels) = array.dim();
    ensure!(
        channels == 3,
        "expected 3 channels, but the array has {}",
        channels
    );

    let data = array.as_standard_layout().to_owned().into_raw_vec();
    RgbImage::from_raw(width as u32, height as u32, data)
        .ok_or_else(|| format_err!("pixel buffer does not match {}x{} image", width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_array_round_trip() {
        let mut image = RgbImage::new(3, 2);
        image.put_pixel(1, 0, image::Rgb([9, 8, 7]));

        let array = image_to_array(image.clone());
        assert_eq!(array.dim(), (2, 3, 3));
        assert_eq!(array[[0, 1, 0]], 9);
        assert_eq!(array[[0, 1, 2]], 7);

        assert_eq!(array_to_image(array).unwrap(), image);
    }
}
