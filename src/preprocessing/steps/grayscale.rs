use image::{DynamicImage, GrayImage};

/// Convert image to single-channel intensity using luminance weighting.
/// Every later step works on the result
pub fn apply(image: DynamicImage) -> GrayImage {
    match image {
        DynamicImage::ImageLuma8(gray) => gray,
        other => other.to_luma8(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_grayscale_weights_green_heaviest() {
        let mut img = RgbImage::new(10, 10);
        img.put_pixel(0, 0, Rgb([255, 0, 0])); // Red
        img.put_pixel(1, 0, Rgb([0, 255, 0])); // Green
        img.put_pixel(2, 0, Rgb([0, 0, 255])); // Blue

        let gray = apply(DynamicImage::ImageRgb8(img));

        let red = gray.get_pixel(0, 0).0[0];
        let green = gray.get_pixel(1, 0).0[0];
        let blue = gray.get_pixel(2, 0).0[0];
        assert!(green > red && red > blue, "r={red} g={green} b={blue}");
    }

    #[test]
    fn test_grayscale_preserves_dimensions() {
        let img = RgbImage::new(100, 50);
        let result = apply(DynamicImage::ImageRgb8(img));
        assert_eq!(result.dimensions(), (100, 50));
    }

    #[test]
    fn test_grayscale_passes_luma_through_untouched() {
        let img = GrayImage::from_fn(8, 8, |x, y| image::Luma([(x * 30 + y) as u8]));
        let result = apply(DynamicImage::ImageLuma8(img.clone()));
        assert_eq!(result, img);
    }
}
