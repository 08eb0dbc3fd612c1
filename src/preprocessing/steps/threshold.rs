use image::{GrayImage, Luma};

/// Side of the Gaussian neighbourhood used for the local mean
pub const ADAPTIVE_BLOCK_SIZE: u32 = 11;
/// Subtracted from the local mean to form the cutoff
pub const ADAPTIVE_OFFSET: i32 = 2;

/// Apply Gaussian adaptive thresholding.
/// Handwriting and lighting vary across a page, so every pixel gets its own cutoff
pub fn apply(image: GrayImage) -> GrayImage {
    adaptive_gaussian_threshold(&image, ADAPTIVE_BLOCK_SIZE, ADAPTIVE_OFFSET)
}

/// Binary threshold against a Gaussian-weighted local mean.
///
/// A pixel becomes white (255) when it is brighter than `mean - offset`,
/// black (0) otherwise. Borders replicate edge pixels.
pub fn adaptive_gaussian_threshold(image: &GrayImage, block_size: u32, offset: i32) -> GrayImage {
    let local_mean = gaussian_blur(image, &gaussian_kernel(block_size));

    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y).0[0] as i32;
        let mean = local_mean.get_pixel(x, y).0[0] as i32;
        if pixel > mean - offset {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Normalized 1-D Gaussian of odd length `size`, sigma derived from the size
/// as `0.3 * ((size - 1) / 2 - 1) + 0.8`
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let size = size.max(1) | 1;
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let radius = (size / 2) as i32;

    let raw: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let total: f32 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Separable blur with edge replication, rounded back to 8 bits
fn gaussian_blur(image: &GrayImage, kernel: &[f32]) -> GrayImage {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let radius = (kernel.len() / 2) as isize;
    let pixels = image.as_raw();
    let clamp = |i: isize, len: usize| i.clamp(0, len as isize - 1) as usize;

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            horizontal[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let sx = clamp(x as isize + k as isize - radius, w);
                    weight * pixels[y * w + sx] as f32
                })
                .sum();
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let value: f32 = kernel
            .iter()
            .enumerate()
            .map(|(k, weight)| {
                let sy = clamp(y as isize + k as isize - radius, h);
                weight * horizontal[sy * w + x as usize]
            })
            .sum();
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_binarizes_image() {
        let img = GrayImage::from_fn(50, 50, |x, y| Luma([((x * 5 + y * 3) % 256) as u8]));

        let result = apply(img);

        for pixel in result.pixels() {
            assert!(
                pixel.0[0] == 0 || pixel.0[0] == 255,
                "Expected binary pixel, got {}",
                pixel.0[0]
            );
        }
    }

    #[test]
    fn test_threshold_handles_text_pattern() {
        // Dark text on light background
        let mut img = GrayImage::from_pixel(50, 20, Luma([240]));
        for x in 10..40 {
            img.put_pixel(x, 10, Luma([20]));
        }

        let result = apply(img);

        assert_eq!(result.get_pixel(25, 10).0[0], 0);
        assert_eq!(result.get_pixel(25, 5).0[0], 255);
    }

    #[test]
    fn test_threshold_follows_uneven_lighting() {
        // Page brightens left to right; one stroke in the dark half, one in the light half
        let mut img = GrayImage::from_fn(120, 30, |x, _| Luma([(60 + x * 3 / 2) as u8]));
        for y in 10..20 {
            img.put_pixel(20, y, Luma([20]));
            img.put_pixel(100, y, Luma([150]));
        }

        let result = apply(img);

        assert_eq!(result.get_pixel(20, 15).0[0], 0);
        assert_eq!(result.get_pixel(100, 15).0[0], 0);
        assert_eq!(result.get_pixel(60, 5).0[0], 255);
    }

    #[test]
    fn test_uniform_image_turns_white() {
        let img = GrayImage::from_pixel(16, 16, Luma([90]));
        assert!(apply(img).pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(ADAPTIVE_BLOCK_SIZE);
        assert_eq!(kernel.len(), 11);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((kernel[0] - kernel[10]).abs() < 1e-7);
        assert!(kernel[5] > kernel[4]);
    }
}
