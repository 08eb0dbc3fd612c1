use image::{GrayImage, Luma};

/// Filter strength: larger removes more noise and more detail
pub const DENOISE_STRENGTH: f32 = 10.0;
/// Side of the patch compared between pixels
pub const TEMPLATE_WINDOW: u32 = 7;
/// Side of the neighbourhood searched for similar patches
pub const SEARCH_WINDOW: u32 = 21;

/// Patches weighted below this contribute nothing
const MIN_WEIGHT: f32 = 0.001;

/// Apply non-local means denoising.
/// Removes scan grain and compression noise while keeping stroke edges,
/// since only patches that look alike are averaged together
pub fn apply(image: GrayImage) -> GrayImage {
    non_local_means(&image, DENOISE_STRENGTH, TEMPLATE_WINDOW, SEARCH_WINDOW)
}

/// Non-local means over a `search_window` neighbourhood using
/// `template_window` patches.
///
/// Each neighbour is weighted by `exp(-d / h^2)` where `d` is the mean
/// squared difference between the two patches. Patch distances are computed
/// one displacement at a time with a box filter over the per-pixel squared
/// differences, so the cost does not grow with the template size.
pub fn non_local_means(
    image: &GrayImage,
    h: f32,
    template_window: u32,
    search_window: u32,
) -> GrayImage {
    let (width, height) = image.dimensions();
    let (w, ht) = (width as usize, height as usize);
    let pixels = image.as_raw();
    let search_radius = (search_window / 2) as isize;
    let template_radius = (template_window / 2) as usize;
    let template_area = (template_window * template_window) as u64;
    let weights = weight_table(h);

    let mut weight_sum = vec![0f32; w * ht];
    let mut value_sum = vec![0f32; w * ht];
    let mut shifted = vec![0u8; w * ht];
    let mut sq_diff = vec![0u32; w * ht];

    for oy in -search_radius..=search_radius {
        for ox in -search_radius..=search_radius {
            for y in 0..ht {
                let sy = clamp_index(y as isize + oy, ht);
                for x in 0..w {
                    let sx = clamp_index(x as isize + ox, w);
                    let neighbour = pixels[sy * w + sx];
                    let d = pixels[y * w + x] as i32 - neighbour as i32;
                    shifted[y * w + x] = neighbour;
                    sq_diff[y * w + x] = (d * d) as u32;
                }
            }

            let patch_dist = box_sum(&sq_diff, w, ht, template_radius);

            for i in 0..w * ht {
                let mean = (patch_dist[i] / template_area) as usize;
                let weight = weights.get(mean).copied().unwrap_or(0.0);
                if weight > 0.0 {
                    weight_sum[i] += weight;
                    value_sum[i] += weight * shifted[i] as f32;
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let i = y as usize * w + x as usize;
        // The zero displacement always has weight 1, so the sum is positive
        let value = value_sum[i] / weight_sum[i];
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// `exp(-d / h^2)` for every integer mean squared distance until it drops below MIN_WEIGHT
fn weight_table(h: f32) -> Vec<f32> {
    let h2 = (h * h).max(f32::EPSILON);
    let mut table = Vec::new();
    for d in 0.. {
        let weight = (-(d as f32) / h2).exp();
        if weight < MIN_WEIGHT || d > 255 * 255 {
            break;
        }
        table.push(weight);
    }
    table
}

fn clamp_index(i: isize, len: usize) -> usize {
    i.clamp(0, len as isize - 1) as usize
}

/// Sum over a (2r+1)x(2r+1) window around each pixel, replicating edge values
fn box_sum(values: &[u32], width: usize, height: usize, radius: usize) -> Vec<u64> {
    let r = radius as isize;
    let mut horizontal = vec![0u64; width * height];
    for y in 0..height {
        let row = &values[y * width..(y + 1) * width];
        let mut acc: u64 = (-r..=r)
            .map(|dx| row[clamp_index(dx, width)] as u64)
            .sum();
        horizontal[y * width] = acc;
        for x in 1..width {
            let xi = x as isize;
            acc += row[clamp_index(xi + r, width)] as u64;
            acc -= row[clamp_index(xi - r - 1, width)] as u64;
            horizontal[y * width + x] = acc;
        }
    }

    let mut out = vec![0u64; width * height];
    for x in 0..width {
        let mut acc: u64 = (-r..=r)
            .map(|dy| horizontal[clamp_index(dy, height) * width + x])
            .sum();
        out[x] = acc;
        for y in 1..height {
            let yi = y as isize;
            acc += horizontal[clamp_index(yi + r, height) * width + x];
            acc -= horizontal[clamp_index(yi - r - 1, height) * width + x];
            out[y * width + x] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculate_variance(img: &GrayImage) -> f64 {
        let pixels: Vec<f64> = img.pixels().map(|p| p.0[0] as f64).collect();
        let mean = pixels.iter().sum::<f64>() / pixels.len() as f64;
        pixels.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / pixels.len() as f64
    }

    /// Deterministic +/-6 grain over a flat grey page
    fn grainy_page() -> GrayImage {
        GrayImage::from_fn(40, 40, |x, y| {
            let grain = ((x * 7 + y * 13) % 5) as i32 * 3 - 6;
            Luma([(180 + grain) as u8])
        })
    }

    #[test]
    fn test_denoise_reduces_grain() {
        let img = grainy_page();
        let result = apply(img.clone());

        assert_eq!(result.dimensions(), img.dimensions());
        assert!(calculate_variance(&result) < calculate_variance(&img) / 2.0);
    }

    #[test]
    fn test_denoise_preserves_stroke_edges() {
        // Dark vertical stroke on light paper
        let img = GrayImage::from_fn(40, 30, |x, _| {
            if (15..20).contains(&x) {
                Luma([30])
            } else {
                Luma([220])
            }
        });

        let result = apply(img);

        assert!(result.get_pixel(17, 15).0[0] < 60);
        assert!(result.get_pixel(5, 15).0[0] > 190);
        assert!(result.get_pixel(30, 15).0[0] > 190);
    }

    #[test]
    fn test_denoise_keeps_flat_image_flat() {
        let img = GrayImage::from_pixel(25, 25, Luma([128]));
        assert_eq!(apply(img.clone()), img);
    }

    #[test]
    fn test_box_sum_replicates_edges() {
        // 3x1 row [1, 2, 3], radius 1: edges count their own value twice
        let sums = box_sum(&[1, 2, 3], 3, 1, 1);
        // vertical pass also replicates the single row three times
        assert_eq!(sums, vec![3 * 4, 3 * 6, 3 * 8]);
    }

    #[test]
    fn test_weight_table_starts_at_one_and_decreases() {
        let table = weight_table(DENOISE_STRENGTH);
        assert_eq!(table[0], 1.0);
        assert!(table.windows(2).all(|w| w[1] < w[0]));
        assert!(*table.last().unwrap() >= MIN_WEIGHT);
    }
}
