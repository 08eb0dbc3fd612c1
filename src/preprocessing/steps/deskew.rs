use image::{GrayImage, Luma};
use imageproc::geometry::{convex_hull, min_area_rect};
use imageproc::point::Point;

use crate::config::DESKEW_THRESHOLD;

/// Below this many foreground pixels there is no usable text signal
pub const MIN_FOREGROUND_PIXELS: usize = 10;

/// Corrections smaller than this (degrees) are not worth resampling for
pub const MIN_ROTATION_DEGREES: f32 = 0.5;

/// Deskew image by detecting and correcting rotation.
/// Returns the input untouched when there is too little foreground or the
/// detected tilt is negligible
pub fn apply(image: GrayImage) -> GrayImage {
    let angle = match detect_skew_angle(&image) {
        Some(angle) => angle,
        None => {
            tracing::debug!("Deskew skipped: not enough foreground pixels");
            return image;
        }
    };

    if angle.abs() < MIN_ROTATION_DEGREES {
        tracing::debug!("Deskew skipped: angle {:.2} below threshold", angle);
        return image;
    }

    tracing::debug!("Deskew rotating by {:.2} degrees", angle);
    rotate_about_center(&image, angle)
}

/// Detect the correction angle in degrees (positive rotates counter-clockwise).
///
/// Pixels at or below [`DESKEW_THRESHOLD`] are foreground (inverted binary
/// threshold). The angle comes from the minimum-area rectangle around all
/// foreground pixels. Returns `None` when at most [`MIN_FOREGROUND_PIXELS`]
/// pixels are foreground.
pub fn detect_skew_angle(image: &GrayImage) -> Option<f32> {
    let (count, extremes) = foreground_extremes(image, DESKEW_THRESHOLD);
    if count <= MIN_FOREGROUND_PIXELS {
        return None;
    }

    let hull = convex_hull(extremes.as_slice());
    let rect_angle = min_area_rect_angle(&hull);

    let corrected = if rect_angle < -45.0 {
        -(90.0 + rect_angle)
    } else {
        -rect_angle
    };
    Some(corrected as f32)
}

/// Count foreground pixels and keep only the leftmost and rightmost of each row.
/// Those points span the same convex hull as the full foreground set
fn foreground_extremes(image: &GrayImage, threshold: u8) -> (usize, Vec<Point<i32>>) {
    let (width, height) = image.dimensions();
    let mut count = 0usize;
    let mut extremes = Vec::new();

    for y in 0..height {
        let mut first: Option<u32> = None;
        let mut last = 0u32;
        for x in 0..width {
            if image.get_pixel(x, y).0[0] <= threshold {
                count += 1;
                first.get_or_insert(x);
                last = x;
            }
        }
        if let Some(first) = first {
            extremes.push(Point::new(first as i32, y as i32));
            if last != first {
                extremes.push(Point::new(last as i32, y as i32));
            }
        }
    }

    (count, extremes)
}

/// Orientation of the minimum-area bounding rectangle of a convex hull,
/// in degrees counter-clockwise from horizontal, normalized to [-90, 0).
/// Measured along the rectangle's longer side, where corner rounding matters least
fn min_area_rect_angle(hull: &[Point<i32>]) -> f64 {
    if hull.is_empty() {
        return -90.0;
    }
    let [a, b, c, _] = min_area_rect(hull);
    let length = |p: Point<i32>, q: Point<i32>| ((q.x - p.x) as f64).hypot((q.y - p.y) as f64);
    let edge_angle = if length(a, b) >= length(b, c) {
        edge_direction(a, b)
    } else {
        edge_direction(b, c)
    };

    // Both sides of the rectangle describe the same orientation modulo 90
    edge_angle.rem_euclid(90.0) - 90.0
}

/// Direction from `a` to `b`, counter-clockwise from horizontal (image y grows downward)
fn edge_direction(a: Point<i32>, b: Point<i32>) -> f64 {
    let (ex, ey) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    (-ey).atan2(ex).to_degrees()
}

/// Rotate counter-clockwise by `degrees` about the image center, keeping dimensions.
/// Samples with cubic convolution and replicates edge pixels instead of
/// filling corners with a constant
pub fn rotate_about_center(image: &GrayImage, degrees: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    let (sin, cos) = (degrees as f64).to_radians().sin_cos();
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;

    GrayImage::from_fn(width, height, |x, y| {
        let dx = x as f64 - cx;
        let dy = y as f64 - cy;
        let sx = cx + dx * cos - dy * sin;
        let sy = cy + dx * sin + dy * cos;
        Luma([sample_bicubic(image, sx, sy)])
    })
}

/// Cubic convolution kernel, a = -0.75
fn cubic_weight(distance: f64) -> f64 {
    const A: f64 = -0.75;
    let d = distance.abs();
    if d <= 1.0 {
        (A + 2.0) * d * d * d - (A + 3.0) * d * d + 1.0
    } else if d < 2.0 {
        A * d * d * d - 5.0 * A * d * d + 8.0 * A * d - 4.0 * A
    } else {
        0.0
    }
}

fn sample_bicubic(image: &GrayImage, sx: f64, sy: f64) -> u8 {
    let (width, height) = image.dimensions();
    let max_x = width as i64 - 1;
    let max_y = height as i64 - 1;
    let x0 = sx.floor() as i64;
    let y0 = sy.floor() as i64;
    let tx = sx - x0 as f64;
    let ty = sy - y0 as f64;

    let mut value = 0.0;
    for j in -1..=2i64 {
        let wy = cubic_weight(ty - j as f64);
        let py = (y0 + j).clamp(0, max_y) as u32;
        for i in -1..=2i64 {
            let wx = cubic_weight(tx - i as f64);
            let px = (x0 + i).clamp(0, max_x) as u32;
            value += wx * wy * image.get_pixel(px, py).0[0] as f64;
        }
    }

    value.round().clamp(0.0, 255.0) as u8
}
