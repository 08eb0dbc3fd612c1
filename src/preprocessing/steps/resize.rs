use image::{imageops, imageops::FilterType, GrayImage};

/// Scale to `target_width` with bicubic (CatmullRom) sampling, keeping the aspect ratio
pub fn apply(image: GrayImage, target_width: u32) -> GrayImage {
    let (width, height) = image.dimensions();
    if target_width == 0 || target_width == width {
        return image;
    }

    let target_height = scaled_height(width, height, target_width);
    imageops::resize(&image, target_width, target_height, FilterType::CatmullRom)
}

/// Height matching `target_width` at the source aspect ratio, rounded to the nearest pixel
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let ratio = target_width as f64 / width as f64;
    ((height as f64 * ratio).round() as u32).max(1)
}
