use image::{GrayImage, Luma};

/// Histogram bins above `clip limit * mean bin height` are clipped
pub const CLAHE_CLIP_LIMIT: f32 = 2.0;
/// Tiles per side
pub const CLAHE_TILE_GRID: u32 = 8;

/// Contrast-limited adaptive histogram equalization (CLAHE).
/// Not part of the default pipeline; for pages whose contrast is too flat
pub fn apply(image: GrayImage) -> GrayImage {
    clahe(&image, CLAHE_TILE_GRID, CLAHE_CLIP_LIMIT)
}

/// CLAHE over a `grid x grid` tiling (fewer tiles when the image is smaller
/// than the grid). Each tile gets its own clipped-histogram lookup table and
/// pixels blend the four nearest tables bilinearly so tile seams do not show.
pub fn clahe(image: &GrayImage, grid: u32, clip_limit: f32) -> GrayImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }
    let tile_w = width.div_ceil(grid.clamp(1, width));
    let tile_h = height.div_ceil(grid.clamp(1, height));
    // Rounding tiles up can leave fewer of them than requested
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(width);
            let y1 = (y0 + tile_h).min(height);
            luts.push(tile_lut(image, x0, y0, x1, y1, clip_limit));
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let (tx1, tx2, xa) = blend_position(x, tile_w, tiles_x);
        let (ty1, ty2, ya) = blend_position(y, tile_h, tiles_y);
        let value = image.get_pixel(x, y).0[0] as usize;

        let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][value];
        let top = lut(tx1, ty1) * (1.0 - xa) + lut(tx2, ty1) * xa;
        let bottom = lut(tx1, ty2) * (1.0 - xa) + lut(tx2, ty2) * xa;
        let blended = top * (1.0 - ya) + bottom * ya;

        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Equalization table for one tile, histogram clipped and the excess spread evenly
fn tile_lut(image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [f32; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[image.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let area = ((x1 - x0) * (y1 - y0)).max(1);
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut clipped = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                clipped += *bin - limit;
                *bin = limit;
            }
        }

        let batch = clipped / 256;
        let residual = (clipped % 256) as usize;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (256 / residual).max(1);
            for bin in hist.iter_mut().step_by(step).take(residual) {
                *bin += 1;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0f32; 256];
    let mut cumulative = 0u32;
    for (value, count) in hist.iter().enumerate() {
        cumulative += count;
        lut[value] = (cumulative as f32 * scale).min(255.0);
    }
    lut
}

/// Neighbouring tile indices around a coordinate and the weight of the second
fn blend_position(coord: u32, tile_size: u32, tiles: u32) -> (u32, u32, f32) {
    let position = (coord as f32 + 0.5) / tile_size as f32 - 0.5;
    let first = position.floor();
    let weight = position - first;

    let last = tiles as i64 - 1;
    let t1 = (first as i64).clamp(0, last) as u32;
    let t2 = (first as i64 + 1).clamp(0, last) as u32;
    (t1, t2, weight)
}
