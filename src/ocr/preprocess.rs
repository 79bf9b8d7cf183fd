use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use imageproc::contrast::{otsu_level, threshold, ThresholdType};
use imageproc::morphology::{grayscale_close, grayscale_open, Mask};
use std::fmt;
use std::path::{Path, PathBuf};

/// Contrast multiplier for the contrast-boosted variant.
const CONTRAST_FACTOR: f32 = 2.0;

/// CLAHE clip limit, relative to a uniform histogram.
const CLAHE_CLIP_LIMIT: f32 = 3.0;

/// CLAHE tile grid, per dimension.
const CLAHE_GRID: u32 = 8;

/// How a variant was derived from the source screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Original,
    Contrast,
    Binary,
    Cleaned,
    Inverted,
    Enlarged,
}

impl VariantKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Original => "orig",
            VariantKind::Contrast => "contrast",
            VariantKind::Binary => "binary",
            VariantKind::Cleaned => "cleaned",
            VariantKind::Inverted => "inverted",
            VariantKind::Enlarged => "enlarged",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A variant written to scratch storage.
#[derive(Debug, Clone)]
pub struct ImageVariant {
    pub kind: VariantKind,
    pub path: PathBuf,
}

/// Builds every OCR variant of a screenshot, in a fixed order.
pub fn generate_variants(img: &DynamicImage) -> Vec<(VariantKind, DynamicImage)> {
    let rgb = img.to_rgb8();
    let gray = img.to_luma8();

    let contrast = enhance_contrast(&rgb, CONTRAST_FACTOR);

    let binary = otsu_binarize(&clahe(&gray, CLAHE_CLIP_LIMIT, CLAHE_GRID));
    let cleaned = clean_binary(&binary);
    let mut inverted = binary.clone();
    imageops::invert(&mut inverted);

    let (width, height) = rgb.dimensions();
    let enlarged = imageops::resize(
        &rgb,
        width.saturating_mul(2),
        height.saturating_mul(2),
        FilterType::CatmullRom,
    );
    let enlarged = otsu_binarize(&DynamicImage::ImageRgb8(enlarged).to_luma8());

    vec![
        (VariantKind::Original, DynamicImage::ImageRgb8(rgb)),
        (VariantKind::Contrast, DynamicImage::ImageRgb8(contrast)),
        (VariantKind::Binary, DynamicImage::ImageLuma8(binary)),
        (VariantKind::Cleaned, DynamicImage::ImageLuma8(cleaned)),
        (VariantKind::Inverted, DynamicImage::ImageLuma8(inverted)),
        (VariantKind::Enlarged, DynamicImage::ImageLuma8(enlarged)),
    ]
}

/// Generates the variants and saves each one as a PNG inside `dir`.
pub fn write_variants(img: &DynamicImage, dir: &Path) -> image::ImageResult<Vec<ImageVariant>> {
    let mut written = Vec::new();

    for (index, (kind, variant)) in generate_variants(img).into_iter().enumerate() {
        let path = dir.join(format!("{:02}_{}.png", index + 1, kind));
        variant.save_with_format(&path, image::ImageFormat::Png)?;
        written.push(ImageVariant { kind, path });
    }

    Ok(written)
}

/// Scales each channel's distance from the mean gray level by `factor`.
pub fn enhance_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let gray = DynamicImage::ImageRgb8(img.clone()).to_luma8();
    let pixel_count = u64::from(gray.width()) * u64::from(gray.height());
    let mean = if pixel_count == 0 {
        0.0
    } else {
        let sum: u64 = gray.pixels().map(|p| u64::from(p[0])).sum();
        (sum as f32 / pixel_count as f32 + 0.5).floor()
    };

    let mut output = img.clone();
    for pixel in output.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            let value = mean + factor * (*channel as f32 - mean);
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    output
}

/// Binarizes with a threshold picked by Otsu's method.
pub fn otsu_binarize(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    threshold(gray, level, ThresholdType::Binary)
}

/// Contrast-limited adaptive histogram equalization.
///
/// Each tile of a `grid` x `grid` layout gets its own clipped equalization
/// table; pixels blend the tables of the four nearest tile centers.
pub fn clahe(gray: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }

    let tiles_x = grid.clamp(1, width);
    let tiles_y = grid.clamp(1, height);

    let tile_bounds = |index: u32, tiles: u32, size: u32| {
        let start = index * size / tiles;
        let end = (index + 1) * size / tiles;
        (start, end)
    };

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for ty in 0..tiles_y {
        let (y0, y1) = tile_bounds(ty, tiles_y, height);
        for tx in 0..tiles_x {
            let (x0, x1) = tile_bounds(tx, tiles_x, width);
            let mut histogram = [0u32; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    histogram[gray.get_pixel(x, y)[0] as usize] += 1;
                }
            }
            let area = (x1 - x0) * (y1 - y0);
            luts.push(clipped_equalization(&mut histogram, area, clip_limit));
        }
    }

    let tile_w = width as f32 / tiles_x as f32;
    let tile_h = height as f32 / tiles_y as f32;

    // Neighbouring tile indices and the weight of the second one.
    let neighbours = |pos: u32, tile_size: f32, tiles: u32| {
        let f = (pos as f32 + 0.5) / tile_size - 0.5;
        let low = f.floor().clamp(0.0, (tiles - 1) as f32) as u32;
        let high = (low + 1).min(tiles - 1);
        let weight = (f - low as f32).clamp(0.0, 1.0);
        (low, high, weight)
    };

    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        let (ty0, ty1, wy) = neighbours(y, tile_h, tiles_y);
        for x in 0..width {
            let (tx0, tx1, wx) = neighbours(x, tile_w, tiles_x);
            let value = gray.get_pixel(x, y)[0] as usize;
            let lut = |tx: u32, ty: u32| luts[(ty * tiles_x + tx) as usize][value] as f32;

            let top = lut(tx0, ty0) * (1.0 - wx) + lut(tx1, ty0) * wx;
            let bottom = lut(tx0, ty1) * (1.0 - wx) + lut(tx1, ty1) * wx;
            let blended = top * (1.0 - wy) + bottom * wy;
            output.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
        }
    }

    output
}

/// Clips the histogram, redistributes the excess evenly and returns the
/// cumulative mapping table.
fn clipped_equalization(histogram: &mut [u32; 256], area: u32, clip_limit: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if area == 0 {
        for (i, v) in lut.iter_mut().enumerate() {
            *v = i as u8;
        }
        return lut;
    }

    let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
    let mut excess = 0u32;
    for bin in histogram.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let share = excess / 256;
    let remainder = (excess % 256) as usize;
    for bin in histogram.iter_mut() {
        *bin += share;
    }
    if remainder > 0 {
        let step = (256 / remainder).max(1);
        for bin in histogram.iter_mut().step_by(step).take(remainder) {
            *bin += 1;
        }
    }

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    for (bin, v) in histogram.iter().zip(lut.iter_mut()) {
        cumulative += bin;
        *v = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// 2x2 square structuring element anchored at its bottom-right pixel.
fn square_2x2() -> Mask {
    Mask::from_image(&GrayImage::from_pixel(2, 2, Luma([255])), 1, 1)
}

/// Closes pinholes in glyphs, then opens away isolated specks.
pub fn clean_binary(binary: &GrayImage) -> GrayImage {
    let mask = square_2x2();
    grayscale_open(&grayscale_close(binary, &mask), &mask)
}
