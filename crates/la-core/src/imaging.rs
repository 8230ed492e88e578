//! Image pre-processing for generation requests.

use std::io::Cursor;
use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use imageproc::edges::canny;
use log::debug;

use crate::error::Result;

pub const CANNY_LOW_DEFAULT: f32 = 20.0;
pub const CANNY_LOW_MAX: f32 = 253.0;
pub const CANNY_HIGH_DEFAULT: f32 = 120.0;
pub const CANNY_HIGH_MAX: f32 = 254.0;

pub const WHITE: [u8; 3] = [255, 255, 255];

/// SDXL resolution buckets keyed by their nominal aspect ratio.
const BUCKETS: [(f32, u32, u32); 11] = [
    (1.0, 1024, 1024),
    (4.0 / 3.0, 1152, 896),
    (3.0 / 2.0, 1216, 832),
    (16.0 / 9.0, 1344, 768),
    (21.0 / 9.0, 1568, 672),
    (3.0, 1728, 576),
    (1.0 / 4.0, 512, 2048),
    (1.0 / 3.0, 576, 1728),
    (9.0 / 16.0, 768, 1344),
    (2.0 / 3.0, 832, 1216),
    (3.0 / 4.0, 896, 1152),
];

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let image = image::open(path)?;
    debug!("Loaded {} ({}x{})", path.display(), image.width(), image.height());
    Ok(image)
}

/// Composite the image over an opaque white canvas.
pub fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut out = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb(WHITE));

    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }

    out
}

/// The bucket whose aspect ratio is closest to `width / height`.
pub fn bucket_for(width: u32, height: u32) -> (u32, u32) {
    let aspect = width as f32 / height.max(1) as f32;
    let (_, w, h) = BUCKETS
        .iter()
        .copied()
        .min_by(|a, b| (a.0 - aspect).abs().total_cmp(&(b.0 - aspect).abs()))
        .unwrap_or(BUCKETS[0]);
    (w, h)
}

pub fn resize_to_bucket(image: &RgbImage) -> RgbImage {
    let (w, h) = bucket_for(image.width(), image.height());
    imageops::resize(image, w, h, FilterType::Lanczos3)
}

pub fn fit_to(image: &DynamicImage, width: u32, height: u32) -> RgbImage {
    imageops::resize(&image.to_rgb8(), width, height, FilterType::Lanczos3)
}

pub fn blank_canvas(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// Clamp both thresholds to the 8-bit range and order them low..high.
pub fn normalize_thresholds(low: f32, high: f32) -> (f32, f32) {
    let low = low.clamp(0.0, 255.0);
    let high = high.clamp(0.0, 255.0);
    if low > high { (high, low) } else { (low, high) }
}

/// Canny edge map of the image: white edges on black.
pub fn canny_lineart(image: &DynamicImage, low: f32, high: f32) -> GrayImage {
    let (low, high) = normalize_thresholds(low, high);
    let gray = DynamicImage::ImageRgb8(flatten_on_white(image)).to_luma8();
    debug!("Canny {}x{} with thresholds {low}/{high}", gray.width(), gray.height());
    canny(&gray, low, high)
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

pub fn encode_png_base64(image: &DynamicImage) -> Result<String> {
    Ok(STANDARD.encode(encode_png(image)?))
}

/// Decode a base64 image, with or without a `data:image/...;base64,` prefix.
pub fn decode_base64_image(data: &str) -> Result<DynamicImage> {
    let data = data.trim();
    let payload = match data.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, b64)| b64).unwrap_or(rest),
        None => data,
    };
    let bytes = STANDARD.decode(payload)?;
    Ok(image::load_from_memory(&bytes)?)
}
