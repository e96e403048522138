//! File helpers standing in for the collaborators that hand buffers to the
//! engine: decode an image or mask file into the normalized `Image` / `Mask`
//! buffers and write crops back out. Formats follow the enabled `image` codecs
//! (PNG, JPEG, TIFF).
use std::fs;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageBuffer, Rgb, RgbImage};
use ndarray::{Array2, Array3};
use tracing::debug;

use crate::core::buffer::{Image, Mask};
use crate::error::{Error, Result};

/// Decode any supported file into an RGB float image. Alpha is dropped and
/// 16-bit sources keep their precision.
pub fn load_image(path: &Path) -> Result<Image> {
    let decoded = image::open(path)?.into_rgb32f();
    let (w, h) = (decoded.width() as usize, decoded.height() as usize);
    debug!(path = %path.display(), width = w, height = h, "Loaded image");
    let data = Array3::from_shape_vec((h, w, 3), decoded.into_raw())
        .map_err(|_| Error::invalid_shape("[H,W,3]", &[h, w, 3]))?;
    Image::new(data)
}

/// Decode a file as a single-channel mask in [0,1] (colour files are converted to luma).
pub fn load_mask(path: &Path) -> Result<Mask> {
    let decoded = image::open(path)?.into_luma16();
    let (w, h) = (decoded.width() as usize, decoded.height() as usize);
    let plane: Vec<f32> = decoded
        .into_raw()
        .into_iter()
        .map(|v| v as f32 / u16::MAX as f32)
        .collect();
    let data = Array2::from_shape_vec((h, w), plane)
        .map_err(|_| Error::invalid_shape("[H,W]", &[h, w]))?;
    Mask::new(data)
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Write an image as 8-bit RGB; the format comes from the file extension.
pub fn save_image(image: &Image, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let (w, h) = image.dims();
    let raw: Vec<u8> = image.data().iter().map(|&v| to_u8(v)).collect();
    let buffer: RgbImage = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(w as u32, h as u32, raw)
        .ok_or_else(|| Error::invalid_shape("[H,W,3]", &[h, w, 3]))?;
    DynamicImage::ImageRgb8(buffer).save(path)?;
    debug!(path = %path.display(), width = w, height = h, "Saved image");
    Ok(())
}

/// Write a mask as 8-bit grayscale.
pub fn save_mask(mask: &Mask, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let (w, h) = mask.dims();
    let raw: Vec<u8> = mask.data().iter().map(|&v| to_u8(v)).collect();
    let buffer = GrayImage::from_raw(w as u32, h as u32, raw)
        .ok_or_else(|| Error::invalid_shape("[H,W]", &[h, w]))?;
    DynamicImage::ImageLuma8(buffer).save(path)?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
