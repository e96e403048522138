use ndarray::Axis;
use ndarray::parallel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::buffer::Image;
use crate::core::geometry::Rect;
use crate::core::params::BannerParams;
use crate::error::{Error, Result};

/// Rows to remove from the bottom edge. `trim == 0` whenever `detected` is false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerDetection {
    pub trim: usize,
    pub detected: bool,
}

impl BannerDetection {
    fn none() -> Self {
        Self::default()
    }
}

/// Look for a dark band anchored to the bottom edge of a single image.
///
/// Rows are inspected upward from the last one within the bottom
/// `max_scan_percent` of the image. A row belongs to the band when its mean luma
/// and the share of its dark pixels both pass the dark thresholds; the run ends
/// at the first row that does not. The run is accepted when it is at least
/// `min_band_percent` of the height long and, if required, one of its rows
/// carries enough bright pixels (text). Images of four rows or fewer are never
/// trimmed.
pub fn detect_banner(image: &Image, params: &BannerParams) -> BannerDetection {
    let h = image.height();
    if h <= 4 {
        return BannerDetection::none();
    }

    let scan_rows = ((h as f64 * params.max_scan_percent / 100.0) as usize)
        .max(1)
        .min(h);
    let min_band_px = ((h as f64 * params.min_band_percent / 100.0) as usize).max(1);

    let luma = image.luma();
    let dark = params.pixel_dark_threshold as f32;
    let bright = params.bright_pixel_threshold as f32;

    let mut run = 0;
    let mut seen_bright = false;
    for y in (h - scan_rows..h).rev() {
        let row = luma.index_axis(Axis(0), y);
        let n = row.len() as f64;
        let mean = row.sum() as f64 / n;
        let dark_fraction = row.iter().filter(|&&v| v <= dark).count() as f64 / n;
        if mean > params.pixel_dark_threshold || dark_fraction < params.dark_fraction_threshold {
            break;
        }
        run += 1;
        let bright_fraction = row.iter().filter(|&&v| v >= bright).count() as f64 / n;
        if bright_fraction >= params.bright_fraction_threshold {
            seen_bright = true;
        }
    }

    debug!(run, seen_bright, min_band_px, scan_rows, "Bottom banner scan");

    if run == 0 || run < min_band_px {
        return BannerDetection::none();
    }
    if params.require_bright_rows && !seen_bright {
        return BannerDetection::none();
    }

    BannerDetection {
        trim: (run + params.extra_trim_px).min(h),
        detected: true,
    }
}

/// Detect a banner across a batch of equally sized images.
///
/// Each image is inspected independently (in parallel). A trim is committed
/// only when every image detected a band, and the applied trim is the smallest
/// one so that no image loses rows that are not banner in it.
pub fn detect_banner_batch(images: &[Image], params: &BannerParams) -> Result<BannerDetection> {
    let Some(first) = images.first() else {
        return Err(Error::EmptyBatch);
    };
    let (w, h) = first.dims();
    if let Some(odd) = images.iter().find(|image| image.dims() != (w, h)) {
        let (ow, oh) = odd.dims();
        return Err(Error::invalid_shape("batch of equally sized images", &[oh, ow, 3]));
    }
    if h <= 4 {
        return Ok(BannerDetection::none());
    }

    let per_image: Vec<BannerDetection> = images
        .par_iter()
        .map(|image| detect_banner(image, params))
        .collect();

    if !per_image.iter().all(|d| d.detected) {
        debug!(
            detected = per_image.iter().filter(|d| d.detected).count(),
            batch = images.len(),
            "Banner not present in every image; batch left untouched"
        );
        return Ok(BannerDetection::none());
    }

    let trim = per_image.iter().map(|d| d.trim).min().unwrap_or(0);
    if trim == 0 {
        return Ok(BannerDetection::none());
    }
    info!(trim, batch = images.len(), "Bottom banner detected across batch");
    Ok(BannerDetection {
        trim,
        detected: true,
    })
}

/// Rectangle kept after removing `trim` bottom rows; at least one row survives.
pub fn banner_keep_rect(width: usize, height: usize, trim: usize) -> Rect {
    Rect::new(0, 0, width, height.saturating_sub(trim).max(1))
}

/// Detect and crop in one step. The image is returned unchanged when nothing is found.
pub fn strip_bottom_banner(image: &Image, params: &BannerParams) -> Result<(Image, BannerDetection)> {
    let detection = detect_banner(image, params);
    if !detection.detected {
        return Ok((image.clone(), detection));
    }
    let (w, h) = image.dims();
    let cropped = image.crop(banner_keep_rect(w, h, detection.trim))?;
    info!(trim = detection.trim, height = cropped.height(), "Bottom banner stripped");
    Ok((cropped, detection))
}

/// Batch variant of [`strip_bottom_banner`]: either every image is cropped by the
/// same trim or none is.
pub fn strip_bottom_banner_batch(
    images: &[Image],
    params: &BannerParams,
) -> Result<(Vec<Image>, BannerDetection)> {
    let detection = detect_banner_batch(images, params)?;
    if !detection.detected {
        return Ok((images.to_vec(), detection));
    }
    let cropped = images
        .iter()
        .map(|image| {
            let (w, h) = image.dims();
            image.crop(banner_keep_rect(w, h, detection.trim))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((cropped, detection))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// Mid-gray photo with `dark_rows` near-black rows at the bottom; the lowest
    /// `text_rows` of them carry a sparse pattern of white "text" pixels.
    fn bannered(height: usize, width: usize, dark_rows: usize, text_rows: usize) -> Image {
        let data = Array3::from_shape_fn((height, width, 3), |(y, x, _)| {
            if y < height - dark_rows {
                0.55
            } else if y >= height - text_rows && x % 20 == 0 {
                1.0
            } else {
                0.05
            }
        });
        Image::new(data).unwrap()
    }

    #[test]
    fn dark_band_with_text_is_detected() {
        let img = bannered(200, 120, 15, 5);
        let params = BannerParams::default();
        let detection = detect_banner(&img, &params);
        assert!(detection.detected);
        assert_eq!(detection.trim, 15 + params.extra_trim_px);

        let (cropped, _) = strip_bottom_banner(&img, &params).unwrap();
        assert_eq!(cropped.height(), 200 - 17);
        assert_eq!(cropped.width(), 120);
    }

    #[test]
    fn band_without_bright_rows_needs_flag_off() {
        let img = bannered(200, 120, 15, 0);
        assert!(!detect_banner(&img, &BannerParams::default()).detected);

        let relaxed = BannerParams {
            require_bright_rows: false,
            ..Default::default()
        };
        assert_eq!(detect_banner(&img, &relaxed).trim, 17);
    }

    #[test]
    fn short_band_is_rejected() {
        // 3% of 200 rows is 6; a 4-row band does not qualify.
        let img = bannered(200, 120, 4, 4);
        let detection = detect_banner(&img, &BannerParams::default());
        assert_eq!(detection, BannerDetection::default());
    }

    #[test]
    fn tiny_images_are_left_alone() {
        let img = bannered(4, 10, 4, 4);
        assert!(!detect_banner(&img, &BannerParams::default()).detected);
    }

    #[test]
    fn batch_uses_minimum_trim_only_when_all_detect() {
        let params = BannerParams::default();
        let a = bannered(200, 60, 15, 5);
        let b = bannered(200, 60, 20, 5);
        let both = detect_banner_batch(&[a.clone(), b], &params).unwrap();
        assert!(both.detected);
        assert_eq!(both.trim, 17);

        let plain = bannered(200, 60, 0, 0);
        let mixed = detect_banner_batch(&[a, plain], &params).unwrap();
        assert!(!mixed.detected);
        assert_eq!(mixed.trim, 0);

        assert!(matches!(
            detect_banner_batch(&[], &params),
            Err(Error::EmptyBatch)
        ));
    }

    #[test]
    fn mixed_sizes_are_rejected_before_detection() {
        let params = BannerParams::default();
        let batch = [bannered(200, 60, 15, 5), bannered(150, 60, 15, 5)];
        assert!(matches!(
            detect_banner_batch(&batch, &params),
            Err(Error::InvalidShape { .. })
        ));
        assert!(strip_bottom_banner_batch(&batch, &params).is_err());
    }
}
