//! High-level, ergonomic library API: the detection entry points collaborators
//! call, plus small pipelines that chain detection and cropping. Prefer these
//! over the low-level processing modules when integrating autocrop.
use ndarray::ArrayD;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::buffer::{Image, Mask, Margins, margin_rect};
use crate::core::geometry::{AspectCandidate, EdgeBand, Rect, parse_aspects};
use crate::core::params::{
    AspectFitParams, BandScanParams, BannerParams, BorderGrowParams, CropConfig,
    SubjectBoundsParams,
};
use crate::core::processing::aspect_fit::{
    self, AspectChoice, FitResult, flux_targets, seed_pad, select_covering, select_inscribed,
};
use crate::core::processing::band_scan::{self, BandScan};
use crate::core::processing::banner::{self, BannerDetection};
use crate::core::processing::border_grow;
use crate::core::processing::subject_bounds::{self, SubjectBox};
use crate::error::Result;

/// Owned sub-buffer of `image` inside `rect`; no resampling.
pub fn crop(image: &Image, rect: Rect) -> Result<Image> {
    image.crop(rect)
}

pub fn crop_mask(mask: &Mask, rect: Rect) -> Result<Mask> {
    mask.crop(rect)
}

/// Remove fixed margins, keeping at least one pixel per axis and optionally
/// flooring the kept size to a multiple of `snap_multiple`.
pub fn crop_by_margins(image: &Image, margins: Margins, snap_multiple: usize) -> Result<Image> {
    let (w, h) = image.dims();
    image.crop(margin_rect(w, h, margins, snap_multiple))
}

pub fn crop_mask_by_margins(mask: &Mask, margins: Margins, snap_multiple: usize) -> Result<Mask> {
    let (w, h) = mask.dims();
    mask.crop(margin_rect(w, h, margins, snap_multiple))
}

/// Per-edge flat-colour border widths.
pub fn detect_border(image: &Image, params: &BandScanParams) -> EdgeBand {
    band_scan::scan_edge_bands(image, params).band
}

/// Same as [`detect_border`] for collaborator arrays; a multi-image batch is rejected.
pub fn detect_border_array(data: ArrayD<f32>, params: &BandScanParams) -> Result<EdgeBand> {
    let image = Image::from_array(data)?;
    Ok(detect_border(&image, params))
}

/// Scan for flat bands on all edges and crop them away.
pub fn strip_solid_borders(image: &Image, params: &BandScanParams) -> Result<(Image, BandScan)> {
    band_scan::strip_solid_borders(image, params)
}

/// Result of [`auto_crop_borders`].
#[derive(Debug, Clone)]
pub struct BorderCrop {
    pub image: Image,
    pub rect: Rect,
    /// 1 where the pixel was classified as border.
    pub border_mask: Mask,
}

/// Grow the border region, crop to the even-sized content box. A border that
/// swallows the whole frame yields the uncropped image.
pub fn auto_crop_borders(image: &Image, params: &BorderGrowParams) -> Result<BorderCrop> {
    let (rect, growth) = border_grow::detect_border_box(image, params);
    let cropped = image.crop(rect)?;
    Ok(BorderCrop {
        image: cropped,
        rect,
        border_mask: growth.to_mask(),
    })
}

pub fn detect_banner(image: &Image, params: &BannerParams) -> BannerDetection {
    banner::detect_banner(image, params)
}

/// All-or-nothing banner detection over a batch; the trim is the batch minimum.
pub fn detect_banner_batch(images: &[Image], params: &BannerParams) -> Result<BannerDetection> {
    banner::detect_banner_batch(images, params)
}

/// Batch detection for a `[B,H,W,C]` collaborator array.
pub fn detect_banner_array(data: ArrayD<f32>, params: &BannerParams) -> Result<BannerDetection> {
    let images = Image::batch_from_array(data)?;
    banner::detect_banner_batch(&images, params)
}

/// Crop the bottom banner from every image of the batch, or from none.
pub fn strip_bottom_banner(
    images: &[Image],
    params: &BannerParams,
) -> Result<(Vec<Image>, BannerDetection)> {
    banner::strip_bottom_banner_batch(images, params)
}

pub fn extract_subject_box(mask: &Mask, params: &SubjectBoundsParams) -> SubjectBox {
    subject_bounds::extract_subject_box(mask, params)
}

/// Head-safe aspect placement of `seed` inside an image of `dims = (width, height)`.
pub fn fit_aspect(seed: Rect, dims: (usize, usize), params: &AspectFitParams) -> Result<FitResult> {
    aspect_fit::fit_head_safe(seed, dims.0, dims.1, params)
}

/// Everything [`smart_subject_crop`] decided, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SmartCrop {
    pub subject: SubjectBox,
    /// Subject box after the fixed pre-expansion.
    pub seed: Rect,
    pub pad_px: usize,
    pub choice: AspectChoice,
}

impl SmartCrop {
    pub fn rect(&self) -> Rect {
        self.choice.rect
    }
}

/// Mask to crop rectangle: subject quantile box, padded, then the best covering
/// rectangle among the configured aspects.
///
/// A loose (non-tight) subject box skips the aspect search and returns the full
/// frame. Fails with `NoFeasibleAspect` when no configured ratio fits.
pub fn smart_subject_crop(mask: &Mask, config: &CropConfig) -> Result<SmartCrop> {
    let (w, h) = mask.dims();
    let subject = subject_bounds::extract_subject_box(mask, &config.subject);
    let full = Rect::full(w, h);

    if !config.subject.tight {
        let ratio = full.ratio();
        return Ok(SmartCrop {
            subject,
            seed: full,
            pad_px: 0,
            choice: AspectChoice {
                rect: full,
                candidate: AspectCandidate::new(ratio, format!("{w}:{h}")),
                cost: [0.0; 6],
            },
        });
    }

    let pad_px = seed_pad(w, h, &config.fit);
    let seed = subject.rect.padded(pad_px, w, h);
    let candidates = parse_aspects(&config.fit.aspects);
    let choice = select_covering(seed, &candidates, w, h)?;
    if choice.rect.is_full_frame(w, h) {
        warn!("Subject crop covers the whole frame");
    }
    info!(
        subject = %subject.rect,
        seed = %seed,
        crop = %choice.rect,
        aspect = %choice.candidate.label,
        "Smart subject crop"
    );
    Ok(SmartCrop {
        subject,
        seed,
        pad_px,
        choice,
    })
}

/// Largest centred crop of the whole frame among `candidates`.
pub fn fit_whole_frame(dims: (usize, usize), candidates: &[AspectCandidate]) -> Result<AspectChoice> {
    select_inscribed(dims.0, dims.1, candidates)
}

/// [`fit_whole_frame`] against the built-in model resolution table.
pub fn fit_model_resolution(dims: (usize, usize)) -> Result<AspectChoice> {
    select_inscribed(dims.0, dims.1, &flux_targets())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, IxDyn};

    #[test]
    fn border_array_rejects_batches() {
        let arr = ArrayD::zeros(IxDyn(&[2, 8, 8, 3]));
        assert!(detect_border_array(arr, &BandScanParams::default()).is_err());
    }

    #[test]
    fn smart_crop_contains_padded_subject() {
        let mut data = Array2::zeros((300, 400));
        for y in 100..200 {
            for x in 150..230 {
                data[[y, x]] = 1.0;
            }
        }
        let mask = Mask::new(data).unwrap();
        let result = smart_subject_crop(&mask, &CropConfig::default()).unwrap();
        assert!(result.rect().contains(&result.seed));
        assert!(result.seed.contains(&result.subject.rect));
        assert!(result.rect().fits_in(400, 300));
        assert_eq!(result.pad_px, 8);
    }

    #[test]
    fn auto_crop_removes_flat_frame() {
        let data = Array3::from_shape_fn((50, 60, 3), |(y, x, _)| {
            if (8..42).contains(&y) && (10..50).contains(&x) {
                if (x + y) % 2 == 0 { 0.1 } else { 0.9 }
            } else {
                1.0
            }
        });
        let image = Image::new(data).unwrap();
        let result = auto_crop_borders(&image, &BorderGrowParams::default()).unwrap();
        assert_eq!(result.rect, Rect::new(10, 8, 40, 34));
        assert_eq!(result.image.dims(), (40, 34));
    }
}
