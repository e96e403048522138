use ndarray::{ArrayView2, ArrayView3, Axis, s};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::buffer::Image;
use crate::core::geometry::EdgeBand;
use crate::core::params::BandScanParams;
use crate::error::Result;
use crate::types::{ScanAxis, ScanDirection};

/// Outcome of the multi-pass flat-border scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandScan {
    pub band: EdgeBand,
    pub passes: usize,
    pub detected: bool,
}

struct LineStats {
    mean: [f64; 3],
    variance: f64,
}

fn line_stats(line: &ArrayView2<f32>) -> LineStats {
    let n = line.nrows().max(1) as f64;
    let mut mean = [0.0f64; 3];
    for px in line.outer_iter() {
        for ch in 0..3 {
            mean[ch] += px[ch] as f64;
        }
    }
    for m in mean.iter_mut() {
        *m /= n;
    }
    let mut sq = 0.0f64;
    for px in line.outer_iter() {
        for ch in 0..3 {
            let d = px[ch] as f64 - mean[ch];
            sq += d * d;
        }
    }
    LineStats {
        mean,
        variance: sq / (n * 3.0),
    }
}

/// Share of pixels whose every channel lies within `delta` of `base`.
fn within_fraction(line: &ArrayView2<f32>, base: &[f64; 3], delta: f64) -> f64 {
    let n = line.nrows().max(1) as f64;
    let hits = line
        .outer_iter()
        .filter(|px| (0..3).all(|ch| (px[ch] as f64 - base[ch]).abs() <= delta))
        .count();
    hits as f64 / n
}

/// Share of the most populous cell after quantizing each channel to `bins` levels.
fn dominant_share(line: &ArrayView2<f32>, bins: usize) -> f64 {
    let bins = bins.clamp(2, 64);
    let levels = (bins - 1) as f64;
    let quant = |v: f32| ((v as f64 * levels).round_ties_even().clamp(0.0, levels)) as usize;
    let mut hist = vec![0usize; bins * bins * bins];
    for px in line.outer_iter() {
        hist[quant(px[0]) * bins * bins + quant(px[1]) * bins + quant(px[2])] += 1;
    }
    let best = hist.iter().copied().max().unwrap_or(0);
    best as f64 / line.nrows().max(1) as f64
}

/// Count how many rows/columns from one edge look like a flat colour band.
///
/// The first line seeds the baseline colour. Each following line is rejected
/// when neither its within-delta share nor its dominant-bin share reaches
/// `min_uniform_fraction` and it is also too far from the baseline (mean
/// delta) or too busy (variance). A rejection spends one retry credit if any
/// is left, otherwise the scan stops. Only accepted lines move the baseline,
/// and the trim ends at the last accepted line, so tolerated lines count only
/// when a flat line follows them. Trims shorter than `min_band_px` become 0.
pub fn scan_uniform_band(
    img: ArrayView3<f32>,
    axis: ScanAxis,
    direction: ScanDirection,
    max_scan: usize,
    params: &BandScanParams,
) -> usize {
    let (h, w, _) = img.dim();
    let (length, line_axis) = match axis {
        ScanAxis::Rows => (h, Axis(0)),
        ScanAxis::Cols => (w, Axis(1)),
    };
    let limit = max_scan.min(length);
    if limit == 0 {
        return 0;
    }

    let delta = params.colour_delta_threshold;
    let min_uniform = params.min_uniform_fraction;
    let follow = params.mean_follow;
    let mut retries = params.retry_allowance;

    let mut base: Option<[f64; 3]> = None;
    let mut trimmed = 0;

    for step in 0..limit {
        let idx = match direction {
            ScanDirection::FromStart => step,
            ScanDirection::FromEnd => length - 1 - step,
        };
        let line = img.index_axis(line_axis, idx);
        let stats = line_stats(&line);

        let Some(current) = base else {
            base = Some(stats.mean);
            trimmed = step + 1;
            continue;
        };

        let diff_mean = (0..3)
            .map(|ch| (stats.mean[ch] - current[ch]).abs())
            .fold(0.0f64, f64::max);
        let within = within_fraction(&line, &current, delta);
        let dominant = if within < min_uniform && params.dominant_bins > 1 {
            dominant_share(&line, params.dominant_bins)
        } else {
            within
        };

        let not_uniform = within < min_uniform && dominant < min_uniform;
        let stop_on_diff = not_uniform && diff_mean > delta;
        let stop_on_var = not_uniform && stats.variance > params.variance_threshold;

        if stop_on_diff || stop_on_var {
            if retries > 0 {
                retries -= 1;
                continue;
            }
            break;
        }

        let mut next = current;
        for ch in 0..3 {
            next[ch] = current[ch] * (1.0 - follow) + stats.mean[ch] * follow;
        }
        base = Some(next);
        trimmed = step + 1;
    }

    if trimmed >= params.min_band_px { trimmed } else { 0 }
}

/// Strip flat bands from all four edges, repeating up to `params.passes` times.
///
/// Each pass scans top, bottom, left, then right on the image left over by the
/// previous scans; the per-edge cap is recomputed from the current size and at
/// least one row and column always survive. Totals only grow, and the loop ends
/// early once a full pass trims nothing.
pub fn scan_edge_bands(image: &Image, params: &BandScanParams) -> BandScan {
    let mut band = EdgeBand::default();
    let (full_w, full_h) = image.dims();
    let pct = params.max_border_percent / 100.0;
    let mut passes = 0;

    for pass in 0..params.passes.max(1) {
        passes = pass + 1;
        let mut trimmed_this_pass = false;

        let (cur_w, cur_h) = (
            full_w - band.left - band.right,
            full_h - band.top - band.bottom,
        );
        let max_rows = ((cur_h as f64 * pct) as usize).max(1);
        let max_cols = ((cur_w as f64 * pct) as usize).max(1);

        let edges = [
            (ScanAxis::Rows, ScanDirection::FromStart),
            (ScanAxis::Rows, ScanDirection::FromEnd),
            (ScanAxis::Cols, ScanDirection::FromStart),
            (ScanAxis::Cols, ScanDirection::FromEnd),
        ];
        for (axis, direction) in edges {
            let work = image.data().slice(s![
                band.top..full_h - band.bottom,
                band.left..full_w - band.right,
                ..
            ]);
            let (h, w, _) = work.dim();
            let (cap, remaining) = match axis {
                ScanAxis::Rows => (max_rows, h),
                ScanAxis::Cols => (max_cols, w),
            };
            let cap = cap.min(remaining.saturating_sub(1));
            let trim = scan_uniform_band(work, axis, direction, cap, params);
            if trim == 0 {
                continue;
            }
            trimmed_this_pass = true;
            match (axis, direction) {
                (ScanAxis::Rows, ScanDirection::FromStart) => band.top += trim,
                (ScanAxis::Rows, ScanDirection::FromEnd) => band.bottom += trim,
                (ScanAxis::Cols, ScanDirection::FromStart) => band.left += trim,
                (ScanAxis::Cols, ScanDirection::FromEnd) => band.right += trim,
            }
        }

        debug!(pass = passes, ?band, "Band scan pass finished");
        if !trimmed_this_pass {
            break;
        }
    }

    let detected = !band.is_empty();
    info!(
        top = band.top,
        bottom = band.bottom,
        left = band.left,
        right = band.right,
        passes,
        "Solid border scan complete"
    );
    BandScan {
        band,
        passes,
        detected,
    }
}

/// Scan and crop in one step.
pub fn strip_solid_borders(image: &Image, params: &BandScanParams) -> Result<(Image, BandScan)> {
    let scan = scan_edge_bands(image, params);
    let (w, h) = image.dims();
    let cropped = image.crop(scan.band.inner_rect(w, h))?;
    Ok((cropped, scan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// Gray frame of `border` px around a one-pixel checkerboard.
    fn framed_checker(size: usize, border: usize) -> Image {
        let data = Array3::from_shape_fn((size, size, 3), |(y, x, _)| {
            if y < border || x < border || y >= size - border || x >= size - border {
                0.5
            } else if (x + y) % 2 == 0 {
                0.0
            } else {
                1.0
            }
        });
        Image::new(data).unwrap()
    }

    #[test]
    fn single_edge_scan_counts_flat_rows() {
        let img = framed_checker(100, 10);
        let params = BandScanParams::default();
        let top = scan_uniform_band(
            img.data().view(),
            ScanAxis::Rows,
            ScanDirection::FromStart,
            65,
            &params,
        );
        assert_eq!(top, 10);
        let right = scan_uniform_band(
            img.data().view(),
            ScanAxis::Cols,
            ScanDirection::FromEnd,
            65,
            &params,
        );
        assert_eq!(right, 10);
    }

    #[test]
    fn scan_is_capped() {
        let img = framed_checker(100, 10);
        let trim = scan_uniform_band(
            img.data().view(),
            ScanAxis::Rows,
            ScanDirection::FromStart,
            4,
            &BandScanParams::default(),
        );
        assert_eq!(trim, 4);
    }

    #[test]
    fn short_band_below_minimum_is_ignored() {
        let img = framed_checker(50, 1);
        let params = BandScanParams {
            min_band_px: 3,
            ..Default::default()
        };
        let scan = scan_edge_bands(&img, &params);
        assert!(!scan.detected);
        assert_eq!(scan.band, EdgeBand::default());
    }

    #[test]
    fn single_noisy_line_inside_band_is_tolerated() {
        let mut data = Array3::from_elem((60, 40, 3), 0.3f32);
        for y in 12..60 {
            for x in 0..40 {
                let v = if (x + y) % 2 == 0 { 0.0 } else { 1.0 };
                for ch in 0..3 {
                    data[[y, x, ch]] = v;
                }
            }
        }
        // Row 5 is a stray noisy scanline in the middle of the flat band.
        for x in 0..40 {
            let v = if x % 2 == 0 { 0.0 } else { 1.0 };
            for ch in 0..3 {
                data[[5, x, ch]] = v;
            }
        }
        let img = Image::new(data).unwrap();
        let trim = scan_uniform_band(
            img.data().view(),
            ScanAxis::Rows,
            ScanDirection::FromStart,
            39,
            &BandScanParams::default(),
        );
        assert_eq!(trim, 12);

        let strict = BandScanParams {
            retry_allowance: 0,
            ..Default::default()
        };
        let trim = scan_uniform_band(
            img.data().view(),
            ScanAxis::Rows,
            ScanDirection::FromStart,
            39,
            &strict,
        );
        assert_eq!(trim, 5);
    }

    #[test]
    fn gradient_band_is_followed_by_drifting_baseline() {
        // Rows brighten by 0.03 per line: each step stays within delta of the
        // drifting baseline even though the far end is far from the first row.
        let mut data = Array3::from_shape_fn((80, 30, 3), |(y, _, _)| 0.1 + 0.03 * y as f32);
        for y in 20..80 {
            for x in 0..30 {
                let v = if (x + y) % 2 == 0 { 0.0 } else { 1.0 };
                for ch in 0..3 {
                    data[[y, x, ch]] = v;
                }
            }
        }
        let img = Image::new(data).unwrap();
        let params = BandScanParams {
            mean_follow: 1.0,
            ..Default::default()
        };
        let trim = scan_uniform_band(
            img.data().view(),
            ScanAxis::Rows,
            ScanDirection::FromStart,
            52,
            &params,
        );
        assert_eq!(trim, 20);
    }

    #[test]
    fn uniform_image_keeps_at_least_one_line() {
        let img = Image::new(Array3::from_elem((20, 20, 3), 0.4)).unwrap();
        let params = BandScanParams {
            max_border_percent: 100.0,
            passes: 4,
            ..Default::default()
        };
        let (cropped, scan) = strip_solid_borders(&img, &params).unwrap();
        assert!(scan.detected);
        assert!(cropped.width() >= 1 && cropped.height() >= 1);
        assert!(scan.band.top + scan.band.bottom < 20);
        assert!(scan.band.left + scan.band.right < 20);
    }

    #[test]
    fn oversized_bin_count_is_clamped() {
        let img = framed_checker(60, 10);
        let params = BandScanParams {
            dominant_bins: 1 << 22,
            ..Default::default()
        };
        let capped = BandScanParams {
            dominant_bins: 64,
            ..Default::default()
        };
        assert_eq!(scan_edge_bands(&img, &params).band, scan_edge_bands(&img, &capped).band);
    }
}
