use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::buffer::Mask;
use crate::core::geometry::Rect;
use crate::core::params::SubjectBoundsParams;
use crate::types::{Polarity, PolarityPick};

/// Subject rectangle together with the mask orientation it was measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectBox {
    pub rect: Rect,
    pub pick: PolarityPick,
}

/// Share of the mask weight lying in a ring of `ring_px` along the image border.
///
/// The ring width is limited to a quarter of the smaller dimension and corner
/// pixels are counted once.
pub fn border_mass_ratio(mass: &Array2<f32>, ring_px: usize) -> f64 {
    let (h, w) = mass.dim();
    let ring = ring_px.min(h.min(w) / 4).max(1);
    let mut total = 0.0f64;
    let mut border = 0.0f64;
    for ((y, x), &v) in mass.indexed_iter() {
        let v = v as f64;
        total += v;
        if y < ring || y >= h.saturating_sub(ring) || x < ring || x >= w.saturating_sub(ring) {
            border += v;
        }
    }
    border / (total + 1e-12)
}

/// Pick which orientation of the mask is the subject.
///
/// In automatic mode the orientation with less of its weight touching the image
/// border wins; ties keep the mask as given.
pub fn resolve_polarity(mask: &Mask, polarity: Polarity, ring_px: usize) -> (Array2<f32>, PolarityPick) {
    match polarity {
        Polarity::Foreground => (mask.data().clone(), PolarityPick::Foreground),
        Polarity::Background => (mask.complement().into_array(), PolarityPick::Background),
        Polarity::Auto => {
            let inverted = mask.complement().into_array();
            let r_fg = border_mass_ratio(mask.data(), ring_px);
            let r_bg = border_mass_ratio(&inverted, ring_px);
            debug!(r_fg, r_bg, "Border mass ratios");
            if r_bg < r_fg {
                (inverted, PolarityPick::AutoBackground)
            } else {
                (mask.data().clone(), PolarityPick::AutoForeground)
            }
        }
    }
}

/// Inverse-CDF lookup on a cumulative marginal.
///
/// A low edge is the first index whose cumulative mass exceeds `q * total`; a
/// high edge is the first index whose cumulative mass reaches it. With `q = 0`
/// and `q = 1` this lands exactly on the first and last bins carrying mass.
fn quantile_index(cum: &[f64], q: f64, low_edge: bool) -> usize {
    let Some(&total) = cum.last() else {
        return 0;
    };
    let target = q * total;
    let found = if low_edge {
        cum.iter().position(|&c| c > target)
    } else {
        cum.iter().position(|&c| c >= target)
    };
    found.unwrap_or(cum.len() - 1).min(cum.len() - 1)
}

fn cumulative(marginal: Array1<f64>) -> Vec<f64> {
    marginal
        .iter()
        .scan(0.0f64, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Widen `[lo, hi]` around its centre when it is shorter than `min_span`.
fn enforce_min_span(lo: usize, hi: usize, min_span: usize, dim: usize) -> (usize, usize) {
    if hi - lo + 1 >= min_span {
        return (lo, hi);
    }
    let centre = (lo + hi) / 2;
    let half = (min_span / 2).max(1);
    (centre.saturating_sub(half), (centre + half).min(dim - 1))
}

/// Quantile bounding box of a non-negative mass map.
///
/// Returns the full frame when the map carries no mass at all.
pub fn quantile_bounds(mass: &Array2<f32>, params: &SubjectBoundsParams) -> Rect {
    let (h, w) = mass.dim();
    let wide = mass.mapv(|v| v.max(0.0) as f64);
    let cols = wide.sum_axis(Axis(0));
    let rows = wide.sum_axis(Axis(1));
    if rows.sum() <= 0.0 {
        return Rect::full(w, h);
    }
    let col_cum = cumulative(cols);
    let row_cum = cumulative(rows);

    let mut x0 = quantile_index(&col_cum, params.q_left, true);
    let mut x1 = quantile_index(&col_cum, params.q_right, false);
    let mut y0 = quantile_index(&row_cum, params.q_top, true);
    let mut y1 = quantile_index(&row_cum, params.q_bottom, false);
    if x1 < x0 {
        std::mem::swap(&mut x0, &mut x1);
    }
    if y1 < y0 {
        std::mem::swap(&mut y0, &mut y1);
    }

    let (x0, x1) = enforce_min_span(x0, x1, params.min_span_px, w);
    let (y0, y1) = enforce_min_span(y0, y1, params.min_span_px, h);
    Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)
}

/// Resolve the subject orientation of `mask` and bound it with axis quantiles.
///
/// With `tight` disabled the whole frame is returned. A box equal to the full
/// frame is a valid result meaning "no useful subject crop".
pub fn extract_subject_box(mask: &Mask, params: &SubjectBoundsParams) -> SubjectBox {
    let (w, h) = mask.dims();
    let (mass, pick) = resolve_polarity(mask, params.polarity, params.border_ring_px);
    let rect = if params.tight {
        quantile_bounds(&mass, params)
    } else {
        Rect::full(w, h)
    };
    info!(pick = %pick, rect = %rect, tight = params.tight, "Subject box extracted");
    SubjectBox { rect, pick }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_mask(h: usize, w: usize, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Mask {
        let data = Array2::from_shape_fn((h, w), |(y, x)| {
            if rows.contains(&y) && cols.contains(&x) { 1.0 } else { 0.0 }
        });
        Mask::new(data).unwrap()
    }

    fn exact_params() -> SubjectBoundsParams {
        SubjectBoundsParams {
            polarity: Polarity::Foreground,
            q_left: 0.0,
            q_right: 1.0,
            q_top: 0.0,
            q_bottom: 1.0,
            min_span_px: 1,
            ..Default::default()
        }
    }

    #[test]
    fn full_quantiles_recover_the_block() {
        let mask = block_mask(40, 50, 5..15, 10..30);
        let found = extract_subject_box(&mask, &exact_params());
        assert_eq!(found.rect, Rect::new(10, 5, 20, 10));
        assert_eq!(found.pick, PolarityPick::Foreground);
    }

    #[test]
    fn corner_mass_flips_polarity() {
        let mask = block_mask(40, 40, 0..10, 0..10);
        let inverted = mask.complement().into_array();
        assert!(border_mass_ratio(&inverted, 8) < border_mass_ratio(mask.data(), 8));

        let (_, pick) = resolve_polarity(&mask, Polarity::Auto, 8);
        assert_eq!(pick, PolarityPick::AutoBackground);
        assert!(pick.is_inverted());
    }

    #[test]
    fn centred_subject_keeps_polarity() {
        let mask = block_mask(40, 40, 15..25, 15..25);
        let (_, pick) = resolve_polarity(&mask, Polarity::Auto, 8);
        assert_eq!(pick, PolarityPick::AutoForeground);
    }

    #[test]
    fn short_span_is_recentred() {
        let mask = block_mask(40, 40, 20..22, 10..30);
        let params = SubjectBoundsParams {
            min_span_px: 8,
            ..exact_params()
        };
        let rect = extract_subject_box(&mask, &params).rect;
        // Rows 20..=21 centre on 20 and widen by 4 either way.
        assert_eq!((rect.y, rect.h), (16, 9));
        assert_eq!((rect.x, rect.w), (10, 20));
    }

    #[test]
    fn empty_mask_and_loose_mode_give_full_frame() {
        let empty = Mask::new(Array2::zeros((12, 18))).unwrap();
        assert_eq!(
            extract_subject_box(&empty, &exact_params()).rect,
            Rect::new(0, 0, 18, 12)
        );

        let mask = block_mask(12, 18, 2..4, 2..4);
        let loose = SubjectBoundsParams {
            tight: false,
            ..Default::default()
        };
        assert_eq!(extract_subject_box(&mask, &loose).rect, Rect::new(0, 0, 18, 12));
    }

    #[test]
    fn trimmed_quantiles_ignore_stray_pixels() {
        let mut data = Array2::zeros((100, 100));
        for y in 30..70 {
            for x in 40..60 {
                data[[y, x]] = 1.0;
            }
        }
        data[[2, 95]] = 1.0;
        let mask = Mask::new(data).unwrap();
        let params = SubjectBoundsParams {
            polarity: Polarity::Foreground,
            ..Default::default()
        };
        let rect = extract_subject_box(&mask, &params).rect;
        assert_eq!(rect, Rect::new(40, 30, 20, 40));
    }
}
