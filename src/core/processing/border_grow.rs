use std::collections::VecDeque;

use ndarray::{Array2, Array3, Axis};
use tracing::{debug, info, warn};

use crate::core::buffer::{Image, Mask};
use crate::core::geometry::Rect;
use crate::core::params::BorderGrowParams;
use crate::types::FuzzMode;

/// Binary border mask grown inward from the image edges.
#[derive(Debug, Clone)]
pub struct BorderGrowth {
    /// `true` where the pixel belongs to the border/background region.
    pub mask: Array2<bool>,
    /// Per-channel median of the edge strips (one entry in luma mode).
    pub edge_color: Vec<f32>,
    /// Per-channel median absolute deviation of the edge strips.
    pub edge_spread: Vec<f32>,
    /// L1 distance limit used for eligibility.
    pub threshold: f32,
    /// Number of expansion rounds performed.
    pub iterations: usize,
}

impl BorderGrowth {
    pub fn covered_pixels(&self) -> usize {
        self.mask.iter().filter(|&&b| b).count()
    }

    /// True when the border swallowed the whole frame; callers treat this as "no crop".
    pub fn is_full_frame(&self) -> bool {
        self.mask.iter().all(|&b| b)
    }

    pub fn to_mask(&self) -> Mask {
        Mask::from_binary(&self.mask)
    }
}

/// Lower median, matching the behaviour of a sort-and-pick on an even count.
fn lower_median(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mid = (values.len() - 1) / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    *m
}

/// Collect the pixels of the four edge strips (corners appear twice, as in the
/// strip-wise concatenation the statistics are defined on).
fn edge_samples(work: &Array3<f32>, margin: usize) -> Vec<Vec<f32>> {
    let (h, w, c) = work.dim();
    let my = margin.min(h);
    let mx = margin.min(w);
    let mut per_channel = vec![Vec::with_capacity(2 * (my * w + mx * h)); c];

    let mut push = |y: usize, x: usize| {
        for (ch, samples) in per_channel.iter_mut().enumerate() {
            samples.push(work[[y, x, ch]]);
        }
    };
    for y in 0..my {
        for x in 0..w {
            push(y, x);
        }
    }
    for y in h - my..h {
        for x in 0..w {
            push(y, x);
        }
    }
    for y in 0..h {
        for x in 0..mx {
            push(y, x);
        }
    }
    for y in 0..h {
        for x in w - mx..w {
            push(y, x);
        }
    }
    per_channel
}

/// Robust edge colour and spread: per-channel median and MAD of the edge strips.
pub fn edge_statistics(work: &Array3<f32>, margin: usize) -> (Vec<f32>, Vec<f32>) {
    let mut samples = edge_samples(work, margin);
    let mut medians = Vec::with_capacity(samples.len());
    let mut spreads = Vec::with_capacity(samples.len());
    for channel in samples.iter_mut() {
        let med = lower_median(channel);
        let mut deviations: Vec<f32> = channel.iter().map(|v| (v - med).abs()).collect();
        let mad = lower_median(&mut deviations) + 1e-6;
        medians.push(med);
        spreads.push(mad);
    }
    (medians, spreads)
}

fn seed_mask(height: usize, width: usize, margin: usize) -> Array2<bool> {
    let my = margin.min(height);
    let mx = margin.min(width);
    Array2::from_shape_fn((height, width), |(y, x)| {
        y < my || y >= height - my || x < mx || x >= width - mx
    })
}

/// Grow the border region from a seed strip of `edge_margin_px` on every side.
///
/// A pixel is eligible when the summed absolute channel distance to the edge
/// median is within the summed per-channel tolerance. Each round adds the
/// eligible 8-neighbours of the current frontier; the mask never shrinks and the
/// loop stops at a fixed point or after `max_growth_iter` rounds.
pub fn grow_border_mask(image: &Image, params: &BorderGrowParams) -> BorderGrowth {
    let work = if params.use_luma_only {
        image.luma().insert_axis(Axis(2))
    } else {
        image.data().clone()
    };
    let (h, w, channels) = work.dim();
    let margin = params.edge_margin_px.max(1);

    let (edge_color, edge_spread) = edge_statistics(&work, margin);

    let base = (params.fuzz_percent / 100.0) as f32;
    let threshold: f32 = edge_spread
        .iter()
        .map(|&mad| {
            let t = match params.fuzz_mode {
                FuzzMode::Percent => base,
                FuzzMode::Adaptive => base + params.adaptive_k as f32 * mad,
            };
            t.clamp(0.0, 1.0)
        })
        .sum();

    let eligible = Array2::from_shape_fn((h, w), |(y, x)| {
        let dist: f32 = (0..channels)
            .map(|ch| (work[[y, x, ch]] - edge_color[ch]).abs())
            .sum();
        dist <= threshold
    });

    let mut mask = seed_mask(h, w, margin);
    let mut frontier: VecDeque<(usize, usize)> = mask
        .indexed_iter()
        .filter_map(|(idx, &b)| if b { Some(idx) } else { None })
        .collect();

    let mut iterations = 0;
    while !frontier.is_empty() && iterations < params.max_growth_iter {
        let mut next = VecDeque::new();
        for (y, x) in frontier.drain(..) {
            let y0 = y.saturating_sub(1);
            let x0 = x.saturating_sub(1);
            let y1 = (y + 1).min(h - 1);
            let x1 = (x + 1).min(w - 1);
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    if !mask[[ny, nx]] && eligible[[ny, nx]] {
                        mask[[ny, nx]] = true;
                        next.push_back((ny, nx));
                    }
                }
            }
        }
        if next.is_empty() {
            break;
        }
        iterations += 1;
        frontier = next;
    }

    let growth = BorderGrowth {
        mask,
        edge_color,
        edge_spread,
        threshold,
        iterations,
    };
    debug!(
        threshold,
        iterations,
        covered = growth.covered_pixels(),
        total = h * w,
        "Border growth finished"
    );
    if growth.is_full_frame() {
        warn!("Border mask covers the whole frame; treating as no crop");
    }
    growth
}

/// Bounding box of the non-border pixels, expanded by `pad` and clamped.
/// An image with no non-border pixel yields the full frame.
pub fn content_box(border: &Array2<bool>, pad: usize) -> Rect {
    let (h, w) = border.dim();
    let rows: Vec<usize> = (0..h)
        .filter(|&y| border.row(y).iter().any(|&b| !b))
        .collect();
    let cols: Vec<usize> = (0..w)
        .filter(|&x| border.column(x).iter().any(|&b| !b))
        .collect();

    let (Some(&top), Some(&bottom), Some(&left), Some(&right)) =
        (rows.first(), rows.last(), cols.first(), cols.last())
    else {
        return Rect::full(w, h);
    };

    let l = left.saturating_sub(pad);
    let t = top.saturating_sub(pad);
    let r = w.min(right + 1 + pad);
    let b = h.min(bottom + 1 + pad);
    Rect::new(l, t, (r - l).max(1), (b - t).max(1))
}

/// Drop one column/row from odd dimensions greater than one.
pub fn snap_even(rect: Rect) -> Rect {
    let w = if rect.w % 2 == 1 && rect.w > 1 { rect.w - 1 } else { rect.w };
    let h = if rect.h % 2 == 1 && rect.h > 1 { rect.h - 1 } else { rect.h };
    Rect::new(rect.x, rect.y, w, h)
}

/// Grow the border and return the even-sized content rectangle alongside the growth.
pub fn detect_border_box(image: &Image, params: &BorderGrowParams) -> (Rect, BorderGrowth) {
    let growth = grow_border_mask(image, params);
    let raw = content_box(&growth.mask, params.pad_px);
    let rect = snap_even(raw);
    info!(
        mode = %params.fuzz_mode,
        rect = %rect,
        iterations = growth.iterations,
        "Border content box computed"
    );
    (rect, growth)
}
