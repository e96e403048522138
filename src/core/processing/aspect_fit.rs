use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::geometry::{AspectCandidate, Rect, parse_aspects};
use crate::core::params::AspectFitParams;
use crate::error::{Error, Result};
use crate::types::{AspectMatch, HorizontalGravity};

/// Lexicographic ranking key; smaller is better.
///
/// `[max axis scale deviation, area change, mean axis scale deviation,
///   ratio error, drift from the source ratio, target area]`
pub type FitCost = [f64; 6];

fn compare_cost(a: &FitCost, b: &FitCost) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// `ceil` that ignores float noise just above an integer.
fn ceil_px(v: f64) -> usize {
    (v - 1e-9).ceil().max(1.0) as usize
}

fn clamp_origin(origin: f64, size: usize, limit: usize) -> usize {
    let max = limit.saturating_sub(size) as f64;
    origin.round().clamp(0.0, max) as usize
}

/// Smallest rectangle of ratio `ratio` (w/h) that contains `seed`, centred on it
/// and shifted into the `width` x `height` frame. `None` when it cannot fit.
pub fn covering_rect(seed: Rect, ratio: f64, width: usize, height: usize) -> Option<Rect> {
    if !(ratio > 0.0) || !ratio.is_finite() {
        return None;
    }
    let (w, h) = (seed.w.max(1), seed.h.max(1));

    let wa = w.max(ceil_px(h as f64 * ratio));
    let ha = ceil_px(wa as f64 / ratio);
    let hb = h.max(ceil_px(w as f64 / ratio));
    let wb = ceil_px(hb as f64 * ratio);

    let (cw, ch) = [(wa, ha), (wb, hb)]
        .into_iter()
        .filter(|&(cw, ch)| cw <= width && ch <= height)
        .min_by_key(|&(cw, ch)| cw * ch)?;

    let cx = seed.x as f64 + w as f64 / 2.0;
    let cy = seed.y as f64 + h as f64 / 2.0;
    let x = clamp_origin(cx - cw as f64 / 2.0, cw, width);
    let y = clamp_origin(cy - ch as f64 / 2.0, ch, height);
    Some(Rect::new(x, y, cw, ch))
}

/// Seed pre-expansion in pixels for a `width` x `height` image.
pub fn seed_pad(width: usize, height: usize, params: &AspectFitParams) -> usize {
    let scaled = (params.seed_pad_fraction * width.min(height) as f64).round() as usize;
    params.seed_pad_min_px.max(scaled)
}

/// The winning candidate of a multi-ratio search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectChoice {
    pub rect: Rect,
    pub candidate: AspectCandidate,
    pub cost: FitCost,
}

fn cost_against(rect: Rect, reference: (f64, f64), source_ratio: f64, cand: &AspectCandidate) -> FitCost {
    let (ref_w, ref_h) = reference;
    let scale_w = (rect.w as f64 / ref_w.max(1.0) - 1.0).abs();
    let scale_h = (rect.h as f64 / ref_h.max(1.0) - 1.0).abs();
    let area_change = (1.0 - rect.area() as f64 / (ref_w * ref_h).max(1.0)).abs();
    [
        scale_w.max(scale_h),
        area_change,
        (scale_w + scale_h) * 0.5,
        (rect.ratio() - cand.ratio).abs(),
        (rect.ratio() - source_ratio).abs(),
        cand.target_area() as f64,
    ]
}

/// Rank the covering rectangle of every candidate around `seed` and keep the
/// smallest cost. Candidates that cannot fit the frame are skipped.
pub fn select_covering(
    seed: Rect,
    candidates: &[AspectCandidate],
    width: usize,
    height: usize,
) -> Result<AspectChoice> {
    let reference = (seed.w as f64, seed.h as f64);
    let mut best: Option<AspectChoice> = None;

    for cand in candidates {
        let Some(rect) = covering_rect(seed, cand.ratio, width, height) else {
            debug!(label = %cand.label, "Aspect candidate does not fit");
            continue;
        };
        let cost = cost_against(rect, reference, seed.ratio(), cand);
        debug!(label = %cand.label, rect = %rect, ?cost, "Aspect candidate");
        let better = best
            .as_ref()
            .map_or(true, |b| compare_cost(&cost, &b.cost) == Ordering::Less);
        if better {
            best = Some(AspectChoice {
                rect,
                candidate: cand.clone(),
                cost,
            });
        }
    }

    match best {
        Some(choice) => {
            info!(label = %choice.candidate.label, rect = %choice.rect, "Covering aspect selected");
            Ok(choice)
        }
        None => {
            warn!(width, height, seed = %seed, "No candidate aspect fits the image");
            Err(Error::NoFeasibleAspect { width, height })
        }
    }
}

/// Candidate whose ratio is closest to `target` in log space.
pub fn closest_candidate(target: f64, candidates: &[AspectCandidate]) -> Option<&AspectCandidate> {
    let target = target.max(f64::MIN_POSITIVE).ln();
    candidates
        .iter()
        .filter(|c| c.ratio > 0.0)
        .map(|c| ((c.ratio.ln() - target).abs(), c))
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c)
}

/// Margins in pixels that the placement tried to honour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitMargins {
    pub head: f64,
    pub foot: f64,
    pub side: f64,
}

/// Head-safe placement result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub rect: Rect,
    pub label: String,
    pub ratio: f64,
    /// Requested headroom that could not be given, in pixels.
    pub head_violation: f64,
    /// Requested footroom that could not be given, in pixels.
    pub foot_violation: f64,
    pub margins: FitMargins,
}

/// Size of the ratio-exact box covering a `w` x `h` region, in float pixels.
fn cover_exact(w: f64, h: f64, ratio: f64) -> (f64, f64) {
    if w / h.max(1.0) >= ratio {
        (w, w / ratio)
    } else {
        (h * ratio, h)
    }
}

/// Pick the closest allowed aspect and place a crop around `seed` that keeps
/// headroom above and footroom below the subject.
///
/// Margins are first sized against the image height, then re-sized once against
/// the resulting box so they scale with the crop instead of the image. The
/// vertical offset is chosen among four anchors (requested headroom, requested
/// footroom, image top, image bottom) by the weighted margin shortfall; the
/// horizontal offset follows `gravity`. A crop larger than the image is scaled
/// down on both sides, so the result keeps the chosen ratio up to rounding and the
/// lost margin shows up in the reported violations, measured on the final rect.
pub fn fit_head_safe(
    seed: Rect,
    width: usize,
    height: usize,
    params: &AspectFitParams,
) -> Result<FitResult> {
    seed.ensure_fits(width, height)?;
    let candidates = parse_aspects(&params.aspects);
    let target = match params.match_to {
        AspectMatch::Image => width as f64 / height.max(1) as f64,
        AspectMatch::Box => seed.ratio(),
    };
    let chosen = closest_candidate(target, &candidates)
        .ok_or(Error::NoFeasibleAspect { width, height })?;
    let ratio = chosen.ratio;

    let (img_w, img_h) = (width as f64, height as f64);
    let (sx, sy, sw, sh) = (seed.x as f64, seed.y as f64, seed.w as f64, seed.h as f64);

    let size_with = |margins: FitMargins| {
        let x0 = sx - margins.side;
        let x1 = sx + sw + margins.side;
        let y0 = sy - margins.head;
        let y1 = sy + sh + margins.foot;
        cover_exact((x1 - x0).max(1.0), (y1 - y0).max(1.0), ratio)
    };

    let (guess_w, guess_h) = size_with(FitMargins {
        head: params.headroom_ratio * img_h,
        foot: params.footroom_ratio * img_h,
        side: params.side_margin_ratio * img_h * ratio,
    });
    let margins = FitMargins {
        head: params.headroom_ratio * guess_h,
        foot: params.footroom_ratio * guess_h,
        side: params.side_margin_ratio * guess_w,
    };
    let (cw, ch) = size_with(margins);
    // Uniform shrink so an oversized crop keeps the chosen ratio.
    let shrink = (img_w / cw).min(img_h / ch).min(1.0);
    if shrink < 1.0 {
        debug!(shrink, "Crop larger than the image; shrinking both sides");
    }
    let (cw, ch) = (cw * shrink, ch * shrink);

    let xa = match params.gravity {
        HorizontalGravity::Left => 0.0,
        HorizontalGravity::Right => img_w - cw,
        HorizontalGravity::Center => sx + sw / 2.0 - cw / 2.0,
    };
    let xa = xa.min(img_w - cw).max(0.0);

    let clamp_y = |v: f64| v.min(img_h - ch).max(0.0);
    let top_wanted = sy - margins.head;
    let bottom_wanted = sy + sh + margins.foot;
    let shortfall = |top: f64, bottom: f64| {
        ((top - top_wanted).max(0.0), (bottom_wanted - bottom).max(0.0))
    };
    let weight = params.bottom_priority;

    let anchors = [
        clamp_y(top_wanted),
        clamp_y(bottom_wanted - ch),
        0.0,
        img_h - ch,
    ];
    let mut best_top = anchors[0];
    let mut best_cost = f64::INFINITY;
    for top in anchors {
        let (head, foot) = shortfall(top, top + ch);
        let cost = (1.0 - weight) * head + weight * foot;
        if cost < best_cost {
            best_cost = cost;
            best_top = top;
        }
    }
    let ya = clamp_y(best_top);

    let w = (cw.round().max(1.0) as usize).min(width);
    let h = (ch.round().max(1.0) as usize).min(height);
    let x = (xa.round().max(0.0) as usize).min(width - w);
    let y = (ya.round().max(0.0) as usize).min(height - h);
    let rect = Rect::new(x, y, w, h);
    let (head_violation, foot_violation) = shortfall(rect.y as f64, rect.bottom() as f64);

    debug!(
        head = margins.head,
        foot = margins.foot,
        side = margins.side,
        head_violation,
        foot_violation,
        "Head-safe placement"
    );
    info!(label = %chosen.label, rect = %rect, "Aspect fit complete");

    Ok(FitResult {
        rect,
        label: chosen.label.clone(),
        ratio,
        head_violation,
        foot_violation,
        margins,
    })
}

/// Largest crop of ratio `ratio` inside a `width` x `height` frame.
pub fn inscribed_dims(width: usize, height: usize, ratio: f64) -> (usize, usize) {
    if !(ratio > 0.0) || height == 0 {
        return (width, height);
    }
    if width as f64 / height as f64 > ratio {
        let w = ((height as f64 * ratio).round() as usize).clamp(1, width);
        (w, height)
    } else {
        let h = ((width as f64 / ratio).round() as usize).clamp(1, height);
        (width, h)
    }
}

/// Centred whole-frame crop for the candidate that loses the least.
///
/// Scale terms are measured against the candidate's target resolution when it
/// has one, otherwise against the source frame.
pub fn select_inscribed(
    width: usize,
    height: usize,
    candidates: &[AspectCandidate],
) -> Result<AspectChoice> {
    if width == 0 || height == 0 {
        return Err(Error::NoFeasibleAspect { width, height });
    }
    let source_ratio = width as f64 / height as f64;
    let mut best: Option<AspectChoice> = None;

    for cand in candidates {
        let (w, h) = inscribed_dims(width, height, cand.ratio);
        let rect = Rect::new((width - w) / 2, (height - h) / 2, w, h);
        let reference = match cand.target {
            Some((tw, th)) => (tw as f64, th as f64),
            None => (width as f64, height as f64),
        };
        // Scale is target over crop here, the inverse of the covering case.
        let scale_w = (reference.0 / w as f64 - 1.0).abs();
        let scale_h = (reference.1 / h as f64 - 1.0).abs();
        let area_loss = (1.0 - rect.area() as f64 / (width * height) as f64).clamp(0.0, 1.0);
        let cost = [
            scale_w.max(scale_h),
            area_loss,
            (scale_w + scale_h) * 0.5,
            (rect.ratio() - cand.ratio).abs(),
            (rect.ratio() - source_ratio).abs(),
            cand.target_area() as f64,
        ];
        debug!(label = %cand.label, rect = %rect, ?cost, "Inscribed candidate");
        let better = best
            .as_ref()
            .map_or(true, |b| compare_cost(&cost, &b.cost) == Ordering::Less);
        if better {
            best = Some(AspectChoice {
                rect,
                candidate: cand.clone(),
                cost,
            });
        }
    }

    let choice = best.ok_or(Error::NoFeasibleAspect { width, height })?;
    info!(label = %choice.candidate.label, rect = %choice.rect, "Inscribed aspect selected");
    Ok(choice)
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn ratio_label(w: usize, h: usize) -> String {
    let g = gcd(w, h).max(1);
    format!("{}:{}", w / g, h / g)
}

/// Resolution table for flow-matching image models, portrait entries first,
/// each followed by its landscape counterpart. Duplicates (squares) appear once.
pub fn flux_targets() -> Vec<AspectCandidate> {
    const BASE: [(usize, usize, Option<&str>); 10] = [
        (896, 1152, None),
        (832, 1216, None),
        (768, 1344, None),
        (640, 1536, Some("9:21")),
        (1024, 1024, None),
        (1152, 1728, None),
        (1216, 1664, None),
        (1088, 1920, None),
        (960, 2176, Some("9:21")),
        (1408, 1408, None),
    ];

    let mut out: Vec<AspectCandidate> = Vec::new();
    for (w, h, label) in BASE {
        let swapped = label.and_then(|l| l.split_once(':')).map(|(a, b)| format!("{b}:{a}"));
        let variants = [
            (w, h, label.map(str::to_string)),
            (h, w, swapped),
        ];
        for (tw, th, ratio) in variants {
            if out.iter().any(|c| c.target == Some((tw, th))) {
                continue;
            }
            let ratio = ratio.unwrap_or_else(|| ratio_label(tw, th));
            out.push(AspectCandidate::with_target(tw, th, format!("{tw}x{th} ({ratio})")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_cover(seed: Rect, ratio: f64, width: usize, height: usize) -> Rect {
        let rect = covering_rect(seed, ratio, width, height).unwrap();
        assert!(rect.contains(&seed), "{rect} misses {seed}");
        assert!(rect.fits_in(width, height));
        // Ratio holds within one pixel of rounding on the derived side.
        let derived_h = rect.w as f64 / ratio;
        let derived_w = rect.h as f64 * ratio;
        assert!((derived_h - rect.h as f64).abs() <= 1.0 || (derived_w - rect.w as f64).abs() <= 1.0);
        rect
    }

    #[test]
    fn cover_contains_seed_and_matches_ratio() {
        let seed = Rect::new(40, 30, 20, 60);
        let rect = assert_cover(seed, 1.0, 200, 200);
        assert_eq!((rect.w, rect.h), (60, 60));
        assert!(rect.contains(&seed));

        // Keeping the height and widening beats widening and rounding the height up.
        let rect = assert_cover(seed, 16.0 / 9.0, 200, 200);
        assert_eq!(rect, Rect::new(0, 30, 107, 60));
    }

    #[test]
    fn cover_is_minimal() {
        let seed = Rect::new(10, 10, 30, 30);
        let rect = covering_rect(seed, 2.0 / 3.0, 300, 300).unwrap();
        assert_eq!((rect.w, rect.h), (30, 45));
        // Any narrower width cannot hold the seed; any shorter height breaks the ratio.
        assert!(rect.w >= seed.w && rect.h >= seed.h);
    }

    #[test]
    fn cover_is_shifted_into_frame() {
        let seed = Rect::new(0, 0, 20, 20);
        let rect = covering_rect(seed, 2.0, 100, 100).unwrap();
        assert_eq!(rect, Rect::new(0, 0, 40, 20));
        assert!(covering_rect(Rect::new(0, 0, 90, 90), 2.0, 100, 100).is_none());
    }

    #[test]
    fn selection_prefers_least_distortion() {
        let seed = Rect::new(100, 100, 200, 300);
        let cands = parse_aspects("1:1,2:3,16:9");
        let choice = select_covering(seed, &cands, 1000, 1000).unwrap();
        assert_eq!(choice.candidate.label, "2:3");
        assert_eq!(choice.rect, seed);
    }

    #[test]
    fn selection_fails_when_nothing_fits() {
        let seed = Rect::new(0, 0, 100, 100);
        let cands = parse_aspects("16:9");
        assert!(matches!(
            select_covering(seed, &cands, 100, 100),
            Err(Error::NoFeasibleAspect { .. })
        ));
    }

    #[test]
    fn closest_uses_log_distance() {
        let cands = parse_aspects("1:2,2:1,1:1");
        assert_eq!(closest_candidate(0.6, &cands).unwrap().label, "1:2");
        assert_eq!(closest_candidate(1.2, &cands).unwrap().label, "1:1");
    }

    #[test]
    fn head_safe_respects_headroom_and_bounds() {
        let params = AspectFitParams {
            aspects: "2:3".to_string(),
            ..Default::default()
        };
        let seed = Rect::new(400, 300, 200, 300);
        let fit = fit_head_safe(seed, 1000, 1000, &params).unwrap();
        assert_eq!(fit.label, "2:3");
        assert!(fit.rect.fits_in(1000, 1000));
        assert!(fit.rect.contains(&seed));
        // Only integer rounding of the placement can eat into the margins.
        assert!(fit.head_violation < 1.0);
        assert!(fit.foot_violation < 1.0);
        assert!(fit.rect.y + fit.margins.head.floor() as usize <= seed.y);
        assert!((fit.rect.ratio() - 2.0 / 3.0).abs() < 0.01);
    }

    #[test]
    fn head_safe_prefers_footroom_near_bottom_edge() {
        let params = AspectFitParams {
            aspects: "1:1".to_string(),
            bottom_priority: 1.0,
            ..Default::default()
        };
        // Subject touches the bottom edge: footroom cannot be honoured, so the crop is
        // pinned to the bottom.
        let seed = Rect::new(100, 150, 100, 50);
        let fit = fit_head_safe(seed, 400, 200, &params).unwrap();
        assert!(fit.rect.fits_in(400, 200));
        assert_eq!(fit.rect.bottom(), 200);
        assert!(fit.foot_violation > 0.0);
    }

    #[test]
    fn head_safe_gravity_and_oversized_crop() {
        let params = AspectFitParams {
            aspects: "16:9".to_string(),
            gravity: HorizontalGravity::Left,
            ..Default::default()
        };
        let seed = Rect::new(50, 0, 60, 100);
        let fit = fit_head_safe(seed, 120, 100, &params).unwrap();
        assert_eq!(fit.rect.x, 0);
        assert!(fit.rect.fits_in(120, 100));
        assert!(ratio_within_rounding(fit.rect, fit.ratio), "{} lost 16:9", fit.rect);
    }

    fn ratio_within_rounding(rect: Rect, ratio: f64) -> bool {
        (rect.w as f64 - rect.h as f64 * ratio).abs() <= 0.5 + 0.5 * ratio + 1e-9
    }

    #[test]
    fn full_frame_seed_keeps_ratio_and_reports_lost_margins() {
        let params = AspectFitParams::default();
        for seed in [Rect::new(0, 0, 300, 200), Rect::new(20, 20, 260, 160)] {
            let fit = fit_head_safe(seed, 300, 200, &params).unwrap();
            assert_eq!(fit.label, "8:5");
            assert!(fit.rect.fits_in(300, 200));
            assert!(ratio_within_rounding(fit.rect, fit.ratio), "{} is not 8:5", fit.rect);
        }

        let fit = fit_head_safe(Rect::new(0, 0, 300, 200), 300, 200, &params).unwrap();
        assert_eq!((fit.rect.x, fit.rect.w), (0, 300));
        assert!((187..=188).contains(&fit.rect.h));
        assert!(fit.head_violation > 0.0);
        assert!(fit.foot_violation > 0.0);
        let lost = fit.margins.head + fit.margins.foot + (200 - fit.rect.h) as f64;
        assert!((fit.head_violation + fit.foot_violation - lost).abs() < 1e-6);
    }

    #[test]
    fn inscribed_crop_for_targets() {
        assert_eq!(inscribed_dims(1920, 1080, 1.0), (1080, 1080));
        assert_eq!(inscribed_dims(1000, 2000, 0.75), (1000, 1333));

        let targets = flux_targets();
        assert_eq!(targets.len(), 18);
        assert!(targets.iter().any(|t| t.label == "2176x960 (21:9)"));

        let choice = select_inscribed(1024, 1024, &targets).unwrap();
        assert_eq!(choice.candidate.target, Some((1024, 1024)));
        assert_eq!(choice.rect, Rect::new(0, 0, 1024, 1024));
    }
}
