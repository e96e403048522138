//! Integer geometry shared by every component: crop rectangles, per-edge trims,
//! and aspect-ratio candidates.
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Axis-aligned pixel rectangle. `x + w <= W` and `y + h <= H` for the image it
/// was produced against; `w` and `h` are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Rect {
    pub fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        Self { x, y, w, h }
    }

    /// The whole `width` x `height` frame.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width.max(1), height.max(1))
    }

    pub fn right(&self) -> usize {
        self.x + self.w
    }

    pub fn bottom(&self) -> usize {
        self.y + self.h
    }

    pub fn area(&self) -> usize {
        self.w * self.h
    }

    pub fn ratio(&self) -> f64 {
        self.w as f64 / self.h.max(1) as f64
    }

    pub fn fits_in(&self, width: usize, height: usize) -> bool {
        self.w >= 1 && self.h >= 1 && self.right() <= width && self.bottom() <= height
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn is_full_frame(&self, width: usize, height: usize) -> bool {
        self.x == 0 && self.y == 0 && self.w == width && self.h == height
    }

    /// Grow by `pad` on every side, clamped to the frame.
    pub fn padded(&self, pad: usize, width: usize, height: usize) -> Rect {
        let x = self.x.saturating_sub(pad);
        let y = self.y.saturating_sub(pad);
        let r = (self.right() + pad).min(width);
        let b = (self.bottom() + pad).min(height);
        Rect::new(x, y, r.saturating_sub(x).max(1), b.saturating_sub(y).max(1))
    }

    pub fn ensure_fits(&self, width: usize, height: usize) -> Result<()> {
        if self.fits_in(width, height) {
            Ok(())
        } else {
            Err(Error::InvalidRect {
                rect: self.to_string(),
                width,
                height,
            })
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{},{})", self.x, self.y, self.w, self.h)
    }
}

/// Rows/columns trimmed from each edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeBand {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

impl EdgeBand {
    pub fn is_empty(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }

    /// Rectangle left after removing the band from a `width` x `height` frame.
    pub fn inner_rect(&self, width: usize, height: usize) -> Rect {
        let x = self.left.min(width.saturating_sub(1));
        let y = self.top.min(height.saturating_sub(1));
        let w = width.saturating_sub(self.left + self.right).max(1);
        let h = height.saturating_sub(self.top + self.bottom).max(1);
        Rect::new(x, y, w.min(width - x), h.min(height - y))
    }
}

/// One allowed aspect ratio (`width / height`). A candidate may carry a target
/// resolution; selection then measures scale against that resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectCandidate {
    pub ratio: f64,
    pub label: String,
    pub target: Option<(usize, usize)>,
}

impl AspectCandidate {
    pub fn new(ratio: f64, label: impl Into<String>) -> Self {
        Self {
            ratio,
            label: label.into(),
            target: None,
        }
    }

    pub fn from_parts(w: f64, h: f64) -> Option<Self> {
        if !(w > 0.0 && h > 0.0) || !w.is_finite() || !h.is_finite() {
            return None;
        }
        Some(Self::new(w / h, format!("{}:{}", w as i64, h as i64)))
    }

    /// Candidate pinned to an exact output resolution.
    pub fn with_target(width: usize, height: usize, label: impl Into<String>) -> Self {
        Self {
            ratio: width as f64 / height.max(1) as f64,
            label: label.into(),
            target: Some((width, height)),
        }
    }

    pub fn target_area(&self) -> usize {
        self.target.map(|(w, h)| w * h).unwrap_or(0)
    }
}

pub const DEFAULT_ASPECTS: &str = "2:3,3:4,1:1,9:16,16:9,5:8,8:5";

/// Parse a comma-separated aspect list (`2:3`, `16x9`, `4X5`). Invalid entries are
/// skipped; an empty result falls back to 2:3.
pub fn parse_aspects(csv: &str) -> Vec<AspectCandidate> {
    let mut out = Vec::new();
    for part in csv.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let pair = if let Some((a, b)) = part.split_once(':') {
            Some((a, b))
        } else {
            part.split_once(['x', 'X'])
        };
        let Some((a, b)) = pair else { continue };
        let (Ok(a), Ok(b)) = (a.trim().parse::<f64>(), b.trim().parse::<f64>()) else {
            continue;
        };
        if let Some(cand) = AspectCandidate::from_parts(a, b) {
            out.push(cand);
        }
    }
    if out.is_empty() {
        out.push(AspectCandidate::new(2.0 / 3.0, "2:3"));
    }
    out
}
