//! Pixel buffers handed to the engine by collaborators.
//!
//! `Image` is an `H x W x 3` float grid in [0,1]; `Mask` is an `H x W` float grid
//! in [0,1]. Both are normalized once on entry so every algorithm can assume the
//! shape and value range. Cropping is plain sub-buffer extraction.
use ndarray::{Array2, Array3, ArrayD, Axis, Ix2, Ix3, s};
use serde::{Deserialize, Serialize};

use crate::core::geometry::Rect;
use crate::error::{Error, Result};

/// Rec.709 luma weights.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Array3<f32>,
}

impl Image {
    /// Wrap an `H x W x 3` array, clamping values into [0,1].
    pub fn new(data: Array3<f32>) -> Result<Self> {
        let (h, w, c) = data.dim();
        if c != 3 || h == 0 || w == 0 {
            return Err(Error::invalid_shape("[H,W,3] with H,W > 0", data.shape()));
        }
        Ok(Self {
            data: data.mapv_into(|v| v.clamp(0.0, 1.0)),
        })
    }

    /// Accept `[H,W,C]` or `[1,H,W,C]`. One channel is replicated to RGB, extra
    /// channels (alpha) are dropped.
    pub fn from_array(data: ArrayD<f32>) -> Result<Self> {
        match data.ndim() {
            3 => Self::from_channels(into_ix3(data)?),
            4 => {
                let batch = data.shape()[0];
                if batch != 1 {
                    return Err(Error::BatchNotSupported { batch });
                }
                let single = data.index_axis_move(Axis(0), 0);
                Self::from_channels(into_ix3(single)?)
            }
            _ => Err(Error::invalid_shape("[H,W,C] or [1,H,W,C]", data.shape())),
        }
    }

    /// Split a `[B,H,W,C]` (or `[H,W,C]`) array into normalized images.
    pub fn batch_from_array(data: ArrayD<f32>) -> Result<Vec<Self>> {
        match data.ndim() {
            3 => Ok(vec![Self::from_channels(into_ix3(data)?)?]),
            4 => {
                if data.shape()[0] == 0 {
                    return Err(Error::EmptyBatch);
                }
                data.outer_iter()
                    .map(|view| Self::from_channels(into_ix3(view.to_owned())?))
                    .collect()
            }
            _ => Err(Error::invalid_shape("[B,H,W,C]", data.shape())),
        }
    }

    fn from_channels(data: Array3<f32>) -> Result<Self> {
        let (h, w, c) = data.dim();
        match c {
            3 => Self::new(data),
            1 => {
                let plane = data.index_axis(Axis(2), 0);
                let rgb = Array3::from_shape_fn((h, w, 3), |(y, x, _)| plane[[y, x]]);
                Self::new(rgb)
            }
            c if c > 3 => Self::new(data.slice(s![.., .., 0..3]).to_owned()),
            _ => Err(Error::invalid_shape("1, 3 or 4 channels", data.shape())),
        }
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    /// `(width, height)`
    pub fn dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }

    /// Luma plane, `H x W`.
    pub fn luma(&self) -> Array2<f32> {
        let (h, w, _) = self.data.dim();
        Array2::from_shape_fn((h, w), |(y, x)| {
            LUMA_WEIGHTS[0] * self.data[[y, x, 0]]
                + LUMA_WEIGHTS[1] * self.data[[y, x, 1]]
                + LUMA_WEIGHTS[2] * self.data[[y, x, 2]]
        })
    }

    /// Owned copy of the pixels inside `rect`.
    pub fn crop(&self, rect: Rect) -> Result<Image> {
        rect.ensure_fits(self.width(), self.height())?;
        let view = self
            .data
            .slice(s![rect.y..rect.bottom(), rect.x..rect.right(), ..]);
        Ok(Image {
            data: view.to_owned(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    data: Array2<f32>,
}

impl Mask {
    /// Wrap an `H x W` array, clamping values into [0,1].
    pub fn new(data: Array2<f32>) -> Result<Self> {
        let (h, w) = data.dim();
        if h == 0 || w == 0 {
            return Err(Error::invalid_shape("[H,W] with H,W > 0", data.shape()));
        }
        Ok(Self {
            data: data.mapv_into(|v| v.clamp(0.0, 1.0)),
        })
    }

    /// 0/1 mask from a boolean grid.
    pub fn from_binary(bits: &Array2<bool>) -> Self {
        Self {
            data: bits.mapv(|b| if b { 1.0 } else { 0.0 }),
        }
    }

    /// Accept masks in the loose shapes collaborators hand over: unit axes are
    /// squeezed, a remaining channel axis is reduced by max, and 0..255 data is
    /// rescaled to [0,1].
    pub fn from_array(data: ArrayD<f32>) -> Result<Self> {
        let original = data.shape().to_vec();
        let mut arr = data;
        while arr.ndim() > 2 {
            match arr.shape().iter().position(|&d| d == 1) {
                Some(axis) => arr = arr.index_axis_move(Axis(axis), 0),
                None => break,
            }
        }
        let plane: Array2<f32> = match arr.ndim() {
            2 => arr
                .into_dimensionality::<Ix2>()
                .map_err(|_| Error::invalid_shape("[H,W]", &original))?,
            3 => {
                let lead = arr.shape()[0];
                let axis = if matches!(lead, 1 | 3 | 4) { Axis(0) } else { Axis(2) };
                arr.fold_axis(axis, f32::NEG_INFINITY, |&acc, &v| acc.max(v))
                    .into_dimensionality::<Ix2>()
                    .map_err(|_| Error::invalid_shape("[H,W]", &original))?
            }
            _ => return Err(Error::invalid_shape("[H,W] or [C,H,W]", &original)),
        };
        let max = plane.iter().cloned().fold(0.0f32, f32::max);
        let plane = if max > 1.5 {
            plane.mapv_into(|v| v / 255.0)
        } else {
            plane
        };
        Self::new(plane)
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }

    /// `1 - m` for every pixel.
    pub fn complement(&self) -> Mask {
        Mask {
            data: self.data.mapv(|v| 1.0 - v),
        }
    }

    pub fn crop(&self, rect: Rect) -> Result<Mask> {
        rect.ensure_fits(self.width(), self.height())?;
        let view = self.data.slice(s![rect.y..rect.bottom(), rect.x..rect.right()]);
        Ok(Mask {
            data: view.to_owned(),
        })
    }
}

fn into_ix3(data: ArrayD<f32>) -> Result<Array3<f32>> {
    let shape = data.shape().to_vec();
    data.into_dimensionality::<Ix3>()
        .map_err(|_| Error::invalid_shape("[H,W,C]", &shape))
}

/// Pixel margins removed from each side, with optional snapping of the kept size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

/// Rectangle left after removing `margins` from a `width` x `height` frame.
///
/// Each margin is clamped to `dim - 1`, at least one pixel survives on each axis,
/// and with `snap_multiple > 1` the kept width/height are floored to a multiple of
/// it while the top-left corner stays put.
pub fn margin_rect(width: usize, height: usize, margins: Margins, snap_multiple: usize) -> Rect {
    let max_x = width.saturating_sub(1);
    let max_y = height.saturating_sub(1);
    let x0 = margins.left.min(max_x);
    let y0 = margins.top.min(max_y);
    let right = margins.right.min(max_x);
    let bottom = margins.bottom.min(max_y);

    let mut x1 = (x0 + 1).max(width.saturating_sub(right));
    let mut y1 = (y0 + 1).max(height.saturating_sub(bottom));

    if snap_multiple > 1 {
        let new_w = ((x1 - x0) / snap_multiple * snap_multiple).max(1);
        let new_h = ((y1 - y0) / snap_multiple * snap_multiple).max(1);
        x1 = width.min(x0 + new_w);
        y1 = height.min(y0 + new_h);
    }

    Rect::new(x0, y0, x1 - x0, y1 - y0)
}
