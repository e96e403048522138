use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::geometry::DEFAULT_ASPECTS;
use crate::error::{Error, Result};
use crate::types::{AspectMatch, FuzzMode, HorizontalGravity, Polarity};

fn check_range(arg: &'static str, value: f64, lo: f64, hi: f64) -> Result<()> {
    if value.is_finite() && value >= lo && value <= hi {
        Ok(())
    } else {
        Err(Error::invalid_argument(arg, value))
    }
}

/// Region growth from the image edges under a colour-distance tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderGrowParams {
    pub fuzz_mode: FuzzMode,
    /// Per-channel tolerance in percent of full scale.
    pub fuzz_percent: f64,
    /// Multiplier on the edge MAD in adaptive mode.
    pub adaptive_k: f64,
    /// Width of the seed strip on each side.
    pub edge_margin_px: usize,
    /// Padding added around the detected content box.
    pub pad_px: usize,
    pub use_luma_only: bool,
    pub max_growth_iter: usize,
}

impl Default for BorderGrowParams {
    fn default() -> Self {
        Self {
            fuzz_mode: FuzzMode::Adaptive,
            fuzz_percent: 5.0,
            adaptive_k: 2.0,
            edge_margin_px: 4,
            pad_px: 0,
            use_luma_only: false,
            max_growth_iter: 4096,
        }
    }
}

impl BorderGrowParams {
    pub fn validate(&self) -> Result<()> {
        check_range("fuzz_percent", self.fuzz_percent, 0.0, 100.0)?;
        check_range("adaptive_k", self.adaptive_k, 0.0, f64::MAX)?;
        if self.edge_margin_px == 0 {
            return Err(Error::invalid_argument("edge_margin_px", 0));
        }
        Ok(())
    }
}

/// Per-edge flat-colour band scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandScanParams {
    /// Scan cap per edge, percent of the current dimension.
    pub max_border_percent: f64,
    pub variance_threshold: f64,
    pub colour_delta_threshold: f64,
    pub min_band_px: usize,
    pub passes: usize,
    /// Exponential drift of the baseline colour toward each accepted line.
    pub mean_follow: f64,
    pub min_uniform_fraction: f64,
    pub dominant_bins: usize,
    pub retry_allowance: usize,
}

impl Default for BandScanParams {
    fn default() -> Self {
        Self {
            max_border_percent: 65.0,
            variance_threshold: 0.0025,
            colour_delta_threshold: 0.08,
            min_band_px: 2,
            passes: 2,
            mean_follow: 0.2,
            min_uniform_fraction: 0.68,
            dominant_bins: 8,
            retry_allowance: 1,
        }
    }
}

impl BandScanParams {
    pub fn validate(&self) -> Result<()> {
        check_range("max_border_percent", self.max_border_percent, 0.0, 100.0)?;
        check_range("variance_threshold", self.variance_threshold, 0.0, f64::MAX)?;
        check_range("colour_delta_threshold", self.colour_delta_threshold, 0.0, f64::MAX)?;
        check_range("mean_follow", self.mean_follow, 0.0, 1.0)?;
        check_range("min_uniform_fraction", self.min_uniform_fraction, 0.0, 1.0)?;
        check_range("min_band_px", self.min_band_px as f64, 1.0, 64.0)?;
        check_range("passes", self.passes as f64, 1.0, 6.0)?;
        check_range("dominant_bins", self.dominant_bins as f64, 2.0, 64.0)?;
        check_range("retry_allowance", self.retry_allowance as f64, 0.0, 4.0)?;
        Ok(())
    }
}

/// Dark metadata banner at the bottom edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BannerParams {
    pub pixel_dark_threshold: f64,
    pub dark_fraction_threshold: f64,
    pub bright_pixel_threshold: f64,
    pub bright_fraction_threshold: f64,
    /// Shortest accepted band, percent of image height.
    pub min_band_percent: f64,
    /// Bottom region inspected, percent of image height.
    pub max_scan_percent: f64,
    pub extra_trim_px: usize,
    pub require_bright_rows: bool,
}

impl Default for BannerParams {
    fn default() -> Self {
        Self {
            pixel_dark_threshold: 0.22,
            dark_fraction_threshold: 0.78,
            bright_pixel_threshold: 0.7,
            bright_fraction_threshold: 0.015,
            min_band_percent: 3.0,
            max_scan_percent: 35.0,
            extra_trim_px: 2,
            require_bright_rows: true,
        }
    }
}

impl BannerParams {
    pub fn validate(&self) -> Result<()> {
        check_range("pixel_dark_threshold", self.pixel_dark_threshold, 0.0, 1.0)?;
        check_range("dark_fraction_threshold", self.dark_fraction_threshold, 0.0, 1.0)?;
        check_range("bright_pixel_threshold", self.bright_pixel_threshold, 0.0, 1.0)?;
        check_range("bright_fraction_threshold", self.bright_fraction_threshold, 0.0, 1.0)?;
        check_range("min_band_percent", self.min_band_percent, 0.0, 100.0)?;
        check_range("max_scan_percent", self.max_scan_percent, 0.0, 100.0)?;
        Ok(())
    }
}

/// Quantile bounding box over a subject mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubjectBoundsParams {
    pub polarity: Polarity,
    pub q_left: f64,
    pub q_right: f64,
    pub q_top: f64,
    pub q_bottom: f64,
    pub min_span_px: usize,
    /// Ring width used to measure border mass during polarity resolution.
    pub border_ring_px: usize,
    /// When false the full frame is returned without looking at the mask.
    pub tight: bool,
}

impl Default for SubjectBoundsParams {
    fn default() -> Self {
        Self {
            polarity: Polarity::Auto,
            q_left: 0.005,
            q_right: 0.995,
            q_top: 0.005,
            q_bottom: 0.995,
            min_span_px: 8,
            border_ring_px: 8,
            tight: true,
        }
    }
}

impl SubjectBoundsParams {
    pub fn validate(&self) -> Result<()> {
        check_range("q_left", self.q_left, 0.0, 1.0)?;
        check_range("q_right", self.q_right, 0.0, 1.0)?;
        check_range("q_top", self.q_top, 0.0, 1.0)?;
        check_range("q_bottom", self.q_bottom, 0.0, 1.0)?;
        Ok(())
    }
}

/// Aspect selection and margin-aware placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AspectFitParams {
    /// Comma-separated candidate list, e.g. `2:3,16x9`.
    pub aspects: String,
    pub match_to: AspectMatch,
    pub headroom_ratio: f64,
    pub footroom_ratio: f64,
    pub side_margin_ratio: f64,
    /// 0 favours headroom, 1 favours footroom.
    pub bottom_priority: f64,
    pub gravity: HorizontalGravity,
    /// Seed pre-expansion as a fraction of the image's smaller dimension.
    pub seed_pad_fraction: f64,
    pub seed_pad_min_px: usize,
}

impl Default for AspectFitParams {
    fn default() -> Self {
        Self {
            aspects: DEFAULT_ASPECTS.to_string(),
            match_to: AspectMatch::Box,
            headroom_ratio: 0.12,
            footroom_ratio: 0.06,
            side_margin_ratio: 0.08,
            bottom_priority: 0.75,
            gravity: HorizontalGravity::Center,
            seed_pad_fraction: 0.02,
            seed_pad_min_px: 8,
        }
    }
}

impl AspectFitParams {
    pub fn validate(&self) -> Result<()> {
        check_range("headroom_ratio", self.headroom_ratio, 0.0, 1.0)?;
        check_range("footroom_ratio", self.footroom_ratio, 0.0, 1.0)?;
        check_range("side_margin_ratio", self.side_margin_ratio, 0.0, 1.0)?;
        check_range("bottom_priority", self.bottom_priority, 0.0, 1.0)?;
        check_range("seed_pad_fraction", self.seed_pad_fraction, 0.0, 1.0)?;
        Ok(())
    }
}

/// All component settings, suitable for config files and presets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    pub border: BorderGrowParams,
    pub bands: BandScanParams,
    pub banner: BannerParams,
    pub subject: SubjectBoundsParams,
    pub fit: AspectFitParams,
}

impl CropConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: CropConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        self.border.validate()?;
        self.bands.validate()?;
        self.banner.validate()?;
        self.subject.validate()?;
        self.fit.validate()
    }
}
