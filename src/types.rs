//! Shared types and enums used across the crop engine.
//! Includes `FuzzMode`, `Polarity`, `HorizontalGravity`, `AspectMatch`,
//! and the scan orientation enums consumed by the band scanner.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the border colour tolerance is derived.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuzzMode {
    /// Flat tolerance of `fuzz_percent`.
    Percent,
    /// `fuzz_percent` plus `k` times the edge median absolute deviation.
    Adaptive,
}

impl std::fmt::Display for FuzzMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FuzzMode::Percent => write!(f, "percent"),
            FuzzMode::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// Requested interpretation of a subject mask.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Pick whichever orientation puts less mass on the image border.
    Auto,
    /// Use the mask as given.
    Foreground,
    /// Use the complement of the mask.
    Background,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Auto => write!(f, "auto"),
            Polarity::Foreground => write!(f, "foreground"),
            Polarity::Background => write!(f, "background"),
        }
    }
}

/// Orientation actually used after polarity resolution.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolarityPick {
    Foreground,
    Background,
    AutoForeground,
    AutoBackground,
}

impl PolarityPick {
    /// True when the complement of the input mask was used.
    pub fn is_inverted(self) -> bool {
        matches!(self, PolarityPick::Background | PolarityPick::AutoBackground)
    }
}

impl std::fmt::Display for PolarityPick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolarityPick::Foreground => write!(f, "fg"),
            PolarityPick::Background => write!(f, "bg"),
            PolarityPick::AutoForeground => write!(f, "auto->fg"),
            PolarityPick::AutoBackground => write!(f, "auto->bg"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalGravity {
    Center,
    Left,
    Right,
}

impl std::fmt::Display for HorizontalGravity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HorizontalGravity::Center => write!(f, "center"),
            HorizontalGravity::Left => write!(f, "left"),
            HorizontalGravity::Right => write!(f, "right"),
        }
    }
}

/// Which ratio the closest aspect candidate is matched against.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectMatch {
    Image,
    #[value(name = "box")]
    Box,
}

impl std::fmt::Display for AspectMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AspectMatch::Image => write!(f, "image"),
            AspectMatch::Box => write!(f, "box"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ScanAxis {
    Rows,
    Cols,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ScanDirection {
    FromStart,
    FromEnd,
}
