use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use autocrop::types::{AspectMatch, FuzzMode, HorizontalGravity, Polarity};

#[derive(Parser)]
#[command(name = "autocrop", version, about = "Automatic crop detection CLI")]
pub struct CliArgs {
    /// Enable logging (filter with RUST_LOG, defaults to debug)
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,

    /// JSON file with component settings; flags below override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Grow the border region inward from the edges and crop to the content box
    Borders(BordersArgs),
    /// Strip flat colour bands from all four edges
    Strip(StripArgs),
    /// Strip a dark banner from the bottom of one or more images
    Banner(BannerArgs),
    /// Bound the subject of a mask and pick a covering aspect crop
    Subject(SubjectArgs),
    /// Fit an aspect ratio around a rectangle, or crop the whole frame to an aspect
    Fit(FitArgs),
}

#[derive(Args)]
pub struct BordersArgs {
    /// Input image
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the cropped image here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the border mask here
    #[arg(long)]
    pub mask_output: Option<PathBuf>,

    /// Tolerance mode (percent or adaptive)
    #[arg(long, value_enum)]
    pub fuzz_mode: Option<FuzzMode>,

    /// Per-channel tolerance in percent
    #[arg(long)]
    pub fuzz_percent: Option<f64>,

    /// Padding kept around the content box
    #[arg(long)]
    pub pad: Option<usize>,

    /// Compare luma only instead of RGB
    #[arg(long, default_value_t = false)]
    pub luma: bool,
}

#[derive(Args)]
pub struct StripArgs {
    /// Input image
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the cropped image here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of scan passes over all four edges
    #[arg(long)]
    pub passes: Option<usize>,

    /// Per-edge scan cap in percent of the dimension
    #[arg(long)]
    pub max_border_percent: Option<f64>,
}

#[derive(Args)]
pub struct BannerArgs {
    /// Input images, treated as one batch (same trim for all, or none)
    #[arg(short, long, num_args = 1.., required = true)]
    pub input: Vec<PathBuf>,

    /// Directory for the cropped images (same file names as the inputs)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Extra rows removed above the detected band
    #[arg(long)]
    pub extra_trim: Option<usize>,

    /// Accept bands without any bright (text) row
    #[arg(long, default_value_t = false)]
    pub no_bright_check: bool,
}

#[derive(Args)]
pub struct SubjectArgs {
    /// Subject mask
    #[arg(short, long)]
    pub mask: PathBuf,

    /// Image to crop with the result (must match the mask size)
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Write the cropped image here (requires --image)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Mask polarity (auto, foreground or background)
    #[arg(long, value_enum)]
    pub polarity: Option<Polarity>,

    /// Report the full frame instead of a tight box
    #[arg(long, default_value_t = false)]
    pub loose: bool,

    /// Candidate aspects, e.g. "2:3,1:1,16x9"
    #[arg(long)]
    pub aspects: Option<String>,
}

#[derive(Args)]
pub struct FitArgs {
    /// Input image (its size bounds the crop)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write the cropped image here
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Subject rectangle "x,y,w,h"; without it the whole frame is cropped to an aspect
    #[arg(long)]
    pub rect: Option<String>,

    /// Candidate aspects, e.g. "2:3,1:1,16x9"
    #[arg(long)]
    pub aspects: Option<String>,

    /// Match the closest aspect to the image or to the rectangle
    #[arg(long, value_enum)]
    pub match_to: Option<AspectMatch>,

    /// Horizontal placement (center, left, right)
    #[arg(long, value_enum)]
    pub gravity: Option<HorizontalGravity>,

    /// 0 favours headroom, 1 favours footroom
    #[arg(long)]
    pub bottom_priority: Option<f64>,

    /// Whole-frame mode: choose among the built-in model resolutions
    #[arg(long, default_value_t = false)]
    pub model_resolutions: bool,
}
