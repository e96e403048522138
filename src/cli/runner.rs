use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use autocrop::api::{self, SmartCrop};
use autocrop::core::geometry::{EdgeBand, Rect, parse_aspects};
use autocrop::core::processing::aspect_fit::{AspectChoice, FitResult};
use autocrop::core::processing::banner::BannerDetection;
use autocrop::core::processing::subject_bounds::SubjectBox;
use autocrop::io::{load_image, load_mask, save_image, save_mask};
use autocrop::{CropConfig, Image};

use super::args::{BannerArgs, BordersArgs, CliArgs, Command, FitArgs, StripArgs, SubjectArgs};
use super::errors::AppError;

type CliResult<T> = Result<T, AppError>;

#[derive(Serialize)]
struct BordersReport {
    input: PathBuf,
    width: usize,
    height: usize,
    rect: Rect,
    border_fraction: f64,
    full_frame_border: bool,
}

#[derive(Serialize)]
struct StripReport {
    input: PathBuf,
    band: EdgeBand,
    passes: usize,
    detected: bool,
    rect: Rect,
}

#[derive(Serialize)]
struct BannerReport {
    inputs: Vec<PathBuf>,
    detection: BannerDetection,
    outputs: Vec<PathBuf>,
}

#[derive(Serialize)]
struct SubjectReport {
    mask: PathBuf,
    subject: SubjectBox,
    crop: Option<SmartCrop>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum FitReport {
    HeadSafe(FitResult),
    WholeFrame(AspectChoice),
}

fn print_report<T: Serialize>(report: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(report).map_err(autocrop::Error::from)?;
    println!("{json}");
    Ok(())
}

fn load_config(path: Option<&Path>) -> CliResult<CropConfig> {
    match path {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Ok(CropConfig::from_json_file(path)?)
        }
        None => Ok(CropConfig::default()),
    }
}

fn parse_rect(value: &str) -> CliResult<Rect> {
    let parts: Vec<usize> = value
        .split(',')
        .map(|p| p.trim().parse::<usize>())
        .collect::<Result<_, _>>()
        .map_err(|_| AppError::InvalidRect {
            value: value.to_string(),
        })?;
    match parts.as_slice() {
        &[x, y, w, h] if w > 0 && h > 0 => Ok(Rect::new(x, y, w, h)),
        _ => Err(AppError::InvalidRect {
            value: value.to_string(),
        }),
    }
}

fn run_borders(args: BordersArgs, mut config: CropConfig) -> CliResult<()> {
    if let Some(mode) = args.fuzz_mode {
        config.border.fuzz_mode = mode;
    }
    if let Some(pct) = args.fuzz_percent {
        config.border.fuzz_percent = pct;
    }
    if let Some(pad) = args.pad {
        config.border.pad_px = pad;
    }
    if args.luma {
        config.border.use_luma_only = true;
    }
    config.border.validate()?;

    let image = load_image(&args.input)?;
    let (width, height) = image.dims();
    let result = api::auto_crop_borders(&image, &config.border)?;

    let covered = result.border_mask.data().sum() as f64;
    let border_fraction = covered / (width * height) as f64;
    let full_frame_border = border_fraction >= 1.0;
    if full_frame_border {
        warn!("Whole image classified as border; output is uncropped");
    }

    if let Some(output) = &args.output {
        save_image(&result.image, output)?;
        info!("Cropped image written to {:?}", output);
    }
    if let Some(mask_output) = &args.mask_output {
        save_mask(&result.border_mask, mask_output)?;
    }

    print_report(&BordersReport {
        input: args.input,
        width,
        height,
        rect: result.rect,
        border_fraction,
        full_frame_border,
    })
}

fn run_strip(args: StripArgs, mut config: CropConfig) -> CliResult<()> {
    if let Some(passes) = args.passes {
        config.bands.passes = passes;
    }
    if let Some(pct) = args.max_border_percent {
        config.bands.max_border_percent = pct;
    }
    config.bands.validate()?;

    let image = load_image(&args.input)?;
    let (width, height) = image.dims();
    let (cropped, scan) = api::strip_solid_borders(&image, &config.bands)?;

    if let Some(output) = &args.output {
        save_image(&cropped, output)?;
        info!("Cropped image written to {:?}", output);
    }

    print_report(&StripReport {
        input: args.input,
        band: scan.band,
        passes: scan.passes,
        detected: scan.detected,
        rect: scan.band.inner_rect(width, height),
    })
}

fn run_banner(args: BannerArgs, mut config: CropConfig) -> CliResult<()> {
    if let Some(extra) = args.extra_trim {
        config.banner.extra_trim_px = extra;
    }
    if args.no_bright_check {
        config.banner.require_bright_rows = false;
    }
    config.banner.validate()?;

    let images = args
        .input
        .iter()
        .map(|path| load_image(path))
        .collect::<autocrop::Result<Vec<Image>>>()?;
    let (cropped, detection) = api::strip_bottom_banner(&images, &config.banner)?;

    let mut outputs = Vec::new();
    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)?;
        for (path, image) in args.input.iter().zip(cropped.iter()) {
            let name = path.file_name().ok_or_else(|| AppError::MissingArgument {
                arg: format!("file name for {}", path.display()),
            })?;
            let target = dir.join(name);
            save_image(image, &target)?;
            outputs.push(target);
        }
        info!("Wrote {} images to {:?}", outputs.len(), dir);
    }

    print_report(&BannerReport {
        inputs: args.input,
        detection,
        outputs,
    })
}

fn run_subject(args: SubjectArgs, mut config: CropConfig) -> CliResult<()> {
    if let Some(polarity) = args.polarity {
        config.subject.polarity = polarity;
    }
    if args.loose {
        config.subject.tight = false;
    }
    if let Some(aspects) = args.aspects {
        config.fit.aspects = aspects;
    }
    config.validate()?;

    let mask = load_mask(&args.mask)?;
    let crop = match api::smart_subject_crop(&mask, &config) {
        Ok(crop) => Some(crop),
        Err(autocrop::Error::NoFeasibleAspect { width, height }) => {
            warn!("No aspect fits the {}x{} mask; reporting the subject box only", width, height);
            None
        }
        Err(e) => return Err(e.into()),
    };
    let subject = match &crop {
        Some(c) => c.subject,
        None => api::extract_subject_box(&mask, &config.subject),
    };

    if let Some(output) = &args.output {
        let image_path = args.image.as_ref().ok_or(AppError::MissingArgument {
            arg: "--image".to_string(),
        })?;
        let image = load_image(image_path)?;
        if image.dims() != mask.dims() {
            let (mask_w, mask_h) = mask.dims();
            let (image_w, image_h) = image.dims();
            return Err(AppError::SizeMismatch {
                mask_w,
                mask_h,
                image_w,
                image_h,
            });
        }
        let rect = crop.as_ref().map(|c| c.rect()).unwrap_or(subject.rect);
        save_image(&api::crop(&image, rect)?, output)?;
        info!("Cropped image written to {:?}", output);
    }

    print_report(&SubjectReport {
        mask: args.mask,
        subject,
        crop,
    })
}

fn run_fit(args: FitArgs, mut config: CropConfig) -> CliResult<()> {
    if let Some(aspects) = args.aspects {
        config.fit.aspects = aspects;
    }
    if let Some(match_to) = args.match_to {
        config.fit.match_to = match_to;
    }
    if let Some(gravity) = args.gravity {
        config.fit.gravity = gravity;
    }
    if let Some(priority) = args.bottom_priority {
        config.fit.bottom_priority = priority;
    }
    config.fit.validate()?;

    let image = load_image(&args.input)?;
    let dims = image.dims();

    let (rect, report) = match args.rect.as_deref() {
        Some(value) => {
            let seed = parse_rect(value)?;
            let fit = api::fit_aspect(seed, dims, &config.fit)?;
            (fit.rect, FitReport::HeadSafe(fit))
        }
        None => {
            let choice = if args.model_resolutions {
                api::fit_model_resolution(dims)?
            } else {
                api::fit_whole_frame(dims, &parse_aspects(&config.fit.aspects))?
            };
            (choice.rect, FitReport::WholeFrame(choice))
        }
    };

    if let Some(output) = &args.output {
        save_image(&api::crop(&image, rect)?, output)?;
        info!("Cropped image written to {:?}", output);
    }
    print_report(&report)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Borders(a) => run_borders(a, config)?,
        Command::Strip(a) => run_strip(a, config)?,
        Command::Banner(a) => run_banner(a, config)?,
        Command::Subject(a) => run_subject(a, config)?,
        Command::Fit(a) => run_fit(a, config)?,
    }

    Ok(())
}
