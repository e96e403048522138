#![doc = r#"
autocrop: automatic crop detection for photos and subject masks.

This crate decides *where* to crop; it never resamples. Given a normalized RGB
buffer or a subject mask it finds letterbox frames and flat borders, dark
metadata banners at the bottom edge, the bounding box of a subject, and an
aspect-correct crop around that subject that keeps headroom and footroom. The
result is always an integer rectangle inside the image, and cropping is plain
sub-buffer extraction.

Components
----------
- Border growth: flood the frame inward from the edges under a colour tolerance
  derived from robust edge statistics, then crop to the content box.
- Band scan: walk rows/columns inward from each edge while they stay flat,
  tolerating gradients and single noisy lines.
- Banner detection: find a dark band anchored to the bottom edge, with an
  all-or-nothing policy for batches.
- Subject bounds: inverse-CDF quantile box over a mask, with automatic polarity.
- Aspect fitting: minimal covering rectangle per candidate ratio, lexicographic
  candidate ranking, and head-safe vertical placement.

Detection never fails on "nothing found": it reports zero trims or the full
frame. Hard errors are reserved for malformed buffers, batches handed to
single-image routines, and aspect requests no candidate can satisfy.

Add dependency
--------------
```toml
[dependencies]
autocrop = "0.1"
```

Quick start: strip a flat border in memory
------------------------------------------
```rust
use autocrop::{Image, BandScanParams};
use ndarray::Array3;

fn main() -> autocrop::Result<()> {
    // 60x60 gray frame of 10px around a checkerboard
    let data = Array3::from_shape_fn((60, 60, 3), |(y, x, _)| {
        if y < 10 || x < 10 || y >= 50 || x >= 50 {
            0.5
        } else if (x + y) % 2 == 0 {
            0.0
        } else {
            1.0
        }
    });
    let image = Image::new(data)?;
    let (cropped, scan) = autocrop::api::strip_solid_borders(&image, &BandScanParams::default())?;
    assert!(scan.detected);
    assert_eq!(cropped.dims(), (40, 40));
    Ok(())
}
```

Subject crop from a mask file
-----------------------------
```rust,no_run
use std::path::Path;
use autocrop::{api, io, CropConfig};

fn main() -> autocrop::Result<()> {
    let config = CropConfig::from_json_file(Path::new("crop.json"))?;
    let mask = io::load_mask(Path::new("subject_mask.png"))?;
    let image = io::load_image(Path::new("photo.jpg"))?;

    let smart = api::smart_subject_crop(&mask, &config)?;
    io::save_image(&api::crop(&image, smart.rect())?, Path::new("photo_crop.png"))
}
```

Logging
-------
Library code emits `tracing` events (`info` summaries, `debug` per pass and
candidate, `warn` for degenerate results). Install any subscriber to see them;
the CLI does so with `--log`.

Feature flags
-------------
- `io` (default): file loading/saving through the `image` crate and the
  `autocrop` binary.

Useful modules
--------------
- [`api`]: high-level entry points and pipelines.
- [`core`](crate::core): buffers, geometry, params, and the processing components.
- [`types`]: shared enums (`FuzzMode`, `Polarity`, `HorizontalGravity`, ...).
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod types;

// File helpers (only available with io feature)
#[cfg(feature = "io")]
pub mod io;

// Curated public API surface
// Buffers and geometry
pub use crate::core::buffer::{Image, Margins, Mask};
pub use crate::core::geometry::{AspectCandidate, EdgeBand, Rect};
pub use crate::error::{Error, Result};

// Settings
pub use crate::core::params::{
    AspectFitParams, BandScanParams, BannerParams, BorderGrowParams, CropConfig,
    SubjectBoundsParams,
};
pub use crate::types::{AspectMatch, FuzzMode, HorizontalGravity, Polarity, PolarityPick};

// Component results
pub use crate::core::processing::aspect_fit::{AspectChoice, FitResult};
pub use crate::core::processing::band_scan::BandScan;
pub use crate::core::processing::banner::BannerDetection;
pub use crate::core::processing::subject_bounds::SubjectBox;
