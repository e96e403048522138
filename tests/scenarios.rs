mod common;

use autocrop::api;
use autocrop::core::processing::aspect_fit::covering_rect;
use autocrop::core::processing::border_grow::grow_border_mask;
use autocrop::{
    AspectFitParams, BandScanParams, BannerParams, BorderGrowParams, CropConfig, EdgeBand,
    FuzzMode, HorizontalGravity, Image, Polarity, PolarityPick, Rect, SubjectBoundsParams,
};
use common::synthetic_image::{block_mask, framed_checkerboard, photo_with_banner};
use ndarray::{Array, IxDyn};

#[test]
fn flat_gray_border_is_trimmed_exactly() {
    let image = framed_checkerboard(100, 10, 0.5);
    let band = api::detect_border(&image, &BandScanParams::default());
    assert_eq!(
        band,
        EdgeBand {
            top: 10,
            bottom: 10,
            left: 10,
            right: 10
        }
    );

    let (cropped, scan) = api::strip_solid_borders(&image, &BandScanParams::default()).unwrap();
    assert!(scan.detected);
    assert_eq!(cropped.dims(), (80, 80));
}

#[test]
fn more_passes_never_shrink_the_trim() {
    // Two nested frames of different colours; the second is reached through the
    // drifting baseline and the dominant-bin share.
    let data = ndarray::Array3::from_shape_fn((120, 120, 3), |(y, x, _)| {
        let d = y.min(x).min(119 - y).min(119 - x);
        if d < 8 {
            0.9
        } else if d < 20 {
            0.2
        } else if (x + y) % 2 == 0 {
            0.0
        } else {
            1.0
        }
    });
    let image = Image::new(data).unwrap();
    let one = BandScanParams {
        passes: 1,
        ..Default::default()
    };
    let three = BandScanParams {
        passes: 3,
        ..Default::default()
    };
    let a = api::detect_border(&image, &one);
    let b = api::detect_border(&image, &three);
    assert!(b.top >= a.top && b.bottom >= a.bottom && b.left >= a.left && b.right >= a.right);
    assert_eq!(b.top, 20);
    assert_eq!(b.left, 20);
}

#[test]
fn border_growth_that_cannot_pass_the_seed_is_idempotent() {
    let image = framed_checkerboard(32, 2, 0.5);
    let params = BorderGrowParams {
        fuzz_mode: FuzzMode::Percent,
        fuzz_percent: 1.0,
        edge_margin_px: 2,
        ..Default::default()
    };
    let first = grow_border_mask(&image, &params);
    let second = grow_border_mask(&image, &params);
    assert_eq!(first.mask, second.mask);
    assert_eq!(first.iterations, 0);
    assert_eq!(first.covered_pixels(), 32 * 32 - 28 * 28);
}

#[test]
fn dark_banner_with_text_is_removed() {
    let image = photo_with_banner(200, 160, 15, 5);
    let params = BannerParams::default();
    let detection = api::detect_banner(&image, &params);
    assert!(detection.detected);
    assert_eq!(detection.trim, 15 + params.extra_trim_px);

    let (cropped, batch) = api::strip_bottom_banner(std::slice::from_ref(&image), &params).unwrap();
    assert_eq!(batch, detection);
    assert_eq!(cropped[0].height(), 200 - 17);
}

#[test]
fn banner_batch_from_array_is_all_or_nothing() {
    let with_banner = photo_with_banner(100, 40, 10, 4);
    let without = photo_with_banner(100, 40, 0, 0);
    let mut arr = Array::zeros(IxDyn(&[2, 100, 40, 3]));
    for (i, img) in [&with_banner, &without].into_iter().enumerate() {
        for ((y, x, c), &v) in img.data().indexed_iter() {
            arr[[i, y, x, c]] = v;
        }
    }
    let detection = api::detect_banner_array(arr, &BannerParams::default()).unwrap();
    assert!(!detection.detected);
    assert_eq!(detection.trim, 0);
}

#[test]
fn quantile_box_recovers_known_rectangle() {
    let mask = block_mask(80, 120, 12, 50, 30, 90);
    let params = SubjectBoundsParams {
        polarity: Polarity::Auto,
        q_left: 0.0,
        q_right: 1.0,
        q_top: 0.0,
        q_bottom: 1.0,
        min_span_px: 1,
        ..Default::default()
    };
    let found = api::extract_subject_box(&mask, &params);
    assert_eq!(found.pick, PolarityPick::AutoForeground);
    assert_eq!(found.rect, Rect::new(30, 12, 60, 38));
}

#[test]
fn corner_subject_mask_is_inverted() {
    let mask = block_mask(64, 64, 0, 12, 0, 12);
    let found = api::extract_subject_box(&mask, &SubjectBoundsParams::default());
    assert_eq!(found.pick, PolarityPick::AutoBackground);
}

#[test]
fn covering_rect_properties_hold_across_shapes() {
    let ratios = [2.0 / 3.0, 3.0 / 4.0, 1.0, 9.0 / 16.0, 16.0 / 9.0, 5.0 / 8.0];
    let (width, height) = (640, 480);
    for &ratio in &ratios {
        for (x, y, w, h) in [(0, 0, 10, 10), (300, 200, 40, 90), (600, 10, 40, 30), (5, 400, 120, 80)] {
            let seed = Rect::new(x, y, w, h);
            let Some(rect) = covering_rect(seed, ratio, width, height) else {
                continue;
            };
            assert!(rect.fits_in(width, height), "{rect} outside frame");
            assert!(rect.contains(&seed), "{rect} does not contain {seed}");
            assert!(rect.w == seed.w || rect.h == seed.h, "{rect} not minimal for {seed}");
            let w_err = (rect.w as f64 - rect.h as f64 * ratio).abs();
            let h_err = (rect.h as f64 - rect.w as f64 / ratio).abs();
            assert!(w_err <= 1.0 + 1e-9 || h_err <= 1.0 + 1e-9, "{rect} off ratio {ratio}");
        }
    }
}

#[test]
fn head_safe_fit_stays_in_bounds() {
    let dims = (300, 200);
    for gravity in [HorizontalGravity::Center, HorizontalGravity::Left, HorizontalGravity::Right] {
        for seed in [Rect::new(0, 0, 300, 200), Rect::new(120, 10, 40, 150), Rect::new(280, 190, 20, 10)] {
            let params = AspectFitParams {
                gravity,
                ..Default::default()
            };
            let fit = api::fit_aspect(seed, dims, &params).unwrap();
            assert!(fit.rect.fits_in(dims.0, dims.1), "{} escapes the frame", fit.rect);
            let w_err = (fit.rect.w as f64 - fit.rect.h as f64 * fit.ratio).abs();
            assert!(w_err <= 0.5 + 0.5 * fit.ratio + 1e-9, "{} lost ratio {}", fit.rect, fit.label);
        }
    }
}

#[test]
fn smart_crop_rejects_impossible_aspects() {
    let mask = block_mask(100, 100, 2, 98, 2, 98);
    let mut config = CropConfig::default();
    config.subject.polarity = Polarity::Foreground;
    config.fit.aspects = "16:9".to_string();
    assert!(matches!(
        api::smart_subject_crop(&mask, &config),
        Err(autocrop::Error::NoFeasibleAspect { .. })
    ));
}

#[test]
fn multi_image_array_is_rejected_for_single_image_routines() {
    let arr = Array::zeros(IxDyn(&[3, 10, 10, 3]));
    assert!(matches!(
        api::detect_border_array(arr, &BandScanParams::default()),
        Err(autocrop::Error::BatchNotSupported { batch: 3 })
    ));
}
