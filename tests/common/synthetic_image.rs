use autocrop::{Image, Mask};
use ndarray::{Array2, Array3};

/// One-pixel checkerboard of `lo`/`hi`, the busiest content a line can hold.
pub fn checker_value(x: usize, y: usize, lo: f32, hi: f32) -> f32 {
    if (x + y) % 2 == 0 { lo } else { hi }
}

/// Square image with a flat `frame` colour of `border` px around a checkerboard.
pub fn framed_checkerboard(size: usize, border: usize, frame: f32) -> Image {
    let data = Array3::from_shape_fn((size, size, 3), |(y, x, _)| {
        if y < border || x < border || y >= size - border || x >= size - border {
            frame
        } else {
            checker_value(x, y, 0.0, 1.0)
        }
    });
    Image::new(data).expect("valid synthetic image")
}

/// Busy photo-like content with `dark_rows` near-black rows at the bottom. The
/// lowest `text_rows` of them carry sparse white pixels.
pub fn photo_with_banner(height: usize, width: usize, dark_rows: usize, text_rows: usize) -> Image {
    let data = Array3::from_shape_fn((height, width, 3), |(y, x, c)| {
        if y < height - dark_rows {
            0.35 + 0.3 * (((x * 7 + y * 3 + c) % 11) as f32 / 10.0)
        } else if y >= height - text_rows && x % 16 == 0 {
            0.95
        } else {
            0.04
        }
    });
    Image::new(data).expect("valid synthetic image")
}

/// `h` x `w` mask that is 1 inside the given block and 0 elsewhere.
pub fn block_mask(h: usize, w: usize, y0: usize, y1: usize, x0: usize, x1: usize) -> Mask {
    let data = Array2::from_shape_fn((h, w), |(y, x)| {
        if (y0..y1).contains(&y) && (x0..x1).contains(&x) { 1.0 } else { 0.0 }
    });
    Mask::new(data).expect("valid synthetic mask")
}
