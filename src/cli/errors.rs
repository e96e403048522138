use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Invalid rectangle: {value}. Expected x,y,w,h")]
    InvalidRect { value: String },

    #[error("Mask is {mask_w}x{mask_h} but image is {image_w}x{image_h}")]
    SizeMismatch {
        mask_w: usize,
        mask_h: usize,
        image_w: usize,
        image_h: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Crop(#[from] autocrop::Error),
}
