//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Hard failures are limited to malformed buffers, batch misuse, bad configuration,
//! and aspect requests that cannot be satisfied. "Nothing detected" is never an error.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "io")]
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid buffer shape: expected {expected}, got {got:?}")]
    InvalidShape { expected: &'static str, got: Vec<usize> },

    #[error("Expected a single image, got a batch of {batch}")]
    BatchNotSupported { batch: usize },

    #[error("Batch is empty")]
    EmptyBatch,

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("No candidate aspect ratio fits a {width}x{height} image")]
    NoFeasibleAspect { width: usize, height: usize },

    #[error("Rectangle {rect} does not fit inside a {width}x{height} image")]
    InvalidRect {
        rect: String,
        width: usize,
        height: usize,
    },
}

impl Error {
    pub fn invalid_argument<V: std::fmt::Display>(arg: &'static str, value: V) -> Self {
        Error::InvalidArgument {
            arg,
            value: value.to_string(),
        }
    }

    pub fn invalid_shape(expected: &'static str, got: &[usize]) -> Self {
        Error::InvalidShape {
            expected,
            got: got.to_vec(),
        }
    }
}
