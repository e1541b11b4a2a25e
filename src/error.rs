use thiserror::Error;

/// Library error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
