//! Editor error types.

use thiserror::Error;

use crate::compositor::TextureHandle;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image encode failed: {0}")]
    Encode(String),

    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("texture handle {0:?} is not registered")]
    StaleTexture(TextureHandle),

    #[error("invalid color value: {0}")]
    InvalidColor(String),

    #[error("gpu error: {0}")]
    Gpu(String),

    #[error("settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, EditorError>;
