use thiserror::Error;

/// Errors surfaced by the scanning pipeline and its I/O boundary.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Malformed geometry, out-of-range parameters, or an empty source image.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("PDF assembly failed: {0}")]
    Pdf(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScanError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
