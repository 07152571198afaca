use thiserror::Error;

/// Capture subsystem errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("source closed: {0}")]
    SourceClosed(String),

    #[error("frame read failed: {0}")]
    ReadFailed(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid frame from source: {0}")]
    InvalidFrame(#[from] crate::frame::FrameError),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, CaptureError>;
