use thiserror::Error;

use crate::capture::error::CaptureError;
use crate::pipeline::transform::TransformError;

/// Pipeline errors.
///
/// Frame-local failures (`Capture`, `Transform`) are absorbed by the
/// pipeline and reported without halting it; `WorkerUnresponsive` is the
/// one fatal condition — teardown must never release a device underneath
/// a still-running worker.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("worker thread did not terminate within {timeout_ms}ms")]
    WorkerUnresponsive { timeout_ms: u64 },
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;
