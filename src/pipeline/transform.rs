use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::frame::Frame;

/// User-supplied per-frame transform.
///
/// Receives the raw frame and returns the processed one. A `None` transform
/// on the session means pass-through: the raw frame is republished unchanged.
pub type FrameTransform = Arc<dyn Fn(&Frame) -> Result<Frame, TransformError> + Send + Sync>;

/// Failure of a user transform on one frame. Never fatal to the worker.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform failed: {0}")]
    Failed(String),

    #[error("transform panicked")]
    Panicked,
}

/// Shared cell holding the session's current transform.
///
/// The worker reads the cell once per iteration, so swapping the transform
/// while the worker runs takes effect on the next frame, not the one in
/// flight.
pub struct TransformCell {
    inner: Mutex<Option<FrameTransform>>,
}

impl TransformCell {
    /// Create a cell with the given initial transform (`None` = pass-through).
    pub fn new(transform: Option<FrameTransform>) -> Self {
        Self {
            inner: Mutex::new(transform),
        }
    }

    /// Replace the current transform.
    pub fn set(&self, transform: Option<FrameTransform>) {
        *self.inner.lock() = transform;
    }

    /// Clone out the current transform.
    pub fn current(&self) -> Option<FrameTransform> {
        self.inner.lock().clone()
    }
}

impl Default for TransformCell {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    fn invert() -> FrameTransform {
        Arc::new(|frame: &Frame| {
            let data = frame.data().iter().map(|b| 255 - b).collect();
            Frame::new(
                frame.width(),
                frame.height(),
                frame.format(),
                data,
                frame.timestamp_us,
            )
            .map_err(|e| TransformError::Failed(e.to_string()))
        })
    }

    #[test]
    fn cell_starts_empty_by_default() {
        let cell = TransformCell::default();
        assert!(cell.current().is_none());
    }

    #[test]
    fn set_replaces_current_transform() {
        let cell = TransformCell::default();
        cell.set(Some(invert()));
        assert!(cell.current().is_some());
        cell.set(None);
        assert!(cell.current().is_none());
    }

    #[test]
    fn current_clones_share_the_same_function() {
        let cell = TransformCell::new(Some(invert()));
        let a = cell.current().unwrap();
        let b = cell.current().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn transform_applies_to_frame_data() {
        let transform = invert();
        let frame = Frame::new(2, 1, PixelFormat::Gray8, vec![0, 255], 0).unwrap();
        let out = transform(&frame).unwrap();
        assert_eq!(out.data(), &[255, 0]);
    }

    #[test]
    fn cell_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransformCell>();
    }
}
