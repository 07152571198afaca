use crate::capture::error::Result;
use crate::capture::types::{CaptureDevice, FrameFormat, SourceId};
use crate::frame::Frame;

/// One opened hardware capture source.
///
/// The session's capture tick is the only caller of `read_frame`; the worker
/// thread never holds a source reference. Implementations are free to block
/// inside `read_frame` while waiting for the next hardware frame.
pub trait FrameSource: Send {
    /// Read exactly one raw frame from the device.
    fn read_frame(&mut self) -> Result<Frame>;

    /// Release the underlying device.
    ///
    /// Must cause any thread currently blocked inside `read_frame` to return
    /// an error rather than hang, and makes all subsequent reads fail with
    /// `CaptureError::SourceClosed`. Idempotent.
    fn release(&mut self);

    /// The shape of frames this source delivers.
    fn format(&self) -> FrameFormat;
}

/// Platform-agnostic capture backend trait.
///
/// Implemented per-platform (V4L2 on Linux, AVFoundation on macOS, Media
/// Foundation on Windows) plus the hardware-free [`SyntheticBackend`] for
/// tests and demos. Provides device enumeration and source opening; the
/// pipeline itself never talks to a backend after the source is opened.
///
/// [`SyntheticBackend`]: crate::capture::synthetic::SyntheticBackend
pub trait CaptureBackend: Send + Sync {
    /// Enumerate all currently available capture devices.
    fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>>;

    /// Open a source for the given device at the requested shape.
    fn open_source(&self, id: &SourceId, format: &FrameFormat) -> Result<Box<dyn FrameSource>>;
}
