use serde::Serialize;
use std::fmt;

use crate::frame::PixelFormat;

/// Stable capture-source identifier.
///
/// Backends choose the representation (an index for probe-based backends,
/// a device path hash for platform ones); the only contract is stability
/// across enumerations while the device stays connected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new `SourceId` from a raw string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Return the inner string representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discovered capture device, as shown in the embedder's device selector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureDevice {
    pub id: SourceId,
    pub name: String,
    pub is_connected: bool,
}

/// Requested capture shape for opening a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameFormat {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
}

impl FrameFormat {
    /// Bytes in one frame of this shape.
    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.bytes_per_pixel()
    }
}

impl Default for FrameFormat {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Bgr8,
        }
    }
}
