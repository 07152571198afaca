use serde::Serialize;
use thiserror::Error;

/// Pixel layout of a raw frame buffer. All formats are 8 bits per sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Blue-green-red, 3 bytes per pixel. What OpenCV-style sources deliver.
    Bgr8,
    /// Red-green-blue, 3 bytes per pixel.
    Rgb8,
    /// Single-channel greyscale, 1 byte per pixel.
    Gray8,
}

impl PixelFormat {
    /// Number of bytes per pixel for this layout.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Bgr8 | Self::Rgb8 => 3,
            Self::Gray8 => 1,
        }
    }
}

/// Frame construction errors.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("buffer size mismatch: expected {expected} bytes for {width}x{height} {format:?}, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        format: PixelFormat,
        expected: usize,
        actual: usize,
    },
}

/// A single captured or transformed frame.
///
/// The buffer is immutable once the frame is published into a queue slot;
/// a new frame replaces, never mutates, the old one. Slots hand frames out
/// as `Arc<Frame>` so consumers share one allocation instead of copying
/// multi-megabyte pixel buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    /// Capture timestamp in microseconds.
    pub timestamp_us: u64,
}

impl Frame {
    /// Create a frame, validating that the buffer matches the stated shape.
    pub fn new(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
        timestamp_us: u64,
    ) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(FrameError::SizeMismatch {
                width,
                height,
                format,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            timestamp_us,
        })
    }

    /// Raw pixel data in the layout given by [`Frame::format`].
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame and return the underlying buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout of the buffer.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Total buffer size in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}
