use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::capture::backend::{CaptureBackend, FrameSource};
use crate::capture::error::{CaptureError, Result};
use crate::capture::types::{CaptureDevice, FrameFormat, SourceId};
use crate::frame::{Frame, PixelFormat};

const SYNTH_DEVICE_PREFIX: &str = "synth:camera-";
const SYNTH_DEVICE_NAME: &str = "Synthetic Camera";

/// Nominal frame cadence used for synthetic timestamps.
const SYNTH_FRAME_INTERVAL_US: u64 = 1_000_000 / 30;

/// Shared fault-injection handle for a [`SyntheticSource`].
///
/// Lets tests trigger a one-shot read failure after the source has been
/// boxed and moved into a session.
#[derive(Clone)]
pub struct SyntheticFault(Arc<AtomicBool>);

impl SyntheticFault {
    /// Make the next `read_frame` on the associated source fail.
    pub fn fail_next_read(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// A hardware-free capture backend producing deterministic test patterns.
///
/// Enable for embedders via the `SYNTHETIC_CAMERA=1` environment variable;
/// tests construct it directly. Devices are `synth:camera-000` through
/// `synth:camera-NNN` and always report as connected.
pub struct SyntheticBackend {
    device_count: usize,
}

impl SyntheticBackend {
    /// Create a backend exposing a single synthetic device.
    pub fn new() -> Self {
        Self::with_device_count(1)
    }

    /// Create a backend exposing `device_count` synthetic devices.
    pub fn with_device_count(device_count: usize) -> Self {
        Self { device_count }
    }

    /// Whether the synthetic camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("SYNTHETIC_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }

    /// The stable device ID for the synthetic device at `index`.
    pub fn device_id(index: usize) -> SourceId {
        SourceId::new(format!("{SYNTH_DEVICE_PREFIX}{index:03}"))
    }
}

impl Default for SyntheticBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for SyntheticBackend {
    fn enumerate_devices(&self) -> Result<Vec<CaptureDevice>> {
        Ok((0..self.device_count)
            .map(|i| CaptureDevice {
                id: Self::device_id(i),
                name: format!("{SYNTH_DEVICE_NAME} {i}"),
                is_connected: true,
            })
            .collect())
    }

    fn open_source(&self, id: &SourceId, format: &FrameFormat) -> Result<Box<dyn FrameSource>> {
        let known = (0..self.device_count).any(|i| &Self::device_id(i) == id);
        if !known {
            return Err(CaptureError::SourceNotFound(id.to_string()));
        }
        Ok(Box::new(SyntheticSource::new(id.clone(), *format)))
    }
}

/// Synthetic frame source: a colour gradient with a per-frame varying channel,
/// so consecutive frames differ and tests can tell them apart by content.
pub struct SyntheticSource {
    id: SourceId,
    format: FrameFormat,
    frame_index: u64,
    released: bool,
    fail_next: Arc<AtomicBool>,
}

impl SyntheticSource {
    /// Create a source delivering frames of the given shape.
    pub fn new(id: SourceId, format: FrameFormat) -> Self {
        Self {
            id,
            format,
            frame_index: 0,
            released: false,
            fail_next: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for injecting read faults from tests.
    pub fn fault_handle(&self) -> SyntheticFault {
        SyntheticFault(Arc::clone(&self.fail_next))
    }

    /// Number of frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.frame_index
    }

    fn render_pattern(&self) -> Vec<u8> {
        let FrameFormat {
            width,
            height,
            pixel_format,
        } = self.format;
        let tick = self.frame_index as u8;
        let mut data = Vec::with_capacity(self.format.frame_bytes());
        for y in 0..height {
            for x in 0..width {
                let h_ramp = ((x * 255) / width.max(1)) as u8;
                let v_ramp = ((y * 255) / height.max(1)) as u8;
                match pixel_format {
                    PixelFormat::Bgr8 => {
                        data.extend_from_slice(&[h_ramp, v_ramp, tick]);
                    }
                    PixelFormat::Rgb8 => {
                        data.extend_from_slice(&[tick, v_ramp, h_ramp]);
                    }
                    PixelFormat::Gray8 => {
                        data.push(h_ramp.wrapping_add(v_ramp).wrapping_add(tick));
                    }
                }
            }
        }
        data
    }
}

impl FrameSource for SyntheticSource {
    fn read_frame(&mut self) -> Result<Frame> {
        if self.released {
            return Err(CaptureError::SourceClosed(self.id.to_string()));
        }
        if self.fail_next.swap(false, Ordering::AcqRel) {
            return Err(CaptureError::ReadFailed(format!(
                "injected fault on {}",
                self.id
            )));
        }
        let data = self.render_pattern();
        let timestamp_us = self.frame_index * SYNTH_FRAME_INTERVAL_US;
        self.frame_index += 1;
        Ok(Frame::new(
            self.format.width,
            self.format.height,
            self.format.pixel_format,
            data,
            timestamp_us,
        )?)
    }

    fn release(&mut self) {
        if !self.released {
            debug!("synthetic source released: {}", self.id);
        }
        self.released = true;
    }

    fn format(&self) -> FrameFormat {
        self.format
    }
}
