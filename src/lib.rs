//! Double-buffered camera frame processing pipeline.
//!
//! Decouples frame capture, driven by an embedder's redraw clock, from a
//! potentially slow per-frame transform running on a dedicated worker
//! thread. Two single-slot overwrite queues carry frames between the two:
//! under load the pipeline drops stale frames instead of queuing them, so
//! the display cadence is never gated by transform latency.
//!
//! The embedder owns the redraw cadence and calls
//! [`PipelineSession::tick`](pipeline::session::PipelineSession::tick) on
//! each refresh; everything else — the worker, the handoff slots, teardown
//! ordering — lives in here.
//!
//! ```no_run
//! use framepipe::capture::synthetic::SyntheticBackend;
//! use framepipe::capture::types::FrameFormat;
//! use framepipe::pipeline::registry::SessionRegistry;
//!
//! let backend = SyntheticBackend::new();
//! let registry = SessionRegistry::new();
//! let id = SyntheticBackend::device_id(0);
//! registry
//!     .start_session(&backend, &id, &FrameFormat::default(), None, None)
//!     .unwrap();
//!
//! // Called from the embedder's redraw callback:
//! if let Some(frame) = registry.tick(&id).unwrap() {
//!     // hand `frame` to the display surface
//!     let _ = frame.data();
//! }
//!
//! registry.stop_session(&id).unwrap();
//! ```

pub mod capture;
pub mod diagnostics;
pub mod frame;
pub mod pipeline;
pub mod profile;

pub use capture::backend::{CaptureBackend, FrameSource};
pub use capture::types::{CaptureDevice, FrameFormat, SourceId};
pub use frame::{Frame, PixelFormat};
pub use pipeline::registry::SessionRegistry;
pub use pipeline::session::PipelineSession;
pub use pipeline::slot::FrameSlot;
pub use pipeline::transform::{FrameTransform, TransformError};
pub use pipeline::worker::WorkerState;
