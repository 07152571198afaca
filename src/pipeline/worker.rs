use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::diagnostics::stats::PipelineStats;
use crate::frame::Frame;
use crate::pipeline::error::PipelineError;
use crate::pipeline::slot::FrameSlot;
use crate::pipeline::transform::{FrameTransform, TransformCell, TransformError};

/// Callback type for reporting per-frame failures to the embedder.
/// Arguments: (source_id, error_message).
pub type ErrorCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Interval at which a bounded join polls the worker thread.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Observable worker lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Thread spawned, loop not yet entered.
    Idle,
    /// Loop running: wait for raw frame, transform, publish.
    Running,
    /// Stop flag set; the loop observes it between iterations.
    StopRequested,
    /// Loop exited.
    Terminated,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::StopRequested,
            _ => Self::Terminated,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::StopRequested => 2,
            Self::Terminated => 3,
        }
    }
}

/// Handle to one capture session's worker thread.
///
/// The worker holds references to the two queue slots, the transform cell,
/// and the stats — never to the capture device. Stopping is cooperative:
/// the flag is checked between iterations, and a worker blocked waiting for
/// a raw frame is released by closing the raw slot.
pub struct Worker {
    state: Arc<AtomicU8>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn the worker thread for one capture session.
    pub fn spawn(
        source_id: String,
        raw_slot: Arc<FrameSlot>,
        processed_slot: Arc<FrameSlot>,
        transform: Arc<TransformCell>,
        stats: Arc<Mutex<PipelineStats>>,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        let state = Arc::new(AtomicU8::new(WorkerState::Idle.as_u8()));
        let stop = Arc::new(AtomicBool::new(false));

        let thread_state = Arc::clone(&state);
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name(format!("worker-{source_id}"))
            .spawn(move || {
                run_worker(
                    &source_id,
                    &raw_slot,
                    &processed_slot,
                    &transform,
                    &stats,
                    on_error.as_ref(),
                    &thread_stop,
                    &thread_state,
                );
            })
            .expect("failed to spawn worker thread");

        Self {
            state,
            stop,
            handle: Some(handle),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Set the cooperative stop flag.
    ///
    /// The loop observes the flag between iterations; a worker blocked in
    /// `take` additionally needs the raw slot closed to wake up.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        // Don't mask a loop that has already exited.
        let _ = self.state.compare_exchange(
            WorkerState::Running.as_u8(),
            WorkerState::StopRequested.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        let _ = self.state.compare_exchange(
            WorkerState::Idle.as_u8(),
            WorkerState::StopRequested.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Wait up to `timeout` for the thread to terminate, then join it.
    ///
    /// On timeout the handle is retained so a later retry can still join;
    /// the caller must treat the error as a resource leak and must not
    /// release the capture device. Returns `Ok` if already joined.
    pub fn join_within(&mut self, timeout: Duration) -> Result<(), PipelineError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                self.handle = Some(handle);
                return Err(PipelineError::WorkerUnresponsive {
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            std::thread::sleep(JOIN_POLL_INTERVAL);
        }
        let _ = handle.join();
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    source_id: &str,
    raw_slot: &FrameSlot,
    processed_slot: &FrameSlot,
    transform: &TransformCell,
    stats: &Mutex<PipelineStats>,
    on_error: Option<&ErrorCallback>,
    stop: &AtomicBool,
    state: &AtomicU8,
) {
    state.store(WorkerState::Running.as_u8(), Ordering::Release);
    debug!("worker thread starting for {source_id}");

    loop {
        // The stop flag is only checked between iterations.
        if stop.load(Ordering::Acquire) {
            break;
        }
        // None means the raw slot was closed: teardown in progress.
        let Some(raw) = raw_slot.take() else {
            break;
        };

        let outcome = match transform.current() {
            // Pass-through: republish the raw frame unchanged.
            None => Ok(raw),
            Some(f) => apply_transform(&f, &raw).map(Arc::new),
        };

        match outcome {
            Ok(frame) => {
                let displaced = processed_slot.publish(frame);
                let mut stats = stats.lock();
                stats.record_processed();
                if displaced {
                    stats.record_superseded();
                }
            }
            Err(e) => {
                // One bad frame never kills the pipeline: count it, report
                // it, drop it, keep going.
                stats.lock().record_transform_failure();
                warn!("transform failed for {source_id}: {e}");
                if let Some(cb) = on_error {
                    cb(source_id, &e.to_string());
                }
            }
        }
    }

    state.store(WorkerState::Terminated.as_u8(), Ordering::Release);
    debug!("worker thread exiting for {source_id}");
}

/// Run the transform with panic containment.
fn apply_transform(transform: &FrameTransform, frame: &Frame) -> Result<Frame, TransformError> {
    match catch_unwind(AssertUnwindSafe(|| transform(frame))) {
        Ok(result) => result,
        Err(_) => Err(TransformError::Panicked),
    }
}
