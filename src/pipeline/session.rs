use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::capture::backend::FrameSource;
use crate::capture::error::CaptureError;
use crate::capture::types::SourceId;
use crate::diagnostics::stats::{PipelineSnapshot, PipelineStats};
use crate::frame::Frame;
use crate::pipeline::error::Result;
use crate::pipeline::slot::FrameSlot;
use crate::pipeline::transform::{FrameTransform, TransformCell};
use crate::pipeline::worker::{ErrorCallback, Worker, WorkerState};

/// Configuration for the frame watchdog timer.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Time to wait for the first processed frame.
    pub frame_timeout: Duration,
    /// Poll interval for the watchdog thread.
    pub poll_interval: Duration,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            frame_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Session tuning knobs, injectable for tests.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum time to wait for the worker to exit during teardown.
    pub join_timeout: Duration,
    pub watchdog: WatchdogConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_secs(1),
            watchdog: WatchdogConfig::default(),
        }
    }
}

/// One capture-to-display pipeline instance, from start to confirmed teardown.
///
/// The session owns the hardware source and both handoff slots; the worker
/// thread only ever sees the slots, the transform cell, and the stats. The
/// embedder drives [`tick`](Self::tick) at its own redraw cadence — a slow
/// transform makes frames stale or dropped, never a tick late.
pub struct PipelineSession {
    source_id: SourceId,
    source: Option<Box<dyn FrameSource>>,
    raw_slot: Arc<FrameSlot>,
    processed_slot: Arc<FrameSlot>,
    transform: Arc<TransformCell>,
    stats: Arc<Mutex<PipelineStats>>,
    worker: Worker,
    watchdog: Option<JoinHandle<()>>,
    /// Signals the watchdog to exit early during teardown.
    shutdown: Arc<AtomicBool>,
    stopped: bool,
    config: SessionConfig,
}

impl PipelineSession {
    /// Create a session and start its worker thread.
    pub fn new(
        source_id: SourceId,
        source: Box<dyn FrameSource>,
        transform: Option<FrameTransform>,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        Self::with_config(source_id, source, transform, on_error, SessionConfig::default())
    }

    /// Create a session with explicit timeouts (for tests).
    pub fn with_config(
        source_id: SourceId,
        source: Box<dyn FrameSource>,
        transform: Option<FrameTransform>,
        on_error: Option<ErrorCallback>,
        config: SessionConfig,
    ) -> Self {
        let raw_slot = Arc::new(FrameSlot::new());
        let processed_slot = Arc::new(FrameSlot::new());
        let transform = Arc::new(TransformCell::new(transform));
        let stats = Arc::new(Mutex::new(PipelineStats::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        {
            let format = source.format();
            stats.lock().set_source_info(Some(format!(
                "{source_id} {}x{}",
                format.width, format.height
            )));
        }

        let worker = Worker::spawn(
            source_id.to_string(),
            Arc::clone(&raw_slot),
            Arc::clone(&processed_slot),
            Arc::clone(&transform),
            Arc::clone(&stats),
            on_error.clone(),
        );

        let watchdog = {
            let id = source_id.to_string();
            let slot = Arc::clone(&processed_slot);
            let shutdown = Arc::clone(&shutdown);
            let watchdog_config = config.watchdog.clone();
            Some(
                std::thread::Builder::new()
                    .name(format!("watchdog-{source_id}"))
                    .spawn(move || {
                        Self::run_watchdog_with_config(
                            &id,
                            &slot,
                            &shutdown,
                            on_error.as_ref(),
                            watchdog_config,
                        );
                    })
                    .expect("failed to spawn watchdog thread"),
            )
        };

        info!("capture session started for {source_id}");
        Self {
            source_id,
            source: Some(source),
            raw_slot,
            processed_slot,
            transform,
            stats,
            worker,
            watchdog,
            shutdown,
            stopped: false,
            config,
        }
    }

    /// One capture tick, called by the external redraw driver.
    ///
    /// Reads one raw frame, hands it to the worker (never blocking), and
    /// returns the most recent processed frame if one is ready. `Ok(None)`
    /// means nothing new to show — the embedder keeps its last frame. A
    /// capture error leaves the pipeline untouched; the next tick retries.
    pub fn tick(&mut self) -> Result<Option<Arc<Frame>>> {
        let source = self
            .source
            .as_mut()
            .ok_or_else(|| CaptureError::SourceClosed(self.source_id.to_string()))?;

        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.lock().record_capture_failure();
                return Err(e.into());
            }
        };

        self.stats.lock().record_capture(frame.byte_len());
        if self.raw_slot.publish(frame) {
            self.stats.lock().record_superseded();
        }

        let processed = self.processed_slot.try_take();
        if let Some(frame) = &processed {
            self.stats.lock().record_displayed(frame.timestamp_us);
        }
        Ok(processed)
    }

    /// Replace the per-frame transform; takes effect on the worker's next
    /// iteration, not the one in flight. `None` means pass-through.
    pub fn set_transform(&self, transform: Option<FrameTransform>) {
        self.transform.set(transform);
    }

    /// Stop the session. Idempotent.
    ///
    /// Teardown ordering: request worker stop, close the slots (waking a
    /// worker blocked on its input), join within the configured window, and
    /// only then release the source. If the worker does not exit in time the
    /// error is returned, the source stays held, and a later retry can
    /// finish the teardown.
    pub fn stop(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        self.shutdown.store(true, Ordering::Release);
        self.worker.request_stop();
        self.raw_slot.close();
        self.processed_slot.close();

        if let Err(e) = self.worker.join_within(self.config.join_timeout) {
            warn!("worker for {} failed to stop: {e}", self.source_id);
            return Err(e);
        }
        if let Some(handle) = self.watchdog.take() {
            let _ = handle.join();
        }
        if let Some(mut source) = self.source.take() {
            source.release();
        }
        self.stopped = true;
        info!("capture session stopped for {}", self.source_id);
        Ok(())
    }

    /// Whether teardown has completed.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Return the source ID for this session.
    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    /// Current worker lifecycle state.
    pub fn worker_state(&self) -> WorkerState {
        self.worker.state()
    }

    /// Take a snapshot of pipeline stats for this session.
    pub fn diagnostics(&self) -> PipelineSnapshot {
        self.stats.lock().snapshot()
    }

    /// Watchdog: checks that a processed frame appears within the configured
    /// window and reports via `on_error` if the pipeline produces nothing.
    fn run_watchdog_with_config(
        source_id: &str,
        processed_slot: &FrameSlot,
        shutdown: &AtomicBool,
        on_error: Option<&ErrorCallback>,
        config: WatchdogConfig,
    ) {
        let deadline = Instant::now() + config.frame_timeout;
        loop {
            if shutdown.load(Ordering::Acquire) {
                return;
            }
            if processed_slot.sequence() > 0 {
                // Frames are flowing — the pipeline is healthy.
                return;
            }
            if Instant::now() >= deadline {
                warn!(
                    "watchdog: no processed frames within {}ms for {source_id}",
                    config.frame_timeout.as_millis()
                );
                if let Some(cb) = on_error {
                    cb(
                        source_id,
                        &format!(
                            "pipeline produced no frames ({}ms timeout)",
                            config.frame_timeout.as_millis()
                        ),
                    );
                }
                return;
            }
            std::thread::sleep(config.poll_interval);
        }
    }
}

impl Drop for PipelineSession {
    /// Best-effort shutdown signal for sessions dropped without `stop()`.
    ///
    /// Closes the slots so the worker wakes and exits on its own; the
    /// ordered teardown with a bounded join and source release still
    /// requires an explicit `stop()`.
    fn drop(&mut self) {
        if !self.stopped {
            self.shutdown.store(true, Ordering::Release);
            self.worker.request_stop();
            self.raw_slot.close();
            self.processed_slot.close();
        }
    }
}
