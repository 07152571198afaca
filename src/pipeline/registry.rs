use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::capture::backend::CaptureBackend;
use crate::capture::error::CaptureError;
use crate::capture::types::{FrameFormat, SourceId};
use crate::diagnostics::stats::PipelineSnapshot;
use crate::frame::Frame;
use crate::pipeline::error::Result;
use crate::pipeline::session::{PipelineSession, SessionConfig};
use crate::pipeline::transform::FrameTransform;
use crate::pipeline::worker::ErrorCallback;

/// Registry of active pipeline sessions, keyed by source ID.
///
/// Guarantees at most one session — and therefore one worker thread — per
/// device: starting a session for a device that already has one stops the
/// old worker (cooperatively, waiting for confirmed termination) before the
/// new one spins up.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, PipelineSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Start a capture session for `id`, replacing any existing one.
    ///
    /// The device is resolved against the backend first, so an unknown ID
    /// fails before any teardown happens. If the existing session's worker
    /// cannot be stopped, the old session is kept and the error returned —
    /// never two workers racing on the same device.
    pub fn start_session(
        &self,
        backend: &dyn CaptureBackend,
        id: &SourceId,
        format: &FrameFormat,
        transform: Option<FrameTransform>,
        on_error: Option<ErrorCallback>,
    ) -> Result<()> {
        self.start_session_with_config(
            backend,
            id,
            format,
            transform,
            on_error,
            SessionConfig::default(),
        )
    }

    /// `start_session` with explicit timeouts (for tests).
    pub fn start_session_with_config(
        &self,
        backend: &dyn CaptureBackend,
        id: &SourceId,
        format: &FrameFormat,
        transform: Option<FrameTransform>,
        on_error: Option<ErrorCallback>,
        config: SessionConfig,
    ) -> Result<()> {
        let devices = backend.enumerate_devices()?;
        if !devices.iter().any(|d| &d.id == id) {
            return Err(CaptureError::SourceNotFound(id.to_string()).into());
        }

        let mut sessions = self.sessions.lock();
        if let Some(mut existing) = sessions.remove(id.as_str()) {
            if let Err(e) = existing.stop() {
                sessions.insert(id.as_str().to_string(), existing);
                return Err(e);
            }
        }

        let source = backend.open_source(id, format)?;
        let session =
            PipelineSession::with_config(id.clone(), source, transform, on_error, config);
        sessions.insert(id.as_str().to_string(), session);
        Ok(())
    }

    /// Stop and remove the session for `id`. Idempotent.
    pub fn stop_session(&self, id: &SourceId) -> Result<()> {
        let mut sessions = self.sessions.lock();
        if let Some(mut session) = sessions.remove(id.as_str()) {
            if let Err(e) = session.stop() {
                sessions.insert(id.as_str().to_string(), session);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Run one capture tick on the session for `id`.
    pub fn tick(&self, id: &SourceId) -> Result<Option<Arc<Frame>>> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(id.as_str())
            .ok_or_else(|| CaptureError::SourceNotFound(id.to_string()))?;
        session.tick()
    }

    /// Replace the transform on an active session. Returns `false` if no
    /// session exists for `id`.
    pub fn set_transform(&self, id: &SourceId, transform: Option<FrameTransform>) -> bool {
        let sessions = self.sessions.lock();
        match sessions.get(id.as_str()) {
            Some(session) => {
                session.set_transform(transform);
                true
            }
            None => false,
        }
    }

    /// Stats snapshot for an active session.
    pub fn diagnostics(&self, id: &SourceId) -> Option<PipelineSnapshot> {
        self.sessions.lock().get(id.as_str()).map(|s| s.diagnostics())
    }

    /// IDs of currently active sessions.
    pub fn active_sessions(&self) -> Vec<String> {
        self.sessions.lock().keys().cloned().collect()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
