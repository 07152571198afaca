use serde::Serialize;
use std::time::Instant;

/// Collects statistics for one capture-to-display pipeline session.
pub struct PipelineStats {
    frames_captured: u64,
    frames_processed: u64,
    frames_superseded: u64,
    capture_failures: u64,
    transform_failures: u64,
    total_bytes: u64,
    start_time: Instant,
    latency_us: u64,
    source_info: Option<String>,
}

/// Snapshot of pipeline stats for serialisation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    pub fps: f64,
    pub frames_captured: u64,
    pub frames_processed: u64,
    pub frames_superseded: u64,
    pub capture_failures: u64,
    pub transform_failures: u64,
    pub drop_rate: f64,
    pub latency_ms: f64,
    pub bandwidth_bps: u64,
    pub source_info: Option<String>,
}

impl PipelineStats {
    /// Create new stats with zeroed counters.
    pub fn new() -> Self {
        Self {
            frames_captured: 0,
            frames_processed: 0,
            frames_superseded: 0,
            capture_failures: 0,
            transform_failures: 0,
            total_bytes: 0,
            start_time: Instant::now(),
            latency_us: 0,
            source_info: None,
        }
    }

    /// Set a human-readable description of the capture source.
    pub fn set_source_info(&mut self, info: Option<String>) {
        self.source_info = info;
    }

    /// Record a successfully captured raw frame.
    pub fn record_capture(&mut self, bytes: usize) {
        self.frames_captured += 1;
        self.total_bytes += bytes as u64;
    }

    /// Record a failed capture tick.
    pub fn record_capture_failure(&mut self) {
        self.capture_failures += 1;
    }

    /// Record a frame published by the worker.
    pub fn record_processed(&mut self) {
        self.frames_processed += 1;
    }

    /// Record a frame displaced unconsumed from a queue slot.
    pub fn record_superseded(&mut self) {
        self.frames_superseded += 1;
    }

    /// Record a transform failure (frame dropped, worker continues).
    pub fn record_transform_failure(&mut self) {
        self.transform_failures += 1;
    }

    /// Record delivery of a processed frame to the display side.
    ///
    /// Latency is measured from the frame's capture timestamp to now, both
    /// expressed as microseconds since session start.
    pub fn record_displayed(&mut self, capture_timestamp_us: u64) {
        let now_us = self.start_time.elapsed().as_micros() as u64;
        if capture_timestamp_us <= now_us {
            self.latency_us = now_us - capture_timestamp_us;
        }
    }

    /// Processed-frame rate based on elapsed session time.
    pub fn fps(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0.0;
        }
        self.frames_processed as f64 / elapsed
    }

    /// Superseded rate as a percentage of captured frames (0.0 - 100.0).
    pub fn drop_rate(&self) -> f64 {
        if self.frames_captured == 0 {
            return 0.0;
        }
        (self.frames_superseded as f64 / self.frames_captured as f64) * 100.0
    }

    /// Latest capture-to-display latency in milliseconds.
    pub fn latency_ms(&self) -> f64 {
        self.latency_us as f64 / 1000.0
    }

    /// Raw capture bandwidth in bytes per second.
    pub fn bandwidth_bps(&self) -> u64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < 0.001 {
            return 0;
        }
        (self.total_bytes as f64 / elapsed) as u64
    }

    /// Number of transform failures so far.
    pub fn transform_failures(&self) -> u64 {
        self.transform_failures
    }

    /// Number of frames the worker has published so far.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Reset all counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Take a serialisable snapshot.
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            fps: self.fps(),
            frames_captured: self.frames_captured,
            frames_processed: self.frames_processed,
            frames_superseded: self.frames_superseded,
            capture_failures: self.capture_failures,
            transform_failures: self.transform_failures,
            drop_rate: self.drop_rate(),
            latency_ms: self.latency_ms(),
            bandwidth_bps: self.bandwidth_bps(),
            source_info: self.source_info.clone(),
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn initialises_with_zero_values() {
        let stats = PipelineStats::new();
        assert_eq!(stats.frames_captured, 0);
        assert_eq!(stats.frames_processed, 0);
        assert_eq!(stats.frames_superseded, 0);
        assert_eq!(stats.transform_failures, 0);
        assert_eq!(stats.latency_us, 0);
    }

    #[test]
    fn record_capture_tracks_count_and_bytes() {
        let mut stats = PipelineStats::new();
        stats.record_capture(1000);
        stats.record_capture(500);
        assert_eq!(stats.frames_captured, 2);
        assert_eq!(stats.total_bytes, 1500);
    }

    #[test]
    fn record_superseded_increments_counter() {
        let mut stats = PipelineStats::new();
        stats.record_superseded();
        stats.record_superseded();
        assert_eq!(stats.frames_superseded, 2);
    }

    #[test]
    fn fps_is_positive_once_frames_flow() {
        let mut stats = PipelineStats::new();
        for _ in 0..30 {
            stats.record_processed();
        }
        thread::sleep(Duration::from_millis(100));
        let fps = stats.fps();
        assert!(fps > 0.0, "fps should be positive, got {fps}");
    }

    #[test]
    fn drop_rate_is_superseded_over_captured() {
        let mut stats = PipelineStats::new();
        stats.record_capture(100);
        stats.record_capture(100);
        stats.record_capture(100);
        stats.record_superseded();
        // 1 superseded out of 3 captured = 33.3%
        let rate = stats.drop_rate();
        assert!(
            (rate - 33.333).abs() < 1.0,
            "drop rate should be ~33%, got {rate}"
        );
    }

    #[test]
    fn drop_rate_zero_when_no_captures() {
        let stats = PipelineStats::new();
        assert_eq!(stats.drop_rate(), 0.0);
    }

    #[test]
    fn bandwidth_bps_tracks_bytes() {
        let mut stats = PipelineStats::new();
        stats.record_capture(10_000);
        thread::sleep(Duration::from_millis(50));
        let bps = stats.bandwidth_bps();
        assert!(bps > 0, "bandwidth should be positive, got {bps}");
    }

    #[test]
    fn capture_failure_does_not_count_as_capture() {
        let mut stats = PipelineStats::new();
        stats.record_capture_failure();
        assert_eq!(stats.frames_captured, 0);
        assert_eq!(stats.snapshot().capture_failures, 1);
    }

    #[test]
    fn reset_clears_all_counters() {
        let mut stats = PipelineStats::new();
        stats.record_capture(1000);
        stats.record_processed();
        stats.record_transform_failure();
        stats.reset();
        assert_eq!(stats.frames_captured, 0);
        assert_eq!(stats.frames_processed, 0);
        assert_eq!(stats.transform_failures, 0);
        assert_eq!(stats.total_bytes, 0);
    }

    #[test]
    fn snapshot_produces_serialisable_data() {
        let mut stats = PipelineStats::new();
        stats.record_capture(5000);
        stats.record_processed();
        let snap = stats.snapshot();
        let json = serde_json::to_value(&snap).unwrap();
        assert!(json["framesCaptured"].is_number());
        assert!(json["framesProcessed"].is_number());
        assert!(json["transformFailures"].is_number());
    }

    #[test]
    fn snapshot_includes_source_info() {
        let mut stats = PipelineStats::new();
        stats.set_source_info(Some("Synthetic Camera 0".to_string()));
        let snap = stats.snapshot();
        assert_eq!(snap.source_info, Some("Synthetic Camera 0".to_string()));
    }

    #[test]
    fn snapshot_source_info_none_serialises_as_null() {
        let stats = PipelineStats::new();
        let json = serde_json::to_value(&stats.snapshot()).unwrap();
        assert!(json["sourceInfo"].is_null());
    }
}
