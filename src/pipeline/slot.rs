use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::frame::Frame;

/// Single-slot overwrite queue for frame handoff between two threads.
///
/// Holds at most one frame. A `publish` onto a full slot displaces the
/// unconsumed frame instead of blocking the producer or growing a backlog;
/// a blocking `take` suspends the consumer until content arrives. Safe for
/// one producer and one consumer operating concurrently; the only delivery
/// guarantee is "most recent publish wins" — intermediate frames are never
/// delivered.
///
/// Internally synchronised with its own lock/condition pair. Callers never
/// need an external locking discipline.
pub struct FrameSlot {
    inner: Mutex<SlotState>,
    available: Condvar,
    /// Monotonic count of publishes — used for stall detection even when
    /// frame timestamps are unreliable.
    sequence: AtomicU64,
}

struct SlotState {
    frame: Option<Arc<Frame>>,
    closed: bool,
}

impl FrameSlot {
    /// Create an empty, open slot.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SlotState {
                frame: None,
                closed: false,
            }),
            available: Condvar::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Store `frame` as the sole slot content and wake a blocked taker.
    ///
    /// Never blocks. Returns `true` if an unconsumed frame was displaced —
    /// the silent-drop side effect, surfaced so callers can count it.
    /// Publishing onto a closed slot drops the frame and returns `false`.
    pub fn publish(&self, frame: impl Into<Arc<Frame>>) -> bool {
        let mut state = self.inner.lock();
        if state.closed {
            return false;
        }
        let displaced = state.frame.replace(frame.into()).is_some();
        self.sequence.fetch_add(1, Ordering::Relaxed);
        drop(state);
        self.available.notify_one();
        displaced
    }

    /// Remove and return the slot content, blocking while the slot is empty.
    ///
    /// Returns `None` once the slot is closed and drained. Taking the last
    /// content leaves the slot empty, so a subsequent `take` suspends again.
    pub fn take(&self) -> Option<Arc<Frame>> {
        let mut state = self.inner.lock();
        loop {
            if let Some(frame) = state.frame.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Non-blocking variant of [`take`](Self::take); an empty slot yields
    /// `None` rather than suspending the caller.
    pub fn try_take(&self) -> Option<Arc<Frame>> {
        self.inner.lock().frame.take()
    }

    /// Close the slot, waking every blocked taker.
    ///
    /// Pending content stays drainable; once empty, `take` returns `None`.
    /// Used at teardown so a consumer blocked in `take` observably exits.
    pub fn close(&self) {
        let mut state = self.inner.lock();
        state.closed = true;
        drop(state);
        self.available.notify_all();
    }

    /// Whether the slot has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Monotonic publish count. Increases by 1 for each accepted publish.
    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;
    use std::time::{Duration, Instant};

    fn tagged_frame(tag: u64) -> Frame {
        Frame::new(2, 2, PixelFormat::Gray8, vec![tag as u8; 4], tag).unwrap()
    }

    #[test]
    fn take_returns_published_frame() {
        let slot = FrameSlot::new();
        slot.publish(tagged_frame(7));
        let frame = slot.take().unwrap();
        assert_eq!(frame.timestamp_us, 7);
    }

    #[test]
    fn last_publish_wins_and_slot_is_empty_after_take() {
        let slot = FrameSlot::new();
        for tag in 0..5 {
            slot.publish(tagged_frame(tag));
        }
        let frame = slot.take().unwrap();
        assert_eq!(frame.timestamp_us, 4);
        assert!(slot.try_take().is_none());
    }

    #[test]
    fn publish_reports_displacement() {
        let slot = FrameSlot::new();
        assert!(!slot.publish(tagged_frame(0)));
        assert!(slot.publish(tagged_frame(1)));
        slot.take();
        assert!(!slot.publish(tagged_frame(2)));
    }

    #[test]
    fn try_take_on_empty_slot_returns_none() {
        let slot = FrameSlot::new();
        assert!(slot.try_take().is_none());
    }

    #[test]
    fn take_blocks_until_first_publish() {
        let slot = Arc::new(FrameSlot::new());
        let producer = Arc::clone(&slot);
        let started = Instant::now();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            producer.publish(tagged_frame(42));
        });

        let frame = slot.take().unwrap();
        assert_eq!(frame.timestamp_us, 42);
        assert!(
            started.elapsed() >= Duration::from_millis(40),
            "take should have waited for the publish"
        );
        handle.join().unwrap();
    }

    #[test]
    fn signal_resets_after_drain() {
        let slot = Arc::new(FrameSlot::new());
        slot.publish(tagged_frame(1));
        slot.take();

        // The slot is empty again; a second take must wait for a new publish,
        // not return stale content.
        let producer = Arc::clone(&slot);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            producer.publish(tagged_frame(2));
        });
        let frame = slot.take().unwrap();
        assert_eq!(frame.timestamp_us, 2);
        handle.join().unwrap();
    }

    #[test]
    fn close_wakes_blocked_taker() {
        let slot = Arc::new(FrameSlot::new());
        let taker = Arc::clone(&slot);

        let handle = std::thread::spawn(move || taker.take());
        std::thread::sleep(Duration::from_millis(30));
        slot.close();

        let result = handle.join().unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn close_leaves_pending_frame_drainable() {
        let slot = FrameSlot::new();
        slot.publish(tagged_frame(9));
        slot.close();

        assert_eq!(slot.take().unwrap().timestamp_us, 9);
        assert!(slot.take().is_none());
    }

    #[test]
    fn publish_after_close_is_dropped() {
        let slot = FrameSlot::new();
        slot.close();
        assert!(!slot.publish(tagged_frame(1)));
        assert!(slot.take().is_none());
        assert_eq!(slot.sequence(), 0);
    }

    #[test]
    fn sequence_counts_publishes() {
        let slot = FrameSlot::new();
        assert_eq!(slot.sequence(), 0);
        slot.publish(tagged_frame(0));
        slot.publish(tagged_frame(1));
        assert_eq!(slot.sequence(), 2);
        slot.take();
        assert_eq!(slot.sequence(), 2);
    }

    #[test]
    fn concurrent_producer_consumer_sees_monotonic_sequence() {
        const FRAMES: u64 = 500;
        let slot = Arc::new(FrameSlot::new());
        let producer_slot = Arc::clone(&slot);

        let producer = std::thread::spawn(move || {
            for tag in 0..FRAMES {
                producer_slot.publish(tagged_frame(tag));
                if tag % 16 == 0 {
                    std::thread::yield_now();
                }
            }
            producer_slot.close();
        });

        let mut observed = Vec::new();
        while let Some(frame) = slot.take() {
            observed.push(frame.timestamp_us);
        }
        producer.join().unwrap();

        assert!(!observed.is_empty());
        // Strictly increasing: take removes content, so a frame can never be
        // observed twice, and the overwrite slot never reorders.
        assert!(
            observed.windows(2).all(|w| w[0] < w[1]),
            "observed sequence numbers must be strictly increasing"
        );
        assert_eq!(
            *observed.last().unwrap(),
            FRAMES - 1,
            "final frame must not be lost at close"
        );
    }

    #[test]
    fn slot_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrameSlot>();
    }
}
