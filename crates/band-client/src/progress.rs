//! Upload progress tracking.
//!
//! Progress is reported as `(bytes_sent, bytes_total)` pairs. Within one
//! transfer `bytes_sent` never decreases, and a successful transfer always
//! ends with an event where `bytes_sent == bytes_total`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

/// Callback receiving progress events.
pub type ProgressSink = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Snapshot of an upload in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    pub bytes_sent: u64,
    pub bytes_total: u64,
    pub started_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl UploadProgress {
    pub fn percent_complete(&self) -> f64 {
        if self.bytes_total == 0 {
            return 0.0;
        }
        (self.bytes_sent as f64 / self.bytes_total as f64) * 100.0
    }

    pub fn bytes_per_second(&self) -> f64 {
        let elapsed = (self.last_update - self.started_at).num_milliseconds() as f64 / 1000.0;
        if elapsed > 0.0 {
            self.bytes_sent as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.bytes_sent == self.bytes_total
    }
}

struct TrackerInner {
    total: u64,
    started_at: DateTime<Utc>,
    sent: AtomicU64,
    // Serializes emission so events reach the sink in counter order.
    emit_lock: Mutex<()>,
    sink: Option<ProgressSink>,
}

/// Shared, clonable progress counter for one upload.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<TrackerInner>,
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("total", &self.inner.total)
            .field("sent", &self.bytes_sent())
            .finish()
    }
}

impl ProgressTracker {
    pub fn new(total: u64, sink: ProgressSink) -> Self {
        Self::build(total, Some(sink))
    }

    /// A tracker that counts but reports nowhere.
    pub fn silent(total: u64) -> Self {
        Self::build(total, None)
    }

    fn build(total: u64, sink: Option<ProgressSink>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                total,
                started_at: Utc::now(),
                sent: AtomicU64::new(0),
                emit_lock: Mutex::new(()),
                sink,
            }),
        }
    }

    pub fn bytes_total(&self) -> u64 {
        self.inner.total
    }

    pub fn bytes_sent(&self) -> u64 {
        self.inner.sent.load(Ordering::Acquire)
    }

    /// Emit the initial `(0, total)` event.
    pub fn start(&self) {
        self.emit();
    }

    /// Record `n` more bytes handed to the transport.
    pub fn advance(&self, n: u64) {
        let total = self.inner.total;
        let _ = self
            .inner
            .sent
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |sent| {
                Some(sent.saturating_add(n).min(total))
            });
        self.emit();
    }

    /// Mark the transfer as successfully completed.
    pub fn finish(&self) {
        let previous = self.inner.sent.swap(self.inner.total, Ordering::AcqRel);
        if previous < self.inner.total {
            self.emit();
        }
    }

    pub fn snapshot(&self) -> UploadProgress {
        UploadProgress {
            bytes_sent: self.bytes_sent(),
            bytes_total: self.inner.total,
            started_at: self.inner.started_at,
            last_update: Utc::now(),
        }
    }

    fn emit(&self) {
        if let Some(sink) = &self.inner.sink {
            let _guard = self.inner.emit_lock.lock().unwrap_or_else(|e| e.into_inner());
            sink(self.snapshot());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(total: u64) -> (ProgressTracker, Arc<Mutex<Vec<(u64, u64)>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let tracker = ProgressTracker::new(
            total,
            Arc::new(move |p: UploadProgress| {
                sink_events.lock().unwrap().push((p.bytes_sent, p.bytes_total));
            }),
        );
        (tracker, events)
    }

    #[test]
    fn test_progress_percent() {
        let progress = UploadProgress {
            bytes_sent: 500,
            bytes_total: 1000,
            started_at: Utc::now(),
            last_update: Utc::now(),
        };
        assert_eq!(progress.percent_complete(), 50.0);
    }

    #[test]
    fn test_progress_zero_total() {
        let progress = UploadProgress {
            bytes_sent: 0,
            bytes_total: 0,
            started_at: Utc::now(),
            last_update: Utc::now(),
        };
        assert_eq!(progress.percent_complete(), 0.0);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_tracker_sequence() {
        let (tracker, events) = recording(10);
        tracker.start();
        tracker.advance(4);
        tracker.advance(4);
        tracker.advance(4);
        tracker.finish();

        let events = events.lock().unwrap();
        assert_eq!(*events, vec![(0, 10), (4, 10), (8, 10), (10, 10)]);
    }

    #[test]
    fn test_finish_emits_when_short() {
        let (tracker, events) = recording(10);
        tracker.start();
        tracker.advance(3);
        tracker.finish();

        let events = events.lock().unwrap();
        assert_eq!(events.last(), Some(&(10, 10)));
    }

    #[test]
    fn test_silent_tracker_counts() {
        let tracker = ProgressTracker::silent(8);
        tracker.advance(5);
        assert_eq!(tracker.bytes_sent(), 5);
        tracker.finish();
        assert_eq!(tracker.bytes_sent(), 8);
    }
}
