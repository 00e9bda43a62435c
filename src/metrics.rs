use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Export counters for monitoring
#[derive(Clone)]
pub struct Metrics {
    pub exports_started: Arc<AtomicUsize>,
    pub exports_completed: Arc<AtomicUsize>,
    pub exports_failed: Arc<AtomicUsize>,
    pub exports_abandoned: Arc<AtomicUsize>,
    pub exports_rejected_busy: Arc<AtomicUsize>,
    pub images_archived: Arc<AtomicU64>,
    pub bytes_streamed: Arc<AtomicU64>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            exports_started: Arc::new(AtomicUsize::new(0)),
            exports_completed: Arc::new(AtomicUsize::new(0)),
            exports_failed: Arc::new(AtomicUsize::new(0)),
            exports_abandoned: Arc::new(AtomicUsize::new(0)),
            exports_rejected_busy: Arc::new(AtomicUsize::new(0)),
            images_archived: Arc::new(AtomicU64::new(0)),
            bytes_streamed: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_exports_started(&self) {
        self.exports_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_exports_completed(&self) {
        self.exports_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_exports_failed(&self) {
        self.exports_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_exports_abandoned(&self) {
        self.exports_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_exports_rejected_busy(&self) {
        self.exports_rejected_busy.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_images(&self, count: u64) {
        self.images_archived.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_bytes(&self, bytes: u64) {
        self.bytes_streamed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self, exports_in_flight: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            exports_started: self.exports_started.load(Ordering::Relaxed),
            exports_completed: self.exports_completed.load(Ordering::Relaxed),
            exports_failed: self.exports_failed.load(Ordering::Relaxed),
            exports_abandoned: self.exports_abandoned.load(Ordering::Relaxed),
            exports_rejected_busy: self.exports_rejected_busy.load(Ordering::Relaxed),
            exports_in_flight,
            images_archived: self.images_archived.load(Ordering::Relaxed),
            bytes_streamed: self.bytes_streamed.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub exports_started: usize,
    pub exports_completed: usize,
    pub exports_failed: usize,
    pub exports_abandoned: usize,
    pub exports_rejected_busy: usize,
    pub exports_in_flight: usize,
    pub images_archived: u64,
    pub bytes_streamed: u64,
    pub uptime_seconds: u64,
}
