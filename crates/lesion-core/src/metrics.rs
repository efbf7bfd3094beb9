//! Processing metrics collection and reporting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters shared between the reader and the processing engine
pub struct ProcessMetrics {
    /// Series fully processed
    pub series_processed: AtomicU64,
    /// Planes decoded from pixel data
    pub planes_decoded: AtomicU64,
    /// Trace profiles computed
    pub traces_computed: AtomicU64,
    /// Pixel bytes read
    pub bytes_read: AtomicU64,
    /// Errors encountered
    pub errors: AtomicU64,
    /// Start time of metrics collection
    start_time: Instant,
}

impl Default for ProcessMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            series_processed: AtomicU64::new(0),
            planes_decoded: AtomicU64::new(0),
            traces_computed: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a fully processed series
    pub fn record_series(&self) {
        self.series_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record decoded planes
    pub fn record_planes(&self, count: u64) {
        self.planes_decoded.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a computed trace profile
    pub fn record_trace(&self) {
        self.traces_computed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record pixel bytes read
    pub fn record_bytes(&self, count: u64) {
        self.bytes_read.fetch_add(count, Ordering::Relaxed);
    }

    /// Record an error
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Elapsed time since collection started
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Planes decoded per second
    pub fn planes_per_second(&self) -> f64 {
        let planes = self.planes_decoded.load(Ordering::Relaxed) as f64;
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            planes / elapsed
        } else {
            0.0
        }
    }

    /// Generate a metrics report
    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            generated_at: Utc::now(),
            elapsed_secs: self.elapsed().as_secs_f64(),
            series_processed: self.series_processed.load(Ordering::Relaxed),
            planes_decoded: self.planes_decoded.load(Ordering::Relaxed),
            traces_computed: self.traces_computed.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            planes_per_second: self.planes_per_second(),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        self.series_processed.store(0, Ordering::Relaxed);
        self.planes_decoded.store(0, Ordering::Relaxed);
        self.traces_computed.store(0, Ordering::Relaxed);
        self.bytes_read.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of the processing counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub generated_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub series_processed: u64,
    pub planes_decoded: u64,
    pub traces_computed: u64,
    pub bytes_read: u64,
    pub errors: u64,
    pub planes_per_second: f64,
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Processing Metrics ===")?;
        writeln!(f, "Duration: {:.2}s", self.elapsed_secs)?;
        writeln!(f, "Series processed: {}", self.series_processed)?;
        writeln!(f, "Planes decoded: {}", self.planes_decoded)?;
        writeln!(f, "Planes/sec: {:.0}", self.planes_per_second)?;
        writeln!(f, "Traces computed: {}", self.traces_computed)?;
        writeln!(f, "Pixel bytes read: {}", self.bytes_read)?;
        writeln!(f, "Errors: {}", self.errors)?;
        Ok(())
    }
}
