//! Operation timing.
//!
//! `PerformanceMonitor` is a plain value: whoever needs timings constructs
//! one and passes it down (usually as a [`SharedMonitor`]). There is no
//! process-wide instance.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Monitor shared between a service and whoever reads its metrics.
pub type SharedMonitor = Arc<Mutex<PerformanceMonitor>>;

/// Aggregated timings of one operation, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OperationMetrics {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub count: usize,
}

/// Records how long named operations take.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    marks: HashMap<String, Instant>,
    samples: HashMap<String, Vec<f64>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a monitor ready to be shared.
    pub fn shared() -> SharedMonitor {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Marks the start of `operation`. A second start restarts the clock.
    pub fn start(&mut self, operation: &str) {
        self.marks.insert(operation.to_string(), Instant::now());
    }

    /// Ends `operation` and records its duration in milliseconds.
    ///
    /// Returns `None` when the operation was never started.
    pub fn end(&mut self, operation: &str) -> Option<f64> {
        let started = self.marks.remove(operation)?;
        let elapsed = started.elapsed();
        self.record(operation, elapsed);
        Some(elapsed.as_secs_f64() * 1000.0)
    }

    /// Records a duration measured elsewhere.
    pub fn record(&mut self, operation: &str, duration: Duration) {
        self.samples
            .entry(operation.to_string())
            .or_default()
            .push(duration.as_secs_f64() * 1000.0);
    }

    /// Aggregates of `operation`; all zero when nothing was recorded.
    pub fn metrics(&self, operation: &str) -> OperationMetrics {
        let samples = match self.samples.get(operation) {
            Some(samples) if !samples.is_empty() => samples,
            _ => return OperationMetrics::default(),
        };

        let sum: f64 = samples.iter().sum();
        OperationMetrics {
            avg_ms: sum / samples.len() as f64,
            min_ms: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max_ms: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            count: samples.len(),
        }
    }

    /// Names of every operation with at least one sample, sorted.
    pub fn operations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.samples.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops all samples and pending marks.
    pub fn clear(&mut self) {
        self.marks.clear();
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_metrics() {
        let mut monitor = PerformanceMonitor::new();
        monitor.record("save_product", Duration::from_millis(10));
        monitor.record("save_product", Duration::from_millis(30));
        monitor.record("save_product", Duration::from_millis(20));

        let metrics = monitor.metrics("save_product");
        assert_eq!(metrics.count, 3);
        assert!((metrics.avg_ms - 20.0).abs() < 1e-9);
        assert!((metrics.min_ms - 10.0).abs() < 1e-9);
        assert!((metrics.max_ms - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_end_without_start() {
        let mut monitor = PerformanceMonitor::new();
        assert_eq!(monitor.end("never_started"), None);
        assert_eq!(monitor.metrics("never_started"), OperationMetrics::default());
    }

    #[test]
    fn test_start_end_and_clear() {
        let mut monitor = PerformanceMonitor::new();
        monitor.start("reprice");
        let elapsed = monitor.end("reprice").unwrap();
        assert!(elapsed >= 0.0);
        assert_eq!(monitor.metrics("reprice").count, 1);
        assert_eq!(monitor.end("reprice"), None);
        assert_eq!(monitor.operations(), vec!["reprice".to_string()]);

        monitor.start("pending");
        monitor.clear();
        assert_eq!(monitor.end("pending"), None);
        assert_eq!(monitor.metrics("reprice").count, 0);
    }

    #[test]
    fn test_shared_monitor() {
        let shared = PerformanceMonitor::shared();
        let clone = Arc::clone(&shared);
        clone.lock().unwrap().record("op", Duration::from_millis(5));
        assert_eq!(shared.lock().unwrap().metrics("op").count, 1);
    }
}
