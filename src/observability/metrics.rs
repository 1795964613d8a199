//! Thread-safe metrics collection system
//!
//! Provides atomic counters and mutex-protected collections for tracking
//! routing decisions, classifier outcomes and per-endpoint traffic.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Latency samples kept for percentile calculation
const MAX_LATENCY_SAMPLES: usize = 1000;

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Thread-safe metrics collector using atomics and mutexes
pub struct MetricsCollector {
    // Routing decisions (atomic for high frequency)
    requests_routed: AtomicU64,
    forwards: AtomicU64,
    rejects: AtomicU64,
    configuration_errors: AtomicU64,

    // Classification outcomes
    classifications_matched: AtomicU64,
    classifications_no_category: AtomicU64,
    classifications_skipped: AtomicU64,
    classifications_failed: AtomicU64,

    // Classifier round-trip times in milliseconds
    classifier_latencies: Mutex<Vec<u64>>,

    // Forward count per endpoint id
    endpoint_forwards: Mutex<HashMap<String, u64>>,

    uptime_start: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            requests_routed: AtomicU64::new(0),
            forwards: AtomicU64::new(0),
            rejects: AtomicU64::new(0),
            configuration_errors: AtomicU64::new(0),
            classifications_matched: AtomicU64::new(0),
            classifications_no_category: AtomicU64::new(0),
            classifications_skipped: AtomicU64::new(0),
            classifications_failed: AtomicU64::new(0),
            classifier_latencies: Mutex::new(Vec::new()),
            endpoint_forwards: Mutex::new(HashMap::new()),
            uptime_start: AtomicU64::new(current_timestamp()),
        }
    }

    // Routing decisions
    pub fn request_received(&self) {
        self.requests_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_forwarded(&self, endpoint_id: &str) {
        self.forwards.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut endpoints) = self.endpoint_forwards.lock() {
            *endpoints.entry(endpoint_id.to_string()).or_insert(0) += 1;
        }
    }

    pub fn request_rejected(&self) {
        self.rejects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn configuration_error(&self) {
        self.configuration_errors.fetch_add(1, Ordering::Relaxed);
    }

    // Classification outcomes
    pub fn classification_matched(&self, latency: Duration) {
        self.classifications_matched.fetch_add(1, Ordering::Relaxed);
        self.record_classifier_latency(latency);
    }

    pub fn classification_no_category(&self, latency: Duration) {
        self.classifications_no_category
            .fetch_add(1, Ordering::Relaxed);
        self.record_classifier_latency(latency);
    }

    pub fn classification_skipped(&self) {
        self.classifications_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn classification_failed(&self, latency: Duration) {
        self.classifications_failed.fetch_add(1, Ordering::Relaxed);
        self.record_classifier_latency(latency);
    }

    fn record_classifier_latency(&self, latency: Duration) {
        if let Ok(mut times) = self.classifier_latencies.lock() {
            times.push(latency.as_millis() as u64);

            if times.len() > MAX_LATENCY_SAMPLES {
                times.remove(0);
            }
        }
    }

    // Reset all metrics (useful for testing)
    pub fn reset(&self) {
        self.requests_routed.store(0, Ordering::Relaxed);
        self.forwards.store(0, Ordering::Relaxed);
        self.rejects.store(0, Ordering::Relaxed);
        self.configuration_errors.store(0, Ordering::Relaxed);
        self.classifications_matched.store(0, Ordering::Relaxed);
        self.classifications_no_category.store(0, Ordering::Relaxed);
        self.classifications_skipped.store(0, Ordering::Relaxed);
        self.classifications_failed.store(0, Ordering::Relaxed);
        self.uptime_start
            .store(current_timestamp(), Ordering::Relaxed);

        if let Ok(mut times) = self.classifier_latencies.lock() {
            times.clear();
        }
        if let Ok(mut endpoints) = self.endpoint_forwards.lock() {
            endpoints.clear();
        }
    }

    /// Calculate classifier latency statistics (avg, p50, p95, p99)
    fn calculate_latency_statistics(&self) -> (f64, f64, f64, f64) {
        if let Ok(times) = self.classifier_latencies.lock() {
            if times.is_empty() {
                (0.0, 0.0, 0.0, 0.0)
            } else {
                let mut sorted_times = times.clone();
                sorted_times.sort_unstable();

                let avg = sorted_times.iter().sum::<u64>() as f64 / sorted_times.len() as f64;
                let p50 = percentile(&sorted_times, 50.0);
                let p95 = percentile(&sorted_times, 95.0);
                let p99 = percentile(&sorted_times, 99.0);

                (avg, p50, p95, p99)
            }
        } else {
            (0.0, 0.0, 0.0, 0.0)
        }
    }

    /// Get complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg_latency_ms, p50, p95, p99) = self.calculate_latency_statistics();
        let endpoint_forwards = self
            .endpoint_forwards
            .lock()
            .map(|endpoints| endpoints.clone())
            .unwrap_or_default();

        MetricsSnapshot {
            routing: RoutingMetrics {
                requests_routed: self.requests_routed.load(Ordering::Relaxed),
                forwards: self.forwards.load(Ordering::Relaxed),
                rejects: self.rejects.load(Ordering::Relaxed),
                configuration_errors: self.configuration_errors.load(Ordering::Relaxed),
                endpoint_forwards,
            },
            classification: ClassificationMetrics {
                matched: self.classifications_matched.load(Ordering::Relaxed),
                no_category: self.classifications_no_category.load(Ordering::Relaxed),
                skipped: self.classifications_skipped.load(Ordering::Relaxed),
                failed: self.classifications_failed.load(Ordering::Relaxed),
                avg_latency_ms,
                latency_p50_ms: p50,
                latency_p95_ms: p95,
                latency_p99_ms: p99,
            },
            uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

// Public metrics structures
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub routing: RoutingMetrics,
    pub classification: ClassificationMetrics,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct RoutingMetrics {
    pub requests_routed: u64,
    pub forwards: u64,
    pub rejects: u64,
    pub configuration_errors: u64,
    pub endpoint_forwards: HashMap<String, u64>,
}

#[derive(Debug, Serialize)]
pub struct ClassificationMetrics {
    pub matched: u64,
    pub no_category: u64,
    pub skipped: u64,
    pub failed: u64,
    pub avg_latency_ms: f64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
}

// Helper functions
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let len = sorted_data.len();
    let index = (percentile / 100.0) * (len - 1) as f64;

    if index.fract() == 0.0 {
        sorted_data[index as usize] as f64
    } else {
        let lower_index = index.floor() as usize;
        let upper_index = index.ceil() as usize;
        let lower_value = sorted_data[lower_index] as f64;
        let upper_value = sorted_data[upper_index] as f64;

        lower_value + (upper_value - lower_value) * index.fract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_routing_metrics() {
        let collector = MetricsCollector::new();

        collector.request_received();
        collector.request_received();
        collector.request_forwarded("ep-billing");
        collector.request_rejected();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.routing.requests_routed, 2);
        assert_eq!(metrics.routing.forwards, 1);
        assert_eq!(metrics.routing.rejects, 1);
        assert_eq!(metrics.routing.endpoint_forwards.get("ep-billing"), Some(&1));
    }

    #[test]
    fn test_classification_metrics() {
        let collector = MetricsCollector::new();

        collector.classification_matched(Duration::from_millis(100));
        collector.classification_no_category(Duration::from_millis(300));
        collector.classification_failed(Duration::from_millis(200));
        collector.classification_skipped();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.classification.matched, 1);
        assert_eq!(metrics.classification.no_category, 1);
        assert_eq!(metrics.classification.failed, 1);
        assert_eq!(metrics.classification.skipped, 1);
        assert!((metrics.classification.avg_latency_ms - 200.0).abs() < 0.1);
        assert!((metrics.classification.latency_p50_ms - 200.0).abs() < 0.1);
    }

    #[test]
    fn test_thread_safety() {
        let collector = Arc::new(MetricsCollector::new());

        let mut handles = vec![];

        for _ in 0..10 {
            let collector_clone = Arc::clone(&collector);
            let handle = thread::spawn(move || {
                for _ in 0..100 {
                    collector_clone.request_received();
                    collector_clone.request_forwarded("ep-default");
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let metrics = collector.get_metrics();
        assert_eq!(metrics.routing.requests_routed, 1000);
        assert_eq!(metrics.routing.endpoint_forwards.get("ep-default"), Some(&1000));
    }

    #[test]
    fn test_percentile_calculation() {
        let data = vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        let p50 = percentile(&data, 50.0);
        let p95 = percentile(&data, 95.0);
        let p0 = percentile(&data, 0.0);
        let p100 = percentile(&data, 100.0);

        assert!((p50 - 5.5).abs() < 0.1, "P50: expected ~5.5, got {p50}");
        assert!((p95 - 9.5).abs() < 0.1, "P95: expected ~9.5, got {p95}");
        assert!((p0 - 1.0).abs() < 0.1, "P0: expected ~1.0, got {p0}");
        assert!(
            (p100 - 10.0).abs() < 0.1,
            "P100: expected ~10.0, got {p100}"
        );

        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let collector = MetricsCollector::new();

        for i in 0..1500 {
            collector.classification_matched(Duration::from_millis(i));
        }

        let len = collector.classifier_latencies.lock().unwrap().len();
        assert_eq!(len, MAX_LATENCY_SAMPLES);
    }

    #[test]
    fn test_reset_functionality() {
        let collector = MetricsCollector::new();

        collector.request_received();
        collector.request_forwarded("ep");
        collector.configuration_error();
        collector.classification_matched(Duration::from_millis(10));

        collector.reset();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.routing.requests_routed, 0);
        assert_eq!(metrics.routing.configuration_errors, 0);
        assert!(metrics.routing.endpoint_forwards.is_empty());
        assert_eq!(metrics.classification.matched, 0);
        assert_eq!(metrics.classification.avg_latency_ms, 0.0);
    }
}
