//! Latency and outcome tracking for batch integration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

const MAX_PROCESSING_SAMPLES: usize = 10_000;
const MAX_MODEL_SAMPLES: usize = 1_000;

/// Metrics collector shared by an integrator and its callers
pub struct IntegrationMetrics {
    /// Inputs integrated successfully
    pub inputs_integrated: AtomicU64,
    /// Inputs that failed in at least one model
    pub inputs_failed: AtomicU64,
    /// Per-input integration times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Model inference times (in microseconds)
    model_times: RwLock<HashMap<String, Vec<u64>>>,
    /// Prediction failures per model
    model_failures: RwLock<HashMap<String, u64>>,
    start_time: Instant,
}

impl IntegrationMetrics {
    pub fn new() -> Self {
        Self {
            inputs_integrated: AtomicU64::new(0),
            inputs_failed: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            model_times: RwLock::new(HashMap::new()),
            model_failures: RwLock::new(HashMap::new()),
            start_time: Instant::now(),
        }
    }

    /// Record one successfully integrated input
    pub fn record_input(&self, processing_time: Duration) {
        self.inputs_integrated.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            if times.len() > MAX_PROCESSING_SAMPLES {
                times.drain(0..MAX_PROCESSING_SAMPLES / 2);
            }
        }
    }

    /// Record an input that could not be integrated
    pub fn record_failure(&self, model_name: &str) {
        self.inputs_failed.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut failures) = self.model_failures.write() {
            *failures.entry(model_name.to_string()).or_insert(0) += 1;
        }
    }

    /// Record model inference time
    pub fn record_model_time(&self, model_name: &str, duration: Duration) {
        if let Ok(mut times) = self.model_times.write() {
            let model_times = times.entry(model_name.to_string()).or_default();
            model_times.push(duration.as_micros() as u64);
            if model_times.len() > MAX_MODEL_SAMPLES {
                model_times.drain(0..MAX_MODEL_SAMPLES / 2);
            }
        }
    }

    /// Get per-input processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = match self.processing_times.read() {
            Ok(times) => times,
            Err(_) => return ProcessingStats::default(),
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: percentile(&sorted, 0.50),
            p95_us: percentile(&sorted, 0.95),
            p99_us: percentile(&sorted, 0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get per-model inference statistics
    pub fn get_model_stats(&self) -> HashMap<String, ModelStats> {
        let mut stats = HashMap::new();
        let times = match self.model_times.read() {
            Ok(times) => times,
            Err(_) => return stats,
        };
        let failures = self
            .model_failures
            .read()
            .map(|f| f.clone())
            .unwrap_or_default();

        for (model, model_times) in times.iter() {
            if model_times.is_empty() {
                continue;
            }

            let mut sorted: Vec<u64> = model_times.clone();
            sorted.sort_unstable();

            let count = sorted.len();
            let sum: u64 = sorted.iter().sum();

            stats.insert(
                model.clone(),
                ModelStats {
                    calls: count as u64,
                    failures: failures.get(model).copied().unwrap_or(0),
                    mean_us: sum / count as u64,
                    p50_us: percentile(&sorted, 0.50),
                    p99_us: percentile(&sorted, 0.99),
                },
            );
        }

        stats
    }

    /// Inputs integrated per second since creation
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.inputs_integrated.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let integrated = self.inputs_integrated.load(Ordering::Relaxed);
        let failed = self.inputs_failed.load(Ordering::Relaxed);
        let processing = self.get_processing_stats();

        info!(
            integrated = integrated,
            failed = failed,
            throughput = format!("{:.1} inputs/s", self.get_throughput()),
            mean_us = processing.mean_us,
            p50_us = processing.p50_us,
            p95_us = processing.p95_us,
            p99_us = processing.p99_us,
            max_us = processing.max_us,
            "Integration summary"
        );

        let mut model_stats: Vec<(String, ModelStats)> = self.get_model_stats().into_iter().collect();
        model_stats.sort_by(|a, b| a.0.cmp(&b.0));
        for (model, stats) in &model_stats {
            info!(
                model = %model,
                calls = stats.calls,
                failures = stats.failures,
                mean_us = stats.mean_us,
                p50_us = stats.p50_us,
                p99_us = stats.p99_us,
                "Model inference times"
            );
        }
    }
}

impl Default for IntegrationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn percentile(sorted: &[u64], quantile: f64) -> u64 {
    let index = ((sorted.len() as f64 * quantile) as usize).min(sorted.len() - 1);
    sorted[index]
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Model-specific statistics
#[derive(Debug)]
pub struct ModelStats {
    pub calls: u64,
    pub failures: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p99_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = IntegrationMetrics::new();

        metrics.record_input(Duration::from_micros(100));
        metrics.record_input(Duration::from_micros(300));
        metrics.record_failure("model2");

        assert_eq!(metrics.inputs_integrated.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.inputs_failed.load(Ordering::Relaxed), 1);

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.mean_us, 200);
        assert_eq!(stats.max_us, 300);
    }

    #[test]
    fn test_model_stats() {
        let metrics = IntegrationMetrics::new();

        metrics.record_model_time("model1", Duration::from_micros(10));
        metrics.record_model_time("model1", Duration::from_micros(30));
        metrics.record_model_time("model2", Duration::from_micros(50));
        metrics.record_failure("model2");

        let stats = metrics.get_model_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["model1"].calls, 2);
        assert_eq!(stats["model1"].mean_us, 20);
        assert_eq!(stats["model1"].failures, 0);
        assert_eq!(stats["model2"].failures, 1);
    }

    #[test]
    fn test_empty_stats() {
        let metrics = IntegrationMetrics::new();
        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 0);
        assert!(metrics.get_model_stats().is_empty());
    }
}
