//! Performance metrics and statistics tracking for the scoring service.

use crate::types::prediction::{Label, PredictionResponse};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector shared by all transports
pub struct ServiceMetrics {
    /// Batches scored successfully
    pub batches_scored: AtomicU64,
    /// Rows scored across all batches
    pub rows_scored: AtomicU64,
    /// Rows labelled genuine
    pub genuine_rows: AtomicU64,
    /// Rows labelled fake
    pub fake_rows: AtomicU64,
    /// Rejected batches by error kind
    rejections: RwLock<HashMap<String, u64>>,
    /// Batch processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// P(genuine) distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl ServiceMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            batches_scored: AtomicU64::new(0),
            rows_scored: AtomicU64::new(0),
            genuine_rows: AtomicU64::new(0),
            fake_rows: AtomicU64::new(0),
            rejections: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a scored batch
    pub fn record_batch(&self, processing_time: Duration, response: &PredictionResponse) {
        let stats = &response.stats;
        self.batches_scored.fetch_add(1, Ordering::Relaxed);
        self.rows_scored.fetch_add(stats.total as u64, Ordering::Relaxed);
        self.genuine_rows.fetch_add(stats.genuine as u64, Ordering::Relaxed);
        self.fake_rows.fetch_add(stats.fake as u64, Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        if let Ok(mut buckets) = self.probability_buckets.write() {
            for prediction in &response.predictions {
                let p_genuine = match prediction.prediction {
                    Label::Genuine => prediction.probability,
                    Label::Fake => 1.0 - prediction.probability,
                };
                let bucket = (p_genuine * 10.0).clamp(0.0, 9.0) as usize;
                buckets[bucket] += 1;
            }
        }
    }

    /// Record a rejected batch
    pub fn record_rejection(&self, kind: &str) {
        if let Ok(mut rejections) = self.rejections.write() {
            *rejections.entry(kind.to_string()).or_insert(0) += 1;
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let Ok(times) = self.processing_times.read() else {
            return ProcessingStats::default();
        };
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Get current throughput (rows per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.rows_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get P(genuine) distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    /// Get rejections by error kind
    pub fn get_rejections(&self) -> HashMap<String, u64> {
        self.rejections
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Serializable view of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            batches_scored: self.batches_scored.load(Ordering::Relaxed),
            rows_scored: self.rows_scored.load(Ordering::Relaxed),
            genuine_rows: self.genuine_rows.load(Ordering::Relaxed),
            fake_rows: self.fake_rows.load(Ordering::Relaxed),
            throughput_rows_per_sec: self.get_throughput(),
            processing: self.get_processing_stats(),
            probability_distribution: self.get_probability_distribution(),
            rejections: self.get_rejections(),
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let snapshot = self.snapshot();
        let processing = &snapshot.processing;
        let genuine_rate = if snapshot.rows_scored > 0 {
            (snapshot.genuine_rows as f64 / snapshot.rows_scored as f64) * 100.0
        } else {
            0.0
        };

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║         BANKNOTE AUTHENTICATOR - METRICS SUMMARY             ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Batches Scored: {:>8}  │  Rows Scored: {:>10}         ║",
            snapshot.batches_scored, snapshot.rows_scored
        );
        info!(
            "║ Genuine Rate:   {:>7.1}%  │  Throughput: {:>8.1} rows/s    ║",
            genuine_rate, snapshot.throughput_rows_per_sec
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Batch Time (μs): mean={:>6} p50={:>6} p95={:>6} p99={:>6} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Rejected Batches:                                            ║");
        for (kind, count) in &snapshot.rejections {
            info!("║   {:16}: {:>8}                                 ║", kind, count);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ P(genuine) Distribution:                                     ║");
        let total: u64 = snapshot.probability_distribution.iter().sum();
        for (i, &count) in snapshot.probability_distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>8} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default, Clone, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Point-in-time metrics view
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub batches_scored: u64,
    pub rows_scored: u64,
    pub genuine_rows: u64,
    pub fake_rows: u64,
    pub throughput_rows_per_sec: f64,
    pub processing: ProcessingStats,
    pub probability_distribution: [u64; 10],
    pub rejections: HashMap<String, u64>,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::prediction::{PredictionResult, StatsResult};

    fn response(p_genuine: &[f64]) -> PredictionResponse {
        let predictions: Vec<PredictionResult> = p_genuine
            .iter()
            .enumerate()
            .map(|(id, &p)| PredictionResult::from_genuine_probability(id, p))
            .collect();
        let genuine = predictions
            .iter()
            .filter(|p| p.prediction == crate::types::Label::Genuine)
            .count();
        PredictionResponse {
            stats: StatsResult {
                total: predictions.len(),
                genuine,
                fake: predictions.len() - genuine,
                ..StatsResult::default()
            },
            predictions,
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = ServiceMetrics::new();

        metrics.record_batch(Duration::from_micros(100), &response(&[0.9, 0.1]));
        metrics.record_batch(Duration::from_micros(300), &response(&[0.95]));
        metrics.record_rejection("schema");
        metrics.record_rejection("schema");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_scored, 2);
        assert_eq!(snapshot.rows_scored, 3);
        assert_eq!(snapshot.genuine_rows, 2);
        assert_eq!(snapshot.fake_rows, 1);
        assert_eq!(snapshot.rejections.get("schema"), Some(&2));
        assert_eq!(snapshot.processing.count, 2);
        assert_eq!(snapshot.processing.mean_us, 200);
        assert_eq!(snapshot.processing.max_us, 300);
    }

    #[test]
    fn test_probability_buckets() {
        let metrics = ServiceMetrics::new();
        metrics.record_batch(Duration::from_micros(10), &response(&[0.9, 0.1, 1.0, 0.5]));

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[9], 2);
        assert_eq!(distribution[5], 1);
        assert_eq!(distribution[0], 1);
        assert_eq!(distribution.iter().sum::<u64>(), 4);
    }

    #[test]
    fn test_empty_stats() {
        let metrics = ServiceMetrics::new();
        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 0);
        assert_eq!(metrics.snapshot().rows_scored, 0);
    }
}
