//! Prediction counters and the training summary report.

use crate::types::prediction::Label;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Running totals for predictions made by the service or the training run
pub struct PredictionMetrics {
    /// Total records scored
    pub predictions: AtomicU64,
    /// Records the ensemble labelled Anomaly
    pub anomalies: AtomicU64,
    /// Anomaly votes per model
    model_anomalies: RwLock<BTreeMap<String, u64>>,
    /// Sum of per-record agreement, for averaging
    agreement_sum: RwLock<f64>,
    /// Total scoring time in microseconds
    latency_us: AtomicU64,
    start_time: Instant,
}

impl PredictionMetrics {
    pub fn new() -> Self {
        Self {
            predictions: AtomicU64::new(0),
            anomalies: AtomicU64::new(0),
            model_anomalies: RwLock::new(BTreeMap::new()),
            agreement_sum: RwLock::new(0.0),
            latency_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record one scored record and returns the running prediction count
    pub fn record<'a, I>(&self, label: Label, votes: I, elapsed: Duration) -> u64
    where
        I: IntoIterator<Item = (&'a str, Label)>,
    {
        if label.is_anomaly() {
            self.anomalies.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        let mut total = 0usize;
        let mut agreeing = 0usize;
        if let Ok(mut per_model) = self.model_anomalies.write() {
            for (model, vote) in votes {
                total += 1;
                if vote == label {
                    agreeing += 1;
                }
                let count = per_model.entry(model.to_string()).or_insert(0);
                if vote.is_anomaly() {
                    *count += 1;
                }
            }
        }

        if total > 0 {
            if let Ok(mut sum) = self.agreement_sum.write() {
                *sum += agreeing as f64 / total as f64;
            }
        }

        self.predictions.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Share of records labelled Anomaly
    pub fn anomaly_rate(&self) -> f64 {
        let total = self.predictions.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.anomalies.load(Ordering::Relaxed) as f64 / total as f64
    }

    /// Mean share of models agreeing with the ensemble
    pub fn avg_agreement(&self) -> f64 {
        let total = self.predictions.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.agreement_sum.read().map(|s| *s).unwrap_or(0.0) / total as f64
    }

    /// Mean scoring latency in microseconds
    pub fn mean_latency_us(&self) -> u64 {
        let total = self.predictions.load(Ordering::Relaxed);
        if total == 0 {
            return 0;
        }
        self.latency_us.load(Ordering::Relaxed) / total
    }

    /// Predictions per second since startup
    pub fn throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn model_anomalies(&self) -> BTreeMap<String, u64> {
        self.model_anomalies
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let total = self.predictions.load(Ordering::Relaxed);
        let anomalies = self.anomalies.load(Ordering::Relaxed);

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            TOURIST ANOMALY DETECTOR - SUMMARY                ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Records Scored: {:>8}  │  Anomalies: {:>8} ({:>5.1}%)    ║",
            total,
            anomalies,
            self.anomaly_rate() * 100.0
        );
        info!(
            "║ Model Agreement: {:>5.1}%  │  Mean Latency: {:>8} μs       ║",
            self.avg_agreement() * 100.0,
            self.mean_latency_us()
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Anomaly Votes by Model:                                      ║");
        for (model, count) in self.model_anomalies() {
            let pct = if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            info!("║   {:10}: {:>8} ({:>5.1}%)                              ║", model, count, pct);
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PredictionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Ensemble output compared against ground-truth labels
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
}

impl ConfusionMatrix {
    /// Build from (predicted, actual) pairs; Anomaly is the positive class.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Label, Label)>,
    {
        let mut m = Self::default();
        for (predicted, actual) in pairs {
            match (predicted.is_anomaly(), actual.is_anomaly()) {
                (true, true) => m.true_positive += 1,
                (true, false) => m.false_positive += 1,
                (false, false) => m.true_negative += 1,
                (false, true) => m.false_negative += 1,
            }
        }
        m
    }

    pub fn precision(&self) -> f64 {
        let flagged = self.true_positive + self.false_positive;
        if flagged == 0 {
            0.0
        } else {
            self.true_positive as f64 / flagged as f64
        }
    }

    pub fn recall(&self) -> f64 {
        let actual = self.true_positive + self.false_negative;
        if actual == 0 {
            0.0
        } else {
            self.true_positive as f64 / actual as f64
        }
    }

    pub fn print_summary(&self) {
        info!("Ensemble vs. labels (Anomaly = positive):");
        info!(
            "  TP={} FP={} TN={} FN={}",
            self.true_positive, self.false_positive, self.true_negative, self.false_negative
        );
        info!(
            "  precision={:.3} recall={:.3}",
            self.precision(),
            self.recall()
        );
    }
}
