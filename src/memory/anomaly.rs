//! Rolling-baseline tracking for engine telemetry.
//!
//! Keeps a bounded window of recent observations per metric (encoding rate,
//! retrieval count) and exposes mean/deviation baselines through `stats`.
//! Observations far outside the baseline flag unusual workloads.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Baseline summary for one metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricBaseline {
    pub count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub last: f64,
}

/// Windowed mean/deviation tracker, one series per metric name.
pub struct BaselineTracker {
    window_size: usize,
    series: HashMap<String, VecDeque<f64>>,
}

impl BaselineTracker {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            series: HashMap::new(),
        }
    }

    /// Record an observation, evicting the oldest when the window is full.
    pub fn update(&mut self, metric: &str, value: f64) {
        let window = self.series.entry(metric.to_string()).or_default();
        if window.len() >= self.window_size {
            window.pop_front();
        }
        window.push_back(value);
    }

    /// Whether `value` sits more than three deviations from the baseline.
    /// Always false until the window has a handful of observations.
    pub fn is_anomalous(&self, metric: &str, value: f64) -> bool {
        let Some(baseline) = self.baseline(metric) else {
            return false;
        };
        if baseline.count < 5 || baseline.std_dev == 0.0 {
            return false;
        }
        (value - baseline.mean).abs() > 3.0 * baseline.std_dev
    }

    /// Baseline for one metric, if it has any observations.
    pub fn baseline(&self, metric: &str) -> Option<MetricBaseline> {
        let window = self.series.get(metric)?;
        if window.is_empty() {
            return None;
        }
        let count = window.len();
        let mean = window.iter().sum::<f64>() / count as f64;
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
        Some(MetricBaseline {
            count,
            mean,
            std_dev: variance.sqrt(),
            last: *window.back().unwrap(),
        })
    }

    /// All metric baselines, for stats reporting.
    pub fn metrics(&self) -> HashMap<String, MetricBaseline> {
        self.series
            .keys()
            .filter_map(|name| self.baseline(name).map(|b| (name.clone(), b)))
            .collect()
    }
}
