//! Detection performance metrics

use serde::{Deserialize, Serialize};

/// Figures for one detection run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Deduplicated false alarms per thousand stream items
    pub false_alarms_per_1000: f64,
    /// Share of known drift points that were detected
    pub detection_rate: f64,
    /// Mean lag, in items, between a known drift and its detection
    pub detection_delay: f64,
}

impl RunMetrics {
    /// Score a run against the known drift points.
    ///
    /// A detection `j` counts towards the delay of known drift `d` when
    /// `d <= j <= d + accepted_delay`.
    pub fn compute(
        drifts: &[usize],
        false_alarms: &[usize],
        known: &[usize],
        total_items: usize,
        accepted_delay: usize,
    ) -> Self {
        let false_alarms_per_1000 = if total_items == 0 {
            0.0
        } else {
            false_alarms.len() as f64 / total_items as f64 * 1000.0
        };

        let detection_rate = if known.is_empty() {
            0.0
        } else {
            drifts.len() as f64 / known.len() as f64
        };

        let detection_delay = if drifts.is_empty() {
            0.0
        } else {
            let lag: usize = known
                .iter()
                .flat_map(|&d| {
                    drifts
                        .iter()
                        .filter(move |&&j| d <= j && j <= d + accepted_delay)
                        .map(move |&j| j - d)
                })
                .sum();
            lag as f64 / drifts.len() as f64
        };

        Self {
            false_alarms_per_1000,
            detection_rate,
            detection_delay,
        }
    }
}

/// Mean and population standard deviation of one metric across runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub mean: f64,
    pub std_dev: f64,
}

impl MetricSummary {
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let len = values.len() as f64;
        let mean = values.iter().sum::<f64>() / len;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / len;
        Self {
            mean,
            std_dev: variance.sqrt(),
        }
    }
}

/// Aggregate of [`RunMetrics`] over an experiment
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub runs: usize,
    pub false_alarms_per_1000: MetricSummary,
    pub detection_rate: MetricSummary,
    pub detection_delay: MetricSummary,
}

impl MetricsSummary {
    pub fn aggregate(runs: &[RunMetrics]) -> Self {
        let column = |f: fn(&RunMetrics) -> f64| -> MetricSummary {
            let values: Vec<f64> = runs.iter().map(f).collect();
            MetricSummary::from_values(&values)
        };
        Self {
            runs: runs.len(),
            false_alarms_per_1000: column(|m| m.false_alarms_per_1000),
            detection_rate: column(|m| m.detection_rate),
            detection_delay: column(|m| m.detection_delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_run_metrics() {
        let m = RunMetrics::compute(&[1004, 2010], &[300, 700], &[1000, 2000], 4000, 110);
        assert_eq!(m.false_alarms_per_1000, 0.5);
        assert_eq!(m.detection_rate, 1.0);
        assert_eq!(m.detection_delay, 7.0);
    }

    #[test]
    fn test_late_detection_counts_for_rate_but_not_delay() {
        let m = RunMetrics::compute(&[1500], &[], &[1000], 2000, 110);
        assert_eq!(m.detection_rate, 1.0);
        assert_eq!(m.detection_delay, 0.0);
        assert_eq!(m.false_alarms_per_1000, 0.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let m = RunMetrics::compute(&[], &[], &[], 0, 10);
        assert_eq!(m.false_alarms_per_1000, 0.0);
        assert_eq!(m.detection_rate, 0.0);
        assert_eq!(m.detection_delay, 0.0);
    }

    #[test]
    fn test_aggregate() {
        let runs = [
            RunMetrics {
                false_alarms_per_1000: 1.0,
                detection_rate: 1.0,
                detection_delay: 2.0,
            },
            RunMetrics {
                false_alarms_per_1000: 3.0,
                detection_rate: 0.0,
                detection_delay: 2.0,
            },
        ];
        let summary = MetricsSummary::aggregate(&runs);
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.false_alarms_per_1000, MetricSummary { mean: 2.0, std_dev: 1.0 });
        assert_eq!(summary.detection_rate, MetricSummary { mean: 0.5, std_dev: 0.5 });
        assert_eq!(summary.detection_delay, MetricSummary { mean: 2.0, std_dev: 0.0 });
    }

    #[test]
    fn test_aggregate_of_nothing() {
        assert_eq!(MetricsSummary::aggregate(&[]), MetricsSummary::default());
    }
}
