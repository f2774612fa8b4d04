use serde::{Deserialize, Serialize};

use crate::diff::ItemDelta;
use crate::time_series::TimeSeriesPoint;
use crate::util::std_dev;

/// Session totals. Only ever changed when an item is completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeStats {
    pub total_items: usize,
    pub total_characters: usize,
    pub correct_characters: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub elapsed_ms: u64,
    pub wpm: u32,
    pub accuracy: u32,
}

/// Words per minute, one word being five correct characters
pub fn wpm(correct_characters: usize, elapsed_ms: u64) -> u32 {
    if elapsed_ms == 0 {
        return 0;
    }
    let minutes = elapsed_ms as f64 / 60_000.0;
    ((correct_characters as f64 / 5.0) / minutes).round() as u32
}

pub fn accuracy(correct_characters: usize, total_characters: usize) -> u32 {
    if total_characters == 0 {
        return 100;
    }
    let pct = correct_characters as f64 / total_characters as f64 * 100.0;
    pct.round().clamp(0.0, 100.0) as u32
}

/// Folds completed items into the session totals and keeps WPM fresh between completions.
#[derive(Debug, Clone)]
pub struct MetricsCalculator {
    stats: CumulativeStats,
    metrics: Metrics,
    samples: Vec<TimeSeriesPoint>,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self {
            stats: CumulativeStats::default(),
            metrics: Metrics {
                elapsed_ms: 0,
                wpm: 0,
                accuracy: 100,
            },
            samples: Vec::new(),
        }
    }
}

impl MetricsCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> CumulativeStats {
        self.stats
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    pub fn samples(&self) -> &[TimeSeriesPoint] {
        &self.samples
    }

    pub fn on_item_completed(&mut self, delta: ItemDelta, elapsed_ms: u64) {
        self.stats.total_items += 1;
        self.stats.total_characters += delta.total;
        self.stats.correct_characters += delta.correct;

        self.metrics.elapsed_ms = elapsed_ms;
        self.metrics.wpm = wpm(self.stats.correct_characters, elapsed_ms);
        self.metrics.accuracy = accuracy(self.stats.correct_characters, self.stats.total_characters);
    }

    /// Time-driven refresh: WPM only, accuracy moves at item boundaries
    pub fn on_tick(&mut self, elapsed_ms: u64) {
        self.metrics.elapsed_ms = elapsed_ms;
        self.metrics.wpm = wpm(self.stats.correct_characters, elapsed_ms);

        let minutes = elapsed_ms as f64 / 60_000.0;
        if minutes > 0.0 {
            let raw = (self.stats.correct_characters as f64 / 5.0) / minutes;
            self.samples
                .push(TimeSeriesPoint::new(elapsed_ms as f64 / 1000.0, raw));
        }
    }

    /// Spread of the sampled WPM values; 0 with fewer than two samples
    pub fn wpm_std_dev(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let values: Vec<f64> = self.samples.iter().map(|p| p.wpm).collect();
        std_dev(&values).unwrap_or(0.0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wpm_formula() {
        assert_eq!(wpm(50, 60_000), 10);
        assert_eq!(wpm(50, 30_000), 20);
        assert_eq!(wpm(0, 60_000), 0);
        assert_eq!(wpm(50, 0), 0);
    }

    #[test]
    fn accuracy_formula() {
        assert_eq!(accuracy(2, 3), 67);
        assert_eq!(accuracy(0, 0), 100);
        assert_eq!(accuracy(0, 5), 0);
        assert_eq!(accuracy(5, 5), 100);
    }

    #[test]
    fn completion_folds_into_totals() {
        let mut calc = MetricsCalculator::new();
        calc.on_item_completed(
            ItemDelta {
                correct: 2,
                total: 3,
            },
            12_000,
        );
        assert_eq!(
            calc.stats(),
            CumulativeStats {
                total_items: 1,
                total_characters: 3,
                correct_characters: 2
            }
        );
        assert_eq!(calc.metrics().accuracy, 67);
        assert_eq!(calc.metrics().wpm, 2);
    }

    #[test]
    fn tick_moves_wpm_but_not_accuracy() {
        let mut calc = MetricsCalculator::new();
        calc.on_item_completed(
            ItemDelta {
                correct: 40,
                total: 50,
            },
            30_000,
        );
        let before = calc.metrics();
        calc.on_tick(60_000);
        let after = calc.metrics();

        assert_eq!(after.accuracy, before.accuracy);
        assert_eq!(after.wpm, 8);
        assert_eq!(calc.stats().total_characters, 50);
        assert_eq!(calc.samples().len(), 1);
    }

    #[test]
    fn fresh_calculator_reports_full_accuracy() {
        let calc = MetricsCalculator::new();
        assert_eq!(calc.metrics().accuracy, 100);
        assert_eq!(calc.metrics().wpm, 0);
        assert_eq!(calc.wpm_std_dev(), 0.0);
    }

    #[test]
    fn std_dev_over_samples() {
        let mut calc = MetricsCalculator::new();
        calc.on_item_completed(
            ItemDelta {
                correct: 10,
                total: 10,
            },
            1_000,
        );
        calc.on_tick(60_000); // 2 wpm
        calc.on_tick(30_000); // 4 wpm
        assert!((calc.wpm_std_dev() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn reset_starts_over() {
        let mut calc = MetricsCalculator::new();
        calc.on_item_completed(
            ItemDelta {
                correct: 1,
                total: 2,
            },
            1_000,
        );
        calc.reset();
        assert_eq!(calc.stats(), CumulativeStats::default());
        assert!(calc.samples().is_empty());
    }
}
