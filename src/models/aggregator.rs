//! Batch statistics aggregation

use crate::types::prediction::{Label, PredictionResult, StatsResult};

/// Aggregates per-row labels into a [`StatsResult`].
pub struct StatsAggregator;

impl StatsAggregator {
    /// Count labels and compute percentages.
    ///
    /// Percentages are computed from exact counts and rounded to 2 decimals.
    /// An empty batch yields all-zero stats.
    pub fn aggregate(predictions: &[PredictionResult]) -> StatsResult {
        let total = predictions.len();
        if total == 0 {
            return StatsResult::default();
        }

        let genuine = predictions
            .iter()
            .filter(|p| p.prediction == Label::Genuine)
            .count();
        let fake = total - genuine;

        StatsResult {
            total,
            genuine,
            fake,
            genuine_percentage: Self::percentage(genuine, total),
            fake_percentage: Self::percentage(fake, total),
        }
    }

    /// `count / total * 100`, rounded to 2 decimals with ties to even
    pub fn percentage(count: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        round2(count as f64 / total as f64 * 100.0)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(p_genuine: &[f64]) -> Vec<PredictionResult> {
        p_genuine
            .iter()
            .enumerate()
            .map(|(id, &p)| PredictionResult::from_genuine_probability(id, p))
            .collect()
    }

    #[test]
    fn test_thirds() {
        let stats = StatsAggregator::aggregate(&results(&[0.9, 0.5, 0.1]));

        assert_eq!(stats.total, 3);
        assert_eq!(stats.genuine, 1);
        assert_eq!(stats.fake, 2);
        assert_eq!(stats.genuine_percentage, 33.33);
        assert_eq!(stats.fake_percentage, 66.67);
    }

    #[test]
    fn test_empty_batch() {
        let stats = StatsAggregator::aggregate(&[]);
        assert_eq!(stats, StatsResult::default());
        assert_eq!(stats.genuine_percentage, 0.0);
        assert_eq!(stats.fake_percentage, 0.0);
    }

    #[test]
    fn test_percentages_sum_to_100() {
        for total in 1..=50usize {
            let p: Vec<f64> = (0..total).map(|i| if i % 3 == 0 { 0.8 } else { 0.2 }).collect();
            let stats = StatsAggregator::aggregate(&results(&p));

            assert_eq!(stats.genuine + stats.fake, stats.total);
            let sum = stats.genuine_percentage + stats.fake_percentage;
            assert!((sum - 100.0).abs() <= 0.01 + 1e-9, "total={} sum={}", total, sum);
        }
    }

    #[test]
    fn test_percentage_rounding() {
        assert_eq!(StatsAggregator::percentage(1, 8), 12.5);
        assert_eq!(StatsAggregator::percentage(2, 3), 66.67);
        assert_eq!(StatsAggregator::percentage(1, 7), 14.29);
        assert_eq!(StatsAggregator::percentage(5, 5), 100.0);
        assert_eq!(StatsAggregator::percentage(0, 0), 0.0);
    }

    #[test]
    fn test_exact_ties_round_to_even() {
        assert_eq!(StatsAggregator::percentage(1, 32), 3.12);
        assert_eq!(StatsAggregator::percentage(5, 32), 15.62);
        assert_eq!(StatsAggregator::percentage(31, 32), 96.88);
        assert_eq!(StatsAggregator::percentage(1, 800), 0.12);

        let mut p = vec![0.9; 31];
        p.push(0.1);
        let stats = StatsAggregator::aggregate(&results(&p));
        assert_eq!(stats.fake_percentage, 3.12);
        assert_eq!(stats.genuine_percentage, 96.88);
        assert!((stats.genuine_percentage + stats.fake_percentage - 100.0).abs() < 1e-9);
    }
}
