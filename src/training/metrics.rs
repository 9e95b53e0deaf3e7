use burn::prelude::*;

/// The closed set of per-batch evaluation metrics.
///
/// Two input contracts exist: `F1` classifies thresholded predictions
/// (`pred > threshold`, exclusive) against boolean ground truth
/// (`truth > 0`, exclusive); `MeanAbsoluteError` compares ground truth cast
/// to `u8` against raw prediction values.
#[derive(Config, Debug, PartialEq)]
pub enum MetricKind {
    F1 { threshold: f32 },
    MeanAbsoluteError,
}

impl MetricKind {
    /// Column suffix used in the epoch log.
    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::F1 { .. } => "f1",
            MetricKind::MeanAbsoluteError => "mae",
        }
    }

    /// Compute the metric over flattened prediction and ground-truth values.
    pub fn compute(&self, truth: &[f32], predictions: &[f32]) -> f64 {
        match self {
            MetricKind::F1 { threshold } => f1_score(truth, predictions, *threshold),
            MetricKind::MeanAbsoluteError => mean_absolute_error(truth, predictions),
        }
    }
}

fn f1_score(truth: &[f32], predictions: &[f32], threshold: f32) -> f64 {
    let mut true_positives = 0u64;
    let mut false_positives = 0u64;
    let mut false_negatives = 0u64;

    for (&t, &p) in truth.iter().zip(predictions) {
        let actual = t > 0.0;
        let predicted = p > threshold;

        match (actual, predicted) {
            (true, true) => true_positives += 1,
            (false, true) => false_positives += 1,
            (true, false) => false_negatives += 1,
            (false, false) => {}
        }
    }

    let denominator = 2 * true_positives + false_positives + false_negatives;
    if denominator == 0 {
        return 0.0;
    }

    2.0 * true_positives as f64 / denominator as f64
}

fn mean_absolute_error(truth: &[f32], predictions: &[f32]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }

    let total: f64 = truth
        .iter()
        .zip(predictions)
        .map(|(&t, &p)| ((t as u8) as f64 - p as f64).abs())
        .sum();

    total / truth.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f1_threshold_is_exclusive() {
        let metric = MetricKind::F1 { threshold: 0.1 };

        // Prediction exactly at the threshold counts as negative, as does
        // ground truth exactly at zero.
        assert_eq!(metric.compute(&[1.0], &[0.1]), 0.0);
        assert_eq!(metric.compute(&[0.0], &[0.5]), 0.0);

        // Strictly above the threshold counts as positive.
        assert_eq!(metric.compute(&[1.0], &[0.100001]), 1.0);
    }

    #[test]
    fn f1_mixed_batch() {
        let metric = MetricKind::F1 { threshold: 0.1 };
        let truth = [1.0, 1.0, 0.0, 0.0];
        let predictions = [0.9, 0.05, 0.8, 0.0];

        // tp = 1, fn = 1, fp = 1 -> f1 = 2/4.
        assert_eq!(metric.compute(&truth, &predictions), 0.5);
    }

    #[test]
    fn mae_casts_truth_to_u8() {
        let metric = MetricKind::MeanAbsoluteError;

        // Fractional ground truth truncates to 0 before the comparison.
        let value = metric.compute(&[0.5, 1.0], &[0.0, 0.5]);
        assert!((value - 0.25).abs() < 1e-9);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(MetricKind::MeanAbsoluteError.compute(&[], &[]), 0.0);
        assert_eq!(MetricKind::F1 { threshold: 0.1 }.compute(&[], &[]), 0.0);
    }
}
