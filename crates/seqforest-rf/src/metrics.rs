//! Binary evaluation at a custom decision threshold.

use std::fmt;

use tracing::{info, instrument};

use crate::confusion::{ClassificationReport, ConfusionMatrix};
use crate::error::RfError;
use crate::forest::RandomForest;

/// Label treated as the positive class.
pub const POSITIVE_CLASS: usize = 1;

/// Metrics for one thresholded pass over a labelled set.
#[derive(Debug, Clone)]
pub struct ThresholdEvaluation {
    /// Threshold applied to the positive-class probability.
    pub threshold: f64,
    /// Fraction of correct predictions.
    pub accuracy: f64,
    /// Binary precision for [`POSITIVE_CLASS`]; 0.0 when nothing is predicted positive.
    pub precision: f64,
    /// Binary recall for [`POSITIVE_CLASS`]; 0.0 when there are no positives.
    pub recall: f64,
    /// Harmonic mean of precision and recall; 0.0 when both are zero.
    pub f1: f64,
    /// Positive-class probability per sample.
    pub scores: Vec<f64>,
    /// Thresholded predictions per sample.
    pub predictions: Vec<usize>,
    /// Counts over truth and thresholded predictions.
    pub confusion: ConfusionMatrix,
    /// Per-class table with averages.
    pub report: ClassificationReport,
}

/// Turn scores into hard labels: `1` iff `score > threshold`.
#[must_use]
pub fn apply_threshold(scores: &[f64], threshold: f64) -> Vec<usize> {
    scores
        .iter()
        .map(|&s| usize::from(s > threshold))
        .collect()
}

/// Evaluate `forest` on a labelled set, predicting [`POSITIVE_CLASS`] iff
/// its probability is strictly greater than `threshold`.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::InvalidThreshold`] | `threshold` is NaN |
/// | [`RfError::EmptyDataset`] | `features` is empty |
/// | [`RfError::LengthMismatch`] | `labels` differs in length from `features` |
/// | [`RfError::NotBinary`] | The forest has fewer than 2 classes |
/// | [`RfError::PredictionFeatureMismatch`] | A sample has the wrong feature count |
#[instrument(skip(forest, features, labels), fields(n_samples = features.len()))]
pub fn evaluate_with_threshold(
    forest: &RandomForest,
    features: &[Vec<f64>],
    labels: &[usize],
    threshold: f64,
) -> Result<ThresholdEvaluation, RfError> {
    if threshold.is_nan() {
        return Err(RfError::InvalidThreshold);
    }
    if features.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    if labels.len() != features.len() {
        return Err(RfError::LengthMismatch {
            what: "labels",
            expected: features.len(),
            got: labels.len(),
        });
    }

    let scores = forest.positive_proba_batch(features)?;
    let predictions = apply_threshold(&scores, threshold);
    let confusion = ConfusionMatrix::from_observed(labels, &predictions)?;
    let positive = confusion.metrics_for(POSITIVE_CLASS);
    let report = ClassificationReport::from_confusion(&confusion);

    let evaluation = ThresholdEvaluation {
        threshold,
        accuracy: confusion.accuracy(),
        precision: positive.precision,
        recall: positive.recall,
        f1: positive.f1,
        scores,
        predictions,
        confusion,
        report,
    };

    info!(
        threshold,
        accuracy = evaluation.accuracy,
        precision = evaluation.precision,
        recall = evaluation.recall,
        f1 = evaluation.f1,
        "threshold evaluation"
    );

    Ok(evaluation)
}

impl fmt::Display for ThresholdEvaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Evaluation with threshold {:.2}:", self.threshold)?;
        writeln!(f, "Accuracy:  {:.4}", self.accuracy)?;
        writeln!(f, "Precision: {:.4}", self.precision)?;
        writeln!(f, "Recall:    {:.4}", self.recall)?;
        writeln!(f, "F1 Score:  {:.4}", self.f1)?;
        writeln!(f)?;
        writeln!(f, "Confusion matrix:")?;
        write!(f, "{}", self.confusion)?;
        writeln!(f)?;
        writeln!(f, "Classification report:")?;
        write!(f, "{}", self.report)
    }
}
