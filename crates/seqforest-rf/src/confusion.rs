//! Confusion matrix, per-class metrics and the text classification report.

use std::fmt;

use crate::error::RfError;
use crate::forest::MAX_CLASSES;

/// A confusion matrix for multi-class classification.
///
/// Entry `matrix[true_class][predicted_class]` counts how many samples
/// with true label `true_class` were predicted as `predicted_class`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    matrix: Vec<Vec<usize>>,
    n_classes: usize,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// Precision: TP / (TP + FP). 0.0 if no predictions for this class.
    pub precision: f64,
    /// Recall: TP / (TP + FN). 0.0 if no true samples for this class.
    pub recall: f64,
    /// F1: 2 * precision * recall / (precision + recall). 0.0 if both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyDataset`] | Zero labels provided |
    /// | [`RfError::LengthMismatch`] | `predicted` differs in length from `true_labels` |
    /// | [`RfError::TooManyClasses`] | `n_classes` exceeds [`MAX_CLASSES`] |
    /// | [`RfError::LabelOutOfRange`] | A label or prediction is `>= n_classes` |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, RfError> {
        if true_labels.is_empty() {
            return Err(RfError::EmptyDataset);
        }
        if predicted.len() != true_labels.len() {
            return Err(RfError::LengthMismatch {
                what: "predictions",
                expected: true_labels.len(),
                got: predicted.len(),
            });
        }
        if n_classes > MAX_CLASSES {
            return Err(RfError::TooManyClasses {
                n_classes,
                max: MAX_CLASSES,
            });
        }
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (sample_index, (&t, &p)) in true_labels.iter().zip(predicted).enumerate() {
            let label = t.max(p);
            if label >= n_classes {
                return Err(RfError::LabelOutOfRange {
                    label,
                    sample_index,
                    n_classes,
                });
            }
            matrix[t][p] += 1;
        }
        Ok(Self { matrix, n_classes })
    }

    /// Build a matrix just wide enough for every label seen, and at least 2x2.
    ///
    /// # Errors
    ///
    /// Same as [`ConfusionMatrix::from_labels`]; a label `>= MAX_CLASSES`
    /// gives [`RfError::TooManyClasses`].
    pub fn from_observed(true_labels: &[usize], predicted: &[usize]) -> Result<Self, RfError> {
        let widest = true_labels
            .iter()
            .chain(predicted)
            .max()
            .copied()
            .unwrap_or(0)
            .max(1);
        Self::from_labels(true_labels, predicted, widest.saturating_add(1))
    }

    /// Overall accuracy: proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|i| self.matrix[i][i]).sum();
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            correct as f64 / total as f64
        }
    }

    /// Total number of samples counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Metrics for one class treated as the positive label.
    #[must_use]
    pub fn metrics_for(&self, c: usize) -> ClassMetrics {
        let tp = self.matrix[c][c];
        let predicted_c: usize = self.matrix.iter().map(|row| row[c]).sum();
        let support: usize = self.matrix[c].iter().sum();
        let precision = ratio(tp, predicted_c);
        let recall = ratio(tp, support);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        ClassMetrics {
            class: c,
            precision,
            recall,
            f1,
            support,
        }
    }

    /// Per-class precision, recall, F1, and support for every class index.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes).map(|c| self.metrics_for(c)).collect()
    }

    /// Classes that occur in the truth or in the predictions.
    #[must_use]
    pub fn present_classes(&self) -> Vec<usize> {
        (0..self.n_classes)
            .filter(|&c| {
                self.matrix[c].iter().any(|&n| n > 0) || self.matrix.iter().any(|row| row[c] > 0)
            })
            .collect()
    }

    /// Return the underlying matrix rows.
    #[must_use]
    pub fn as_rows(&self) -> &[Vec<usize>] {
        &self.matrix
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for j in 0..self.n_classes {
            write!(f, " pred_{j:>3}")?;
        }
        writeln!(f)?;

        for (i, row) in self.matrix.iter().enumerate() {
            write!(f, "true_{i:>3}")?;
            for val in row {
                write!(f, " {val:>8}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Unweighted or support-weighted average over report rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AverageMetrics {
    /// Averaged precision.
    pub precision: f64,
    /// Averaged recall.
    pub recall: f64,
    /// Averaged F1.
    pub f1: f64,
    /// Total support of the averaged rows.
    pub support: usize,
}

/// Per-class table plus accuracy and macro/weighted averages.
///
/// Rows cover every class found in the truth or the predictions. Printed
/// with [`fmt::Display`] in the familiar two-decimal column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    rows: Vec<ClassMetrics>,
    accuracy: f64,
    macro_avg: AverageMetrics,
    weighted_avg: AverageMetrics,
}

impl ClassificationReport {
    /// Build a report from true and predicted labels.
    ///
    /// # Errors
    ///
    /// See [`ConfusionMatrix::from_observed`].
    pub fn new(true_labels: &[usize], predicted: &[usize]) -> Result<Self, RfError> {
        Ok(Self::from_confusion(&ConfusionMatrix::from_observed(
            true_labels,
            predicted,
        )?))
    }

    /// Build a report from an existing confusion matrix.
    #[must_use]
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let rows: Vec<ClassMetrics> = cm
            .present_classes()
            .into_iter()
            .map(|c| cm.metrics_for(c))
            .collect();

        let total_support: usize = rows.iter().map(|r| r.support).sum();
        let n_rows = rows.len().max(1) as f64;
        let macro_avg = AverageMetrics {
            precision: rows.iter().map(|r| r.precision).sum::<f64>() / n_rows,
            recall: rows.iter().map(|r| r.recall).sum::<f64>() / n_rows,
            f1: rows.iter().map(|r| r.f1).sum::<f64>() / n_rows,
            support: total_support,
        };
        let weigh = |metric: fn(&ClassMetrics) -> f64| {
            if total_support == 0 {
                0.0
            } else {
                rows.iter()
                    .map(|r| metric(r) * r.support as f64)
                    .sum::<f64>()
                    / total_support as f64
            }
        };
        let weighted_avg = AverageMetrics {
            precision: weigh(|r| r.precision),
            recall: weigh(|r| r.recall),
            f1: weigh(|r| r.f1),
            support: total_support,
        };

        Self {
            accuracy: cm.accuracy(),
            rows,
            macro_avg,
            weighted_avg,
        }
    }

    /// Per-class rows in class order.
    #[must_use]
    pub fn rows(&self) -> &[ClassMetrics] {
        &self.rows
    }

    /// Overall accuracy.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Unweighted mean over the per-class rows.
    #[must_use]
    pub fn macro_avg(&self) -> AverageMetrics {
        self.macro_avg
    }

    /// Support-weighted mean over the per-class rows.
    #[must_use]
    pub fn weighted_avg(&self) -> AverageMetrics {
        self.weighted_avg
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const LAST: &str = "weighted avg";
        let width = self
            .rows
            .iter()
            .map(|r| r.class.to_string().len())
            .max()
            .unwrap_or(0)
            .max(LAST.len());

        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for r in &self.rows {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                r.class, r.precision, r.recall, r.f1, r.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", self.macro_avg), (LAST, self.weighted_avg)] {
            writeln!(
                f,
                "{:>width$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, avg.support
            )?;
        }
        Ok(())
    }
}
