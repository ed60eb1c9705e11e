//! Receiver operating characteristic curve and area under it.

use crate::error::RfError;

/// Points of a ROC curve, ordered by decreasing threshold.
///
/// The first point is always `(0, 0)` with threshold `+inf`.
#[derive(Debug, Clone, PartialEq)]
pub struct RocCurve {
    /// False positive rate per point.
    pub fpr: Vec<f64>,
    /// True positive rate per point.
    pub tpr: Vec<f64>,
    /// Score threshold at which each point is reached (`score >= threshold`).
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    /// Area under the curve by the trapezoid rule.
    #[must_use]
    pub fn auc(&self) -> f64 {
        self.fpr
            .windows(2)
            .zip(self.tpr.windows(2))
            .map(|(x, y)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
            .sum()
    }

    /// `(fpr, tpr)` pairs for plotting.
    #[must_use]
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.fpr.iter().copied().zip(self.tpr.iter().copied()).collect()
    }
}

/// Compute the ROC curve for binary labels (1 = positive) and scores.
///
/// One point per distinct score, sorted descending; points lying on a
/// straight line between their neighbours are dropped.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`RfError::LengthMismatch`] | `scores` differs in length from `labels` |
/// | [`RfError::NonFiniteValue`] | A score is NaN |
/// | [`RfError::DegenerateRoc`] | No positive or no negative samples |
pub fn roc_curve(labels: &[usize], scores: &[f64]) -> Result<RocCurve, RfError> {
    if scores.len() != labels.len() {
        return Err(RfError::LengthMismatch {
            what: "scores",
            expected: labels.len(),
            got: scores.len(),
        });
    }
    if let Some(sample_index) = scores.iter().position(|s| s.is_nan()) {
        return Err(RfError::NonFiniteValue {
            sample_index,
            feature_index: 0,
        });
    }

    let n_pos = labels.iter().filter(|&&l| l == 1).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(RfError::DegenerateRoc {
            reason: format!("{n_pos} positive and {n_neg} negative samples"),
        });
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    // Cumulative (fp, tp) at the last index of each distinct score.
    let mut fps = Vec::new();
    let mut tps = Vec::new();
    let mut thresholds = Vec::new();
    let (mut fp, mut tp) = (0usize, 0usize);
    for (pos, &i) in order.iter().enumerate() {
        if labels[i] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }
        let last_of_run = order
            .get(pos + 1)
            .is_none_or(|&next| scores[next] != scores[i]);
        if last_of_run {
            fps.push(fp as f64);
            tps.push(tp as f64);
            thresholds.push(scores[i]);
        }
    }

    // Drop points collinear with both neighbours.
    let keep: Vec<usize> = (0..fps.len())
        .filter(|&k| {
            if k == 0 || k + 1 == fps.len() {
                return true;
            }
            let d2_fp = fps[k + 1] - 2.0 * fps[k] + fps[k - 1];
            let d2_tp = tps[k + 1] - 2.0 * tps[k] + tps[k - 1];
            d2_fp != 0.0 || d2_tp != 0.0
        })
        .collect();

    let mut curve = RocCurve {
        fpr: vec![0.0],
        tpr: vec![0.0],
        thresholds: vec![f64::INFINITY],
    };
    for k in keep {
        curve.fpr.push(fps[k] / n_neg as f64);
        curve.tpr.push(tps[k] / n_pos as f64);
        curve.thresholds.push(thresholds[k]);
    }
    Ok(curve)
}
