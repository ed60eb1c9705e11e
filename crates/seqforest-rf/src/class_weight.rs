//! Per-class training weights.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::RfError;

/// Multiplier applied to every training row of a class.
///
/// Classes without an entry weigh 1.0.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassWeights {
    weights: BTreeMap<usize, f64>,
}

impl ClassWeights {
    /// Build from explicit `(class, weight)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`RfError::InvalidClassWeight`] for a negative or non-finite weight.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (usize, f64)>) -> Result<Self, RfError> {
        let mut weights = BTreeMap::new();
        for (class, weight) in pairs {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RfError::InvalidClassWeight { class, weight });
            }
            weights.insert(class, weight);
        }
        Ok(Self { weights })
    }

    /// Return the weight for `class`, 1.0 when unset.
    #[must_use]
    pub fn get(&self, class: usize) -> f64 {
        self.weights.get(&class).copied().unwrap_or(1.0)
    }

    /// Iterate over explicitly set `(class, weight)` pairs in class order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.weights.iter().map(|(&c, &w)| (c, w))
    }

    /// Return `true` if no class has an explicit weight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Weights that make every observed class contribute equally.
///
/// For each label `c` present in `labels`:
/// `n_samples / (n_observed_classes * count_c)`.
///
/// # Errors
///
/// Returns [`RfError::EmptyDataset`] when `labels` is empty.
pub fn compute_class_weight_balanced(labels: &[usize]) -> Result<ClassWeights, RfError> {
    if labels.is_empty() {
        return Err(RfError::EmptyDataset);
    }
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let n_samples = labels.len() as f64;
    let n_classes = counts.len() as f64;
    let weights = counts
        .into_iter()
        .map(|(class, count)| (class, n_samples / (n_classes * count as f64)))
        .collect::<BTreeMap<_, _>>();
    debug!(?weights, "balanced class weights");
    Ok(ClassWeights { weights })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_three_to_one() {
        let w = compute_class_weight_balanced(&[0, 0, 0, 1]).unwrap();
        assert!((w.get(0) - 2.0 / 3.0).abs() < 1e-12);
        assert!((w.get(1) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn balanced_classes_weigh_one() {
        let w = compute_class_weight_balanced(&[1, 0, 1, 0]).unwrap();
        assert!((w.get(0) - 1.0).abs() < 1e-12);
        assert!((w.get(1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unobserved_class_defaults_to_one() {
        let w = compute_class_weight_balanced(&[0, 0, 2]).unwrap();
        assert_eq!(w.get(1), 1.0);
        assert_eq!(w.iter().count(), 2);
    }

    #[test]
    fn empty_labels_error() {
        assert!(matches!(
            compute_class_weight_balanced(&[]),
            Err(RfError::EmptyDataset)
        ));
    }

    #[test]
    fn negative_pair_rejected() {
        let err = ClassWeights::from_pairs([(0, 1.0), (1, -0.5)]).unwrap_err();
        assert!(matches!(err, RfError::InvalidClassWeight { class: 1, .. }));
    }
}
