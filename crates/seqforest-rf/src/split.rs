use rand::Rng;

use crate::node::{FeatureIndex, Impurity};

/// Criterion for measuring the quality of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitCriterion {
    /// Gini impurity: 1 - Σ(p_i²)
    Gini,
    /// Information entropy: -Σ(p_i · ln(p_i))
    Entropy,
}

impl SplitCriterion {
    /// Compute the impurity of a node from its weighted class totals.
    ///
    /// `p_i = class_totals[i] / total`. A node with zero total weight is
    /// reported as pure.
    #[must_use]
    pub fn impurity(&self, class_totals: &[f64], total: f64) -> Impurity {
        if total <= 0.0 {
            return Impurity::new(0.0);
        }
        let value = match self {
            SplitCriterion::Gini => {
                let sum_sq: f64 = class_totals
                    .iter()
                    .map(|&w| {
                        let p = w / total;
                        p * p
                    })
                    .sum();
                1.0 - sum_sq
            }
            SplitCriterion::Entropy => {
                -class_totals
                    .iter()
                    .filter(|&&w| w > 0.0)
                    .map(|&w| {
                        let p = w / total;
                        p * p.ln()
                    })
                    .sum::<f64>()
            }
        };
        Impurity::new(value.max(0.0))
    }
}

/// Best split found for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    pub(crate) feature: FeatureIndex,
    pub(crate) threshold: f64,
    /// `W·I(parent) - W_l·I(left) - W_r·I(right)` over effective weights.
    pub(crate) impurity_decrease: f64,
    pub(crate) left_indices: Vec<usize>,
    pub(crate) right_indices: Vec<usize>,
}

/// Sum effective weights per class for the given rows.
pub(crate) fn class_totals(
    labels: &[usize],
    weights: &[f64],
    sample_indices: &[usize],
    n_classes: usize,
) -> (Vec<f64>, f64) {
    let mut totals = vec![0.0f64; n_classes];
    for &si in sample_indices {
        totals[labels[si]] += weights[si];
    }
    let sum = totals.iter().sum();
    (totals, sum)
}

/// Find the best split among a random subset of features.
///
/// Features are drawn without replacement. Each drawn feature sorts the rows
/// by value and scans left to right, moving one row's weight from the right
/// class totals to the left at each step. Split quality is the weighted
/// impurity decrease; `min_samples_leaf` is checked on row counts.
///
/// Drawing stops after `max_features` features once at least one of them
/// was non-constant over the rows, so constant columns never end the search
/// while an unseen feature could still split the node.
///
/// Returns `None` when every feature is constant over the rows or every
/// boundary would violate `min_samples_leaf`.
///
/// `features` is column-major: `features[feature_idx][row_idx]`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[usize],
    weights: &[f64],
    sample_indices: &[usize],
    n_classes: usize,
    criterion: &SplitCriterion,
    max_features: usize,
    min_samples_leaf: usize,
    rng: &mut impl Rng,
) -> Option<SplitResult> {
    let n_features = features.len();
    let n_samples = sample_indices.len();

    if n_samples < 2 || n_features == 0 {
        return None;
    }

    let (parent_totals, parent_weight) =
        class_totals(labels, weights, sample_indices, n_classes);
    let parent_impurity = criterion.impurity(&parent_totals, parent_weight);

    let mut feature_order: Vec<usize> = (0..n_features).collect();
    let take = max_features.clamp(1, n_features);
    let mut n_non_constant = 0usize;

    let mut best_decrease = f64::NEG_INFINITY;
    let mut best: Option<(FeatureIndex, f64)> = None;
    let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(n_samples);

    // Incremental Fisher-Yates: position `drawn` receives the next feature.
    for drawn in 0..n_features {
        if drawn >= take && n_non_constant > 0 {
            break;
        }
        let j = rng.gen_range(drawn..n_features);
        feature_order.swap(drawn, j);
        let feat_idx = feature_order[drawn];
        let feat_col = &features[feat_idx];

        sorted.clear();
        sorted.extend(sample_indices.iter().map(|&si| (feat_col[si], si)));
        sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        if sorted[0].0 == sorted[n_samples - 1].0 {
            continue;
        }
        n_non_constant += 1;

        let mut left_totals = vec![0.0f64; n_classes];
        let mut right_totals = parent_totals.clone();
        let mut left_weight = 0.0f64;

        for i in 0..(n_samples - 1) {
            let (val_i, si) = sorted[i];
            let w = weights[si];
            let class_i = labels[si];

            left_totals[class_i] += w;
            right_totals[class_i] = (right_totals[class_i] - w).max(0.0);
            left_weight += w;

            let val_next = sorted[i + 1].0;
            if val_i == val_next {
                continue;
            }

            let n_left = i + 1;
            let n_right = n_samples - n_left;
            if n_left < min_samples_leaf || n_right < min_samples_leaf {
                continue;
            }

            let right_weight = (parent_weight - left_weight).max(0.0);
            let left_impurity = criterion.impurity(&left_totals, left_weight);
            let right_impurity = criterion.impurity(&right_totals, right_weight);

            let decrease = parent_weight * parent_impurity.value()
                - left_weight * left_impurity.value()
                - right_weight * right_impurity.value();

            if decrease > best_decrease {
                best_decrease = decrease;
                let mut threshold = val_i + (val_next - val_i) / 2.0;
                // Midpoint can round up to the next value for adjacent floats.
                if threshold >= val_next {
                    threshold = val_i;
                }
                best = Some((FeatureIndex::new(feat_idx), threshold));
            }
        }
    }

    let (best_feature, threshold) = best?;

    let feat_col = &features[best_feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| feat_col[si] <= threshold);

    Some(SplitResult {
        feature: best_feature,
        threshold,
        impurity_decrease: best_decrease.max(0.0),
        left_indices,
        right_indices,
    })
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{SplitCriterion, find_best_split};

    fn split_one_feature(
        values: Vec<f64>,
        labels: &[usize],
        weights: &[f64],
        min_samples_leaf: usize,
    ) -> Option<super::SplitResult> {
        let features = vec![values];
        let sample_indices: Vec<usize> = (0..labels.len()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        find_best_split(
            &features,
            labels,
            weights,
            &sample_indices,
            2,
            &SplitCriterion::Gini,
            1,
            min_samples_leaf,
            &mut rng,
        )
    }

    #[test]
    fn gini_pure_and_balanced() {
        let pure = SplitCriterion::Gini.impurity(&[4.5, 0.0], 4.5);
        assert!(pure.value().abs() < f64::EPSILON);
        let balanced = SplitCriterion::Gini.impurity(&[2.5, 2.5], 5.0);
        assert!((balanced.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn entropy_balanced_is_ln2() {
        let imp = SplitCriterion::Entropy.impurity(&[3.0, 3.0], 6.0);
        assert!((imp.value() - 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn weights_shift_impurity() {
        // 1 row of class 0 weighted 3x against 3 rows of class 1 is balanced.
        let imp = SplitCriterion::Gini.impurity(&[3.0, 3.0], 6.0);
        assert!((imp.value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_weight_node_is_pure() {
        let imp = SplitCriterion::Gini.impurity(&[0.0, 0.0], 0.0);
        assert_eq!(imp.value(), 0.0);
    }

    #[test]
    fn separable_data_finds_midpoint_split() {
        let split = split_one_feature(
            vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0],
            &[0, 0, 0, 1, 1, 1],
            &[1.0; 6],
            1,
        )
        .expect("should find a split");
        assert_eq!(split.feature.index(), 0);
        assert!((split.threshold - 6.5).abs() < 1e-12);
        assert_eq!(split.left_indices, vec![0, 1, 2]);
        assert_eq!(split.right_indices, vec![3, 4, 5]);
        // Parent: W=6, gini=0.5; children pure.
        assert!((split.impurity_decrease - 3.0).abs() < 1e-12);
    }

    #[test]
    fn heavy_sample_moves_the_split() {
        // A heavy class-0 row at 3.0 pulls the boundary to its right.
        let weighted = split_one_feature(
            vec![1.0, 2.0, 3.0, 4.0],
            &[0, 1, 0, 1],
            &[1.0, 1.0, 10.0, 1.0],
            1,
        )
        .unwrap();
        assert!((weighted.threshold - 3.5).abs() < 1e-12);
        assert_eq!(weighted.right_indices, vec![3]);
    }

    #[test]
    fn constant_feature_returns_none() {
        let result = split_one_feature(vec![5.0; 4], &[0, 0, 1, 1], &[1.0; 4], 1);
        assert!(result.is_none());
    }

    #[test]
    fn constant_candidates_do_not_stop_the_search() {
        // Only the last of 50 columns varies; one candidate per node.
        let mut features = vec![vec![0.0; 6]; 50];
        features[49] = vec![1.0, 2.0, 3.0, 10.0, 11.0, 12.0];
        let labels = [0, 0, 0, 1, 1, 1];
        let sample_indices: Vec<usize> = (0..6).collect();
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let split = find_best_split(
                &features,
                &labels,
                &[1.0; 6],
                &sample_indices,
                2,
                &SplitCriterion::Gini,
                1,
                1,
                &mut rng,
            )
            .unwrap();
            assert_eq!(split.feature.index(), 49, "seed {seed}");
            assert_eq!(split.left_indices, vec![0, 1, 2]);
        }
    }

    #[test]
    fn all_constant_columns_return_none() {
        let features = vec![vec![1.0; 4], vec![2.0; 4], vec![3.0; 4]];
        let sample_indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let result = find_best_split(
            &features,
            &[0, 1, 0, 1],
            &[1.0; 4],
            &sample_indices,
            2,
            &SplitCriterion::Gini,
            1,
            1,
            &mut rng,
        );
        assert!(result.is_none());
    }

    #[test]
    fn min_samples_leaf_enforced() {
        let result = split_one_feature(vec![1.0, 10.0], &[0, 1], &[1.0; 2], 2);
        assert!(result.is_none());
    }
}
