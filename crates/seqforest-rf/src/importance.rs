//! Feature importance aggregation across trees.

/// A ranked feature with its column index, name, importance score, and rank.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankedFeature {
    /// Zero-based column index into the flattened feature vector.
    pub index: usize,
    /// Feature name.
    pub name: String,
    /// Normalized importance score (sums to 1.0 across all features).
    pub importance: f64,
    /// 1-based rank (1 = most important).
    pub rank: usize,
}

/// Aggregate per-tree MDI importances into ranked features.
///
/// Each tree's vector is already normalized; vectors are summed, the sum is
/// renormalized to 1.0, and features are sorted descending. Equal scores
/// keep column order.
pub(crate) fn aggregate_importances(
    per_tree: &[Vec<f64>],
    names: &[String],
) -> Vec<RankedFeature> {
    if per_tree.is_empty() || names.is_empty() {
        return vec![];
    }

    let n_features = names.len();
    let mut totals = vec![0.0f64; n_features];

    for tree_imp in per_tree {
        for (total, &val) in totals.iter_mut().zip(tree_imp) {
            *total += val;
        }
    }

    let sum: f64 = totals.iter().sum();
    if sum > 0.0 {
        totals.iter_mut().for_each(|v| *v /= sum);
    }

    let mut features: Vec<RankedFeature> = names
        .iter()
        .zip(totals)
        .enumerate()
        .map(|(index, (name, importance))| RankedFeature {
            index,
            name: name.clone(),
            importance,
            rank: 0,
        })
        .collect();

    features.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    for (i, feat) in features.iter_mut().enumerate() {
        feat.rank = i + 1;
    }

    features
}

#[cfg(test)]
mod tests {
    use super::aggregate_importances;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn sums_and_renormalizes() {
        let per_tree = vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.5, 0.5]];
        let ranked = aggregate_importances(&per_tree, &names(3));
        assert_eq!(ranked[0].index, 0);
        assert!((ranked[0].importance - 0.5).abs() < 1e-12);
        assert!((ranked[1].importance - 0.25).abs() < 1e-12);
        let total: f64 = ranked.iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_column_order() {
        let ranked = aggregate_importances(&[vec![0.5, 0.5]], &names(2));
        assert_eq!(ranked[0].index, 0);
        assert_eq!(ranked[1].index, 1);
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn all_zero_stays_zero() {
        let ranked = aggregate_importances(&[vec![0.0, 0.0]], &names(2));
        assert!(ranked.iter().all(|f| f.importance == 0.0));
    }
}
