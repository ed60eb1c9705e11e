//! Random Forest training with parallel tree construction.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use crate::config::{MaxFeatures, RandomForestConfig};
use crate::error::RfError;
use crate::importance::aggregate_importances;
use crate::result::{RandomForestResult, TrainingMetadata};
use crate::tree::{DecisionTree, DecisionTreeConfig};

/// A fitted Random Forest ensemble.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RandomForest {
    pub(crate) trees: Vec<DecisionTree>,
    pub(crate) n_features: usize,
    pub(crate) n_classes: usize,
    pub(crate) feature_names: Vec<String>,
}

/// Labels are class indices and must be below this bound.
///
/// Per-class buffers are sized by the largest label, so the bound keeps a
/// stray label from turning into a huge allocation.
pub const MAX_CLASSES: usize = 1024;

/// Resolve `MaxFeatures` to a concrete count.
pub(crate) fn resolve_max_features(
    max_features: MaxFeatures,
    n_features: usize,
) -> Result<usize, RfError> {
    let resolved = match max_features {
        MaxFeatures::Sqrt => (n_features as f64).sqrt().floor().max(1.0) as usize,
        MaxFeatures::Log2 => (n_features as f64).log2().floor().max(1.0) as usize,
        MaxFeatures::Fraction(f) => (n_features as f64 * f).floor().max(1.0) as usize,
        MaxFeatures::Fixed(n) => n,
        MaxFeatures::All => n_features,
    };
    if resolved == 0 || resolved > n_features {
        return Err(RfError::InvalidMaxFeatures {
            max_features: resolved,
            n_features,
        });
    }
    Ok(resolved)
}

/// Check that a row-major matrix is non-empty, rectangular and finite.
///
/// Returns the feature count.
pub(crate) fn validate_matrix(features: &[Vec<f64>]) -> Result<usize, RfError> {
    let first = features.first().ok_or(RfError::EmptyDataset)?;
    let n_features = first.len();
    if n_features == 0 {
        return Err(RfError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(RfError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(RfError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    Ok(n_features)
}

/// Check label and weight vectors against the sample count.
pub(crate) fn validate_targets(
    n_samples: usize,
    labels: &[usize],
    weights: &[f64],
) -> Result<(), RfError> {
    if labels.len() != n_samples {
        return Err(RfError::LengthMismatch {
            what: "labels",
            expected: n_samples,
            got: labels.len(),
        });
    }
    if weights.len() != n_samples {
        return Err(RfError::LengthMismatch {
            what: "weights",
            expected: n_samples,
            got: weights.len(),
        });
    }
    if let Some((sample_index, &label)) = labels
        .iter()
        .enumerate()
        .find(|&(_, &l)| l >= MAX_CLASSES)
    {
        return Err(RfError::LabelOutOfRange {
            label,
            sample_index,
            n_classes: MAX_CLASSES,
        });
    }
    if let Some((sample_index, &weight)) = weights
        .iter()
        .enumerate()
        .find(|&(_, w)| !w.is_finite() || *w < 0.0)
    {
        return Err(RfError::InvalidSampleWeight {
            sample_index,
            weight,
        });
    }
    Ok(())
}

/// Draw `draw_count` row indices with replacement.
fn bootstrap_sample(n_samples: usize, draw_count: usize, rng: &mut impl Rng) -> Vec<usize> {
    (0..draw_count)
        .map(|_| rng.gen_range(0..n_samples))
        .collect()
}

/// Train the Random Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = features.len()))]
pub(crate) fn train(
    config: &RandomForestConfig,
    features: &[Vec<f64>],
    labels: &[usize],
    sample_weights: &[f64],
    feature_names: &[String],
) -> Result<RandomForestResult, RfError> {
    // --- Validate inputs ---
    let n_features = validate_matrix(features)?;
    let n_samples = features.len();
    validate_targets(n_samples, labels, sample_weights)?;
    if feature_names.len() != n_features {
        return Err(RfError::LengthMismatch {
            what: "feature_names",
            expected: n_features,
            got: feature_names.len(),
        });
    }

    // --- Validate config ---
    let max_features_resolved = resolve_max_features(config.max_features, n_features)?;

    if config.bootstrap_fraction <= 0.0 || config.bootstrap_fraction > 1.0 {
        return Err(RfError::InvalidBootstrapFraction {
            fraction: config.bootstrap_fraction,
        });
    }
    if let Some(d) = config.max_depth
        && d == 0
    {
        return Err(RfError::InvalidMaxDepth { max_depth: 0 });
    }

    let effective_weights: Vec<f64> = labels
        .iter()
        .zip(sample_weights)
        .map(|(&label, &w)| w * config.class_weights.get(label))
        .collect();
    let total_weight: f64 = effective_weights.iter().sum();
    if total_weight <= 0.0 {
        return Err(RfError::ZeroTotalWeight);
    }

    let n_classes = labels.iter().max().copied().unwrap_or(0) + 1;
    let draw_count = ((n_samples as f64) * config.bootstrap_fraction).ceil() as usize;

    info!(
        n_trees = config.n_trees,
        n_samples,
        n_features,
        n_classes,
        max_features = max_features_resolved,
        draw_count,
        total_weight,
        "training random forest"
    );

    // Seeds are fixed before the parallel section; thread count cannot change them.
    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();

    let base_tree_config = DecisionTreeConfig::new()
        .with_criterion(config.criterion)
        .with_max_depth(config.max_depth)
        .with_min_samples_split(config.min_samples_split)
        .with_min_samples_leaf(config.min_samples_leaf)
        .with_max_features(Some(max_features_resolved))
        .with_n_classes(Some(n_classes));

    let trees: Vec<DecisionTree> = tree_seeds
        .into_par_iter()
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let bootstrap_indices = bootstrap_sample(n_samples, draw_count, &mut rng);

            let boot_features: Vec<Vec<f64>> = bootstrap_indices
                .iter()
                .map(|&i| features[i].clone())
                .collect();
            let boot_labels: Vec<usize> = bootstrap_indices.iter().map(|&i| labels[i]).collect();
            let boot_weights: Vec<f64> = bootstrap_indices
                .iter()
                .map(|&i| effective_weights[i])
                .collect();

            base_tree_config
                .clone()
                .with_seed(rng.r#gen())
                .fit_weighted(&boot_features, &boot_labels, &boot_weights)
        })
        .collect::<Result<_, _>>()?;

    let per_tree_importances: Vec<Vec<f64>> =
        trees.iter().map(DecisionTree::feature_importances).collect();
    let importances = aggregate_importances(&per_tree_importances, feature_names);

    debug!(n_trees_trained = trees.len(), "tree training complete");

    let forest = RandomForest {
        trees,
        n_features,
        n_classes,
        feature_names: feature_names.to_vec(),
    };

    let metadata = TrainingMetadata {
        n_trees: config.n_trees,
        n_features,
        n_classes,
        n_samples,
        max_features_resolved,
        total_weight,
    };

    info!(
        n_trees = metadata.n_trees,
        top_feature = importances.first().map(|f| f.name.as_str()),
        "random forest training complete"
    );

    Ok(RandomForestResult::new(forest, importances, metadata))
}

#[cfg(test)]
mod tests {
    use crate::class_weight::{ClassWeights, compute_class_weight_balanced};
    use super::MAX_CLASSES;
    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::RfError;

    /// Two well-separated classes on `x`, a noise column `y`.
    fn make_separable_data() -> (Vec<Vec<f64>>, Vec<usize>, Vec<String>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            features.push(vec![i as f64 * 0.15, (i % 3) as f64]);
            labels.push(0);
        }
        for i in 0..20 {
            features.push(vec![10.0 + i as f64 * 0.15, (i % 3) as f64]);
            labels.push(1);
        }
        let names = vec!["x".to_string(), "y".to_string()];
        (features, labels, names)
    }

    fn accuracy(preds: &[usize], labels: &[usize]) -> f64 {
        let correct = preds.iter().zip(labels).filter(|&(p, l)| p == l).count();
        correct as f64 / labels.len() as f64
    }

    #[test]
    fn separable_accuracy() {
        let (features, labels, names) = make_separable_data();
        let result = RandomForestConfig::new(30)
            .unwrap()
            .with_max_features(MaxFeatures::All)
            .fit(&features, &labels, &names)
            .unwrap();
        let preds = result.forest().predict_batch(&features).unwrap();
        assert!(accuracy(&preds, &labels) > 0.95);
        assert_eq!(result.importances()[0].name, "x");
    }

    #[test]
    fn feature_importances_sum_to_one() {
        let (features, labels, names) = make_separable_data();
        let result = RandomForestConfig::new(20)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();
        let total: f64 = result.importances().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-10, "total = {total}");
    }

    #[test]
    fn deterministic_with_same_seed() {
        let (features, labels, names) = make_separable_data();
        let fit = || {
            RandomForestConfig::new(10)
                .unwrap()
                .with_seed(99)
                .fit(&features, &labels, &names)
                .unwrap()
        };
        let a = fit().forest().predict_proba_batch(&features).unwrap();
        let b = fit().forest().predict_proba_batch(&features).unwrap();
        for (pa, pb) in a.iter().zip(&b) {
            assert_eq!(pa.as_slice(), pb.as_slice());
        }
    }

    #[test]
    fn effective_weight_is_sample_times_class_weight() {
        let features = vec![vec![1.0]; 4];
        let labels = vec![0, 0, 0, 1];
        let sample_weights = [1.0, 2.0, 1.0, 3.0];
        let names = vec!["x".to_string()];
        let class_weights = compute_class_weight_balanced(&labels).unwrap();
        assert!((class_weights.get(0) - 2.0 / 3.0).abs() < 1e-12);
        assert!((class_weights.get(1) - 2.0).abs() < 1e-12);

        let result = RandomForestConfig::new(20)
            .unwrap()
            .with_class_weights(class_weights)
            .fit_weighted(&features, &labels, &sample_weights, &names)
            .unwrap();
        let expected = 4.0 * (2.0 / 3.0) + 3.0 * 2.0;
        assert!((result.metadata().total_weight - expected).abs() < 1e-12);
    }

    #[test]
    fn class_weight_shifts_ambiguous_region() {
        // Identical features for both classes: every tree is a single leaf
        // whose distribution is the weighted class share of its bootstrap.
        let features = vec![vec![1.0]; 4];
        let labels = vec![0, 0, 0, 1];
        let names = vec!["x".to_string()];

        let plain = RandomForestConfig::new(20)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();
        let balanced = RandomForestConfig::new(20)
            .unwrap()
            .with_class_weights(compute_class_weight_balanced(&labels).unwrap())
            .fit(&features, &labels, &names)
            .unwrap();

        let p_plain = plain.forest().predict_proba(&[1.0]).unwrap().proba_of(1);
        let p_bal = balanced.forest().predict_proba(&[1.0]).unwrap().proba_of(1);
        assert!(p_plain > 0.0);
        assert!(p_bal > p_plain, "balanced {p_bal} vs plain {p_plain}");
        assert!((plain.metadata().total_weight - 4.0).abs() < 1e-12);
    }

    #[test]
    fn constant_padding_columns_do_not_stunt_trees() {
        // Column 0 separates the classes; 99 zero-padding columns do not.
        let features: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let mut row = vec![0.0; 100];
                row[0] = if i < 20 {
                    -1.0 - f64::from(i) * 0.01
                } else {
                    1.0 + f64::from(i) * 0.01
                };
                row
            })
            .collect();
        let labels: Vec<usize> = (0..40).map(|i| usize::from(i >= 20)).collect();
        let names: Vec<String> = (0..100).map(|i| format!("t{i}_d0")).collect();

        let result = RandomForestConfig::new(100)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap();

        let single_leaf = result
            .forest()
            .trees
            .iter()
            .filter(|t| t.n_leaves() == 1)
            .count();
        assert_eq!(single_leaf, 0);

        let mut positive = vec![0.0; 100];
        positive[0] = 1.2;
        let p = result.forest().predict_proba(&positive).unwrap().proba_of(1);
        assert!(p > 0.99, "p = {p}");
        assert_eq!(result.importances()[0].name, "t0_d0");
    }

    #[test]
    fn huge_label_rejected_before_training() {
        let (features, mut labels, names) = make_separable_data();
        labels[7] = 1_000_000;
        let err = RandomForestConfig::new(5)
            .unwrap()
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::LabelOutOfRange {
                label: 1_000_000,
                sample_index: 7,
                n_classes: MAX_CLASSES,
            }
        ));
    }

    #[test]
    fn zero_class_weights_error() {
        let (features, labels, names) = make_separable_data();
        let weights = ClassWeights::from_pairs([(0, 0.0), (1, 0.0)]).unwrap();
        let err = RandomForestConfig::new(5)
            .unwrap()
            .with_class_weights(weights)
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, RfError::ZeroTotalWeight));
    }

    #[test]
    fn sample_weight_length_mismatch() {
        let (features, labels, names) = make_separable_data();
        let err = RandomForestConfig::new(5)
            .unwrap()
            .fit_weighted(&features, &labels, &[1.0; 3], &names)
            .unwrap_err();
        assert!(matches!(
            err,
            RfError::LengthMismatch {
                what: "weights",
                expected: 40,
                got: 3
            }
        ));
    }

    #[test]
    fn feature_name_mismatch() {
        let (features, labels, _) = make_separable_data();
        let err = RandomForestConfig::new(5)
            .unwrap()
            .fit(&features, &labels, &["x".to_string()])
            .unwrap_err();
        assert!(matches!(err, RfError::LengthMismatch { what: "feature_names", .. }));
    }

    #[test]
    fn invalid_tree_count_error() {
        assert!(RandomForestConfig::new(0).is_err());
    }

    #[test]
    fn invalid_bootstrap_fraction_error() {
        let (features, labels, names) = make_separable_data();
        let err = RandomForestConfig::new(5)
            .unwrap()
            .with_bootstrap_fraction(0.0)
            .fit(&features, &labels, &names)
            .unwrap_err();
        assert!(matches!(err, RfError::InvalidBootstrapFraction { .. }));
    }

    #[test]
    fn empty_dataset_error() {
        let err = RandomForestConfig::new(10)
            .unwrap()
            .fit(&[], &[], &[])
            .unwrap_err();
        assert!(matches!(err, RfError::EmptyDataset));
    }
}
