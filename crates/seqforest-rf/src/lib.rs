//! Weighted Random Forest classification for flattened sequence features.
//!
//! Hand-rolled CART trees with Gini/Entropy criteria and per-sample weights,
//! a bootstrap ensemble trained in parallel via rayon, balanced class
//! weights, thresholded binary evaluation with a text classification report,
//! ROC/AUC, MDI feature importance, and bincode model persistence.

mod class_weight;
mod config;
mod confusion;
mod error;
mod forest;
mod importance;
mod metrics;
mod node;
mod predict;
mod result;
mod roc;
mod serialize;
mod split;
mod tree;

pub use class_weight::{ClassWeights, compute_class_weight_balanced};
pub use config::{MaxFeatures, RandomForestConfig};
pub use confusion::{AverageMetrics, ClassMetrics, ClassificationReport, ConfusionMatrix};
pub use error::RfError;
pub use forest::{MAX_CLASSES, RandomForest};
pub use importance::RankedFeature;
pub use metrics::{POSITIVE_CLASS, ThresholdEvaluation, apply_threshold, evaluate_with_threshold};
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingMetadata};
pub use roc::{RocCurve, roc_curve};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
