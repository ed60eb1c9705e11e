//! Train/eval/test split loading with a shared target length and scaler.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::IoError;
use crate::domain::Dataset;
use crate::reader::{
    DEFAULT_FEATURE_COLUMN, DEFAULT_LABEL_COLUMN, DEFAULT_WEIGHT_COLUMN, ManifestLoader,
    max_sequence_length,
};
use crate::scaler::StandardScaler;

/// Column holding the per-sample feature file in the split manifests.
pub const SPLIT_FEATURE_COLUMN: &str = "contextual_feature_file";

/// Manifest locations and column names for one experiment.
///
/// `Default` holds the fixed relative paths of the downsampled dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPaths {
    /// Manifest scanned for the target sequence length.
    pub length_manifest: PathBuf,
    /// Training split manifest.
    pub train_manifest: PathBuf,
    /// Evaluation split manifest.
    pub eval_manifest: PathBuf,
    /// Test split manifest.
    pub test_manifest: PathBuf,
    /// Directory the feature files are resolved in.
    pub feature_dir: PathBuf,
    /// Feature column of the length manifest.
    pub length_column: String,
    /// Feature column of the split manifests.
    pub feature_column: String,
    /// Label column of the split manifests.
    pub label_column: String,
    /// Optional weight column of the split manifests.
    pub weight_column: String,
}

impl Default for SplitPaths {
    fn default() -> Self {
        Self {
            length_manifest: PathBuf::from("data/metadata/label_downsampled.csv"),
            train_manifest: PathBuf::from("data/metadata/train_downsample.csv"),
            eval_manifest: PathBuf::from("data/metadata/eval_downsample.csv"),
            test_manifest: PathBuf::from("data/metadata/test_downsample.csv"),
            feature_dir: PathBuf::from("data/downsampled_features"),
            length_column: DEFAULT_FEATURE_COLUMN.to_string(),
            feature_column: SPLIT_FEATURE_COLUMN.to_string(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            weight_column: DEFAULT_WEIGHT_COLUMN.to_string(),
        }
    }
}

impl SplitPaths {
    /// Longest sequence over the length manifest; see [`max_sequence_length`].
    ///
    /// # Errors
    ///
    /// Same as [`max_sequence_length`].
    pub fn target_length(&self) -> Result<usize, IoError> {
        max_sequence_length(&self.length_manifest, &self.feature_dir, &self.length_column)
    }

    fn loader(&self, manifest: &Path, target_length: Option<usize>) -> ManifestLoader {
        let loader = ManifestLoader::new(manifest, &self.feature_dir)
            .with_feature_column(&self.feature_column)
            .with_label_column(&self.label_column)
            .with_weight_column(&self.weight_column);
        match target_length {
            Some(n) => loader.with_target_length(n),
            None => loader,
        }
    }
}

/// Load the training split, fit a [`StandardScaler`] on it and standardize it.
///
/// # Errors
///
/// Any [`ManifestLoader::load`] error, or [`IoError::EmptyDataset`] when no
/// training row could be loaded.
#[instrument(skip(paths), fields(manifest = %paths.train_manifest.display()))]
pub fn load_train_data(
    paths: &SplitPaths,
    target_length: Option<usize>,
) -> Result<(Dataset, StandardScaler), IoError> {
    let mut dataset = paths.loader(&paths.train_manifest, target_length).load()?;
    let scaler = StandardScaler::fit_transform(&mut dataset.features).map_err(|e| match e {
        IoError::EmptyDataset { .. } => IoError::EmptyDataset {
            context: format!(
                "no training rows loaded from {}",
                paths.train_manifest.display()
            ),
        },
        other => other,
    })?;
    info!(n_rows = dataset.len(), "training split scaled");
    Ok((dataset, scaler))
}

/// Load the evaluation split, applying `scaler` when given.
///
/// # Errors
///
/// Any [`ManifestLoader::load`] error, or [`IoError::ScalerDimMismatch`].
pub fn load_eval_data(
    paths: &SplitPaths,
    target_length: Option<usize>,
    scaler: Option<&StandardScaler>,
) -> Result<Dataset, IoError> {
    load_scaled(paths, &paths.eval_manifest, target_length, scaler)
}

/// Load the test split, applying `scaler` when given.
///
/// # Errors
///
/// Any [`ManifestLoader::load`] error, or [`IoError::ScalerDimMismatch`].
pub fn load_test_data(
    paths: &SplitPaths,
    target_length: Option<usize>,
    scaler: Option<&StandardScaler>,
) -> Result<Dataset, IoError> {
    load_scaled(paths, &paths.test_manifest, target_length, scaler)
}

#[instrument(skip(paths, scaler), fields(manifest = %manifest.display(), scaled = scaler.is_some()))]
fn load_scaled(
    paths: &SplitPaths,
    manifest: &Path,
    target_length: Option<usize>,
    scaler: Option<&StandardScaler>,
) -> Result<Dataset, IoError> {
    let mut dataset = paths.loader(manifest, target_length).load()?;
    if let Some(scaler) = scaler {
        scaler.transform(&mut dataset.features)?;
    }
    Ok(dataset)
}
