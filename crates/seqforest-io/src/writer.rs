//! Artifact writers: importance CSV, ROC PNG, evaluation and preprocessing JSON.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::plot::render_roc;
use crate::scaler::StandardScaler;

/// Where each artifact of a run is written.
///
/// `Default` holds the fixed relative paths; [`ArtifactPaths::under`]
/// re-roots them.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    /// ROC curve image.
    pub roc_plot: PathBuf,
    /// Top-k feature importance table.
    pub importance_csv: PathBuf,
    /// Machine-readable evaluation summary.
    pub evaluation_json: PathBuf,
    /// Target length, feature dim and scaler statistics.
    pub preprocessing_json: PathBuf,
    /// Serialized forest.
    pub model: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            roc_plot: PathBuf::from("data/visualization/roc_auc_curve_RD_DOWN.png"),
            importance_csv: PathBuf::from("data/visualization/feature_importance_downsampled.csv"),
            evaluation_json: PathBuf::from("data/visualization/evaluation_downsampled.json"),
            preprocessing_json: PathBuf::from("models/baseline_model/preprocessing.json"),
            model: PathBuf::from("models/baseline_model/best_rf_model.bin"),
        }
    }
}

impl ArtifactPaths {
    /// Default paths joined onto `root`.
    #[must_use]
    pub fn under(root: &Path) -> Self {
        let d = Self::default();
        Self {
            roc_plot: root.join(d.roc_plot),
            importance_csv: root.join(d.importance_csv),
            evaluation_json: root.join(d.evaluation_json),
            preprocessing_json: root.join(d.preprocessing_json),
            model: root.join(d.model),
        }
    }
}

/// One ranked feature, as written to the CSV and the evaluation JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceEntry {
    /// 1-based rank.
    pub rank: usize,
    /// Flattened column index.
    pub index: usize,
    /// `t{step}_d{dim}` name.
    pub name: String,
    /// Normalized importance.
    pub importance: f64,
}

/// Per-class metrics row of the evaluation JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    /// Class label.
    pub class: usize,
    /// Precision for this class.
    pub precision: f64,
    /// Recall for this class.
    pub recall: f64,
    /// F1 for this class.
    pub f1: f64,
    /// True samples of this class.
    pub support: usize,
}

/// Evaluation results in plain values, so this crate needs no classifier types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Decision threshold on the positive-class probability.
    pub threshold: f64,
    /// Rows in the training split.
    pub n_train: usize,
    /// Rows in the evaluated split.
    pub n_eval: usize,
    /// Overall accuracy.
    pub accuracy: f64,
    /// Positive-class precision.
    pub precision: f64,
    /// Positive-class recall.
    pub recall: f64,
    /// Positive-class F1.
    pub f1: f64,
    /// Area under the ROC curve; `None` when the split has a single class.
    pub auc: Option<f64>,
    /// `confusion_matrix[true][predicted]`.
    pub confusion_matrix: Vec<Vec<usize>>,
    /// Per-class rows.
    pub class_metrics: Vec<ClassSummary>,
    /// Highest-ranked features.
    pub top_features: Vec<ImportanceEntry>,
}

/// Everything needed to turn a raw feature array into a model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessing {
    /// Timesteps every array is truncated or padded to.
    pub target_length: usize,
    /// Columns per timestep.
    pub feature_dim: usize,
    /// Scaler fit on the training split.
    pub scaler: StandardScaler,
}

impl Preprocessing {
    /// Read a preprocessing JSON written by [`ArtifactWriter::write_preprocessing`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
    /// | [`IoError::SerializeJson`] | Content is not valid preprocessing JSON |
    pub fn load(path: &Path) -> Result<Self, IoError> {
        let file = fs::File::open(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| IoError::SerializeJson {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[derive(Serialize)]
struct ImportanceRow {
    rank: usize,
    index: usize,
    importance: f64,
}

/// Writes run artifacts to the locations in [`ArtifactPaths`].
///
/// Parent directories are created on first write.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    paths: ArtifactPaths,
}

impl ArtifactWriter {
    /// Create a writer for the given artifact locations.
    #[must_use]
    pub fn new(paths: ArtifactPaths) -> Self {
        Self { paths }
    }

    /// Return the artifact locations.
    #[must_use]
    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Return the path the model should be saved to.
    ///
    /// Does not write anything; the classifier crate owns the model format.
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.paths.model
    }

    /// Write the importance table with header `rank,index,importance`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::OutputDirCreate`] | Parent directory cannot be created |
    /// | [`IoError::WriteFile`] | File cannot be created or written |
    #[instrument(skip_all, fields(path = %self.paths.importance_csv.display(), n = features.len()))]
    pub fn write_importances(&self, features: &[ImportanceEntry]) -> Result<(), IoError> {
        let path = &self.paths.importance_csv;
        let file = create_file(path)?;
        let write_error = |e: csv::Error| IoError::WriteFile {
            path: path.clone(),
            source: e.into(),
        };

        let mut wtr = csv::Writer::from_writer(file);
        for f in features {
            wtr.serialize(ImportanceRow {
                rank: f.rank,
                index: f.index,
                importance: f.importance,
            })
            .map_err(write_error)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!("feature importances written");
        Ok(())
    }

    /// Write the evaluation summary as pretty JSON.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::OutputDirCreate`] | Parent directory cannot be created |
    /// | [`IoError::WriteFile`] | File cannot be created |
    /// | [`IoError::SerializeJson`] | Encoding or writing failed |
    #[instrument(skip_all, fields(path = %self.paths.evaluation_json.display()))]
    pub fn write_evaluation(&self, summary: &EvaluationSummary) -> Result<(), IoError> {
        write_json(&self.paths.evaluation_json, summary)?;
        info!("evaluation summary written");
        Ok(())
    }

    /// Write target length, feature dim and scaler statistics as JSON.
    ///
    /// # Errors
    ///
    /// Same as [`ArtifactWriter::write_evaluation`].
    #[instrument(skip_all, fields(path = %self.paths.preprocessing_json.display()))]
    pub fn write_preprocessing(
        &self,
        target_length: usize,
        feature_dim: usize,
        scaler: &StandardScaler,
    ) -> Result<(), IoError> {
        let preprocessing = Preprocessing {
            target_length,
            feature_dim,
            scaler: scaler.clone(),
        };
        write_json(&self.paths.preprocessing_json, &preprocessing)?;
        info!(target_length, feature_dim, "preprocessing written");
        Ok(())
    }

    /// Render the ROC curve `(fpr, tpr)` points to a PNG whose legend shows `auc`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::OutputDirCreate`] | Parent directory cannot be created |
    /// | [`IoError::WritePlot`] | Encoding or saving the image failed |
    #[instrument(skip_all, fields(path = %self.paths.roc_plot.display(), n_points = points.len()))]
    pub fn write_roc_plot(&self, points: &[(f64, f64)], auc: f64) -> Result<(), IoError> {
        let path = &self.paths.roc_plot;
        ensure_parent(path)?;
        render_roc(points, auc)
            .save(path)
            .map_err(|e| IoError::WritePlot {
                path: path.clone(),
                source: e,
            })?;
        info!("ROC plot written");
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<(), IoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| IoError::OutputDirCreate {
            path: parent.to_path_buf(),
            source: e,
        })?;
        debug!(dir = %parent.display(), "output directory ready");
    }
    Ok(())
}

fn create_file(path: &Path) -> Result<BufWriter<fs::File>, IoError> {
    ensure_parent(path)?;
    let file = fs::File::create(path).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(BufWriter::new(file))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), IoError> {
    let file = create_file(path)?;
    serde_json::to_writer_pretty(file, value).map_err(|e| IoError::SerializeJson {
        path: path.to_path_buf(),
        source: e,
    })
}
