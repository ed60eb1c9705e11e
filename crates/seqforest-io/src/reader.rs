//! Manifest CSV reader and per-sample feature loading.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::IoError;
use crate::domain::Dataset;
use crate::npy::{fit_to_length, load_feature_array, resolve_feature_path};

/// Default column holding the per-sample feature file.
pub const DEFAULT_FEATURE_COLUMN: &str = "feature_file";
/// Default column holding the class label.
pub const DEFAULT_LABEL_COLUMN: &str = "class";
/// Default column holding the example weight.
pub const DEFAULT_WEIGHT_COLUMN: &str = "example_weight";
/// Largest accepted class label.
pub const MAX_LABEL: usize = 1023;

/// A fully parsed manifest: header plus every data record.
struct Manifest {
    path: PathBuf,
    headers: csv::StringRecord,
    records: Vec<csv::StringRecord>,
}

impl Manifest {
    fn open(path: &Path) -> Result<Self, IoError> {
        let file = std::fs::File::open(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        let csv_error = |e: csv::Error| IoError::CsvParse {
            path: path.to_path_buf(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        };

        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers = rdr.headers().map_err(csv_error)?.clone();
        let records = rdr
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_error)?;
        debug!(n_columns = headers.len(), n_rows = records.len(), "read manifest");

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            records,
        })
    }

    fn optional_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    fn column(&self, name: &str) -> Result<usize, IoError> {
        self.optional_column(name)
            .ok_or_else(|| IoError::MissingColumn {
                path: self.path.clone(),
                column: name.to_string(),
            })
    }

    fn cell<'a>(record: &'a csv::StringRecord, col: usize) -> &'a str {
        record.get(col).unwrap_or("").trim()
    }
}

/// Longest first dimension over every resolvable feature file in a manifest.
///
/// Cells are resolved by base name inside `feature_dir`; rows whose file is
/// missing are logged and skipped. Returns 0 when nothing resolved.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | Manifest doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | `feature_column` is not in the header |
/// | [`IoError::FeatureArray`] | A present file is not a valid 2-D array |
#[instrument(skip_all, fields(manifest = %manifest_path.display(), column = feature_column))]
pub fn max_sequence_length(
    manifest_path: &Path,
    feature_dir: &Path,
    feature_column: &str,
) -> Result<usize, IoError> {
    let manifest = Manifest::open(manifest_path)?;
    let col = manifest.column(feature_column)?;

    let mut max_len = 0usize;
    let mut n_resolved = 0usize;
    for record in &manifest.records {
        let cell = Manifest::cell(record, col);
        let Some(path) = resolve_feature_path(feature_dir, cell).filter(|p| p.exists()) else {
            warn!(file = cell, "feature file not found, skipping");
            continue;
        };
        let array = load_feature_array(&path)?;
        max_len = max_len.max(array.nrows());
        n_resolved += 1;
    }

    info!(max_len, n_resolved, "max sequence length computed");
    Ok(max_len)
}

/// Loads one manifest into a length-normalized [`Dataset`].
///
/// Construct via [`ManifestLoader::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter        | Default            |
/// |------------------|--------------------|
/// | `feature_column` | `feature_file`     |
/// | `label_column`   | `class`            |
/// | `weight_column`  | `example_weight`   |
/// | `target_length`  | unset (required)   |
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    manifest_path: PathBuf,
    feature_dir: PathBuf,
    feature_column: String,
    label_column: String,
    weight_column: String,
    target_length: Option<usize>,
}

impl ManifestLoader {
    /// Create a loader for `manifest_path` with feature files under `feature_dir`.
    pub fn new(manifest_path: impl Into<PathBuf>, feature_dir: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            feature_dir: feature_dir.into(),
            feature_column: DEFAULT_FEATURE_COLUMN.to_string(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            weight_column: DEFAULT_WEIGHT_COLUMN.to_string(),
            target_length: None,
        }
    }

    /// Set the column holding feature file paths.
    #[must_use]
    pub fn with_feature_column(mut self, column: impl Into<String>) -> Self {
        self.feature_column = column.into();
        self
    }

    /// Set the column holding class labels.
    #[must_use]
    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = column.into();
        self
    }

    /// Set the optional column holding example weights.
    #[must_use]
    pub fn with_weight_column(mut self, column: impl Into<String>) -> Self {
        self.weight_column = column.into();
        self
    }

    /// Set the number of timesteps every array is truncated or padded to.
    #[must_use]
    pub fn with_target_length(mut self, target_length: usize) -> Self {
        self.target_length = Some(target_length);
        self
    }

    /// Return the manifest path.
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Read the manifest and every resolvable feature file.
    ///
    /// Missing feature files are warned about and skipped. A manifest without
    /// the weight column yields weight 1.0 for every row, with one warning.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::MissingTargetLength`] | No target length was set |
    /// | [`IoError::FileNotFound`] | Manifest doesn't exist or is unreadable |
    /// | [`IoError::CsvParse`] | Malformed CSV record |
    /// | [`IoError::MissingColumn`] | Feature or label column not in the header |
    /// | [`IoError::InvalidLabel`] | Label is not an integer in `0..=MAX_LABEL` |
    /// | [`IoError::InvalidWeight`] | Weight is not a finite float |
    /// | [`IoError::FeatureArray`] | A present file is not a valid 2-D array |
    /// | [`IoError::FeatureDimMismatch`] | Arrays disagree on `feature_dim` |
    #[instrument(skip(self), fields(manifest = %self.manifest_path.display()))]
    pub fn load(&self) -> Result<Dataset, IoError> {
        let target_length = self.target_length.ok_or_else(|| IoError::MissingTargetLength {
            path: self.manifest_path.clone(),
        })?;

        let manifest = Manifest::open(&self.manifest_path)?;
        let feature_col = manifest.column(&self.feature_column)?;
        let label_col = manifest.column(&self.label_column)?;
        let weight_col = manifest.optional_column(&self.weight_column);
        if weight_col.is_none() {
            warn!(
                column = %self.weight_column,
                "weight column not found, using weight 1.0 for every row"
            );
        }

        let mut dataset = Dataset {
            target_length,
            ..Dataset::default()
        };

        for (row_index, record) in manifest.records.iter().enumerate() {
            let cell = Manifest::cell(record, feature_col);
            let resolved = resolve_feature_path(&self.feature_dir, cell);
            let path = match resolved {
                Some(p) if p.exists() => p,
                other => {
                    warn!(row_index, file = cell, "feature file not found, skipping");
                    dataset
                        .skipped
                        .push(other.unwrap_or_else(|| self.feature_dir.join(cell)));
                    continue;
                }
            };

            let raw_label = Manifest::cell(record, label_col);
            let label = raw_label
                .parse::<usize>()
                .ok()
                .filter(|&l| l <= MAX_LABEL)
                .ok_or_else(|| IoError::InvalidLabel {
                    path: self.manifest_path.clone(),
                    row_index,
                    raw: raw_label.to_string(),
                })?;

            let weight = match weight_col {
                Some(col) => {
                    let raw = Manifest::cell(record, col);
                    raw.parse::<f64>()
                        .ok()
                        .filter(|w| w.is_finite())
                        .ok_or_else(|| IoError::InvalidWeight {
                            path: self.manifest_path.clone(),
                            row_index,
                            raw: raw.to_string(),
                        })?
                }
                None => 1.0,
            };

            let array = load_feature_array(&path)?;
            if dataset.features.is_empty() {
                dataset.feature_dim = array.ncols();
            } else if array.ncols() != dataset.feature_dim {
                return Err(IoError::FeatureDimMismatch {
                    path,
                    expected: dataset.feature_dim,
                    got: array.ncols(),
                });
            }

            dataset
                .features
                .push(fit_to_length(array.view(), target_length));
            dataset.labels.push(label);
            dataset.weights.push(weight);
            dataset.row_indices.push(row_index);
        }

        info!(
            n_rows = dataset.len(),
            n_skipped = dataset.skipped.len(),
            target_length,
            feature_dim = dataset.feature_dim,
            "manifest loaded"
        );

        Ok(dataset)
    }
}

/// Load a manifest in one call; see [`ManifestLoader::load`].
///
/// # Errors
///
/// Same as [`ManifestLoader::load`]; `None` for `target_length` is
/// [`IoError::MissingTargetLength`].
pub fn load_data(
    manifest_path: &Path,
    feature_dir: &Path,
    feature_column: &str,
    label_column: &str,
    target_length: Option<usize>,
    weight_column: &str,
) -> Result<Dataset, IoError> {
    let mut loader = ManifestLoader::new(manifest_path, feature_dir)
        .with_feature_column(feature_column)
        .with_label_column(label_column)
        .with_weight_column(weight_column);
    if let Some(n) = target_length {
        loader = loader.with_target_length(n);
    }
    loader.load()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use ndarray::Array2;
    use ndarray_npy::WriteNpyExt;
    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    /// Write a `(rows, dim)` array filled with `fill` as `dir/name`.
    fn write_npy(dir: &Path, name: &str, rows: usize, dim: usize, fill: f64) {
        let a = Array2::<f64>::from_elem((rows, dim), fill);
        a.write_npy(std::fs::File::create(dir.join(name)).unwrap())
            .unwrap();
    }

    #[test]
    fn max_length_over_present_files() {
        let dir = TempDir::new().unwrap();
        write_npy(dir.path(), "a.npy", 3, 2, 1.0);
        write_npy(dir.path(), "b.npy", 7, 2, 1.0);
        write_npy(dir.path(), "c.npy", 5, 2, 1.0);
        let csv = write_csv("feature_file,class\na.npy,0\nb.npy,1\nc.npy,0\nmissing.npy,1\n");
        let n = max_sequence_length(csv.path(), dir.path(), DEFAULT_FEATURE_COLUMN).unwrap();
        assert_eq!(n, 7);
    }

    #[test]
    fn max_length_zero_when_nothing_resolves() {
        let dir = TempDir::new().unwrap();
        let csv = write_csv("feature_file,class\nx.npy,0\n");
        let n = max_sequence_length(csv.path(), dir.path(), DEFAULT_FEATURE_COLUMN).unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn target_length_required() {
        let csv = write_csv("feature_file,class\n");
        let err = ManifestLoader::new(csv.path(), "unused").load().unwrap_err();
        assert!(matches!(err, IoError::MissingTargetLength { .. }));
    }

    #[test]
    fn missing_weight_column_defaults_to_one() {
        let dir = TempDir::new().unwrap();
        write_npy(dir.path(), "a.npy", 2, 1, 1.0);
        write_npy(dir.path(), "b.npy", 2, 1, 2.0);
        let csv = write_csv("feature_file,class\na.npy,0\nb.npy,1\n");
        let ds = ManifestLoader::new(csv.path(), dir.path())
            .with_target_length(2)
            .load()
            .unwrap();
        assert_eq!(ds.weights, vec![1.0, 1.0]);
        assert_eq!(ds.labels, vec![0, 1]);
    }

    #[test]
    fn weights_read_when_present() {
        let dir = TempDir::new().unwrap();
        write_npy(dir.path(), "a.npy", 1, 1, 1.0);
        let csv = write_csv("feature_file,class,example_weight\na.npy,1,2.5\n");
        let ds = ManifestLoader::new(csv.path(), dir.path())
            .with_target_length(1)
            .load()
            .unwrap();
        assert_eq!(ds.weights, vec![2.5]);
    }

    #[test]
    fn missing_file_is_skipped_and_recorded() {
        let dir = TempDir::new().unwrap();
        write_npy(dir.path(), "a.npy", 1, 2, 1.0);
        let csv = write_csv("feature_file,class\nmissing.npy,1\na.npy,0\n");
        let ds = ManifestLoader::new(csv.path(), dir.path())
            .with_target_length(1)
            .load()
            .unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.row_indices, vec![1]);
        assert_eq!(ds.skipped, vec![dir.path().join("missing.npy")]);
    }

    #[test]
    fn invalid_label_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_npy(dir.path(), "a.npy", 1, 1, 1.0);
        let csv = write_csv("feature_file,class\na.npy,yes\n");
        let err = ManifestLoader::new(csv.path(), dir.path())
            .with_target_length(1)
            .load()
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidLabel { row_index: 0, .. }));
    }

    #[test]
    fn non_finite_weight_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_npy(dir.path(), "a.npy", 1, 1, 1.0);
        let csv = write_csv("feature_file,class,example_weight\na.npy,0,inf\n");
        let err = ManifestLoader::new(csv.path(), dir.path())
            .with_target_length(1)
            .load()
            .unwrap_err();
        assert!(matches!(err, IoError::InvalidWeight { .. }));
    }

    #[test]
    fn oversized_label_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_npy(dir.path(), "a.npy", 1, 1, 1.0);
        write_npy(dir.path(), "b.npy", 1, 1, 1.0);
        let csv = write_csv("feature_file,class\na.npy,1023\nb.npy,1000000\n");
        let err = ManifestLoader::new(csv.path(), dir.path())
            .with_target_length(1)
            .load()
            .unwrap_err();
        assert!(matches!(
            err,
            IoError::InvalidLabel { row_index: 1, ref raw, .. } if raw == "1000000"
        ));
    }

    #[test]
    fn missing_label_column_is_fatal() {
        let csv = write_csv("feature_file,label\na.npy,0\n");
        let err = ManifestLoader::new(csv.path(), "unused")
            .with_target_length(1)
            .load()
            .unwrap_err();
        assert!(matches!(err, IoError::MissingColumn { ref column, .. } if column == "class"));
    }

    #[test]
    fn feature_dim_mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        write_npy(dir.path(), "a.npy", 2, 2, 1.0);
        write_npy(dir.path(), "b.npy", 2, 3, 1.0);
        let csv = write_csv("feature_file,class\na.npy,0\nb.npy,1\n");
        let err = ManifestLoader::new(csv.path(), dir.path())
            .with_target_length(2)
            .load()
            .unwrap_err();
        assert!(matches!(
            err,
            IoError::FeatureDimMismatch {
                expected: 2,
                got: 3,
                ..
            }
        ));
    }

    #[test]
    fn error_file_not_found() {
        let err = max_sequence_length(
            Path::new("/nonexistent/manifest.csv"),
            Path::new("."),
            DEFAULT_FEATURE_COLUMN,
        )
        .unwrap_err();
        assert!(matches!(err, IoError::FileNotFound { .. }));
    }

    #[test]
    fn ragged_row_is_csv_error() {
        let csv = write_csv("feature_file,class\na.npy,0,extra\n");
        let err = max_sequence_length(csv.path(), Path::new("."), DEFAULT_FEATURE_COLUMN)
            .unwrap_err();
        assert!(matches!(err, IoError::CsvParse { .. }));
    }
}
