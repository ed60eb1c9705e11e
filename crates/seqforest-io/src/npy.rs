//! `.npy` feature array loading and length normalization.

use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2, s};
use ndarray_npy::{ReadNpyError, ReadNpyExt};

use crate::IoError;

/// Resolve a manifest cell to `feature_dir/<base name of cell>`.
///
/// Returns `None` for a cell with no file name component (e.g. empty).
#[must_use]
pub fn resolve_feature_path(feature_dir: &Path, cell: &str) -> Option<PathBuf> {
    Path::new(cell.trim())
        .file_name()
        .map(|name| feature_dir.join(name))
}

/// Load a 2-D `(sequence_length, feature_dim)` array stored as f64 or f32.
///
/// # Errors
///
/// Returns [`IoError::FeatureArray`] when the file cannot be read, is not
/// a valid `.npy`, is not 2-D, or holds another element type.
pub fn load_feature_array(path: &Path) -> Result<Array2<f64>, IoError> {
    let bytes = std::fs::read(path).map_err(|e| feature_error(path, e))?;
    match Array2::<f64>::read_npy(bytes.as_slice()) {
        Ok(array) => Ok(array),
        Err(ReadNpyError::WrongDescriptor(_)) => Array2::<f32>::read_npy(bytes.as_slice())
            .map(|a| a.mapv(f64::from))
            .map_err(|e| feature_error(path, e)),
        Err(e) => Err(feature_error(path, e)),
    }
}

fn feature_error(path: &Path, e: impl std::fmt::Display) -> IoError {
    IoError::FeatureArray {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Truncate or zero-pad `array` to `target_length` rows and flatten row-major.
///
/// The result always has `target_length * array.ncols()` values: the first
/// `min(len, target_length)` rows in order, then zeros.
#[must_use]
pub fn fit_to_length(array: ArrayView2<'_, f64>, target_length: usize) -> Vec<f64> {
    let keep = array.nrows().min(target_length);
    let mut flat: Vec<f64> = array.slice(s![..keep, ..]).iter().copied().collect();
    flat.resize(target_length * array.ncols(), 0.0);
    flat
}
