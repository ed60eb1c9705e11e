//! Per-column standardization fit on the training split.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::IoError;

/// Scales below this are treated as zero variance.
const MIN_SCALE: f64 = 10.0 * f64::EPSILON;

/// Per-column `(x - mean) / scale` transform.
///
/// `scale` is the population standard deviation; a constant column gets
/// scale 1.0 so it maps to zero instead of NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    /// Learn column means and scales from a row-major matrix.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::EmptyDataset`] | `features` has no rows |
    /// | [`IoError::ScalerDimMismatch`] | rows differ in width |
    pub fn fit(features: &[Vec<f64>]) -> Result<Self, IoError> {
        let matrix = to_matrix(features)?;
        let n_cols = matrix.ncols();
        let mean = matrix
            .mean_axis(Axis(0))
            .map_or_else(|| vec![0.0; n_cols], |m| m.to_vec());
        let scale: Vec<f64> = matrix
            .var_axis(Axis(0), 0.0)
            .iter()
            .map(|&v| {
                let s = v.sqrt();
                if s < MIN_SCALE { 1.0 } else { s }
            })
            .collect();
        debug!(n_rows = matrix.nrows(), n_cols, "scaler fit");
        Ok(Self { mean, scale })
    }

    /// Fit on `features` and standardize them in place.
    ///
    /// # Errors
    ///
    /// Same as [`StandardScaler::fit`].
    pub fn fit_transform(features: &mut [Vec<f64>]) -> Result<Self, IoError> {
        let scaler = Self::fit(features)?;
        scaler.transform(features)?;
        Ok(scaler)
    }

    /// Standardize `features` in place with the fitted statistics.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::ScalerDimMismatch`] when a row's width differs from
    /// the fitted column count.
    pub fn transform(&self, features: &mut [Vec<f64>]) -> Result<(), IoError> {
        for row in features.iter_mut() {
            if row.len() != self.mean.len() {
                return Err(IoError::ScalerDimMismatch {
                    expected: self.mean.len(),
                    got: row.len(),
                });
            }
            for ((x, m), s) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
                *x = (*x - m) / s;
            }
        }
        Ok(())
    }

    /// Column means.
    #[must_use]
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Column scales.
    #[must_use]
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Number of columns the scaler was fit on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }
}

fn to_matrix(features: &[Vec<f64>]) -> Result<Array2<f64>, IoError> {
    let n_cols = features
        .first()
        .ok_or_else(|| IoError::EmptyDataset {
            context: "cannot fit scaler on zero rows".to_string(),
        })?
        .len();
    let mut flat = Vec::with_capacity(features.len() * n_cols);
    for row in features {
        if row.len() != n_cols {
            return Err(IoError::ScalerDimMismatch {
                expected: n_cols,
                got: row.len(),
            });
        }
        flat.extend_from_slice(row);
    }
    Array2::from_shape_vec((features.len(), n_cols), flat).map_err(|e| IoError::EmptyDataset {
        context: e.to_string(),
    })
}
