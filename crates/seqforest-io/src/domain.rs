//! Domain types for seqforest-io.

use std::path::PathBuf;

/// Name of flattened feature `index` for arrays with `feature_dim` columns.
///
/// Flattening is row-major, so index `i` is timestep `i / feature_dim`,
/// dimension `i % feature_dim`.
#[must_use]
pub fn feature_name(index: usize, feature_dim: usize) -> String {
    let dim = feature_dim.max(1);
    format!("t{}_d{}", index / dim, index % dim)
}

/// A loaded, length-normalized split.
///
/// `features[i]`, `labels[i]`, `weights[i]` and `row_indices[i]` describe
/// the same manifest row. Rows whose feature file was missing are absent
/// and their resolved paths are listed in `skipped`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Flattened feature vectors, each `target_length * feature_dim` long.
    pub features: Vec<Vec<f64>>,
    /// Class label per row.
    pub labels: Vec<usize>,
    /// Example weight per row (1.0 when the manifest has no weight column).
    pub weights: Vec<f64>,
    /// Zero-based manifest data-row index of each kept row.
    pub row_indices: Vec<usize>,
    /// Resolved feature paths that did not exist.
    pub skipped: Vec<PathBuf>,
    /// Number of timesteps every array was truncated or padded to.
    pub target_length: usize,
    /// Columns per timestep; 0 when no row was loaded.
    pub feature_dim: usize,
}

impl Dataset {
    /// Return the number of loaded rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Return `true` if no row was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Return the flattened vector width.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.target_length * self.feature_dim
    }

    /// Return `t{step}_d{dim}` names for every flattened column.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        (0..self.n_features())
            .map(|i| feature_name(i, self.feature_dim))
            .collect()
    }

    /// Count rows per label, indexed by label.
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        let n = self.labels.iter().max().map_or(0, |&m| m + 1);
        let mut counts = vec![0usize; n];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_name_maps_flat_index() {
        assert_eq!(feature_name(0, 3), "t0_d0");
        assert_eq!(feature_name(5, 3), "t1_d2");
        assert_eq!(feature_name(6, 3), "t2_d0");
    }

    #[test]
    fn feature_names_cover_every_column() {
        let ds = Dataset {
            target_length: 2,
            feature_dim: 2,
            ..Dataset::default()
        };
        assert_eq!(ds.feature_names(), vec!["t0_d0", "t0_d1", "t1_d0", "t1_d1"]);
    }

    #[test]
    fn class_counts_by_label() {
        let ds = Dataset {
            labels: vec![1, 0, 1, 1],
            ..Dataset::default()
        };
        assert_eq!(ds.class_counts(), vec![1, 3]);
        assert!(Dataset::default().class_counts().is_empty());
    }
}
