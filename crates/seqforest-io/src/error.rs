//! I/O error types for seqforest-io.

use std::path::PathBuf;

/// Errors from manifest parsing, feature loading, scaling, and artifact writing.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when a manifest does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a required column is absent from the manifest header.
    #[error("column \"{column}\" missing from header of {path}")]
    MissingColumn {
        /// Path to the manifest.
        path: PathBuf,
        /// The column that was looked up.
        column: String,
    },

    /// Returned when a label cell is not an integer in `0..=MAX_LABEL`.
    #[error("invalid label \"{raw}\" in {path}: row {row_index}")]
    InvalidLabel {
        /// Path to the manifest.
        path: PathBuf,
        /// Zero-based data row index (excluding header).
        row_index: usize,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when a weight cell is not a finite float.
    #[error("invalid example weight \"{raw}\" in {path}: row {row_index}")]
    InvalidWeight {
        /// Path to the manifest.
        path: PathBuf,
        /// Zero-based data row index (excluding header).
        row_index: usize,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when a feature file cannot be decoded as a 2-D f64/f32 array.
    #[error("invalid feature array {path}: {reason}")]
    FeatureArray {
        /// Path to the `.npy` file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Returned when feature arrays in one dataset disagree on their second dimension.
    #[error("feature array {path} has feature_dim {got}, expected {expected}")]
    FeatureDimMismatch {
        /// Path to the offending `.npy` file.
        path: PathBuf,
        /// Dimension established by earlier rows.
        expected: usize,
        /// Dimension of this file.
        got: usize,
    },

    /// Returned when loading is attempted without a target sequence length.
    #[error("target sequence length must be provided to load {path}")]
    MissingTargetLength {
        /// Manifest that was about to be loaded.
        path: PathBuf,
    },

    /// Returned when an operation needs at least one row and got none.
    #[error("empty dataset: {context}")]
    EmptyDataset {
        /// Where the empty input was found.
        context: String,
    },

    /// Returned when a scaler is applied to a matrix of a different width.
    #[error("scaler was fit on {expected} columns, got {got}")]
    ScalerDimMismatch {
        /// Column count at fit time.
        expected: usize,
        /// Column count of the input.
        got: usize,
    },

    /// Returned when an artifact's parent directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact cannot be encoded as JSON.
    #[error("cannot encode JSON for {path}")]
    SerializeJson {
        /// Path that was being written.
        path: PathBuf,
        /// Underlying serde_json error.
        source: serde_json::Error,
    },

    /// Returned when the ROC image cannot be encoded or saved.
    #[error("cannot write plot {path}")]
    WritePlot {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying image error.
        source: image::ImageError,
    },
}
