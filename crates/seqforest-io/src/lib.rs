//! Manifest and `.npy` feature loading, standardization, and artifact writing
//! for the seqforest pipeline.

mod domain;
mod error;
mod npy;
mod plot;
mod reader;
mod scaler;
mod splits;
mod writer;

pub use domain::{Dataset, feature_name};
pub use error::IoError;
pub use npy::{fit_to_length, load_feature_array, resolve_feature_path};
pub use plot::{HEIGHT as PLOT_HEIGHT, WIDTH as PLOT_WIDTH, render_roc};
pub use reader::{
    DEFAULT_FEATURE_COLUMN, DEFAULT_LABEL_COLUMN, DEFAULT_WEIGHT_COLUMN, MAX_LABEL,
    ManifestLoader, load_data, max_sequence_length,
};
pub use scaler::StandardScaler;
pub use splits::{SPLIT_FEATURE_COLUMN, SplitPaths, load_eval_data, load_test_data, load_train_data};
pub use writer::{
    ArtifactPaths, ArtifactWriter, ClassSummary, EvaluationSummary, ImportanceEntry, Preprocessing,
};
