use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{info, warn};

use seqforest_io::{
    ArtifactPaths, ArtifactWriter, ClassSummary, EvaluationSummary, ImportanceEntry, SplitPaths,
    load_eval_data, load_test_data, load_train_data,
};
use seqforest_rf::{
    ClassificationReport, RandomForestConfig, RankedFeature, ThresholdEvaluation,
    compute_class_weight_balanced, evaluate_with_threshold, roc_curve,
};

#[derive(Parser)]
#[command(name = "seqforest")]
#[command(about = "Train and evaluate a Random Forest on length-normalized sequence features")]
#[command(version)]
struct Cli {
    /// Manifest scanned for the longest sequence (sets the target length)
    #[arg(long, default_value = "data/metadata/label_downsampled.csv")]
    length_manifest: PathBuf,

    /// Training split manifest
    #[arg(long, default_value = "data/metadata/train_downsample.csv")]
    train_manifest: PathBuf,

    /// Evaluation split manifest
    #[arg(long, default_value = "data/metadata/eval_downsample.csv")]
    eval_manifest: PathBuf,

    /// Test split manifest (read only with --evaluate-test)
    #[arg(long, default_value = "data/metadata/test_downsample.csv")]
    test_manifest: PathBuf,

    /// Directory holding the per-sample .npy feature files
    #[arg(long, default_value = "data/downsampled_features")]
    feature_dir: PathBuf,

    /// Root for the plot, importance, evaluation and model artifacts
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Maximum tree depth (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Predict the positive class iff its probability is above this value
    #[arg(long, default_value_t = 0.5)]
    threshold: f64,

    /// Number of ranked features to print and write
    #[arg(long, default_value_t = 20)]
    top_features: usize,

    /// Also evaluate the test split
    #[arg(long)]
    evaluate_test: bool,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long)]
    verbose: bool,

    /// Suppress all logging except errors
    #[arg(long)]
    quiet: bool,

    /// Number of threads for tree training and batch prediction
    #[arg(long, default_value_t = 1)]
    threads: usize,
}

impl Cli {
    fn split_paths(&self) -> SplitPaths {
        SplitPaths {
            length_manifest: self.length_manifest.clone(),
            train_manifest: self.train_manifest.clone(),
            eval_manifest: self.eval_manifest.clone(),
            test_manifest: self.test_manifest.clone(),
            feature_dir: self.feature_dir.clone(),
            ..SplitPaths::default()
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.threads)
        .build_global()
        .context("failed to configure thread pool")?;
    info!(threads = cli.threads, "thread pool configured");

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let paths = cli.split_paths();

    // 1. Target length
    let target_length = paths
        .target_length()
        .context("failed to compute target sequence length")?;
    if target_length == 0 {
        bail!(
            "no feature files from {} were found in {}",
            paths.length_manifest.display(),
            paths.feature_dir.display()
        );
    }
    info!(target_length, "target sequence length");

    // 2. Train and eval splits, scaled with the training statistics
    let (train, scaler) =
        load_train_data(&paths, Some(target_length)).context("failed to load training split")?;
    let eval = load_eval_data(&paths, Some(target_length), Some(&scaler))
        .context("failed to load evaluation split")?;
    if eval.is_empty() {
        bail!("no evaluation rows loaded from {}", paths.eval_manifest.display());
    }
    info!(
        n_train = train.len(),
        n_eval = eval.len(),
        class_counts = ?train.class_counts(),
        "splits loaded"
    );

    // 3. Fit
    let class_weights = compute_class_weight_balanced(&train.labels)
        .context("failed to compute class weights")?;
    let config = RandomForestConfig::new(cli.n_trees)?
        .with_max_depth(cli.max_depth)
        .with_seed(cli.seed)
        .with_class_weights(class_weights);
    let result = config
        .fit_weighted(
            &train.features,
            &train.labels,
            &train.weights,
            &train.feature_names(),
        )
        .context("training failed")?;
    let forest = result.forest();

    let train_predictions = forest
        .predict_batch(&train.features)
        .context("prediction on training split failed")?;
    let train_report = ClassificationReport::new(&train.labels, &train_predictions)?;
    println!("Training set classification report:\n{train_report}");

    // 4. Evaluate
    let evaluation = evaluate_with_threshold(forest, &eval.features, &eval.labels, cli.threshold)
        .context("evaluation failed")?;
    println!("{evaluation}");

    let writer = ArtifactWriter::new(ArtifactPaths::under(&cli.output_dir));

    let auc = match roc_curve(&eval.labels, &evaluation.scores) {
        Ok(roc) => {
            let auc = roc.auc();
            println!("AUC: {auc:.4}");
            writer
                .write_roc_plot(&roc.points(), auc)
                .context("failed to write ROC plot")?;
            Some(auc)
        }
        Err(e) => {
            warn!(error = %e, "ROC curve undefined, skipping plot");
            None
        }
    };

    // 5. Importances
    let top = result.top_importances(cli.top_features);
    println!("Top {} features:", top.len());
    for f in top {
        println!("{:>4}  {:<12} {:.6}", f.rank, f.name, f.importance);
    }
    let top_entries = importance_entries(top);
    writer
        .write_importances(&top_entries)
        .context("failed to write feature importances")?;

    // 6. Model and preprocessing
    forest
        .save(writer.model_path())
        .context("failed to save model")?;
    info!(path = %writer.model_path().display(), "model saved");
    writer
        .write_preprocessing(target_length, train.feature_dim, &scaler)
        .context("failed to write preprocessing")?;

    writer
        .write_evaluation(&evaluation_summary(
            &evaluation,
            auc,
            train.len(),
            top_entries,
        ))
        .context("failed to write evaluation summary")?;

    // 7. Optional test split
    if cli.evaluate_test {
        let test = load_test_data(&paths, Some(target_length), Some(&scaler))
            .context("failed to load test split")?;
        if test.is_empty() {
            warn!(manifest = %paths.test_manifest.display(), "no test rows loaded, skipping");
        } else {
            let test_eval =
                evaluate_with_threshold(forest, &test.features, &test.labels, cli.threshold)
                    .context("test evaluation failed")?;
            println!("Test set:\n{test_eval}");
        }
    }

    Ok(())
}

fn importance_entries(features: &[RankedFeature]) -> Vec<ImportanceEntry> {
    features
        .iter()
        .map(|f| ImportanceEntry {
            rank: f.rank,
            index: f.index,
            name: f.name.clone(),
            importance: f.importance,
        })
        .collect()
}

fn evaluation_summary(
    evaluation: &ThresholdEvaluation,
    auc: Option<f64>,
    n_train: usize,
    top_features: Vec<ImportanceEntry>,
) -> EvaluationSummary {
    EvaluationSummary {
        threshold: evaluation.threshold,
        n_train,
        n_eval: evaluation.predictions.len(),
        accuracy: evaluation.accuracy,
        precision: evaluation.precision,
        recall: evaluation.recall,
        f1: evaluation.f1,
        auc,
        confusion_matrix: evaluation.confusion.as_rows().to_vec(),
        class_metrics: evaluation
            .report
            .rows()
            .iter()
            .map(|m| ClassSummary {
                class: m.class,
                precision: m.precision,
                recall: m.recall,
                f1: m.f1,
                support: m.support,
            })
            .collect(),
        top_features,
    }
}
