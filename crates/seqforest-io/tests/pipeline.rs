//! End-to-end: manifests + .npy files -> target length -> scaled splits -> artifacts.

use std::fs;
use std::path::Path;

use ndarray::Array2;
use ndarray_npy::WriteNpyExt;
use seqforest_io::{
    ArtifactPaths, ArtifactWriter, EvaluationSummary, ImportanceEntry, Preprocessing, SplitPaths,
    load_eval_data, load_test_data, load_train_data,
};
use tempfile::TempDir;

/// Write a `(rows, 2)` array whose row `r` is `[base + r, -base]`.
fn write_sample(dir: &Path, name: &str, rows: usize, base: f64) {
    let a = Array2::from_shape_fn((rows, 2), |(r, c)| {
        if c == 0 { base + r as f64 } else { -base }
    });
    a.write_npy(fs::File::create(dir.join(name)).unwrap())
        .unwrap();
}

/// Lay out a small experiment under `root` and return its paths.
fn experiment(root: &Path) -> SplitPaths {
    let features = root.join("features");
    let meta = root.join("metadata");
    fs::create_dir_all(&features).unwrap();
    fs::create_dir_all(&meta).unwrap();

    write_sample(&features, "a.npy", 2, 0.0);
    write_sample(&features, "b.npy", 4, 1.0);
    write_sample(&features, "c.npy", 3, 2.0);
    write_sample(&features, "d.npy", 1, 3.0);
    write_sample(&features, "e.npy", 5, 4.0);

    fs::write(
        meta.join("lengths.csv"),
        "feature_file,class\n/raw/a.npy,0\n/raw/b.npy,1\n/raw/c.npy,0\n/raw/d.npy,1\n",
    )
    .unwrap();
    fs::write(
        meta.join("train.csv"),
        "contextual_feature_file,class,example_weight\n\
         x/a.npy,0,1.0\nx/b.npy,1,3.0\nx/missing.npy,1,1.0\nx/c.npy,0,1.0\n",
    )
    .unwrap();
    fs::write(
        meta.join("eval.csv"),
        "contextual_feature_file,class\nd.npy,1\na.npy,0\n",
    )
    .unwrap();
    fs::write(meta.join("test.csv"), "contextual_feature_file,class\ne.npy,1\n").unwrap();

    SplitPaths {
        length_manifest: meta.join("lengths.csv"),
        train_manifest: meta.join("train.csv"),
        eval_manifest: meta.join("eval.csv"),
        test_manifest: meta.join("test.csv"),
        feature_dir: features,
        ..SplitPaths::default()
    }
}

#[test]
fn split_loading_round_trip() {
    let dir = TempDir::new().unwrap();
    let paths = experiment(dir.path());

    // e.npy (5 rows) is not in the length manifest.
    let target_length = paths.target_length().unwrap();
    assert_eq!(target_length, 4);

    let (train, scaler) = load_train_data(&paths, Some(target_length)).unwrap();
    assert_eq!(train.len(), 3);
    assert_eq!(train.labels, vec![0, 1, 0]);
    assert_eq!(train.weights, vec![1.0, 3.0, 1.0]);
    assert_eq!(train.row_indices, vec![0, 1, 3]);
    assert_eq!(train.skipped.len(), 1);
    assert_eq!(train.feature_dim, 2);
    assert_eq!(train.n_features(), 8);
    assert_eq!(scaler.n_features(), 8);
    assert!(train.features.iter().all(|row| row.len() == 8));

    // Every training column is centred after scaling.
    for c in 0..8 {
        let mean: f64 = train.features.iter().map(|r| r[c]).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12, "column {c} mean {mean}");
    }

    let eval = load_eval_data(&paths, Some(target_length), Some(&scaler)).unwrap();
    assert_eq!(eval.labels, vec![1, 0]);
    assert!((eval.weights[0] - 1.0).abs() < f64::EPSILON);

    // Unscaled test rows are truncated to 4 steps: 4,-4,5,-4,6,-4,7,-4.
    let test = load_test_data(&paths, Some(target_length), None).unwrap();
    assert_eq!(
        test.features[0],
        vec![4.0, -4.0, 5.0, -4.0, 6.0, -4.0, 7.0, -4.0]
    );
    assert_eq!(test.feature_names()[7], "t3_d1");
}

#[test]
fn artifacts_written_under_output_root() {
    let dir = TempDir::new().unwrap();
    let paths = experiment(dir.path());
    let target_length = paths.target_length().unwrap();
    let (train, scaler) = load_train_data(&paths, Some(target_length)).unwrap();

    let out = dir.path().join("out");
    let writer = ArtifactWriter::new(ArtifactPaths::under(&out));

    let top = vec![ImportanceEntry {
        rank: 1,
        index: 2,
        name: train.feature_names()[2].clone(),
        importance: 1.0,
    }];
    writer.write_importances(&top).unwrap();
    writer
        .write_roc_plot(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)], 1.0)
        .unwrap();
    writer
        .write_preprocessing(target_length, train.feature_dim, &scaler)
        .unwrap();
    writer
        .write_evaluation(&EvaluationSummary {
            threshold: 0.5,
            n_train: train.len(),
            n_eval: 2,
            accuracy: 1.0,
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
            auc: Some(1.0),
            confusion_matrix: vec![vec![1, 0], vec![0, 1]],
            class_metrics: vec![],
            top_features: top,
        })
        .unwrap();

    let csv = fs::read_to_string(out.join("data/visualization/feature_importance_downsampled.csv"))
        .unwrap();
    assert_eq!(csv.lines().next(), Some("rank,index,importance"));
    assert!(out.join("data/visualization/roc_auc_curve_RD_DOWN.png").is_file());

    let pre = Preprocessing::load(&out.join("models/baseline_model/preprocessing.json")).unwrap();
    assert_eq!(pre.target_length, 4);
    assert_eq!(pre.scaler, scaler);

    let json: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(out.join("data/visualization/evaluation_downsampled.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["n_train"], 3);
    assert_eq!(json["top_features"][0]["name"], "t1_d0");

    assert_eq!(
        writer.model_path(),
        out.join("models/baseline_model/best_rf_model.bin")
    );
}
