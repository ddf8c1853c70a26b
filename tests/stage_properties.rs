use ndarray::{array, Array2};

use strokebench::dataset::Dataset;
use strokebench::error::PipelineError;
use strokebench::feature_selection::{ImportanceSelector, SelectKBest};
use strokebench::metrics::{accuracy, confusion_matrix, f1_weighted, precision_weighted, recall_weighted};
use strokebench::model_selection::train_test_split;
use strokebench::models::GbmParams;
use strokebench::preprocessing::StandardScaler;
use strokebench::resampling::SmoteEnn;
use strokebench::tuner::{ParamGrid, RandomizedSearch};

fn two_cluster_matrix(per_class: usize, n_features: usize) -> (Array2<f32>, Vec<i32>) {
    let mut data = Vec::new();
    let mut y = Vec::new();
    for class in 0..2 {
        let center = if class == 0 { -2.0f32 } else { 2.0 };
        for i in 0..per_class {
            for j in 0..n_features {
                let base = if j % 2 == 0 { center } else { 0.0 };
                data.push(base + 0.01 * (i * n_features + j) as f32);
            }
            y.push(class as i32);
        }
    }
    let x = Array2::from_shape_vec((2 * per_class, n_features), data).expect("fixture shape");
    (x, y)
}

#[test]
fn deduplication_is_idempotent() {
    let mut dataset = Dataset {
        feature_names: vec!["a".into(), "b".into()],
        x: array![[1.0, 2.0], [1.0, 2.0], [3.0, 4.0], [1.0, 2.0]],
        labels: vec!["x".into(), "x".into(), "y".into(), "x".into()],
    };
    assert_eq!(dataset.dedup_rows(), 2);
    assert_eq!(dataset.n_samples(), 2);
    assert_eq!(dataset.dedup_rows(), 0);
}

#[test]
fn scaling_round_trips_within_tolerance() {
    let x = array![[1.0f32, 10.0], [2.0, 20.0], [3.0, 35.0], [4.0, 41.0]];
    let (scaler, scaled) = StandardScaler::fit_transform(&x).expect("fit failed");
    let restored = scaler.inverse_transform(&scaled).expect("inverse failed");
    for (a, b) in x.iter().zip(restored.iter()) {
        assert!((a - b).abs() < 1e-4, "{} vs {}", a, b);
    }
}

#[test]
fn zero_variance_column_fails_scaling() {
    let x = array![[1.0f32, 5.0], [2.0, 5.0], [3.0, 5.0]];
    let err = StandardScaler::fit(&x).unwrap_err();
    assert!(matches!(err, PipelineError::Value(_)));
}

#[test]
fn split_partitions_without_overlap() {
    let (x, y) = two_cluster_matrix(50, 4);
    let split = train_test_split(&x, &y, 0.2, 42).expect("split failed");

    assert_eq!(split.train_indices.len() + split.test_indices.len(), 100);
    for i in &split.test_indices {
        assert!(!split.train_indices.contains(i), "index {} on both sides", i);
    }

    // Stratification: each side keeps the overall 50/50 class balance.
    let train_ones = split.y_train.iter().filter(|&&l| l == 1).count();
    let test_ones = split.y_test.iter().filter(|&&l| l == 1).count();
    assert_eq!(train_ones * 2, split.y_train.len());
    assert_eq!(test_ones * 2, split.y_test.len());
}

#[test]
fn selection_is_deterministic_and_clamps() {
    let (x, y) = two_cluster_matrix(30, 6);

    let selector = ImportanceSelector::new(4, 42).with_params(GbmParams {
        n_estimators: 10,
        max_depth: 2,
        ..GbmParams::default()
    });
    let first = selector.fit(&x, &y).expect("selection failed");
    let second = selector.fit(&x, &y).expect("selection failed");
    assert_eq!(first, second);
    assert_eq!(first.len(), 4);

    // Counts above the available features keep every column.
    let oversized = SelectKBest::new(99).fit(&x, &y).expect("selection failed");
    assert_eq!(oversized.len(), 6);
}

#[test]
fn metrics_stay_in_bounds_and_confusion_rows_sum() {
    let y_true = vec![0, 0, 1, 1, 2, 2, 2];
    let y_pred = vec![0, 1, 1, 1, 2, 0, 2];

    for value in [
        accuracy(&y_true, &y_pred),
        precision_weighted(&y_true, &y_pred, 3),
        recall_weighted(&y_true, &y_pred, 3),
        f1_weighted(&y_true, &y_pred, 3),
    ] {
        assert!((0.0..=1.0).contains(&value), "metric out of range: {}", value);
    }

    let confusion = confusion_matrix(&y_true, &y_pred, 3);
    for (class, row) in confusion.rows().into_iter().enumerate() {
        let row_sum: u64 = row.iter().sum();
        let true_count = y_true.iter().filter(|&&l| l == class as i32).count() as u64;
        assert_eq!(row_sum, true_count, "row {} sums to {}", class, row_sum);
    }
}

#[test]
fn resampler_rejects_classes_below_the_neighbour_count() {
    // Class 1 has 3 members, below the k=5 + 1 required for interpolation.
    let x = array![
        [0.0f32, 0.0],
        [0.1, 0.0],
        [0.2, 0.0],
        [0.3, 0.0],
        [0.4, 0.0],
        [0.5, 0.0],
        [5.0, 5.0],
        [5.1, 5.0],
        [5.2, 5.0]
    ];
    let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 1];
    let err = SmoteEnn::new(42).fit_resample(&x, &y).unwrap_err();
    assert!(matches!(err, PipelineError::Value(_)));
}

#[test]
fn resampled_labels_are_contiguous_from_zero() {
    let (x, y) = two_cluster_matrix(40, 4);
    // Encoded ids with a gap: 0 and 2.
    let gappy: Vec<i32> = y.iter().map(|&l| l * 2).collect();
    let (_, y_resampled) = SmoteEnn::new(42).fit_resample(&x, &gappy).expect("resample failed");

    // The resampler itself keeps incoming ids; contiguity comes from the
    // encoder compaction step the pipeline runs next.
    let mut ids: Vec<i32> = y_resampled.clone();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids, vec![0, 2]);

    let encoder = strokebench::preprocessing::LabelEncoder::fit(&[
        "a".to_string(),
        "b".to_string(),
        "c".to_string(),
    ]);
    let (compacted, dense) = encoder.compact(&y_resampled).expect("compact failed");
    let mut dense_ids: Vec<i32> = dense;
    dense_ids.sort_unstable();
    dense_ids.dedup();
    assert_eq!(dense_ids, vec![0, 1]);
    assert_eq!(compacted.n_classes(), 2);
}

#[test]
fn tuner_reports_exhaustion_when_every_trial_fails() {
    let (x, y) = two_cluster_matrix(20, 3);
    let broken = ParamGrid {
        n_estimators: vec![0],
        max_depth: vec![2],
        learning_rate: vec![0.3],
        subsample: vec![1.0],
        colsample_bytree: vec![1.0],
        min_child_weight: vec![1.0],
        gamma: vec![0.0],
    };
    let err = RandomizedSearch::new(42)
        .with_grid(broken)
        .with_n_iter(4)
        .with_folds(3)
        .fit(&x, &y)
        .unwrap_err();
    assert_eq!(err, PipelineError::SearchExhausted { attempted: 4 });
}

#[test]
fn tuner_returns_parameters_from_the_grid() {
    let (x, y) = two_cluster_matrix(25, 3);
    let grid = ParamGrid {
        n_estimators: vec![5, 10],
        max_depth: vec![1, 2],
        learning_rate: vec![0.1, 0.3],
        subsample: vec![1.0],
        colsample_bytree: vec![1.0],
        min_child_weight: vec![1.0],
        gamma: vec![0.0],
    };
    let (outcome, _) = RandomizedSearch::new(42)
        .with_grid(grid.clone())
        .with_n_iter(5)
        .with_folds(3)
        .fit(&x, &y)
        .expect("search failed");

    assert!(grid.n_estimators.contains(&outcome.best_params.n_estimators));
    assert!(grid.max_depth.contains(&outcome.best_params.max_depth));
    assert!(grid.learning_rate.contains(&outcome.best_params.learning_rate));
    assert!((0.0..=1.0).contains(&outcome.best_score));
    assert_eq!(outcome.trials.len(), 5);
}
