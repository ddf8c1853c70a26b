//! End-to-end pipeline orchestration.
//!
//! Wires the six stages in their fixed order: load, preprocess, resample,
//! select features, tune, evaluate. Every stage finishes before the next
//! starts and fitted transforms travel forward as plain values.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::evaluation::{Comparison, Evaluator};
use crate::feature_selection::{ImportanceSelector, SelectKBest};
use crate::io::{read_dataset_with_config, ReaderConfig};
use crate::model_selection::train_test_split;
use crate::models::{registry, TUNED_MODEL_NAME};
use crate::preprocessing::{LabelEncoder, StandardScaler};
use crate::report::render_report;
use crate::resampling::SmoteEnn;
use crate::tuner::{RandomizedSearch, SearchOutcome};

/// Everything a finished run hands back: the per-model reports, the winning
/// search configuration, the surviving feature names and the held-out labels
/// the charts are computed against.
#[derive(Debug)]
pub struct PipelineSummary {
    pub comparison: Comparison,
    pub search: SearchOutcome,
    pub encoder: LabelEncoder,
    pub selected_features: Vec<String>,
    pub y_test: Vec<i32>,
}

impl PipelineSummary {
    /// Display name of the model with the highest test accuracy.
    pub fn best_model(&self) -> &str {
        &self.comparison.best_report().name
    }

    /// Render the comparison report as a standalone HTML string.
    pub fn render_report(&self) -> Result<String> {
        let params_json = serde_json::to_string_pretty(&self.search.best_params)
            .unwrap_or_default();
        render_report(
            &self.comparison,
            self.encoder.classes(),
            &self.y_test,
            TUNED_MODEL_NAME,
            &params_json,
        )
        .map_err(PipelineError::Value)
    }

    /// Render the report and write it to `path`.
    pub fn write_report(&self, path: &str) -> Result<()> {
        let html = self.render_report()?;
        std::fs::write(path, html)
            .map_err(|err| PipelineError::Io(format!("failed to write {}: {}", path, err)))?;
        log::info!("report written to {}", path);
        Ok(())
    }
}

/// Run the whole pipeline with the given configuration.
pub fn run(config: &PipelineConfig) -> Result<PipelineSummary> {
    // Stage 1: load and deduplicate.
    let reader = ReaderConfig {
        label_column: config.label_column.clone(),
    };
    let dataset = read_dataset_with_config(&config.input, &reader)?;
    println!("Dataset Loaded Successfully");
    dataset.log_summary();

    // Stage 2: standardize features, encode labels. The scaler is fitted on
    // the full matrix, before the split.
    let (_scaler, x_scaled) = StandardScaler::fit_transform(&dataset.x)?;
    let (encoder, y_encoded) = LabelEncoder::fit_transform(&dataset.labels);
    println!("Preprocessing Complete");

    // Stage 3: rebalance classes, then compact the label range since the
    // cleaning step can empty a class.
    let resampler = SmoteEnn::new(config.seed)
        .with_k_neighbors(config.smote_neighbors)
        .with_enn_neighbors(config.enn_neighbors);
    let (x_resampled, y_resampled) = resampler.fit_resample(&x_scaled, &y_encoded)?;
    let (encoder, y_resampled) = encoder.compact(&y_resampled)?;
    log::info!(
        "resampled to {} rows across {} classes",
        x_resampled.nrows(),
        encoder.n_classes()
    );

    // Stage 4a: importance ranking on the resampled set.
    let importance = ImportanceSelector::new(config.importance_top_n, config.seed);
    let (x_ranked, ranked_support) = importance.fit_transform(&x_resampled, &y_resampled)?;

    // Stage 4b: ANOVA F-test over the survivors. Stage-b indices address the
    // stage-a matrix, so map them back through the first support to name the
    // final columns.
    let k_best = SelectKBest::new(config.anova_top_n);
    let (x_selected, anova_support) = k_best.fit_transform(&x_ranked, &y_resampled)?;
    let selected_features: Vec<String> = anova_support
        .iter()
        .map(|&j| dataset.feature_names[ranked_support[j]].clone())
        .collect();
    println!("Feature Selection Complete");
    log::debug!("selected features: {:?}", selected_features);

    // Stage 5a: stratified hold-out split.
    let split = train_test_split(&x_selected, &y_resampled, config.test_size, config.seed)?;

    // Stage 5b: randomized search on the training side only.
    let search = RandomizedSearch::new(config.seed)
        .with_grid(config.grid.clone())
        .with_n_iter(config.search_trials)
        .with_folds(config.cv_folds);
    let (outcome, _refit) = search.fit(&split.x_train, &split.y_train)?;
    println!(
        "Best Parameters: {}",
        serde_json::to_string(&outcome.best_params).unwrap_or_default()
    );

    // Stage 6: fit and score the full registry.
    let mut models = registry(outcome.best_params.clone(), config.seed);
    let comparison = Evaluator::new(&split, &encoder).evaluate(&mut models)?;

    Ok(PipelineSummary {
        comparison,
        search: outcome,
        encoder,
        selected_features,
        y_test: split.y_test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::io::Write;

    /// Write a linearly separable two-class table with an 80/20 imbalance.
    fn write_fixture(name: &str, rows_a: usize, rows_b: usize, n_features: usize) -> String {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();

        let mut header: Vec<String> = (0..n_features).map(|i| format!("ch{}", i)).collect();
        header.push("Class".to_string());
        writeln!(file, "{}", header.join(",")).unwrap();

        let mut rng = StdRng::seed_from_u64(9);
        for i in 0..(rows_a + rows_b) {
            let (center, label) = if i < rows_a { (-2.0, "healthy") } else { (2.0, "stroke") };
            let mut cells: Vec<String> = (0..n_features)
                .map(|j| {
                    let jitter: f32 = rng.gen_range(-0.5..0.5);
                    let base = if j % 2 == 0 { center } else { 0.0 };
                    format!("{:.4}", base + jitter + 0.01 * i as f32)
                })
                .collect();
            cells.push(label.to_string());
            writeln!(file, "{}", cells.join(",")).unwrap();
        }
        path.to_string_lossy().into_owned()
    }

    fn small_config(input: String) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.input = input;
        config.importance_top_n = 6;
        config.anova_top_n = 4;
        config.search_trials = 2;
        config.cv_folds = 3;
        config.grid = crate::tuner::ParamGrid {
            n_estimators: vec![5],
            max_depth: vec![2],
            learning_rate: vec![0.3],
            subsample: vec![1.0],
            colsample_bytree: vec![1.0],
            min_child_weight: vec![1.0],
            gamma: vec![0.0],
        };
        config
    }

    #[test]
    fn full_run_produces_ten_reports() {
        let input = write_fixture("strokebench_pipeline_full.csv", 96, 24, 8);
        let summary = run(&small_config(input)).unwrap();

        assert_eq!(summary.comparison.reports.len(), 10);
        assert!(summary.selected_features.len() <= 4);
        assert!(!summary.selected_features.is_empty());

        let best = summary.comparison.best_report();
        for report in &summary.comparison.reports {
            assert!(best.accuracy >= report.accuracy);
            assert!((0.0..=1.0).contains(&report.accuracy));
        }
    }

    #[test]
    fn selected_features_come_from_the_header() {
        let input = write_fixture("strokebench_pipeline_names.csv", 80, 20, 6);
        let summary = run(&small_config(input)).unwrap();
        for name in &summary.selected_features {
            assert!(name.starts_with("ch"), "unexpected feature name {}", name);
        }
    }

    #[test]
    fn report_renders_from_a_full_run() {
        let input = write_fixture("strokebench_pipeline_report.csv", 80, 20, 6);
        let summary = run(&small_config(input)).unwrap();
        let html = summary.render_report().unwrap();
        assert!(html.contains("Gradient Boosting"));
        assert!(html.contains(summary.best_model()));
    }

    #[test]
    fn missing_input_aborts_with_io_error() {
        let config = small_config("definitely_not_here.csv".to_string());
        let err = run(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
