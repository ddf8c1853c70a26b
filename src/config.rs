//! Pipeline configuration, loadable from a JSON file.
//!
//! Every field has a default matching the reference workflow, so an empty
//! config file (or none at all) reproduces the standard run. CLI flags
//! override whatever the file sets.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::tuner::ParamGrid;

/// Parameters for one end-to-end pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input CSV path.
    pub input: String,
    /// Header name of the categorical label column.
    pub label_column: String,
    /// Seed shared by every stochastic stage.
    pub seed: u64,
    /// Fraction of the resampled set held out for testing.
    pub test_size: f32,
    /// Features kept by the importance ranking stage.
    pub importance_top_n: usize,
    /// Features kept by the ANOVA stage, out of the importance survivors.
    pub anova_top_n: usize,
    /// Same-class neighbours consulted when synthesizing minority samples.
    pub smote_neighbors: usize,
    /// Neighbours consulted by the edited-nearest-neighbour cleaning vote.
    pub enn_neighbors: usize,
    /// Random parameter combinations drawn by the search.
    pub search_trials: usize,
    /// Stratified folds per search trial.
    pub cv_folds: usize,
    /// Candidate values drawn from by the search.
    pub grid: ParamGrid,
    /// Where the HTML report is written.
    pub report_path: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: "eeg dataset.csv".to_string(),
            label_column: "Class".to_string(),
            seed: 42,
            test_size: 0.2,
            importance_top_n: 60,
            anova_top_n: 40,
            smote_neighbors: 5,
            enn_neighbors: 3,
            search_trials: 30,
            cv_folds: 5,
            grid: ParamGrid::default(),
            report_path: "strokebench_report.html".to_string(),
        }
    }
}

/// Load a pipeline configuration from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(&path).map_err(|err| {
        PipelineError::Io(format!(
            "failed to read config {}: {}",
            path.as_ref().display(),
            err
        ))
    })?;
    let config: PipelineConfig = serde_json::from_str(&content).map_err(|err| {
        PipelineError::Format(format!(
            "failed to parse config {}: {}",
            path.as_ref().display(),
            err
        ))
    })?;
    Ok(config)
}
