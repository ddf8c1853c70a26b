//! strokebench: classifier benchmarking pipeline for EEG-based stroke
//! prediction.
//!
//! This crate implements the full offline workflow: CSV loading with
//! deduplication, standardization and label encoding, SMOTE-ENN class
//! rebalancing, two-stage feature selection (boosted-tree importances then
//! ANOVA F-test), randomized hyperparameter search with stratified
//! cross-validation, a ten-model comparison behind one `Classifier` trait,
//! and an HTML report of the comparison charts.
//!
//! The design favors small, testable modules: every fitted transform is a
//! plain value handed forward, and each estimator lives in its own file
//! under `models`.

pub mod config;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod feature_selection;
pub mod io;
pub mod metrics;
pub mod model_selection;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod report;
pub mod resampling;
pub mod tuner;

pub use config::{load_config, PipelineConfig};
pub use error::{PipelineError, Result};
pub use pipeline::{run, PipelineSummary};
