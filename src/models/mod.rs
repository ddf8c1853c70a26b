//! The model zoo: the ten classifiers compared by the evaluator, all
//! implemented over `ndarray` behind one trait.

pub mod classifier;
pub mod decision_tree;
pub mod factory;
pub mod gradient_boosting;
pub mod knn;
pub mod logistic;
pub mod mlp;
pub mod naive_bayes;
pub mod passive_aggressive;
pub mod random_forest;
pub mod svm;

pub use classifier::Classifier;
pub use decision_tree::DecisionTree;
pub use factory::{registry, TUNED_MODEL_NAME};
pub use gradient_boosting::{GbmParams, GradientBoosting};
pub use knn::KNearestNeighbors;
pub use logistic::LogisticRegression;
pub use mlp::MlpClassifier;
pub use naive_bayes::GaussianNb;
pub use passive_aggressive::PassiveAggressive;
pub use random_forest::RandomForest;
pub use svm::SvmRbf;

use crate::error::{PipelineError, Result};

/// Number of classes implied by encoded labels (highest id + 1).
pub(crate) fn class_count(y: &[i32]) -> Result<usize> {
    let mut max = -1i32;
    for &label in y {
        if label < 0 {
            return Err(PipelineError::Value(format!(
                "class ids must be non-negative, got {}",
                label
            )));
        }
        max = max.max(label);
    }
    if max < 0 {
        return Err(PipelineError::Value(
            "cannot fit on an empty label vector".to_string(),
        ));
    }
    Ok(max as usize + 1)
}

/// Index of the largest value; ties go to the lowest index.
pub(crate) fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

pub(crate) fn sigmoid(z: f32) -> f32 {
    1.0 / (1.0 + (-z).exp())
}

/// Shared fit-input validation: non-empty x, matching label length.
pub(crate) fn check_fit_input(x: &ndarray::Array2<f32>, y: &[i32]) -> Result<()> {
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(PipelineError::Value(format!(
            "cannot fit on an empty matrix ({} x {})",
            x.nrows(),
            x.ncols()
        )));
    }
    if x.nrows() != y.len() {
        return Err(PipelineError::Value(format!(
            "x has {} rows but y has {} labels",
            x.nrows(),
            y.len()
        )));
    }
    Ok(())
}

/// Shared predict-input validation against the fitted width.
pub(crate) fn check_predict_input(
    name: &str,
    n_features: usize,
    x: &ndarray::Array2<f32>,
) -> Result<()> {
    if x.ncols() != n_features {
        return Err(PipelineError::Value(format!(
            "{} was fitted on {} features but got {}",
            name,
            n_features,
            x.ncols()
        )));
    }
    Ok(())
}

pub(crate) fn not_fitted(name: &str) -> PipelineError {
    PipelineError::Value(format!("{} has not been fitted", name))
}
