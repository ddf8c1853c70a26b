//! A small trait abstraction for the classifier models compared by the
//! evaluator. Centralizing the contract here lets implementations live next
//! to their model code while the registry hands out trait objects.

use ndarray::Array2;

use crate::error::Result;

/// A supervised classifier over encoded integer labels.
pub trait Classifier {
    /// Human readable display name used in reports and plots.
    fn name(&self) -> &str;

    /// Fit the model on `(x, y)`. Labels are encoder ids, contiguous from 0.
    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()>;

    /// Predict one encoded label per row of `x`.
    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>>;

    /// Class-membership probabilities when the model supports them:
    /// shape (n_samples, n_classes), columns in encoder id order, rows
    /// summing to 1. `None` means the capability is absent and ROC-style
    /// analyses must skip this model.
    fn predict_proba(&self, x: &Array2<f32>) -> Option<Result<Array2<f32>>>;
}
