//! Stratified splitting primitives: the train/test split and the k-fold
//! generator used by cross-validation.
//!
//! Both shuffle within each class with a seeded generator, so every split is
//! reproducible from the pipeline seed.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};

/// A stratified 2-way partition of a dataset.
#[derive(Debug, Clone)]
pub struct Split {
    pub x_train: Array2<f32>,
    pub y_train: Vec<i32>,
    pub x_test: Array2<f32>,
    pub y_test: Vec<i32>,
    /// Row indices of the input matrix that went to each side.
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Stratified train/test split.
///
/// Each class contributes `round(count * test_size)` samples to the test
/// side, bounded so that classes with at least two members keep one sample
/// on each side.
pub fn train_test_split(
    x: &Array2<f32>,
    y: &[i32],
    test_size: f32,
    seed: u64,
) -> Result<Split> {
    if x.nrows() != y.len() {
        return Err(PipelineError::Value(format!(
            "x has {} rows but y has {} labels",
            x.nrows(),
            y.len()
        )));
    }
    if y.is_empty() {
        return Err(PipelineError::Value("cannot split an empty dataset".to_string()));
    }
    if !(0.0..1.0).contains(&test_size) || test_size == 0.0 {
        return Err(PipelineError::Value(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_indices = Vec::new();
    let mut test_indices = Vec::new();

    for (_, mut indices) in class_indices(y) {
        indices.shuffle(&mut rng);
        let count = indices.len();
        let mut n_test = (count as f32 * test_size).round() as usize;
        if count >= 2 {
            n_test = n_test.clamp(1, count - 1);
        } else {
            n_test = 0;
        }
        test_indices.extend_from_slice(&indices[..n_test]);
        train_indices.extend_from_slice(&indices[n_test..]);
    }

    train_indices.sort_unstable();
    test_indices.sort_unstable();

    Ok(Split {
        x_train: take_rows(x, &train_indices),
        y_train: take_labels(y, &train_indices),
        x_test: take_rows(x, &test_indices),
        y_test: take_labels(y, &test_indices),
        train_indices,
        test_indices,
    })
}

/// Stratified k-fold index generator.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub seed: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Produce `(train_indices, test_indices)` per fold.
    ///
    /// Every class is shuffled once, then cut into `n_splits` consecutive
    /// slices with the remainder spread over the earliest folds, so each
    /// fold's label distribution mirrors the full vector.
    pub fn split(&self, y: &[i32]) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(PipelineError::Value(format!(
                "need at least 2 folds, got {}",
                self.n_splits
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fold_members: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];

        for (class, mut indices) in class_indices(y) {
            if indices.len() < self.n_splits {
                return Err(PipelineError::Value(format!(
                    "class {} has {} members, fewer than {} folds",
                    class,
                    indices.len(),
                    self.n_splits
                )));
            }
            indices.shuffle(&mut rng);

            let base = indices.len() / self.n_splits;
            let remainder = indices.len() % self.n_splits;
            let mut start = 0;
            for (fold, members) in fold_members.iter_mut().enumerate() {
                let size = base + usize::from(fold < remainder);
                members.extend_from_slice(&indices[start..start + size]);
                start += size;
            }
        }

        let folds = fold_members
            .iter()
            .enumerate()
            .map(|(fold, test)| {
                let mut test = test.clone();
                test.sort_unstable();
                let mut train: Vec<usize> = Vec::with_capacity(y.len() - test.len());
                for (other, members) in fold_members.iter().enumerate() {
                    if other != fold {
                        train.extend_from_slice(members);
                    }
                }
                train.sort_unstable();
                (train, test)
            })
            .collect();

        Ok(folds)
    }
}

/// Indices grouped by class id, classes in ascending order.
fn class_indices(y: &[i32]) -> Vec<(i32, Vec<usize>)> {
    let mut groups: Vec<(i32, Vec<usize>)> = Vec::new();
    for (i, &label) in y.iter().enumerate() {
        match groups.iter_mut().find(|(c, _)| *c == label) {
            Some((_, members)) => members.push(i),
            None => groups.push((label, vec![i])),
        }
    }
    groups.sort_by_key(|(c, _)| *c);
    groups
}

/// Copy the selected rows of `x` into a new matrix.
pub fn take_rows(x: &Array2<f32>, indices: &[usize]) -> Array2<f32> {
    x.select(Axis(0), indices)
}

/// Copy the selected entries of `y` into a new vector.
pub fn take_labels(y: &[i32], indices: &[usize]) -> Vec<i32> {
    indices.iter().map(|&i| y[i]).collect()
}
