//! Randomized hyperparameter search over the boosting grid with
//! stratified cross-validation scoring.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::metrics::accuracy;
use crate::model_selection::StratifiedKFold;
use crate::models::{Classifier, GbmParams, GradientBoosting};

/// Candidate values per hyperparameter. A draw picks one value from each
/// list independently, so duplicates across draws are possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub learning_rate: Vec<f32>,
    pub subsample: Vec<f32>,
    pub colsample_bytree: Vec<f32>,
    pub min_child_weight: Vec<f32>,
    pub gamma: Vec<f32>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_estimators: vec![600, 700, 800],
            max_depth: vec![10, 12, 15],
            learning_rate: vec![0.05, 0.1, 0.2],
            subsample: vec![0.8, 0.9, 1.0],
            colsample_bytree: vec![0.8, 0.9, 1.0],
            min_child_weight: vec![1.0, 3.0],
            gamma: vec![0.0, 0.1, 0.2],
        }
    }
}

impl ParamGrid {
    fn is_empty(&self) -> bool {
        self.n_estimators.is_empty()
            || self.max_depth.is_empty()
            || self.learning_rate.is_empty()
            || self.subsample.is_empty()
            || self.colsample_bytree.is_empty()
            || self.min_child_weight.is_empty()
            || self.gamma.is_empty()
    }

    fn draw(&self, rng: &mut StdRng) -> GbmParams {
        // Each axis always has at least one candidate here, checked by the
        // caller before drawing.
        let pick_usize = |values: &[usize], rng: &mut StdRng| {
            *values.choose(rng).unwrap_or(&values[0])
        };
        let pick_f32 = |values: &[f32], rng: &mut StdRng| {
            *values.choose(rng).unwrap_or(&values[0])
        };
        GbmParams {
            n_estimators: pick_usize(&self.n_estimators, rng),
            max_depth: pick_usize(&self.max_depth, rng),
            learning_rate: pick_f32(&self.learning_rate, rng),
            subsample: pick_f32(&self.subsample, rng),
            colsample_bytree: pick_f32(&self.colsample_bytree, rng),
            min_child_weight: pick_f32(&self.min_child_weight, rng),
            gamma: pick_f32(&self.gamma, rng),
        }
    }
}

/// One scored draw.
#[derive(Debug, Clone)]
pub struct Trial {
    pub params: GbmParams,
    /// Mean cross-validated accuracy; `None` when the trial failed.
    pub score: Option<f32>,
}

/// Everything the search learned, plus the winning configuration.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best_params: GbmParams,
    pub best_score: f32,
    pub trials: Vec<Trial>,
}

pub struct RandomizedSearch {
    pub grid: ParamGrid,
    pub n_iter: usize,
    pub folds: usize,
    pub seed: u64,
}

impl RandomizedSearch {
    pub fn new(seed: u64) -> Self {
        Self {
            grid: ParamGrid::default(),
            n_iter: 30,
            folds: 5,
            seed,
        }
    }

    pub fn with_grid(mut self, grid: ParamGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Score one configuration by mean accuracy over the stratified folds.
    fn score_params(
        &self,
        params: &GbmParams,
        x: &Array2<f32>,
        y: &[i32],
        folds: &[(Vec<usize>, Vec<usize>)],
    ) -> Result<f32> {
        params.validate()?;
        let mut total = 0.0f32;
        for (train_idx, test_idx) in folds {
            let x_train = x.select(Axis(0), train_idx);
            let y_train: Vec<i32> = train_idx.iter().map(|&i| y[i]).collect();
            let x_test = x.select(Axis(0), test_idx);
            let y_test: Vec<i32> = test_idx.iter().map(|&i| y[i]).collect();

            let mut model = GradientBoosting::new(params.clone(), self.seed);
            model.fit(&x_train, &y_train)?;
            let predictions = model.predict(&x_test)?;
            total += accuracy(&y_test, &predictions);
        }
        Ok(total / folds.len() as f32)
    }

    /// Run the search and return the outcome together with a model refit on
    /// the full `(x, y)` with the winning parameters.
    ///
    /// Failed trials are logged and skipped; the search only errors when
    /// every trial failed.
    pub fn fit(&self, x: &Array2<f32>, y: &[i32]) -> Result<(SearchOutcome, GradientBoosting)> {
        if self.n_iter == 0 {
            return Err(PipelineError::Configuration(
                "the search needs at least one trial".to_string(),
            ));
        }
        if self.grid.is_empty() {
            return Err(PipelineError::Configuration(
                "every grid axis needs at least one candidate".to_string(),
            ));
        }

        // One fold assignment shared by every trial.
        let folds = StratifiedKFold::new(self.folds, self.seed).split(y)?;

        // Draws happen sequentially up front so the trial list is the same
        // regardless of scoring parallelism.
        let mut rng = StdRng::seed_from_u64(self.seed);
        let draws: Vec<GbmParams> = (0..self.n_iter).map(|_| self.grid.draw(&mut rng)).collect();

        let trials: Vec<Trial> = draws
            .into_par_iter()
            .enumerate()
            .map(|(i, params)| match self.score_params(&params, x, y, &folds) {
                Ok(score) => {
                    log::debug!("trial {:>2}: accuracy {:.4} with {:?}", i, score, params);
                    Trial {
                        params,
                        score: Some(score),
                    }
                }
                Err(e) => {
                    log::warn!("trial {} failed: {}", i, e);
                    Trial {
                        params,
                        score: None,
                    }
                }
            })
            .collect();

        // First trial reaching the maximum wins ties.
        let mut best: Option<(usize, f32)> = None;
        for (i, trial) in trials.iter().enumerate() {
            if let Some(score) = trial.score {
                let improves = best.map_or(true, |(_, s)| score > s);
                if improves {
                    best = Some((i, score));
                }
            }
        }

        let (best_idx, best_score) = best.ok_or(PipelineError::SearchExhausted {
            attempted: trials.len(),
        })?;
        let best_params = trials[best_idx].params.clone();

        let mut model = GradientBoosting::new(best_params.clone(), self.seed);
        model.fit(x, y)?;

        Ok((
            SearchOutcome {
                best_params,
                best_score,
                trials,
            },
            model,
        ))
    }
}
