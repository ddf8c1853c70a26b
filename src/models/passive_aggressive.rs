//! Passive-aggressive classifier (PA-I variant).
//!
//! Online hinge-loss updates with step size `min(C, loss / ||x||^2)`; the
//! aggressiveness constant `C` caps how far any single sample can move the
//! weights. This is a margin model with no probability capability.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};
use crate::models::{argmax, check_fit_input, check_predict_input, class_count, not_fitted, Classifier};

struct Fitted {
    n_features: usize,
    n_classes: usize,
    weights: Vec<Vec<f32>>,
    intercepts: Vec<f32>,
}

pub struct PassiveAggressive {
    pub c: f32,
    pub max_iter: usize,
    pub seed: u64,
    pub tol: f32,
    fitted: Option<Fitted>,
}

impl PassiveAggressive {
    pub fn new(c: f32, max_iter: usize, seed: u64) -> Self {
        Self {
            c,
            max_iter,
            seed,
            tol: 1e-6,
            fitted: None,
        }
    }

    /// One binary problem with targets ±1; sample order reshuffles each
    /// epoch from the model seed.
    fn fit_binary(&self, x: &Array2<f32>, targets: &[f32], rng: &mut StdRng) -> (Vec<f32>, f32) {
        let n = x.nrows();
        let d = x.ncols();
        let mut w = vec![0.0f32; d];
        let mut b = 0.0f32;
        let mut order: Vec<usize> = (0..n).collect();

        for _ in 0..self.max_iter {
            order.shuffle(rng);
            let mut max_delta = 0.0f32;
            for &i in &order {
                let row = x.row(i);
                let margin =
                    targets[i] * (row.iter().zip(w.iter()).map(|(xi, wi)| xi * wi).sum::<f32>() + b);
                let loss = (1.0 - margin).max(0.0);
                if loss > 0.0 {
                    // +1 accounts for the implicit intercept feature.
                    let norm: f32 = row.iter().map(|&v| v * v).sum::<f32>() + 1.0;
                    let tau = (loss / norm).min(self.c);
                    for (j, &xi) in row.iter().enumerate() {
                        let step = tau * targets[i] * xi;
                        w[j] += step;
                        max_delta = max_delta.max(step.abs());
                    }
                    b += tau * targets[i];
                    max_delta = max_delta.max((tau * targets[i]).abs());
                }
            }
            if max_delta < self.tol {
                break;
            }
        }
        (w, b)
    }

    fn decision(&self, fitted: &Fitted, x: &Array2<f32>) -> Vec<Vec<f32>> {
        fitted
            .weights
            .iter()
            .zip(fitted.intercepts.iter())
            .map(|(w, &b)| {
                x.rows()
                    .into_iter()
                    .map(|row| row.iter().zip(w.iter()).map(|(xi, wi)| xi * wi).sum::<f32>() + b)
                    .collect()
            })
            .collect()
    }
}

impl Classifier for PassiveAggressive {
    fn name(&self) -> &str {
        "Passive Aggressive"
    }

    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(PipelineError::Configuration(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        check_fit_input(x, y)?;
        let n_classes = class_count(y)?;
        if n_classes < 2 {
            return Err(PipelineError::Value(
                "passive-aggressive needs at least two classes".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let n_problems = if n_classes == 2 { 1 } else { n_classes };
        let mut weights = Vec::with_capacity(n_problems);
        let mut intercepts = Vec::with_capacity(n_problems);
        for problem in 0..n_problems {
            let targets: Vec<f32> = y
                .iter()
                .map(|&label| {
                    let positive = if n_classes == 2 {
                        label == 1
                    } else {
                        label as usize == problem
                    };
                    if positive {
                        1.0
                    } else {
                        -1.0
                    }
                })
                .collect();
            let (w, b) = self.fit_binary(x, &targets, &mut rng);
            weights.push(w);
            intercepts.push(b);
        }

        self.fitted = Some(Fitted {
            n_features: x.ncols(),
            n_classes,
            weights,
            intercepts,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(self.name(), fitted.n_features, x)?;
        let margins = self.decision(fitted, x);
        if fitted.n_classes == 2 {
            Ok(margins[0]
                .iter()
                .map(|&m| if m >= 0.0 { 1 } else { 0 })
                .collect())
        } else {
            Ok((0..x.nrows())
                .map(|i| {
                    let row: Vec<f32> = margins.iter().map(|m| m[i]).collect();
                    argmax(&row) as i32
                })
                .collect())
        }
    }

    /// Margin model: no probability capability.
    fn predict_proba(&self, _x: &Array2<f32>) -> Option<Result<Array2<f32>>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f32>, Vec<i32>) {
        let x = array![
            [-2.0, 0.5],
            [-1.5, -0.5],
            [-2.5, 0.0],
            [-1.8, 0.3],
            [2.0, 0.5],
            [1.5, -0.5],
            [2.5, 0.0],
            [1.8, 0.3]
        ];
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn aggressive_updates_fit_separable_data() {
        let (x, y) = separable();
        let mut model = PassiveAggressive::new(1.0, 50, 42);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn deterministic_given_seed() {
        let (x, y) = separable();
        let mut a = PassiveAggressive::new(1e-8, 5, 42);
        let mut b = PassiveAggressive::new(1e-8, 5, 42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn exposes_no_probability_capability() {
        let (x, y) = separable();
        let mut model = PassiveAggressive::new(1.0, 10, 42);
        model.fit(&x, &y).unwrap();
        assert!(model.predict_proba(&x).is_none());
    }
}
