//! L2-regularized logistic regression trained by gradient descent.

use ndarray::Array2;

use crate::error::{PipelineError, Result};
use crate::models::{argmax, check_fit_input, check_predict_input, class_count, not_fitted, sigmoid, Classifier};

struct Fitted {
    n_features: usize,
    n_classes: usize,
    /// One weight vector per binary problem (a single one for two classes).
    weights: Vec<Vec<f32>>,
    intercepts: Vec<f32>,
}

pub struct LogisticRegression {
    /// Inverse regularization strength; smaller means stronger shrinkage.
    pub c: f32,
    pub max_iter: usize,
    pub learning_rate: f32,
    pub tol: f32,
    fitted: Option<Fitted>,
}

impl LogisticRegression {
    pub fn new(c: f32, max_iter: usize) -> Self {
        Self {
            c,
            max_iter,
            learning_rate: 0.1,
            tol: 1e-5,
            fitted: None,
        }
    }

    /// Fit one binary problem with targets in {0, 1}. The L2 penalty is
    /// applied as a proximal shrink after each step so extreme strengths
    /// stay numerically stable; the intercept is not penalized.
    fn fit_binary(&self, x: &Array2<f32>, targets: &[f32]) -> (Vec<f32>, f32) {
        let n = x.nrows();
        let d = x.ncols();
        let shrink = 1.0 / (1.0 + self.learning_rate / (self.c * n as f32));

        let mut w = vec![0.0f32; d];
        let mut b = 0.0f32;
        for _ in 0..self.max_iter {
            let mut grad_w = vec![0.0f32; d];
            let mut grad_b = 0.0f32;
            for (i, row) in x.rows().into_iter().enumerate() {
                let z = row.iter().zip(w.iter()).map(|(xi, wi)| xi * wi).sum::<f32>() + b;
                let residual = sigmoid(z) - targets[i];
                for (j, &xi) in row.iter().enumerate() {
                    grad_w[j] += residual * xi;
                }
                grad_b += residual;
            }

            let scale = self.learning_rate / n as f32;
            let mut max_delta = 0.0f32;
            for j in 0..d {
                let old = w[j];
                w[j] = (w[j] - scale * grad_w[j]) * shrink;
                max_delta = max_delta.max((w[j] - old).abs());
            }
            let old_b = b;
            b -= scale * grad_b;
            max_delta = max_delta.max((b - old_b).abs());

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

    fn probabilities(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(self.name(), fitted.n_features, x)?;
        let margins = self.decision(fitted, x);
        let n = x.nrows();
        let mut out = Array2::<f32>::zeros((n, fitted.n_classes));

        if fitted.n_classes == 2 {
            for i in 0..n {
                let p = sigmoid(margins[0][i]);
                out[[i, 0]] = 1.0 - p;
                out[[i, 1]] = p;
            }
        } else {
            for i in 0..n {
                let mut row: Vec<f32> = margins.iter().map(|m| sigmoid(m[i])).collect();
                let sum: f32 = row.iter().sum();
                if sum > 0.0 {
                    for v in &mut row {
                        *v /= sum;
                    }
                } else {
                    let uniform = 1.0 / fitted.n_classes as f32;
                    for v in &mut row {
                        *v = uniform;
                    }
                }
                for (j, v) in row.into_iter().enumerate() {
                    out[[i, j]] = v;
                }
            }
        }
        Ok(out)
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "Logistic Regression"
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
                "logistic regression needs at least two classes".to_string(),
            ));
        }

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
                        0.0
                    }
                })
                .collect();
            let (w, b) = self.fit_binary(x, &targets);
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
        let probs = self.probabilities(x)?;
        Ok(probs
            .rows()
            .into_iter()
            .map(|row| argmax(&row.to_vec()) as i32)
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Option<Result<Array2<f32>>> {
        Some(self.probabilities(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f32>, Vec<i32>) {
        let x = array![
            [-2.0, 1.0],
            [-1.5, -1.0],
            [-2.5, 0.5],
            [-1.8, 0.0],
            [2.0, 1.0],
            [1.5, -1.0],
            [2.5, 0.5],
            [1.8, 0.0],
        ];
        let y = vec![0, 0, 0, 0, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn weak_regularization_fits_separable_data() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(1e6, 500);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn extreme_regularization_pins_weights_near_zero() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(1e-12, 200);
        model.fit(&x, &y).unwrap();
        let probs = model.predict_proba(&x).unwrap().unwrap();
        // Weights collapse to 0, leaving roughly the intercept-only prior.
        for row in probs.rows() {
            assert!((row[1] - 0.5).abs() < 0.05, "p = {}", row[1]);
        }
    }

    #[test]
    fn rejects_non_positive_c() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(0.0, 10);
        assert!(matches!(
            model.fit(&x, &y),
            Err(PipelineError::Configuration(_))
        ));
    }
}
