//! Support vector machine with an RBF kernel.
//!
//! Training runs a hinge-loss subgradient descent over the empirical kernel
//! map: each training row is represented by its Gram-matrix row, and the
//! learned weight vector is the dual coefficient vector over the stored
//! support rows. Probabilities come from a sigmoid over the margin.

use ndarray::{Array1, Array2};

use crate::error::{PipelineError, Result};
use crate::models::{argmax, check_fit_input, check_predict_input, class_count, not_fitted, sigmoid, Classifier};

struct Fitted {
    n_features: usize,
    n_classes: usize,
    /// Training rows kept as the kernel basis.
    support: Array2<f32>,
    gamma: f32,
    /// Per binary problem, one coefficient per support row.
    coef: Vec<Array1<f32>>,
    intercepts: Vec<f32>,
}

pub struct SvmRbf {
    /// Soft-margin trade-off; the L2 strength is `1 / (2 n C)`.
    pub c: f32,
    pub max_iter: usize,
    pub learning_rate: f32,
    pub tol: f32,
    /// Kernel width; `None` uses the scale heuristic
    /// `1 / (n_features * var(x))`.
    pub gamma: Option<f32>,
    fitted: Option<Fitted>,
}

impl SvmRbf {
    pub fn new(c: f32) -> Self {
        Self {
            c,
            max_iter: 200,
            learning_rate: 0.01,
            tol: 1e-4,
            gamma: None,
            fitted: None,
        }
    }

    fn resolve_gamma(&self, x: &Array2<f32>) -> f32 {
        if let Some(g) = self.gamma {
            return g;
        }
        let n = (x.nrows() * x.ncols()) as f64;
        let mean = x.iter().map(|&v| v as f64).sum::<f64>() / n;
        let var = x
            .iter()
            .map(|&v| {
                let diff = v as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / n;
        if var > 0.0 {
            (1.0 / (x.ncols() as f64 * var)) as f32
        } else {
            1.0 / x.ncols() as f32
        }
    }

    /// Hinge-loss subgradient descent over kernel rows with targets ±1.
    fn fit_binary(&self, gram: &Array2<f32>, targets: &[f32]) -> (Array1<f32>, f32) {
        let n = gram.nrows();
        let lambda = 1.0 / (2.0 * n as f32 * self.c);

        let mut w = Array1::<f32>::zeros(n);
        let mut b = 0.0f32;
        for epoch in 0..self.max_iter {
            let eta = self.learning_rate / (1.0 + 0.01 * epoch as f32);
            let mut max_delta = 0.0f32;
            for i in 0..n {
                let row = gram.row(i);
                let margin = targets[i] * (row.dot(&w) + b);
                if margin < 1.0 {
                    for j in 0..n {
                        let old = w[j];
                        w[j] += eta * (targets[i] * row[j] - 2.0 * lambda * w[j]);
                        max_delta = max_delta.max((w[j] - old).abs());
                    }
                    b += eta * targets[i];
                } else {
                    for j in 0..n {
                        let old = w[j];
                        w[j] -= eta * 2.0 * lambda * w[j];
                        max_delta = max_delta.max((w[j] - old).abs());
                    }
                }
            }
            if max_delta < self.tol {
                break;
            }
        }
        (w, b)
    }

    /// Kernel row of `row` against every support vector.
    fn kernel_row(fitted: &Fitted, row: ndarray::ArrayView1<f32>) -> Array1<f32> {
        let mut out = Array1::<f32>::zeros(fitted.support.nrows());
        for (j, support) in fitted.support.rows().into_iter().enumerate() {
            let dist: f32 = row
                .iter()
                .zip(support.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            out[j] = (-fitted.gamma * dist).exp();
        }
        out
    }

    fn decision(&self, fitted: &Fitted, x: &Array2<f32>) -> Vec<Vec<f32>> {
        let mut margins = vec![Vec::with_capacity(x.nrows()); fitted.coef.len()];
        for row in x.rows() {
            let k = Self::kernel_row(fitted, row);
            for (p, coef) in fitted.coef.iter().enumerate() {
                margins[p].push(k.dot(coef) + fitted.intercepts[p]);
            }
        }
        margins
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

impl Classifier for SvmRbf {
    fn name(&self) -> &str {
        "SVM (RBF)"
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
                "SVM needs at least two classes".to_string(),
            ));
        }

        let gamma = self.resolve_gamma(x);
        let n = x.nrows();
        let mut gram = Array2::<f32>::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let dist: f32 = x
                    .row(i)
                    .iter()
                    .zip(x.row(j).iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum();
                let k = (-gamma * dist).exp();
                gram[[i, j]] = k;
                gram[[j, i]] = k;
            }
        }

        let n_problems = if n_classes == 2 { 1 } else { n_classes };
        let mut coef = Vec::with_capacity(n_problems);
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
            let (w, b) = self.fit_binary(&gram, &targets);
            coef.push(w);
            intercepts.push(b);
        }

        self.fitted = Some(Fitted {
            n_features: x.ncols(),
            n_classes,
            support: x.clone(),
            gamma,
            coef,
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

    fn predict_proba(&self, x: &Array2<f32>) -> Option<Result<Array2<f32>>> {
        Some(self.probabilities(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// XOR-ish layout that no linear separator handles.
    fn ring() -> (Array2<f32>, Vec<i32>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..12 {
            let angle = i as f32 * std::f32::consts::TAU / 12.0;
            rows.push(vec![0.3 * angle.cos(), 0.3 * angle.sin()]);
            y.push(0);
        }
        for i in 0..12 {
            let angle = i as f32 * std::f32::consts::TAU / 12.0;
            rows.push(vec![2.0 * angle.cos(), 2.0 * angle.sin()]);
            y.push(1);
        }
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        (Array2::from_shape_vec((24, 2), flat).unwrap(), y)
    }

    #[test]
    fn rbf_kernel_separates_the_ring() {
        let (x, y) = ring();
        let mut model = SvmRbf::new(10.0);
        model.max_iter = 400;
        model.fit(&x, &y).unwrap();
        let predictions = model.predict(&x).unwrap();
        let correct = predictions.iter().zip(y.iter()).filter(|(a, b)| a == b).count();
        assert!(correct >= 22, "only {} of 24 correct", correct);
    }

    #[test]
    fn probabilities_track_the_margin_sign() {
        let (x, y) = ring();
        let mut model = SvmRbf::new(10.0);
        model.max_iter = 400;
        model.fit(&x, &y).unwrap();
        let predictions = model.predict(&x).unwrap();
        let probs = model.predict_proba(&x).unwrap().unwrap();
        for (i, &label) in predictions.iter().enumerate() {
            if label == 1 {
                assert!(probs[[i, 1]] >= 0.5);
            } else {
                assert!(probs[[i, 1]] <= 0.5);
            }
        }
    }

    #[test]
    fn deterministic_fit() {
        let (x, y) = ring();
        let mut a = SvmRbf::new(0.5);
        let mut b = SvmRbf::new(0.5);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }
}
