//! Gaussian naive Bayes with variance smoothing.

use ndarray::Array2;

use crate::error::Result;
use crate::models::{check_fit_input, check_predict_input, class_count, not_fitted, Classifier};

struct Fitted {
    n_features: usize,
    /// Log of the empirical class priors.
    log_priors: Vec<f64>,
    /// Per class, per feature.
    means: Vec<Vec<f64>>,
    variances: Vec<Vec<f64>>,
}

pub struct GaussianNb {
    /// Fraction of the largest feature variance added to every variance
    /// for numerical stability.
    pub var_smoothing: f64,
    fitted: Option<Fitted>,
}

impl GaussianNb {
    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            fitted: None,
        }
    }

    /// Joint log likelihood per class for every row.
    fn joint_log_likelihood(&self, x: &Array2<f32>) -> Result<Vec<Vec<f64>>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(self.name(), fitted.n_features, x)?;

        let n_classes = fitted.log_priors.len();
        let mut out = Vec::with_capacity(x.nrows());
        for row in x.rows() {
            let mut scores = Vec::with_capacity(n_classes);
            for c in 0..n_classes {
                let mut score = fitted.log_priors[c];
                for (j, &value) in row.iter().enumerate() {
                    let mean = fitted.means[c][j];
                    let var = fitted.variances[c][j];
                    let diff = value as f64 - mean;
                    score += -0.5 * (2.0 * std::f64::consts::PI * var).ln()
                        - diff * diff / (2.0 * var);
                }
                scores.push(score);
            }
            out.push(scores);
        }
        Ok(out)
    }
}

impl Classifier for GaussianNb {
    fn name(&self) -> &str {
        "Gaussian Naive Bayes"
    }

    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        check_fit_input(x, y)?;
        let n_classes = class_count(y)?;
        let n = x.nrows() as f64;
        let d = x.ncols();

        // Smoothing epsilon scales with the widest global feature variance.
        let mut max_var = 0.0f64;
        for col in x.columns() {
            let mean = col.iter().map(|&v| v as f64).sum::<f64>() / n;
            let var = col
                .iter()
                .map(|&v| {
                    let diff = v as f64 - mean;
                    diff * diff
                })
                .sum::<f64>()
                / n;
            max_var = max_var.max(var);
        }
        let epsilon = self.var_smoothing * max_var;

        let mut log_priors = Vec::with_capacity(n_classes);
        let mut means = Vec::with_capacity(n_classes);
        let mut variances = Vec::with_capacity(n_classes);
        for c in 0..n_classes {
            let members: Vec<usize> = y
                .iter()
                .enumerate()
                .filter(|&(_, &label)| label as usize == c)
                .map(|(i, _)| i)
                .collect();
            let count = members.len() as f64;
            log_priors.push((count / n).max(f64::MIN_POSITIVE).ln());

            let mut class_means = vec![0.0f64; d];
            let mut class_vars = vec![0.0f64; d];
            if !members.is_empty() {
                for j in 0..d {
                    let mean = members.iter().map(|&i| x[[i, j]] as f64).sum::<f64>() / count;
                    let var = members
                        .iter()
                        .map(|&i| {
                            let diff = x[[i, j]] as f64 - mean;
                            diff * diff
                        })
                        .sum::<f64>()
                        / count;
                    class_means[j] = mean;
                    class_vars[j] = (var + epsilon).max(f64::MIN_POSITIVE);
                }
            } else {
                for j in 0..d {
                    class_vars[j] = epsilon.max(f64::MIN_POSITIVE);
                }
            }
            means.push(class_means);
            variances.push(class_vars);
        }

        self.fitted = Some(Fitted {
            n_features: d,
            log_priors,
            means,
            variances,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        let jll = self.joint_log_likelihood(x)?;
        Ok(jll
            .into_iter()
            .map(|scores| {
                let mut best = 0;
                for (i, &s) in scores.iter().enumerate().skip(1) {
                    if s > scores[best] {
                        best = i;
                    }
                }
                best as i32
            })
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Option<Result<Array2<f32>>> {
        let jll = match self.joint_log_likelihood(x) {
            Ok(jll) => jll,
            Err(e) => return Some(Err(e)),
        };
        let n_classes = jll.first().map_or(0, |row| row.len());
        let mut out = Array2::<f32>::zeros((jll.len(), n_classes));
        for (i, scores) in jll.into_iter().enumerate() {
            // Log-sum-exp normalization.
            let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let exps: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
            let sum: f64 = exps.iter().sum();
            for (j, e) in exps.into_iter().enumerate() {
                out[[i, j]] = (e / sum) as f32;
            }
        }
        Some(Ok(out))
    }
}
