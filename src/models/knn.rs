//! K-nearest-neighbor classification with Minkowski distance.

use ndarray::Array2;

use crate::error::{PipelineError, Result};
use crate::models::{argmax, check_fit_input, check_predict_input, class_count, not_fitted, Classifier};

struct Fitted {
    x: Array2<f32>,
    y: Vec<i32>,
    n_classes: usize,
}

pub struct KNearestNeighbors {
    pub k: usize,
    /// Minkowski exponent; 2 gives Euclidean distance.
    pub p: f64,
    fitted: Option<Fitted>,
}

impl KNearestNeighbors {
    pub fn new(k: usize, p: f64) -> Self {
        Self { k, p, fitted: None }
    }

    /// Per-row class vote fractions among the k nearest stored samples.
    /// Distance ties resolve by ascending stored index.
    fn vote_fractions(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(self.name(), fitted.x.ncols(), x)?;

        let k = self.k.min(fitted.y.len());
        let mut out = Array2::<f32>::zeros((x.nrows(), fitted.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let mut scored: Vec<(f64, usize)> = fitted
                .x
                .rows()
                .into_iter()
                .enumerate()
                .map(|(j, stored)| {
                    // The p-th root is monotone, so ranking skips it.
                    let d: f64 = row
                        .iter()
                        .zip(stored.iter())
                        .map(|(a, b)| ((a - b).abs() as f64).powf(self.p))
                        .sum();
                    (d, j)
                })
                .collect();
            scored.sort_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });

            for &(_, j) in scored.iter().take(k) {
                out[[i, fitted.y[j] as usize]] += 1.0;
            }
            for c in 0..fitted.n_classes {
                out[[i, c]] /= k as f32;
            }
        }
        Ok(out)
    }
}

impl Classifier for KNearestNeighbors {
    fn name(&self) -> &str {
        "K-Nearest Neighbors"
    }

    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        if self.k == 0 {
            return Err(PipelineError::Configuration(
                "k must be at least 1".to_string(),
            ));
        }
        if !(self.p >= 1.0) {
            return Err(PipelineError::Configuration(format!(
                "Minkowski exponent must be at least 1, got {}",
                self.p
            )));
        }
        check_fit_input(x, y)?;
        let n_classes = class_count(y)?;
        self.fitted = Some(Fitted {
            x: x.clone(),
            y: y.to_vec(),
            n_classes,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f32>) -> Result<Vec<i32>> {
        let votes = self.vote_fractions(x)?;
        Ok(votes
            .rows()
            .into_iter()
            .map(|row| argmax(&row.to_vec()) as i32)
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f32>) -> Option<Result<Array2<f32>>> {
        Some(self.vote_fractions(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn nearest_cluster_wins_the_vote() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [5.0, 5.0],
            [5.1, 5.0],
            [5.0, 5.1]
        ];
        let y = vec![0, 0, 0, 1, 1, 1];
        let mut model = KNearestNeighbors::new(3, 2.0);
        model.fit(&x, &y).unwrap();
        let query = array![[0.05, 0.05], [5.05, 5.05]];
        assert_eq!(model.predict(&query).unwrap(), vec![0, 1]);
    }

    #[test]
    fn vote_fractions_reflect_neighborhood_mix() {
        let x = array![[0.0], [0.1], [0.2], [0.3]];
        let y = vec![0, 0, 1, 1];
        let mut model = KNearestNeighbors::new(4, 2.0);
        model.fit(&x, &y).unwrap();
        let probs = model.predict_proba(&array![[0.15]]).unwrap().unwrap();
        assert!((probs[[0, 0]] - 0.5).abs() < 1e-6);
        assert!((probs[[0, 1]] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn oversized_k_clamps_to_training_size() {
        let x = array![[0.0], [1.0]];
        let y = vec![0, 1];
        let mut model = KNearestNeighbors::new(20, 2.0);
        model.fit(&x, &y).unwrap();
        let probs = model.predict_proba(&array![[0.4]]).unwrap().unwrap();
        assert!((probs[[0, 0]] - 0.5).abs() < 1e-6);
    }
}
