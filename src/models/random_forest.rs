//! Random forest: bootstrap-sampled gini trees over random feature
//! subspaces, combined by averaging class probabilities.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::models::decision_tree::DecisionTree;
use crate::models::{argmax, check_fit_input, check_predict_input, class_count, not_fitted, Classifier};

struct Fitted {
    trees: Vec<(Vec<usize>, DecisionTree)>,
    n_features: usize,
    n_classes: usize,
}

pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
    fitted: Option<Fitted>,
}

impl RandomForest {
    pub fn new(n_estimators: usize, max_depth: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            max_depth,
            min_samples_split: 2,
            seed,
            fitted: None,
        }
    }

    fn probabilities(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(self.name(), fitted.n_features, x)?;
        let mut out = Array2::<f32>::zeros((x.nrows(), fitted.n_classes));
        for (features, tree) in &fitted.trees {
            let view = x.select(Axis(1), features);
            match tree.predict_proba(&view) {
                Some(result) => out += &result?,
                None => continue,
            }
        }
        out /= fitted.trees.len() as f32;
        Ok(out)
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "Random Forest"
    }

    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        check_fit_input(x, y)?;
        let n_classes = class_count(y)?;
        let n = x.nrows();
        let d = x.ncols();
        let subspace = ((d as f64).sqrt().ceil() as usize).clamp(1, d);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for t in 0..self.n_estimators {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(t as u64));

            let mut features: Vec<usize> = (0..d).collect();
            features.shuffle(&mut rng);
            features.truncate(subspace);
            features.sort_unstable();

            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let x_boot = x
                .select(Axis(0), &rows)
                .select(Axis(1), &features);
            let y_boot: Vec<i32> = rows.iter().map(|&i| y[i]).collect();

            let mut tree = DecisionTree::new(self.max_depth, self.min_samples_split);
            tree.fit_with_classes(&x_boot, &y_boot, n_classes)?;
            trees.push((features, tree));
        }

        self.fitted = Some(Fitted {
            trees,
            n_features: d,
            n_classes,
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
