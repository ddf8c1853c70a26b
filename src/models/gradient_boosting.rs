//! Second-order gradient boosting over exact greedy regression trees.
//!
//! Each round fits a tree to the gradient/hessian of the logistic loss.
//! Splits maximize the regularized objective reduction
//! `½[G_L²/(H_L+λ) + G_R²/(H_R+λ) − G²/(H+λ)] − γ` subject to a minimum
//! child hessian sum, and leaves take weight `−G/(H+λ)`. Above two classes
//! one ensemble is trained per class (one-vs-rest). Accumulated split gains
//! double as the feature importances consumed by the selector.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::models::{argmax, check_fit_input, check_predict_input, class_count, not_fitted, sigmoid, Classifier};

/// L2 leaf regularization, fixed at the usual default.
const LAMBDA: f32 = 1.0;
/// Floor for per-row hessians so leaf weights stay finite.
const MIN_HESS: f32 = 1e-16;

/// Boosting hyperparameters. These are the seven knobs the randomized
/// search draws from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbmParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f32,
    /// Fraction of rows drawn (without replacement) per tree.
    pub subsample: f32,
    /// Fraction of columns drawn per tree.
    pub colsample_bytree: f32,
    /// Minimum hessian sum allowed in either child of a split.
    pub min_child_weight: f32,
    /// Minimum objective reduction required to keep a split.
    pub gamma: f32,
}

impl Default for GbmParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 3,
            learning_rate: 0.1,
            subsample: 1.0,
            colsample_bytree: 1.0,
            min_child_weight: 1.0,
            gamma: 0.0,
        }
    }
}

impl GbmParams {
    /// Reject parameter combinations no fit could honor.
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::Configuration(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(PipelineError::Configuration(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(PipelineError::Configuration(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(PipelineError::Configuration(format!(
                "subsample must be in (0, 1], got {}",
                self.subsample
            )));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(PipelineError::Configuration(format!(
                "colsample_bytree must be in (0, 1], got {}",
                self.colsample_bytree
            )));
        }
        if self.min_child_weight < 0.0 {
            return Err(PipelineError::Configuration(format!(
                "min_child_weight must be non-negative, got {}",
                self.min_child_weight
            )));
        }
        if self.gamma < 0.0 {
            return Err(PipelineError::Configuration(format!(
                "gamma must be non-negative, got {}",
                self.gamma
            )));
        }
        Ok(())
    }
}

fn leaf_weight(g: f32, h: f32) -> f32 {
    -g / (h + LAMBDA)
}

fn leaf_objective(g: f32, h: f32) -> f32 {
    -0.5 * g * g / (h + LAMBDA)
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        weight: f32,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn score(&self, row: ArrayView1<f32>) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { weight } => return *weight,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct SplitInfo {
    feature: usize,
    threshold: f32,
    gain: f32,
}

/// Grows one tree on fixed gradient/hessian vectors.
struct TreeBuilder<'a> {
    x: &'a Array2<f32>,
    grad: &'a [f32],
    hess: &'a [f32],
    params: &'a GbmParams,
    columns: &'a [usize],
}

impl<'a> TreeBuilder<'a> {
    fn build(&self, rows: Vec<usize>, importance: &mut [f64]) -> Tree {
        let mut nodes = Vec::new();
        self.grow(&mut nodes, rows, 0, importance);
        Tree { nodes }
    }

    fn grow(
        &self,
        nodes: &mut Vec<Node>,
        rows: Vec<usize>,
        depth: usize,
        importance: &mut [f64],
    ) -> usize {
        let g: f32 = rows.iter().map(|&i| self.grad[i]).sum();
        let h: f32 = rows.iter().map(|&i| self.hess[i]).sum();

        let split = if depth >= self.params.max_depth || rows.len() < 2 {
            None
        } else {
            self.best_split(&rows, g, h)
        };

        match split {
            None => {
                let idx = nodes.len();
                nodes.push(Node::Leaf {
                    weight: leaf_weight(g, h),
                });
                idx
            }
            Some(found) => {
                importance[found.feature] += found.gain as f64;
                let idx = nodes.len();
                // Placeholder, patched once both children exist.
                nodes.push(Node::Leaf { weight: 0.0 });
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .into_iter()
                    .partition(|&i| self.x[[i, found.feature]] <= found.threshold);
                let left = self.grow(nodes, left_rows, depth + 1, importance);
                let right = self.grow(nodes, right_rows, depth + 1, importance);
                nodes[idx] = Node::Split {
                    feature: found.feature,
                    threshold: found.threshold,
                    left,
                    right,
                };
                idx
            }
        }
    }

    /// Exact greedy search: scan sorted feature values, splitting between
    /// distinct neighbors, keeping the best positive gain that satisfies
    /// the minimum child hessian constraint.
    fn best_split(&self, rows: &[usize], g_total: f32, h_total: f32) -> Option<SplitInfo> {
        let parent_obj = leaf_objective(g_total, h_total);
        let mut best: Option<SplitInfo> = None;

        for &feature in self.columns {
            let mut order: Vec<usize> = rows.to_vec();
            order.sort_by(|&a, &b| {
                self.x[[a, feature]]
                    .partial_cmp(&self.x[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut g_left = 0.0f32;
            let mut h_left = 0.0f32;
            for w in 1..order.len() {
                let prev = order[w - 1];
                g_left += self.grad[prev];
                h_left += self.hess[prev];

                let v_prev = self.x[[prev, feature]];
                let v_cur = self.x[[order[w], feature]];
                if v_prev == v_cur {
                    continue;
                }

                let h_right = h_total - h_left;
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight {
                    continue;
                }

                let g_right = g_total - g_left;
                let gain = parent_obj
                    - leaf_objective(g_left, h_left)
                    - leaf_objective(g_right, h_right)
                    - self.params.gamma;
                let beats_best = best.as_ref().map_or(gain > 0.0, |b| gain > b.gain);
                if beats_best {
                    best = Some(SplitInfo {
                        feature,
                        threshold: 0.5 * (v_prev + v_cur),
                        gain,
                    });
                }
            }
        }

        best
    }
}

#[derive(Debug)]
struct Fitted {
    n_features: usize,
    n_classes: usize,
    /// One tree sequence per binary problem: a single sequence for two
    /// classes, one per class above that.
    ensembles: Vec<Vec<Tree>>,
    /// Normalized gain importances over the training columns.
    importance: Vec<f64>,
}

#[derive(Debug)]
pub struct GradientBoosting {
    label: String,
    pub params: GbmParams,
    pub seed: u64,
    fitted: Option<Fitted>,
}

impl GradientBoosting {
    pub fn new(params: GbmParams, seed: u64) -> Self {
        Self {
            label: "Gradient Boosting".to_string(),
            params,
            seed,
            fitted: None,
        }
    }

    /// Override the display name (the registry carries two differently
    /// configured boosting entries).
    pub fn with_name(mut self, name: &str) -> Self {
        self.label = name.to_string();
        self
    }

    /// Normalized gain importance per training column. `None` before fit.
    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|f| f.importance.as_slice())
    }

    fn margins(&self, fitted: &Fitted, x: &Array2<f32>) -> Vec<Vec<f32>> {
        fitted
            .ensembles
            .iter()
            .map(|trees| {
                x.rows()
                    .into_iter()
                    .map(|row| {
                        trees
                            .iter()
                            .map(|tree| self.params.learning_rate * tree.score(row))
                            .sum()
                    })
                    .collect()
            })
            .collect()
    }

    fn probabilities(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(self.name(), fitted.n_features, x)?;
        let margins = self.margins(fitted, x);
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

fn sample_fraction(total: usize, fraction: f32, rng: &mut StdRng) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..total).collect();
    }
    let take = ((total as f32 * fraction).round() as usize).clamp(1, total);
    let mut all: Vec<usize> = (0..total).collect();
    all.shuffle(rng);
    all.truncate(take);
    all.sort_unstable();
    all
}

impl Classifier for GradientBoosting {
    fn name(&self) -> &str {
        &self.label
    }

    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        self.params.validate()?;
        check_fit_input(x, y)?;
        let n_classes = class_count(y)?;
        if n_classes < 2 {
            return Err(PipelineError::Value(
                "boosting needs at least two classes".to_string(),
            ));
        }

        let n = x.nrows();
        let d = x.ncols();
        let n_problems = if n_classes == 2 { 1 } else { n_classes };
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut importance = vec![0.0f64; d];
        let mut ensembles = Vec::with_capacity(n_problems);

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

            let mut margins = vec![0.0f32; n];
            let mut trees = Vec::with_capacity(self.params.n_estimators);
            for _ in 0..self.params.n_estimators {
                let mut grad = vec![0.0f32; n];
                let mut hess = vec![0.0f32; n];
                for i in 0..n {
                    let p = sigmoid(margins[i]);
                    grad[i] = p - targets[i];
                    hess[i] = (p * (1.0 - p)).max(MIN_HESS);
                }

                let rows = sample_fraction(n, self.params.subsample, &mut rng);
                let columns = sample_fraction(d, self.params.colsample_bytree, &mut rng);
                let builder = TreeBuilder {
                    x,
                    grad: &grad,
                    hess: &hess,
                    params: &self.params,
                    columns: &columns,
                };
                let tree = builder.build(rows, &mut importance);
                for (i, row) in x.rows().into_iter().enumerate() {
                    margins[i] += self.params.learning_rate * tree.score(row);
                }
                trees.push(tree);
            }
            ensembles.push(trees);
        }

        let total: f64 = importance.iter().sum();
        if total > 0.0 {
            for v in &mut importance {
                *v /= total;
            }
        }

        self.fitted = Some(Fitted {
            n_features: d,
            n_classes,
            ensembles,
            importance,
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
