//! CART-style decision tree with gini impurity splits.

use ndarray::Array2;

use crate::error::Result;
use crate::models::{argmax, check_fit_input, check_predict_input, class_count, not_fitted, Classifier};

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        probs: Vec<f32>,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct Fitted {
    nodes: Vec<Node>,
    n_features: usize,
    n_classes: usize,
}

/// A single gini tree. `max_depth` bounds the split depth and
/// `min_samples_split` the smallest node that may still split.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    pub max_depth: usize,
    pub min_samples_split: usize,
    fitted: Option<Fitted>,
}

impl DecisionTree {
    pub fn new(max_depth: usize, min_samples_split: usize) -> Self {
        Self {
            max_depth,
            min_samples_split: min_samples_split.max(2),
            fitted: None,
        }
    }

    /// Fit with an externally supplied class count. Ensemble callers use
    /// this so bootstrap resamples that miss a class still produce
    /// probability vectors of uniform width.
    pub(crate) fn fit_with_classes(
        &mut self,
        x: &Array2<f32>,
        y: &[i32],
        n_classes: usize,
    ) -> Result<()> {
        check_fit_input(x, y)?;
        let members: Vec<usize> = (0..x.nrows()).collect();
        let mut nodes = Vec::new();
        grow(
            &mut nodes,
            x,
            y,
            members,
            0,
            self.max_depth,
            self.min_samples_split,
            n_classes,
        );
        self.fitted = Some(Fitted {
            nodes,
            n_features: x.ncols(),
            n_classes,
        });
        Ok(())
    }

    fn leaf_probs(&self, fitted: &Fitted, row: ndarray::ArrayView1<f32>) -> Vec<f32> {
        let mut idx = 0;
        loop {
            match &fitted.nodes[idx] {
                Node::Leaf { probs } => return probs.clone(),
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

    fn probabilities(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| not_fitted(self.name()))?;
        check_predict_input(self.name(), fitted.n_features, x)?;
        let mut out = Array2::zeros((x.nrows(), fitted.n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let probs = self.leaf_probs(fitted, row);
            for (j, p) in probs.into_iter().enumerate() {
                out[[i, j]] = p;
            }
        }
        Ok(out)
    }
}

impl Classifier for DecisionTree {
    fn name(&self) -> &str {
        "Decision Tree"
    }

    fn fit(&mut self, x: &Array2<f32>, y: &[i32]) -> Result<()> {
        let n_classes = class_count(y)?;
        self.fit_with_classes(x, y, n_classes)
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

fn class_probs(y: &[i32], members: &[usize], n_classes: usize) -> Vec<f32> {
    let mut counts = vec![0usize; n_classes];
    for &i in members {
        counts[y[i] as usize] += 1;
    }
    let total = members.len() as f32;
    counts.into_iter().map(|c| c as f32 / total).collect()
}

fn gini(probs: &[f32]) -> f32 {
    1.0 - probs.iter().map(|p| p * p).sum::<f32>()
}

fn gini_from_counts(counts: &[usize], total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f32;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f32 / t;
            p * p
        })
        .sum::<f32>()
}

struct BestSplit {
    feature: usize,
    threshold: f32,
    score: f32,
}

/// Exhaustive split search over feature-value midpoints; returns the split
/// minimizing the size-weighted child gini, or None when nothing improves
/// on the node impurity.
fn best_split(
    x: &Array2<f32>,
    y: &[i32],
    members: &[usize],
    n_classes: usize,
    node_gini: f32,
) -> Option<BestSplit> {
    let n = members.len();
    let mut best: Option<BestSplit> = None;

    for feature in 0..x.ncols() {
        let mut order: Vec<usize> = members.to_vec();
        order.sort_by(|&a, &b| {
            x[[a, feature]]
                .partial_cmp(&x[[b, feature]])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_counts = vec![0usize; n_classes];
        let mut right_counts = vec![0usize; n_classes];
        for &i in &order {
            right_counts[y[i] as usize] += 1;
        }

        for w in 1..n {
            let prev = order[w - 1];
            left_counts[y[prev] as usize] += 1;
            right_counts[y[prev] as usize] -= 1;

            let v_prev = x[[prev, feature]];
            let v_cur = x[[order[w], feature]];
            if v_prev == v_cur {
                continue;
            }

            let weighted = (w as f32 * gini_from_counts(&left_counts, w)
                + (n - w) as f32 * gini_from_counts(&right_counts, n - w))
                / n as f32;
            let improves = weighted < node_gini - 1e-7;
            let beats_best = best.as_ref().map_or(true, |b| weighted < b.score);
            if improves && beats_best {
                best = Some(BestSplit {
                    feature,
                    threshold: 0.5 * (v_prev + v_cur),
                    score: weighted,
                });
            }
        }
    }

    best
}

#[allow(clippy::too_many_arguments)]
fn grow(
    nodes: &mut Vec<Node>,
    x: &Array2<f32>,
    y: &[i32],
    members: Vec<usize>,
    depth: usize,
    max_depth: usize,
    min_samples_split: usize,
    n_classes: usize,
) -> usize {
    let probs = class_probs(y, &members, n_classes);
    let node_gini = gini(&probs);

    let stop = depth >= max_depth || members.len() < min_samples_split || node_gini <= 0.0;
    let split = if stop {
        None
    } else {
        best_split(x, y, &members, n_classes, node_gini)
    };

    match split {
        None => {
            let idx = nodes.len();
            nodes.push(Node::Leaf { probs });
            idx
        }
        Some(found) => {
            let idx = nodes.len();
            // Placeholder, patched once both children exist.
            nodes.push(Node::Leaf { probs: Vec::new() });
            let (left_members, right_members): (Vec<usize>, Vec<usize>) = members
                .into_iter()
                .partition(|&i| x[[i, found.feature]] <= found.threshold);
            let left = grow(
                nodes,
                x,
                y,
                left_members,
                depth + 1,
                max_depth,
                min_samples_split,
                n_classes,
            );
            let right = grow(
                nodes,
                x,
                y,
                right_members,
                depth + 1,
                max_depth,
                min_samples_split,
                n_classes,
            );
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
