//! Combined over/under-sampling: SMOTE synthesis followed by edited
//! nearest-neighbour cleaning.
//!
//! Minority classes are oversampled to the majority count by interpolating
//! between same-class neighbours, then the combined set is cleaned by
//! removing every sample whose neighbourhood majority-votes against its own
//! label. Both steps are deterministic given the seed.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};

/// SMOTE + ENN resampler.
#[derive(Debug, Clone)]
pub struct SmoteEnn {
    /// Neighbour count for SMOTE interpolation.
    pub k_neighbors: usize,
    /// Neighbour count for the ENN cleaning vote.
    pub enn_neighbors: usize,
    pub seed: u64,
}

impl SmoteEnn {
    pub fn new(seed: u64) -> Self {
        Self {
            k_neighbors: 5,
            enn_neighbors: 3,
            seed,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k;
        self
    }

    pub fn with_enn_neighbors(mut self, k: usize) -> Self {
        self.enn_neighbors = k;
        self
    }

    /// Resample `(x, y)` into a rebalanced `(x', y')`.
    ///
    /// Output labels keep their input ids but may no longer cover a
    /// contiguous range when cleaning empties a class; callers re-encode
    /// (see `LabelEncoder::compact`). Fails when a class that needs
    /// oversampling has fewer than `k_neighbors + 1` members, or when
    /// cleaning leaves fewer than two classes.
    pub fn fit_resample(&self, x: &Array2<f32>, y: &[i32]) -> Result<(Array2<f32>, Vec<i32>)> {
        if x.nrows() != y.len() {
            return Err(PipelineError::Value(format!(
                "x has {} rows but y has {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(PipelineError::Value("cannot resample an empty dataset".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let (mut data, mut labels) = self.oversample(x, y, &mut rng)?;
        self.clean(&mut data, &mut labels)?;

        let mut classes: Vec<i32> = labels.clone();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(PipelineError::Value(format!(
                "resampling left {} class(es); need at least 2",
                classes.len()
            )));
        }

        let n_features = x.ncols();
        let n_rows = labels.len();
        let flat: Vec<f32> = data.into_iter().flatten().collect();
        let x_out = Array2::from_shape_vec((n_rows, n_features), flat)
            .expect("resampled rows have uniform width");
        Ok((x_out, labels))
    }

    /// SMOTE step: bring every class up to the majority count.
    fn oversample(
        &self,
        x: &Array2<f32>,
        y: &[i32],
        rng: &mut StdRng,
    ) -> Result<(Vec<Vec<f32>>, Vec<i32>)> {
        let groups = class_indices(y);
        let majority = groups
            .iter()
            .map(|(_, members)| members.len())
            .max()
            .unwrap_or(0);

        let mut data: Vec<Vec<f32>> = x.rows().into_iter().map(|r| r.to_vec()).collect();
        let mut labels = y.to_vec();

        for (class, members) in &groups {
            let deficit = majority - members.len();
            if deficit == 0 {
                continue;
            }
            if members.len() < self.k_neighbors + 1 {
                return Err(PipelineError::Value(format!(
                    "class {} has {} members; SMOTE with k={} needs at least {}",
                    class,
                    members.len(),
                    self.k_neighbors,
                    self.k_neighbors + 1
                )));
            }

            // Neighbour lists inside the class, computed once per class.
            let neighbor_lists: Vec<Vec<usize>> = members
                .iter()
                .map(|&i| {
                    nearest_neighbors(x, i, members, self.k_neighbors)
                })
                .collect();

            for _ in 0..deficit {
                let pick = rng.gen_range(0..members.len());
                let base = members[pick];
                let neighbors = &neighbor_lists[pick];
                let neighbor = neighbors[rng.gen_range(0..neighbors.len())];
                let factor: f32 = rng.gen_range(0.0..1.0);

                let synthetic: Vec<f32> = x
                    .row(base)
                    .iter()
                    .zip(x.row(neighbor).iter())
                    .map(|(a, b)| a + factor * (b - a))
                    .collect();
                data.push(synthetic);
                labels.push(*class);
            }
        }

        Ok((data, labels))
    }

    /// ENN step: drop samples whose neighbourhood majority disagrees with
    /// their own label. Votes are computed against the full combined set
    /// before any removal, then all flagged rows are dropped at once.
    fn clean(&self, data: &mut Vec<Vec<f32>>, labels: &mut Vec<i32>) -> Result<()> {
        let n = data.len();
        if n <= self.enn_neighbors {
            return Ok(());
        }

        let mut remove = vec![false; n];
        for i in 0..n {
            let neighbors = nearest_neighbors_vec(data, i, self.enn_neighbors);
            let mut votes: Vec<(i32, usize)> = Vec::new();
            for &j in &neighbors {
                match votes.iter_mut().find(|(c, _)| *c == labels[j]) {
                    Some((_, count)) => *count += 1,
                    None => votes.push((labels[j], 1)),
                }
            }
            let top = votes.iter().map(|&(_, c)| c).max().unwrap_or(0);
            let leaders: Vec<i32> = votes
                .iter()
                .filter(|&&(_, c)| c == top)
                .map(|&(c, _)| c)
                .collect();
            // A tie is not a majority against the sample.
            if leaders.len() == 1 && leaders[0] != labels[i] {
                remove[i] = true;
            }
        }

        let mut kept_data = Vec::with_capacity(n);
        let mut kept_labels = Vec::with_capacity(n);
        for i in 0..n {
            if !remove[i] {
                kept_data.push(std::mem::take(&mut data[i]));
                kept_labels.push(labels[i]);
            }
        }
        if kept_labels.is_empty() {
            return Err(PipelineError::Value(
                "edited nearest neighbours removed every sample".to_string(),
            ));
        }
        *data = kept_data;
        *labels = kept_labels;
        Ok(())
    }
}

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

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum()
}

/// The `k` nearest rows to `x[target]` among `candidates`, excluding the
/// target itself. Distance ties resolve by ascending row index.
fn nearest_neighbors(x: &Array2<f32>, target: usize, candidates: &[usize], k: usize) -> Vec<usize> {
    let target_row = x.row(target);
    let mut scored: Vec<(f32, usize)> = candidates
        .iter()
        .filter(|&&i| i != target)
        .map(|&i| {
            let d = x
                .row(i)
                .iter()
                .zip(target_row.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            (d, i)
        })
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));
    scored.into_iter().take(k).map(|(_, i)| i).collect()
}

/// Same search over a row-major `Vec<Vec<f32>>` staging buffer.
fn nearest_neighbors_vec(data: &[Vec<f32>], target: usize, k: usize) -> Vec<usize> {
    let mut scored: Vec<(f32, usize)> = (0..data.len())
        .filter(|&i| i != target)
        .map(|i| (squared_distance(&data[target], &data[i]), i))
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1)));
    scored.into_iter().take(k).map(|(_, i)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Two well-separated clusters, 40 vs 10 rows.
    fn imbalanced() -> (Array2<f32>, Vec<i32>) {
        let mut rows = Vec::new();
        let mut y = Vec::new();
        for i in 0..40 {
            rows.push(vec![0.0 + (i % 7) as f32 * 0.05, 0.0 + (i % 5) as f32 * 0.04]);
            y.push(0);
        }
        for i in 0..10 {
            rows.push(vec![5.0 + (i % 3) as f32 * 0.05, 5.0 + (i % 4) as f32 * 0.03]);
            y.push(1);
        }
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        (Array2::from_shape_vec((50, 2), flat).unwrap(), y)
    }

    fn count(y: &[i32], class: i32) -> usize {
        y.iter().filter(|&&v| v == class).count()
    }

    #[test]
    fn balances_minority_class() {
        let (x, y) = imbalanced();
        let (x2, y2) = SmoteEnn::new(42).fit_resample(&x, &y).unwrap();
        assert_eq!(x2.nrows(), y2.len());
        let c0 = count(&y2, 0);
        let c1 = count(&y2, 1);
        // Clusters are well separated so ENN removes little; counts should
        // end up near parity.
        assert!(c1 as f32 >= c0 as f32 * 0.8, "minority {} vs majority {}", c1, c0);
    }

    #[test]
    fn deterministic_given_seed() {
        let (x, y) = imbalanced();
        let (xa, ya) = SmoteEnn::new(7).fit_resample(&x, &y).unwrap();
        let (xb, yb) = SmoteEnn::new(7).fit_resample(&x, &y).unwrap();
        assert_eq!(ya, yb);
        assert_eq!(xa, xb);
    }

    #[test]
    fn synthetic_rows_interpolate_within_class() {
        let (x, y) = imbalanced();
        let (x2, y2) = SmoteEnn::new(3).fit_resample(&x, &y).unwrap();
        // Every class-1 row must stay inside the class-1 bounding box.
        for (row, &label) in x2.rows().into_iter().zip(y2.iter()) {
            if label == 1 {
                assert!(row[0] >= 5.0 - 1e-4 && row[0] <= 5.2 + 1e-4);
                assert!(row[1] >= 5.0 - 1e-4 && row[1] <= 5.1 + 1e-4);
            }
        }
    }

    #[test]
    fn rejects_class_smaller_than_k_plus_one() {
        let x = Array2::from_shape_vec(
            (8, 1),
            vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 10.0, 10.1],
        )
        .unwrap();
        let y = vec![0, 0, 0, 0, 0, 0, 1, 1];
        let err = SmoteEnn::new(0).fit_resample(&x, &y).unwrap_err();
        match err {
            PipelineError::Value(msg) => assert!(msg.contains("SMOTE"), "message: {}", msg),
            other => panic!("expected value error, got {:?}", other),
        }
    }
}
