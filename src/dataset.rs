//! In-memory representation of the loaded tabular dataset.
//!
//! A `Dataset` holds the numeric feature matrix, the feature column names and
//! the raw (still categorical) label column. Deduplication happens here so the
//! loader stays a pure parser.

use std::collections::HashSet;

use ndarray::Array2;

#[derive(Debug, Clone)]
pub struct Dataset {
    /// Feature column names, in file order.
    pub feature_names: Vec<String>,
    /// Feature values, rows are samples.
    pub x: Array2<f32>,
    /// Raw label per row, not yet encoded.
    pub labels: Vec<String>,
}

impl Dataset {
    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Drop exact-duplicate rows (all feature values and the label equal),
    /// keeping the first occurrence. Returns the number of rows removed.
    ///
    /// Equality is bit-exact on the feature values, so the operation is
    /// idempotent: a second pass removes nothing.
    pub fn dedup_rows(&mut self) -> usize {
        let n = self.n_samples();
        let mut seen: HashSet<(Vec<u32>, String)> = HashSet::with_capacity(n);
        let mut keep: Vec<usize> = Vec::with_capacity(n);

        for (i, row) in self.x.rows().into_iter().enumerate() {
            let key = (
                row.iter().map(|v| v.to_bits()).collect::<Vec<u32>>(),
                self.labels[i].clone(),
            );
            if seen.insert(key) {
                keep.push(i);
            }
        }

        let removed = n - keep.len();
        if removed > 0 {
            let ncols = self.n_features();
            let mut data = Vec::with_capacity(keep.len() * ncols);
            let mut labels = Vec::with_capacity(keep.len());
            for &i in &keep {
                data.extend(self.x.row(i).iter().copied());
                labels.push(self.labels[i].clone());
            }
            self.x = Array2::from_shape_vec((keep.len(), ncols), data)
                .expect("dedup_rows: shape mismatch");
            self.labels = labels;
        }
        removed
    }

    pub fn log_summary(&self) {
        println!("----- Input Data Summary -----");
        println!(
            "Info: {} samples, {} feature columns",
            self.n_samples(),
            self.n_features()
        );
        let mut counts: Vec<(String, usize)> = Vec::new();
        for label in &self.labels {
            match counts.iter_mut().find(|(name, _)| name == label) {
                Some((_, c)) => *c += 1,
                None => counts.push((label.clone(), 1)),
            }
        }
        for (name, count) in &counts {
            println!("Info: class {:?} has {} samples", name, count);
        }
        println!("-------------------------------");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut ds = Dataset {
            feature_names: vec!["a".into(), "b".into()],
            x: array![[1.0, 2.0], [3.0, 4.0], [1.0, 2.0], [5.0, 6.0]],
            labels: vec!["x".into(), "y".into(), "x".into(), "y".into()],
        };
        let removed = ds.dedup_rows();
        assert_eq!(removed, 1);
        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.x.row(0).to_vec(), vec![1.0, 2.0]);
        assert_eq!(ds.x.row(1).to_vec(), vec![3.0, 4.0]);
        assert_eq!(ds.x.row(2).to_vec(), vec![5.0, 6.0]);
    }

    #[test]
    fn dedup_respects_label_differences() {
        // Same features, different label: both rows stay.
        let mut ds = Dataset {
            feature_names: vec!["a".into()],
            x: array![[1.0], [1.0]],
            labels: vec!["x".into(), "y".into()],
        };
        assert_eq!(ds.dedup_rows(), 0);
        assert_eq!(ds.n_samples(), 2);
    }

    #[test]
    fn dedup_is_idempotent() {
        let mut ds = Dataset {
            feature_names: vec!["a".into()],
            x: array![[1.0], [1.0], [2.0]],
            labels: vec!["x".into(), "x".into(), "x".into()],
        };
        assert_eq!(ds.dedup_rows(), 1);
        assert_eq!(ds.dedup_rows(), 0);
    }
}
