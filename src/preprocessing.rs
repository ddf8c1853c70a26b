//! Preprocessing transforms fitted once and passed forward by value.
//!
//! Provides the per-column `StandardScaler` and the categorical
//! `LabelEncoder`. Both are plain data: fitting returns a new value, nothing
//! is cached globally, and a transform never re-fits.

use ndarray::Array2;

use crate::error::{PipelineError, Result};

/// Per-column mean/standard-deviation standardizer.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl StandardScaler {
    /// Fit a scaler on `x` (rows are samples, columns features).
    ///
    /// Fails with a `Value` error when a column has zero variance, since the
    /// transform would divide by zero. Callers should drop constant columns
    /// before fitting.
    pub fn fit(x: &Array2<f32>) -> Result<Self> {
        let (nrows, ncols) = x.dim();
        if nrows == 0 || ncols == 0 {
            return Err(PipelineError::Value(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let nrows_f = nrows as f32;
        let mut mean = vec![0.0f32; ncols];
        for row in x.rows() {
            for (c, v) in row.iter().enumerate() {
                mean[c] += v;
            }
        }
        for v in mean.iter_mut() {
            *v /= nrows_f;
        }

        let mut std = vec![0.0f32; ncols];
        for row in x.rows() {
            for (c, v) in row.iter().enumerate() {
                let d = v - mean[c];
                std[c] += d * d;
            }
        }
        for (c, v) in std.iter_mut().enumerate() {
            *v = (*v / nrows_f).sqrt();
            if *v == 0.0 {
                return Err(PipelineError::Value(format!(
                    "column {} has zero standard deviation",
                    c
                )));
            }
        }

        Ok(StandardScaler { mean, std })
    }

    /// Standardize every column of `x` with the fitted parameters.
    pub fn transform(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        self.check_width(x)?;
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = (*v - self.mean[c]) / self.std[c];
            }
        }
        Ok(out)
    }

    /// Map standardized values back to the original scale.
    pub fn inverse_transform(&self, x: &Array2<f32>) -> Result<Array2<f32>> {
        self.check_width(x)?;
        let mut out = x.clone();
        for mut row in out.rows_mut() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = *v * self.std[c] + self.mean[c];
            }
        }
        Ok(out)
    }

    /// Fit on `x` and return the transformed matrix together with the scaler.
    pub fn fit_transform(x: &Array2<f32>) -> Result<(Self, Array2<f32>)> {
        let scaler = Self::fit(x)?;
        let transformed = scaler.transform(x)?;
        Ok((scaler, transformed))
    }

    fn check_width(&self, x: &Array2<f32>) -> Result<()> {
        if x.ncols() != self.mean.len() {
            return Err(PipelineError::Value(format!(
                "scaler fitted on {} columns, got {}",
                self.mean.len(),
                x.ncols()
            )));
        }
        Ok(())
    }
}

/// Categorical label encoder mapping class names to dense integer ids.
///
/// Categories are ordered lexicographically at fit time, the same convention
/// the metrics and confusion-matrix axes rely on downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit the encoder on raw labels. Distinct values are sorted, then
    /// numbered from 0.
    pub fn fit(labels: &[String]) -> Self {
        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();
        LabelEncoder { classes }
    }

    /// Encode raw labels through the fitted mapping.
    pub fn transform(&self, labels: &[String]) -> Result<Vec<i32>> {
        labels
            .iter()
            .map(|label| {
                self.classes
                    .iter()
                    .position(|c| c == label)
                    .map(|idx| idx as i32)
                    .ok_or_else(|| {
                        PipelineError::Value(format!("unknown class label {:?}", label))
                    })
            })
            .collect()
    }

    /// Fit and encode in one step.
    pub fn fit_transform(labels: &[String]) -> (Self, Vec<i32>) {
        let encoder = Self::fit(labels);
        let encoded = encoder
            .transform(labels)
            .expect("labels the encoder was fitted on are always known");
        (encoder, encoded)
    }

    /// Map encoded ids back to their class names.
    pub fn inverse_transform(&self, y: &[i32]) -> Result<Vec<String>> {
        y.iter()
            .map(|&id| {
                self.classes
                    .get(id as usize)
                    .cloned()
                    .ok_or_else(|| PipelineError::Value(format!("unknown class id {}", id)))
            })
            .collect()
    }

    /// Class names in encoder order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Rebuild the encoder around the class ids still present in `y`,
    /// renumbering them contiguously from 0, and rewrite `y` accordingly.
    ///
    /// Resampling can drop a class entirely; downstream one-vs-rest
    /// binarization needs densely numbered classes, so the surviving
    /// categories are compacted while keeping their relative order.
    pub fn compact(&self, y: &[i32]) -> Result<(Self, Vec<i32>)> {
        let mut present: Vec<i32> = y.to_vec();
        present.sort_unstable();
        present.dedup();

        if present.is_empty() {
            return Err(PipelineError::Value(
                "cannot compact an empty label vector".to_string(),
            ));
        }

        let mut classes = Vec::with_capacity(present.len());
        for &old in &present {
            let name = self.classes.get(old as usize).ok_or_else(|| {
                PipelineError::Value(format!("unknown class id {} during compaction", old))
            })?;
            classes.push(name.clone());
        }

        let remapped = y
            .iter()
            .map(|&old| {
                present
                    .iter()
                    .position(|&p| p == old)
                    .map(|idx| idx as i32)
                    .expect("every id in y is in the present set")
            })
            .collect();

        Ok((LabelEncoder { classes }, remapped))
    }
}
