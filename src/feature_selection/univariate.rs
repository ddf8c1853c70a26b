//! Univariate feature selection following scikit-learn's API.
//!
//! See: https://scikit-learn.org/stable/modules/feature_selection.html#univariate-feature-selection

use ndarray::{Array1, Array2, Axis};
use statrs::distribution::{ContinuousCDF, FisherSnedecor};

use crate::error::{PipelineError, Result};

/// Compute the ANOVA F-value for each feature against a class target.
///
/// This runs a one-way ANOVA per feature: samples are grouped by class
/// label and the between-group variance is compared against the
/// within-group variance.
///
/// # Parameters
///
/// * `x` - A 2D array of shape (n_samples, n_features) representing the
///   data matrix (features).
/// * `y` - A slice of length n_samples with integer class labels.
/// * `force_finite` - A boolean indicating whether to force F-statistics
///   and associated p-values to be finite. Infinite statistics (a feature
///   constant within every class but varying between classes) become
///   `f64::MAX` with p-value 0; NaN statistics (a feature constant
///   everywhere) become 0 with p-value 1.
///
/// # Returns
///
/// A tuple containing:
/// - An array of shape (n_features,) with F-statistics for each feature.
/// - An array of shape (n_features,) with p-values associated with each
///   F-statistic.
pub fn f_classif(
    x: &Array2<f32>,
    y: &[i32],
    force_finite: bool,
) -> Result<(Array1<f64>, Array1<f64>)> {
    let n_samples = x.nrows();
    let n_features = x.ncols();
    if n_samples != y.len() {
        return Err(PipelineError::Value(format!(
            "x has {} rows but y has {} labels",
            n_samples,
            y.len()
        )));
    }

    let mut classes: Vec<i32> = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    let n_classes = classes.len();
    if n_classes < 2 {
        return Err(PipelineError::Value(format!(
            "ANOVA F-test needs at least 2 classes, got {}",
            n_classes
        )));
    }
    if n_samples <= n_classes {
        return Err(PipelineError::Value(format!(
            "ANOVA F-test needs more samples ({}) than classes ({})",
            n_samples, n_classes
        )));
    }

    let groups: Vec<Vec<usize>> = classes
        .iter()
        .map(|&c| {
            y.iter()
                .enumerate()
                .filter(|&(_, &label)| label == c)
                .map(|(i, _)| i)
                .collect()
        })
        .collect();

    let dfbn = (n_classes - 1) as f64;
    let dfwn = (n_samples - n_classes) as f64;
    let f_dist = FisherSnedecor::new(dfbn, dfwn).map_err(|e| {
        PipelineError::Value(format!("invalid F-distribution parameters: {}", e))
    })?;

    let mut f_statistic = Array1::zeros(n_features);
    let mut p_values = Array1::zeros(n_features);

    for (j, col) in x.axis_iter(Axis(1)).enumerate() {
        let values: Vec<f64> = col.iter().map(|&v| v as f64).collect();
        let total_sum: f64 = values.iter().sum();
        let ss_all: f64 = values.iter().map(|v| v * v).sum();
        let sstot = ss_all - total_sum.powi(2) / n_samples as f64;

        // Between-group sum of squares from per-class sums.
        let mut ssbn = 0.0;
        for members in &groups {
            let class_sum: f64 = members.iter().map(|&i| values[i]).sum();
            ssbn += class_sum.powi(2) / members.len() as f64;
        }
        ssbn -= total_sum.powi(2) / n_samples as f64;
        let sswn = sstot - ssbn;

        let msb = ssbn / dfbn;
        let msw = sswn / dfwn;
        let mut f = msb / msw;
        let mut p = if f.is_finite() { 1.0 - f_dist.cdf(f) } else { f64::NAN };

        if force_finite && !f.is_finite() {
            if f.is_infinite() {
                f = f64::MAX;
                p = 0.0;
            } else {
                f = 0.0;
                p = 1.0;
            }
        }
        f_statistic[j] = f;
        p_values[j] = p;
    }

    Ok((f_statistic, p_values))
}

/// Selects the k features with the highest ANOVA F-score.
///
/// This follows scikit-learn's SelectKBest with f_classif as the scoring
/// function. When `k` exceeds the number of columns, every column is kept.
pub struct SelectKBest {
    /// The number of top features to select.
    k: usize,
}

impl SelectKBest {
    pub fn new(k: usize) -> Self {
        SelectKBest { k }
    }

    /// Fits the selector and returns the support indices of the k best
    /// features, in ascending column order so that a later
    /// `select(Axis(1), ..)` preserves the original relative layout.
    pub fn fit(&self, x: &Array2<f32>, y: &[i32]) -> Result<Vec<usize>> {
        let (f_scores, _) = f_classif(x, y, true)?;
        let k = self.k.min(f_scores.len());
        if k < self.k {
            log::warn!(
                "requested {} features but only {} available; keeping all",
                self.k,
                f_scores.len()
            );
        }

        let mut indices: Vec<usize> = (0..f_scores.len()).collect();
        // Stable sort, so ties keep ascending column order.
        indices.sort_by(|&i, &j| {
            f_scores[j]
                .partial_cmp(&f_scores[i])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut support: Vec<usize> = indices.into_iter().take(k).collect();
        support.sort_unstable();
        Ok(support)
    }

    /// Fit on `(x, y)` and return the column-reduced copy of `x` together
    /// with the support indices.
    pub fn fit_transform(&self, x: &Array2<f32>, y: &[i32]) -> Result<(Array2<f32>, Vec<usize>)> {
        let support = self.fit(x, y)?;
        Ok((x.select(Axis(1), &support), support))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// 12 samples, 4 features: [noise, separating, constant, weakly separating].
    fn toy() -> (Array2<f32>, Vec<i32>) {
        let x = Array2::from_shape_vec(
            (12, 4),
            vec![
                0.3, 0.0, 5.0, 0.1, //
                -0.2, 0.1, 5.0, 0.0, //
                0.1, -0.1, 5.0, 0.2, //
                0.4, 0.05, 5.0, 0.15, //
                -0.3, 0.0, 5.0, 0.05, //
                0.2, 0.1, 5.0, 0.1, //
                0.1, 4.0, 5.0, 0.6, //
                -0.1, 4.1, 5.0, 0.7, //
                0.3, 3.9, 5.0, 0.5, //
                0.0, 4.0, 5.0, 0.65, //
                -0.2, 4.2, 5.0, 0.55, //
                0.2, 4.0, 5.0, 0.6, //
            ],
        )
        .unwrap();
        let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];
        (x, y)
    }

    #[test]
    fn separating_feature_scores_highest() {
        let (x, y) = toy();
        let (f, p) = f_classif(&x, &y, true).unwrap();
        assert!(f[1] > f[0]);
        assert!(f[1] > f[3]);
        assert!(f[3] > f[0]);
        assert!(p[1] < 0.01, "p-value for separating feature: {}", p[1]);
    }

    #[test]
    fn constant_feature_scores_zero() {
        let (x, y) = toy();
        let (f, p) = f_classif(&x, &y, true).unwrap();
        assert_eq!(f[2], 0.0);
        assert_eq!(p[2], 1.0);
    }

    #[test]
    fn support_is_ascending_and_deterministic() {
        let (x, y) = toy();
        let a = SelectKBest::new(2).fit(&x, &y).unwrap();
        let b = SelectKBest::new(2).fit(&x, &y).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec![1, 3]);
    }

    #[test]
    fn oversized_k_keeps_every_column() {
        let (x, y) = toy();
        let (reduced, support) = SelectKBest::new(64).fit_transform(&x, &y).unwrap();
        assert_eq!(reduced.ncols(), 4);
        assert_eq!(support, vec![0, 1, 2, 3]);
    }

    #[test]
    fn rejects_single_class_input() {
        let (x, _) = toy();
        let y = vec![0; 12];
        assert!(f_classif(&x, &y, true).is_err());
    }
}
