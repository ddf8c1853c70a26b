//! Ensemble-importance feature ranking.
//!
//! Stage one of the selection funnel: a boosted ensemble is fitted on the
//! full set and features are ranked by accumulated split gain.

use ndarray::{Array2, Axis};

use crate::error::Result;
use crate::models::{Classifier, GbmParams, GradientBoosting};

/// Keeps the `top_n` features with the highest ensemble gain importance.
pub struct ImportanceSelector {
    pub top_n: usize,
    /// Ranking-ensemble configuration. The default mirrors a stock
    /// 500-round booster.
    pub params: GbmParams,
    pub seed: u64,
}

impl ImportanceSelector {
    pub fn new(top_n: usize, seed: u64) -> Self {
        Self {
            top_n,
            params: GbmParams {
                n_estimators: 500,
                max_depth: 6,
                learning_rate: 0.3,
                ..GbmParams::default()
            },
            seed,
        }
    }

    /// Shrink the ranking ensemble, mostly useful for small inputs.
    pub fn with_params(mut self, params: GbmParams) -> Self {
        self.params = params;
        self
    }

    /// Rank features on `(x, y)` and return the support indices of the
    /// `top_n` most important columns, ascending so downstream column
    /// selection preserves the original relative order. Importance ties
    /// break toward the lower column index.
    pub fn fit(&self, x: &Array2<f32>, y: &[i32]) -> Result<Vec<usize>> {
        let mut ensemble = GradientBoosting::new(self.params.clone(), self.seed);
        ensemble.fit(x, y)?;
        let importance = ensemble
            .feature_importances()
            .map(|v| v.to_vec())
            .unwrap_or_default();

        let keep = self.top_n.min(importance.len());
        if keep < self.top_n {
            log::warn!(
                "requested {} features but only {} available; keeping all",
                self.top_n,
                importance.len()
            );
        }

        let mut indices: Vec<usize> = (0..importance.len()).collect();
        // Stable sort, so ties keep ascending column order.
        indices.sort_by(|&i, &j| {
            importance[j]
                .partial_cmp(&importance[i])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut support: Vec<usize> = indices.into_iter().take(keep).collect();
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
