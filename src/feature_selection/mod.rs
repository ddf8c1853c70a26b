//! Feature selection utilities.
//!
//! This module contains the two ranking stages used by the pipeline: an
//! ensemble-importance ranking and univariate ANOVA F-scoring (a la
//! scikit-learn's SelectKBest).
pub mod importance;
pub mod univariate;

pub use importance::ImportanceSelector;
pub use univariate::{f_classif, SelectKBest};
