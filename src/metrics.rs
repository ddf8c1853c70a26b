//! Classification metrics: accuracy, weighted precision/recall/F1, confusion
//! matrices and ROC curves.
//!
//! Per-class undefined ratios (no predicted or no true samples for a class)
//! are treated as 0, matching the reporting convention used downstream.

use ndarray::Array2;

use crate::error::{PipelineError, Result};

/// Fraction of predictions equal to the truth.
pub fn accuracy(y_true: &[i32], y_pred: &[i32]) -> f32 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f32 / y_true.len() as f32
}

/// Per-class true-positive / false-positive / false-negative counts plus
/// support, indexed by class id.
fn per_class_counts(
    y_true: &[i32],
    y_pred: &[i32],
    n_classes: usize,
) -> (Vec<u64>, Vec<u64>, Vec<u64>, Vec<u64>) {
    let mut tp = vec![0u64; n_classes];
    let mut fp = vec![0u64; n_classes];
    let mut fn_ = vec![0u64; n_classes];
    let mut support = vec![0u64; n_classes];

    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        let (t, p) = (t as usize, p as usize);
        support[t] += 1;
        if t == p {
            tp[t] += 1;
        } else {
            fn_[t] += 1;
            if p < n_classes {
                fp[p] += 1;
            }
        }
    }

    (tp, fp, fn_, support)
}

fn ratio(num: u64, den: u64) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

/// Per-class precision, recall, F1 and support, indexed by class id.
pub fn per_class_scores(
    y_true: &[i32],
    y_pred: &[i32],
    n_classes: usize,
) -> Vec<ClassScores> {
    let (tp, fp, fn_, support) = per_class_counts(y_true, y_pred, n_classes);
    (0..n_classes)
        .map(|c| {
            let precision = ratio(tp[c], tp[c] + fp[c]);
            let recall = ratio(tp[c], tp[c] + fn_[c]);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassScores {
                precision,
                recall,
                f1,
                support: support[c],
            }
        })
        .collect()
}

/// Precision/recall/F1 for one class.
#[derive(Debug, Clone, Copy)]
pub struct ClassScores {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub support: u64,
}

fn weighted(scores: &[ClassScores], pick: impl Fn(&ClassScores) -> f32) -> f32 {
    let total: u64 = scores.iter().map(|s| s.support).sum();
    if total == 0 {
        return 0.0;
    }
    scores
        .iter()
        .map(|s| pick(s) * s.support as f32 / total as f32)
        .sum()
}

/// Support-weighted average precision across classes.
pub fn precision_weighted(y_true: &[i32], y_pred: &[i32], n_classes: usize) -> f32 {
    weighted(&per_class_scores(y_true, y_pred, n_classes), |s| s.precision)
}

/// Support-weighted average recall across classes.
pub fn recall_weighted(y_true: &[i32], y_pred: &[i32], n_classes: usize) -> f32 {
    weighted(&per_class_scores(y_true, y_pred, n_classes), |s| s.recall)
}

/// Support-weighted average F1 across classes.
pub fn f1_weighted(y_true: &[i32], y_pred: &[i32], n_classes: usize) -> f32 {
    weighted(&per_class_scores(y_true, y_pred, n_classes), |s| s.f1)
}

/// Class-by-class count grid: rows are true classes, columns predictions,
/// both in encoder order.
pub fn confusion_matrix(y_true: &[i32], y_pred: &[i32], n_classes: usize) -> Array2<u64> {
    let mut matrix = Array2::zeros((n_classes, n_classes));
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        let (t, p) = (t as usize, p as usize);
        if t < n_classes && p < n_classes {
            matrix[(t, p)] += 1;
        }
    }
    matrix
}

/// Human-readable per-class report in the familiar tabular layout.
pub fn classification_report(y_true: &[i32], y_pred: &[i32], class_names: &[String]) -> String {
    let n_classes = class_names.len();
    let scores = per_class_scores(y_true, y_pred, n_classes);
    let name_width = class_names
        .iter()
        .map(|n| n.len())
        .max()
        .unwrap_or(0)
        .max("accuracy".len());

    let mut out = String::new();
    out.push_str(&format!(
        "{:>width$}  precision    recall  f1-score   support\n\n",
        "",
        width = name_width
    ));
    for (name, s) in class_names.iter().zip(scores.iter()) {
        out.push_str(&format!(
            "{:>width$}  {:>9.2}  {:>8.2}  {:>8.2}  {:>8}\n",
            name,
            s.precision,
            s.recall,
            s.f1,
            s.support,
            width = name_width
        ));
    }
    let total: u64 = scores.iter().map(|s| s.support).sum();
    out.push_str(&format!(
        "\n{:>width$}  {:>9}  {:>8}  {:>8.2}  {:>8}\n",
        "accuracy",
        "",
        "",
        accuracy(y_true, y_pred),
        total,
        width = name_width
    ));
    out
}

// ---------------------------------------------------------------------------
// ROC curve
// ---------------------------------------------------------------------------

/// A single point on the ROC curve.
#[derive(Debug, Clone)]
pub struct RocPoint {
    /// Score threshold at which this point is computed.
    pub threshold: f32,
    /// False positive rate: FP / (FP + TN).
    pub fpr: f32,
    /// True positive rate (recall): TP / (TP + FN).
    pub tpr: f32,
}

/// ROC curve with trapezoidal AUC.
#[derive(Debug, Clone)]
pub struct RocCurve {
    /// Points on the curve, from (0, 0) to (1, 1).
    pub points: Vec<RocPoint>,
    pub auc: f32,
}

/// Compute the ROC curve from predicted scores and binary labels.
///
/// Sorts by descending score and walks thresholds, emitting one point per
/// distinct score so tied scores collapse into a single step. Fails when the
/// input is empty, mismatched, or single-class.
pub fn roc_curve(scores: &[f32], positives: &[bool]) -> Result<RocCurve> {
    if scores.is_empty() {
        return Err(PipelineError::Value("empty score vector".to_string()));
    }
    if scores.len() != positives.len() {
        return Err(PipelineError::Value(format!(
            "scores length {} != labels length {}",
            scores.len(),
            positives.len()
        )));
    }

    let total_pos = positives.iter().filter(|&&l| l).count();
    let total_neg = positives.len() - total_pos;
    if total_pos == 0 {
        return Err(PipelineError::Value("no positive samples".to_string()));
    }
    if total_neg == 0 {
        return Err(PipelineError::Value("no negative samples".to_string()));
    }

    // Descending score; ties put negatives first so the curve is pessimistic.
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| positives[a].cmp(&positives[b]))
    });

    let p = total_pos as f32;
    let n = total_neg as f32;

    let mut points = vec![RocPoint {
        threshold: f32::INFINITY,
        fpr: 0.0,
        tpr: 0.0,
    }];

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < indices.len() {
        let current_score = scores[indices[i]];
        while i < indices.len() && scores[indices[i]] == current_score {
            if positives[indices[i]] {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            threshold: current_score,
            fpr: fp as f32 / n,
            tpr: tp as f32 / p,
        });
    }

    let auc = trapezoidal_auc(&points);
    Ok(RocCurve { points, auc })
}

/// Sum of trapezoids between consecutive curve points.
fn trapezoidal_auc(points: &[RocPoint]) -> f32 {
    let mut auc = 0.0;
    for i in 1..points.len() {
        auc += (points[i].fpr - points[i - 1].fpr).abs() * (points[i].tpr + points[i - 1].tpr)
            / 2.0;
    }
    auc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_counts_matches() {
        let y_true = vec![0, 1, 1, 0];
        let y_pred = vec![0, 1, 0, 0];
        assert!((accuracy(&y_true, &y_pred) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn zero_division_yields_zero() {
        // Class 1 never predicted: precision for it is 0, not NaN.
        let y_true = vec![0, 1];
        let y_pred = vec![0, 0];
        let scores = per_class_scores(&y_true, &y_pred, 2);
        assert_eq!(scores[1].precision, 0.0);
        assert_eq!(scores[1].recall, 0.0);
        assert_eq!(scores[1].f1, 0.0);
        let f1 = f1_weighted(&y_true, &y_pred, 2);
        assert!(f1.is_finite());
    }

    #[test]
    fn confusion_rows_are_true_classes() {
        let y_true = vec![0, 0, 1, 1, 1];
        let y_pred = vec![0, 1, 1, 1, 0];
        let cm = confusion_matrix(&y_true, &y_pred, 2);
        assert_eq!(cm[(0, 0)], 1);
        assert_eq!(cm[(0, 1)], 1);
        assert_eq!(cm[(1, 0)], 1);
        assert_eq!(cm[(1, 1)], 2);
        // Row sums equal per-class true counts.
        assert_eq!(cm.row(0).sum(), 2);
        assert_eq!(cm.row(1).sum(), 3);
    }

    #[test]
    fn perfect_separation_has_auc_one() {
        let scores = vec![0.9, 0.8, 0.2, 0.1];
        let positives = vec![true, true, false, false];
        let roc = roc_curve(&scores, &positives).unwrap();
        assert!((roc.auc - 1.0).abs() < 1e-6);
        let first = roc.points.first().unwrap();
        let last = roc.points.last().unwrap();
        assert_eq!((first.fpr, first.tpr), (0.0, 0.0));
        assert_eq!((last.fpr, last.tpr), (1.0, 1.0));
    }

    #[test]
    fn random_scores_have_auc_half() {
        // Alternating labels with identical scores collapse to the diagonal.
        let scores = vec![0.5; 6];
        let positives = vec![true, false, true, false, true, false];
        let roc = roc_curve(&scores, &positives).unwrap();
        assert!((roc.auc - 0.5).abs() < 1e-6);
    }

    #[test]
    fn roc_rejects_single_class_input() {
        let scores = vec![0.5, 0.4];
        assert!(roc_curve(&scores, &[true, true]).is_err());
        assert!(roc_curve(&scores, &[false, false]).is_err());
    }

    #[test]
    fn report_contains_class_rows() {
        let y_true = vec![0, 1, 1];
        let y_pred = vec![0, 1, 1];
        let names = vec!["healthy".to_string(), "stroke".to_string()];
        let report = classification_report(&y_true, &y_pred, &names);
        assert!(report.contains("healthy"));
        assert!(report.contains("stroke"));
        assert!(report.contains("accuracy"));
    }
}
