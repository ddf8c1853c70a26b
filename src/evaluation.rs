//! Fits every registry model on the train split, scores it on the test
//! split, and aggregates the comparison.

use ndarray::Array2;

use crate::error::{PipelineError, Result};
use crate::metrics::{
    accuracy, classification_report, confusion_matrix, f1_weighted, precision_weighted,
    recall_weighted, roc_curve, RocCurve,
};
use crate::model_selection::Split;
use crate::models::Classifier;
use crate::preprocessing::LabelEncoder;

/// Everything measured for one model on the shared test split.
#[derive(Debug, Clone)]
pub struct ModelReport {
    pub name: String,
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    /// Rows are true classes, columns predicted, both in encoder order.
    pub confusion: ndarray::Array2<u64>,
    pub report_text: String,
    /// One curve per class (one-vs-rest), present only for models with a
    /// probability capability.
    pub roc_curves: Option<Vec<RocCurve>>,
    /// Class-membership scores on the test split, kept for the threshold
    /// sweep chart. Present only for probability models.
    pub test_scores: Option<Array2<f32>>,
}

/// The full comparison: one report per model plus the winner.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub reports: Vec<ModelReport>,
    /// Index into `reports`; the first model reaching the top accuracy.
    pub best: usize,
}

impl Comparison {
    pub fn best_report(&self) -> &ModelReport {
        &self.reports[self.best]
    }
}

pub struct Evaluator<'a> {
    split: &'a Split,
    encoder: &'a LabelEncoder,
}

impl<'a> Evaluator<'a> {
    pub fn new(split: &'a Split, encoder: &'a LabelEncoder) -> Self {
        Self { split, encoder }
    }

    /// Fit and score every model in the registry, in order. Each model is
    /// handled independently; a failure in one aborts the run rather than
    /// skewing the comparison.
    pub fn evaluate(&self, models: &mut [Box<dyn Classifier>]) -> Result<Comparison> {
        if models.is_empty() {
            return Err(PipelineError::Value(
                "the registry has no models to evaluate".to_string(),
            ));
        }

        let class_names = self.encoder.classes();
        let n_classes = class_names.len();
        let mut reports = Vec::with_capacity(models.len());

        for model in models.iter_mut() {
            let report = self.evaluate_one(model.as_mut(), n_classes, class_names)?;
            print_model_block(&report);
            reports.push(report);
        }

        // First model reaching the maximum accuracy wins ties.
        let mut best = 0;
        for (i, report) in reports.iter().enumerate().skip(1) {
            if report.accuracy > reports[best].accuracy {
                best = i;
            }
        }

        print_ranked_summary(&reports, best);
        Ok(Comparison { reports, best })
    }

    fn evaluate_one(
        &self,
        model: &mut dyn Classifier,
        n_classes: usize,
        class_names: &[String],
    ) -> Result<ModelReport> {
        let split = self.split;
        model.fit(&split.x_train, &split.y_train)?;
        let predictions = model.predict(&split.x_test)?;
        let y_test = &split.y_test;

        let acc = accuracy(y_test, &predictions);
        let precision = precision_weighted(y_test, &predictions, n_classes);
        let recall = recall_weighted(y_test, &predictions, n_classes);
        let f1 = f1_weighted(y_test, &predictions, n_classes);
        let confusion = confusion_matrix(y_test, &predictions, n_classes);
        let report_text = classification_report(y_test, &predictions, class_names);

        let (roc_curves, test_scores) = match model.predict_proba(&split.x_test) {
            None => (None, None),
            Some(scores) => {
                let scores = scores?;
                let curves = per_class_roc(&scores, y_test, n_classes)?;
                (Some(curves), Some(scores))
            }
        };

        Ok(ModelReport {
            name: model.name().to_string(),
            accuracy: acc,
            precision,
            recall,
            f1,
            confusion,
            report_text,
            roc_curves,
            test_scores,
        })
    }
}

/// One-vs-rest ROC per class from a probability matrix.
fn per_class_roc(scores: &Array2<f32>, y_true: &[i32], n_classes: usize) -> Result<Vec<RocCurve>> {
    if scores.ncols() != n_classes {
        return Err(PipelineError::Value(format!(
            "probability matrix has {} columns for {} classes",
            scores.ncols(),
            n_classes
        )));
    }
    let mut curves = Vec::with_capacity(n_classes);
    for class in 0..n_classes {
        let class_scores: Vec<f32> = scores.column(class).iter().cloned().collect();
        let positives: Vec<bool> = y_true.iter().map(|&label| label as usize == class).collect();
        curves.push(roc_curve(&class_scores, &positives)?);
    }
    Ok(curves)
}

fn print_model_block(report: &ModelReport) {
    println!();
    println!("Model: {}", report.name);
    println!("Confusion Matrix:");
    for row in report.confusion.rows() {
        let cells: Vec<String> = row.iter().map(|c| format!("{:>6}", c)).collect();
        println!("  [{}]", cells.join(" "));
    }
    println!("Classification Report:");
    println!("{}", report.report_text);
}

fn print_ranked_summary(reports: &[ModelReport], best: usize) {
    println!();
    println!("Final Model Comparison:");
    for (i, report) in reports.iter().enumerate() {
        let highlight = if i == best { " (Highest Accuracy)" } else { "" };
        println!("{}: {:.1}%{}", report.name, report.accuracy * 100.0, highlight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_selection::train_test_split;
    use crate::models::{DecisionTree, GaussianNb, PassiveAggressive};
    use ndarray::Array2;

    fn fixture() -> (Split, LabelEncoder) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..30 {
            rows.push(vec![-1.0 - (i % 5) as f32 * 0.1, (i % 3) as f32 * 0.2]);
            labels.push("healthy".to_string());
        }
        for i in 0..30 {
            rows.push(vec![1.0 + (i % 5) as f32 * 0.1, (i % 3) as f32 * 0.2]);
            labels.push("stroke".to_string());
        }
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let x = Array2::from_shape_vec((60, 2), flat).unwrap();

        let (encoder, y) = LabelEncoder::fit_transform(&labels);
        let split = train_test_split(&x, &y, 0.2, 42).unwrap();
        (split, encoder)
    }

    #[test]
    fn evaluates_every_model_and_picks_the_best() {
        let (split, encoder) = fixture();
        let mut models: Vec<Box<dyn Classifier>> = vec![
            Box::new(DecisionTree::new(2, 2)),
            Box::new(GaussianNb::new(1e-2)),
            Box::new(PassiveAggressive::new(1e-8, 5, 42)),
        ];
        let comparison = Evaluator::new(&split, &encoder)
            .evaluate(&mut models)
            .unwrap();

        assert_eq!(comparison.reports.len(), 3);
        let best = comparison.best_report();
        for report in &comparison.reports {
            assert!(best.accuracy >= report.accuracy);
            assert!(report.accuracy >= 0.0 && report.accuracy <= 1.0);
            assert!(report.f1 >= 0.0 && report.f1 <= 1.0);
        }
    }

    #[test]
    fn margin_models_have_no_roc_curves() {
        let (split, encoder) = fixture();
        let mut models: Vec<Box<dyn Classifier>> =
            vec![Box::new(PassiveAggressive::new(1.0, 20, 42))];
        let comparison = Evaluator::new(&split, &encoder)
            .evaluate(&mut models)
            .unwrap();
        assert!(comparison.reports[0].roc_curves.is_none());
        assert!(comparison.reports[0].test_scores.is_none());
    }

    #[test]
    fn probability_models_get_one_curve_per_class() {
        let (split, encoder) = fixture();
        let mut models: Vec<Box<dyn Classifier>> = vec![Box::new(GaussianNb::new(1e-2))];
        let comparison = Evaluator::new(&split, &encoder)
            .evaluate(&mut models)
            .unwrap();
        let curves = comparison.reports[0].roc_curves.as_ref().unwrap();
        assert_eq!(curves.len(), 2);
        for curve in curves {
            assert!(curve.auc >= 0.0 && curve.auc <= 1.0);
        }
    }

    #[test]
    fn confusion_rows_sum_to_class_support() {
        let (split, encoder) = fixture();
        let mut models: Vec<Box<dyn Classifier>> = vec![Box::new(DecisionTree::new(2, 2))];
        let comparison = Evaluator::new(&split, &encoder)
            .evaluate(&mut models)
            .unwrap();
        let confusion = &comparison.reports[0].confusion;
        for (class, row) in confusion.rows().into_iter().enumerate() {
            let support = split
                .y_test
                .iter()
                .filter(|&&label| label as usize == class)
                .count() as u64;
            assert_eq!(row.sum(), support);
        }
    }

    #[test]
    fn ties_keep_the_first_model() {
        let (split, encoder) = fixture();
        // Two identical models score identically; the first must win.
        let mut models: Vec<Box<dyn Classifier>> = vec![
            Box::new(DecisionTree::new(2, 2)),
            Box::new(DecisionTree::new(2, 2)),
        ];
        let comparison = Evaluator::new(&split, &encoder)
            .evaluate(&mut models)
            .unwrap();
        assert_eq!(comparison.best, 0);
    }
}
