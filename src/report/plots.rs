//! Plot builders for the model comparison report.

use itertools_num::linspace;
use plotly::common::{ColorScale, ColorScalePalette, DashType, Line, Mode};
use plotly::layout::{Axis, BarMode, Layout};
use plotly::{Bar, HeatMap, Plot, Scatter};

use crate::evaluation::ModelReport;

/// Confusion-matrix heatmap for one model, axes labeled with the encoder's
/// class order (rows = actual, columns = predicted).
pub fn plot_confusion_heatmap(report: &ModelReport, class_names: &[String]) -> Result<Plot, String> {
    let (n_rows, n_cols) = report.confusion.dim();
    if n_rows != class_names.len() || n_cols != class_names.len() {
        return Err(format!(
            "confusion matrix is {}x{} but there are {} class names",
            n_rows,
            n_cols,
            class_names.len()
        ));
    }

    let z: Vec<Vec<f64>> = report
        .confusion
        .rows()
        .into_iter()
        .map(|row| row.iter().map(|&c| c as f64).collect())
        .collect();

    let trace = HeatMap::new(class_names.to_vec(), class_names.to_vec(), z)
        .color_scale(ColorScale::Palette(ColorScalePalette::Blues));

    let layout = Layout::new()
        .title(format!("Confusion Matrix - {}", report.name).as_str())
        .x_axis(Axis::new().title("Predicted"))
        .y_axis(Axis::new().title("Actual"));

    let mut plot = Plot::new();
    plot.add_trace(trace);
    plot.set_layout(layout);

    Ok(plot)
}

/// Single-series accuracy comparison across every model.
pub fn plot_accuracy_comparison(reports: &[ModelReport]) -> Result<Plot, String> {
    if reports.is_empty() {
        return Err("no model reports to chart".to_string());
    }
    let names: Vec<String> = reports.iter().map(|r| r.name.clone()).collect();
    let accuracies: Vec<f32> = reports.iter().map(|r| r.accuracy).collect();

    let layout = Layout::new()
        .title("Model Accuracy Comparison")
        .y_axis(Axis::new().title("Accuracy"));

    let mut plot = Plot::new();
    plot.add_trace(Bar::new(names, accuracies));
    plot.set_layout(layout);

    Ok(plot)
}

/// Grouped accuracy and F1 bars across every model.
pub fn plot_metric_bars(reports: &[ModelReport]) -> Result<Plot, String> {
    if reports.is_empty() {
        return Err("no model reports to chart".to_string());
    }
    let names: Vec<String> = reports.iter().map(|r| r.name.clone()).collect();
    let accuracies: Vec<f32> = reports.iter().map(|r| r.accuracy).collect();
    let f1_scores: Vec<f32> = reports.iter().map(|r| r.f1).collect();

    let layout = Layout::new()
        .title("Average Accuracy & F1 Score for Each Model")
        .y_axis(Axis::new().title("Score"))
        .bar_mode(BarMode::Group);

    let mut plot = Plot::new();
    plot.add_trace(Bar::new(names.clone(), accuracies).name("Accuracy"));
    plot.add_trace(Bar::new(names, f1_scores).name("F1 Score"));
    plot.set_layout(layout);

    Ok(plot)
}

/// One-vs-rest ROC curves for a probability model, one trace per class with
/// the AUC folded into the trace name, plus the chance diagonal.
pub fn plot_roc_curves(report: &ModelReport, class_names: &[String]) -> Result<Plot, String> {
    let curves = report
        .roc_curves
        .as_ref()
        .ok_or_else(|| format!("{} exposes no probability capability", report.name))?;

    let mut plot = Plot::new();
    for (class, curve) in curves.iter().enumerate() {
        let fpr: Vec<f32> = curve.points.iter().map(|p| p.fpr).collect();
        let tpr: Vec<f32> = curve.points.iter().map(|p| p.tpr).collect();
        let label = class_names
            .get(class)
            .map(|s| s.as_str())
            .unwrap_or("class");
        let trace = Scatter::new(fpr, tpr)
            .mode(Mode::Lines)
            .name(format!("{} (AUC = {:.3})", label, curve.auc).as_str());
        plot.add_trace(trace);
    }

    let chance = Scatter::new(vec![0.0, 1.0], vec![0.0, 1.0])
        .mode(Mode::Lines)
        .name("Chance")
        .line(Line::new().color("red").dash(DashType::Dash));
    plot.add_trace(chance);

    plot.set_layout(
        Layout::new()
            .title(format!("ROC Curves - {}", report.name).as_str())
            .x_axis(Axis::new().title("False Positive Rate"))
            .y_axis(Axis::new().title("True Positive Rate")),
    );

    Ok(plot)
}

/// Sensitivity of the first encoder class against the decision threshold,
/// swept over 100 points, one trace per probability model. The tuned model
/// is drawn heavier and solid; the rest dashed.
pub fn plot_sensitivity_thresholds(
    reports: &[ModelReport],
    y_test: &[i32],
    tuned_name: &str,
) -> Result<Plot, String> {
    let thresholds: Vec<f32> = linspace(0.0f32, 1.0, 100).collect();
    let mut plot = Plot::new();
    let mut traced = 0usize;

    for report in reports {
        let scores = match &report.test_scores {
            Some(scores) => scores,
            None => continue,
        };
        if scores.nrows() != y_test.len() || scores.ncols() == 0 {
            return Err(format!(
                "{} scored {} rows for {} test labels",
                report.name,
                scores.nrows(),
                y_test.len()
            ));
        }

        let class_scores: Vec<f32> = scores.column(0).iter().cloned().collect();
        let sensitivities: Vec<f32> = thresholds
            .iter()
            .map(|&threshold| {
                let mut tp = 0usize;
                let mut fn_ = 0usize;
                for (&score, &label) in class_scores.iter().zip(y_test.iter()) {
                    if label == 0 {
                        if score >= threshold {
                            tp += 1;
                        } else {
                            fn_ += 1;
                        }
                    }
                }
                if tp + fn_ == 0 {
                    0.0
                } else {
                    tp as f32 / (tp + fn_) as f32
                }
            })
            .collect();

        let trace = if report.name == tuned_name {
            Scatter::new(thresholds.clone(), sensitivities)
                .mode(Mode::Lines)
                .name(report.name.as_str())
                .line(Line::new().color("red").width(3.0))
        } else {
            Scatter::new(thresholds.clone(), sensitivities)
                .mode(Mode::Lines)
                .name(report.name.as_str())
                .line(Line::new().dash(DashType::Dash))
        };
        plot.add_trace(trace);
        traced += 1;
    }

    if traced == 0 {
        return Err("no model exposes probabilities for the threshold sweep".to_string());
    }

    plot.set_layout(
        Layout::new()
            .title("Sensitivity vs Threshold (first class, one-vs-rest)")
            .x_axis(Axis::new().title("Threshold"))
            .y_axis(Axis::new().title("Sensitivity")),
    );

    Ok(plot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{RocCurve, RocPoint};
    use ndarray::{array, Array2};

    fn report(name: &str, with_proba: bool) -> ModelReport {
        let roc = RocCurve {
            points: vec![
                RocPoint { threshold: f32::INFINITY, fpr: 0.0, tpr: 0.0 },
                RocPoint { threshold: 0.5, fpr: 0.25, tpr: 0.75 },
                RocPoint { threshold: 0.0, fpr: 1.0, tpr: 1.0 },
            ],
            auc: 0.75,
        };
        ModelReport {
            name: name.to_string(),
            accuracy: 0.8,
            precision: 0.8,
            recall: 0.8,
            f1: 0.8,
            confusion: array![[3u64, 1], [1, 3]],
            report_text: String::new(),
            roc_curves: if with_proba { Some(vec![roc.clone(), roc]) } else { None },
            test_scores: if with_proba {
                Some(Array2::from_shape_vec((4, 2), vec![0.9, 0.1, 0.8, 0.2, 0.3, 0.7, 0.2, 0.8]).unwrap())
            } else {
                None
            },
        }
    }

    fn classes() -> Vec<String> {
        vec!["healthy".to_string(), "stroke".to_string()]
    }

    #[test]
    fn heatmap_requires_matching_names() {
        let r = report("Decision Tree", false);
        assert!(plot_confusion_heatmap(&r, &classes()).is_ok());
        assert!(plot_confusion_heatmap(&r, &classes()[..1].to_vec()).is_err());
    }

    #[test]
    fn roc_plot_needs_probabilities() {
        assert!(plot_roc_curves(&report("Passive Aggressive", false), &classes()).is_err());
        assert!(plot_roc_curves(&report("Gaussian Naive Bayes", true), &classes()).is_ok());
    }

    #[test]
    fn threshold_sweep_skips_margin_models() {
        let reports = vec![report("Passive Aggressive", false), report("Gradient Boosting", true)];
        let y_test = vec![0, 0, 1, 1];
        let plot = plot_sensitivity_thresholds(&reports, &y_test, "Gradient Boosting");
        assert!(plot.is_ok());

        let only_margins = vec![report("Passive Aggressive", false)];
        assert!(plot_sensitivity_thresholds(&only_margins, &y_test, "Gradient Boosting").is_err());
    }

    #[test]
    fn bar_charts_reject_empty_input() {
        assert!(plot_accuracy_comparison(&[]).is_err());
        assert!(plot_metric_bars(&[]).is_err());
    }
}
