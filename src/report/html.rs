//! Standalone HTML assembly for the comparison report.
//!
//! Plots are embedded inline via [`Plot::to_inline_html`] and rendered by
//! plotly.js pulled from the CDN, so the output file has no local
//! dependencies.

use chrono::Utc;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

use crate::evaluation::Comparison;
use crate::report::plots;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

/// One titled block of the report: free-form markup followed by inline plots.
pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
    plots: Vec<Plot>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        ReportSection {
            title: title.to_string(),
            content: Vec::new(),
            plots: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.content.push(content);
    }

    pub fn add_plot(&mut self, plot: Plot) {
        self.plots.push(plot);
    }
}

/// A full report: a titled header plus sections, rendered to one HTML page.
pub struct Report {
    title: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: &str) -> Self {
        Report {
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    /// Render the whole document. Plot div ids are derived from the section
    /// and plot position so repeated renders are stable.
    pub fn render(&self) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
        let markup = html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                    style {
                        "body { font-family: sans-serif; margin: 2em auto; max-width: 1100px; }"
                        "h1 { border-bottom: 2px solid #444; padding-bottom: 0.2em; }"
                        "h2 { color: #444; margin-top: 2em; }"
                        ".timestamp { color: #888; font-size: 0.9em; }"
                        ".plot { margin: 1em 0; }"
                    }
                }
                body {
                    h1 { (self.title) }
                    p class="timestamp" { "Generated " (timestamp) }
                    @for (s, section) in self.sections.iter().enumerate() {
                        h2 { (section.title) }
                        @for content in &section.content {
                            (content)
                        }
                        @for (p, plot) in section.plots.iter().enumerate() {
                            div class="plot" {
                                (PreEscaped(plot.to_inline_html(Some(&format!("plot-{}-{}", s, p)))))
                            }
                        }
                    }
                }
            }
        };
        markup.into_string()
    }
}

/// Build the standard comparison report: a ranked summary table, the
/// cross-model bar charts, the threshold sweep, and one section per model
/// with its confusion matrix and (where available) ROC curves.
pub fn render_report(
    comparison: &Comparison,
    class_names: &[String],
    y_test: &[i32],
    tuned_name: &str,
    best_params_json: &str,
) -> Result<String, String> {
    let mut report = Report::new("Stroke Prediction Model Comparison");

    let mut overview = ReportSection::new("Overview");
    let best = &comparison.reports[comparison.best];
    overview.add_content(html! {
        p {
            "Comparison of " (comparison.reports.len())
            " classifiers on the held-out test split. Best model: "
            b { (best.name) }
            " at " (format!("{:.1}%", best.accuracy * 100.0)) " accuracy."
        }
        table {
            thead {
                tr { th { "Model" } th { "Accuracy" } th { "Precision" } th { "Recall" } th { "F1" } }
            }
            tbody {
                @for report in &comparison.reports {
                    tr {
                        td { (report.name) }
                        td { (format!("{:.4}", report.accuracy)) }
                        td { (format!("{:.4}", report.precision)) }
                        td { (format!("{:.4}", report.recall)) }
                        td { (format!("{:.4}", report.f1)) }
                    }
                }
            }
        }
    });
    overview.add_plot(plots::plot_accuracy_comparison(&comparison.reports)?);
    overview.add_plot(plots::plot_metric_bars(&comparison.reports)?);
    if comparison.reports.iter().any(|r| r.test_scores.is_some()) {
        overview.add_plot(plots::plot_sensitivity_thresholds(
            &comparison.reports,
            y_test,
            tuned_name,
        )?);
    }
    report.add_section(overview);

    for model in &comparison.reports {
        let mut section = ReportSection::new(&model.name);
        section.add_content(html! {
            pre { (model.report_text) }
        });
        section.add_plot(plots::plot_confusion_heatmap(model, class_names)?);
        if model.roc_curves.is_some() {
            section.add_plot(plots::plot_roc_curves(model, class_names)?);
        }
        report.add_section(section);
    }

    let mut config_section = ReportSection::new("Tuned Hyperparameters");
    config_section.add_content(html! {
        pre { code { (best_params_json) } }
    });
    report.add_section(config_section);

    Ok(report.render())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::ModelReport;
    use ndarray::{array, Array2};

    fn comparison() -> Comparison {
        let proba = ModelReport {
            name: "Gradient Boosting".to_string(),
            accuracy: 0.9,
            precision: 0.9,
            recall: 0.9,
            f1: 0.9,
            confusion: array![[4u64, 0], [1, 3]],
            report_text: "class 0: ...".to_string(),
            roc_curves: Some(vec![]),
            test_scores: Some(
                Array2::from_shape_vec(
                    (8, 2),
                    vec![
                        0.9, 0.1, 0.8, 0.2, 0.7, 0.3, 0.6, 0.4, 0.4, 0.6, 0.3, 0.7, 0.2, 0.8,
                        0.1, 0.9,
                    ],
                )
                .unwrap(),
            ),
        };
        let margin = ModelReport {
            name: "Passive Aggressive".to_string(),
            accuracy: 0.6,
            precision: 0.6,
            recall: 0.6,
            f1: 0.6,
            confusion: array![[3u64, 1], [2, 2]],
            report_text: "class 0: ...".to_string(),
            roc_curves: None,
            test_scores: None,
        };
        Comparison {
            reports: vec![proba, margin],
            best: 0,
        }
    }

    #[test]
    fn render_embeds_every_section() {
        let classes = vec!["healthy".to_string(), "stroke".to_string()];
        let y_test = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let html = render_report(
            &comparison(),
            &classes,
            &y_test,
            "Gradient Boosting",
            "{\"n_estimators\": 700}",
        )
        .unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(PLOTLY_CDN));
        assert!(html.contains("Gradient Boosting"));
        assert!(html.contains("Passive Aggressive"));
        assert!(html.contains("n_estimators"));
        assert!(html.contains("Generated "));
    }

    #[test]
    fn section_plots_get_distinct_div_ids() {
        let mut report = Report::new("t");
        let mut section = ReportSection::new("s");
        section.add_plot(plots::plot_accuracy_comparison(&comparison().reports).unwrap());
        section.add_plot(plots::plot_metric_bars(&comparison().reports).unwrap());
        report.add_section(section);

        let html = report.render();
        assert!(html.contains("plot-0-0"));
        assert!(html.contains("plot-0-1"));
    }
}
