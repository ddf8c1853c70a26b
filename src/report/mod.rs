//! Comparison visuals: plot builders and the HTML report shell.
pub mod html;
pub mod plots;

pub use html::render_report;
