//! Comma-separated dataset reader.
//!
//! Parses a header-bearing CSV file into a `Dataset`: one configured label
//! column, every other column a numeric feature. Exact-duplicate rows are
//! dropped on the way in, first occurrence kept.

use std::path::Path;

use csv::StringRecord;
use ndarray::Array2;

use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};

/// Configuration for reading the input table.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Column name holding the categorical class label.
    pub label_column: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            label_column: "Class".to_string(),
        }
    }
}

/// Read a CSV file into a deduplicated `Dataset` using the default config.
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    read_dataset_with_config(path, &ReaderConfig::default())
}

/// Read a CSV file into a deduplicated `Dataset`.
pub fn read_dataset_with_config<P: AsRef<Path>>(
    path: P,
    config: &ReaderConfig,
) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(true)
        .from_path(&path)
        .map_err(|err| open_error(err, path.as_ref()))?;

    let headers = reader
        .headers()
        .map_err(|err| PipelineError::Format(format!("failed to read header row: {}", err)))?
        .clone();

    let label_idx = find_column(&headers, &config.label_column).ok_or_else(|| {
        PipelineError::Format(format!(
            "missing label column '{}' in header",
            config.label_column
        ))
    })?;

    let feature_indices: Vec<usize> = (0..headers.len()).filter(|&i| i != label_idx).collect();
    if feature_indices.is_empty() {
        return Err(PipelineError::Format(
            "no feature columns besides the label column".to_string(),
        ));
    }

    let mut features = Vec::new();
    let mut labels = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.map_err(|err| PipelineError::Format(format!("row {}: {}", row_idx + 1, err)))?;

        let label = record.get(label_idx).ok_or_else(|| {
            PipelineError::Format(format!("missing label value at row {}", row_idx + 1))
        })?;
        labels.push(label.trim().to_string());

        for &idx in &feature_indices {
            let value = record.get(idx).ok_or_else(|| {
                PipelineError::Format(format!(
                    "missing value for column '{}' at row {}",
                    headers.get(idx).unwrap_or(""),
                    row_idx + 1
                ))
            })?;
            let parsed: f32 = value.trim().parse().map_err(|_| {
                PipelineError::Format(format!(
                    "non-numeric value '{}' in column '{}' at row {}",
                    value,
                    headers.get(idx).unwrap_or(""),
                    row_idx + 1
                ))
            })?;
            features.push(parsed);
        }
    }

    let n_samples = labels.len();
    let n_features = feature_indices.len();
    let x = Array2::from_shape_vec((n_samples, n_features), features)
        .map_err(|err| PipelineError::Format(format!("failed to build feature matrix: {}", err)))?;

    let feature_names = feature_indices
        .iter()
        .map(|&idx| headers.get(idx).unwrap_or("").to_string())
        .collect();

    let mut dataset = Dataset {
        feature_names,
        x,
        labels,
    };
    let removed = dataset.dedup_rows();
    if removed > 0 {
        log::info!("dropped {} duplicate rows", removed);
    }

    Ok(dataset)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
}

fn open_error(err: csv::Error, path: &Path) -> PipelineError {
    if err.is_io_error() {
        PipelineError::Io(format!("failed to open {}: {}", path.display(), err))
    } else {
        PipelineError::Format(format!("failed to open {}: {}", path.display(), err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_features_and_labels() {
        let path = write_temp(
            "strokebench_reader_basic.csv",
            "f1,f2,Class\n1.0,2.0,a\n3.0,4.0,b\n",
        );
        let ds = read_dataset(&path).unwrap();
        assert_eq!(ds.feature_names, vec!["f1", "f2"]);
        assert_eq!(ds.n_samples(), 2);
        assert_eq!(ds.labels, vec!["a", "b"]);
        assert_eq!(ds.x[(1, 0)], 3.0);
    }

    #[test]
    fn label_column_position_does_not_matter() {
        let path = write_temp(
            "strokebench_reader_label_first.csv",
            "Class,f1\na,1.0\nb,2.0\n",
        );
        let ds = read_dataset(&path).unwrap();
        assert_eq!(ds.feature_names, vec!["f1"]);
        assert_eq!(ds.x[(0, 0)], 1.0);
    }

    #[test]
    fn duplicate_rows_are_dropped() {
        let path = write_temp(
            "strokebench_reader_dupes.csv",
            "f1,Class\n1.0,a\n1.0,a\n2.0,a\n",
        );
        let ds = read_dataset(&path).unwrap();
        assert_eq!(ds.n_samples(), 2);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_dataset("definitely_not_here.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)), "got {:?}", err);
    }

    #[test]
    fn missing_label_column_is_format_error() {
        let path = write_temp("strokebench_reader_nolabel.csv", "f1,f2\n1.0,2.0\n");
        let err = read_dataset(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Format(_)), "got {:?}", err);
    }

    #[test]
    fn non_numeric_feature_is_format_error() {
        let path = write_temp(
            "strokebench_reader_badcell.csv",
            "f1,Class\noops,a\n",
        );
        let err = read_dataset(&path).unwrap_err();
        match err {
            PipelineError::Format(msg) => assert!(msg.contains("f1"), "message: {}", msg),
            other => panic!("expected format error, got {:?}", other),
        }
    }
}
