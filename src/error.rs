use std::error::Error;
use std::fmt;

/// Error type shared by every pipeline stage.
///
/// Stage-blocking conditions abort the run; the only recoverable variant is
/// `Configuration`, which the tuner absorbs per trial (see `tuner`).
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The input file could not be read.
    Io(String),
    /// The input file was readable but not parseable as the expected table.
    Format(String),
    /// A stage received data it cannot operate on (degenerate column,
    /// class too small for neighbour synthesis, shape mismatch).
    Value(String),
    /// A hyperparameter combination is infeasible for the model it configures.
    Configuration(String),
    /// Every tuning trial failed.
    SearchExhausted { attempted: usize },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::Io(msg) => write!(f, "I/O error: {}", msg),
            PipelineError::Format(msg) => write!(f, "format error: {}", msg),
            PipelineError::Value(msg) => write!(f, "invalid value: {}", msg),
            PipelineError::Configuration(msg) => write!(f, "invalid configuration: {}", msg),
            PipelineError::SearchExhausted { attempted } => {
                write!(f, "all {} tuning trials failed", attempted)
            }
        }
    }
}

impl Error for PipelineError {}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        PipelineError::Format(err.to_string())
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;
