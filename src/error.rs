use thiserror::Error;

/// Errors raised while loading trade tables or building chart data.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A required column is missing, or a cell does not hold a valid value.
    #[error("data integrity error in column '{column}'{}: {reason}", row_suffix(.row))]
    DataIntegrity {
        column: String,
        row: Option<usize>,
        reason: String,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("year {year} is not present in the dataset (available: {available:?})")]
    UnknownYear { year: i32, available: Vec<i32> },

    #[error("dataset contains no years")]
    NoYears,

    #[error("no {0} table loaded")]
    MissingDataset(String),

    #[error("view '{view}' needs a {expected} table, got {found}")]
    SchemaMismatch {
        view: String,
        expected: String,
        found: String,
    },

    #[error("invalid axis: {0}")]
    InvalidAxis(String),

    #[error("invalid view configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

fn row_suffix(row: &Option<usize>) -> String {
    row.map(|r| format!(" (row {r})")).unwrap_or_default()
}

impl PipelineError {
    pub fn integrity(column: &str, row: Option<usize>, reason: impl Into<String>) -> Self {
        PipelineError::DataIntegrity {
            column: column.to_string(),
            row,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
