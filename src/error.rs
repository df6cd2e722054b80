use thiserror::Error;

/// Failures surfaced by the loading and aggregation core.
///
/// Nothing in the core recovers from these; callers decide what an empty or
/// broken source means for their output.
#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("malformed input at row {row}, field `{field}`: {reason}")]
    MalformedInput {
        row: usize,
        field: &'static str,
        reason: String,
    },

    #[error("cannot summarize empty dataset: {what}")]
    EmptyDataset { what: &'static str },

    #[error("failed to load {path}: {reason}")]
    Load { path: String, reason: String },
}

impl MetricsError {
    pub fn malformed(row: usize, field: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            row,
            field,
            reason: reason.into(),
        }
    }

    pub fn load(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Load {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type MetricsResult<T> = std::result::Result<T, MetricsError>;
