//! Error taxonomy shared by every pipeline stage

use thiserror::Error;

/// A single structural problem found while validating a table
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchemaViolation {
    #[error("missing column `{0}`")]
    MissingColumn(String),
    #[error("unexpected column `{0}`")]
    UnexpectedColumn(String),
    #[error("duplicate {column} value {value}")]
    DuplicateKey { column: String, value: String },
}

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("schema mismatch: {}", format_violations(.violations))]
    Schema { violations: Vec<SchemaViolation> },
    #[error("column `{column}` row {row}: {reason}")]
    Type {
        column: String,
        row: usize,
        reason: String,
    },
    #[error("{parameter} out of range: {reason}")]
    Range {
        parameter: &'static str,
        reason: String,
    },
    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
    #[error("table error: {0}")]
    Table(#[from] polars::error::PolarsError),
    #[error("clustering failed: {0}")]
    Clustering(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    pub(crate) fn schema(violations: Vec<SchemaViolation>) -> Self {
        Self::Schema { violations }
    }

    pub(crate) fn type_error(column: &str, row: usize, reason: impl Into<String>) -> Self {
        Self::Type {
            column: column.to_owned(),
            row,
            reason: reason.into(),
        }
    }

    /// Whether the caller can fix the failure by correcting its input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Schema { .. } | Self::Type { .. } | Self::Range { .. } | Self::InvalidParameter { .. }
        )
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<linfa_clustering::KMeansError> for AnalyticsError {
    fn from(value: linfa_clustering::KMeansError) -> Self {
        Self::Clustering(value.to_string())
    }
}
