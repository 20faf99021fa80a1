//! Error types for the return-risk pipeline.
//!
//! Every failure is terminal for the current run: there are no retries and no
//! partial outputs. Data-quality problems (missing timestamps, categories or
//! review scores) are handled by fill/drop policies and never surface here.
//!
//! Errors serialize as `{code, message}` so a run summary can carry them.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An expected input or intermediate CSV file is absent.
    #[error("File not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// An expected column is absent from a table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A column could not be interpreted in the required domain.
    #[error("Column '{column}' cannot be used as {expected}: {reason}")]
    TypeMismatch {
        column: String,
        expected: String,
        reason: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The train/test split cannot be produced from the data.
    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// A transformer or model was used before being fitted.
    #[error("{0} used before being fitted")]
    NotFitted(&'static str),

    /// Matrix or vector dimensions disagree.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a [`PipelineError::TypeMismatch`].
    pub fn type_mismatch(
        column: impl Into<String>,
        expected: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::TypeMismatch {
            column: column.into(),
            expected: expected.into(),
            reason: reason.into(),
        }
    }

    /// Stable error code for reports and exit messages.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingFile { .. } => "MISSING_FILE",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidSplit(_) => "INVALID_SPLIT",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::NotFitted(_) => "NOT_FITTED",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is a schema problem (a required column is absent).
    pub fn is_schema_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) => true,
            Self::WithContext { source, .. } => source.is_schema_error(),
            _ => false,
        }
    }
}

impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

static_assertions::assert_impl_all!(PipelineError: Send, Sync);

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PipelineError::ColumnNotFound("seller_id".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            PipelineError::MissingFile {
                path: PathBuf::from("df_master_day1.csv")
            }
            .error_code(),
            "MISSING_FILE"
        );
    }

    #[test]
    fn test_missing_file_message_names_path() {
        let error = PipelineError::MissingFile {
            path: PathBuf::from("data/df_master_day1.csv"),
        };
        assert!(error.to_string().contains("data/df_master_day1.csv"));
    }

    #[test]
    fn test_is_schema_error() {
        assert!(PipelineError::ColumnNotFound("Is_Return".to_string()).is_schema_error());
        assert!(
            PipelineError::ColumnNotFound("Is_Return".to_string())
                .with_context("During feature engineering")
                .is_schema_error()
        );
        assert!(!PipelineError::InvalidSplit("empty".to_string()).is_schema_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = PipelineError::type_mismatch("Is_Return", "0/1 integer", "found 'yes'");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("TYPE_MISMATCH"));
        assert!(json.contains("Is_Return"));
    }

    #[test]
    fn test_with_context() {
        let error =
            PipelineError::ColumnNotFound("test".to_string()).with_context("During join");
        assert!(error.to_string().contains("During join"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }
}
