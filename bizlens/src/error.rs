//! Error types for the bizlens analysis library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`AnalysisError`] enum. Load-time variants (`UnsupportedFormat`, `Parse`,
//! `DateParse`, `EmptyTable`) mean the analyzer was never built; query-time
//! variants (`ColumnNotFound`, `ColumnTypeMismatch`) are local to one call and
//! leave the analyzer usable.

use thiserror::Error;

/// The main error type for the bizlens library.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The input is neither tabular text nor a spreadsheet.
    #[error("Unsupported format '{kind}': expected a CSV file or a spreadsheet (xls, xlsx, xlsm, xlsb, ods)")]
    UnsupportedFormat {
        /// The extension or declared kind that was rejected
        kind: String,
    },

    /// The source content could not be parsed.
    #[error("Failed to parse {format} input: {message}")]
    Parse {
        /// Format being parsed (e.g., "CSV", "spreadsheet")
        format: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A value in the date column could not be interpreted as a date.
    #[error("Column '{column}' row {row}: cannot interpret '{value}' as a date")]
    DateParse {
        column: String,
        /// Zero-based data row index
        row: usize,
        value: String,
    },

    /// A query referenced a column absent from the normalized table.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// A query used a column whose kind does not fit the operation.
    #[error("Column '{column}' is {found}, expected {expected}")]
    ColumnTypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// The loaded table has no columns.
    #[error("Table has no columns")]
    EmptyTable,

    /// Error related to caller-supplied configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error while rendering a report.
    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    /// Error from serialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, AnalysisError>`.
///
/// # Examples
///
/// ```rust
/// use bizlens::error::{AnalysisError, Result};
///
/// fn pick(column: &str) -> Result<()> {
///     Err(AnalysisError::column_not_found(column))
/// }
///
/// assert!(pick("revenue").is_err());
/// ```
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Creates an unsupported format error.
    pub fn unsupported_format(kind: impl Into<String>) -> Self {
        Self::UnsupportedFormat { kind: kind.into() }
    }

    /// Creates a parse error without an underlying source.
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a parse error wrapping the underlying library error.
    pub fn parse_with_source(
        format: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a column-not-found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates a column kind mismatch error.
    pub fn type_mismatch(
        column: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::ColumnTypeMismatch {
            column: column.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Returns true for errors raised while loading, as opposed to querying.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. }
                | Self::Parse { .. }
                | Self::DateParse { .. }
                | Self::EmptyTable
                | Self::Io(_)
        )
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AnalysisError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.with_context(|| msg.to_string())
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| match e.into() {
            AnalysisError::Internal(inner) => AnalysisError::Internal(format!("{}: {inner}", f())),
            other => AnalysisError::Internal(format!("{}: {other}", f())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_unsupported_format_message() {
        let err = AnalysisError::unsupported_format("txt");
        assert!(err.to_string().starts_with("Unsupported format 'txt'"));
        assert!(err.is_load_error());
    }

    #[test]
    fn test_parse_error_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad row");
        let err = AnalysisError::parse_with_source("CSV", "row 3 has 2 fields", Box::new(source));

        assert_eq!(err.to_string(), "Failed to parse CSV input: row 3 has 2 fields");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_date_parse_message() {
        let err = AnalysisError::DateParse {
            column: "date".to_string(),
            row: 4,
            value: "yesterday".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Column 'date' row 4: cannot interpret 'yesterday' as a date"
        );
    }

    #[test]
    fn test_column_not_found_is_query_error() {
        let err = AnalysisError::column_not_found("revenue");
        assert_eq!(err.to_string(), "Column 'revenue' not found in dataset");
        assert!(!err.is_load_error());
    }

    #[test]
    fn test_type_mismatch() {
        let err = AnalysisError::type_mismatch("region", "numeric", "text");
        assert_eq!(err.to_string(), "Column 'region' is text, expected numeric");
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(AnalysisError::Internal("buffer length mismatch".to_string()))
        }

        let err = failing_operation()
            .context("While normalizing table")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Internal error: While normalizing table: buffer length mismatch"
        );
    }
}
