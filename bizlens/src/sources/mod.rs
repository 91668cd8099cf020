//! Data source readers for bizlens.
//!
//! A [`TableSource`] pairs raw input (a path or an in-memory buffer) with a
//! [`SourceFormat`]. Reading it produces a [`RawTable`]: the whole table as a
//! single Arrow batch with the headers exactly as they appeared in the source.
//! Normalization happens later, in [`crate::table`].

use crate::prelude::*;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

mod csv;
mod spreadsheet;

pub use csv::{CsvOptions, CsvSource};
pub use spreadsheet::{SpreadsheetOptions, SpreadsheetSource};

/// The two kinds of input the analyzer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Delimited text with a header row
    Csv,
    /// Excel or OpenDocument workbook
    Spreadsheet,
}

impl SourceFormat {
    /// Maps a file extension (without the dot, any case) to a format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Some(Self::Spreadsheet),
            _ => None,
        }
    }

    /// Detects the format of a path from its extension.
    ///
    /// This never touches the filesystem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::from_extension(extension).ok_or_else(|| {
            let kind = if extension.is_empty() {
                path.display().to_string()
            } else {
                extension.to_string()
            };
            AnalysisError::unsupported_format(kind)
        })
    }

    /// Human-readable name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Spreadsheet => "spreadsheet",
        }
    }
}

impl FromStr for SourceFormat {
    type Err = AnalysisError;

    /// Parses a declared kind: `csv`, `spreadsheet`, `excel`, or a spreadsheet extension.
    fn from_str(s: &str) -> Result<Self> {
        let kind = s.trim().trim_start_matches('.');
        match kind.to_ascii_lowercase().as_str() {
            "spreadsheet" | "excel" => Ok(Self::Spreadsheet),
            other => Self::from_extension(other)
                .ok_or_else(|| AnalysisError::unsupported_format(s.trim())),
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the bytes of a table come from.
#[derive(Debug, Clone)]
pub enum SourceInput {
    /// A file on disk, read in full when the source is read
    Path(PathBuf),
    /// An in-memory buffer, e.g. an uploaded file
    Bytes(Arc<[u8]>),
}

impl SourceInput {
    /// Returns the full content of the input.
    pub(crate) fn read_all(&self) -> Result<Arc<[u8]>> {
        match self {
            Self::Path(path) => {
                let bytes = std::fs::read(path).map_err(|e| {
                    AnalysisError::Io(std::io::Error::new(
                        e.kind(),
                        format!("{}: {e}", path.display()),
                    ))
                })?;
                Ok(Arc::from(bytes))
            }
            Self::Bytes(bytes) => Ok(Arc::clone(bytes)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

/// A table as loaded from a source, before normalization.
#[derive(Debug, Clone)]
pub struct RawTable {
    /// All rows in a single batch, headers verbatim
    pub batch: RecordBatch,
    /// Format the table was read from
    pub format: SourceFormat,
}

impl RawTable {
    /// Number of data rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }
}

/// A readable table source.
///
/// Implementations read the entire input into memory; there is no streaming.
pub trait DataSource: Debug + Send + Sync {
    /// Reads and parses the whole source.
    fn read(&self) -> Result<RawTable>;

    /// The format this source parses.
    fn format(&self) -> SourceFormat;

    /// Returns a human-readable description of this data source.
    fn description(&self) -> String;
}

/// Raw input plus its declared or detected format.
///
/// # Examples
///
/// ```rust
/// use bizlens::sources::{SourceFormat, TableSource};
///
/// // Formats are detected from the extension without opening the file.
/// assert!(TableSource::from_path("sales.xlsx").is_ok());
/// assert!(TableSource::from_path("notes.txt").is_err());
///
/// let upload = TableSource::from_bytes(b"a,b\n1,2\n".to_vec(), SourceFormat::Csv);
/// assert_eq!(upload.format(), SourceFormat::Csv);
/// ```
#[derive(Debug, Clone)]
pub struct TableSource {
    input: SourceInput,
    format: SourceFormat,
}

impl TableSource {
    /// Creates a source for a file, detecting the format from its extension.
    ///
    /// Fails with [`AnalysisError::UnsupportedFormat`] before any I/O.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let format = SourceFormat::from_path(&path)?;
        Ok(Self {
            input: SourceInput::Path(path),
            format,
        })
    }

    /// Creates a source for a file with an explicitly declared format.
    pub fn from_path_with_format(path: impl Into<PathBuf>, format: SourceFormat) -> Self {
        Self {
            input: SourceInput::Path(path.into()),
            format,
        }
    }

    /// Creates a source for an in-memory buffer with a declared format.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, format: SourceFormat) -> Self {
        Self {
            input: SourceInput::Bytes(bytes.into()),
            format,
        }
    }

    /// The format that will be used to parse this source.
    pub fn format(&self) -> SourceFormat {
        self.format
    }

    /// The raw input.
    pub fn input(&self) -> &SourceInput {
        &self.input
    }

    /// Builds the reader for this source's format.
    pub fn into_data_source(
        self,
        csv: &CsvOptions,
        spreadsheet: &SpreadsheetOptions,
    ) -> Box<dyn DataSource> {
        match self.format {
            SourceFormat::Csv => Box::new(CsvSource::new(self.input, csv.clone())),
            SourceFormat::Spreadsheet => {
                Box::new(SpreadsheetSource::new(self.input, spreadsheet.clone()))
            }
        }
    }
}

impl std::fmt::Display for TableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.input.describe(), self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(
            SourceFormat::from_path("data/sales.csv").unwrap(),
            SourceFormat::Csv
        );
        assert_eq!(
            SourceFormat::from_path("data/SALES.CSV").unwrap(),
            SourceFormat::Csv
        );
        for name in ["a.xls", "a.xlsx", "a.XLSX", "a.xlsm", "a.xlsb", "a.ods"] {
            assert_eq!(
                SourceFormat::from_path(name).unwrap(),
                SourceFormat::Spreadsheet,
                "{name}"
            );
        }
    }

    #[test]
    fn test_unsupported_extensions() {
        for name in ["notes.txt", "data.json", "data.parquet", "README"] {
            let err = SourceFormat::from_path(name).unwrap_err();
            assert!(
                matches!(err, AnalysisError::UnsupportedFormat { .. }),
                "{name}: {err}"
            );
        }
    }

    #[test]
    fn test_txt_path_fails_without_touching_disk() {
        // The file does not exist; detection must fail on the extension alone.
        let err = TableSource::from_path("/definitely/not/here/data.txt").unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat { ref kind } if kind == "txt"));
    }

    #[test]
    fn test_declared_kinds() {
        assert_eq!("csv".parse::<SourceFormat>().unwrap(), SourceFormat::Csv);
        assert_eq!(".xlsx".parse::<SourceFormat>().unwrap(), SourceFormat::Spreadsheet);
        assert_eq!("Excel".parse::<SourceFormat>().unwrap(), SourceFormat::Spreadsheet);
        assert!("tsv".parse::<SourceFormat>().is_err());
    }

    #[test]
    fn test_table_source_display() {
        let source = TableSource::from_bytes(vec![0u8; 12], SourceFormat::Spreadsheet);
        assert_eq!(source.to_string(), "<12 bytes in memory> (spreadsheet)");
    }
}
