//! CSV source implementation.

use super::{DataSource, RawTable, SourceFormat, SourceInput};
use crate::prelude::*;
use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use regex::Regex;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Cell spellings treated as missing, mirroring the usual dataframe defaults.
pub const DEFAULT_NULL_PATTERN: &str =
    r"^(|#N/A|#NA|<NA>|N/A|n/a|NA|NULL|null|NaN|-NaN|nan|-nan|None)$";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Options for configuring CSV reading.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the first line holds column names
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Quote character (default: '"')
    pub quote: u8,
    /// Escape character (default: None)
    pub escape: Option<u8>,
    /// Comment prefix (lines starting with this are ignored)
    pub comment: Option<u8>,
    /// Regex matched against whole cells to detect missing values
    pub null_pattern: Option<String>,
    /// Maximum records to read for schema inference (None reads everything)
    pub schema_infer_max_records: Option<usize>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            quote: b'"',
            escape: None,
            comment: None,
            null_pattern: Some(DEFAULT_NULL_PATTERN.to_string()),
            schema_infer_max_records: None,
        }
    }
}

impl CsvOptions {
    /// Options for tab-separated text.
    pub fn tab_separated() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    /// Sets the field delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets whether the first line holds column names.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Sets the comment prefix.
    pub fn with_comment(mut self, comment: u8) -> Self {
        self.comment = Some(comment);
        self
    }

    /// Sets the missing-value pattern; `None` treats only empty cells as missing.
    pub fn with_null_pattern(mut self, pattern: Option<String>) -> Self {
        self.null_pattern = pattern;
        self
    }

    /// Limits how many records schema inference looks at.
    pub fn with_schema_infer_max_records(mut self, max: usize) -> Self {
        self.schema_infer_max_records = Some(max);
        self
    }

    fn to_format(&self) -> Result<Format> {
        let mut format = Format::default()
            .with_header(self.has_header)
            .with_delimiter(self.delimiter)
            .with_quote(self.quote);

        if let Some(escape) = self.escape {
            format = format.with_escape(escape);
        }
        if let Some(comment) = self.comment {
            format = format.with_comment(comment);
        }
        if let Some(pattern) = &self.null_pattern {
            let regex = Regex::new(pattern).map_err(|e| {
                AnalysisError::InvalidConfiguration(format!(
                    "Invalid CSV null pattern '{pattern}': {e}"
                ))
            })?;
            format = format.with_null_regex(regex);
        }
        Ok(format)
    }
}

/// A CSV source read entirely into memory with type inference.
///
/// # Examples
///
/// ```rust
/// use bizlens::sources::{CsvOptions, CsvSource, DataSource};
///
/// let source = CsvSource::from_bytes(
///     b"Order Date,Region,Amount\n2022-01-01,North,10.5\n".to_vec(),
///     CsvOptions::default(),
/// );
/// let raw = source.read().unwrap();
/// assert_eq!(raw.num_rows(), 1);
/// assert_eq!(raw.batch.schema().field(0).name(), "Order Date");
/// ```
#[derive(Debug, Clone)]
pub struct CsvSource {
    input: SourceInput,
    options: CsvOptions,
}

impl CsvSource {
    /// Creates a CSV source over the given input.
    pub fn new(input: SourceInput, options: CsvOptions) -> Self {
        Self { input, options }
    }

    /// Creates a CSV source for a file with default options.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(SourceInput::Path(path.into()), CsvOptions::default())
    }

    /// Creates a CSV source for an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, options: CsvOptions) -> Self {
        Self::new(SourceInput::Bytes(bytes.into()), options)
    }

    /// Returns the options used by this source.
    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    fn parse_error(e: arrow::error::ArrowError) -> AnalysisError {
        AnalysisError::parse_with_source("CSV", e.to_string(), Box::new(e))
    }
}

/// Replaces inferred date and timestamp types with `Utf8`.
///
/// The reader rejects impossible dates such as `2022-02-30` for the whole
/// file, so temporal text is kept as text here and parsed during
/// normalization, which reports the offending row.
fn text_for_temporal(schema: &Schema) -> Schema {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|field| {
            if field.data_type().is_temporal() {
                Field::new(field.name(), DataType::Utf8, field.is_nullable())
            } else {
                field.as_ref().clone()
            }
        })
        .collect();
    Schema::new(fields)
}

impl DataSource for CsvSource {
    #[instrument(skip(self), fields(
        source.type = "csv",
        csv.delimiter = %self.options.delimiter as char,
        csv.has_header = self.options.has_header
    ))]
    fn read(&self) -> Result<RawTable> {
        let content = self.input.read_all()?;
        let bytes = content.strip_prefix(UTF8_BOM).unwrap_or(&content[..]);
        let format = self.options.to_format()?;

        let (inferred, records) = format
            .infer_schema(Cursor::new(bytes), self.options.schema_infer_max_records)
            .map_err(Self::parse_error)?;
        let schema = Arc::new(text_for_temporal(&inferred));

        debug!(
            source.type = "csv",
            columns = schema.fields().len(),
            records_inferred = records,
            "Inferred CSV schema"
        );

        if schema.fields().is_empty() {
            return Ok(RawTable {
                batch: RecordBatch::new_empty(schema),
                format: SourceFormat::Csv,
            });
        }

        let reader = ReaderBuilder::new(Arc::clone(&schema))
            .with_format(format)
            .build(Cursor::new(bytes))
            .map_err(Self::parse_error)?;

        let batches = reader
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Self::parse_error)?;
        let batch = concat_batches(&schema, &batches).context("Failed to assemble CSV batches")?;

        Ok(RawTable {
            batch,
            format: SourceFormat::Csv,
        })
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Csv
    }

    fn description(&self) -> String {
        format!("CSV file: {}", self.input.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray, StringArray};
    use arrow::datatypes::DataType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "Date,Product Name,Units Sold,Sales Amount").unwrap();
        writeln!(file, "2022-01-01,Electronics,3,120.5").unwrap();
        writeln!(file, "2022-01-02,Clothing,,80.25").unwrap();
        writeln!(file, "2022-02-01,,7,NaN").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_file_infers_types() {
        let file = create_test_csv();
        let raw = CsvSource::from_path(file.path()).read().unwrap();

        assert_eq!(raw.num_rows(), 3);
        assert_eq!(raw.num_columns(), 4);
        let schema = raw.batch.schema();
        assert_eq!(schema.field(0).name(), "Date");
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(2).data_type(), &DataType::Int64);
        assert_eq!(schema.field(3).data_type(), &DataType::Float64);
    }

    #[test]
    fn test_impossible_dates_stay_text() {
        let raw = CsvSource::from_bytes(
            b"ship_date,created\n2022-01-01,2022-01-01T10:00:00\n2022-02-30,2022-01-02T11:30:00\n"
                .to_vec(),
            CsvOptions::default(),
        )
        .read()
        .unwrap();
        let schema = raw.batch.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Utf8);
        assert_eq!(raw.batch.column(0).as_string::<i32>().value(1), "2022-02-30");
    }

    #[test]
    fn test_missing_cells_become_null() {
        let file = create_test_csv();
        let raw = CsvSource::from_path(file.path()).read().unwrap();

        assert!(raw.batch.column(1).is_null(2));
        assert!(raw.batch.column(2).is_null(1));
        assert!(raw.batch.column(3).is_null(2));
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"id,name\n1,a\n");
        let raw = CsvSource::from_bytes(bytes, CsvOptions::default())
            .read()
            .unwrap();
        assert_eq!(raw.batch.schema().field(0).name(), "id");
    }

    #[test]
    fn test_tab_separated_bytes() {
        let raw = CsvSource::from_bytes(
            b"region\tamount\nNorth\t1\nSouth\t2\n".to_vec(),
            CsvOptions::tab_separated(),
        )
        .read()
        .unwrap();
        let regions = raw
            .batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(regions.value(1), "South");
    }

    #[test]
    fn test_ragged_rows_are_parse_errors() {
        let err = CsvSource::from_bytes(b"a,b\n1,2\n3\n".to_vec(), CsvOptions::default())
            .read()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Parse { ref format, .. } if format == "CSV"));
    }

    #[test]
    fn test_empty_input_has_no_columns() {
        let raw = CsvSource::from_bytes(Vec::new(), CsvOptions::default())
            .read()
            .unwrap();
        assert_eq!(raw.num_columns(), 0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = CsvSource::from_path("/no/such/dir/sales.csv")
            .read()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Io(_)));
    }

    #[test]
    fn test_invalid_null_pattern() {
        let options = CsvOptions::default().with_null_pattern(Some("(".to_string()));
        let err = CsvSource::from_bytes(b"a\n1\n".to_vec(), options)
            .read()
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfiguration(_)));
    }
}
