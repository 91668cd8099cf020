//! The analyzer and its four read-only queries.
//!
//! A [`TableAnalyzer`] is built once from a [`TableSource`] (or an Arrow
//! batch). Construction reads the whole source, normalizes it and either
//! succeeds with a fully usable analyzer or fails; there is no partially
//! loaded state. Every query afterwards takes `&self` and is pure.
//!
//! # Examples
//!
//! ```rust
//! use bizlens::prelude::*;
//!
//! # fn example() -> bizlens::error::Result<()> {
//! let csv = "Date,Region,Sales Amount\n\
//!            2022-01-01,A,10\n\
//!            2022-01-02,B,20\n\
//!            2022-02-01,A,5\n";
//! let analyzer = TableAnalyzer::from_bytes(csv.as_bytes().to_vec(), SourceFormat::Csv)?;
//!
//! let monthly = analyzer.period_aggregate("date", "sales_amount", Granularity::Month)?;
//! assert_eq!(monthly[0].sum, 30.0);
//!
//! let segments = analyzer.segment_aggregate("region", "sales_amount")?;
//! assert_eq!(segments[0].segment.to_string(), "B");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::logging::LogConfig;
use crate::prelude::*;
use crate::sources::{CsvOptions, SourceFormat, SpreadsheetOptions, TableSource};
use crate::table::{
    millis_to_datetime, normalize, normalize_column_name, ColumnKind, DateParser, NormalizeOptions,
    NormalizedTable, TableSchema, DEFAULT_DATE_FORMATS,
};
use crate::{log_data_op, sql};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use datafusion::prelude::SessionContext;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

mod correlation;
mod period;
mod segment;
mod summary;

pub use correlation::CorrelationMatrix;
pub use period::{DateRange, Granularity, PeriodAggregate};
pub use segment::{SegmentAggregate, SegmentKey};
pub use summary::{ColumnSummary, SummaryStats};

/// Configuration for loading and normalizing a table.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// CSV parsing options
    pub csv: CsvOptions,
    /// Spreadsheet reading options
    pub spreadsheet: SpreadsheetOptions,
    /// Column parsed as dates, matched after name normalization
    pub date_column: String,
    /// Date formats tried in order for text values
    pub date_formats: Vec<String>,
    /// Logging behavior for load and queries
    pub log: LogConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            csv: CsvOptions::default(),
            spreadsheet: SpreadsheetOptions::default(),
            date_column: "date".to_string(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            log: LogConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Default parsing with verbose logging.
    pub fn verbose() -> Self {
        Self {
            log: LogConfig::verbose(),
            ..Self::default()
        }
    }

    /// Default parsing with minimal logging.
    pub fn production() -> Self {
        Self {
            log: LogConfig::production(),
            ..Self::default()
        }
    }

    pub fn with_csv(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    pub fn with_spreadsheet(mut self, spreadsheet: SpreadsheetOptions) -> Self {
        self.spreadsheet = spreadsheet;
        self
    }

    pub fn with_date_column(mut self, column: impl Into<String>) -> Self {
        self.date_column = column.into();
        self
    }

    pub fn with_date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    fn normalize_options(&self) -> Result<NormalizeOptions> {
        if self.date_formats.is_empty() {
            return Err(AnalysisError::InvalidConfiguration(
                "At least one date format is required".to_string(),
            ));
        }
        Ok(NormalizeOptions {
            date_column: normalize_column_name(&self.date_column),
            date_parser: DateParser::new(self.date_formats.iter().cloned()),
            log: self.log.clone(),
        })
    }
}

/// Builder for a [`TableAnalyzer`] with non-default configuration.
///
/// ```rust,no_run
/// use bizlens::prelude::*;
/// use bizlens::sources::CsvOptions;
///
/// # fn example() -> bizlens::error::Result<()> {
/// let analyzer = TableAnalyzer::builder()
///     .csv_options(CsvOptions::tab_separated())
///     .date_column("Order Date")
///     .from_path("orders.csv")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct TableAnalyzerBuilder {
    config: AnalyzerConfig,
}

impl TableAnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn csv_options(mut self, csv: CsvOptions) -> Self {
        self.config.csv = csv;
        self
    }

    /// Reads the named worksheet of spreadsheet sources.
    pub fn sheet(mut self, sheet: impl Into<String>) -> Self {
        self.config.spreadsheet = self.config.spreadsheet.with_sheet(sheet);
        self
    }

    pub fn date_column(mut self, column: impl Into<String>) -> Self {
        self.config.date_column = column.into();
        self
    }

    pub fn date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config = self.config.with_date_formats(formats);
        self
    }

    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.config.log = log;
        self
    }

    /// Reads, parses and normalizes a source.
    #[instrument(skip(self, source), fields(source = %source, source.format = %source.format()))]
    pub fn load(self, source: TableSource) -> Result<TableAnalyzer> {
        let options = self.config.normalize_options()?;
        let format = source.format();
        let reader = source.into_data_source(&self.config.csv, &self.config.spreadsheet);

        log_data_op!(
            self.config.log,
            source = %reader.description(),
            "Loading table"
        );
        let raw = reader.read()?;
        let table = normalize(&raw.batch, &options)?;

        log_data_op!(
            self.config.log,
            source.format = %format,
            table.rows = table.num_rows(),
            table.columns = table.num_columns(),
            "Loaded table"
        );

        Ok(TableAnalyzer {
            table,
            source_format: Some(format),
            log: self.config.log,
        })
    }

    /// Loads a file, detecting its format from the extension.
    pub fn from_path(self, path: impl Into<PathBuf>) -> Result<TableAnalyzer> {
        let source = TableSource::from_path(path)?;
        self.load(source)
    }

    /// Loads an in-memory buffer of the declared format.
    pub fn from_bytes(self, bytes: impl Into<Arc<[u8]>>, format: SourceFormat) -> Result<TableAnalyzer> {
        self.load(TableSource::from_bytes(bytes, format))
    }

    /// Normalizes a batch the caller already holds.
    #[instrument(skip(self, batch), fields(table.rows = batch.num_rows(), table.columns = batch.num_columns()))]
    pub fn from_record_batch(self, batch: &RecordBatch) -> Result<TableAnalyzer> {
        let options = self.config.normalize_options()?;
        let table = normalize(batch, &options)?;
        Ok(TableAnalyzer {
            table,
            source_format: None,
            log: self.config.log,
        })
    }
}

/// Loads a table once and answers analytical queries over it.
#[derive(Debug, Clone)]
pub struct TableAnalyzer {
    table: NormalizedTable,
    source_format: Option<SourceFormat>,
    log: LogConfig,
}

impl TableAnalyzer {
    /// Loads a source with the default configuration.
    pub fn load(source: TableSource) -> Result<Self> {
        TableAnalyzerBuilder::default().load(source)
    }

    /// Loads a file with the default configuration.
    ///
    /// The format comes from the extension; anything other than CSV or a
    /// spreadsheet fails with [`AnalysisError::UnsupportedFormat`] without
    /// opening the file.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        TableAnalyzerBuilder::default().from_path(path)
    }

    /// Loads an in-memory buffer with the default configuration.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>, format: SourceFormat) -> Result<Self> {
        TableAnalyzerBuilder::default().from_bytes(bytes, format)
    }

    /// Normalizes an Arrow batch with the default configuration.
    pub fn from_record_batch(batch: &RecordBatch) -> Result<Self> {
        TableAnalyzerBuilder::default().from_record_batch(batch)
    }

    pub fn builder() -> TableAnalyzerBuilder {
        TableAnalyzerBuilder::default()
    }

    /// The normalized table.
    pub fn table(&self) -> &NormalizedTable {
        &self.table
    }

    pub fn schema(&self) -> &TableSchema {
        self.table.schema()
    }

    /// Format the table was loaded from; `None` for Arrow input.
    pub fn source_format(&self) -> Option<SourceFormat> {
        self.source_format
    }

    /// Normalized column names in table order.
    pub fn columns(&self) -> Vec<&str> {
        self.schema().names().collect()
    }

    /// Numeric column names in table order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.schema().names_of_kind(ColumnKind::Numeric).collect()
    }

    pub fn row_count(&self) -> usize {
        self.table.num_rows()
    }

    /// True when the table has columns but no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// The first numeric column, the natural default measure.
    pub fn default_value_column(&self) -> Option<&str> {
        self.schema().names_of_kind(ColumnKind::Numeric).next()
    }

    /// Columns that can segment `value_column`: every other column.
    pub fn segment_candidates(&self, value_column: &str) -> Vec<&str> {
        self.schema()
            .names()
            .filter(|name| *name != value_column)
            .collect()
    }

    /// Earliest and latest timestamp of a temporal column, ignoring nulls.
    pub fn time_bounds(&self, column: &str) -> Result<Option<(NaiveDateTime, NaiveDateTime)>> {
        let values = self.table.temporal_column(column)?;
        let bounds = arrow::compute::min(values)
            .zip(arrow::compute::max(values))
            .and_then(|(min, max)| millis_to_datetime(min).zip(millis_to_datetime(max)));
        Ok(bounds)
    }

    /// Registers the normalized table with a DataFusion context for SQL access.
    ///
    /// Fails with [`AnalysisError::InvalidConfiguration`] unless `table_name`
    /// is a plain SQL identifier.
    pub fn register(&self, ctx: &SessionContext, table_name: &str) -> Result<()> {
        sql::register_table(ctx, table_name, &self.table)?;
        log_data_op!(
            self.log,
            table.name = %table_name,
            table.rows = self.row_count(),
            "Registered table for SQL"
        );
        Ok(())
    }

    pub(crate) fn log_config(&self) -> &LogConfig {
        &self.log
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Three sales rows used across the query tests.
    pub(crate) fn sample_analyzer() -> TableAnalyzer {
        let csv = "Date,Region,Sales Amount,Units\n\
                   2022-01-01,A,10,1\n\
                   2022-01-02,B,20,3\n\
                   2022-02-01,A,5,2\n";
        TableAnalyzer::from_bytes(csv.as_bytes().to_vec(), SourceFormat::Csv).unwrap()
    }

    #[test]
    fn test_analyzer_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TableAnalyzer>();
    }

    #[test]
    fn test_load_normalizes_columns() {
        let analyzer = sample_analyzer();
        assert_eq!(
            analyzer.columns(),
            vec!["date", "region", "sales_amount", "units"]
        );
        assert_eq!(analyzer.numeric_columns(), vec!["sales_amount", "units"]);
        assert_eq!(analyzer.row_count(), 3);
        assert_eq!(analyzer.source_format(), Some(SourceFormat::Csv));
        assert_eq!(analyzer.schema().kind_of("date"), Some(ColumnKind::Temporal));
    }

    #[test]
    fn test_selector_helpers() {
        let analyzer = sample_analyzer();
        assert_eq!(analyzer.default_value_column(), Some("sales_amount"));
        assert_eq!(
            analyzer.segment_candidates("sales_amount"),
            vec!["date", "region", "units"]
        );
    }

    #[test]
    fn test_time_bounds() {
        let analyzer = sample_analyzer();
        let (start, end) = analyzer.time_bounds("date").unwrap().unwrap();
        assert_eq!(start.to_string(), "2022-01-01 00:00:00");
        assert_eq!(end.to_string(), "2022-02-01 00:00:00");

        assert!(matches!(
            analyzer.time_bounds("region"),
            Err(AnalysisError::ColumnTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_date_column_is_configurable() {
        let csv = "Order Date,amount\n2022-03-01,1\n";
        let analyzer = TableAnalyzer::builder()
            .date_column("Order Date")
            .from_bytes(csv.as_bytes().to_vec(), SourceFormat::Csv)
            .unwrap();
        assert_eq!(
            analyzer.schema().kind_of("order_date"),
            Some(ColumnKind::Temporal)
        );
    }

    #[test]
    fn test_empty_date_formats_rejected() {
        let err = TableAnalyzer::builder()
            .date_formats(Vec::<String>::new())
            .from_bytes(b"a\n1\n".to_vec(), SourceFormat::Csv)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_header_only_csv_is_tolerated() {
        let analyzer =
            TableAnalyzer::from_bytes(b"date,amount,units\n".to_vec(), SourceFormat::Csv).unwrap();
        assert!(analyzer.is_empty());
        assert_eq!(analyzer.columns(), vec!["date", "amount", "units"]);
        assert_eq!(analyzer.numeric_columns(), vec!["amount", "units"]);
        assert_eq!(analyzer.time_bounds("date").unwrap(), None);

        assert_eq!(
            analyzer
                .period_aggregate("date", "amount", Granularity::Month)
                .unwrap(),
            vec![]
        );
        assert!(analyzer
            .segment_aggregate("date", "amount")
            .unwrap()
            .is_empty());

        let matrix = analyzer.correlation_matrix();
        assert_eq!(matrix.len(), 2);
        for i in 0..matrix.len() {
            assert!(matrix.row(i).unwrap().iter().all(|v| v.is_nan()));
        }
    }

    #[test]
    fn test_declared_format_overrides_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.txt");
        std::fs::write(&path, "Date,Amount\n2022-01-01,4\n2022-01-02,6\n").unwrap();

        assert!(matches!(
            TableAnalyzer::from_path(&path),
            Err(AnalysisError::UnsupportedFormat { .. })
        ));

        let analyzer =
            TableAnalyzer::load(TableSource::from_path_with_format(&path, SourceFormat::Csv))
                .unwrap();
        assert_eq!(analyzer.source_format(), Some(SourceFormat::Csv));
        assert_eq!(analyzer.row_count(), 2);
        assert_eq!(analyzer.schema().kind_of("date"), Some(ColumnKind::Temporal));
    }

    #[test]
    fn test_empty_input_is_empty_table() {
        let err = TableAnalyzer::from_bytes(Vec::new(), SourceFormat::Csv).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyTable));
    }
}
