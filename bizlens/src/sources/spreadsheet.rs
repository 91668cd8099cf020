//! Spreadsheet source implementation (xls, xlsx, xlsm, xlsb, ods).
//!
//! Cells are typed per column: a column whose non-empty cells are all numbers
//! becomes `Float64`, one whose non-empty cells are all dates becomes a
//! millisecond timestamp, and anything else is rendered to text.

use super::{DataSource, RawTable, SourceFormat, SourceInput};
use crate::prelude::*;
use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use chrono::NaiveDateTime;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Options for configuring spreadsheet reading.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetOptions {
    /// Worksheet to read; the first worksheet when `None`
    pub sheet: Option<String>,
}

impl SpreadsheetOptions {
    /// Reads the named worksheet instead of the first one.
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

/// A workbook source. The first row of the worksheet holds the column names.
#[derive(Debug, Clone)]
pub struct SpreadsheetSource {
    input: SourceInput,
    options: SpreadsheetOptions,
}

impl SpreadsheetSource {
    /// Creates a spreadsheet source over the given input.
    pub fn new(input: SourceInput, options: SpreadsheetOptions) -> Self {
        Self { input, options }
    }

    /// Creates a spreadsheet source for a workbook file with default options.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(SourceInput::Path(path.into()), SpreadsheetOptions::default())
    }

    fn parse_error(e: calamine::Error) -> AnalysisError {
        AnalysisError::parse_with_source("spreadsheet", e.to_string(), Box::new(e))
    }
}

impl DataSource for SpreadsheetSource {
    #[instrument(skip(self), fields(source.type = "spreadsheet", sheet = ?self.options.sheet))]
    fn read(&self) -> Result<RawTable> {
        let content = self.input.read_all()?;
        let mut workbook =
            open_workbook_auto_from_rs(Cursor::new(content.to_vec())).map_err(Self::parse_error)?;

        let sheet = match &self.options.sheet {
            Some(name) => name.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| AnalysisError::parse("spreadsheet", "Workbook has no worksheets"))?,
        };

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(Self::parse_error)?;

        debug!(
            sheet = %sheet,
            rows = range.height(),
            columns = range.width(),
            "Read worksheet range"
        );

        Ok(RawTable {
            batch: range_to_batch(&range)?,
            format: SourceFormat::Spreadsheet,
        })
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Spreadsheet
    }

    fn description(&self) -> String {
        format!("Spreadsheet: {}", self.input.describe())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellColumnType {
    Number,
    DateTime,
    Text,
}

/// Converts a worksheet range (header row first) into a single batch.
pub(crate) fn range_to_batch(range: &Range<Data>) -> Result<RecordBatch> {
    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    };
    let body: Vec<&[Data]> = rows.collect();

    let mut fields = Vec::with_capacity(header.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(header.len());

    for (index, name_cell) in header.iter().enumerate() {
        let name = match name_cell {
            Data::Empty => format!("column_{}", index + 1),
            other => cell_text(other).unwrap_or_default(),
        };
        let cells: Vec<&Data> = body
            .iter()
            .map(|row| row.get(index).unwrap_or(&Data::Empty))
            .collect();

        let (data_type, array): (DataType, ArrayRef) = match column_type(&cells) {
            CellColumnType::Number => (
                DataType::Float64,
                Arc::new(cells.iter().map(|c| cell_number(c)).collect::<Float64Array>()),
            ),
            CellColumnType::DateTime => (
                DataType::Timestamp(TimeUnit::Millisecond, None),
                Arc::new(
                    cells
                        .iter()
                        .map(|c| cell_datetime(c).map(|dt| dt.and_utc().timestamp_millis()))
                        .collect::<TimestampMillisecondArray>(),
                ),
            ),
            CellColumnType::Text => (
                DataType::Utf8,
                Arc::new(cells.iter().map(|c| cell_text(c)).collect::<StringArray>()),
            ),
        };
        fields.push(Field::new(name, data_type, true));
        columns.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(body.len()));
    let batch = RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), columns, &options)?;
    Ok(batch)
}

fn is_missing(cell: &Data) -> bool {
    matches!(cell, Data::Empty | Data::Error(_))
        || matches!(cell, Data::String(s) if s.trim().is_empty())
}

fn column_type(cells: &[&Data]) -> CellColumnType {
    let mut present = cells.iter().filter(|c| !is_missing(c)).peekable();
    if present.peek().is_none() {
        // An all-empty column behaves like an all-missing numeric column.
        return CellColumnType::Number;
    }
    let present: Vec<&&Data> = present.collect();
    if present
        .iter()
        .all(|c| matches!(c, Data::Int(_) | Data::Float(_)))
    {
        CellColumnType::Number
    } else if present.iter().all(|c| cell_datetime(c).is_some()) {
        CellColumnType::DateTime
    } else {
        CellColumnType::Text
    }
}

fn cell_number(cell: &Data) -> Option<f64> {
    match cell {
        Data::Int(v) => Some(*v as f64),
        Data::Float(v) => Some(*v),
        _ => None,
    }
}

fn cell_datetime(cell: &Data) -> Option<NaiveDateTime> {
    match cell {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(s) => s
            .parse::<NaiveDateTime>()
            .ok()
            .or_else(|| s.parse::<chrono::NaiveDate>().ok().map(|d| d.and_time(chrono::NaiveTime::MIN))),
        _ => None,
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    if is_missing(cell) {
        return None;
    }
    match cell {
        Data::String(s) => Some(s.clone()),
        Data::Int(v) => Some(v.to_string()),
        Data::Float(v) => Some(v.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(
            dt.as_datetime()
                .map(|d| d.to_string())
                .unwrap_or_else(|| dt.as_f64().to_string()),
        ),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Error(_) | Data::Empty => None,
    }
}
