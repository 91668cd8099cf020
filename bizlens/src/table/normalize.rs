//! Turns a freshly parsed [`RawTable`](crate::sources::RawTable) batch into a
//! [`NormalizedTable`].
//!
//! The pipeline runs once per load:
//!
//! 1. column names are lower-cased and spaces become underscores; if two
//!    columns collide, the later one wins
//! 2. the designated date column is parsed into timestamps
//! 3. every remaining column is classified by its Arrow type and cast to the
//!    storage type of its [`ColumnKind`]
//! 4. missing numeric values (nulls and `NaN`) are replaced with `0`

use super::{ColumnData, ColumnKind, DateParser, NormalizedTable};
use crate::logging::{truncate_field, LogConfig};
use crate::prelude::*;
use crate::{log_column_detail, log_data_op, perf_debug};
use arrow::array::{Array, ArrayRef, AsArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, TimeUnit, TimestampMillisecondType};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use tracing::{instrument, warn};

/// Settings for [`normalize`].
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Normalized name of the column parsed as dates
    pub date_column: String,
    pub date_parser: DateParser,
    pub log: LogConfig,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            date_column: "date".to_string(),
            date_parser: DateParser::default(),
            log: LogConfig::default(),
        }
    }
}

/// Canonical form of a column name.
///
/// ```rust
/// use bizlens::table::normalize_column_name;
///
/// assert_eq!(normalize_column_name("Sales Amount"), "sales_amount");
/// assert_eq!(normalize_column_name("\u{feff}Date"), "date");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace(' ', "_")
}

/// Normalizes a raw batch.
///
/// Fails with [`AnalysisError::EmptyTable`] when the batch has no columns and
/// with [`AnalysisError::DateParse`] when the date column holds a value that
/// matches none of the configured formats.
#[instrument(skip(batch, options), fields(
    table.rows = batch.num_rows(),
    table.columns = batch.num_columns(),
    date_column = %options.date_column
))]
pub fn normalize(batch: &RecordBatch, options: &NormalizeOptions) -> Result<NormalizedTable> {
    if batch.num_columns() == 0 {
        return Err(AnalysisError::EmptyTable);
    }

    let raw_schema = batch.schema();
    let names: Vec<String> = raw_schema
        .fields()
        .iter()
        .map(|f| normalize_column_name(f.name()))
        .collect();

    let mut last_position: HashMap<&str, usize> = HashMap::with_capacity(names.len());
    for (position, name) in names.iter().enumerate() {
        last_position.insert(name.as_str(), position);
    }

    let mut columns = Vec::with_capacity(last_position.len());

    for (position, name) in names.iter().enumerate() {
        let original = raw_schema.field(position).name();
        if last_position.get(name.as_str()) != Some(&position) {
            warn!(
                column = %original,
                normalized = %name,
                "Dropping column shadowed by a later column with the same normalized name"
            );
            continue;
        }

        let raw = batch.column(position);
        let values = if *name == options.date_column {
            let parsed = options
                .date_parser
                .parse_column(name, raw)
                .inspect_err(|e| {
                    if let AnalysisError::DateParse { row, value, .. } = e {
                        warn!(
                            column = %name,
                            row,
                            value = %truncate_field(value, options.log.max_field_length),
                            "Unparseable date value"
                        );
                    }
                })?;
            ColumnData::Temporal(parsed)
        } else {
            convert_column(raw)?
        };

        log_column_detail!(
            options.log,
            column = %name,
            source_column = %original,
            source_type = %raw.data_type(),
            kind = %values.kind(),
            nulls = raw.null_count(),
            "Normalized column"
        );

        columns.push((name.clone(), values));
    }

    let table = NormalizedTable::try_new(columns, batch.num_rows())?;
    let schema = table.schema();

    perf_debug!(
        options.log,
        numeric = schema.names_of_kind(ColumnKind::Numeric).count(),
        temporal = schema.names_of_kind(ColumnKind::Temporal).count(),
        text = schema.names_of_kind(ColumnKind::Text).count(),
        "Column kinds assigned"
    );
    log_data_op!(
        options.log,
        rows = table.num_rows(),
        columns = table.num_columns(),
        "Normalized table"
    );

    Ok(table)
}

/// Classifies a non-date column and casts it to its storage type.
fn convert_column(raw: &ArrayRef) -> Result<ColumnData> {
    let values = match raw.data_type() {
        DataType::Null => ColumnData::Numeric(fill_numeric(raw)?),
        data_type if data_type.is_numeric() => ColumnData::Numeric(fill_numeric(raw)?),
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            let converted = cast(raw, &DataType::Timestamp(TimeUnit::Millisecond, None))?;
            ColumnData::Temporal(converted.as_primitive::<TimestampMillisecondType>().clone())
        }
        DataType::Utf8 => ColumnData::Text(raw.as_string::<i32>().clone()),
        _ => {
            let converted = cast(raw, &DataType::Utf8)?;
            ColumnData::Text(converted.as_string::<i32>().clone())
        }
    };
    Ok(values)
}

/// Widens to `Float64` and replaces nulls and `NaN` with zero.
fn fill_numeric(raw: &ArrayRef) -> Result<Float64Array> {
    let widened = cast(raw, &DataType::Float64)?;
    let values = widened.as_primitive::<Float64Type>();
    Ok(Float64Array::from_iter_values(values.iter().map(
        |v| match v {
            Some(x) if !x.is_nan() => x,
            _ => 0.0,
        },
    )))
}
