//! The normalized, immutable table every query runs against.
//!
//! [`NormalizedTable`] keeps one typed array per column, fixed by its
//! [`ColumnKind`]: `Float64` for numeric columns, naive millisecond
//! timestamps for temporal columns and `Utf8` for text. The same arrays are
//! also assembled into a single Arrow batch for callers that want Arrow or
//! DataFusion access. [`TableSchema`] is the explicit name → kind mapping
//! built during normalization, and the typed accessors go through it.

use crate::prelude::*;
use arrow::array::{Array, ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use chrono::{DateTime, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

mod dates;
mod normalize;

pub use dates::{DateParser, DEFAULT_DATE_FORMATS, RFC3339};
pub use normalize::{normalize, normalize_column_name, NormalizeOptions};

/// The tagged type of a normalized column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Numbers, stored as `Float64` with no missing values
    Numeric,
    /// Free text and categories, stored as `Utf8`
    Text,
    /// Dates and times, stored as naive millisecond timestamps
    Temporal,
}

impl ColumnKind {
    /// Lower-case name used in errors and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Text => "text",
            Self::Temporal => "temporal",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One column of a [`TableSchema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub kind: ColumnKind,
}

/// Ordered mapping from column name to [`ColumnKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    columns: Vec<ColumnDef>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TableSchema {
    /// Builds a schema, rejecting duplicate names.
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if index.insert(column.name.clone(), position).is_some() {
                return Err(AnalysisError::Internal(format!(
                    "Duplicate column '{}' in normalized schema",
                    column.name
                )));
            }
        }
        Ok(Self { columns, index })
    }

    /// Columns in table order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Column names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Names of the columns of one kind, in table order.
    pub fn names_of_kind(&self, kind: ColumnKind) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(move |c| c.kind == kind)
            .map(|c| c.name.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.index_of(name).map(|i| self.columns[i].kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Looks a column up, failing with `ColumnNotFound`.
    pub fn require(&self, name: &str) -> Result<(usize, ColumnKind)> {
        self.index_of(name)
            .map(|i| (i, self.columns[i].kind))
            .ok_or_else(|| AnalysisError::column_not_found(name))
    }

    /// Looks a column up and checks its kind.
    pub fn require_kind(&self, name: &str, expected: ColumnKind) -> Result<usize> {
        let (index, kind) = self.require(name)?;
        if kind != expected {
            return Err(AnalysisError::type_mismatch(
                name,
                expected.name(),
                kind.name(),
            ));
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// The values of one normalized column.
#[derive(Debug, Clone)]
pub enum ColumnData {
    Numeric(Float64Array),
    Text(StringArray),
    Temporal(TimestampMillisecondArray),
}

impl ColumnData {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Numeric(_) => ColumnKind::Numeric,
            Self::Text(_) => ColumnKind::Text,
            Self::Temporal(_) => ColumnKind::Temporal,
        }
    }

    pub fn len(&self) -> usize {
        self.as_array().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_array(&self) -> &dyn Array {
        match self {
            Self::Numeric(values) => values,
            Self::Text(values) => values,
            Self::Temporal(values) => values,
        }
    }

    fn to_array_ref(&self) -> ArrayRef {
        match self {
            Self::Numeric(values) => Arc::new(values.clone()),
            Self::Text(values) => Arc::new(values.clone()),
            Self::Temporal(values) => Arc::new(values.clone()),
        }
    }
}

/// The canonical table owned by a [`crate::analysis::TableAnalyzer`].
///
/// There is no mutation API: once built, a table only hands out shared
/// references to its arrays.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    schema: TableSchema,
    data: Vec<ColumnData>,
    batch: RecordBatch,
}

impl NormalizedTable {
    /// Assembles a table from named, already converted columns.
    pub(crate) fn try_new(columns: Vec<(String, ColumnData)>, num_rows: usize) -> Result<Self> {
        if let Some((name, values)) = columns.iter().find(|(_, values)| values.len() != num_rows) {
            return Err(AnalysisError::Internal(format!(
                "Column '{name}' has {} values, expected {num_rows}",
                values.len()
            )));
        }

        let fields: Vec<Field> = columns
            .iter()
            .map(|(name, values)| {
                Field::new(
                    name.clone(),
                    values.as_array().data_type().clone(),
                    values.kind() != ColumnKind::Numeric,
                )
            })
            .collect();
        let arrays: Vec<ArrayRef> = columns.iter().map(|(_, values)| values.to_array_ref()).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(num_rows));
        let batch =
            RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)?;

        let (defs, data): (Vec<ColumnDef>, Vec<ColumnData>) = columns
            .into_iter()
            .map(|(name, values)| {
                let def = ColumnDef {
                    name,
                    kind: values.kind(),
                };
                (def, values)
            })
            .unzip();

        Ok(Self {
            schema: TableSchema::new(defs)?,
            data,
            batch,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// The underlying Arrow schema.
    pub fn arrow_schema(&self) -> SchemaRef {
        self.batch.schema()
    }

    /// All columns as one Arrow batch.
    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn num_columns(&self) -> usize {
        self.data.len()
    }

    /// The values of any column.
    pub fn column(&self, name: &str) -> Result<&ColumnData> {
        let (index, _) = self.schema.require(name)?;
        Ok(&self.data[index])
    }

    /// The values of a numeric column.
    pub fn numeric_column(&self, name: &str) -> Result<&Float64Array> {
        match self.column(name)? {
            ColumnData::Numeric(values) => Ok(values),
            other => Err(mismatch(name, ColumnKind::Numeric, other)),
        }
    }

    /// The values of a temporal column (milliseconds since the epoch, naive).
    pub fn temporal_column(&self, name: &str) -> Result<&TimestampMillisecondArray> {
        match self.column(name)? {
            ColumnData::Temporal(values) => Ok(values),
            other => Err(mismatch(name, ColumnKind::Temporal, other)),
        }
    }

    /// The values of a text column.
    pub fn text_column(&self, name: &str) -> Result<&StringArray> {
        match self.column(name)? {
            ColumnData::Text(values) => Ok(values),
            other => Err(mismatch(name, ColumnKind::Text, other)),
        }
    }

    /// All numeric columns in table order.
    pub fn numeric_columns(&self) -> Vec<(&str, &Float64Array)> {
        self.schema
            .columns()
            .iter()
            .zip(&self.data)
            .filter_map(|(def, values)| match values {
                ColumnData::Numeric(values) => Some((def.name.as_str(), values)),
                _ => None,
            })
            .collect()
    }
}

fn mismatch(name: &str, expected: ColumnKind, found: &ColumnData) -> AnalysisError {
    AnalysisError::type_mismatch(name, expected.name(), found.kind().name())
}

/// Converts stored milliseconds back to a naive date-time.
pub fn millis_to_datetime(millis: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Renders a date-time as a date alone when it falls on midnight.
pub fn format_datetime(value: NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
