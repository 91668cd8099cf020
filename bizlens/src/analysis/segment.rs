//! Grouped aggregation of one numeric column by the distinct values of another.

use super::TableAnalyzer;
use crate::log_data_op;
use crate::prelude::*;
use crate::stats::Moments;
use crate::table::{format_datetime, millis_to_datetime, ColumnData, ColumnKind};
use arrow::array::Array;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use tracing::instrument;

/// Label shown for the group of rows whose segment value is missing.
pub const MISSING_SEGMENT_LABEL: &str = "(missing)";

/// A distinct value of the segment column.
///
/// Numbers and timestamps are rendered to text so that every kind of column
/// groups the same way. Serializes as a string, or `null` for
/// [`SegmentKey::Missing`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentKey {
    Value(String),
    Missing,
}

impl SegmentKey {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(value) => Some(value),
            Self::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or(MISSING_SEGMENT_LABEL))
    }
}

impl From<&str> for SegmentKey {
    fn from(value: &str) -> Self {
        Self::Value(value.to_string())
    }
}

impl Serialize for SegmentKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Value(value) => serializer.serialize_str(value),
            Self::Missing => serializer.serialize_none(),
        }
    }
}

/// Aggregates of one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentAggregate {
    pub segment: SegmentKey,
    pub sum: f64,
    pub mean: f64,
    pub count: u64,
    /// Sample standard deviation; `NaN` for single-row segments
    pub std: f64,
}

impl TableAnalyzer {
    /// Aggregates `value_column` per distinct value of `segment_column`.
    ///
    /// Any column can segment. Results are ordered by descending sum; equal
    /// sums keep the order in which the segments first appear in the table,
    /// and `NaN` sums come last.
    #[instrument(skip(self), fields(segment_column = %segment_column, value_column = %value_column))]
    pub fn segment_aggregate(
        &self,
        segment_column: &str,
        value_column: &str,
    ) -> Result<Vec<SegmentAggregate>> {
        let schema = self.schema();
        schema.require(segment_column)?;
        schema.require(value_column)?;
        let values = self.table().numeric_column(value_column)?;
        let segments = self.table().column(segment_column)?;

        let mut positions: HashMap<SegmentKey, usize> = HashMap::new();
        let mut groups: Vec<(SegmentKey, Moments)> = Vec::new();
        for row in 0..values.len() {
            let key = segment_key(segments, row);
            let position = match positions.get(&key) {
                Some(&position) => position,
                None => {
                    positions.insert(key.clone(), groups.len());
                    groups.push((key, Moments::new()));
                    groups.len() - 1
                }
            };
            groups[position].1.push(values.value(row));
        }

        let mut result: Vec<SegmentAggregate> = groups
            .into_iter()
            .map(|(segment, moments)| SegmentAggregate {
                segment,
                sum: moments.sum(),
                mean: moments.mean(),
                count: moments.count(),
                std: moments.sample_std_dev().unwrap_or(f64::NAN),
            })
            .collect();
        // sort_by is stable, which keeps first-appearance order for ties
        result.sort_by(|a, b| descending_nan_last(a.sum, b.sum));

        log_data_op!(
            self.log_config(),
            segments = result.len(),
            segment_kind = %schema.kind_of(segment_column).unwrap_or(ColumnKind::Text),
            "Computed segment aggregate"
        );
        Ok(result)
    }
}

fn segment_key(segments: &ColumnData, row: usize) -> SegmentKey {
    match segments {
        ColumnData::Numeric(values) => {
            // -0.0 and 0.0 are one segment
            let value = values.value(row) + 0.0;
            SegmentKey::Value(value.to_string())
        }
        ColumnData::Text(values) if values.is_null(row) => SegmentKey::Missing,
        ColumnData::Text(values) => SegmentKey::Value(values.value(row).to_string()),
        ColumnData::Temporal(values) if values.is_null(row) => SegmentKey::Missing,
        ColumnData::Temporal(values) => millis_to_datetime(values.value(row))
            .map(|dt| SegmentKey::Value(format_datetime(dt)))
            .unwrap_or(SegmentKey::Missing),
    }
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::sample_analyzer;
    use crate::sources::SourceFormat;

    fn load(csv: &str) -> TableAnalyzer {
        TableAnalyzer::from_bytes(csv.as_bytes().to_vec(), SourceFormat::Csv).unwrap()
    }

    #[test]
    fn test_segment_example() {
        let analyzer = sample_analyzer();
        let result = analyzer.segment_aggregate("region", "sales_amount").unwrap();
        assert_eq!(result.len(), 2);

        assert_eq!(result[0].segment, SegmentKey::from("B"));
        assert_eq!(result[0].sum, 20.0);
        assert_eq!(result[0].count, 1);
        assert!(result[0].std.is_nan());

        assert_eq!(result[1].segment, SegmentKey::from("A"));
        assert_eq!(result[1].sum, 15.0);
        assert_eq!(result[1].mean, 7.5);
        assert_eq!(result[1].count, 2);
        assert!((result[1].std - 3.535_533_905_932_738).abs() < 1e-12);
    }

    #[test]
    fn test_ties_keep_first_appearance() {
        let analyzer = load("region,amount\nWest,5\nEast,5\nNorth,9\nSouth,5\n");
        let order: Vec<String> = analyzer
            .segment_aggregate("region", "amount")
            .unwrap()
            .iter()
            .map(|s| s.segment.to_string())
            .collect();
        assert_eq!(order, vec!["North", "West", "East", "South"]);
    }

    #[test]
    fn test_missing_segment_values_form_a_group() {
        let analyzer = load("region,amount\nNorth,1\n,2\nNorth,3\n,4\n");
        let result = analyzer.segment_aggregate("region", "amount").unwrap();
        assert_eq!(result[0].segment, SegmentKey::Missing);
        assert_eq!(result[0].sum, 6.0);
        assert_eq!(result[0].segment.to_string(), "(missing)");
    }

    #[test]
    fn test_numeric_and_temporal_segments() {
        let analyzer = load("date,units,amount\n2022-01-01,3,1\n2022-01-01,3,2\n2022-01-02,1.5,4\n");

        let by_units = analyzer.segment_aggregate("units", "amount").unwrap();
        let keys: Vec<String> = by_units.iter().map(|s| s.segment.to_string()).collect();
        assert_eq!(keys, vec!["1.5", "3"]);

        let by_date = analyzer.segment_aggregate("date", "amount").unwrap();
        assert_eq!(by_date[0].segment, SegmentKey::from("2022-01-02"));
        assert_eq!(by_date[1].segment, SegmentKey::from("2022-01-01"));
        assert_eq!(by_date[1].count, 2);
    }

    #[test]
    fn test_signed_zero_is_one_segment() {
        let analyzer = load("delta,amount\n-0.0,1\n0.0,2\n2.5,1\n");
        let result = analyzer.segment_aggregate("delta", "amount").unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].segment, SegmentKey::from("0"));
        assert_eq!(result[0].sum, 3.0);
        assert_eq!(result[0].count, 2);
    }

    #[test]
    fn test_segment_by_value_column_itself() {
        let analyzer = load("amount\n2\n2\n1\n");
        let result = analyzer.segment_aggregate("amount", "amount").unwrap();
        assert_eq!(result[0].segment, SegmentKey::from("2"));
        assert_eq!(result[0].sum, 4.0);
    }

    #[test]
    fn test_nan_sums_sort_last() {
        let mut sums = [f64::NAN, 1.0, 3.0, f64::NAN, 2.0];
        sums.sort_by(|a, b| descending_nan_last(*a, *b));
        assert_eq!(&sums[..3], &[3.0, 2.0, 1.0]);
        assert!(sums[3].is_nan() && sums[4].is_nan());
    }

    #[test]
    fn test_column_errors() {
        let analyzer = sample_analyzer();
        assert!(matches!(
            analyzer.segment_aggregate("channel", "sales_amount"),
            Err(AnalysisError::ColumnNotFound { ref column }) if column == "channel"
        ));
        assert!(matches!(
            analyzer.segment_aggregate("region", "revenue"),
            Err(AnalysisError::ColumnNotFound { .. })
        ));
        assert!(matches!(
            analyzer.segment_aggregate("sales_amount", "region"),
            Err(AnalysisError::ColumnTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_key_serializes_as_null() {
        let json = serde_json::to_string(&vec![SegmentKey::from("A"), SegmentKey::Missing]).unwrap();
        assert_eq!(json, r#"["A",null]"#);
    }
}
