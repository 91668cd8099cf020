//! Date parsing for the designated date column.

use crate::prelude::*;
use arrow::array::{Array, ArrayRef, AsArray, TimestampMillisecondArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, TimeUnit, TimestampMillisecondType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Format name that selects RFC 3339 parsing rather than a `strftime` pattern.
pub const RFC3339: &str = "rfc3339";

/// Formats tried, in order, for text values in the date column.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    RFC3339,
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
];

const TIMESTAMP_MS: DataType = DataType::Timestamp(TimeUnit::Millisecond, None);

/// Parses cell values into naive date-times using an ordered format list.
///
/// Patterns without a time component produce midnight. RFC 3339 values with
/// an offset are converted to UTC before the offset is dropped.
///
/// # Examples
///
/// ```rust
/// use bizlens::table::DateParser;
///
/// let parser = DateParser::default();
/// let parsed = parser.parse(" 2022-03-01 ").unwrap();
/// assert_eq!(parsed.to_string(), "2022-03-01 00:00:00");
/// assert!(parser.parse("next tuesday").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParser {
    formats: Vec<String>,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS.iter().copied())
    }
}

impl DateParser {
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
        }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Parses one value; surrounding whitespace is ignored.
    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        self.formats
            .iter()
            .find_map(|format| parse_with(value, format))
    }

    /// Converts a raw date column into naive millisecond timestamps.
    ///
    /// Nulls stay null. The first value that cannot be interpreted fails the
    /// whole column with [`AnalysisError::DateParse`].
    pub(crate) fn parse_column(
        &self,
        column: &str,
        array: &ArrayRef,
    ) -> Result<TimestampMillisecondArray> {
        match array.data_type() {
            DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
                let converted = cast(array, &TIMESTAMP_MS)?;
                Ok(converted
                    .as_primitive::<TimestampMillisecondType>()
                    .clone())
            }
            DataType::Null => Ok(TimestampMillisecondArray::new_null(array.len())),
            data_type if data_type.is_numeric() => self.parse_numeric(column, array),
            DataType::Utf8 => self.parse_strings(column, array),
            _ => {
                let text = cast(array, &DataType::Utf8)?;
                self.parse_strings(column, &text)
            }
        }
    }

    fn parse_strings(&self, column: &str, array: &ArrayRef) -> Result<TimestampMillisecondArray> {
        let values = array.as_string::<i32>();
        values
            .iter()
            .enumerate()
            .map(|(row, value)| match value {
                None => Ok(None),
                Some(raw) if raw.trim().is_empty() => Ok(None),
                Some(raw) => self
                    .parse(raw)
                    .map(|dt| Some(dt.and_utc().timestamp_millis()))
                    .ok_or_else(|| date_error(column, row, raw)),
            })
            .collect()
    }

    /// Integral numbers are read as digit strings, so `20220101` matches `%Y%m%d`.
    fn parse_numeric(&self, column: &str, array: &ArrayRef) -> Result<TimestampMillisecondArray> {
        let floats = cast(array, &DataType::Float64)?;
        floats
            .as_primitive::<Float64Type>()
            .iter()
            .enumerate()
            .map(|(row, value)| match value {
                None => Ok(None),
                Some(v) if v.is_nan() => Ok(None),
                Some(v) if !v.is_finite() || v.fract() != 0.0 => {
                    Err(date_error(column, row, &v.to_string()))
                }
                Some(v) => {
                    let digits = format!("{v:.0}");
                    self.parse(&digits)
                        .map(|dt| Some(dt.and_utc().timestamp_millis()))
                        .ok_or_else(|| date_error(column, row, &digits))
                }
            })
            .collect()
    }
}

fn parse_with(value: &str, format: &str) -> Option<NaiveDateTime> {
    if format == RFC3339 {
        return DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

fn date_error(column: &str, row: usize, value: &str) -> AnalysisError {
    AnalysisError::DateParse {
        column: column.to_string(),
        row,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
    use std::sync::Arc;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_default_formats() {
        let parser = DateParser::default();
        let cases = [
            ("2022-01-15", ymd(2022, 1, 15)),
            ("2022/01/15", ymd(2022, 1, 15)),
            ("01/15/2022", ymd(2022, 1, 15)),
            ("15.01.2022", ymd(2022, 1, 15)),
            ("20220115", ymd(2022, 1, 15)),
            ("2022-01-15 13:45", ymd(2022, 1, 15) + chrono::Duration::minutes(825)),
            ("2022-01-15T13:45:00", ymd(2022, 1, 15) + chrono::Duration::minutes(825)),
            ("2022-01-15 13:45:00.250", ymd(2022, 1, 15) + chrono::Duration::milliseconds(49_500_250)),
        ];
        for (input, expected) in cases {
            assert_eq!(parser.parse(input), Some(expected), "{input}");
        }
    }

    #[test]
    fn test_rfc3339_converts_to_utc() {
        let parser = DateParser::default();
        let parsed = parser.parse("2022-01-15T02:00:00+02:00").unwrap();
        assert_eq!(parsed, ymd(2022, 1, 15));
    }

    #[test]
    fn test_custom_format_list() {
        let parser = DateParser::new(["%d-%b-%Y"]);
        assert_eq!(parser.parse("05-Mar-2023"), Some(ymd(2023, 3, 5)));
        assert!(parser.parse("2023-03-05").is_none());
    }

    #[test]
    fn test_string_column_with_nulls() {
        let array: ArrayRef = Arc::new(StringArray::from(vec![
            Some("2022-01-01"),
            None,
            Some("  "),
            Some("2022-02-01"),
        ]));
        let parsed = DateParser::default().parse_column("date", &array).unwrap();
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed.value(0), 1_640_995_200_000);
        assert!(parsed.is_null(1));
        assert!(parsed.is_null(2));
        assert!(!parsed.is_null(3));
    }

    #[test]
    fn test_unparseable_value_reports_row() {
        let array: ArrayRef = Arc::new(StringArray::from(vec!["2022-01-01", "not a date"]));
        let err = DateParser::default().parse_column("date", &array).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::DateParse { ref column, row: 1, ref value }
                if column == "date" && value == "not a date"
        ));
    }

    #[test]
    fn test_native_dates_are_cast() {
        // 18993 days after the epoch is 2022-01-01
        let array: ArrayRef = Arc::new(Date32Array::from(vec![Some(18_993), None]));
        let parsed = DateParser::default().parse_column("date", &array).unwrap();
        assert_eq!(parsed.value(0), 1_640_995_200_000);
        assert!(parsed.is_null(1));
    }

    #[test]
    fn test_integer_dates_use_digit_formats() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![20220101, 20221231]));
        let parsed = DateParser::default().parse_column("date", &array).unwrap();
        assert_eq!(parsed.value(0), 1_640_995_200_000);
    }

    #[test]
    fn test_fractional_dates_are_rejected() {
        let array: ArrayRef = Arc::new(Float64Array::from(vec![20220101.0, 2.5]));
        let err = DateParser::default().parse_column("date", &array).unwrap_err();
        assert!(matches!(err, AnalysisError::DateParse { row: 1, .. }));
    }
}
