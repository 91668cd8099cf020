//! Time-bucketed aggregation of one numeric column.

use super::TableAnalyzer;
use crate::log_data_op;
use crate::prelude::*;
use crate::stats::Moments;
use crate::table::{millis_to_datetime, ColumnKind};
use arrow::array::Array;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// Calendar bucket size for [`TableAnalyzer::period_aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    /// Weeks start on Monday
    Week,
    Month,
    /// Quarters start in January, April, July and October
    Quarter,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 5] = [
        Self::Day,
        Self::Week,
        Self::Month,
        Self::Quarter,
        Self::Year,
    ];

    /// Dashboard label, e.g. "Monthly".
    pub fn label(&self) -> &'static str {
        match self {
            Self::Day => "Daily",
            Self::Week => "Weekly",
            Self::Month => "Monthly",
            Self::Quarter => "Quarterly",
            Self::Year => "Yearly",
        }
    }

    /// First day of the bucket containing `date`.
    pub fn bucket_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date,
            Self::Week => date - Days::new(u64::from(date.weekday().num_days_from_monday())),
            Self::Month => date.with_day(1).unwrap_or(date),
            Self::Quarter => {
                let month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
            }
            Self::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }

    /// Start of the bucket after the one starting at `start`; `None` past the
    /// end of the calendar.
    pub fn next_start(&self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Day => start.checked_add_days(Days::new(1)),
            Self::Week => start.checked_add_days(Days::new(7)),
            Self::Month => start.checked_add_months(Months::new(1)),
            Self::Quarter => start.checked_add_months(Months::new(3)),
            Self::Year => start.checked_add_months(Months::new(12)),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Granularity {
    type Err = AnalysisError;

    /// Accepts `D/W/M/Q/Y` and the names `day`/`daily` through `year`/`yearly`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d" | "day" | "daily" => Ok(Self::Day),
            "w" | "week" | "weekly" => Ok(Self::Week),
            "m" | "month" | "monthly" => Ok(Self::Month),
            "q" | "quarter" | "quarterly" => Ok(Self::Quarter),
            "y" | "year" | "yearly" => Ok(Self::Year),
            _ => Err(AnalysisError::InvalidConfiguration(format!(
                "Unknown granularity '{s}': expected one of D, W, M, Q, Y"
            ))),
        }
    }
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Fails with `InvalidConfiguration` when `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AnalysisError::InvalidConfiguration(format!(
                "Date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// One time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodAggregate {
    /// First day of the bucket
    pub period_start: NaiveDate,
    pub sum: f64,
    /// `NaN` for empty buckets
    pub mean: f64,
    pub count: u64,
}

impl TableAnalyzer {
    /// Sums `value_column` per calendar bucket of `time_column`.
    ///
    /// Buckets run from the earliest to the latest timestamp without gaps;
    /// buckets with no rows are reported with a zero sum. Rows whose time is
    /// missing are skipped.
    pub fn period_aggregate(
        &self,
        time_column: &str,
        value_column: &str,
        granularity: Granularity,
    ) -> Result<Vec<PeriodAggregate>> {
        self.period_aggregate_in_range(time_column, value_column, granularity, None)
    }

    /// Like [`period_aggregate`](Self::period_aggregate), restricted to rows
    /// whose date falls inside `range`.
    ///
    /// When the range excludes every row, the buckets span the range itself.
    #[instrument(skip(self), fields(
        time_column = %time_column,
        value_column = %value_column,
        granularity = %granularity
    ))]
    pub fn period_aggregate_in_range(
        &self,
        time_column: &str,
        value_column: &str,
        granularity: Granularity,
        range: Option<DateRange>,
    ) -> Result<Vec<PeriodAggregate>> {
        let schema = self.schema();
        // A missing column is reported before a kind mismatch on either one
        schema.require(time_column)?;
        schema.require(value_column)?;
        schema.require_kind(time_column, ColumnKind::Temporal)?;
        schema.require_kind(value_column, ColumnKind::Numeric)?;

        let times = self.table().temporal_column(time_column)?;
        let values = self.table().numeric_column(value_column)?;

        let observations: Vec<(NaiveDate, f64)> = (0..times.len())
            .filter(|&row| !times.is_null(row))
            .filter_map(|row| {
                millis_to_datetime(times.value(row)).map(|ts| (ts.date(), values.value(row)))
            })
            .filter(|(date, _)| range.is_none_or(|r| r.contains(*date)))
            .collect();

        let span = match (
            observations.iter().map(|(d, _)| *d).min(),
            observations.iter().map(|(d, _)| *d).max(),
        ) {
            (Some(first), Some(last)) => Some((first, last)),
            _ => range.map(|r| (r.start(), r.end())),
        };
        let Some((first, last)) = span else {
            return Ok(Vec::new());
        };

        let mut buckets: BTreeMap<NaiveDate, Moments> = BTreeMap::new();
        let last_bucket = granularity.bucket_start(last);
        let mut start = granularity.bucket_start(first);
        loop {
            buckets.insert(start, Moments::new());
            match granularity.next_start(start) {
                Some(next) if start < last_bucket => start = next,
                _ => break,
            }
        }

        for (date, value) in observations {
            buckets
                .entry(granularity.bucket_start(date))
                .or_default()
                .push(value);
        }

        let result: Vec<PeriodAggregate> = buckets
            .into_iter()
            .map(|(period_start, moments)| PeriodAggregate {
                period_start,
                sum: moments.sum(),
                mean: moments.mean(),
                count: moments.count(),
            })
            .collect();

        log_data_op!(
            self.log_config(),
            buckets = result.len(),
            filtered = range.is_some(),
            "Computed period aggregate"
        );
        Ok(result)
    }
}
