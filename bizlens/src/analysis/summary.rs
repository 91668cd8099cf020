//! Descriptive statistics of every numeric column.

use super::TableAnalyzer;
use crate::log_data_op;
use crate::stats::{quantile_sorted, sorted_copy, Moments};
use serde::Serialize;
use tracing::instrument;

/// Summary statistics stored column-wise: entry `i` of every vector belongs
/// to `columns[i]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub columns: Vec<String>,
    pub count: Vec<u64>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    pub min: Vec<f64>,
    pub p25: Vec<f64>,
    pub p50: Vec<f64>,
    pub p75: Vec<f64>,
    pub max: Vec<f64>,
}

/// The statistics of one column, borrowed from a [`SummaryStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnSummary<'a> {
    pub column: &'a str,
    pub count: u64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl SummaryStats {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Statistics of the named column, if it is numeric.
    pub fn get(&self, column: &str) -> Option<ColumnSummary<'_>> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.row(i))
    }

    /// Per-column views in table order.
    pub fn iter(&self) -> impl Iterator<Item = ColumnSummary<'_>> + '_ {
        (0..self.len()).map(|i| self.row(i))
    }

    fn row(&self, i: usize) -> ColumnSummary<'_> {
        ColumnSummary {
            column: &self.columns[i],
            count: self.count[i],
            mean: self.mean[i],
            std: self.std[i],
            min: self.min[i],
            p25: self.p25[i],
            p50: self.p50[i],
            p75: self.p75[i],
            max: self.max[i],
        }
    }

    fn push(&mut self, column: &str, values: &[f64]) {
        let moments = Moments::from_values(values.iter().copied());
        let sorted = sorted_copy(values);

        self.columns.push(column.to_string());
        self.count.push(moments.count());
        self.mean.push(moments.mean());
        self.std.push(moments.sample_std_dev().unwrap_or(f64::NAN));
        self.min.push(sorted.first().copied().unwrap_or(f64::NAN));
        self.p25.push(quantile_sorted(&sorted, 0.25));
        self.p50.push(quantile_sorted(&sorted, 0.5));
        self.p75.push(quantile_sorted(&sorted, 0.75));
        self.max.push(sorted.last().copied().unwrap_or(f64::NAN));
    }
}

impl TableAnalyzer {
    /// Count, mean, sample standard deviation, min, quartiles and max of
    /// every numeric column, in table order.
    ///
    /// Numeric columns never hold missing values, so every count equals the
    /// row count.
    #[instrument(skip(self), fields(table.rows = self.row_count()))]
    pub fn summary_stats(&self) -> SummaryStats {
        let mut stats = SummaryStats::default();
        for (name, values) in self.table().numeric_columns() {
            stats.push(name, values.values());
        }
        log_data_op!(
            self.log_config(),
            columns = stats.len(),
            "Computed summary statistics"
        );
        stats
    }
}
