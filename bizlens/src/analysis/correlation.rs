//! Pairwise Pearson correlation between numeric columns.

use super::TableAnalyzer;
use crate::log_data_op;
use crate::stats::{is_zero_variance, pearson};
use serde::Serialize;
use tracing::instrument;

/// Square, symmetric matrix of Pearson coefficients over the numeric columns.
///
/// Undefined coefficients are `NaN`: a column with fewer than two rows or a
/// single repeated value has `NaN` across its whole row and column, its
/// diagonal entry included.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Column names labelling both axes.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Coefficient at row `i`, column `j`.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i).and_then(|row| row.get(j)).copied()
    }

    /// Coefficient between two named columns.
    pub fn get_by_name(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.get(i, j)
    }

    pub fn row(&self, i: usize) -> Option<&[f64]> {
        self.values.get(i).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl TableAnalyzer {
    /// Pearson correlation between every pair of numeric columns.
    ///
    /// Each unordered pair is computed once and mirrored, so the matrix is
    /// exactly symmetric.
    #[instrument(skip(self), fields(table.rows = self.row_count()))]
    pub fn correlation_matrix(&self) -> CorrelationMatrix {
        let numeric = self.table().numeric_columns();
        let n = numeric.len();
        let usable: Vec<bool> = numeric
            .iter()
            .map(|(_, values)| !is_zero_variance(values.values()))
            .collect();

        let mut values = vec![vec![f64::NAN; n]; n];
        for i in 0..n {
            if !usable[i] {
                continue;
            }
            values[i][i] = 1.0;
            for j in (i + 1)..n {
                if usable[j] {
                    let r = pearson(numeric[i].1.values(), numeric[j].1.values());
                    values[i][j] = r;
                    values[j][i] = r;
                }
            }
        }

        log_data_op!(
            self.log_config(),
            columns = n,
            zero_variance = usable.iter().filter(|u| !**u).count(),
            "Computed correlation matrix"
        );

        CorrelationMatrix {
            columns: numeric.iter().map(|(name, _)| name.to_string()).collect(),
            values,
        }
    }
}
