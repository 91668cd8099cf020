//! # bizlens - Tabular Business Data Analysis for Rust
//!
//! bizlens loads a sales-like table from CSV or a spreadsheet, cleans it into
//! a typed in-memory table, and answers four questions about it: descriptive
//! statistics, time-period rollups, segment rollups and pairwise correlation.
//! Tables are held as Apache Arrow arrays and can be handed to DataFusion for
//! ad-hoc SQL.
//!
//! ## Quick Start
//!
//! ```rust
//! use bizlens::prelude::*;
//!
//! # fn example() -> bizlens::error::Result<()> {
//! let csv = "Date,Product,Region,Sales Amount,Units Sold\n\
//!            2022-01-03,Electronics,North,120.50,2\n\
//!            2022-01-17,Grocery,South,35.10,5\n\
//!            2022-02-02,Electronics,North,99.99,1\n";
//! let analyzer = TableAnalyzer::from_bytes(csv.as_bytes().to_vec(), SourceFormat::Csv)?;
//!
//! // Column names are normalized: lower-case, spaces become underscores
//! assert_eq!(analyzer.numeric_columns(), vec!["sales_amount", "units_sold"]);
//!
//! let stats = analyzer.summary_stats();
//! assert_eq!(stats.get("units_sold").map(|s| s.max), Some(5.0));
//!
//! let monthly = analyzer.period_aggregate("date", "sales_amount", Granularity::Month)?;
//! assert_eq!(monthly.len(), 2);
//!
//! let by_region = analyzer.segment_aggregate("region", "sales_amount")?;
//! assert_eq!(by_region[0].segment.to_string(), "North");
//!
//! let matrix = analyzer.correlation_matrix();
//! assert_eq!(matrix.len(), 2);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Loading
//!
//! Input is selected by [`sources::TableSource`]: a path whose extension
//! picks the format (`.csv`, `.xlsx`, `.xls`), or an in-memory buffer with
//! an explicit [`sources::SourceFormat`]. Loading reads everything, then
//! normalizes:
//!
//! - column names are trimmed of a byte order mark, lower-cased and have
//!   spaces replaced by underscores; if two names collide the later column wins
//! - the `date` column (configurable) is parsed into timestamps
//! - numeric columns have their missing values replaced by `0`
//! - every other column is kept as text with missing values preserved
//!
//! Loading either fully succeeds or fails with an [`error::AnalysisError`];
//! there is no partially loaded analyzer.
//!
//! ## Queries
//!
//! | Query | Result |
//! |-------|--------|
//! | [`summary_stats`](analysis::TableAnalyzer::summary_stats) | [`analysis::SummaryStats`] |
//! | [`period_aggregate`](analysis::TableAnalyzer::period_aggregate) | `Vec<`[`analysis::PeriodAggregate`]`>` |
//! | [`segment_aggregate`](analysis::TableAnalyzer::segment_aggregate) | `Vec<`[`analysis::SegmentAggregate`]`>` |
//! | [`correlation_matrix`](analysis::TableAnalyzer::correlation_matrix) | [`analysis::CorrelationMatrix`] |
//!
//! Queries take `&self`, never mutate the table and may run concurrently from
//! several threads. Column errors are local to the failing call.
//!
//! ## Rendering
//!
//! The [`formatters`] module renders any result as an aligned text table,
//! Markdown or JSON.
//!
//! ## Logging
//!
//! bizlens emits [`tracing`] events and spans. Install a subscriber with
//! [`logging::setup::init_logging`] or your own, and tune verbosity per
//! analyzer with [`logging::LogConfig`].

pub mod analysis;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod sources;
pub mod sql;
pub mod stats;
pub mod table;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_fixtures;
