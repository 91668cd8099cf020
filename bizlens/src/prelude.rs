//! Prelude for commonly used types and traits in bizlens.

pub use crate::analysis::{
    AnalyzerConfig, CorrelationMatrix, DateRange, Granularity, PeriodAggregate, SegmentAggregate,
    SegmentKey, SummaryStats, TableAnalyzer, TableAnalyzerBuilder,
};
pub use crate::error::{AnalysisError, ErrorContext, Result};
pub use crate::formatters::{FormatterConfig, Report, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::sources::{SourceFormat, TableSource};
