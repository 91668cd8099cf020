//! Rendering of analysis results for terminals, documents and other programs.
//!
//! Each query result is wrapped in a [`Report`] and handed to a
//! [`ReportFormatter`]: [`HumanFormatter`] draws aligned text tables,
//! [`MarkdownFormatter`] emits pipe tables and [`JsonFormatter`] serializes
//! the result itself.
//!
//! # Examples
//!
//! ```rust
//! use bizlens::formatters::{HumanFormatter, Report, ReportFormatter};
//! use bizlens::prelude::*;
//!
//! # fn example() -> bizlens::error::Result<()> {
//! let analyzer = TableAnalyzer::from_bytes(
//!     b"region,sales\nNorth,1200.5\nSouth,800\n".to_vec(),
//!     SourceFormat::Csv,
//! )?;
//! let segments = analyzer.segment_aggregate("region", "sales")?;
//! let text = HumanFormatter::new().format(&Report::segments("region", "sales", &segments))?;
//! assert!(text.contains("1,200.50"));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::analysis::{
    CorrelationMatrix, Granularity, PeriodAggregate, SegmentAggregate, SummaryStats,
};
use crate::prelude::*;
use serde::Serialize;
use std::fmt::Write;

/// Configuration options for rendering reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterConfig {
    /// Digits after the decimal point
    pub decimals: usize,
    /// Maximum number of period or segment rows to render (`None` for all)
    pub max_rows: Option<usize>,
    /// Whether to group integer digits with commas
    pub thousands_separator: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            decimals: 2,
            max_rows: None,
            thousands_separator: true,
        }
    }
}

impl FormatterConfig {
    /// The dashboard layout: two decimals, top ten rows.
    pub fn dashboard() -> Self {
        Self {
            max_rows: Some(10),
            ..Self::default()
        }
    }

    /// Plain numbers for machine-friendly text.
    pub fn plain() -> Self {
        Self {
            decimals: 4,
            max_rows: None,
            thousands_separator: false,
        }
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn with_thousands_separator(mut self, enabled: bool) -> Self {
        self.thousands_separator = enabled;
        self
    }

    /// Renders a number according to this configuration.
    ///
    /// ```rust
    /// use bizlens::formatters::FormatterConfig;
    ///
    /// let config = FormatterConfig::default();
    /// assert_eq!(config.number(1234567.891), "1,234,567.89");
    /// assert_eq!(config.number(-1234.5), "-1,234.50");
    /// assert_eq!(config.number(f64::NAN), "n/a");
    /// ```
    pub fn number(&self, value: f64) -> String {
        format_number(value, self.decimals, self.thousands_separator)
    }
}

/// A query result ready to be rendered.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Report<'a> {
    Summary {
        stats: &'a SummaryStats,
    },
    Periods {
        value_column: &'a str,
        granularity: Granularity,
        periods: &'a [PeriodAggregate],
    },
    Segments {
        segment_column: &'a str,
        value_column: &'a str,
        segments: &'a [SegmentAggregate],
    },
    Correlation {
        matrix: &'a CorrelationMatrix,
    },
}

impl<'a> Report<'a> {
    pub fn summary(stats: &'a SummaryStats) -> Self {
        Self::Summary { stats }
    }

    pub fn periods(
        value_column: &'a str,
        granularity: Granularity,
        periods: &'a [PeriodAggregate],
    ) -> Self {
        Self::Periods {
            value_column,
            granularity,
            periods,
        }
    }

    pub fn segments(
        segment_column: &'a str,
        value_column: &'a str,
        segments: &'a [SegmentAggregate],
    ) -> Self {
        Self::Segments {
            segment_column,
            value_column,
            segments,
        }
    }

    pub fn correlation(matrix: &'a CorrelationMatrix) -> Self {
        Self::Correlation { matrix }
    }

    /// Heading for the report.
    pub fn title(&self) -> String {
        match self {
            Self::Summary { .. } => "Summary Statistics".to_string(),
            Self::Periods {
                value_column,
                granularity,
                ..
            } => format!("{} by {granularity} Period", title_case(value_column)),
            Self::Segments {
                segment_column,
                value_column,
                ..
            } => format!(
                "{} by {}",
                title_case(value_column),
                title_case(segment_column)
            ),
            Self::Correlation { .. } => "Correlation Matrix".to_string(),
        }
    }

    /// Rows omitted by `max_rows`.
    fn omitted_rows(&self, config: &FormatterConfig) -> usize {
        let total = match self {
            Self::Periods { periods, .. } => periods.len(),
            Self::Segments { segments, .. } => segments.len(),
            _ => return 0,
        };
        config.max_rows.map_or(0, |max| total.saturating_sub(max))
    }

    /// The same report with period and segment rows cut to `max_rows`.
    fn limited(self, config: &FormatterConfig) -> Self {
        let Some(max) = config.max_rows else {
            return self;
        };
        match self {
            Self::Periods {
                value_column,
                granularity,
                periods,
            } => Self::Periods {
                value_column,
                granularity,
                periods: &periods[..periods.len().min(max)],
            },
            Self::Segments {
                segment_column,
                value_column,
                segments,
            } => Self::Segments {
                segment_column,
                value_column,
                segments: &segments[..segments.len().min(max)],
            },
            other => other,
        }
    }

    /// Header cells and body rows; the first column is the label column.
    fn table(&self, config: &FormatterConfig) -> (Vec<String>, Vec<Vec<String>>) {
        let count = |n: u64| format_number(n as f64, 0, config.thousands_separator);
        match self {
            Self::Summary { stats } => {
                let headers = ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"];
                let rows = stats
                    .iter()
                    .map(|s| {
                        vec![
                            s.column.to_string(),
                            count(s.count),
                            config.number(s.mean),
                            config.number(s.std),
                            config.number(s.min),
                            config.number(s.p25),
                            config.number(s.p50),
                            config.number(s.p75),
                            config.number(s.max),
                        ]
                    })
                    .collect();
                (to_strings(&headers), rows)
            }
            Self::Periods { periods, .. } => {
                let rows = periods
                    .iter()
                    .map(|p| {
                        vec![
                            p.period_start.format("%Y-%m-%d").to_string(),
                            config.number(p.sum),
                            config.number(p.mean),
                            count(p.count),
                        ]
                    })
                    .collect();
                (to_strings(&["period", "sum", "mean", "count"]), rows)
            }
            Self::Segments {
                segment_column,
                segments,
                ..
            } => {
                let rows = segments
                    .iter()
                    .map(|s| {
                        vec![
                            s.segment.to_string(),
                            config.number(s.sum),
                            config.number(s.mean),
                            count(s.count),
                            config.number(s.std),
                        ]
                    })
                    .collect();
                let mut headers = to_strings(&["", "sum", "mean", "count", "std"]);
                headers[0] = segment_column.to_string();
                (headers, rows)
            }
            Self::Correlation { matrix } => {
                let mut headers = vec![String::new()];
                headers.extend(matrix.columns().iter().cloned());
                let rows = matrix
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        let mut row = vec![name.clone()];
                        if let Some(values) = matrix.row(i) {
                            row.extend(values.iter().map(|v| config.number(*v)));
                        }
                        row
                    })
                    .collect();
                (headers, rows)
            }
        }
    }
}

/// Trait for rendering reports into different output formats.
///
/// # Examples
///
/// ```rust
/// use bizlens::formatters::{FormatterConfig, Report, ReportFormatter};
///
/// struct TitleOnly;
///
/// impl ReportFormatter for TitleOnly {
///     fn format_with_config(
///         &self,
///         report: &Report<'_>,
///         _config: &FormatterConfig,
///     ) -> bizlens::error::Result<String> {
///         Ok(report.title())
///     }
/// }
/// ```
pub trait ReportFormatter {
    /// Renders a report with an explicit configuration.
    fn format_with_config(&self, report: &Report<'_>, config: &FormatterConfig) -> Result<String>;

    /// Renders a report with the default configuration.
    fn format(&self, report: &Report<'_>) -> Result<String> {
        self.format_with_config(report, &FormatterConfig::default())
    }
}

/// Aligned plain-text tables for console output.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &Report<'_>) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &Report<'_>, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let title = report.title();
        writeln!(output, "{title}")?;
        writeln!(output, "{}", "=".repeat(title.chars().count()))?;

        let (headers, rows) = report.limited(config).table(config);
        if rows.is_empty() {
            writeln!(output, "(no rows)")?;
            return Ok(output);
        }

        let widths: Vec<usize> = (0..headers.len())
            .map(|c| {
                rows.iter()
                    .map(|row| row.get(c).map_or(0, |cell| cell.chars().count()))
                    .chain(std::iter::once(headers[c].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write_human_row(&mut output, &headers, &widths)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_human_row(&mut output, &rule, &widths)?;
        for row in &rows {
            write_human_row(&mut output, row, &widths)?;
        }

        let omitted = report.omitted_rows(config);
        if omitted > 0 {
            writeln!(output, "... {omitted} more rows")?;
        }
        Ok(output)
    }
}

fn write_human_row(output: &mut String, cells: &[String], widths: &[usize]) -> Result<()> {
    for (c, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if c == 0 {
            write!(output, "{cell:<width$}")?;
        } else {
            write!(output, "  {cell:>width$}")?;
        }
    }
    writeln!(output)?;
    Ok(())
}

/// Markdown pipe tables, for reports and documentation.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the heading level used for the report title.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &Report<'_>) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &Report<'_>, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        let h = "#".repeat(self.heading_level as usize);
        writeln!(output, "{h} {}", report.title())?;
        writeln!(output)?;

        let (headers, rows) = report.limited(config).table(config);
        if rows.is_empty() {
            writeln!(output, "_No rows._")?;
            return Ok(output);
        }

        writeln!(output, "| {} |", escape_cells(&headers).join(" | "))?;
        let alignment: Vec<&str> = (0..headers.len())
            .map(|c| if c == 0 { "---" } else { "---:" })
            .collect();
        writeln!(output, "| {} |", alignment.join(" | "))?;
        for row in &rows {
            writeln!(output, "| {} |", escape_cells(row).join(" | "))?;
        }

        let omitted = report.omitted_rows(config);
        if omitted > 0 {
            writeln!(output)?;
            writeln!(output, "_{omitted} more rows not shown._")?;
        }
        Ok(output)
    }
}

fn escape_cells(cells: &[String]) -> Vec<String> {
    cells.iter().map(|c| c.replace('|', "\\|")).collect()
}

/// The report as JSON; `NaN` values become `null`.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    /// Sets whether to use pretty-printed JSON.
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &Report<'_>) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    /// Only `max_rows` applies; numbers keep full precision.
    fn format_with_config(&self, report: &Report<'_>, config: &FormatterConfig) -> Result<String> {
        let limited = report.limited(config);
        let json = if self.pretty {
            serde_json::to_string_pretty(&limited)?
        } else {
            serde_json::to_string(&limited)?
        };
        Ok(json)
    }
}

/// Formats `value` with `decimals` digits, optionally grouping thousands.
pub fn format_number(value: f64, decimals: usize, thousands_separator: bool) -> String {
    if value.is_nan() {
        return "n/a".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let rendered = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match rendered.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (rendered.as_str(), None),
    };

    let mut output = String::with_capacity(rendered.len() + rendered.len() / 3 + 1);
    let is_zero = rendered.bytes().all(|b| b == b'0' || b == b'.');
    if value.is_sign_negative() && !is_zero {
        output.push('-');
    }
    if thousands_separator {
        for (i, digit) in integer.chars().enumerate() {
            if i > 0 && (integer.len() - i) % 3 == 0 {
                output.push(',');
            }
            output.push(digit);
        }
    } else {
        output.push_str(integer);
    }
    if let Some(fraction) = fraction {
        output.push('.');
        output.push_str(fraction);
    }
    output
}

fn title_case(column: &str) -> String {
    column
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn to_strings(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}
