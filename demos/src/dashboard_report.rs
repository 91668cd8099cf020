//! Console version of a sales dashboard built on bizlens.
//!
//! Loads a CSV or spreadsheet (or generates sample sales data when no file is
//! given) and prints the headline figures followed by the four views:
//! summary statistics, a period rollup, the top segments and the correlation
//! matrix.
//!
//! Run with:
//! ```bash
//! cargo run -p bizlens-demos --example dashboard_report
//! cargo run -p bizlens-demos --example dashboard_report -- sales.xlsx \
//!     --value sales_amount --segment region --granularity weekly \
//!     --from 2022-03-01 --to 2022-06-30 --format markdown
//! ```

use bizlens::formatters::{HumanFormatter, JsonFormatter, MarkdownFormatter};
use bizlens::logging::setup::{init_logging, LoggingConfig};
use bizlens::prelude::*;
use bizlens::test_fixtures::sample_sales_analyzer;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::error::Error;
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// CSV or spreadsheet to analyze; sample data is generated when omitted
    path: Option<PathBuf>,

    /// Worksheet to read from a spreadsheet (defaults to the first one)
    #[arg(long)]
    sheet: Option<String>,

    /// Numeric column to analyze (defaults to the first numeric column)
    #[arg(long)]
    value: Option<String>,

    /// Column to break the value down by
    #[arg(long)]
    segment: Option<String>,

    /// Period length: daily, weekly, monthly, quarterly or yearly
    #[arg(long, default_value = "monthly")]
    granularity: Granularity,

    /// First day of the period view (defaults to the earliest date)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day of the period view (defaults to the latest date)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Number of segments to show
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Rows of sample data to generate when no file is given
    #[arg(long, default_value_t = 1000)]
    sample_rows: usize,

    /// Seed for the sample data
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Log debug events from bizlens
    #[arg(long, short)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Human,
    Markdown,
    Json,
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let logging = if args.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default().with_crate_level(Level::WARN)
    };
    init_logging(logging)?;

    let analyzer = match &args.path {
        Some(path) => {
            let mut builder = TableAnalyzer::builder();
            if let Some(sheet) = &args.sheet {
                builder = builder.sheet(sheet.clone());
            }
            builder.from_path(path)?
        }
        None => {
            println!(
                "No file given, using {} rows of generated sales data (seed {}).\n",
                args.sample_rows, args.seed
            );
            sample_sales_analyzer(args.sample_rows, args.seed)?
        }
    };

    let Some(value) = args
        .value
        .clone()
        .or_else(|| analyzer.default_value_column().map(str::to_string))
    else {
        return Err("the table has no numeric column to analyze".into());
    };
    let segment = args.segment.clone().or_else(|| {
        let candidates = analyzer.segment_candidates(&value);
        candidates
            .iter()
            .find(|c| analyzer.schema().kind_of(c) == Some(bizlens::table::ColumnKind::Text))
            .or(candidates.first())
            .map(|c| c.to_string())
    });

    let formatter = formatter(args.format);
    let config = FormatterConfig::default();

    // Headline figures
    let stats = analyzer.summary_stats();
    let headline = stats.get(&value);
    println!("Total Records: {}", config.number(analyzer.row_count() as f64));
    println!(
        "Average {value}: {}",
        config.number(headline.map_or(f64::NAN, |s| s.mean))
    );
    println!(
        "Std Dev {value}: {}",
        config.number(headline.map_or(f64::NAN, |s| s.std))
    );
    println!();

    println!("{}", formatter.format(&Report::summary(&stats))?);

    match analyzer.time_bounds("date") {
        Ok(Some((first, last))) => {
            let start = args.from.unwrap_or(first.date());
            let end = args.to.unwrap_or(last.date());
            let range = DateRange::new(start, end)?;
            println!("Period: {range}\n");
            let periods =
                analyzer.period_aggregate_in_range("date", &value, args.granularity, Some(range))?;
            println!(
                "{}",
                formatter.format(&Report::periods(&value, args.granularity, &periods))?
            );
        }
        Ok(None) => println!("The date column is empty; skipping the period view.\n"),
        Err(err) => println!("No period view: {err}\n"),
    }

    if let Some(segment) = segment {
        let segments = analyzer.segment_aggregate(&segment, &value)?;
        let top = FormatterConfig::default().with_max_rows(args.top);
        println!(
            "{}",
            formatter.format_with_config(&Report::segments(&segment, &value, &segments), &top)?
        );
    }

    let matrix = analyzer.correlation_matrix();
    println!("{}", formatter.format(&Report::correlation(&matrix))?);

    Ok(())
}

fn formatter(format: OutputFormat) -> Box<dyn ReportFormatter> {
    match format {
        OutputFormat::Human => Box::new(HumanFormatter::new()),
        OutputFormat::Markdown => Box::new(MarkdownFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::new()),
    }
}
