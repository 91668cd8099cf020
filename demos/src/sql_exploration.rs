//! Ad-hoc SQL over a cleaned table.
//!
//! This example shows how to:
//! - Write generated sales data to a CSV file and load it
//! - Register the normalized table with a DataFusion session
//! - Query it with SQL alongside the built-in rollups
//!
//! Run with:
//! ```bash
//! cargo run -p bizlens-demos --example sql_exploration
//! ```

use bizlens::prelude::*;
use bizlens::test_fixtures::write_sample_csv;
use datafusion::prelude::*;
use std::error::Error;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,bizlens=info")
        .init();

    let file_path = std::env::temp_dir().join("bizlens_sales.csv");
    write_sample_csv(&file_path, 2_000, 7)?;
    println!("Wrote sample data to {}\n", file_path.display());

    let analyzer = TableAnalyzer::from_path(&file_path)?;
    let ctx = SessionContext::new();
    analyzer.register(&ctx, "sales")?;

    println!("Revenue and volume by product and region:");
    ctx.sql(
        "SELECT product, region, \
                ROUND(SUM(sales_amount), 2) AS revenue, \
                SUM(units_sold) AS units \
         FROM sales \
         GROUP BY product, region \
         ORDER BY revenue DESC \
         LIMIT 8",
    )
    .await?
    .show()
    .await?;

    println!("Largest orders:");
    ctx.sql(
        "SELECT date, customer_id, product, sales_amount \
         FROM sales ORDER BY sales_amount DESC LIMIT 5",
    )
    .await?
    .show()
    .await?;

    // The yearly rollup computed both ways
    println!("Yearly totals from SQL:");
    ctx.sql(
        "SELECT date_trunc('year', date) AS year, ROUND(SUM(sales_amount), 2) AS revenue \
         FROM sales GROUP BY 1 ORDER BY 1",
    )
    .await?
    .show()
    .await?;

    println!("Yearly totals from period_aggregate:");
    for period in analyzer.period_aggregate("date", "sales_amount", Granularity::Year)? {
        println!(
            "  {}  revenue {:.2}  orders {}",
            period.period_start, period.sum, period.count
        );
    }

    // Invalid identifiers are rejected before they reach the SQL engine
    if let Err(err) = analyzer.register(&ctx, "sales; DROP TABLE sales") {
        println!("\nRejected table name: {err}");
    }

    std::fs::remove_file(&file_path)?;
    Ok(())
}
