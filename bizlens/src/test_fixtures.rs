//! Generated sales data for tests, benchmarks and demos.
//!
//! The generator produces a table shaped like a typical sales export, with
//! one row per order. Output is deterministic per seed.

use crate::analysis::TableAnalyzer;
use crate::error::{AnalysisError, Result};
use arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

pub const PRODUCTS: [&str; 4] = ["Electronics", "Clothing", "Home Goods", "Grocery"];
pub const REGIONS: [&str; 4] = ["North", "South", "East", "West"];

/// 2022-01-01 as days since the Unix epoch.
const FIRST_DAY: i32 = 18_993;
/// 2023-12-31 as days since the Unix epoch.
const LAST_DAY: i32 = 19_722;

const MEAN_AMOUNT: f64 = 100.0;
const AMOUNT_STD_DEV: f64 = 30.0;

/// Builds `rows` synthetic orders.
///
/// Columns: `date` (Date32, 2022-01-01 through 2023-12-31), `product`,
/// `region`, `sales_amount` (normal around 100 with deviation 30, rounded to
/// cents), `units_sold` (1..=9) and `customer_id` (1000..=9998).
pub fn sample_sales_batch(rows: usize, seed: u64) -> Result<RecordBatch> {
    let mut rng = StdRng::seed_from_u64(seed);
    let amount_distribution = Normal::new(MEAN_AMOUNT, AMOUNT_STD_DEV)
        .map_err(|e| AnalysisError::Internal(format!("Invalid sales amount distribution: {e}")))?;

    let mut dates = Vec::with_capacity(rows);
    let mut products = Vec::with_capacity(rows);
    let mut regions = Vec::with_capacity(rows);
    let mut amounts = Vec::with_capacity(rows);
    let mut units = Vec::with_capacity(rows);
    let mut customers = Vec::with_capacity(rows);

    for _ in 0..rows {
        dates.push(rng.random_range(FIRST_DAY..=LAST_DAY));
        products.push(PRODUCTS[rng.random_range(0..PRODUCTS.len())]);
        regions.push(REGIONS[rng.random_range(0..REGIONS.len())]);
        let amount = amount_distribution.sample(&mut rng);
        amounts.push((amount * 100.0).round() / 100.0);
        units.push(rng.random_range(1..10_i64));
        customers.push(rng.random_range(1000..9999_i64));
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("product", DataType::Utf8, false),
        Field::new("region", DataType::Utf8, false),
        Field::new("sales_amount", DataType::Float64, false),
        Field::new("units_sold", DataType::Int64, false),
        Field::new("customer_id", DataType::Int64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(dates)),
        Arc::new(StringArray::from(products)),
        Arc::new(StringArray::from(regions)),
        Arc::new(Float64Array::from(amounts)),
        Arc::new(Int64Array::from(units)),
        Arc::new(Int64Array::from(customers)),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// An analyzer over [`sample_sales_batch`].
pub fn sample_sales_analyzer(rows: usize, seed: u64) -> Result<TableAnalyzer> {
    TableAnalyzer::from_record_batch(&sample_sales_batch(rows, seed)?)
}

/// Writes [`sample_sales_batch`] as a CSV file with a header row.
pub fn write_sample_csv(path: impl AsRef<Path>, rows: usize, seed: u64) -> Result<()> {
    let batch = sample_sales_batch(rows, seed)?;
    let file = File::create(path.as_ref())?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(&batch)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::AsArray;
    use arrow::datatypes::Date32Type;
    use chrono::NaiveDate;

    #[test]
    fn test_day_bounds() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let first = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        assert_eq!((first - epoch).num_days(), FIRST_DAY as i64);
        assert_eq!((last - epoch).num_days(), LAST_DAY as i64);
    }

    #[test]
    fn test_sample_batch_shape() {
        let batch = sample_sales_batch(500, 42).unwrap();
        assert_eq!(batch.num_rows(), 500);
        assert_eq!(batch.num_columns(), 6);

        let dates = batch.column(0).as_primitive::<Date32Type>();
        assert!(dates.values().iter().all(|d| (FIRST_DAY..=LAST_DAY).contains(d)));

        let amounts = batch.column(3).as_primitive::<arrow::datatypes::Float64Type>();
        for amount in amounts.values() {
            assert_eq!((amount * 100.0).round() / 100.0, *amount);
        }
        let units = batch.column(4).as_primitive::<arrow::datatypes::Int64Type>();
        assert!(units.values().iter().all(|u| (1..=9).contains(u)));
        let customers = batch.column(5).as_primitive::<arrow::datatypes::Int64Type>();
        assert!(customers.values().iter().all(|c| (1000..=9998).contains(c)));
    }

    #[test]
    fn test_sample_batch_is_deterministic() {
        let a = sample_sales_batch(50, 7).unwrap();
        let b = sample_sales_batch(50, 7).unwrap();
        let c = sample_sales_batch(50, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_amounts_center_on_mean() {
        let analyzer = sample_sales_analyzer(5_000, 1).unwrap();
        let stats = analyzer.summary_stats();
        let sales = stats.get("sales_amount").unwrap();
        assert!((sales.mean - MEAN_AMOUNT).abs() < 3.0);
        assert!((sales.std - AMOUNT_STD_DEV).abs() < 3.0);
    }

    #[test]
    fn test_write_sample_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales.csv");
        write_sample_csv(&path, 20, 3).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let header = contents.lines().next().unwrap();
        assert_eq!(
            header,
            "date,product,region,sales_amount,units_sold,customer_id"
        );

        let analyzer = TableAnalyzer::from_path(&path).unwrap();
        assert_eq!(analyzer.row_count(), 20);
        assert_eq!(
            analyzer.numeric_columns(),
            vec!["sales_amount", "units_sold", "customer_id"]
        );
    }
}
