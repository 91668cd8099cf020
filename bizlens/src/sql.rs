//! DataFusion registration of normalized tables.
//!
//! The built-in queries cover the dashboard views; anything else can be asked
//! in SQL once the table is registered with a `SessionContext`.

use crate::prelude::*;
use crate::table::NormalizedTable;
use datafusion::datasource::MemTable;
use datafusion::prelude::SessionContext;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, instrument};

const MAX_IDENTIFIER_LENGTH: usize = 128;

static TABLE_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("Hard-coded regex should be valid")
});

/// Checks that a table name can be used unquoted in SQL.
///
/// ```rust
/// use bizlens::sql::validate_table_name;
///
/// assert!(validate_table_name("sales_2023").is_ok());
/// assert!(validate_table_name("sales; DROP TABLE x").is_err());
/// ```
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AnalysisError::InvalidConfiguration(
            "Table name cannot be empty".to_string(),
        ));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(AnalysisError::InvalidConfiguration(format!(
            "Table name too long (max {MAX_IDENTIFIER_LENGTH} characters)"
        )));
    }
    if !TABLE_NAME_PATTERN.is_match(name) {
        return Err(AnalysisError::InvalidConfiguration(format!(
            "Invalid table name '{name}': use letters, digits and underscores, not starting with a digit"
        )));
    }
    Ok(())
}

/// Quotes a column name for use in SQL text.
///
/// Normalized names may still contain punctuation, so generated SQL should
/// always quote them.
///
/// ```rust
/// use bizlens::sql::quote_identifier;
///
/// assert_eq!(quote_identifier("sales_amount"), "\"sales_amount\"");
/// assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Registers a normalized table as an in-memory DataFusion table.
///
/// The batch is shared, not copied; DataFusion only ever reads it.
#[instrument(skip(ctx, table), fields(table.name = %table_name, table.rows = table.num_rows()))]
pub fn register_table(ctx: &SessionContext, table_name: &str, table: &NormalizedTable) -> Result<()> {
    validate_table_name(table_name)?;

    let provider = MemTable::try_new(
        table.arrow_schema(),
        vec![vec![table.record_batch().clone()]],
    )?;
    ctx.register_table(table_name, Arc::new(provider))?;

    debug!(
        table.name = %table_name,
        columns = table.num_columns(),
        "Registered table with DataFusion"
    );
    Ok(())
}
