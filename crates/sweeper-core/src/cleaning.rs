use std::fmt;

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;

/// Integers and floats count as numeric; booleans do not.
pub fn is_numeric(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

pub fn numeric_column_names(table: &DataFrame) -> Vec<String> {
    table
        .get_columns()
        .iter()
        .filter(|column| is_numeric(column.dtype()))
        .map(|column| column.name().to_string())
        .collect()
}

/// Drops rows equal to an earlier row across every column, keeping the first.
/// Returns the cleaned table and how many rows were removed.
pub fn remove_duplicates(table: &DataFrame) -> Result<(DataFrame, usize)> {
    if table.width() == 0 || table.height() < 2 {
        return Ok((table.clone(), 0));
    }

    let before = table.height();
    let deduped = table
        .clone()
        .lazy()
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    let removed = before - deduped.height();
    debug!(before, removed, "removed duplicate rows");
    Ok((deduped, removed))
}

#[derive(Debug, Clone)]
pub struct FillOutcome {
    pub table: DataFrame,
    /// Numeric columns whose missing entries were replaced.
    pub filled: Vec<String>,
    /// Numeric columns with no values at all; their mean is undefined so they stay missing.
    pub skipped_all_missing: Vec<String>,
}

/// Replaces missing entries of every numeric column with the mean of its present values.
/// Filled columns become Float64; text and other columns are left alone.
pub fn fill_missing_with_mean(table: &DataFrame) -> Result<FillOutcome> {
    let mut filled = Vec::new();
    let mut skipped_all_missing = Vec::new();
    let mut exprs = Vec::new();

    for column in table.get_columns() {
        if !is_numeric(column.dtype()) || column.null_count() == 0 {
            continue;
        }
        let name = column.name().to_string();
        match column.as_materialized_series().mean() {
            Some(mean) => {
                exprs.push(
                    col(name.as_str())
                        .cast(DataType::Float64)
                        .fill_null(lit(mean))
                        .alias(name.as_str()),
                );
                filled.push(name);
            }
            None => {
                warn!(column = %name, "numeric column has no values; leaving it missing");
                skipped_all_missing.push(name);
            }
        }
    }

    let table = if exprs.is_empty() {
        table.clone()
    } else {
        table.clone().lazy().with_columns(exprs).collect()?
    };

    Ok(FillOutcome {
        table,
        filled,
        skipped_all_missing,
    })
}

/// A cleaning action that ran against the working table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CleaningEvent {
    DuplicatesRemoved { removed: usize },
    MissingFilled { columns: Vec<String> },
}

impl fmt::Display for CleaningEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleaningEvent::DuplicatesRemoved { removed } => write!(f, "Removed {removed} duplicates"),
            CleaningEvent::MissingFilled { .. } => f.write_str("Filled numeric missing values"),
        }
    }
}
