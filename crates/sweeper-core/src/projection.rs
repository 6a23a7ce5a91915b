use polars::prelude::DataFrame;

use crate::error::{PipelineError, Result};

/// Which columns of the working table to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnSelection {
    #[default]
    All,
    Only(Vec<String>),
}

impl ColumnSelection {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSelection::Only(names.into_iter().map(Into::into).collect())
    }
}

/// Restricts the table to the selected columns. The result follows the table's
/// column order, not the order of the selection.
pub fn project(table: &DataFrame, selection: &ColumnSelection) -> Result<DataFrame> {
    let ColumnSelection::Only(selected) = selection else {
        return Ok(table.clone());
    };

    let existing: Vec<String> = table
        .get_columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();
    if let Some(unknown) = selected.iter().find(|name| !existing.contains(name)) {
        return Err(PipelineError::UnknownColumn(unknown.clone()));
    }

    let ordered: Vec<String> = existing
        .into_iter()
        .filter(|name| selected.contains(name))
        .collect();
    Ok(table.select(ordered)?)
}
