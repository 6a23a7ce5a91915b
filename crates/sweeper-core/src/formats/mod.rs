pub mod csv;
#[cfg(feature = "xlsx")]
pub mod xlsx;

use polars::prelude::DataFrame;

use crate::error::Result;
use crate::model::{SourceFormat, TextEncoding};

/// Parses an uploaded file into a table. `encoding` only applies to CSV sources.
pub fn read_table(bytes: &[u8], format: SourceFormat, encoding: TextEncoding) -> Result<DataFrame> {
    match format {
        SourceFormat::Csv => csv::read_csv(bytes, encoding),
        SourceFormat::Xlsx => read_spreadsheet(bytes),
    }
}

#[cfg(feature = "xlsx")]
fn read_spreadsheet(bytes: &[u8]) -> Result<DataFrame> {
    xlsx::read_xlsx(bytes)
}

#[cfg(not(feature = "xlsx"))]
fn read_spreadsheet(_bytes: &[u8]) -> Result<DataFrame> {
    Err(crate::capabilities::unavailable(
        crate::capabilities::Capability::Spreadsheet,
    ))
}

#[cfg(feature = "xlsx")]
pub(crate) fn write_spreadsheet(table: &DataFrame) -> Result<Vec<u8>> {
    xlsx::write_xlsx(table)
}

#[cfg(not(feature = "xlsx"))]
pub(crate) fn write_spreadsheet(_table: &DataFrame) -> Result<Vec<u8>> {
    Err(crate::capabilities::unavailable(
        crate::capabilities::Capability::Spreadsheet,
    ))
}
