use polars::prelude::DataFrame;
use tracing::debug;

use crate::error::Result;
use crate::formats;
use crate::model::{ConversionRequest, ExportArtifact, ExportFormat, UploadedFile};

/// Serializes the working table into a downloadable artifact named after the source file.
pub fn export(
    table: &DataFrame,
    request: &ConversionRequest,
    source: &UploadedFile,
) -> Result<ExportArtifact> {
    let bytes = match request.target {
        ExportFormat::Csv => formats::csv::write_csv(table, request.csv_encoding())?,
        ExportFormat::Excel => formats::write_spreadsheet(table)?,
    };
    let file_name = source.renamed_with(request.target.extension());
    debug!(file = %file_name, bytes = bytes.len(), "built export artifact");

    Ok(ExportArtifact {
        file_name,
        mime: request.target.mime(),
        bytes,
    })
}
