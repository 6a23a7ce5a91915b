use thiserror::Error;

use crate::capabilities::Capability;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unsupported file type: {extension}")]
    UnsupportedFileType { extension: String },

    #[error("'{encoding}' codec can't decode byte at position {position}")]
    Decode {
        encoding: &'static str,
        position: usize,
    },

    #[error("'{encoding}' codec can't encode character {character:?}")]
    Encode {
        encoding: &'static str,
        character: char,
    },

    #[error("column '{column}' contains {character:?}, which cannot be stored in a workbook")]
    IllegalXmlCharacter { column: String, character: char },

    #[error("workbook does not contain any worksheets")]
    EmptyWorkbook,

    #[error("column '{0}' not found in table")]
    UnknownColumn(String),

    #[error("{capability} support is unavailable: {remedy}")]
    MissingCapability {
        capability: Capability,
        remedy: &'static str,
    },

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    #[cfg(feature = "xlsx")]
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    #[cfg(feature = "xlsx")]
    #[error("ZIP operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
