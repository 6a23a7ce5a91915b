use std::io::Cursor;

use polars::prelude::*;
use tracing::debug;

use crate::encoding;
use crate::error::Result;
use crate::model::TextEncoding;

/// Cell contents treated as missing in addition to empty fields.
pub const NULL_MARKERS: [&str; 11] = [
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "NULL", "null", "None", "#N/A", "<NA>",
];

pub fn read_csv(bytes: &[u8], encoding: TextEncoding) -> Result<DataFrame> {
    let text = encoding::decode(bytes, encoding)?;
    debug!(encoding = %encoding, chars = text.len(), "decoded csv input");

    let null_values = NULL_MARKERS.iter().map(|marker| (*marker).into()).collect();
    let parse_options =
        CsvParseOptions::default().with_null_values(Some(NullValues::AllColumns(null_values)));

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_parse_options(parse_options)
        .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
        .finish()?;
    Ok(df)
}

/// Serializes with a header row and no index column, then encodes the text.
pub fn write_csv(table: &DataFrame, encoding: TextEncoding) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut clone = table.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut clone)?;

    match encoding {
        TextEncoding::Utf8 => Ok(buffer),
        other => {
            // The writer only produces UTF-8.
            let text = String::from_utf8_lossy(&buffer);
            encoding::encode(&text, other)
        }
    }
}
