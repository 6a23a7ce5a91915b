//! Spreadsheet input and output.
//!
//! Reading goes through calamine and always takes the first worksheet, with the
//! first row as the header. Writing produces a minimal Office Open XML package:
//! a single `Sheet1` with inline strings, no styles and no index column.

use std::collections::HashMap;
use std::io::{Cursor, Write};

use ::zip::{write::FileOptions, CompressionMethod, ZipWriter};
use calamine::{Data, DataType as _, Reader, Xlsx};
use polars::prelude::*;
use quick_xml::escape::escape;
use tracing::debug;

use crate::error::{PipelineError, Result};

pub const SHEET_NAME: &str = "Sheet1";

pub fn read_xlsx(bytes: &[u8]) -> Result<DataFrame> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(PipelineError::EmptyWorkbook)??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(DataFrame::empty());
    };
    let names = header_names(header);
    let body: Vec<&[Data]> = rows.collect();
    debug!(columns = names.len(), rows = body.len(), "read first worksheet");

    let columns = names
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let cells: Vec<&Data> = body.iter().map(|row| &row[idx]).collect();
            build_column(name, &cells)
        })
        .collect::<Result<Vec<Column>>>()?;

    Ok(DataFrame::new(columns)?)
}

/// Blank headers become `Unnamed: <i>`; repeats get `.1`, `.2`, ... suffixes.
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = match cell {
                Data::Empty => format!("Unnamed: {idx}"),
                other => cell_text(other),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base.clone()
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    DateTime,
    Text,
    Empty,
}

fn classify(cells: &[&Data]) -> ColumnKind {
    let mut kind = ColumnKind::Empty;
    for cell in cells {
        let cell_kind = match cell {
            Data::Empty => continue,
            Data::Int(_) => ColumnKind::Integer,
            Data::Float(value) if is_integral(*value) => ColumnKind::Integer,
            Data::Float(_) => ColumnKind::Float,
            Data::Bool(_) => ColumnKind::Boolean,
            Data::DateTime(_) => ColumnKind::DateTime,
            _ => return ColumnKind::Text,
        };
        kind = match (kind, cell_kind) {
            (ColumnKind::Empty, next) => next,
            (current, next) if current == next => current,
            (ColumnKind::Integer, ColumnKind::Float) | (ColumnKind::Float, ColumnKind::Integer) => {
                ColumnKind::Float
            }
            _ => return ColumnKind::Text,
        };
    }
    kind
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

fn build_column(name: &str, cells: &[&Data]) -> Result<Column> {
    let name: PlSmallStr = name.into();
    let column = match classify(cells) {
        ColumnKind::Integer => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(value) => Some(*value),
                    Data::Float(value) => Some(*value as i64),
                    _ => None,
                })
                .collect();
            Series::new(name, values).into()
        }
        ColumnKind::Float => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(value) => Some(*value as f64),
                    Data::Float(value) => Some(*value),
                    _ => None,
                })
                .collect();
            Series::new(name, values).into()
        }
        ColumnKind::Boolean => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(value) => Some(*value),
                    _ => None,
                })
                .collect();
            Series::new(name, values).into()
        }
        ColumnKind::DateTime => {
            let millis: Vec<Option<i64>> = cells
                .iter()
                .map(|cell| {
                    cell.as_datetime()
                        .map(|dt| dt.and_utc().timestamp_millis())
                })
                .collect();
            Series::new(name, millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                .into()
        }
        ColumnKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|cell| match cell {
                    Data::Empty => None,
                    other => Some(cell_text(other)),
                })
                .collect();
            let utf8: Vec<Option<&str>> = values.iter().map(|v| v.as_deref()).collect();
            Series::new(name, utf8).into()
        }
        ColumnKind::Empty => Series::new(name, vec![None::<f64>; cells.len()]).into(),
    };
    Ok(column)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::String(value) => value.clone(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(|dt| dt.to_string())
            .unwrap_or_else(|| cell.to_string()),
        other => other.to_string(),
    }
}

enum CellValue {
    Number(String),
    Bool(bool),
    Text(String),
}

pub fn write_xlsx(table: &DataFrame) -> Result<Vec<u8>> {
    let columns = table
        .get_columns()
        .iter()
        .map(column_cells)
        .collect::<Result<Vec<_>>>()?;
    for column in table.get_columns() {
        check_xml_text(column.name(), column.name())?;
    }
    let sheet = sheet_xml(table, &columns);

    package(&[
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", ROOT_RELS),
        ("xl/workbook.xml", WORKBOOK),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", &sheet),
    ])
}

fn package(parts: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (path, body) in parts {
        zip.start_file(*path, options)?;
        zip.write_all(body.as_bytes())?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// XML 1.0 has no escape for C0 controls other than tab, newline and carriage return.
fn check_xml_text(column: &str, text: &str) -> Result<()> {
    match text
        .chars()
        .find(|ch| (*ch as u32) < 0x20 && !matches!(ch, '\t' | '\n' | '\r'))
    {
        Some(character) => Err(PipelineError::IllegalXmlCharacter {
            column: column.to_string(),
            character,
        }),
        None => Ok(()),
    }
}

fn column_cells(column: &Column) -> Result<Vec<Option<CellValue>>> {
    let series = column.as_materialized_series();
    let dtype = series.dtype();
    let cells = if dtype.is_integer() {
        series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|value| value.map(|v| CellValue::Number(v.to_string())))
            .collect()
    } else if dtype.is_float() {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|value| {
                value
                    .filter(|v| v.is_finite())
                    .map(|v| CellValue::Number(v.to_string()))
            })
            .collect()
    } else if matches!(dtype, DataType::Boolean) {
        series
            .bool()?
            .into_iter()
            .map(|value| value.map(CellValue::Bool))
            .collect()
    } else {
        series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|value| {
                value
                    .map(|v| {
                        check_xml_text(column.name(), v)?;
                        Ok(CellValue::Text(v.to_string()))
                    })
                    .transpose()
            })
            .collect::<Result<_>>()?
    };
    Ok(cells)
}

fn sheet_xml(table: &DataFrame, columns: &[Vec<Option<CellValue>>]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#);

    xml.push_str(r#"<row r="1">"#);
    for (idx, column) in table.get_columns().iter().enumerate() {
        let header = CellValue::Text(column.name().to_string());
        push_cell(&mut xml, &cell_reference(idx, 1), &header);
    }
    xml.push_str("</row>");

    for row_idx in 0..table.height() {
        let row_number = row_idx + 2;
        xml.push_str(&format!(r#"<row r="{row_number}">"#));
        for (col_idx, cells) in columns.iter().enumerate() {
            if let Some(cell) = &cells[row_idx] {
                push_cell(&mut xml, &cell_reference(col_idx, row_number), cell);
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn push_cell(xml: &mut String, reference: &str, cell: &CellValue) {
    match cell {
        CellValue::Number(value) => {
            xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
        }
        CellValue::Bool(value) => {
            let flag = u8::from(*value);
            xml.push_str(&format!(r#"<c r="{reference}" t="b"><v>{flag}</v></c>"#));
        }
        CellValue::Text(value) => {
            xml.push_str(&format!(
                r#"<c r="{reference}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                escape(value.as_str())
            ));
        }
    }
}

/// Zero-based column index and one-based row number to an `A1` reference.
fn cell_reference(column: usize, row: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{row}", String::from_utf8_lossy(&letters))
}

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const CONTENT_TYPES: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    "</Types>"
);

const ROOT_RELS: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    "</Relationships>"
);

const WORKBOOK: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    r#"<sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>"#,
    "</workbook>"
);

const WORKBOOK_RELS: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    "</Relationships>"
);
