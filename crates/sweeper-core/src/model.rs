use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

pub const CSV_MIME: &str = "text/csv";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// A file handed to the pipeline, fully buffered in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    name: String,
    bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lower-cased extension including the leading dot, or `""` when the name has none.
    /// Dot-files such as `.csv` have no extension.
    pub fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }

    /// The file name with its original extension (whatever its case) replaced by `new_extension`.
    pub fn renamed_with(&self, new_extension: &str) -> String {
        let stem = match Path::new(&self.name).extension() {
            Some(ext) => &self.name[..self.name.len() - ext.len() - 1],
            None => self.name.as_str(),
        };
        format!("{stem}{new_extension}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            ".csv" => Some(SourceFormat::Csv),
            ".xlsx" => Some(SourceFormat::Xlsx),
            _ => None,
        }
    }
}

/// Text encodings offered for CSV input, in the order they are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    Cp1252,
    Utf8,
    Latin1,
    Iso8859_1,
}

impl TextEncoding {
    pub const ALL: [TextEncoding; 4] = [
        TextEncoding::Cp1252,
        TextEncoding::Utf8,
        TextEncoding::Latin1,
        TextEncoding::Iso8859_1,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextEncoding::Cp1252 => "cp1252",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Latin1 => "latin1",
            TextEncoding::Iso8859_1 => "ISO-8859-1",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        TextEncoding::ALL
            .into_iter()
            .find(|encoding| encoding.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                let options: Vec<&str> = TextEncoding::ALL.iter().map(|e| e.label()).collect();
                format!(
                    "unknown encoding '{trimmed}' (expected one of: {})",
                    options.join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    #[default]
    Csv,
    Excel,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => ".csv",
            ExportFormat::Excel => ".xlsx",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_MIME,
            ExportFormat::Excel => XLSX_MIME,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Excel => "Excel",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            other => Err(format!("unknown export format '{other}' (expected csv or excel)")),
        }
    }
}

/// How the working table should be re-serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionRequest {
    pub target: ExportFormat,
    /// Encoding the source was read with; `None` for non-CSV sources.
    pub source_encoding: Option<TextEncoding>,
}

impl ConversionRequest {
    pub fn csv_encoding(&self) -> TextEncoding {
        self.source_encoding.unwrap_or(TextEncoding::Utf8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub file_name: String,
    pub size_bytes: u64,
    pub columns: usize,
    pub rows: usize,
}

impl TableSummary {
    pub fn new(file: &UploadedFile, table: &DataFrame) -> Self {
        Self {
            file_name: file.name().to_string(),
            size_bytes: file.size(),
            columns: table.width(),
            rows: table.height(),
        }
    }

    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }

    pub fn size_kb_display(&self) -> String {
        format!("{:.2} KB", self.size_kb())
    }
}
