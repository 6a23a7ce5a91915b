//! The per-file processing pipeline.
//!
//! `run_pipeline` is a pure function of the uploaded file and the user's current
//! choices. Front ends call it again after every interaction; nothing is cached
//! between runs. Failures are recorded on the returned [`FileReport`] and never
//! escape it, so one bad file cannot stop a batch.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::charts::{build_charts, Chart, ChartOutcome, INSUFFICIENT_NUMERIC_WARNING};
use crate::cleaning::{fill_missing_with_mean, remove_duplicates, CleaningEvent};
use crate::error::PipelineError;
use crate::export::export;
use crate::formats::read_table;
use crate::model::{
    ConversionRequest, ExportArtifact, ExportFormat, SourceFormat, TableSummary, TextEncoding,
    UploadedFile,
};
use crate::projection::{project, ColumnSelection};

pub const PREVIEW_ROWS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningChoices {
    pub enabled: bool,
    pub remove_duplicates: bool,
    pub fill_missing: bool,
}

/// Everything a user can set for one file. Defaults match a freshly uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChoices {
    /// Only consulted for CSV sources.
    pub encoding: TextEncoding,
    pub cleaning: CleaningChoices,
    pub columns: ColumnSelection,
    pub charts: bool,
    pub target: ExportFormat,
    /// Whether the user asked for a conversion on this run.
    pub convert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Upload,
    Detect,
    Parse,
    Clean,
    Project,
    Visualize,
    Convert,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Detect => "detect",
            Stage::Parse => "parse",
            Stage::Clean => "clean",
            Stage::Project => "project",
            Stage::Visualize => "visualize",
            Stage::Convert => "convert",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity,
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.message)
    }
}

/// What one pipeline run produced for one file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file_name: String,
    pub summary: Option<TableSummary>,
    pub preview: Option<DataFrame>,
    pub cleaning: Vec<CleaningEvent>,
    pub working_table: Option<DataFrame>,
    pub charts: Vec<Chart>,
    pub artifact: Option<ExportArtifact>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            summary: None,
            preview: None,
            cleaning: Vec::new(),
            working_table: None,
            charts: Vec::new(),
            artifact: None,
            diagnostics: Vec::new(),
        }
    }

    /// A report for a file whose pipeline was abandoned.
    pub fn critical(file_name: impl Into<String>, stage: Stage, cause: impl fmt::Display) -> Self {
        let mut report = Self::new(file_name);
        report.fail(stage, cause);
        report
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn fail(&mut self, stage: Stage, cause: impl fmt::Display) {
        let message = format!("Critical error processing {}: {cause}", self.file_name);
        error!(file = %self.file_name, %stage, "{message}");
        self.push(Diagnostic::new(Severity::Critical, stage, message));
    }

    pub fn is_critical(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Critical)
    }

    pub fn diagnostics_at(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |diagnostic| diagnostic.severity == severity)
    }

    pub fn working_columns(&self) -> Vec<String> {
        self.working_table
            .as_ref()
            .map(|table| {
                table
                    .get_columns()
                    .iter()
                    .map(|column| column.name().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

struct StageFailure {
    stage: Stage,
    source: PipelineError,
}

fn at(stage: Stage) -> impl FnOnce(PipelineError) -> StageFailure {
    move |source| StageFailure { stage, source }
}

pub fn run_pipeline(file: &UploadedFile, choices: &UserChoices) -> FileReport {
    let mut report = FileReport::new(file.name());
    if let Err(failure) = run_stages(file, choices, &mut report) {
        report.fail(failure.stage, failure.source);
    } else if !report.diagnostics.is_empty() {
        info!(file = file.name(), diagnostics = report.diagnostics.len(), "file processed with diagnostics");
    } else {
        info!(file = file.name(), "file processed");
    }
    report
}

fn run_stages(
    file: &UploadedFile,
    choices: &UserChoices,
    report: &mut FileReport,
) -> Result<(), StageFailure> {
    let extension = file.extension();
    let Some(format) = SourceFormat::from_extension(&extension) else {
        let err = PipelineError::UnsupportedFileType { extension };
        warn!(file = file.name(), "{err}");
        report.push(Diagnostic::new(Severity::Error, Stage::Detect, err.to_string()));
        return Ok(());
    };

    let source_encoding = match format {
        SourceFormat::Csv => Some(choices.encoding),
        SourceFormat::Xlsx => None,
    };
    let mut table =
        read_table(file.bytes(), format, choices.encoding).map_err(at(Stage::Parse))?;
    debug!(file = file.name(), rows = table.height(), columns = table.width(), "parsed");

    report.summary = Some(TableSummary::new(file, &table));
    report.preview = Some(table.head(Some(PREVIEW_ROWS)));

    if choices.cleaning.enabled {
        if choices.cleaning.remove_duplicates {
            let (deduped, removed) = remove_duplicates(&table).map_err(at(Stage::Clean))?;
            table = deduped;
            report.cleaning.push(CleaningEvent::DuplicatesRemoved { removed });
        }
        if choices.cleaning.fill_missing {
            let outcome = fill_missing_with_mean(&table).map_err(at(Stage::Clean))?;
            for name in &outcome.skipped_all_missing {
                report.push(Diagnostic::new(
                    Severity::Warning,
                    Stage::Clean,
                    format!("Column '{name}' has no values to average; left missing"),
                ));
            }
            table = outcome.table;
            report.cleaning.push(CleaningEvent::MissingFilled {
                columns: outcome.filled,
            });
        }
    }

    table = project(&table, &choices.columns).map_err(at(Stage::Project))?;

    if choices.charts {
        match build_charts(&table) {
            Ok(ChartOutcome::Rendered(charts)) => report.charts = charts,
            Ok(ChartOutcome::Insufficient { .. }) => report.push(Diagnostic::new(
                Severity::Warning,
                Stage::Visualize,
                INSUFFICIENT_NUMERIC_WARNING,
            )),
            Err(err) => {
                warn!(file = file.name(), "visualization failed: {err}");
                report.push(Diagnostic::new(
                    Severity::Error,
                    Stage::Visualize,
                    format!("Visualization error: {err}"),
                ));
            }
        }
    }

    if choices.convert {
        let request = ConversionRequest {
            target: choices.target,
            source_encoding,
        };
        match export(&table, &request, file) {
            Ok(artifact) => report.artifact = Some(artifact),
            Err(err) => {
                warn!(file = file.name(), "conversion failed: {err}");
                report.push(Diagnostic::new(
                    Severity::Error,
                    Stage::Convert,
                    format!("Conversion failed: {err}"),
                ));
            }
        }
    }

    report.working_table = Some(table);
    Ok(())
}

/// Runs every file in order. A panic inside one file's pipeline becomes a
/// critical diagnostic for that file and the batch carries on.
pub fn process_batch<'a, I>(entries: I) -> Vec<FileReport>
where
    I: IntoIterator<Item = (&'a UploadedFile, &'a UserChoices)>,
{
    entries
        .into_iter()
        .map(|(file, choices)| {
            panic::catch_unwind(AssertUnwindSafe(|| run_pipeline(file, choices))).unwrap_or_else(
                |payload| FileReport::critical(file.name(), Stage::Parse, panic_message(&*payload)),
            )
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected panic".to_string()
    }
}
