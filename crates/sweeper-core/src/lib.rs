pub mod capabilities;
pub mod charts;
pub mod cleaning;
pub mod encoding;
pub mod error;
pub mod export;
pub mod formats;
pub mod model;
pub mod pipeline;
pub mod projection;
pub mod session;

pub use capabilities::{ensure_available, Capability};
pub use charts::{Chart, ChartKind, ChartOutcome, ChartSeries};
pub use cleaning::CleaningEvent;
pub use error::{PipelineError, Result};
pub use model::{
    ConversionRequest, ExportArtifact, ExportFormat, SourceFormat, TableSummary, TextEncoding,
    UploadedFile,
};
pub use pipeline::{
    process_batch, run_pipeline, CleaningChoices, Diagnostic, FileReport, Severity, Stage,
    UserChoices,
};
pub use projection::ColumnSelection;
pub use session::{FileId, Session};
