use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use serde_json::json;
use sweeper_core::{
    capabilities, ensure_available, Capability, CleaningChoices, ColumnSelection, Diagnostic,
    ExportFormat, FileId, FileReport, Session, Severity, Stage, TextEncoding, UploadedFile,
    UserChoices,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert, clean and preview CSV and Excel files", long_about = None)]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the sweep over one or more files
    Process(ProcessArgs),
    /// Report which optional capabilities this build carries
    Check,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// CSV or XLSX files to process
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Encoding used to read CSV files
    #[arg(long, default_value_t = TextEncoding::Cp1252)]
    encoding: TextEncoding,

    /// Per-file encoding override by file name or path as given, e.g. `--file-encoding data.csv=utf-8`
    #[arg(long = "file-encoding", value_name = "NAME=ENC", value_parser = parse_file_encoding)]
    file_encodings: Vec<(String, TextEncoding)>,

    /// Enable the cleaning step
    #[arg(long)]
    clean: bool,

    /// Remove duplicate rows (needs --clean)
    #[arg(long)]
    dedupe: bool,

    /// Fill missing numeric values with the column mean (needs --clean)
    #[arg(long = "fill-na")]
    fill_na: bool,

    /// Keep only these columns, comma separated; pass "" to keep none
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,

    /// Chart the first two numeric columns
    #[arg(long)]
    charts: bool,

    /// Target format for --convert
    #[arg(long = "to", default_value_t = ExportFormat::Csv)]
    target: ExportFormat,

    /// Write the converted file
    #[arg(long)]
    convert: bool,

    /// Directory converted files are written to
    #[arg(long, default_value = "converted")]
    out_dir: PathBuf,

    /// Print one JSON document per file instead of tables
    #[arg(long)]
    json: bool,
}

impl ProcessArgs {
    fn choices_for(&self, path: &Path, file_name: &str) -> UserChoices {
        let encoding = self
            .file_encodings
            .iter()
            .rev()
            .find(|(name, _)| name == file_name || Path::new(name) == path)
            .map_or(self.encoding, |(_, encoding)| *encoding);

        let columns = match &self.columns {
            Some(names) => ColumnSelection::only(names.iter().filter(|name| !name.is_empty())),
            None => ColumnSelection::All,
        };

        UserChoices {
            encoding,
            cleaning: CleaningChoices {
                enabled: self.clean,
                remove_duplicates: self.dedupe,
                fill_missing: self.fill_na,
            },
            columns,
            charts: self.charts,
            target: self.target,
            convert: self.convert,
        }
    }
}

fn parse_file_encoding(raw: &str) -> Result<(String, TextEncoding), String> {
    let (name, encoding) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected NAME=ENCODING, got `{raw}`"))?;
    if name.is_empty() {
        return Err(format!("missing file name in `{raw}`"));
    }
    Ok((name.to_string(), encoding.parse()?))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Process(args) => process(&args),
        Command::Check => {
            check();
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn check() {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Capability", "Available", "Remedy"]);
    for capability in Capability::ALL {
        let available = capability.is_available();
        table.add_row(vec![
            capability.to_string(),
            if available { "yes" } else { "no" }.to_string(),
            if available { String::new() } else { capability.remedy().to_string() },
        ]);
    }
    println!("{table}");
    if capabilities::missing().is_empty() {
        println!("All capabilities present.");
    }
}

enum Slot {
    Uploaded(FileId),
    Unreadable(FileReport),
}

fn process(args: &ProcessArgs) -> Result<()> {
    ensure_available().context("required capability missing")?;

    let mut session = Session::new();
    let mut slots = Vec::with_capacity(args.files.len());
    for path in &args.files {
        match UploadedFile::from_path(path) {
            Ok(file) => {
                let choices = args.choices_for(path, file.name());
                slots.push(Slot::Uploaded(session.upload_with(file, choices)));
            }
            Err(err) => {
                warn!(path = %path.display(), "could not read file: {err}");
                slots.push(Slot::Unreadable(FileReport::critical(
                    path.display().to_string(),
                    Stage::Upload,
                    err,
                )));
            }
        }
    }

    let mut evaluated: HashMap<FileId, FileReport> = session.evaluate().into_iter().collect();
    let mut reports = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Uploaded(id) => {
                if let Some(report) = evaluated.remove(&id) {
                    reports.push(report);
                }
            }
            Slot::Unreadable(report) => reports.push(report),
        }
    }

    let mut failed = 0usize;
    let mut taken = HashSet::new();
    for mut report in reports {
        let written = write_artifact(&mut report, &args.out_dir, &mut taken);
        if report.is_critical() {
            failed += 1;
        }
        if args.json {
            println!("{}", report_json(&report, written.as_deref()));
        } else {
            render::print_report(&report);
            if let Some(path) = &written {
                println!("Saved {}", path.display());
            }
            println!();
        }
    }

    info!(files = args.files.len(), failed, "sweep finished");
    if !args.json {
        println!("All files processed!");
    }
    Ok(())
}

/// `out_dir/file_name`, or `stem (n).ext` for the first `n` not yet written this run.
fn unique_destination(out_dir: &Path, file_name: &str, taken: &HashSet<PathBuf>) -> PathBuf {
    let path = out_dir.join(file_name);
    if !taken.contains(&path) {
        return path;
    }
    let (stem, extension) = match Path::new(file_name).extension() {
        Some(ext) => (
            &file_name[..file_name.len() - ext.len() - 1],
            &file_name[file_name.len() - ext.len() - 1..],
        ),
        None => (file_name, ""),
    };
    (1..)
        .map(|n| out_dir.join(format!("{stem} ({n}){extension}")))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(path)
}

/// Saves the report's artifact, if any. A write failure is recorded on the report.
/// Artifacts never overwrite one written earlier in the same run.
fn write_artifact(
    report: &mut FileReport,
    out_dir: &Path,
    taken: &mut HashSet<PathBuf>,
) -> Option<PathBuf> {
    let artifact = report.artifact.as_ref()?;
    let path = unique_destination(out_dir, &artifact.file_name, taken);
    let renamed = path.file_name().map_or(true, |name| name != artifact.file_name.as_str());
    let result = fs::create_dir_all(out_dir).and_then(|()| fs::write(&path, &artifact.bytes));
    match result {
        Ok(()) => {
            info!(file = %report.file_name, path = %path.display(), "artifact written");
            if renamed {
                let message = format!(
                    "{} was already written in this run; saved as {}",
                    artifact.file_name,
                    path.display()
                );
                report.push(Diagnostic::new(Severity::Warning, Stage::Convert, message));
            }
            taken.insert(path.clone());
            Some(path)
        }
        Err(err) => {
            warn!(file = %report.file_name, "could not write {}: {err}", path.display());
            report.push(Diagnostic::new(
                Severity::Error,
                Stage::Convert,
                format!("Could not write {}: {err}", path.display()),
            ));
            None
        }
    }
}

fn report_json(report: &FileReport, written: Option<&Path>) -> serde_json::Value {
    let columns: Vec<String> = report.working_columns();
    json!({
        "file": report.file_name,
        "summary": report.summary.as_ref().map(|summary| json!({
            "size_kb": summary.size_kb_display(),
            "size_bytes": summary.size_bytes,
            "columns": summary.columns,
            "rows": summary.rows,
        })),
        "preview": report.preview.as_ref().map(|preview| json!({
            "columns": preview
                .get_columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect::<Vec<_>>(),
            "rows": render::frame_rows(preview),
        })),
        "cleaning": report
            .cleaning
            .iter()
            .map(|event| json!({ "event": event, "message": event.to_string() }))
            .collect::<Vec<_>>(),
        "columns": columns,
        "charts": report.charts,
        "artifact": report.artifact.as_ref().map(|artifact| json!({
            "file_name": artifact.file_name,
            "mime": artifact.mime,
            "bytes": artifact.bytes.len(),
            "path": written.map(|path| path.display().to_string()),
        })),
        "diagnostics": report.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use sweeper_core::ExportArtifact;

    use super::*;

    fn choices(args: &ProcessArgs, path: &str) -> UserChoices {
        let path = Path::new(path);
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        args.choices_for(path, name)
    }

    fn parse(args: &[&str]) -> ProcessArgs {
        let cli = Cli::try_parse_from(
            std::iter::once("sweeper").chain(std::iter::once("process")).chain(args.iter().copied()),
        )
        .unwrap();
        match cli.command {
            Command::Process(args) => args,
            Command::Check => panic!("expected process"),
        }
    }

    #[test]
    fn per_file_encoding_overrides_the_default() {
        let args = parse(&["a.csv", "b.csv", "--file-encoding", "b.csv=utf-8"]);
        assert_eq!(choices(&args, "a.csv").encoding, TextEncoding::Cp1252);
        assert_eq!(choices(&args, "b.csv").encoding, TextEncoding::Utf8);
    }

    #[test]
    fn same_named_files_can_take_different_encodings_by_path() {
        let args = parse(&[
            "a/data.csv",
            "b/data.csv",
            "--file-encoding",
            "b/data.csv=latin1",
        ]);
        assert_eq!(choices(&args, "a/data.csv").encoding, TextEncoding::Cp1252);
        assert_eq!(choices(&args, "b/data.csv").encoding, TextEncoding::Latin1);
    }

    #[test]
    fn empty_column_list_selects_nothing() {
        let args = parse(&["a.csv", "--columns", ""]);
        assert_eq!(choices(&args, "a.csv").columns, ColumnSelection::Only(Vec::new()));

        let args = parse(&["a.csv", "--columns", "b,a"]);
        assert_eq!(choices(&args, "a.csv").columns, ColumnSelection::only(["b", "a"]));
    }

    #[test]
    fn cleaning_flags_map_onto_choices() {
        let args = parse(&["a.csv", "--clean", "--fill-na", "--to", "excel", "--convert"]);
        let choices = choices(&args, "a.csv");
        assert!(choices.cleaning.enabled);
        assert!(!choices.cleaning.remove_duplicates);
        assert!(choices.cleaning.fill_missing);
        assert_eq!(choices.target, ExportFormat::Excel);
        assert!(choices.convert);
    }

    #[test]
    fn malformed_override_is_rejected() {
        assert!(parse_file_encoding("no-equals").is_err());
        assert!(parse_file_encoding("=utf-8").is_err());
        assert!(parse_file_encoding("a.csv=ebcdic").is_err());
        assert_eq!(
            parse_file_encoding("a=b.csv=latin1"),
            Ok(("a=b.csv".to_string(), TextEncoding::Latin1))
        );
    }

    #[test]
    fn colliding_artifacts_get_distinct_names() {
        let mut taken = HashSet::new();
        let out = Path::new("converted");
        assert_eq!(unique_destination(out, "data.csv", &taken), out.join("data.csv"));

        taken.insert(out.join("data.csv"));
        assert_eq!(unique_destination(out, "data.csv", &taken), out.join("data (1).csv"));
        taken.insert(out.join("data (1).csv"));
        assert_eq!(unique_destination(out, "data.csv", &taken), out.join("data (2).csv"));

        taken.insert(out.join("README"));
        assert_eq!(unique_destination(out, "README", &taken), out.join("README (1)"));
    }

    #[test]
    fn second_artifact_with_same_name_does_not_overwrite_the_first() {
        let out_dir = std::env::temp_dir().join(format!("sweeper-collide-{}", std::process::id()));
        let _ = fs::remove_dir_all(&out_dir);

        fn report_for(source: &str, bytes: &[u8]) -> FileReport {
            let mut report = FileReport::new(source);
            report.artifact = Some(ExportArtifact {
                file_name: "data.csv".to_string(),
                mime: "text/csv",
                bytes: bytes.to_vec(),
            });
            report
        }
        let mut first = report_for("data.csv", b"a\n1\n");
        let mut second = report_for("data.xlsx", b"a\n2\n");

        let mut taken = HashSet::new();
        let first_path = write_artifact(&mut first, &out_dir, &mut taken).unwrap();
        let second_path = write_artifact(&mut second, &out_dir, &mut taken).unwrap();

        assert_ne!(first_path, second_path);
        assert_eq!(fs::read(&first_path).unwrap(), b"a\n1\n");
        assert_eq!(fs::read(&second_path).unwrap(), b"a\n2\n");
        assert!(first.diagnostics.is_empty());
        assert_eq!(second.diagnostics_at(Severity::Warning).count(), 1);

        fs::remove_dir_all(&out_dir).unwrap();
    }
}
