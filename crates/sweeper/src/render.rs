//! Terminal rendering for file reports.

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use polars::prelude::{AnyValue, DataFrame};
use sweeper_core::{Chart, ChartKind, FileReport, TableSummary};

const SPARKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const BAR_WIDTH: usize = 40;

pub fn cell_text(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(text) => text.to_string(),
        AnyValue::StringOwned(text) => text.to_string(),
        other => other.to_string(),
    }
}

/// Rows of a frame as display strings, in column order.
pub fn frame_rows(frame: &DataFrame) -> Vec<Vec<String>> {
    (0..frame.height())
        .map(|row| {
            frame
                .get_columns()
                .iter()
                .map(|column| column.get(row).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect()
}

pub fn summary_table(summary: &TableSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["File", "Size", "Columns", "Rows"])
        .add_row(vec![
            summary.file_name.clone(),
            summary.size_kb_display(),
            summary.columns.to_string(),
            summary.rows.to_string(),
        ]);
    table
}

pub fn preview_table(preview: &DataFrame) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            preview
                .get_columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect::<Vec<_>>(),
        );
    for row in frame_rows(preview) {
        table.add_row(row);
    }
    table
}

/// Sparkline for each series of a line chart, one line per series.
pub fn line_chart(chart: &Chart) -> String {
    chart
        .series
        .iter()
        .map(|series| {
            let (low, high) = bounds(&series.values);
            let line: String = series
                .values
                .iter()
                .map(|value| match value {
                    Some(v) => SPARKS[scale(*v, low, high, SPARKS.len() - 1)],
                    None => ' ',
                })
                .collect();
            format!("{:>12} {line}", series.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Horizontal bars per row position, grouped by series.
pub fn bar_chart(chart: &Chart) -> String {
    let mut lines = Vec::new();
    for series in &chart.series {
        lines.push(format!("{}:", series.name));
        let (low, high) = bounds(&series.values);
        let floor = low.min(0.0);
        for (row, value) in series.values.iter().enumerate() {
            let bar = match value {
                Some(v) => "█".repeat(scale(*v, floor, high, BAR_WIDTH)),
                None => String::new(),
            };
            let label = value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
            lines.push(format!("{row:>6} {bar} {label}"));
        }
    }
    lines.join("\n")
}

pub fn chart(chart: &Chart) -> String {
    match chart.kind {
        ChartKind::Line => line_chart(chart),
        ChartKind::Bar => bar_chart(chart),
    }
}

fn bounds(values: &[Option<f64>]) -> (f64, f64) {
    values
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), &v| {
            (low.min(v), high.max(v))
        })
}

fn scale(value: f64, low: f64, high: f64, steps: usize) -> usize {
    if !value.is_finite() || high <= low {
        return steps / 2;
    }
    let ratio = ((value - low) / (high - low)).clamp(0.0, 1.0);
    (ratio * steps as f64).round() as usize
}

pub fn print_report(report: &FileReport) {
    println!("== {} ==", report.file_name);
    if let Some(summary) = &report.summary {
        println!("{}", summary_table(summary));
    }
    if let Some(preview) = &report.preview {
        println!("Preview:");
        println!("{}", preview_table(preview));
    }
    for event in &report.cleaning {
        println!("✔ {event}");
    }
    for chart_data in &report.charts {
        let title = match chart_data.kind {
            ChartKind::Line => "Line chart",
            ChartKind::Bar => "Bar chart",
        };
        println!("{title}:");
        println!("{}", chart(chart_data));
    }
    for diagnostic in &report.diagnostics {
        eprintln!("{diagnostic}");
    }
}
