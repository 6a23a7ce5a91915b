use polars::prelude::*;
use serde::Serialize;

use crate::cleaning::is_numeric;
use crate::error::Result;

pub const INSUFFICIENT_NUMERIC_WARNING: &str = "Need ≥2 numeric columns for visualization";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

/// One plotted column; the x axis is the row position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub kind: ChartKind,
    pub series: Vec<ChartSeries>,
}

impl Chart {
    pub fn points(&self) -> usize {
        self.series.first().map_or(0, |series| series.values.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Rendered(Vec<Chart>),
    Insufficient { numeric_columns: usize },
}

/// A line chart and a bar chart over the first two numeric columns, by column order.
pub fn build_charts(table: &DataFrame) -> Result<ChartOutcome> {
    let numeric: Vec<&Column> = table
        .get_columns()
        .iter()
        .filter(|column| is_numeric(column.dtype()))
        .collect();
    if numeric.len() < 2 {
        return Ok(ChartOutcome::Insufficient {
            numeric_columns: numeric.len(),
        });
    }

    let series = numeric[..2]
        .iter()
        .map(|column| chart_series(column))
        .collect::<Result<Vec<_>>>()?;

    Ok(ChartOutcome::Rendered(vec![
        Chart {
            kind: ChartKind::Line,
            series: series.clone(),
        },
        Chart {
            kind: ChartKind::Bar,
            series,
        },
    ]))
}

fn chart_series(column: &Column) -> Result<ChartSeries> {
    let values = column
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .collect();
    Ok(ChartSeries {
        name: column.name().to_string(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_first_two_numeric_columns() {
        let df = df![
            "label" => ["a", "b", "c"],
            "x" => [1, 2, 3],
            "flag" => [true, false, true],
            "y" => [Some(0.5), None, Some(1.5)],
            "z" => [9, 9, 9],
        ]
        .unwrap();

        let ChartOutcome::Rendered(charts) = build_charts(&df).unwrap() else {
            panic!("expected charts");
        };
        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].kind, ChartKind::Line);
        assert_eq!(charts[1].kind, ChartKind::Bar);
        for chart in &charts {
            let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["x", "y"]);
            assert_eq!(chart.points(), 3);
        }
        assert_eq!(charts[0].series[1].values, vec![Some(0.5), None, Some(1.5)]);
    }

    #[test]
    fn single_numeric_column_is_insufficient() {
        let df = df!["label" => ["a"], "x" => [1]].unwrap();
        assert_eq!(
            build_charts(&df).unwrap(),
            ChartOutcome::Insufficient { numeric_columns: 1 }
        );
        assert_eq!(
            build_charts(&DataFrame::empty()).unwrap(),
            ChartOutcome::Insufficient { numeric_columns: 0 }
        );
    }
}
