use polars::prelude::*;
use sweeper_core::cleaning::{fill_missing_with_mean, remove_duplicates};
use sweeper_core::formats::csv::read_csv;
use sweeper_core::TextEncoding;

fn people() -> DataFrame {
    let bytes = include_bytes!("data/people.csv");
    read_csv(bytes, TextEncoding::Utf8).expect("people.csv parses")
}

#[test]
fn dedupe_is_idempotent() {
    let (once, removed) = remove_duplicates(&people()).unwrap();
    assert_eq!(removed, 2);
    let (twice, removed_again) = remove_duplicates(&once).unwrap();
    assert_eq!(removed_again, 0);
    assert!(twice.equals_missing(&once));
}

#[test]
fn fill_only_touches_numeric_columns() {
    let outcome = fill_missing_with_mean(&people()).unwrap();
    assert_eq!(outcome.filled, vec!["age".to_string()]);
    assert!(outcome.skipped_all_missing.is_empty());

    let age = outcome.table.column("age").unwrap().f64().unwrap();
    assert_eq!(age.null_count(), 0);
    let mean = (30.0 + 30.0 + 40.0) / 3.0;
    let filled = age.get(1).unwrap();
    assert!((filled - mean).abs() < 1e-9, "{filled}");

    let city = outcome.table.column("city").unwrap();
    assert_eq!(city.null_count(), 1);
}

#[test]
fn all_missing_numeric_column_stays_missing() {
    let df = df![
        "known" => [Some(1.0f64), None],
        "blank" => [None::<f64>, None],
    ]
    .unwrap();
    let outcome = fill_missing_with_mean(&df).unwrap();
    assert_eq!(outcome.filled, vec!["known".to_string()]);
    assert_eq!(outcome.skipped_all_missing, vec!["blank".to_string()]);
    assert_eq!(outcome.table.column("blank").unwrap().null_count(), 2);
    assert_eq!(outcome.table.column("known").unwrap().f64().unwrap().get(1), Some(1.0));
}
