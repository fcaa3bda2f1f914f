//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// A small parking citation batch with known category counts
///
/// - `Color`: red×6, blue×3, green×1 (threshold 0.9 keeps red and blue)
/// - `Fine`: numeric strings
/// - `IssueDate`: ISO date strings
/// - `Route`: one null, otherwise two routes
/// - `Ticket`: not in the type dictionary
pub fn create_citation_dataframe() -> DataFrame {
    df! {
        "Ticket" => ["t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", "t8", "t9"],
        "IssueDate" => ["2015-12-21", "2015-12-21", "2015-12-22", "2015-12-22", "2015-12-23",
                        "2015-12-23", "2015-12-24", "2015-12-24", "2015-12-25", "2015-12-25"],
        "Fine" => ["68", "25", "68", "93", "68", "25", "50", "68", "363", "68"],
        "Color" => ["red", "red", "blue", "red", "blue", "red", "red", "blue", "red", "green"],
        "Route" => [Some("00600"), Some("00600"), Some("00600"), Some("00600"), Some("00600"),
                    Some("00600"), Some("2A1"), Some("2A1"), Some("2A1"), None],
    }
    .unwrap()
}

/// A single-column string batch built from `(value, count)` pairs, in order
pub fn counts_dataframe(column: &str, counts: &[(&str, usize)]) -> DataFrame {
    let values: Vec<&str> = counts
        .iter()
        .flat_map(|(value, n)| std::iter::repeat(*value).take(*n))
        .collect();
    DataFrame::new(vec![Column::new(column.into(), values)]).unwrap()
}

/// Read a column back as optional strings, whatever its dtype
pub fn column_strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::String)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect()
}

/// Read a Float64 column back as optional floats
pub fn column_f64(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame has exactly these columns, in order
pub fn assert_column_order(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    assert_eq!(actual_cols, expected_cols, "Column order mismatch");
}
