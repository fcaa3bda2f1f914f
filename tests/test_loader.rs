//! Unit tests for dataset loading and saving

use featagg::pipeline::{load_dataset, load_dataset_with_progress, save_dataset};
use polars::prelude::*;
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_load_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "Color,Fine,Route").unwrap();
    writeln!(file, "GY,68,00600").unwrap();
    writeln!(file, "BK,25,2A1").unwrap();
    drop(file);

    let (df, rows, cols) = load_dataset_with_progress(&csv_path, 100).unwrap();

    assert_eq!(rows, 2, "Should have 2 data rows");
    assert_eq!(cols, 3, "Should have 3 columns");
    common::assert_column_order(&df, &["Color", "Fine", "Route"]);
}

#[test]
fn test_load_parquet_file() {
    let mut df = common::create_citation_dataframe();
    let (_temp_dir, parquet_path) = common::create_temp_parquet(&mut df);

    let (loaded_df, rows, cols) = load_dataset_with_progress(&parquet_path, 100).unwrap();

    assert_eq!(rows, 10);
    assert_eq!(cols, 5);
    assert_eq!(
        common::column_strings(&loaded_df, "Color"),
        common::column_strings(&df, "Color")
    );
}

#[test]
fn test_load_unsupported_extension_fails() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.xlsx");
    std::fs::write(&path, "not really excel").unwrap();

    let err = load_dataset(&path, 100).unwrap_err();
    assert!(err.to_string().contains("Unsupported file format"));
}

#[test]
fn test_save_and_reload_csv() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("out.csv");

    let mut df = df! {
        "Color" => ["red", "Other"],
        "Fine" => [68.0f64, 25.0],
    }
    .unwrap();
    save_dataset(&mut df, &path).unwrap();

    let reloaded = load_dataset(&path, 100).unwrap();
    common::assert_shape(&reloaded, 2, 2);
    assert_eq!(
        common::column_strings(&reloaded, "Color"),
        vec![Some("red".to_string()), Some("Other".to_string())]
    );
}
