use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use polars::prelude::*;
use rust_data_compare::config::{ColumnMapping, ComparisonConfig};
use rust_data_compare::export::ExportFormat;
use rust_data_compare::pipeline::PartitionKind;
use rust_data_compare::source::{SourceOptions, load_lazy};
use rust_data_compare::summary::Summary;
use rust_data_compare::types::{ColumnDefinition, ComparisonSchema, DataType};
use rust_data_compare::{ComparisonResults, compare};

fn temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("rust_data_compare_{name}_{nanos}"))
}

fn config() -> ComparisonConfig {
    let schema = ComparisonSchema::new(
        vec![
            ColumnDefinition::new("id", "ID", DataType::Int64, false),
            ColumnDefinition::new("name", "Name", DataType::String, true),
        ],
        vec!["id".to_string()],
    )
    .unwrap();
    ComparisonConfig::builder(schema.clone(), schema)
        .mapping(ColumnMapping::new("id", "id", "id"))
        .mapping(ColumnMapping::new("name", "name", "name <label>"))
        .primary_key("id")
        .build()
        .unwrap()
}

fn results() -> ComparisonResults {
    let left = df!("id" => [1i64, 2, 3, 4], "name" => ["a", "b", "c", "d"]).unwrap().lazy();
    let right = df!("id" => [1i64, 2, 5], "name" => ["a", "B", "e"]).unwrap().lazy();
    compare(&config(), left, right).unwrap()
}

#[test]
fn summary_text_has_counts_and_percentages() {
    let results = results();
    let text = results.report().summary_text();
    let rule = "=".repeat(60);

    assert!(text.starts_with(&rule));
    assert!(text.ends_with(&rule));
    assert!(text.contains("DATA COMPARISON SUMMARY"));
    assert!(text.contains("  Left dataset:  4 records"));
    assert!(text.contains("  Right dataset: 3 records"));
    assert!(text.contains("  Matching Records:      1"));
    assert!(text.contains("  Value Differences:     1"));
    assert!(text.contains("  Left-Only Records:     2"));
    assert!(text.contains("  Right-Only Records:    1"));
    assert!(text.contains("  Matching:      25.0%"));
    assert!(text.contains("  Left-Only:     50.0%"));
    assert!(text.contains("  Right-Only:    33.3% (of right dataset)"));
}

#[test]
fn summary_text_skips_percentages_for_empty_sides() {
    let empty = df!("id" => Vec::<i64>::new(), "name" => Vec::<String>::new()).unwrap().lazy();
    let results = compare(&config(), empty.clone(), empty).unwrap();
    let text = results.report().summary_text();
    assert!(!text.contains("PERCENTAGES"));
    assert!(!text.contains("(of right dataset)"));
}

#[test]
fn summary_table_lists_counts_with_percentages() {
    let results = results();
    let report = results.report();
    let frame = report.summary_frame().unwrap();
    assert_eq!(frame.shape(), (6, 3));

    let metrics: Vec<&str> = frame.column("Metric").unwrap().str().unwrap().into_no_null_iter().collect();
    assert_eq!(metrics[0], "Left dataset");
    assert_eq!(metrics[5], "Right-Only Records");
    let counts: Vec<i64> = frame.column("Count").unwrap().i64().unwrap().into_no_null_iter().collect();
    assert_eq!(counts, vec![4, 3, 1, 1, 2, 1]);
    let pct: Vec<Option<&str>> = frame.column("Percentage").unwrap().str().unwrap().into_iter().collect();
    assert_eq!(
        pct,
        vec![None, None, Some("25.0%"), Some("25.0%"), Some("50.0%"), Some("33.3%")]
    );

    let table = report.summary_table().unwrap();
    assert!(table.contains("Left dataset"));
    assert!(table.contains("Right dataset"));
    assert!(table.contains("33.3%"));
}

#[test]
fn summary_table_has_no_percentages_for_empty_sides() {
    let empty = df!("id" => Vec::<i64>::new(), "name" => Vec::<String>::new()).unwrap().lazy();
    let results = compare(&config(), empty.clone(), empty).unwrap();
    let frame = results.report().summary_frame().unwrap();
    assert_eq!(frame.column("Percentage").unwrap().null_count(), 6);
}

#[test]
fn detailed_text_samples_non_empty_partitions() {
    let results = results();
    let text = results.report().detailed_text(1).unwrap();
    assert!(text.contains("VALUE DIFFERENCES SAMPLES:"));
    assert!(text.contains("LEFT-ONLY RECORDS SAMPLES:"));
    assert!(text.contains("RIGHT-ONLY RECORDS SAMPLES:"));
    assert!(text.contains("L_name <label>"));
    assert_eq!(results.left_only.sample(1).unwrap().height(), 1);
    let kinds: Vec<PartitionKind> = results.partitions().iter().map(|p| p.kind()).collect();
    assert_eq!(kinds, PartitionKind::ALL.to_vec());
}

#[test]
fn html_report_escapes_user_text() {
    let results = results();
    let html = results.report().html();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<strong>Primary Key Columns:</strong> id"));
    assert!(html.contains("<strong>Column Mappings:</strong> 2 mappings"));
    assert!(html.contains("name &lt;label&gt;"));
    assert!(!html.contains("name <label>"));
    assert!(html.contains("<strong>Null Equals Null:</strong> true"));
    assert!(html.contains("<strong>Ignore Case:</strong> false"));

    let dir = temp_dir("html");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("report.html");
    results.report().write_html(&path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), html);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn export_writes_non_empty_partitions_and_summary() {
    let results = results();
    let dir = temp_dir("export_csv");

    let files = results.export(ExportFormat::Csv, &dir).unwrap();
    assert_eq!(files.paths().len(), 4);
    for path in files.paths() {
        assert!(path.exists(), "{} was not written", path.display());
        assert!(path.starts_with(&dir));
    }

    let diffs = files.value_differences.as_ref().unwrap();
    let stem = diffs.file_name().unwrap().to_str().unwrap();
    assert!(stem.starts_with("value_differences_"));
    assert!(stem.ends_with(".csv"));
    let ts = &stem["value_differences_".len()..stem.len() - ".csv".len()];
    assert_eq!(ts.len(), "YYYYmmdd_HHMMSS".len());
    assert_eq!(
        files.summary.file_name().unwrap().to_str().unwrap(),
        format!("comparison_summary_{ts}.json")
    );

    let reloaded = load_lazy(diffs, &SourceOptions::default()).unwrap().collect().unwrap();
    assert_eq!(reloaded.height(), 1);
    assert_eq!(
        reloaded.get_column_names().iter().map(|n| n.to_string()).collect::<Vec<_>>(),
        vec!["PK_id", "L_name <label>", "R_name <label>"]
    );

    let summary: Summary =
        serde_json::from_str(&std::fs::read_to_string(&files.summary).unwrap()).unwrap();
    assert_eq!(summary, results.summary);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn export_skips_empty_partitions_but_always_writes_summary() {
    let left = df!("id" => [1i64], "name" => ["a"]).unwrap().lazy();
    let results = compare(&config(), left.clone(), left).unwrap();
    let dir = temp_dir("export_identical");

    let files = results.export(ExportFormat::Parquet, &dir).unwrap();
    assert!(files.value_differences.is_none());
    assert!(files.left_only.is_none());
    assert!(files.right_only.is_none());
    assert!(files.summary.exists());
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn parquet_and_json_exports_read_back() {
    let results = results();
    for format in [ExportFormat::Parquet, ExportFormat::Json] {
        let dir = temp_dir(&format!("export_{format}"));
        let files = results.export(format, &dir).unwrap();

        let left_only = files.left_only.as_ref().unwrap();
        assert_eq!(left_only.extension().unwrap(), format.extension());
        let options = SourceOptions {
            json_lines: Some(true),
            ..SourceOptions::default()
        };
        let df = load_lazy(left_only, &options).unwrap().collect().unwrap();
        assert_eq!(df.height(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
