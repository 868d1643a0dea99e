use std::time::{SystemTime, UNIX_EPOCH};

use polars::prelude::{DataType as PlDataType, *};
use rust_data_compare::CompareError;
use rust_data_compare::compare;
use rust_data_compare::config::ComparisonConfig;
use rust_data_compare::types::{DataType, Side};

const CONFIG_JSON: &str = r#"{
  "left_schema": {
    "columns": [
      {"name": "id", "alias": "ID", "datatype": "Int64", "nullable": false},
      {"name": "amount", "alias": "Amount", "datatype": "Float64", "nullable": true},
      {"name": "tags", "alias": "Tags", "datatype": "List(Utf8)", "nullable": true}
    ],
    "pk_columns": ["id"]
  },
  "right_schema": {
    "columns": [
      {"name": "customer_id", "alias": "Customer ID", "datatype": "Int64", "nullable": false},
      {"name": "total", "alias": "Total", "datatype": "Float64", "nullable": true}
    ],
    "pk_columns": ["customer_id"]
  },
  "column_mappings": [
    {"left_column": "id", "right_column": "customer_id", "comparison_name": "id"},
    {"left_column": "amount", "right_column": "total", "comparison_name": "amount"}
  ],
  "primary_key_columns": ["id"],
  "tolerance": {"amount": 0.5}
}"#;

fn temp_path(name: &str) -> std::path::PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("rust_data_compare_{name}_{nanos}.json"))
}

#[test]
fn loads_config_with_legacy_field_names_and_defaults() {
    let config = ComparisonConfig::from_json_str(CONFIG_JSON).unwrap();
    assert_eq!(config.pk_columns(), ["id".to_string()]);
    assert_eq!(config.mappings().len(), 2);
    assert!(config.null_equals_null());
    assert!(!config.ignore_case());
    assert_eq!(config.tolerance_for("amount"), Some(0.5));
    assert_eq!(config.source_pk_columns(Side::Right), vec!["customer_id"]);

    let tags = config.left_schema().column("tags").unwrap();
    assert_eq!(tags.datatype(), &DataType::List(Box::new(DataType::String)));
}

#[test]
fn file_round_trip_preserves_config() {
    let config = ComparisonConfig::from_json_str(CONFIG_JSON).unwrap();
    let path = temp_path("config");

    config.write_json_path(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"List(String)\""));
    let reloaded = ComparisonConfig::from_json_path(&path).unwrap();
    assert_eq!(reloaded, config);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn loaded_config_drives_a_comparison() {
    let config = ComparisonConfig::from_json_str(CONFIG_JSON).unwrap();
    let left = df!("id" => [1i64, 2], "amount" => [10.0, 20.0]).unwrap().lazy();
    let right = df!("customer_id" => [1i64, 2], "total" => [10.4, 21.0]).unwrap().lazy();

    // Declared-but-absent `tags` column fails left validation.
    let err = compare(&config, left.clone(), right.clone()).unwrap_err();
    assert!(matches!(err, CompareError::SchemaValidation { .. }));
    assert!(err.schema_errors(Side::Left).is_some());
    assert!(err.schema_errors(Side::Right).is_none());

    let tags = lit(NULL).cast(PlDataType::List(Box::new(PlDataType::String)));
    let left = left.with_column(tags.alias("tags"));
    let results = compare(&config, left, right).unwrap();
    assert_eq!(results.summary.value_differences_count, 1);
    assert_eq!(results.summary.matching, 1);
}

#[test]
fn invalid_config_json_reports_every_problem() {
    let json = CONFIG_JSON
        .replace(r#""primary_key_columns": ["id"]"#, r#""primary_key_columns": ["nope"]"#)
        .replace(r#""tolerance": {"amount": 0.5}"#, r#""tolerance": {"amount": -1.0}"#);
    let err = ComparisonConfig::from_json_str(&json).unwrap_err();
    match err {
        CompareError::Configuration { errors } => {
            assert!(errors.iter().any(|e| e.contains("'nope' not found in column mappings")));
            assert!(errors.iter().any(|e| e.contains("finite, non-negative")));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unknown_type_name_is_a_json_error() {
    let json = CONFIG_JSON.replace(r#""datatype": "List(Utf8)""#, r#""datatype": "Decimal""#);
    let err = ComparisonConfig::from_json_str(&json).unwrap_err();
    assert!(matches!(err, CompareError::Json(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = ComparisonConfig::from_json_path(temp_path("missing")).unwrap_err();
    assert!(matches!(err, CompareError::Io(_)));
}

#[test]
fn from_frames_auto_maps_shared_columns() {
    let left = df!("id" => [1i64, 2], "value" => [1.0, 2.0], "left_note" => ["a", "b"])
        .unwrap()
        .lazy();
    let right = df!("value" => [1.0, 2.5], "id" => [1i64, 2]).unwrap().lazy();

    let config = ComparisonConfig::from_frames(&left, &right, &["id"]).unwrap();
    let mapped: Vec<&str> = config.mappings().iter().map(|m| m.comparison_name.as_str()).collect();
    assert_eq!(mapped, vec!["id", "value"]);

    let results = compare(&config, left, right).unwrap();
    assert_eq!(results.summary.value_differences_count, 1);
}
