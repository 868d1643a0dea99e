use std::fs::File;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use polars::prelude::*;
use rust_data_compare::CompareError;
use rust_data_compare::compare;
use rust_data_compare::config::ComparisonConfig;
use rust_data_compare::source::{SourceFormat, SourceOptions, load_lazy};

fn temp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    std::env::temp_dir().join(format!("rust_data_compare_{name}_{nanos}.{ext}"))
}

fn write_text(name: &str, ext: &str, contents: &str) -> PathBuf {
    let path = temp_file(name, ext);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn loads_csv_with_header() {
    let path = write_text("people", "csv", "id,name,score\n1,Ada,98.5\n2,Grace,91.0\n");
    let df = load_lazy(&path, &SourceOptions::default()).unwrap().collect().unwrap();
    assert_eq!(df.shape(), (2, 3));
    assert_eq!(df.column("id").unwrap().dtype(), &polars::prelude::DataType::Int64);
    assert_eq!(df.column("name").unwrap().str().unwrap().get(1), Some("Grace"));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn loads_csv_with_custom_separator_and_forced_format() {
    let path = write_text("semicolon", "txt", "id;name\n1;Ada\n");
    let options = SourceOptions {
        csv_separator: b';',
        ..SourceOptions::default().with_format(SourceFormat::Csv)
    };
    let df = load_lazy(&path, &options).unwrap().collect().unwrap();
    assert_eq!(df.shape(), (1, 2));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn loads_json_array_and_ndjson() {
    let array = write_text("array", "json", r#"[{"id": 1, "v": "a"}, {"id": 2, "v": "b"}]"#);
    let lines = write_text("lines", "ndjson", "{\"id\": 1, \"v\": \"a\"}\n{\"id\": 2, \"v\": \"b\"}\n");

    for path in [&array, &lines] {
        let df = load_lazy(path, &SourceOptions::default()).unwrap().collect().unwrap();
        assert_eq!(df.shape(), (2, 2), "{}", path.display());
        let _ = std::fs::remove_file(path);
    }
}

#[test]
fn loads_parquet() {
    let path = temp_file("frame", "parquet");
    let mut df = df!("id" => [1i64, 2, 3], "amount" => [1.0, 2.0, 3.0]).unwrap();
    ParquetWriter::new(File::create(&path).unwrap()).finish(&mut df).unwrap();

    let loaded = load_lazy(&path, &SourceOptions::default()).unwrap().collect().unwrap();
    assert!(loaded.equals(&df));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_file_is_an_io_or_polars_error() {
    let err = load_lazy(temp_file("missing", "parquet"), &SourceOptions::default()).err().expect("expected an error");
    assert!(matches!(err, CompareError::Io(_) | CompareError::Polars(_)));
}

#[test]
fn unsupported_extension_is_rejected() {
    let err = load_lazy("book.xlsx", &SourceOptions::default()).err().expect("expected an error");
    assert!(matches!(err, CompareError::UnsupportedFormat { .. }));
    assert!(err.to_string().contains("book.xlsx"));
}

#[test]
fn loaded_files_compare_end_to_end() {
    let left = write_text("left", "csv", "id,amount\n1,10.0\n2,20.0\n3,30.0\n");
    let right = write_text("right", "ndjson", "{\"id\": 1, \"amount\": 10.0}\n{\"id\": 2, \"amount\": 25.0}\n");

    let left_lf = load_lazy(&left, &SourceOptions::default()).unwrap();
    let right_lf = load_lazy(&right, &SourceOptions::default()).unwrap();
    let config = ComparisonConfig::from_frames(&left_lf, &right_lf, &["id"]).unwrap();

    let s = compare(&config, left_lf, right_lf).unwrap().summary;
    assert_eq!(s.matching, 1);
    assert_eq!(s.value_differences_count, 1);
    assert_eq!(s.left_only_count, 1);

    let _ = std::fs::remove_file(&left);
    let _ = std::fs::remove_file(&right);
}
