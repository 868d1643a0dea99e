use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polars::prelude::*;
use rust_data_compare::compare;
use rust_data_compare::config::{ColumnMapping, ComparisonConfig};
use rust_data_compare::types::{ColumnDefinition, ComparisonSchema, DataType};

fn config() -> ComparisonConfig {
    let schema = ComparisonSchema::new(
        vec![
            ColumnDefinition::new("id", "ID", DataType::Int64, false),
            ColumnDefinition::new("amount", "Amount", DataType::Float64, true),
            ColumnDefinition::new("label", "Label", DataType::String, true),
        ],
        vec!["id".to_string()],
    )
    .expect("schema");
    ComparisonConfig::builder(schema.clone(), schema)
        .mapping(ColumnMapping::new("id", "id", "id"))
        .mapping(ColumnMapping::new("amount", "amount", "amount"))
        .mapping(ColumnMapping::new("label", "label", "label"))
        .primary_key("id")
        .tolerance("amount", 0.01)
        .build()
        .expect("config")
}

/// `rows` rows; every 10th amount drifts, every 50th key is shifted out of range.
fn frames(rows: i64) -> (LazyFrame, LazyFrame) {
    let ids: Vec<i64> = (0..rows).collect();
    let amounts: Vec<f64> = ids.iter().map(|i| *i as f64 * 1.5).collect();
    let labels: Vec<String> = ids.iter().map(|i| format!("label-{}", i % 97)).collect();

    let right_ids: Vec<i64> = ids.iter().map(|i| if i % 50 == 0 { i + rows } else { *i }).collect();
    let right_amounts: Vec<f64> = amounts
        .iter()
        .enumerate()
        .map(|(i, a)| if i % 10 == 0 { a + 1.0 } else { *a })
        .collect();

    let left = df!("id" => &ids, "amount" => &amounts, "label" => &labels).expect("left");
    let right = df!("id" => right_ids, "amount" => right_amounts, "label" => labels).expect("right");
    (left.lazy(), right.lazy())
}

fn bench_compare(c: &mut Criterion) {
    let config = config();
    let mut group = c.benchmark_group("compare");
    for rows in [10_000i64, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter_batched(
                || frames(rows),
                |(left, right)| {
                    let results = compare(&config, left, right).expect("compare");
                    black_box(results.summary.value_differences_count)
                },
                BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compare);
criterion_main!(benches);
