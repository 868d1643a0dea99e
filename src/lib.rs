//! `rust-data-compare` reconciles two tabular datasets, a "left" and a "right", that may differ in
//! column names, column order, and which rows they contain.
//!
//! The primary entrypoint is [`compare`]. It takes a validated [`config::ComparisonConfig`] and two
//! Polars [`LazyFrame`](polars::prelude::LazyFrame)s and returns [`ComparisonResults`]:
//!
//! - **value differences**: rows whose primary key exists on both sides but whose mapped values differ
//! - **left-only** / **right-only** records: rows whose key exists on one side only
//! - a [`summary::Summary`] with record counts
//!
//! ## Pipeline
//!
//! 1. Both datasets are validated against their [`types::ComparisonSchema`]. Problems from both
//!    sides are reported together in one error.
//! 2. Primary keys must be unique and non-null on both sides.
//! 3. Each side is projected onto its mapped columns and renamed into a shared namespace: key
//!    columns become `PK_<name>`, other columns `L_<name>` / `R_<name>`.
//! 4. The canonical relations are joined on the key columns and partitioned.
//! 5. Partitions are counted into a summary.
//!
//! Everything up to the summary stage is a deferred Polars plan; partitions are only executed when
//! counted or collected.
//!
//! **Comparison policies** (per config):
//!
//! - `ignore_case`: lower-case string columns on both sides before joining
//! - `null_equals_null`: whether two nulls compare equal (default `true`)
//! - `tolerance`: per-column absolute numeric tolerance (`|l - r| <= t` is equal)
//!
//! ## Quick example
//!
//! ```rust
//! use polars::prelude::*;
//! use rust_data_compare::config::{ColumnMapping, ComparisonConfig};
//! use rust_data_compare::types::{ColumnDefinition, ComparisonSchema, DataType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let left_schema = ComparisonSchema::new(
//!     vec![
//!         ColumnDefinition::new("id", "ID", DataType::Int64, false),
//!         ColumnDefinition::new("amount", "Amount", DataType::Float64, true),
//!     ],
//!     vec!["id".to_string()],
//! )?;
//! let right_schema = ComparisonSchema::new(
//!     vec![
//!         ColumnDefinition::new("customer_id", "Customer ID", DataType::Int64, false),
//!         ColumnDefinition::new("total", "Total", DataType::Float64, true),
//!     ],
//!     vec!["customer_id".to_string()],
//! )?;
//! let config = ComparisonConfig::builder(left_schema, right_schema)
//!     .mapping(ColumnMapping::new("id", "customer_id", "id"))
//!     .mapping(ColumnMapping::new("amount", "total", "amount"))
//!     .primary_key("id")
//!     .tolerance("amount", 0.01)
//!     .build()?;
//!
//! let left = df!("id" => [1i64, 2, 3], "amount" => [100.0, 200.0, 300.0])?.lazy();
//! let right = df!("customer_id" => [1i64, 2, 4], "total" => [100.005, 250.0, 400.0])?.lazy();
//!
//! let results = rust_data_compare::compare(&config, left, right)?;
//! assert_eq!(results.summary.matching, 1);
//! assert_eq!(results.summary.value_differences_count, 1);
//! println!("{}", results.report().summary_text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`types`]: data types and per-side schemas
//! - [`config`]: comparison config, builder, and JSON persistence
//! - [`validation`]: schema and primary-key checks
//! - [`quality`]: standalone data-quality rules (completeness, types, ranges, patterns, uniqueness)
//! - [`prepare`]: canonical column namespace
//! - [`diff`]: join-based partitioning
//! - [`summary`]: record counts
//! - [`pipeline`]: [`compare`], observers, cancellation, and results
//! - [`batch`]: many comparisons on a dedicated thread pool
//! - [`source`]: loading CSV/JSON/Parquet inputs
//! - [`report`] / [`export`]: text, table and HTML reports and file export
//! - [`error`]: the crate's error type

pub mod batch;
pub mod config;
pub mod diff;
pub mod error;
pub mod export;
mod frame;
pub mod pipeline;
pub mod prepare;
pub mod quality;
pub mod report;
pub mod source;
pub mod summary;
pub mod types;
pub mod validation;

pub use error::{CompareError, CompareResult};
pub use pipeline::{CompareOptions, ComparisonResults, compare, compare_with_options};
