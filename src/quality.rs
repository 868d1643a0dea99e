//! Data-quality checks on a single dataset.
//!
//! The checks are independent of any comparison and are usually run on each input before
//! [`crate::compare`]. A failing check is a result, not an error: every check returns a
//! [`QualityCheck`] listing the [`QualityIssue`]s it found. Only backend failures are `Err`.
//!
//! [`QualityRules`] bundles the checks and runs every rule group that is configured:
//!
//! ```rust
//! use polars::prelude::*;
//! use rust_data_compare::quality::{QualityRules, Range};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let lf = df!("id" => [1i64, 2, 2], "score" => [10.0, -1.0, 50.0])?.lazy();
//! let report = QualityRules::default()
//!     .require("id")
//!     .range("score", Range::at_least(0.0))
//!     .unique("id")
//!     .run(&lf)?;
//! assert!(!report.is_valid());
//! assert_eq!(report.failures().count(), 2);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use indexmap::IndexMap;
use polars::prelude::{DataType as PlDataType, Expr, LazyFrame, Schema, col, len, lit};
use serde::{Deserialize, Serialize};

use crate::error::CompareResult;
use crate::frame::{count_rows, scalar_u64};
use crate::types::DataType;

/// Which check produced a [`QualityCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCheckKind {
    Completeness,
    DataTypes,
    NumericRanges,
    StringPatterns,
    Uniqueness,
}

impl fmt::Display for QualityCheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Completeness => "completeness",
            Self::DataTypes => "data type",
            Self::NumericRanges => "range",
            Self::StringPatterns => "pattern",
            Self::Uniqueness => "uniqueness",
        })
    }
}

/// One problem found by a quality check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum QualityIssue {
    MissingColumn { column: String },
    /// Every value of the column is null (or the dataset has no rows).
    AllNull { column: String },
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: String,
    },
    BelowMinimum {
        column: String,
        min: f64,
        violations: usize,
    },
    AboveMaximum {
        column: String,
        max: f64,
        violations: usize,
    },
    /// Non-null values that do not match `pattern`.
    PatternMismatch {
        column: String,
        pattern: String,
        violations: usize,
    },
    Duplicates { column: String, duplicate_groups: usize },
}

impl QualityIssue {
    pub fn column(&self) -> &str {
        match self {
            Self::MissingColumn { column }
            | Self::AllNull { column }
            | Self::TypeMismatch { column, .. }
            | Self::BelowMinimum { column, .. }
            | Self::AboveMaximum { column, .. }
            | Self::PatternMismatch { column, .. }
            | Self::Duplicates { column, .. } => column,
        }
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingColumn { column } => write!(f, "column '{column}' is missing"),
            Self::AllNull { column } => write!(f, "column '{column}' contains no data"),
            Self::TypeMismatch {
                column,
                expected,
                actual,
            } => write!(f, "column '{column}': expected {expected}, got {actual}"),
            Self::BelowMinimum {
                column,
                min,
                violations,
            } => write!(f, "column '{column}': {violations} value(s) below min >= {min}"),
            Self::AboveMaximum {
                column,
                max,
                violations,
            } => write!(f, "column '{column}': {violations} value(s) above max <= {max}"),
            Self::PatternMismatch {
                column,
                pattern,
                violations,
            } => write!(f, "column '{column}': {violations} value(s) do not match /{pattern}/"),
            Self::Duplicates {
                column,
                duplicate_groups,
            } => write!(f, "column '{column}': {duplicate_groups} duplicated value(s)"),
        }
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityCheck {
    pub kind: QualityCheckKind,
    pub issues: Vec<QualityIssue>,
}

impl QualityCheck {
    fn new(kind: QualityCheckKind, issues: Vec<QualityIssue>) -> Self {
        Self { kind, issues }
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// One-line description of the outcome.
    pub fn message(&self) -> String {
        if self.is_valid() {
            return match self.kind {
                QualityCheckKind::Completeness => "All required columns are present and contain data",
                QualityCheckKind::DataTypes => "All columns have expected data types",
                QualityCheckKind::NumericRanges => "All numeric columns fall within expected ranges",
                QualityCheckKind::StringPatterns => "All string columns match expected patterns",
                QualityCheckKind::Uniqueness => "All specified columns contain unique values",
            }
            .to_string();
        }
        if self.kind == QualityCheckKind::Completeness {
            let missing = self
                .issues
                .iter()
                .filter(|i| matches!(i, QualityIssue::MissingColumn { .. }))
                .count();
            return format!(
                "Completeness validation failed: {missing} missing columns, {} null columns",
                self.issues.len() - missing
            );
        }
        let mut kind = self.kind.to_string();
        if let Some(first) = kind.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        format!("{kind} validation failed: {} violations found", self.issues.len())
    }
}

impl fmt::Display for QualityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Inclusive numeric bounds. A missing bound is unchecked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Range {
    pub fn between(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn at_least(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f64) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }
}

/// A set of quality rules for one dataset. Serializable so rules can live next to a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityRules {
    pub required_columns: Vec<String>,
    pub expected_types: IndexMap<String, DataType>,
    pub ranges: IndexMap<String, Range>,
    /// Regular expressions, matched anywhere in the value.
    pub patterns: IndexMap<String, String>,
    pub unique_columns: Vec<String>,
}

impl QualityRules {
    pub fn require(mut self, column: impl Into<String>) -> Self {
        self.required_columns.push(column.into());
        self
    }

    pub fn expect_type(mut self, column: impl Into<String>, datatype: DataType) -> Self {
        self.expected_types.insert(column.into(), datatype);
        self
    }

    pub fn range(mut self, column: impl Into<String>, range: Range) -> Self {
        self.ranges.insert(column.into(), range);
        self
    }

    pub fn pattern(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.patterns.insert(column.into(), pattern.into());
        self
    }

    pub fn unique(mut self, column: impl Into<String>) -> Self {
        self.unique_columns.push(column.into());
        self
    }

    /// Run every configured rule group against `dataset`, in declaration order of the fields.
    /// Empty rule groups are skipped.
    pub fn run(&self, dataset: &LazyFrame) -> CompareResult<QualityReport> {
        let mut checks = Vec::new();
        if !self.required_columns.is_empty() {
            checks.push(check_completeness(dataset, &self.required_columns)?);
        }
        if !self.expected_types.is_empty() {
            checks.push(check_types(dataset, &self.expected_types)?);
        }
        if !self.ranges.is_empty() {
            checks.push(check_ranges(dataset, &self.ranges)?);
        }
        if !self.patterns.is_empty() {
            checks.push(check_patterns(dataset, &self.patterns)?);
        }
        if !self.unique_columns.is_empty() {
            checks.push(check_uniqueness(dataset, &self.unique_columns)?);
        }
        Ok(QualityReport { checks })
    }
}

/// Every check run by [`QualityRules::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub checks: Vec<QualityCheck>,
}

impl QualityReport {
    pub fn is_valid(&self) -> bool {
        self.checks.iter().all(QualityCheck::is_valid)
    }

    pub fn failures(&self) -> impl Iterator<Item = &QualityCheck> {
        self.checks.iter().filter(|c| !c.is_valid())
    }
}

/// Required columns must exist and hold at least one non-null value.
pub fn check_completeness(dataset: &LazyFrame, required: &[String]) -> CompareResult<QualityCheck> {
    let schema = dataset.clone().collect_schema()?;
    let mut issues = Vec::new();
    let mut present = Vec::new();
    for column in required {
        if schema.get(column).is_some() {
            present.push(column);
        } else {
            issues.push(QualityIssue::MissingColumn {
                column: column.clone(),
            });
        }
    }

    if !present.is_empty() {
        let mut exprs = vec![len().alias("rows")];
        exprs.extend(
            present
                .iter()
                .enumerate()
                .map(|(i, column)| col(column.as_str()).null_count().alias(format!("nulls_{i}"))),
        );
        let counts = dataset.clone().select(exprs).collect()?;
        let rows = scalar_u64(&counts, "rows")?;
        for (i, column) in present.into_iter().enumerate() {
            if scalar_u64(&counts, &format!("nulls_{i}"))? == rows {
                issues.push(QualityIssue::AllNull {
                    column: column.clone(),
                });
            }
        }
    }

    Ok(QualityCheck::new(QualityCheckKind::Completeness, issues))
}

/// Present columns must have the expected declared type. Absent columns are not reported here.
pub fn check_types(dataset: &LazyFrame, expected: &IndexMap<String, DataType>) -> CompareResult<QualityCheck> {
    let schema = dataset.clone().collect_schema()?;
    let mut issues = Vec::new();
    for (column, datatype) in expected {
        let Some(actual) = schema.get(column) else {
            continue;
        };
        let mapped = DataType::from_polars(actual);
        if mapped.as_ref() != Some(datatype) {
            issues.push(QualityIssue::TypeMismatch {
                column: column.clone(),
                expected: datatype.clone(),
                actual: mapped.map_or_else(|| actual.to_string(), |dt| dt.to_string()),
            });
        }
    }
    Ok(QualityCheck::new(QualityCheckKind::DataTypes, issues))
}

/// Count values outside each column's [`Range`]. Absent and non-numeric columns are skipped, and
/// nulls are never out of range.
pub fn check_ranges(dataset: &LazyFrame, ranges: &IndexMap<String, Range>) -> CompareResult<QualityCheck> {
    enum Bound {
        Min(f64),
        Max(f64),
    }

    let schema = dataset.clone().collect_schema()?;
    let mut probes = Vec::new();
    let mut exprs = Vec::new();
    for (column, range) in ranges {
        if !is_numeric_column(&schema, column) {
            continue;
        }
        let value = col(column.as_str()).cast(PlDataType::Float64);
        if let Some(min) = range.min {
            exprs.push(value.clone().lt(lit(min)).sum().alias(format!("probe_{}", probes.len())));
            probes.push((column, Bound::Min(min)));
        }
        if let Some(max) = range.max {
            exprs.push(value.gt(lit(max)).sum().alias(format!("probe_{}", probes.len())));
            probes.push((column, Bound::Max(max)));
        }
    }

    let mut issues = Vec::new();
    if !exprs.is_empty() {
        let counts = dataset.clone().select(exprs).collect()?;
        for (i, (column, bound)) in probes.into_iter().enumerate() {
            let violations = scalar_u64(&counts, &format!("probe_{i}"))? as usize;
            if violations == 0 {
                continue;
            }
            let column = column.clone();
            issues.push(match bound {
                Bound::Min(min) => QualityIssue::BelowMinimum {
                    column,
                    min,
                    violations,
                },
                Bound::Max(max) => QualityIssue::AboveMaximum {
                    column,
                    max,
                    violations,
                },
            });
        }
    }
    Ok(QualityCheck::new(QualityCheckKind::NumericRanges, issues))
}

/// Count non-null values that do not contain a match for the column's regex. Absent and
/// non-string columns are skipped. An invalid regex is a backend error.
pub fn check_patterns(dataset: &LazyFrame, patterns: &IndexMap<String, String>) -> CompareResult<QualityCheck> {
    let schema = dataset.clone().collect_schema()?;
    let checked: Vec<(&String, &String)> = patterns
        .iter()
        .filter(|(column, _)| matches!(schema.get(column.as_str()), Some(PlDataType::String)))
        .collect();

    let mut issues = Vec::new();
    if !checked.is_empty() {
        let exprs: Vec<Expr> = checked
            .iter()
            .enumerate()
            .map(|(i, (column, pattern))| {
                col(column.as_str())
                    .str()
                    .contains(lit(pattern.as_str()), true)
                    .not()
                    .sum()
                    .alias(format!("misses_{i}"))
            })
            .collect();
        let counts = dataset.clone().select(exprs).collect()?;
        for (i, (column, pattern)) in checked.into_iter().enumerate() {
            let violations = scalar_u64(&counts, &format!("misses_{i}"))? as usize;
            if violations > 0 {
                issues.push(QualityIssue::PatternMismatch {
                    column: column.clone(),
                    pattern: pattern.clone(),
                    violations,
                });
            }
        }
    }
    Ok(QualityCheck::new(QualityCheckKind::StringPatterns, issues))
}

/// Each listed column must hold unique values on its own. Nulls group together. Absent columns
/// are skipped.
pub fn check_uniqueness(dataset: &LazyFrame, columns: &[String]) -> CompareResult<QualityCheck> {
    let schema = dataset.clone().collect_schema()?;
    let mut issues = Vec::new();
    for column in columns {
        if schema.get(column).is_none() {
            continue;
        }
        let mut size_column = String::from("__group_size");
        while size_column == *column {
            size_column.push('_');
        }
        let duplicates = dataset
            .clone()
            .group_by([col(column.as_str())])
            .agg([len().alias(size_column.as_str())])
            .filter(col(size_column.as_str()).gt(lit(1)));
        let duplicate_groups = count_rows(duplicates)?;
        if duplicate_groups > 0 {
            issues.push(QualityIssue::Duplicates {
                column: column.clone(),
                duplicate_groups,
            });
        }
    }
    Ok(QualityCheck::new(QualityCheckKind::Uniqueness, issues))
}

fn is_numeric_column(schema: &Schema, column: &str) -> bool {
    schema
        .get(column)
        .and_then(DataType::from_polars)
        .is_some_and(|dt| dt.is_numeric())
}
