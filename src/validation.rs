//! Dataset validation against a [`ComparisonSchema`], and primary-key uniqueness.
//!
//! Schema checks accumulate structured [`ValidationError`]s instead of failing on the first
//! problem; [`crate::compare`] turns a non-empty list into a single
//! [`CompareError::SchemaValidation`].

use std::fmt;

use polars::prelude::{DataType as PlDataType, Expr, LazyFrame, PolarsResult, col, len, lit};
use serde::Serialize;

use crate::error::{CompareError, CompareResult, StageContext};
use crate::frame::{count_rows, scalar_u64};
use crate::pipeline::Stage;
use crate::types::{ComparisonSchema, DataType, Side};

/// Category of a schema validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    /// One or more declared columns are absent from the dataset.
    MissingColumns,
    /// A column's actual type differs from its declared type.
    TypeMismatch,
    /// A non-nullable column contains nulls.
    NullabilityViolation,
    /// A schema primary-key column is not among the schema's declared columns.
    MissingPrimaryKeyDefinition,
}

/// One schema validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    /// Offending column, when the problem concerns exactly one column.
    pub column: Option<String>,
    /// Human-readable description.
    pub detail: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// Every schema problem found on one side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaFailure {
    pub side: Side,
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for SchemaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dataset: ", self.side)?;
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// Check `dataset` against `schema`.
///
/// Returns every problem found; an empty list means the dataset is valid. Only backend failures
/// (e.g. a broken scan) are returned as `Err`.
///
/// - all declared columns must be present (extra columns are fine)
/// - present columns must have the declared type, except that an empty dataset may carry the
///   backend's `Null` placeholder type
/// - non-nullable columns must not contain nulls
/// - every schema primary-key column must be declared
pub fn validate_schema(dataset: &LazyFrame, schema: &ComparisonSchema) -> PolarsResult<Vec<ValidationError>> {
    let actual = dataset.clone().collect_schema()?;
    let mut errors = Vec::new();

    let missing: Vec<&str> = schema
        .column_names()
        .filter(|name| actual.get(name).is_none())
        .collect();
    if !missing.is_empty() {
        errors.push(ValidationError {
            kind: ValidationErrorKind::MissingColumns,
            column: None,
            detail: format!("missing columns: {}", missing.join(", ")),
        });
    }

    let mut row_count: Option<usize> = None;
    for def in schema.columns() {
        let Some(actual_dtype) = actual.get(def.name()) else {
            continue;
        };
        let mapped = DataType::from_polars(actual_dtype);
        if mapped.as_ref() == Some(def.datatype()) {
            continue;
        }
        if matches!(actual_dtype, PlDataType::Null) {
            let rows = match row_count {
                Some(n) => n,
                None => {
                    let n = count_rows(dataset.clone())?;
                    row_count = Some(n);
                    n
                }
            };
            if rows == 0 {
                continue;
            }
        }
        let got = match mapped {
            Some(dt) => dt.to_string(),
            None => format!("{actual_dtype}"),
        };
        errors.push(ValidationError {
            kind: ValidationErrorKind::TypeMismatch,
            column: Some(def.name().to_string()),
            detail: format!("column '{}': expected {}, got {got}", def.name(), def.datatype()),
        });
    }

    let non_nullable: Vec<&str> = schema
        .columns()
        .filter(|def| !def.nullable() && actual.get(def.name()).is_some())
        .map(|def| def.name())
        .collect();
    if !non_nullable.is_empty() {
        let exprs: Vec<Expr> = non_nullable
            .iter()
            .enumerate()
            .map(|(i, name)| col(*name).null_count().alias(format!("nulls_{i}")))
            .collect();
        let counts = dataset.clone().select(exprs).collect()?;
        for (i, name) in non_nullable.iter().enumerate() {
            let nulls = scalar_u64(&counts, &format!("nulls_{i}"))?;
            if nulls > 0 {
                errors.push(ValidationError {
                    kind: ValidationErrorKind::NullabilityViolation,
                    column: Some(name.to_string()),
                    detail: format!(
                        "column '{name}': {nulls} null values found but column defined as non-nullable"
                    ),
                });
            }
        }
    }

    for pk in schema.pk_columns() {
        if !schema.contains(pk) {
            errors.push(ValidationError {
                kind: ValidationErrorKind::MissingPrimaryKeyDefinition,
                column: Some(pk.clone()),
                detail: format!("primary key column '{pk}' not defined in schema"),
            });
        }
    }

    Ok(errors)
}

/// Fail with [`CompareError::PrimaryKeyViolation`] if any `pk_columns` tuple occurs more than once
/// or has a null component.
///
/// Rows with a null key component are counted separately and left out of the duplicate groups.
/// `pk_columns` are the dataset's own column names (see
/// [`crate::config::ComparisonConfig::source_pk_columns`]), not comparison names.
pub fn validate_primary_key_uniqueness(dataset: &LazyFrame, pk_columns: &[&str], side: Side) -> CompareResult<()> {
    let mut size_column = String::from("__group_size");
    while pk_columns.contains(&size_column.as_str()) {
        size_column.push('_');
    }

    let keys: Vec<Expr> = pk_columns.iter().map(|name| col(*name)).collect();
    let Some(any_null) = keys.iter().cloned().map(Expr::is_null).reduce(|acc, p| acc.or(p)) else {
        return Ok(());
    };

    let null_keys = count_rows(dataset.clone().filter(any_null.clone())).in_stage(Stage::PrimaryKeyValidation)?;
    let duplicates = dataset
        .clone()
        .filter(any_null.not())
        .group_by(keys)
        .agg([len().alias(size_column.as_str())])
        .filter(col(size_column.as_str()).gt(lit(1)));
    let duplicate_groups = count_rows(duplicates).in_stage(Stage::PrimaryKeyValidation)?;

    if duplicate_groups > 0 || null_keys > 0 {
        return Err(CompareError::PrimaryKeyViolation {
            side,
            duplicate_groups,
            null_keys,
        });
    }
    Ok(())
}
