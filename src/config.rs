//! Comparison configuration.
//!
//! A [`ComparisonConfig`] binds a left and a right [`ComparisonSchema`] through explicit
//! [`ColumnMapping`]s and carries the comparison policies. It is validated once, when it is built
//! (or deserialized), and is immutable afterwards; the same value can be reused for any number of
//! [`crate::compare`] calls, including concurrent ones.
//!
//! ```rust
//! use rust_data_compare::config::{ColumnMapping, ComparisonConfig};
//! use rust_data_compare::types::{ColumnDefinition, ComparisonSchema, DataType};
//!
//! # fn main() -> Result<(), rust_data_compare::CompareError> {
//! let left = ComparisonSchema::new(
//!     vec![
//!         ColumnDefinition::new("id", "ID", DataType::Int64, false),
//!         ColumnDefinition::new("amount", "Amount", DataType::Float64, true),
//!     ],
//!     vec!["id".to_string()],
//! )?;
//! let right = ComparisonSchema::new(
//!     vec![
//!         ColumnDefinition::new("customer_id", "Customer ID", DataType::Int64, false),
//!         ColumnDefinition::new("total", "Total", DataType::Float64, true),
//!     ],
//!     vec!["customer_id".to_string()],
//! )?;
//!
//! let config = ComparisonConfig::builder(left, right)
//!     .mapping(ColumnMapping::new("id", "customer_id", "id"))
//!     .mapping(ColumnMapping::new("amount", "total", "amount"))
//!     .primary_key("id")
//!     .tolerance("amount", 0.01)
//!     .build()?;
//! assert_eq!(config.pk_columns(), ["id".to_string()]);
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use polars::prelude::LazyFrame;
use serde::{Deserialize, Serialize};

use crate::error::{CompareError, CompareResult};
use crate::types::{ColumnDefinition, ComparisonSchema, DataType, Side};

/// Pairs a left column with a right column under a shared comparison name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(alias = "left_column")]
    pub left_name: String,
    #[serde(alias = "right_column")]
    pub right_name: String,
    pub comparison_name: String,
}

impl ColumnMapping {
    pub fn new(
        left_name: impl Into<String>,
        right_name: impl Into<String>,
        comparison_name: impl Into<String>,
    ) -> Self {
        Self {
            left_name: left_name.into(),
            right_name: right_name.into(),
            comparison_name: comparison_name.into(),
        }
    }

    /// Source column name on `side`.
    pub fn source_name(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_name,
            Side::Right => &self.right_name,
        }
    }
}

/// Validated, immutable comparison configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConfigRepr", into = "ConfigRepr")]
pub struct ComparisonConfig {
    left_schema: ComparisonSchema,
    right_schema: ComparisonSchema,
    mappings: Vec<ColumnMapping>,
    pk_columns: Vec<String>,
    ignore_case: bool,
    null_equals_null: bool,
    tolerance: IndexMap<String, f64>,
}

/// Builder for [`ComparisonConfig`]. Nothing is checked until [`Self::build`].
#[derive(Debug, Clone)]
pub struct ComparisonConfigBuilder {
    left_schema: ComparisonSchema,
    right_schema: ComparisonSchema,
    mappings: Vec<ColumnMapping>,
    pk_columns: Vec<String>,
    ignore_case: bool,
    null_equals_null: bool,
    tolerance: IndexMap<String, f64>,
}

impl ComparisonConfigBuilder {
    pub fn mapping(mut self, mapping: ColumnMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn mappings(mut self, mappings: impl IntoIterator<Item = ColumnMapping>) -> Self {
        self.mappings.extend(mappings);
        self
    }

    /// Append a primary-key column, by comparison name.
    pub fn primary_key(mut self, comparison_name: impl Into<String>) -> Self {
        self.pk_columns.push(comparison_name.into());
        self
    }

    pub fn primary_keys<I, S>(mut self, comparison_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pk_columns
            .extend(comparison_names.into_iter().map(Into::into));
        self
    }

    /// Lower-case string columns on both sides before comparing. Default `false`.
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Treat `(null, null)` as equal on columns without a tolerance. Default `true`.
    pub fn null_equals_null(mut self, null_equals_null: bool) -> Self {
        self.null_equals_null = null_equals_null;
        self
    }

    /// Numeric tolerance for one non-key column, by comparison name.
    pub fn tolerance(mut self, comparison_name: impl Into<String>, tolerance: f64) -> Self {
        self.tolerance.insert(comparison_name.into(), tolerance);
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> CompareResult<ComparisonConfig> {
        let config = ComparisonConfig {
            left_schema: self.left_schema,
            right_schema: self.right_schema,
            mappings: self.mappings,
            pk_columns: self.pk_columns,
            ignore_case: self.ignore_case,
            null_equals_null: self.null_equals_null,
            tolerance: self.tolerance,
        };
        let errors = config.check();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(CompareError::configuration(errors))
        }
    }
}

impl ComparisonConfig {
    /// Start building a configuration over two schemas.
    pub fn builder(left_schema: ComparisonSchema, right_schema: ComparisonSchema) -> ComparisonConfigBuilder {
        ComparisonConfigBuilder {
            left_schema,
            right_schema,
            mappings: Vec::new(),
            pk_columns: Vec::new(),
            ignore_case: false,
            null_equals_null: true,
            tolerance: IndexMap::new(),
        }
    }

    pub fn left_schema(&self) -> &ComparisonSchema {
        &self.left_schema
    }

    pub fn right_schema(&self) -> &ComparisonSchema {
        &self.right_schema
    }

    pub fn schema(&self, side: Side) -> &ComparisonSchema {
        match side {
            Side::Left => &self.left_schema,
            Side::Right => &self.right_schema,
        }
    }

    /// Mappings in declaration order.
    pub fn mappings(&self) -> &[ColumnMapping] {
        &self.mappings
    }

    /// Primary-key comparison names, in key order.
    pub fn pk_columns(&self) -> &[String] {
        &self.pk_columns
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    pub fn null_equals_null(&self) -> bool {
        self.null_equals_null
    }

    pub fn tolerances(&self) -> &IndexMap<String, f64> {
        &self.tolerance
    }

    pub fn tolerance_for(&self, comparison_name: &str) -> Option<f64> {
        self.tolerance.get(comparison_name).copied()
    }

    pub fn is_primary_key(&self, comparison_name: &str) -> bool {
        self.pk_columns.iter().any(|pk| pk == comparison_name)
    }

    pub fn mapping(&self, comparison_name: &str) -> Option<&ColumnMapping> {
        self.mappings
            .iter()
            .find(|m| m.comparison_name == comparison_name)
    }

    /// Key mappings, ordered like [`Self::pk_columns`].
    pub fn pk_mappings(&self) -> impl Iterator<Item = &ColumnMapping> {
        self.pk_columns.iter().filter_map(|pk| self.mapping(pk))
    }

    /// Non-key mappings, in declaration order.
    pub fn compare_mappings(&self) -> impl Iterator<Item = &ColumnMapping> {
        self.mappings
            .iter()
            .filter(|m| !self.is_primary_key(&m.comparison_name))
    }

    /// Dataset-side primary-key column names for `side`, in key order.
    pub fn source_pk_columns(&self, side: Side) -> Vec<&str> {
        self.pk_mappings().map(|m| m.source_name(side)).collect()
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> CompareResult<Self> {
        serde_json::from_str::<ConfigRepr>(json)?.try_into()
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> CompareResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> CompareResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json_path(&self, path: impl AsRef<Path>) -> CompareResult<()> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }

    /// Derive a config from two frames' schemas.
    ///
    /// Columns with the same name on both sides are mapped onto themselves; every column becomes
    /// nullable and takes the frame's actual type. Columns whose type has no [`DataType`]
    /// counterpart are left out of the schemas unless they would need to be mapped.
    pub fn from_frames(left: &LazyFrame, right: &LazyFrame, pk_columns: &[&str]) -> CompareResult<Self> {
        let left_schema = left.clone().collect_schema()?;
        let right_schema = right.clone().collect_schema()?;

        let mut errors = Vec::new();
        let mut left_defs = Vec::new();
        let mut right_defs = Vec::new();
        let mut mappings = Vec::new();

        for (name, dtype) in left_schema.iter() {
            let name = name.as_str();
            let common = right_schema.get(name).is_some();
            match DataType::from_polars(dtype) {
                Some(dt) => {
                    left_defs.push(ColumnDefinition::new(name, name, dt, true));
                    if common {
                        mappings.push(ColumnMapping::new(name, name, name));
                    }
                }
                None if common => {
                    errors.push(format!("column '{name}' has unsupported type {dtype:?}"));
                }
                None => {}
            }
        }
        for (name, dtype) in right_schema.iter() {
            if let Some(dt) = DataType::from_polars(dtype) {
                right_defs.push(ColumnDefinition::new(name.as_str(), name.as_str(), dt, true));
            }
        }
        for pk in pk_columns {
            if left_schema.get(pk).is_none() || right_schema.get(pk).is_none() {
                errors.push(format!("primary key column '{pk}' is not present in both frames"));
            }
        }
        if !errors.is_empty() {
            return Err(CompareError::configuration(errors));
        }

        let pk: Vec<String> = pk_columns.iter().map(|s| s.to_string()).collect();
        Self::builder(
            ComparisonSchema::new(left_defs, pk.clone())?,
            ComparisonSchema::new(right_defs, pk.clone())?,
        )
        .mappings(mappings)
        .primary_keys(pk)
        .build()
    }

    fn check(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.left_schema.is_empty() {
            errors.push("left schema has no columns defined".to_string());
        }
        if self.right_schema.is_empty() {
            errors.push("right schema has no columns defined".to_string());
        }

        if self.pk_columns.is_empty() {
            errors.push("no primary key columns defined".to_string());
        }
        let mut seen_pk = HashSet::new();
        for pk in &self.pk_columns {
            if !seen_pk.insert(pk.as_str()) {
                errors.push(format!("primary key column '{pk}' is listed more than once"));
            }
        }

        let mut seen_names = HashSet::new();
        for m in &self.mappings {
            if !self.left_schema.contains(&m.left_name) {
                errors.push(format!("left schema missing mapped column '{}'", m.left_name));
            }
            if !self.right_schema.contains(&m.right_name) {
                errors.push(format!("right schema missing mapped column '{}'", m.right_name));
            }
            if !seen_names.insert(m.comparison_name.as_str()) {
                errors.push(format!(
                    "comparison name '{}' is used by more than one mapping",
                    m.comparison_name
                ));
            }
        }

        for pk in &self.pk_columns {
            match self.mapping(pk) {
                None => errors.push(format!("primary key column '{pk}' not found in column mappings")),
                Some(m) => {
                    let left = self.left_schema.column(&m.left_name);
                    let right = self.right_schema.column(&m.right_name);
                    if let (Some(l), Some(r)) = (left, right) {
                        if l.datatype() != r.datatype() {
                            errors.push(format!(
                                "primary key column '{pk}' has type {} on the left but {} on the right",
                                l.datatype(),
                                r.datatype()
                            ));
                        }
                    }
                }
            }
        }

        for (name, &tolerance) in &self.tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                errors.push(format!(
                    "tolerance for '{name}' must be a finite, non-negative number (got {tolerance})"
                ));
            }
            if self.is_primary_key(name) {
                errors.push(format!("tolerance configured for primary key column '{name}'"));
                continue;
            }
            let Some(m) = self.mapping(name) else {
                errors.push(format!("tolerance configured for unknown column '{name}'"));
                continue;
            };
            for side in [Side::Left, Side::Right] {
                let Some(def) = self.schema(side).column(m.source_name(side)) else {
                    continue;
                };
                if !def.datatype().is_numeric() {
                    errors.push(format!(
                        "tolerance column '{name}' is not numeric on the {side} side ({})",
                        def.datatype()
                    ));
                }
            }
        }

        errors
    }
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize)]
struct ConfigRepr {
    left_schema: ComparisonSchema,
    right_schema: ComparisonSchema,
    #[serde(alias = "column_mappings")]
    mappings: Vec<ColumnMapping>,
    #[serde(alias = "primary_key_columns")]
    pk_columns: Vec<String>,
    #[serde(default)]
    ignore_case: bool,
    #[serde(default = "default_true")]
    null_equals_null: bool,
    #[serde(default)]
    tolerance: IndexMap<String, f64>,
}

impl TryFrom<ConfigRepr> for ComparisonConfig {
    type Error = CompareError;

    fn try_from(repr: ConfigRepr) -> Result<Self, Self::Error> {
        let mut builder = ComparisonConfig::builder(repr.left_schema, repr.right_schema)
            .mappings(repr.mappings)
            .primary_keys(repr.pk_columns)
            .ignore_case(repr.ignore_case)
            .null_equals_null(repr.null_equals_null);
        for (name, tolerance) in repr.tolerance {
            builder = builder.tolerance(name, tolerance);
        }
        builder.build()
    }
}

impl From<ComparisonConfig> for ConfigRepr {
    fn from(c: ComparisonConfig) -> Self {
        Self {
            left_schema: c.left_schema,
            right_schema: c.right_schema,
            mappings: c.mappings,
            pk_columns: c.pk_columns,
            ignore_case: c.ignore_case,
            null_equals_null: c.null_equals_null,
            tolerance: c.tolerance,
        }
    }
}
