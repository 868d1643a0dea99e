//! Canonicalization: project each side onto its mapped columns and rename them into the shared
//! comparison namespace.
//!
//! Every canonical column is a [`CanonicalColumn`]: a [`Role`] plus the mapping's comparison name.
//! Key columns get the same name on both sides so the two relations can be joined directly;
//! non-key columns are tagged with their side so both copies can live in one joined row.

use std::fmt;

use polars::prelude::{DataType as PlDataType, Expr, LazyFrame, col};

use crate::config::ComparisonConfig;
use crate::error::{CompareResult, StageContext};
use crate::pipeline::Stage;
use crate::types::Side;

/// Role of a canonical column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    PrimaryKey,
    Left,
    Right,
}

impl Role {
    /// Role of a non-key column coming from `side`.
    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Left => Self::Left,
            Side::Right => Self::Right,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::PrimaryKey => "PK_",
            Self::Left => "L_",
            Self::Right => "R_",
        }
    }
}

/// A column of the canonical namespace.
///
/// The physical column name is derived from the role and comparison name (see [`Self::name`]).
/// Role prefixes are distinct and comparison names are unique within a config, so two canonical
/// columns never share a physical name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalColumn {
    pub role: Role,
    pub comparison_name: String,
}

impl CanonicalColumn {
    pub fn new(role: Role, comparison_name: impl Into<String>) -> Self {
        Self {
            role,
            comparison_name: comparison_name.into(),
        }
    }

    pub fn primary_key(comparison_name: impl Into<String>) -> Self {
        Self::new(Role::PrimaryKey, comparison_name)
    }

    /// Physical column name in the canonical relations and the result partitions.
    pub fn name(&self) -> String {
        format!("{}{}", self.role.prefix(), self.comparison_name)
    }

    pub fn expr(&self) -> Expr {
        col(self.name())
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.role.prefix(), self.comparison_name)
    }
}

/// One side's dataset after canonicalization. Still a deferred plan.
#[derive(Clone)]
pub struct CanonicalRelation {
    frame: LazyFrame,
    columns: Vec<CanonicalColumn>,
}

impl fmt::Debug for CanonicalRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanonicalRelation")
            .field("columns", &self.columns)
            .finish()
    }
}

impl CanonicalRelation {
    pub fn frame(&self) -> &LazyFrame {
        &self.frame
    }

    pub fn into_frame(self) -> LazyFrame {
        self.frame
    }

    /// All canonical columns, key columns first.
    pub fn columns(&self) -> &[CanonicalColumn] {
        &self.columns
    }

    pub fn pk_columns(&self) -> impl Iterator<Item = &CanonicalColumn> {
        self.columns.iter().filter(|c| c.role == Role::PrimaryKey)
    }

    /// Side-tagged (non-key) columns, in mapping declaration order.
    pub fn value_columns(&self) -> impl Iterator<Item = &CanonicalColumn> {
        self.columns.iter().filter(|c| c.role != Role::PrimaryKey)
    }
}

/// Canonical key columns for `config`, in key order.
pub fn pk_columns(config: &ComparisonConfig) -> Vec<CanonicalColumn> {
    config
        .pk_mappings()
        .map(|m| CanonicalColumn::primary_key(m.comparison_name.as_str()))
        .collect()
}

/// Map `dataset` into the canonical namespace for `side`.
///
/// The result holds the key columns (key order) followed by the side's tagged non-key columns
/// (mapping order). Unmapped columns are dropped. With `ignore_case`, every string column is
/// lower-cased after renaming.
pub fn canonicalize(dataset: LazyFrame, config: &ComparisonConfig, side: Side) -> CompareResult<CanonicalRelation> {
    let mut columns = Vec::with_capacity(config.mappings().len());
    let mut projection = Vec::with_capacity(config.mappings().len());

    let mappings = config.pk_mappings().chain(config.compare_mappings());
    for mapping in mappings {
        let canonical = if config.is_primary_key(&mapping.comparison_name) {
            CanonicalColumn::primary_key(mapping.comparison_name.as_str())
        } else {
            CanonicalColumn::new(Role::for_side(side), mapping.comparison_name.as_str())
        };
        projection.push(col(mapping.source_name(side)).alias(canonical.name()));
        columns.push(canonical);
    }

    let mut frame = dataset.select(projection);

    if config.ignore_case() {
        let schema = frame.clone().collect_schema().in_stage(Stage::Canonicalize)?;
        let folds: Vec<Expr> = schema
            .iter()
            .filter(|(_, dtype)| matches!(dtype, PlDataType::String))
            .map(|(name, _)| col(name.clone()).str().to_lowercase())
            .collect();
        if !folds.is_empty() {
            frame = frame.with_columns(folds);
        }
    }

    Ok(CanonicalRelation { frame, columns })
}
