//! Join-based partitioning of two canonical relations.
//!
//! All three functions only build deferred plans; nothing is executed until a partition is
//! counted or collected.

use polars::prelude::{
    DataType as PlDataType, Expr, JoinArgs, JoinType, LazyFrame, col, lit,
};

use crate::config::ComparisonConfig;
use crate::prepare::{CanonicalColumn, CanonicalRelation, Role, pk_columns};

/// Marker joined in from the opposite side when there are no non-key columns to inspect.
/// Canonical names always carry a role prefix, so this cannot clash with one of them.
const MATCH_MARKER: &str = "__matched";

/// Rows whose key exists on both sides and whose values differ in at least one mapped column.
///
/// Output columns: the key columns, then an `L_<name>`, `R_<name>` pair per non-key mapping in
/// declaration order. With no non-key mappings the result is empty.
pub fn value_differences(left: &CanonicalRelation, right: &CanonicalRelation, config: &ComparisonConfig) -> LazyFrame {
    let keys = key_exprs(config);
    let joined = left.frame().clone().join(
        right.frame().clone(),
        keys.clone(),
        keys.clone(),
        JoinArgs::new(JoinType::Inner),
    );

    let mut output = keys;
    let mut predicates = Vec::new();
    for mapping in config.compare_mappings() {
        let name = mapping.comparison_name.as_str();
        let l = CanonicalColumn::new(Role::Left, name).expr();
        let r = CanonicalColumn::new(Role::Right, name).expr();
        predicates.push(differs(
            l.clone(),
            r.clone(),
            config.tolerance_for(name),
            config.null_equals_null(),
        ));
        output.push(l);
        output.push(r);
    }

    match predicates.into_iter().reduce(|acc, p| acc.or(p)) {
        Some(any_differs) => joined.filter(any_differs).select(output),
        None => joined.select(output).limit(0),
    }
}

/// Rows of `left` with no key match in `right`.
///
/// Output columns: the key columns, then the left-tagged columns.
pub fn left_only(left: &CanonicalRelation, right: &CanonicalRelation, config: &ComparisonConfig) -> LazyFrame {
    one_sided(left, right, config)
}

/// Rows of `right` with no key match in `left`.
///
/// Output columns: the key columns, then the right-tagged columns.
pub fn right_only(left: &CanonicalRelation, right: &CanonicalRelation, config: &ComparisonConfig) -> LazyFrame {
    one_sided(right, left, config)
}

/// Left join `kept` with `other` and keep rows where every non-key column of `other` is null.
///
/// A matched row whose opposite values are all null is therefore reported as one-sided too.
fn one_sided(kept: &CanonicalRelation, other: &CanonicalRelation, config: &ComparisonConfig) -> LazyFrame {
    let keys = key_exprs(config);
    let mut output = keys.clone();
    output.extend(kept.value_columns().map(CanonicalColumn::expr));

    let other_values: Vec<Expr> = other.value_columns().map(CanonicalColumn::expr).collect();
    let left_join = JoinArgs::new(JoinType::Left);

    match other_values
        .into_iter()
        .map(|c| c.is_null())
        .reduce(|acc, p| acc.and(p))
    {
        Some(all_null) => kept
            .frame()
            .clone()
            .join(other.frame().clone(), keys.clone(), keys, left_join)
            .filter(all_null)
            .select(output),
        None => {
            let matched = other
                .frame()
                .clone()
                .select(keys.clone())
                .with_column(lit(true).alias(MATCH_MARKER));
            kept.frame()
                .clone()
                .join(matched, keys.clone(), keys, left_join)
                .filter(col(MATCH_MARKER).is_null())
                .select(output)
        }
    }
}

fn key_exprs(config: &ComparisonConfig) -> Vec<Expr> {
    pk_columns(config).iter().map(CanonicalColumn::expr).collect()
}

/// Per-column difference predicate. Never yields null.
fn differs(l: Expr, r: Expr, tolerance: Option<f64>, null_equals_null: bool) -> Expr {
    match tolerance {
        Some(t) => {
            // A null on either side leaves the delta null, which never exceeds the tolerance.
            let delta = (l.cast(PlDataType::Float64) - r.cast(PlDataType::Float64)).abs();
            delta.gt(lit(t)).fill_null(lit(false))
        }
        None if null_equals_null => l.eq_missing(r).not(),
        None => l.neq(r).fill_null(lit(true)),
    }
}
