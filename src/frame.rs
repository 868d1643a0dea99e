//! Small materialization helpers shared by the pipeline stages.

use polars::prelude::{DataFrame, LazyFrame, PolarsError, PolarsResult, len};

const COUNT_COLUMN: &str = "len";

/// Execute `frame` just far enough to count its rows.
pub(crate) fn count_rows(frame: LazyFrame) -> PolarsResult<usize> {
    let df = frame.select([len().alias(COUNT_COLUMN)]).collect()?;
    Ok(scalar_u64(&df, COUNT_COLUMN)? as usize)
}

/// Read the first value of an integer column of a one-row aggregate frame.
pub(crate) fn scalar_u64(df: &DataFrame, column: &str) -> PolarsResult<u64> {
    let value = df.column(column)?.get(0)?;
    value
        .extract::<u64>()
        .ok_or_else(|| PolarsError::ComputeError(format!("expected a non-negative integer in '{column}', got {value}").into()))
}
