//! Record counts derived from the partitions of one comparison run.

use chrono::{DateTime, Utc};
use polars::prelude::LazyFrame;
use serde::{Deserialize, Serialize};

use crate::error::{CompareResult, StageContext};
use crate::frame::count_rows;
use crate::pipeline::Stage;

/// Aggregate counts of a comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_left: usize,
    pub total_right: usize,
    /// `total_left - left_only_count - value_differences_count`. Negative only when the
    /// one-sided classification reported a matched row as one-sided.
    pub matching: i64,
    pub value_differences_count: usize,
    pub left_only_count: usize,
    pub right_only_count: usize,
    /// UTC wall-clock time at aggregation.
    pub timestamp: DateTime<Utc>,
}

impl Summary {
    /// Build a summary from raw counts, stamping it with the current time.
    pub fn from_counts(
        total_left: usize,
        total_right: usize,
        value_differences_count: usize,
        left_only_count: usize,
        right_only_count: usize,
    ) -> Self {
        let matching = total_left as i64 - left_only_count as i64 - value_differences_count as i64;
        Self {
            total_left,
            total_right,
            matching,
            value_differences_count,
            left_only_count,
            right_only_count,
            timestamp: Utc::now(),
        }
    }

    /// `true` when the counts add up (`matching >= 0`).
    pub fn is_consistent(&self) -> bool {
        self.matching >= 0
    }

    /// `true` when nothing differs and no record is one-sided.
    pub fn is_identical(&self) -> bool {
        self.value_differences_count == 0 && self.left_only_count == 0 && self.right_only_count == 0
    }
}

/// Count the relations and partitions and derive a [`Summary`].
pub fn summarize(
    left: &LazyFrame,
    right: &LazyFrame,
    value_differences: &LazyFrame,
    left_only: &LazyFrame,
    right_only: &LazyFrame,
) -> CompareResult<Summary> {
    let count = |frame: &LazyFrame| count_rows(frame.clone()).in_stage(Stage::Summarize);
    Ok(Summary::from_counts(
        count(left)?,
        count(right)?,
        count(value_differences)?,
        count(left_only)?,
        count(right_only)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::{Summary, summarize};
    use polars::prelude::*;

    #[test]
    fn matching_is_derived_from_left_counts() {
        let s = Summary::from_counts(10, 12, 2, 3, 5);
        assert_eq!(s.matching, 5);
        assert!(s.is_consistent());
        assert!(!s.is_identical());
    }

    #[test]
    fn matching_may_go_negative() {
        let s = Summary::from_counts(1, 1, 1, 1, 0);
        assert_eq!(s.matching, -1);
        assert!(!s.is_consistent());
    }

    #[test]
    fn summarize_counts_each_frame() {
        let three = df!("a" => [1i64, 2, 3]).unwrap().lazy();
        let two = df!("a" => [1i64, 2]).unwrap().lazy();
        let one = df!("a" => [1i64]).unwrap().lazy();
        let none = one.clone().limit(0);

        let s = summarize(&three, &two, &one, &one, &none).unwrap();
        assert_eq!(s.total_left, 3);
        assert_eq!(s.total_right, 2);
        assert_eq!(s.value_differences_count, 1);
        assert_eq!(s.left_only_count, 1);
        assert_eq!(s.right_only_count, 0);
        assert_eq!(s.matching, 1);
    }

    #[test]
    fn serializes_with_rfc3339_timestamp() {
        let s = Summary::from_counts(1, 1, 0, 0, 0);
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["matching"], 1);
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
        let back: Summary = serde_json::from_value(json).unwrap();
        assert_eq!(back, s);
    }
}
