use std::fmt;
use std::path::Path;

use polars::prelude::{DataFrame, IdxSize, LazyFrame};
use serde::{Deserialize, Serialize};

use crate::config::ComparisonConfig;
use crate::error::CompareResult;
use crate::export::{ExportFormat, ExportedFiles, export_results};
use crate::report::ComparisonReport;
use crate::summary::Summary;

/// Which of the three result partitions a [`Partition`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKind {
    ValueDifferences,
    LeftOnly,
    RightOnly,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 3] = [Self::ValueDifferences, Self::LeftOnly, Self::RightOnly];

    /// File stem used when the partition is exported.
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::ValueDifferences => "value_differences",
            Self::LeftOnly => "left_only_records",
            Self::RightOnly => "right_only_records",
        }
    }

    /// Human-readable heading used by reports.
    pub fn title(self) -> &'static str {
        match self {
            Self::ValueDifferences => "VALUE DIFFERENCES",
            Self::LeftOnly => "LEFT-ONLY RECORDS",
            Self::RightOnly => "RIGHT-ONLY RECORDS",
        }
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// One result partition: a deferred plan plus its row count from the summary stage.
#[derive(Clone)]
pub struct Partition {
    kind: PartitionKind,
    frame: LazyFrame,
    rows: usize,
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("kind", &self.kind)
            .field("rows", &self.rows)
            .finish()
    }
}

impl Partition {
    pub(crate) fn new(kind: PartitionKind, frame: LazyFrame, rows: usize) -> Self {
        Self { kind, frame, rows }
    }

    pub fn kind(&self) -> PartitionKind {
        self.kind
    }

    /// Row count, as counted when the run was summarized.
    pub fn count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// The underlying deferred plan.
    pub fn lazy(&self) -> LazyFrame {
        self.frame.clone()
    }

    /// Execute the plan and return every row.
    pub fn collect(&self) -> CompareResult<DataFrame> {
        Ok(self.frame.clone().collect()?)
    }

    /// Execute the plan for at most `n` rows.
    pub fn sample(&self, n: usize) -> CompareResult<DataFrame> {
        let n = IdxSize::try_from(n).unwrap_or(IdxSize::MAX);
        Ok(self.frame.clone().limit(n).collect()?)
    }
}

/// Everything one [`crate::compare`] call produces.
#[derive(Debug, Clone)]
pub struct ComparisonResults {
    pub summary: Summary,
    pub value_differences: Partition,
    pub left_only: Partition,
    pub right_only: Partition,
    /// The config the run used.
    pub config: ComparisonConfig,
}

impl ComparisonResults {
    /// The three partitions in report/export order.
    pub fn partitions(&self) -> [&Partition; 3] {
        PartitionKind::ALL.map(|kind| self.partition(kind))
    }

    pub fn partition(&self, kind: PartitionKind) -> &Partition {
        match kind {
            PartitionKind::ValueDifferences => &self.value_differences,
            PartitionKind::LeftOnly => &self.left_only,
            PartitionKind::RightOnly => &self.right_only,
        }
    }

    pub fn report(&self) -> ComparisonReport<'_> {
        ComparisonReport::new(self)
    }

    /// Shorthand for [`export_results`].
    pub fn export(&self, format: ExportFormat, output_dir: impl AsRef<Path>) -> CompareResult<ExportedFiles> {
        export_results(self, format, output_dir)
    }
}
