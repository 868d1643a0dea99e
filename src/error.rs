use polars::prelude::PolarsError;
use thiserror::Error;

use crate::pipeline::{Severity, Stage};
use crate::types::Side;
use crate::validation::{SchemaFailure, ValidationError};

/// Convenience result type for comparison operations.
pub type CompareResult<T> = Result<T, CompareError>;

/// Error type returned by configuration, comparison, and the reporting/export helpers.
///
/// The first three variants are data-quality failures: they are raised before any diff work and
/// are never worth retrying. [`CompareError::Execution`] wraps a backend failure together with the
/// pipeline stage that was active.
#[derive(Debug, Error)]
pub enum CompareError {
    /// The [`crate::config::ComparisonConfig`] is internally inconsistent.
    #[error("configuration error: {}", .errors.join("; "))]
    Configuration { errors: Vec<String> },

    /// One or both datasets do not conform to their [`crate::types::ComparisonSchema`].
    ///
    /// Holds one entry per failing side, left first.
    #[error("schema validation failed: {}", join_failures(.failures))]
    SchemaValidation { failures: Vec<SchemaFailure> },

    /// A dataset contains duplicate or null primary-key tuples.
    #[error(
        "invalid primary keys in {side} dataset: {duplicate_groups} duplicated key(s), {null_keys} row(s) with a null key"
    )]
    PrimaryKeyViolation {
        side: Side,
        duplicate_groups: usize,
        null_keys: usize,
    },

    /// The Polars backend failed while a pipeline stage was running.
    #[error("execution failed during {stage}: {source}")]
    Execution {
        stage: Stage,
        #[source]
        source: PolarsError,
    },

    /// The run was cancelled before `stage` started.
    #[error("comparison cancelled before {stage}")]
    Cancelled { stage: Stage },

    /// Polars error outside the comparison pipeline (loading, export, reporting).
    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A file format could not be inferred or is not supported.
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },
}

impl CompareError {
    pub(crate) fn configuration(errors: Vec<String>) -> Self {
        Self::Configuration { errors }
    }

    /// Severity used for observer alerting.
    pub fn severity(&self) -> Severity {
        match self {
            Self::Execution { .. } | Self::Io(_) | Self::Polars(_) => Severity::Critical,
            Self::Cancelled { .. } => Severity::Warning,
            Self::Configuration { .. }
            | Self::SchemaValidation { .. }
            | Self::PrimaryKeyViolation { .. }
            | Self::Json(_)
            | Self::UnsupportedFormat { .. } => Severity::Error,
        }
    }

    /// Schema problems reported for `side`, if this is a schema validation failure on that side.
    pub fn schema_errors(&self, side: Side) -> Option<&[ValidationError]> {
        match self {
            Self::SchemaValidation { failures } => failures
                .iter()
                .find(|f| f.side == side)
                .map(|f| f.errors.as_slice()),
            _ => None,
        }
    }

    /// `true` for the fail-fast data-quality errors raised before any diff work.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::SchemaValidation { .. } | Self::PrimaryKeyViolation { .. }
        )
    }
}

fn join_failures(failures: &[SchemaFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Attach the active pipeline stage to backend errors.
pub(crate) trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> CompareResult<T>;
}

impl<T> StageContext<T> for Result<T, PolarsError> {
    fn in_stage(self, stage: Stage) -> CompareResult<T> {
        self.map_err(|source| CompareError::Execution { stage, source })
    }
}
