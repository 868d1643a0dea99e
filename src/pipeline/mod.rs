//! The comparison pipeline.
//!
//! [`compare`] composes the stages in a fixed order:
//!
//! 1. schema validation (left, then right)
//! 2. primary-key uniqueness (left, then right)
//! 3. canonicalization
//! 4. diff
//! 5. summary
//!
//! Any failure aborts the run. Observers get an event per stage and an alert for failures at or
//! above [`CompareOptions::alert_at_or_above`]; a [`CancellationToken`] is checked before each
//! stage.

mod observer;
mod results;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use polars::prelude::LazyFrame;

use crate::config::ComparisonConfig;
use crate::diff::{left_only, right_only, value_differences};
use crate::error::{CompareError, CompareResult, StageContext};
use crate::prepare::canonicalize;
use crate::summary::summarize;
use crate::types::Side;
use crate::validation::{SchemaFailure, validate_primary_key_uniqueness, validate_schema};

pub use observer::{
    ComparisonEvent, ComparisonObserver, CompositeObserver, FileObserver, Severity, StdErrObserver,
};
pub use results::{ComparisonResults, Partition, PartitionKind};

/// A pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    SchemaValidation,
    PrimaryKeyValidation,
    Canonicalize,
    Diff,
    Summarize,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Self::SchemaValidation,
        Self::PrimaryKeyValidation,
        Self::Canonicalize,
        Self::Diff,
        Self::Summarize,
    ];

    /// State reached once this stage completes.
    pub fn completes(self) -> PipelineState {
        match self {
            Self::SchemaValidation => PipelineState::SchemaValidated,
            Self::PrimaryKeyValidation => PipelineState::PkValidated,
            Self::Canonicalize => PipelineState::Canonicalized,
            Self::Diff => PipelineState::Diffed,
            Self::Summarize => PipelineState::Summarized,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SchemaValidation => "schema validation",
            Self::PrimaryKeyValidation => "primary key validation",
            Self::Canonicalize => "canonicalization",
            Self::Diff => "diff",
            Self::Summarize => "summary",
        })
    }
}

/// Progress of one run. Advances strictly in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Unvalidated,
    SchemaValidated,
    PkValidated,
    Canonicalized,
    Diffed,
    Summarized,
}

/// Cooperative cancellation flag shared between a caller and one or more runs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Options for [`compare_with_options`].
#[derive(Clone)]
pub struct CompareOptions {
    /// Receives stage events and alerts.
    pub observer: Option<Arc<dyn ComparisonObserver>>,
    /// Checked before every stage.
    pub cancellation: CancellationToken,
    /// Failures at or above this severity are forwarded to [`ComparisonObserver::on_alert`].
    pub alert_at_or_above: Severity,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            observer: None,
            cancellation: CancellationToken::default(),
            alert_at_or_above: Severity::Critical,
        }
    }
}

impl fmt::Debug for CompareOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareOptions")
            .field("observer", &self.observer.is_some())
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl CompareOptions {
    pub fn with_observer(mut self, observer: Arc<dyn ComparisonObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_alert_at_or_above(mut self, severity: Severity) -> Self {
        self.alert_at_or_above = severity;
        self
    }
}

/// Compare `left` and `right` under `config` with default options.
///
/// ```rust
/// use polars::prelude::*;
/// use rust_data_compare::config::{ColumnMapping, ComparisonConfig};
/// use rust_data_compare::types::{ColumnDefinition, ComparisonSchema, DataType};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = |id: &str| {
///     ComparisonSchema::new(
///         vec![
///             ColumnDefinition::new(id, "ID", DataType::Int64, false),
///             ColumnDefinition::new("amount", "Amount", DataType::Float64, true),
///         ],
///         vec![id.to_string()],
///     )
/// };
/// let config = ComparisonConfig::builder(schema("id")?, schema("customer_id")?)
///     .mapping(ColumnMapping::new("id", "customer_id", "id"))
///     .mapping(ColumnMapping::new("amount", "amount", "amount"))
///     .primary_key("id")
///     .build()?;
///
/// let left = df!("id" => [1i64, 2], "amount" => [10.0, 20.0])?.lazy();
/// let right = df!("customer_id" => [2i64, 3], "amount" => [25.0, 30.0])?.lazy();
///
/// let results = rust_data_compare::compare(&config, left, right)?;
/// assert_eq!(results.summary.value_differences_count, 1);
/// assert_eq!(results.summary.left_only_count, 1);
/// assert_eq!(results.summary.right_only_count, 1);
/// assert_eq!(results.summary.matching, 0);
/// # Ok(())
/// # }
/// ```
pub fn compare(config: &ComparisonConfig, left: LazyFrame, right: LazyFrame) -> CompareResult<ComparisonResults> {
    compare_with_options(config, left, right, &CompareOptions::default())
}

/// Compare `left` and `right` under `config`.
pub fn compare_with_options(
    config: &ComparisonConfig,
    left: LazyFrame,
    right: LazyFrame,
    options: &CompareOptions,
) -> CompareResult<ComparisonResults> {
    let started = Instant::now();
    let mut run = Run::new(options);
    run.emit(ComparisonEvent::RunStarted);

    run.stage(Stage::SchemaValidation, || {
        let mut failures = Vec::new();
        for (side, frame) in [(Side::Left, &left), (Side::Right, &right)] {
            let errors = validate_schema(frame, config.schema(side)).in_stage(Stage::SchemaValidation)?;
            if !errors.is_empty() {
                failures.push(SchemaFailure { side, errors });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CompareError::SchemaValidation { failures })
        }
    })?;

    run.stage(Stage::PrimaryKeyValidation, || {
        for (side, frame) in [(Side::Left, &left), (Side::Right, &right)] {
            validate_primary_key_uniqueness(frame, &config.source_pk_columns(side), side)?;
        }
        Ok(())
    })?;

    let (left, right) = run.stage(Stage::Canonicalize, || {
        Ok((
            canonicalize(left, config, Side::Left)?,
            canonicalize(right, config, Side::Right)?,
        ))
    })?;

    let (diffs, left_rows, right_rows) = run.stage(Stage::Diff, || {
        Ok((
            value_differences(&left, &right, config),
            left_only(&left, &right, config),
            right_only(&left, &right, config),
        ))
    })?;

    let summary = run.stage(Stage::Summarize, || {
        summarize(left.frame(), right.frame(), &diffs, &left_rows, &right_rows)
    })?;

    if !summary.is_consistent() {
        run.emit(ComparisonEvent::SummaryInconsistent {
            matching: summary.matching,
        });
    }
    run.emit(ComparisonEvent::RunFinished {
        elapsed: started.elapsed(),
        summary: summary.clone(),
    });

    Ok(ComparisonResults {
        value_differences: Partition::new(
            PartitionKind::ValueDifferences,
            diffs,
            summary.value_differences_count,
        ),
        left_only: Partition::new(PartitionKind::LeftOnly, left_rows, summary.left_only_count),
        right_only: Partition::new(PartitionKind::RightOnly, right_rows, summary.right_only_count),
        summary,
        config: config.clone(),
    })
}

struct Run<'a> {
    options: &'a CompareOptions,
    state: PipelineState,
}

impl<'a> Run<'a> {
    fn new(options: &'a CompareOptions) -> Self {
        Self {
            options,
            state: PipelineState::Unvalidated,
        }
    }

    fn stage<T>(&mut self, stage: Stage, f: impl FnOnce() -> CompareResult<T>) -> CompareResult<T> {
        if self.options.cancellation.is_cancelled() {
            let err = CompareError::Cancelled { stage };
            self.fail(stage, &err);
            return Err(err);
        }

        self.emit(ComparisonEvent::StageStarted { stage });
        let started = Instant::now();
        match f() {
            Ok(out) => {
                debug_assert!(stage.completes() > self.state);
                self.state = stage.completes();
                self.emit(ComparisonEvent::StageFinished {
                    stage,
                    elapsed: started.elapsed(),
                });
                Ok(out)
            }
            Err(err) => {
                self.fail(stage, &err);
                Err(err)
            }
        }
    }

    fn fail(&self, stage: Stage, err: &CompareError) {
        let severity = err.severity();
        self.emit(ComparisonEvent::StageFailed {
            stage,
            severity,
            message: err.to_string(),
        });
        if severity >= self.options.alert_at_or_above {
            if let Some(obs) = &self.options.observer {
                obs.on_alert(stage, severity, err);
            }
        }
    }

    fn emit(&self, event: ComparisonEvent) {
        if let Some(obs) = &self.options.observer {
            obs.on_event(&event);
        }
    }
}
