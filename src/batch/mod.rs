//! Run many independent comparisons against one shared config.
//!
//! A [`BatchComparator`] owns a dedicated rayon pool. Jobs run in parallel, bounded by
//! [`BatchOptions::max_in_flight`], and outcomes come back in input order. Live progress is
//! available through [`BatchComparator::metrics`] and an optional [`BatchObserver`].

mod metrics;
mod throttle;

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use polars::prelude::LazyFrame;
use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::config::ComparisonConfig;
use crate::error::{CompareError, CompareResult};
use crate::pipeline::{CompareOptions, ComparisonResults, compare_with_options};

pub use metrics::{BatchEvent, BatchMetrics, BatchMetricsSnapshot, BatchObserver, StdErrBatchObserver};

use throttle::Throttle;

/// One named pair of inputs.
#[derive(Clone)]
pub struct BatchJob {
    pub name: String,
    pub left: LazyFrame,
    pub right: LazyFrame,
}

impl BatchJob {
    pub fn new(name: impl Into<String>, left: LazyFrame, right: LazyFrame) -> Self {
        Self {
            name: name.into(),
            left,
            right,
        }
    }
}

impl fmt::Debug for BatchJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchJob").field("name", &self.name).finish()
    }
}

/// Result of one [`BatchJob`].
#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub result: CompareResult<ComparisonResults>,
}

/// Configuration for the [`BatchComparator`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Number of worker threads. If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on concurrently running jobs, on top of `num_threads`.
    pub max_in_flight: usize,
    /// Options applied to every job (observer, cancellation, alert threshold).
    pub compare: CompareOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            num_threads: Some(n),
            max_in_flight: n.max(1),
            compare: CompareOptions::default(),
        }
    }
}

pub struct BatchComparator {
    pool: ThreadPool,
    opts: BatchOptions,
    observer: Option<Arc<dyn BatchObserver>>,
    metrics: Arc<BatchMetrics>,
}

impl fmt::Debug for BatchComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchComparator")
            .field("threads", &self.pool.current_num_threads())
            .field("opts", &self.opts)
            .field("observer_set", &self.observer.is_some())
            .finish()
    }
}

impl BatchComparator {
    /// Create a comparator with the given options.
    ///
    /// Fails with [`CompareError::Configuration`] if `max_in_flight == 0`,
    /// `num_threads == Some(0)`, or the thread pool cannot be built.
    pub fn new(opts: BatchOptions) -> CompareResult<Self> {
        let mut errors = Vec::new();
        if opts.max_in_flight == 0 {
            errors.push("max_in_flight must be > 0".to_string());
        }
        if opts.num_threads == Some(0) {
            errors.push("num_threads must be > 0 when set".to_string());
        }
        if !errors.is_empty() {
            return Err(CompareError::configuration(errors));
        }

        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| CompareError::configuration(vec![format!("failed to build thread pool: {e}")]))?;

        Ok(Self {
            pool,
            opts,
            observer: None,
            metrics: Arc::new(BatchMetrics::new()),
        })
    }

    /// Attach an observer for batch events.
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Handle to live metrics of the current (or last) run.
    pub fn metrics(&self) -> Arc<BatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run every job against `config`. Outcomes are returned in input order.
    pub fn run(&self, config: &ComparisonConfig, jobs: Vec<BatchJob>) -> Vec<BatchOutcome> {
        self.pool.install(|| self.run_impl(config, jobs))
    }

    fn run_impl(&self, config: &ComparisonConfig, jobs: Vec<BatchJob>) -> Vec<BatchOutcome> {
        let start = Instant::now();
        self.metrics.begin_run();
        self.emit(BatchEvent::RunStarted { jobs: jobs.len() });

        let throttle = Throttle::new(self.opts.max_in_flight);
        let outcomes: Vec<BatchOutcome> = jobs
            .into_par_iter()
            .map(|job| {
                let (_permit, waited) = throttle.acquire();
                if !waited.is_zero() {
                    self.metrics.on_throttle_wait(waited);
                    self.emit(BatchEvent::ThrottleWaited {
                        job: job.name.clone(),
                        duration: waited,
                    });
                }

                self.metrics.on_job_start();
                self.emit(BatchEvent::JobStarted { job: job.name.clone() });
                let job_start = Instant::now();

                let result = compare_with_options(config, job.left, job.right, &self.opts.compare);

                let succeeded = result.is_ok();
                self.metrics.on_job_end(succeeded);
                self.emit(BatchEvent::JobFinished {
                    job: job.name.clone(),
                    elapsed: job_start.elapsed(),
                    succeeded,
                });
                BatchOutcome { name: job.name, result }
            })
            .collect();

        self.metrics.end_run(start.elapsed());
        self.emit(BatchEvent::RunFinished {
            elapsed: start.elapsed(),
            metrics: self.metrics.snapshot(),
        });
        outcomes
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(obs) = &self.observer {
            obs.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchComparator, BatchOptions};
    use crate::error::CompareError;

    #[test]
    fn rejects_zero_limits() {
        let err = BatchComparator::new(BatchOptions {
            num_threads: Some(0),
            max_in_flight: 0,
            ..BatchOptions::default()
        })
        .unwrap_err();
        match err {
            CompareError::Configuration { errors } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_batch_finishes_immediately() {
        let comparator = BatchComparator::new(BatchOptions::default()).unwrap();
        let config = crate::config::tests::sample_config();
        assert!(comparator.run(&config, Vec::new()).is_empty());
        let snapshot = comparator.metrics().snapshot();
        assert_eq!(snapshot.run_id, 1);
        assert_eq!(snapshot.jobs_started, 0);
    }
}
