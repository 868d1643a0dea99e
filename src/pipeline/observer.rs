use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::CompareError;
use crate::summary::Summary;

use super::Stage;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational event.
    Info,
    /// Warning-level event (e.g. cancellation).
    Warning,
    /// Error-level event (configuration or data-quality failure).
    Error,
    /// Critical error (I/O or backend execution failures).
    Critical,
}

/// Events emitted while a comparison runs.
#[derive(Debug, Clone)]
pub enum ComparisonEvent {
    RunStarted,
    StageStarted { stage: Stage },
    StageFinished { stage: Stage, elapsed: Duration },
    StageFailed {
        stage: Stage,
        severity: Severity,
        message: String,
    },
    /// The derived `matching` count came out negative.
    SummaryInconsistent { matching: i64 },
    RunFinished { elapsed: Duration, summary: Summary },
}

/// Observer interface for comparison runs.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait ComparisonObserver: Send + Sync {
    fn on_event(&self, event: &ComparisonEvent);

    /// Called when a stage failure meets the run's alert threshold.
    fn on_alert(&self, _stage: Stage, _severity: Severity, _error: &CompareError) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ComparisonObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn ComparisonObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ComparisonObserver for CompositeObserver {
    fn on_event(&self, event: &ComparisonEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }

    fn on_alert(&self, stage: Stage, severity: Severity, error: &CompareError) {
        for o in &self.observers {
            o.on_alert(stage, severity, error);
        }
    }
}

/// Logs comparison events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ComparisonObserver for StdErrObserver {
    fn on_event(&self, event: &ComparisonEvent) {
        eprintln!("[compare] {}", describe(event));
    }

    fn on_alert(&self, stage: Stage, severity: Severity, error: &CompareError) {
        eprintln!("[ALERT][compare][{severity:?}] stage={stage} err={error}");
    }
}

/// Appends comparison events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ComparisonObserver for FileObserver {
    fn on_event(&self, event: &ComparisonEvent) {
        self.append_line(&format!("{} {}", unix_ts(), describe(event)));
    }

    fn on_alert(&self, stage: Stage, severity: Severity, error: &CompareError) {
        self.append_line(&format!(
            "{} ALERT severity={severity:?} stage={stage} err={error}",
            unix_ts()
        ));
    }
}

fn describe(event: &ComparisonEvent) -> String {
    match event {
        ComparisonEvent::RunStarted => "run started".to_string(),
        ComparisonEvent::StageStarted { stage } => format!("stage={stage} started"),
        ComparisonEvent::StageFinished { stage, elapsed } => {
            format!("stage={stage} finished elapsed={elapsed:?}")
        }
        ComparisonEvent::StageFailed {
            stage,
            severity,
            message,
        } => format!("stage={stage} failed severity={severity:?} err={message}"),
        ComparisonEvent::SummaryInconsistent { matching } => {
            format!("summary inconsistent matching={matching}")
        }
        ComparisonEvent::RunFinished { elapsed, summary } => format!(
            "run finished elapsed={elapsed:?} left={} right={} matching={} diffs={} left_only={} right_only={}",
            summary.total_left,
            summary.total_right,
            summary.matching,
            summary.value_differences_count,
            summary.left_only_count,
            summary.right_only_count
        ),
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::{ComparisonEvent, ComparisonObserver, CompositeObserver, FileObserver, Severity};
    use crate::error::CompareError;
    use crate::pipeline::Stage;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    #[derive(Default)]
    struct Counting {
        events: AtomicUsize,
        alerts: AtomicUsize,
    }

    impl ComparisonObserver for Counting {
        fn on_event(&self, _event: &ComparisonEvent) {
            self.events.fetch_add(1, Ordering::SeqCst);
        }

        fn on_alert(&self, _stage: Stage, _severity: Severity, _error: &CompareError) {
            self.alerts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn composite_fans_out_events_and_alerts() {
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        let composite = CompositeObserver::new(vec![a.clone(), b.clone()]);

        composite.on_event(&ComparisonEvent::RunStarted);
        composite.on_alert(
            Stage::Diff,
            Severity::Warning,
            &CompareError::Cancelled { stage: Stage::Diff },
        );

        for o in [&a, &b] {
            assert_eq!(o.events.load(Ordering::SeqCst), 1);
            assert_eq!(o.alerts.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn file_observer_appends_lines() {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
        let path = std::env::temp_dir().join(format!("rust_data_compare_observer_{nanos}.log"));

        let observer = FileObserver::new(&path);
        observer.on_event(&ComparisonEvent::StageStarted { stage: Stage::Canonicalize });
        observer.on_alert(
            Stage::Canonicalize,
            Severity::Warning,
            &CompareError::Cancelled { stage: Stage::Canonicalize },
        );

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("stage=canonicalization started"));
        assert!(lines[1].contains("ALERT severity=Warning stage=canonicalization"));
        let _ = std::fs::remove_file(&path);
    }
}
