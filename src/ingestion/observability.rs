use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::IngestionError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (a record was dropped, the run continues).
    Warning,
    /// Error-level event (a source or save operation failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// Pipeline step an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStage {
    /// Reading and parsing the rule document.
    Rules,
    /// Expanding input paths into source files.
    Enumerate,
    /// Reading and loading records from one source file.
    Load,
    /// Mapping one record.
    Map,
    /// Persisting a result collection.
    Save,
}

/// Context about one pipeline event.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// File or directory involved, when there is one.
    pub path: Option<PathBuf>,
    pub stage: IngestionStage,
    /// Index of the record within its source (map stage only).
    pub record: Option<usize>,
}

impl IngestionContext {
    pub fn new(stage: IngestionStage, path: Option<&Path>) -> Self {
        Self {
            path: path.map(Path::to_path_buf),
            stage,
            record: None,
        }
    }

    pub fn with_record(mut self, index: usize) -> Self {
        self.record = Some(index);
        self
    }

    fn path_display(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// Minimal stats reported on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Records loaded from a source, or written by a save.
    pub records: usize,
}

/// Classify an error for observer callbacks.
pub fn severity_for_error(e: &IngestionError) -> IngestionSeverity {
    match e {
        IngestionError::Io(_) => IngestionSeverity::Critical,
        IngestionError::ThreadPool(_) => IngestionSeverity::Critical,
        IngestionError::NoMatchingFields | IngestionError::MissingUserId { .. } => IngestionSeverity::Warning,
        IngestionError::Json(_)
        | IngestionError::InvalidRules { .. }
        | IngestionError::UnexpectedStructure { .. }
        | IngestionError::Pattern(_) => IngestionSeverity::Error,
    }
}

/// Observer interface for pipeline outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when a source loads or a collection is saved.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when a rule file, source, record or save fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
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

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        tracing::info!(
            stage = ?ctx.stage,
            path = %ctx.path_display(),
            records = stats.records,
            "ok"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        match severity {
            IngestionSeverity::Info => tracing::info!(
                stage = ?ctx.stage, path = %ctx.path_display(), record = ?ctx.record, %error, "failed"
            ),
            IngestionSeverity::Warning => tracing::warn!(
                stage = ?ctx.stage, path = %ctx.path_display(), record = ?ctx.record, %error, "failed"
            ),
            IngestionSeverity::Error | IngestionSeverity::Critical => tracing::error!(
                stage = ?ctx.stage, path = %ctx.path_display(), record = ?ctx.record, ?severity, %error, "failed"
            ),
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            stage = ?ctx.stage,
            path = %ctx.path_display(),
            ?severity,
            %error,
            "ALERT"
        );
    }
}

/// Appends pipeline events to a local log file.
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

impl IngestionObserver for FileObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.append_line(&format!(
            "{} ok stage={:?} path={} records={}",
            unix_ts(),
            ctx.stage,
            ctx.path_display(),
            stats.records
        ));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} fail severity={:?} stage={:?} path={} record={:?} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.path_display(),
            ctx.record,
            error
        ));
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} stage={:?} path={} err={}",
            unix_ts(),
            severity,
            ctx.stage,
            ctx.path_display(),
            error
        ));
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
    use super::{
        FileObserver, IngestionContext, IngestionObserver, IngestionSeverity, IngestionStage,
        IngestionStats, severity_for_error,
    };
    use std::fs;
    use std::path::Path;

    use crate::error::IngestionError;

    #[test]
    fn io_is_critical_and_unmapped_records_are_warnings() {
        let io = IngestionError::Io(std::io::Error::other("boom"));
        assert_eq!(severity_for_error(&io), IngestionSeverity::Critical);
        assert_eq!(
            severity_for_error(&IngestionError::NoMatchingFields),
            IngestionSeverity::Warning
        );
        assert_eq!(
            severity_for_error(&IngestionError::UnexpectedStructure { keys: vec![] }),
            IngestionSeverity::Error
        );
        assert!(IngestionSeverity::Warning < IngestionSeverity::Critical);
    }

    #[test]
    fn file_observer_appends_lines() {
        let log = std::env::temp_dir().join(format!("rule-ingest-observer-{}.log", std::process::id()));
        let _ = fs::remove_file(&log);
        let obs = FileObserver::new(&log);

        let ctx = IngestionContext::new(IngestionStage::Load, Some(Path::new("users.json")));
        obs.on_success(&ctx, IngestionStats { records: 3 });
        obs.on_failure(
            &ctx.clone().with_record(1),
            IngestionSeverity::Warning,
            &IngestionError::NoMatchingFields,
        );

        let text = fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ok stage=Load path=users.json records=3"));
        assert!(lines[1].contains("record=Some(1) err=no matching fields found"));
        fs::remove_file(&log).unwrap();
    }
}
