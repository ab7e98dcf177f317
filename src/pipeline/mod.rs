//! The ingestion pipeline: rules → sources → records → mapped users + sign-in entries → sink.
//!
//! A run moves through [`RunPhase`]s. Reading the rule document is the only fatal step; failing
//! sources and unmappable records are reported to the observer and skipped.
//!
//! ```no_run
//! use rule_ingest::pipeline::{IngestionPipeline, PipelineOptions};
//! use rule_ingest::sink::JsonFileSink;
//!
//! # fn main() -> Result<(), rule_ingest::IngestionError> {
//! let pipeline = IngestionPipeline::new(PipelineOptions::default())?;
//! let sink = JsonFileSink::new("data/output");
//! let summary = pipeline.run(&["data/input"], None, &sink)?;
//! println!("users={} sign_ins={}", summary.users, summary.sign_ins);
//! # Ok(())
//! # }
//! ```

mod accumulator;
mod activity;

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rayon::ThreadPool;
use serde_json::Value;

use crate::error::{IngestionError, IngestionResult};
use crate::execution::{ExecutionMetrics, ExecutionMetricsSnapshot, ExecutionOptions, WorkSlots};
use crate::ingestion::{
    IngestionContext, IngestionObserver, IngestionSeverity, IngestionStage, IngestionStats, enumerate_sources,
    load_from_path, severity_for_error,
};
use crate::mapping::map_record;
use crate::sink::ResultSink;
use crate::types::{ID_KEY, Record, RuleDocument, SIGN_IN_ACTIVITY_KEY, SignInEntry};

pub use accumulator::Accumulator;
pub use activity::{SIGN_IN_PAIRS, flatten_sign_in};

/// Options controlling a pipeline run.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct PipelineOptions {
    /// Envelope property unwrapped before record discovery (`{"value": [...]}`).
    pub envelope_property: String,
    /// File extensions picked up when an input path is a directory.
    pub extensions: Vec<String>,
    pub execution: ExecutionOptions,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for PipelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOptions")
            .field("envelope_property", &self.envelope_property)
            .field("extensions", &self.extensions)
            .field("execution", &self.execution)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            envelope_property: "value".to_string(),
            extensions: vec!["json".to_string()],
            execution: ExecutionOptions::default(),
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl PipelineOptions {
    fn report_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        if let Some(obs) = self.observer.as_ref() {
            obs.on_success(ctx, stats);
        }
    }

    fn report_failure(&self, ctx: &IngestionContext, error: &IngestionError) {
        if let Some(obs) = self.observer.as_ref() {
            let sev = severity_for_error(error);
            obs.on_failure(ctx, sev, error);
            if sev >= self.alert_at_or_above {
                obs.on_alert(ctx, sev, error);
            }
        }
    }
}

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Initialized,
    RulesLoaded,
    SourcesEnumerated,
    Processing,
    Aggregated,
    Persisted,
}

/// Collections gathered by [`IngestionPipeline::process`].
///
/// Record order is completion order and differs between runs.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub users: Vec<Record>,
    pub sign_ins: Vec<SignInEntry>,
    /// Source files discovered.
    pub sources: usize,
    /// Input paths or source files that were skipped.
    pub failed_sources: usize,
    /// Records that failed to map.
    pub dropped_records: usize,
    pub metrics: ExecutionMetricsSnapshot,
}

/// Outcome of a persisted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub users: usize,
    pub sign_ins: usize,
    pub sources: usize,
    pub failed_sources: usize,
    pub dropped_records: usize,
    pub metrics: ExecutionMetricsSnapshot,
}

/// Concurrent, rule-driven ingestion of JSON sources.
///
/// A pipeline may be shared between threads; each call to [`IngestionPipeline::process`] counts
/// into its own [`ExecutionMetrics`].
pub struct IngestionPipeline {
    pool: ThreadPool,
    opts: PipelineOptions,
    runs: AtomicU64,
    latest: Mutex<Arc<ExecutionMetrics>>,
}

impl IngestionPipeline {
    /// Create a pipeline and its worker pool.
    ///
    /// # Panics
    ///
    /// Panics if `execution.max_in_flight == 0` or `execution.num_threads == Some(0)`.
    pub fn new(opts: PipelineOptions) -> IngestionResult<Self> {
        let pool = opts.execution.build_pool()?;
        Ok(Self {
            pool,
            opts,
            runs: AtomicU64::new(0),
            latest: Mutex::new(Arc::new(ExecutionMetrics::new())),
        })
    }

    /// Get a handle to the real-time metrics of the most recently started run.
    pub fn metrics(&self) -> Arc<ExecutionMetrics> {
        Arc::clone(&self.latest.lock().expect("metrics mutex poisoned"))
    }

    /// Load the rule document from `path`, or the built-in default rules when `path` is `None`.
    pub fn load_rules(&self, path: Option<&Path>) -> IngestionResult<RuleDocument> {
        let Some(path) = path else {
            return Ok(RuleDocument::default_rules());
        };
        RuleDocument::from_path(path).inspect_err(|e| {
            self.opts
                .report_failure(&IngestionContext::new(IngestionStage::Rules, Some(path)), e);
        })
    }

    /// Load rules, process `inputs`, then save users and sign-in entries through `sink`, in that
    /// order.
    ///
    /// Fails only if the rule document cannot be loaded or a save fails. A failed user save ends
    /// the run before sign-in entries are saved.
    pub fn run<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        rules_path: Option<&Path>,
        sink: &dyn ResultSink,
    ) -> IngestionResult<RunSummary> {
        tracing::debug!(phase = ?RunPhase::Initialized);
        let rules = self.load_rules(rules_path)?;
        tracing::debug!(phase = ?RunPhase::RulesLoaded, rules = rules.len());

        let out = self.process(inputs, &rules);
        tracing::debug!(phase = ?RunPhase::Aggregated, users = out.users.len(), sign_ins = out.sign_ins.len());

        self.save(out.users.len(), || sink.save_users(&out.users))?;
        self.save(out.sign_ins.len(), || sink.save_sign_ins(&out.sign_ins))?;
        tracing::debug!(phase = ?RunPhase::Persisted);

        Ok(RunSummary {
            users: out.users.len(),
            sign_ins: out.sign_ins.len(),
            sources: out.sources,
            failed_sources: out.failed_sources,
            dropped_records: out.dropped_records,
            metrics: out.metrics,
        })
    }

    fn save(&self, records: usize, f: impl FnOnce() -> IngestionResult<()>) -> IngestionResult<()> {
        let ctx = IngestionContext::new(IngestionStage::Save, None);
        match f() {
            Ok(()) => {
                self.opts.report_success(&ctx, IngestionStats { records });
                Ok(())
            }
            Err(e) => {
                self.opts.report_failure(&ctx, &e);
                Err(e)
            }
        }
    }

    /// Map every record of every source under the shared concurrency bound and return the
    /// accumulated collections without persisting them.
    pub fn process<P: AsRef<Path>>(&self, inputs: &[P], rules: &RuleDocument) -> PipelineOutput {
        let start = Instant::now();
        let metrics = Arc::new(ExecutionMetrics::new());
        metrics.begin_run(self.runs.fetch_add(1, Ordering::SeqCst) + 1);
        *self.latest.lock().expect("metrics mutex poisoned") = Arc::clone(&metrics);

        let listing = enumerate_sources(inputs, &self.opts.extensions);
        for (path, e) in &listing.failures {
            self.opts
                .report_failure(&IngestionContext::new(IngestionStage::Enumerate, Some(path)), e);
        }
        tracing::debug!(
            phase = ?RunPhase::SourcesEnumerated,
            files = listing.files.len(),
            skipped = listing.failures.len()
        );

        let work = Work {
            rules,
            opts: &self.opts,
            metrics: &metrics,
            slots: WorkSlots::new(self.opts.execution.max_in_flight, Arc::clone(&metrics)),
            users: Accumulator::new(),
            sign_ins: Accumulator::new(),
        };

        tracing::debug!(phase = ?RunPhase::Processing);
        {
            let work = &work;
            self.pool.scope(|s| {
                for path in &listing.files {
                    s.spawn(move |s| work.process_source(s, path));
                }
            });
        }

        let Work { users, sign_ins, .. } = work;
        metrics.end_run(start.elapsed());
        let metrics = metrics.snapshot();

        PipelineOutput {
            users: users.into_inner(),
            sign_ins: sign_ins.into_inner(),
            sources: listing.files.len(),
            failed_sources: listing.failures.len() + metrics.sources_failed as usize,
            dropped_records: metrics.records_dropped as usize,
            metrics,
        }
    }
}

/// Shared, read-mostly state handed to every worker task.
struct Work<'a> {
    rules: &'a RuleDocument,
    opts: &'a PipelineOptions,
    metrics: &'a ExecutionMetrics,
    slots: WorkSlots,
    users: Accumulator<Record>,
    sign_ins: Accumulator<SignInEntry>,
}

impl Work<'_> {
    fn process_source<'s>(&'s self, scope: &rayon::Scope<'s>, path: &'s Path) {
        let ctx = IngestionContext::new(IngestionStage::Load, Some(path));
        let records = {
            let _slot = self.slots.acquire();
            match load_from_path(path, self.rules, &self.opts.envelope_property) {
                Ok(records) => records,
                Err(e) => {
                    self.metrics.on_source_failed();
                    self.opts.report_failure(&ctx, &e);
                    return;
                }
            }
        };
        self.metrics.on_source_loaded();
        self.opts.report_success(
            &ctx,
            IngestionStats {
                records: records.len(),
            },
        );

        for (index, record) in records.into_iter().enumerate() {
            scope.spawn(move |_| self.process_record(path, index, record));
        }
    }

    fn process_record(&self, path: &Path, index: usize, record: Record) {
        let _slot = self.slots.acquire();

        let mut mapped = match map_record(&record, self.rules) {
            Ok(mapped) => mapped,
            Err(e) => {
                self.metrics.on_record_dropped();
                self.opts.report_failure(
                    &IngestionContext::new(IngestionStage::Map, Some(path)).with_record(index),
                    &e,
                );
                return;
            }
        };

        if let Some(activity) = mapped.remove(SIGN_IN_ACTIVITY_KEY) {
            match mapped.get(ID_KEY).and_then(Value::as_str) {
                Some(id) => {
                    let entries = flatten_sign_in(id, &activity);
                    if !entries.is_empty() {
                        self.sign_ins.extend(entries);
                    }
                }
                None => self.opts.report_failure(
                    &IngestionContext::new(IngestionStage::Map, Some(path)).with_record(index),
                    &IngestionError::MissingUserId {
                        key: ID_KEY.to_string(),
                    },
                ),
            }
        }

        self.users.push(mapped);
        self.metrics.on_record_mapped();
    }
}

#[cfg(test)]
mod tests {
    use super::{IngestionPipeline, PipelineOptions};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde_json::json;

    use crate::execution::ExecutionOptions;
    use crate::types::RuleDocument;

    fn tmp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("rule-ingest-pipeline-{tag}-{nanos}"));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn pipeline(threads: usize, bound: usize) -> IngestionPipeline {
        IngestionPipeline::new(PipelineOptions {
            execution: ExecutionOptions {
                num_threads: Some(threads),
                max_in_flight: bound,
            },
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn sign_in_activity_is_split_out_of_user_records() {
        let dir = tmp_dir("split");
        let input = dir.join("user.json");
        fs::write(
            &input,
            json!({
                "id": "123",
                "mail": "user@example.com",
                "signInActivity": {
                    "lastSignInDateTime": "1995-04-28T13:22:24",
                    "lastSignInRequestId": "0e68"
                }
            })
            .to_string(),
        )
        .unwrap();

        let out = pipeline(2, 2).process(&[&input], &RuleDocument::default_rules());

        assert_eq!(out.users.len(), 1);
        assert!(!out.users[0].contains_key("sign_in_activity"));
        assert_eq!(out.users[0]["id"], json!("123"));
        assert_eq!(out.sign_ins.len(), 1);
        assert_eq!(out.sign_ins[0].user_id, "123");
        assert_eq!(out.sign_ins[0].kind, "lastSignInDateTime");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn sign_in_without_string_id_keeps_the_user_but_no_entries() {
        let dir = tmp_dir("noid");
        let input = dir.join("user.json");
        fs::write(
            &input,
            r#"{"mail":"a@b.c","signInActivity":{"lastSignInDateTime":"t","lastSignInRequestId":"r"}}"#,
        )
        .unwrap();

        let out = pipeline(1, 1).process(&[&input], &RuleDocument::default_rules());
        assert_eq!(out.users.len(), 1);
        assert!(!out.users[0].contains_key("sign_in_activity"));
        assert!(out.sign_ins.is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unmappable_records_and_bad_sources_are_skipped() {
        let dir = tmp_dir("skip");
        fs::write(dir.join("good.json"), r#"[{"id":"1"},{"nothing":"here"}]"#).unwrap();
        fs::write(dir.join("bad.json"), "not json").unwrap();
        let missing = dir.join("missing");

        let out = pipeline(2, 1).process(&[dir.clone(), missing], &RuleDocument::default_rules());
        assert_eq!(out.sources, 2);
        assert_eq!(out.failed_sources, 2);
        assert_eq!(out.users.len(), 1);
        assert_eq!(out.dropped_records, 1);
        assert_eq!(out.metrics.records_mapped, 1);
        fs::remove_dir_all(&dir).unwrap();
    }
}
