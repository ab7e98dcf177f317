use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rule_ingest::IngestionError;
use rule_ingest::execution::ExecutionOptions;
use rule_ingest::ingestion::{
    IngestionContext, IngestionObserver, IngestionSeverity, IngestionStage, IngestionStats,
};
use rule_ingest::pipeline::{IngestionPipeline, PipelineOptions};
use rule_ingest::types::RuleDocument;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<(IngestionStage, usize)>>,
    failures: Mutex<Vec<(IngestionStage, IngestionSeverity)>>,
    alerts: Mutex<Vec<IngestionSeverity>>,
}

impl IngestionObserver for RecordingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        self.successes.lock().unwrap().push((ctx.stage, stats.records));
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.failures.lock().unwrap().push((ctx.stage, severity));
    }

    fn on_alert(&self, _ctx: &IngestionContext, severity: IngestionSeverity, _error: &IngestionError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

fn pipeline_with(obs: Arc<RecordingObserver>, alert_at_or_above: IngestionSeverity) -> IngestionPipeline {
    IngestionPipeline::new(PipelineOptions {
        execution: ExecutionOptions {
            num_threads: Some(2),
            max_in_flight: 2,
        },
        observer: Some(obs),
        alert_at_or_above,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn missing_input_is_critical_and_alerts() {
    let obs = Arc::new(RecordingObserver::default());
    let out = pipeline_with(obs.clone(), IngestionSeverity::Critical).process(
        &["tests/fixtures/does_not_exist"],
        &RuleDocument::default_rules(),
    );

    assert_eq!(out.failed_sources, 1);
    assert_eq!(
        obs.failures.lock().unwrap().clone(),
        vec![(IngestionStage::Enumerate, IngestionSeverity::Critical)]
    );
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Critical]);
}

#[test]
fn dropped_records_are_warnings_without_alert() {
    let obs = Arc::new(RecordingObserver::default());
    pipeline_with(obs.clone(), IngestionSeverity::Critical).process(
        &["tests/fixtures/input/users_array.json"],
        &RuleDocument::default_rules(),
    );

    assert_eq!(
        obs.successes.lock().unwrap().clone(),
        vec![(IngestionStage::Load, 3)]
    );
    assert_eq!(
        obs.failures.lock().unwrap().clone(),
        vec![(IngestionStage::Map, IngestionSeverity::Warning)]
    );
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn unparseable_source_is_an_error_and_alerts_at_error_threshold() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let bad: PathBuf = std::env::temp_dir().join(format!("rule-ingest-bad-{nanos}.json"));
    fs::write(&bad, "42").unwrap();

    let obs = Arc::new(RecordingObserver::default());
    pipeline_with(obs.clone(), IngestionSeverity::Error).process(&[&bad], &RuleDocument::default_rules());

    assert_eq!(
        obs.failures.lock().unwrap().clone(),
        vec![(IngestionStage::Load, IngestionSeverity::Error)]
    );
    assert_eq!(obs.alerts.lock().unwrap().clone(), vec![IngestionSeverity::Error]);
    fs::remove_file(&bad).unwrap();
}

#[test]
fn unreadable_rules_are_reported_before_failing() {
    let obs = Arc::new(RecordingObserver::default());
    let pipeline = pipeline_with(obs.clone(), IngestionSeverity::Critical);
    let err = pipeline
        .load_rules(Some(std::path::Path::new("tests/fixtures/missing_rules.json")))
        .unwrap_err();

    assert!(matches!(err, IngestionError::Io(_)));
    assert_eq!(
        obs.failures.lock().unwrap().clone(),
        vec![(IngestionStage::Rules, IngestionSeverity::Critical)]
    );
}
