use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rule_ingest::execution::ExecutionOptions;
use rule_ingest::ingestion::{CompositeObserver, FileObserver, IngestionObserver, TracingObserver};
use rule_ingest::pipeline::{IngestionPipeline, PipelineOptions};
use rule_ingest::sink::JsonFileSink;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_OUTPUT_DIR: &str = "data/output";

/// Map JSON user records through a rule document and write users.json and signin.json
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input JSON file or directory of JSON files (repeatable)
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Output directory; when omitted, data/output is created if needed and cleared
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rule file; when omitted, the built-in default mapping is used
    #[arg(short, long)]
    rules: Option<PathBuf>,

    /// Worker threads (defaults to available parallelism)
    #[arg(long)]
    threads: Option<usize>,

    /// Maximum concurrently executing work units (defaults to available parallelism)
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Also append pipeline events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let output = match cli.output {
        Some(dir) => {
            fs::create_dir_all(&dir).with_context(|| format!("creating output directory {}", dir.display()))?;
            dir
        }
        None => {
            info!(dir = DEFAULT_OUTPUT_DIR, "no output directory given, clearing default");
            let dir = PathBuf::from(DEFAULT_OUTPUT_DIR);
            clear_output_directory(&dir)?;
            dir
        }
    };
    if cli.rules.is_none() {
        info!("no rules file given, using built-in default rules");
    }

    let mut observers: Vec<Arc<dyn IngestionObserver>> = vec![Arc::new(TracingObserver)];
    if let Some(log) = &cli.log_file {
        observers.push(Arc::new(FileObserver::new(log)));
    }

    let mut execution = ExecutionOptions::default();
    if let Some(n) = cli.threads {
        execution.num_threads = Some(n);
    }
    if let Some(n) = cli.max_in_flight {
        execution.max_in_flight = n;
    }
    anyhow::ensure!(execution.max_in_flight > 0, "--max-in-flight must be > 0");
    anyhow::ensure!(execution.num_threads != Some(0), "--threads must be > 0");

    let pipeline = IngestionPipeline::new(PipelineOptions {
        execution,
        observer: Some(Arc::new(CompositeObserver::new(observers))),
        ..Default::default()
    })?;

    info!("starting processing");
    let sink = JsonFileSink::new(&output);
    let summary = pipeline
        .run(&cli.input, cli.rules.as_deref(), &sink)
        .context("processing failed")?;

    info!(
        users = summary.users,
        sign_ins = summary.sign_ins,
        dropped_records = summary.dropped_records,
        failed_sources = summary.failed_sources,
        output = %output.display(),
        "processing completed"
    );
    info!("{}", summary.metrics);
    Ok(())
}

fn clear_output_directory(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))?;
    for entry in fs::read_dir(dir).with_context(|| format!("reading output directory {}", dir.display()))? {
        let path = entry?.path();
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.with_context(|| format!("clearing output file {}", path.display()))?;
    }
    Ok(())
}
