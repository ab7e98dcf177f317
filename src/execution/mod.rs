//! Bounded parallel execution for the ingestion pipeline.
//!
//! Work runs on a rayon thread pool. Every unit of work (loading one source file, mapping one
//! record) first takes a slot from a single shared [`WorkSlots`] bound, so file-level and
//! record-level work compete for the same slots and total concurrency never exceeds
//! [`ExecutionOptions::max_in_flight`].

mod metrics;
mod semaphore;

use std::sync::Arc;
use std::time::Duration;

use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;

use crate::error::IngestionResult;

pub use metrics::{ExecutionMetrics, ExecutionMetricsSnapshot};
pub use semaphore::{Semaphore, SemaphorePermit};

/// Configuration for pipeline execution.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
    /// Upper bound on concurrently executing work units, shared by file loads and record mappings.
    pub max_in_flight: usize,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        let n = available_parallelism();
        Self {
            num_threads: Some(n),
            max_in_flight: n,
        }
    }
}

impl ExecutionOptions {
    /// Build the worker pool described by these options.
    ///
    /// # Panics
    ///
    /// Panics if `max_in_flight == 0` or `num_threads == Some(0)`.
    pub fn build_pool(&self) -> IngestionResult<ThreadPool> {
        assert!(self.max_in_flight > 0, "max_in_flight must be > 0");
        if let Some(n) = self.num_threads {
            assert!(n > 0, "num_threads must be > 0 when set");
        }

        let n_threads = self.num_threads.unwrap_or_else(available_parallelism).max(1);
        Ok(ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("rule-ingest-{i}"))
            .build()?)
    }
}

fn available_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// The shared bound on concurrently executing work units.
pub struct WorkSlots {
    sem: Semaphore,
    metrics: Arc<ExecutionMetrics>,
}

impl WorkSlots {
    pub fn new(bound: usize, metrics: Arc<ExecutionMetrics>) -> Self {
        Self {
            sem: Semaphore::new(bound),
            metrics,
        }
    }

    /// Block until a slot is free. The slot is returned when the [`Slot`] is dropped.
    pub fn acquire(&self) -> Slot<'_> {
        let permit = self.sem.acquire();
        let waited = permit.waited();
        if waited > Duration::ZERO {
            self.metrics.on_throttle_wait(waited);
        }
        self.metrics.on_unit_start();
        Slot {
            _permit: permit,
            metrics: &self.metrics,
        }
    }
}

/// One held work slot.
pub struct Slot<'a> {
    _permit: SemaphorePermit<'a>,
    metrics: &'a ExecutionMetrics,
}

impl Drop for Slot<'_> {
    // Runs before the permit field is dropped, so the active count never exceeds the bound.
    fn drop(&mut self) {
        self.metrics.on_unit_end();
    }
}
