use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Real-time metrics for one pipeline run.
///
/// The pipeline updates these counters while the run is in progress; callers can snapshot them at
/// any time.
pub struct ExecutionMetrics {
    run_id: AtomicU64,
    elapsed_ns: AtomicU64,

    sources_loaded: AtomicU64,
    sources_failed: AtomicU64,
    records_mapped: AtomicU64,
    records_dropped: AtomicU64,
    units_started: AtomicU64,
    units_finished: AtomicU64,
    throttle_wait_ns: AtomicU64,

    active_units: AtomicUsize,
    max_active_units: AtomicUsize,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            run_id: AtomicU64::new(0),
            elapsed_ns: AtomicU64::new(0),
            sources_loaded: AtomicU64::new(0),
            sources_failed: AtomicU64::new(0),
            records_mapped: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            units_started: AtomicU64::new(0),
            units_finished: AtomicU64::new(0),
            throttle_wait_ns: AtomicU64::new(0),
            active_units: AtomicUsize::new(0),
            max_active_units: AtomicUsize::new(0),
        }
    }

    /// Stamp this block as run `run_id`. Each run owns a fresh block, so counters start at zero.
    pub fn begin_run(&self, run_id: u64) {
        self.run_id.store(run_id, Ordering::SeqCst);
    }

    pub fn end_run(&self, elapsed: Duration) {
        self.elapsed_ns
            .store(elapsed.as_nanos().min(u64::MAX as u128) as u64, Ordering::SeqCst);
    }

    pub fn on_source_loaded(&self) {
        let _ = self.sources_loaded.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_source_failed(&self) {
        let _ = self.sources_failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_record_mapped(&self) {
        let _ = self.records_mapped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_record_dropped(&self) {
        let _ = self.records_dropped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn on_unit_start(&self) {
        let _ = self.units_started.fetch_add(1, Ordering::SeqCst);
        let now = self.active_units.fetch_add(1, Ordering::SeqCst) + 1;
        update_max_usize(&self.max_active_units, now);
    }

    pub fn on_unit_end(&self) {
        let _ = self.units_finished.fetch_add(1, Ordering::SeqCst);
        let _ = self.active_units.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn on_throttle_wait(&self, d: Duration) {
        let add = d.as_nanos().min(u64::MAX as u128) as u64;
        let _ = self.throttle_wait_ns.fetch_add(add, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> ExecutionMetricsSnapshot {
        let elapsed_ns = self.elapsed_ns.load(Ordering::SeqCst);
        let elapsed = if elapsed_ns > 0 {
            Some(Duration::from_nanos(elapsed_ns))
        } else {
            None
        };

        ExecutionMetricsSnapshot {
            run_id: self.run_id.load(Ordering::SeqCst),
            elapsed,
            sources_loaded: self.sources_loaded.load(Ordering::SeqCst),
            sources_failed: self.sources_failed.load(Ordering::SeqCst),
            records_mapped: self.records_mapped.load(Ordering::SeqCst),
            records_dropped: self.records_dropped.load(Ordering::SeqCst),
            units_started: self.units_started.load(Ordering::SeqCst),
            units_finished: self.units_finished.load(Ordering::SeqCst),
            throttle_wait: Duration::from_nanos(self.throttle_wait_ns.load(Ordering::SeqCst)),
            max_active_units: self.max_active_units.load(Ordering::SeqCst),
        }
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn update_max_usize(dst: &AtomicUsize, now: usize) {
    loop {
        let cur = dst.load(Ordering::SeqCst);
        if now <= cur {
            break;
        }
        if dst
            .compare_exchange(cur, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            break;
        }
    }
}

/// Immutable snapshot of [`ExecutionMetrics`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetricsSnapshot {
    pub run_id: u64,
    pub elapsed: Option<Duration>,
    pub sources_loaded: u64,
    pub sources_failed: u64,
    pub records_mapped: u64,
    pub records_dropped: u64,
    /// Work units (file loads plus record mappings) that held a pool slot.
    pub units_started: u64,
    pub units_finished: u64,
    pub throttle_wait: Duration,
    pub max_active_units: usize,
}

impl fmt::Display for ExecutionMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={}, sources={} ok/{} failed, records={} mapped/{} dropped, units={}/{}, max_active_units={}, throttle_wait={:?}, elapsed={:?}",
            self.run_id,
            self.sources_loaded,
            self.sources_failed,
            self.records_mapped,
            self.records_dropped,
            self.units_finished,
            self.units_started,
            self.max_active_units,
            self.throttle_wait,
            self.elapsed
        )
    }
}
