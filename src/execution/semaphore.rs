use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A small, blocking counting semaphore.
///
/// Permits are returned when the [`SemaphorePermit`] is dropped.
pub struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        assert!(permits > 0, "permits must be > 0");
        Self {
            permits: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Acquire one permit, blocking until available.
    pub fn acquire(&self) -> SemaphorePermit<'_> {
        let start = Instant::now();
        let mut waited = false;
        let mut g = self.permits.lock().expect("semaphore mutex poisoned");
        while *g == 0 {
            waited = true;
            g = self.cv.wait(g).expect("semaphore mutex poisoned");
        }
        *g -= 1;
        SemaphorePermit {
            sem: self,
            waited: if waited { start.elapsed() } else { Duration::ZERO },
        }
    }

    /// Currently free permits.
    pub fn available(&self) -> usize {
        *self.permits.lock().expect("semaphore mutex poisoned")
    }

    fn release(&self) {
        let mut g = self.permits.lock().expect("semaphore mutex poisoned");
        *g += 1;
        self.cv.notify_one();
    }
}

/// One held permit.
pub struct SemaphorePermit<'a> {
    sem: &'a Semaphore,
    waited: Duration,
}

impl SemaphorePermit<'_> {
    /// Time spent waiting for this permit (zero if no wait was required).
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}
