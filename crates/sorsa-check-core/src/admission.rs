//! Admission control: a ceiling on concurrently open aggregation jobs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Counts open jobs and refuses new ones at the ceiling.
///
/// Cloning shares the counter.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    open: Arc<AtomicUsize>,
    ceiling: usize,
}

/// Proof of admission. Dropping it closes the job, including on early return or panic.
#[derive(Debug)]
#[must_use = "dropping the permit immediately releases the job slot"]
pub struct JobPermit {
    open: Arc<AtomicUsize>,
}

impl AdmissionController {
    pub fn new(ceiling: usize) -> Self {
        Self {
            open: Arc::new(AtomicUsize::new(0)),
            ceiling,
        }
    }

    /// Admit one job, or `None` when `open_jobs() >= ceiling`. A rejection leaves the
    /// counter untouched.
    pub fn try_admit(&self) -> Option<JobPermit> {
        self.open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.ceiling).then_some(n + 1)
            })
            .ok()
            .map(|_| JobPermit {
                open: Arc::clone(&self.open),
            })
    }

    pub fn open_jobs(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }
}

impl Drop for JobPermit {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::AcqRel);
    }
}
