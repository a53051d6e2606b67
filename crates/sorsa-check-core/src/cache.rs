//! Short-lived report cache (DashMap), keyed by handle.
//!
//! Only successful renders are stored. Expired entries are removed lazily by [`ReportCache::sweep`],
//! which the dispatcher runs after every job once the map grows past the sweep threshold.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::handle::Handle;
use crate::report::Report;

#[derive(Debug, Clone)]
struct CacheEntry {
    report: Report,
    created_at: Instant,
}

/// Handle -> rendered report with a fixed time-to-live. Last write wins.
#[derive(Debug)]
pub struct ReportCache {
    entries: DashMap<Handle, CacheEntry>,
    ttl: Duration,
    sweep_threshold: usize,
}

impl ReportCache {
    pub fn new(ttl: Duration, sweep_threshold: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            sweep_threshold,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached report for `handle` if it is younger than the TTL.
    pub fn get(&self, handle: &Handle) -> Option<Report> {
        self.get_at(handle, Instant::now())
    }

    pub fn get_at(&self, handle: &Handle, now: Instant) -> Option<Report> {
        let entry = self.entries.get(handle)?;
        if now.saturating_duration_since(entry.created_at) < self.ttl {
            Some(entry.report.clone())
        } else {
            None
        }
    }

    /// Insert or overwrite the entry for `handle`, stamped now.
    pub fn insert(&self, handle: Handle, report: Report) {
        self.insert_at(handle, report, Instant::now());
    }

    pub fn insert_at(&self, handle: Handle, report: Report, now: Instant) {
        self.entries.insert(
            handle,
            CacheEntry {
                report,
                created_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Post-job maintenance: once the map holds more than the threshold, drop every
    /// entry older than the TTL. Returns the number of entries removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        if self.entries.len() <= self.sweep_threshold {
            return 0;
        }
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.created_at) <= self.ttl);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "[Cache] Swept expired reports");
        }
        removed
    }
}
