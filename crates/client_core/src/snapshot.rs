use std::collections::VecDeque;

use shared::domain::{Job, JobEvent, QueueStats};

/// Jobs retained from a pull, matching the `limit` the dashboard requests.
pub const JOB_LIST_LIMIT: usize = 20;
/// Ring-buffer capacity of the event log.
pub const EVENT_LOG_CAPACITY: usize = 50;

/// The single source of display truth. Created empty, mutated only through
/// the methods below (and only by the reconciliation loop), discarded at
/// session end. It is a view cache, not a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub stats: QueueStats,
    /// Most-recent-first, exactly as the server returned them. Never
    /// re-sorted client-side.
    pub jobs: Vec<Job>,
    /// Newest first. Oldest entries are evicted once at capacity.
    pub event_log: VecDeque<JobEvent>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            stats: QueueStats::default(),
            jobs: Vec::new(),
            event_log: VecDeque::with_capacity(EVENT_LOG_CAPACITY),
        }
    }

    /// Wholesale replacement; stats are never merged field-by-field.
    pub fn replace_stats(&mut self, stats: QueueStats) {
        self.stats = stats;
    }

    /// Wholesale replacement, truncated to [`JOB_LIST_LIMIT`] with the
    /// server-assigned order preserved.
    pub fn replace_jobs(&mut self, mut jobs: Vec<Job>) {
        jobs.truncate(JOB_LIST_LIMIT);
        self.jobs = jobs;
    }

    /// Prepend an event, evicting the oldest entry once at capacity.
    pub fn push_event(&mut self, event: JobEvent) {
        if self.event_log.len() == EVENT_LOG_CAPACITY {
            self.event_log.pop_back();
        }
        self.event_log.push_front(event);
    }
}
