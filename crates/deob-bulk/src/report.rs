//! Batch report: one status per processed version, safe to fill concurrently
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use deob_core::JobStatus;

pub const REPORT_HEADER: &str = "version\tstatus";

#[derive(Debug, Default)]
pub struct BatchReport {
    entries: DashMap<String, JobStatus>,
    skipped: AtomicUsize,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `status` under `key`. The first writer wins; returns whether
    /// this call inserted.
    pub fn record(&self, key: impl Into<String>, status: JobStatus) -> bool {
        match self.entries.entry(key.into()) {
            Entry::Occupied(existing) => {
                tracing::warn!(key = %existing.key(), "duplicate report entry ignored");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(status);
                true
            }
        }
    }

    /// Counts a job that never ran because its input could not be resolved
    pub fn skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, key: &str) -> Option<JobStatus> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key
    pub fn rows(&self) -> Vec<(String, JobStatus)> {
        let mut rows: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    pub fn summary(&self) -> Summary {
        let (succeeded, failed) = self.entries.iter().fold((0, 0), |(ok, ko), entry| {
            match entry.value() {
                JobStatus::Success => (ok + 1, ko),
                JobStatus::Failure => (ok, ko + 1),
            }
        });

        Summary {
            succeeded,
            failed,
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// Two-column tab-separated table with a header row
    pub fn render(&self) -> String {
        let mut out = String::from(REPORT_HEADER);
        out.push('\n');
        for (key, status) in self.rows() {
            out.push_str(&format!("{key}\t{status}\n"));
        }
        out
    }

    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.render()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}
