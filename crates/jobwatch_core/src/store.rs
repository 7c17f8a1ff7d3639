use std::collections::BTreeMap;

use crate::progress::{parse_progress, ProgressSnapshot};
use crate::{Job, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub job: Job,
    pub progress: Option<ProgressSnapshot>,
}

/// Result of [`SnapshotStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    /// Status or progress snapshot differs from what was stored.
    Changed,
    /// Nothing a view renders has changed; no notification is due.
    Unchanged,
}

impl UpsertOutcome {
    pub fn should_notify(self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged)
    }
}

/// Single writer for job records and their derived progress.
///
/// Keyed by `BTreeMap` so list views come out in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotStore {
    entries: BTreeMap<JobId, StoreEntry>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the job record and re-derives its progress snapshot.
    ///
    /// The snapshot is only overwritten when the parse result differs, so a
    /// poll returning the same payload is reported as `Unchanged`.
    pub fn upsert(&mut self, job: Job) -> UpsertOutcome {
        match self.entries.get_mut(&job.id) {
            None => {
                let progress = parse_progress(job.status_message.as_deref(), job.status, None);
                self.entries.insert(job.id, StoreEntry { job, progress });
                UpsertOutcome::Inserted
            }
            Some(entry) => {
                let parsed = parse_progress(
                    job.status_message.as_deref(),
                    job.status,
                    entry.progress.as_ref(),
                );
                let status_changed = entry.job.status != job.status;
                let progress_changed = entry.progress != parsed;
                if progress_changed {
                    entry.progress = parsed;
                }
                entry.job = job;
                if status_changed || progress_changed {
                    UpsertOutcome::Changed
                } else {
                    UpsertOutcome::Unchanged
                }
            }
        }
    }

    pub fn remove(&mut self, job_id: JobId) -> Option<StoreEntry> {
        self.entries.remove(&job_id)
    }

    pub fn get(&self, job_id: JobId) -> Option<&StoreEntry> {
        self.entries.get(&job_id)
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.entries.contains_key(&job_id)
    }

    pub fn list(&self) -> impl Iterator<Item = &StoreEntry> {
        self.entries.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = JobId> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
