use std::collections::BTreeMap;
use std::time::Duration;

use crate::view_model::JobView;
use crate::{JobId, PollRegistry, SnapshotStore};

/// Everything the engine knows: job snapshots, poll handles, and the
/// dashboard's fleet settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerState {
    pub(crate) store: SnapshotStore,
    pub(crate) polls: PollRegistry,
    pub(crate) fleet_cadence: Option<Duration>,
    /// Deleted ids, each with the number of listings requested before the
    /// delete. Cleared once a later listing no longer contains the id.
    pub(crate) deleted: BTreeMap<JobId, u64>,
    pub(crate) listings_requested: u64,
    /// Newest listing applied so far; older ones arriving late are dropped.
    pub(crate) last_listing: u64,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn polls(&self) -> &PollRegistry {
        &self.polls
    }

    pub fn dashboard_active(&self) -> bool {
        self.fleet_cadence.is_some()
    }

    pub fn is_deleted(&self, job_id: JobId) -> bool {
        self.deleted.contains_key(&job_id)
    }

    pub fn tombstone_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn job_view(&self, job_id: JobId) -> Option<JobView> {
        let entry = self.store.get(job_id)?;
        let handle = self.polls.get(job_id);
        Some(JobView {
            job: entry.job.clone(),
            progress: entry.progress.clone(),
            phase: handle.map(|handle| handle.phase),
            consecutive_failures: handle.map_or(0, |handle| handle.consecutive_failures),
        })
    }

    /// Every known job in ascending id order.
    pub fn jobs(&self) -> Vec<JobView> {
        self.store
            .ids()
            .filter_map(|job_id| self.job_view(job_id))
            .collect()
    }

    /// Jobs with a poll handle, live or terminal, that have been observed at
    /// least once.
    pub fn tracked_jobs(&self) -> Vec<JobView> {
        self.polls
            .handles()
            .filter_map(|handle| self.job_view(handle.job_id))
            .collect()
    }
}
