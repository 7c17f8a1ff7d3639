use std::collections::BTreeMap;
use std::time::Duration;

use crate::{JobId, JobStatus};

/// Who asked for a job to be tracked. A lease can only be released by the
/// owner that acquired it. Each owner may hold several leases on one job,
/// e.g. a view re-mounting before its previous instance unmounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Owner {
    /// A single-job detail view.
    View,
    /// The dashboard's fleet aggregator.
    Fleet,
}

/// Engine-side phase of a tracked job. `Idle` is represented by the absence
/// of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPhase {
    Tracking,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollHandle {
    pub job_id: JobId,
    pub cadence: Duration,
    pub phase: TrackPhase,
    pub last_status: Option<JobStatus>,
    pub consecutive_failures: u32,
    /// Outstanding leases per owner; an owner with no leases is absent.
    owners: BTreeMap<Owner, u32>,
}

impl PollHandle {
    fn new(job_id: JobId, owner: Owner, cadence: Duration) -> Self {
        Self {
            job_id,
            cadence,
            phase: TrackPhase::Tracking,
            last_status: None,
            consecutive_failures: 0,
            owners: BTreeMap::from([(owner, 1)]),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.phase == TrackPhase::Tracking
    }

    pub fn held_by(&self, owner: Owner) -> bool {
        self.owners.contains_key(&owner)
    }

    /// Number of leases `owner` currently holds on this handle.
    pub fn leases(&self, owner: Owner) -> u32 {
        self.owners.get(&owner).copied().unwrap_or(0)
    }

    pub fn owners(&self) -> impl Iterator<Item = Owner> + '_ {
        self.owners.keys().copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquired {
    /// New handle; a poller must be started.
    Started,
    /// Terminal handle re-activated; a poller must be started again.
    Resumed,
    /// Handle already live; nothing to start.
    AlreadyTracking,
}

impl Acquired {
    pub fn needs_poller(self) -> bool {
        matches!(self, Acquired::Started | Acquired::Resumed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Released {
    /// Last lease dropped. `was_tracking` tells whether a timer must stop.
    Dropped { was_tracking: bool },
    /// Other leases, of this owner or another, still hold the handle.
    StillHeld,
    /// The owner held no lease on this job.
    NotHeld,
}

/// Owned registry of poll handles; at most one per job id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollRegistry {
    handles: BTreeMap<JobId, PollHandle>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a lease for `owner`. Starting an already-tracking job is a no-op
    /// apart from counting the extra lease; the original cadence is kept.
    /// Acquiring a terminal handle is an explicit re-activation.
    pub fn acquire(&mut self, job_id: JobId, owner: Owner, cadence: Duration) -> Acquired {
        match self.handles.get_mut(&job_id) {
            None => {
                self.handles
                    .insert(job_id, PollHandle::new(job_id, owner, cadence));
                Acquired::Started
            }
            Some(handle) => {
                *handle.owners.entry(owner).or_insert(0) += 1;
                match handle.phase {
                    TrackPhase::Tracking => Acquired::AlreadyTracking,
                    TrackPhase::Terminal => {
                        handle.phase = TrackPhase::Tracking;
                        handle.cadence = cadence;
                        Acquired::Resumed
                    }
                }
            }
        }
    }

    pub fn release(&mut self, job_id: JobId, owner: Owner) -> Released {
        let Some(handle) = self.handles.get_mut(&job_id) else {
            return Released::NotHeld;
        };
        let Some(leases) = handle.owners.get_mut(&owner) else {
            return Released::NotHeld;
        };
        *leases -= 1;
        if *leases == 0 {
            handle.owners.remove(&owner);
        }
        if !handle.owners.is_empty() {
            return Released::StillHeld;
        }
        let was_tracking = handle.is_tracking();
        self.handles.remove(&job_id);
        Released::Dropped { was_tracking }
    }

    /// Drop the handle regardless of owners (deletion path).
    /// Returns `true` when a live timer must be stopped.
    pub fn forget(&mut self, job_id: JobId) -> bool {
        self.handles
            .remove(&job_id)
            .is_some_and(|handle| handle.is_tracking())
    }

    /// Record a successful poll. Returns `true` if the job just became
    /// terminal and its timer must stop.
    pub fn record_status(&mut self, job_id: JobId, status: JobStatus) -> bool {
        let Some(handle) = self.handles.get_mut(&job_id) else {
            return false;
        };
        handle.last_status = Some(status);
        handle.consecutive_failures = 0;
        if handle.is_tracking() && status.is_terminal() {
            handle.phase = TrackPhase::Terminal;
            return true;
        }
        false
    }

    /// Record a failed poll and return the new consecutive failure count.
    pub fn record_failure(&mut self, job_id: JobId) -> Option<u32> {
        let handle = self.handles.get_mut(&job_id)?;
        handle.consecutive_failures = handle.consecutive_failures.saturating_add(1);
        Some(handle.consecutive_failures)
    }

    pub fn get(&self, job_id: JobId) -> Option<&PollHandle> {
        self.handles.get(&job_id)
    }

    pub fn is_tracking(&self, job_id: JobId) -> bool {
        self.handles
            .get(&job_id)
            .is_some_and(PollHandle::is_tracking)
    }

    pub fn handles(&self) -> impl Iterator<Item = &PollHandle> {
        self.handles.values()
    }

    pub fn ids_held_by(&self, owner: Owner) -> Vec<JobId> {
        self.handles
            .values()
            .filter(|handle| handle.held_by(owner))
            .map(|handle| handle.job_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
