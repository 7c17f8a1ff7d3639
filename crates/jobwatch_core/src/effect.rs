use std::time::Duration;

use crate::JobId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartPoller { job_id: JobId, cadence: Duration },
    StopPoller { job_id: JobId },
    /// Fetch the job listing. `listing` numbers requests in issue order.
    FetchJobList { listing: u64 },
    /// One-off fetches outside the timers; issued concurrently.
    FetchJobs { job_ids: Vec<JobId> },
    DeleteRemote { job_id: JobId },
    Notify(Change),
}

/// What subscribers should hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Updated(JobId),
    Removed(JobId),
}
