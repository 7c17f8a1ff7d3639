use std::time::Duration;

use crate::{Job, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A single-job view opened (or `start_tracking` was called). Adds one
    /// view lease.
    ViewActivated { job_id: JobId, cadence: Duration },
    /// A single-job view closed or navigated away. Releases one view lease.
    ViewDeactivated { job_id: JobId },
    /// The dashboard became visible; track every non-terminal job.
    DashboardActivated { cadence: Duration },
    /// The dashboard went away; release every fleet lease.
    DashboardDeactivated,
    /// Re-fetch the job listing without changing dashboard state.
    ListRequested,
    /// A job listing arrived for the request numbered `listing`.
    JobsListed { listing: u64, jobs: Vec<Job> },
    /// A poller tick fetched the job.
    PollSucceeded(Job),
    /// A poller tick failed. Never stops tracking.
    PollFailed { job_id: JobId, reason: String },
    /// The remote service no longer knows the job.
    JobVanished { job_id: JobId },
    /// User asked for an immediate refresh of one job.
    RefreshRequested { job_id: JobId },
    /// Refresh every job with a live poller, outside the timers.
    RefreshTracked,
    /// A one-off refresh fetched the job.
    RefreshCompleted(Job),
    /// User deleted the job.
    DeleteRequested { job_id: JobId },
}
