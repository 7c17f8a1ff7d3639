use crate::{Job, JobId, ProgressSnapshot, TrackPhase};

/// Read-only row handed to views and subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobView {
    pub job: Job,
    pub progress: Option<ProgressSnapshot>,
    /// `None` when the engine is not tracking the job.
    pub phase: Option<TrackPhase>,
    pub consecutive_failures: u32,
}

impl JobView {
    pub fn job_id(&self) -> JobId {
        self.job.id
    }

    pub fn percent(&self) -> Option<u8> {
        self.progress.as_ref().and_then(|progress| progress.percent)
    }

    pub fn step(&self) -> Option<&str> {
        self.progress.as_ref().map(|progress| progress.step.as_str())
    }
}

/// Event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Updated(JobView),
    Removed(JobId),
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Updated(view) => view.job_id(),
            JobEvent::Removed(job_id) => *job_id,
        }
    }
}
