//! Jobwatch engine: remote job API, per-job pollers and the coordinator task
//! that executes core effects.
mod api;
mod engine;
mod error;
mod observer;
mod poller;
mod settings;

pub use api::{ApiSettings, JobApi, ReqwestJobApi};
pub use engine::{DashboardGuard, TrackerHandle, TrackingGuard};
pub use error::{ApiError, FailureKind, TrackerError};
pub use observer::{JobObserver, SubscriptionId};
pub use settings::TrackerSettings;

pub use jobwatch_core::{Job, JobEvent, JobId, JobStatus, JobView, ProgressSnapshot, TrackPhase};
