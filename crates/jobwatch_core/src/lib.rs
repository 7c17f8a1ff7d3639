//! Jobwatch core: progress grammar, snapshot store, poll registry and the pure
//! lifecycle state machine that decides when pollers start and stop.
mod effect;
mod job;
mod msg;
mod progress;
mod registry;
mod state;
mod store;
mod update;
mod view_model;

pub use effect::{Change, Effect};
pub use job::{FileRefs, Job, JobId, JobStatus};
pub use msg::Msg;
pub use progress::{parse_progress, ProgressSnapshot, COMPLETED_STEP, FAILED_STEP};
pub use registry::{Acquired, Owner, PollHandle, PollRegistry, Released, TrackPhase};
pub use state::TrackerState;
pub use store::{SnapshotStore, StoreEntry, UpsertOutcome};
pub use update::update;
pub use view_model::{JobEvent, JobView};
