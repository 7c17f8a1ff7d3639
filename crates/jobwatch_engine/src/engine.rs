use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::stream::{FuturesUnordered, StreamExt};
use jobwatch_core::{
    update, Change, Effect, JobEvent, JobId, JobView, Msg, TrackerState,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::observer::{JobObserver, SubscriptionId, Subscribers};
use crate::poller::{poll_once, run_poller};
use crate::{JobApi, TrackerError, TrackerSettings};

enum Command {
    Apply(Msg),
    Subscribe {
        id: SubscriptionId,
        job_id: Option<JobId>,
        observer: Arc<dyn JobObserver>,
    },
    Unsubscribe(SubscriptionId),
    Query(Query),
    Shutdown,
}

enum Query {
    Job {
        job_id: JobId,
        reply: oneshot::Sender<Option<JobView>>,
    },
    Jobs(oneshot::Sender<Vec<JobView>>),
    TrackedJobs(oneshot::Sender<Vec<JobView>>),
    ActivePollers(oneshot::Sender<Vec<JobId>>),
}

/// Cloneable front door to a running tracker.
///
/// Commands are fire-and-forget and applied in the order they were sent;
/// queries round-trip through the coordinator so they observe every command
/// sent before them.
#[derive(Clone)]
pub struct TrackerHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    api: Arc<dyn JobApi>,
    settings: TrackerSettings,
    next_subscription: Arc<AtomicU64>,
}

impl TrackerHandle {
    /// Spawns the coordinator on the current tokio runtime.
    pub fn spawn(api: Arc<dyn JobApi>, settings: TrackerSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let coordinator = Coordinator {
            state: TrackerState::new(),
            api: api.clone(),
            settings: settings.clone(),
            pollers: HashMap::new(),
            subscribers: Subscribers::default(),
            event_tx,
        };
        tokio::spawn(coordinator.run(cmd_rx, event_rx));

        Self {
            cmd_tx,
            api,
            settings,
            next_subscription: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Begin polling `job_id` every `cadence`. Idempotent while tracking: a
    /// second call starts no timer, but takes a lease of its own.
    pub fn start_tracking(&self, job_id: JobId, cadence: Duration) {
        self.send(Msg::ViewActivated { job_id, cadence });
    }

    /// Release one lease taken by `start_tracking`. Polling stops once no
    /// view or dashboard holds the job.
    pub fn stop_tracking(&self, job_id: JobId) {
        self.send(Msg::ViewDeactivated { job_id });
    }

    /// Scoped tracking at the detail cadence; released when the guard drops.
    pub fn track(&self, job_id: JobId) -> TrackingGuard {
        self.start_tracking(job_id, self.settings.detail_cadence);
        TrackingGuard {
            handle: self.clone(),
            job_id,
        }
    }

    pub fn activate_dashboard(&self) {
        self.send(Msg::DashboardActivated {
            cadence: self.settings.fleet_cadence,
        });
    }

    pub fn deactivate_dashboard(&self) {
        self.send(Msg::DashboardDeactivated);
    }

    /// Scoped dashboard; every fleet poller stops when the guard drops.
    pub fn dashboard(&self) -> DashboardGuard {
        self.activate_dashboard();
        DashboardGuard {
            handle: self.clone(),
        }
    }

    /// Re-fetch the job listing.
    pub fn refresh_fleet(&self) {
        self.send(Msg::ListRequested);
    }

    /// Fetch one job now, outside its timer.
    pub fn refresh_job(&self, job_id: JobId) {
        self.send(Msg::RefreshRequested { job_id });
    }

    /// Fetch every live-tracked job now, concurrently.
    pub fn refresh_tracked(&self) {
        self.send(Msg::RefreshTracked);
    }

    /// Ask the remote service to start processing, then refresh the job so the
    /// new status is picked up.
    pub async fn start_job(&self, job_id: JobId) -> Result<(), TrackerError> {
        self.api.start_job(job_id).await?;
        engine_info!(job = job_id; "remote processing requested");
        self.send(Msg::RefreshRequested { job_id });
        Ok(())
    }

    /// Drop the job locally right away and delete it remotely.
    pub fn delete_job(&self, job_id: JobId) {
        self.send(Msg::DeleteRequested { job_id });
    }

    /// Observe one job (`Some(id)`) or every job (`None`).
    pub fn subscribe(
        &self,
        job_id: Option<JobId>,
        observer: impl JobObserver + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let _ = self.cmd_tx.send(Command::Subscribe {
            id,
            job_id,
            observer: Arc::new(observer),
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let _ = self.cmd_tx.send(Command::Unsubscribe(id));
    }

    pub async fn get_job(&self, job_id: JobId) -> Result<Option<JobView>, TrackerError> {
        self.query(|reply| Query::Job { job_id, reply }).await
    }

    pub async fn list_jobs(&self) -> Result<Vec<JobView>, TrackerError> {
        self.query(Query::Jobs).await
    }

    /// Jobs with a poll handle, live or terminal.
    pub async fn list_tracked_jobs(&self) -> Result<Vec<JobView>, TrackerError> {
        self.query(Query::TrackedJobs).await
    }

    /// Ids with a running timer task.
    pub async fn active_pollers(&self) -> Result<Vec<JobId>, TrackerError> {
        self.query(Query::ActivePollers).await
    }

    /// Stop every poller and the coordinator. Further calls are ignored.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }

    fn send(&self, msg: Msg) {
        let _ = self.cmd_tx.send(Command::Apply(msg));
    }

    async fn query<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Query,
    ) -> Result<T, TrackerError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Query(build(reply)))
            .map_err(|_| TrackerError::Closed)?;
        rx.await.map_err(|_| TrackerError::Closed)
    }
}

/// Releases a detail view's tracking lease on drop, on every exit path.
#[must_use = "tracking stops as soon as the guard is dropped"]
pub struct TrackingGuard {
    handle: TrackerHandle,
    job_id: JobId,
}

impl TrackingGuard {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        self.handle.stop_tracking(self.job_id);
    }
}

#[must_use = "the dashboard deactivates as soon as the guard is dropped"]
pub struct DashboardGuard {
    handle: TrackerHandle,
}

impl Drop for DashboardGuard {
    fn drop(&mut self) {
        self.handle.deactivate_dashboard();
    }
}

/// Owns the tracker state. Every message is applied here, one at a time, so
/// store writes never interleave.
struct Coordinator {
    state: TrackerState,
    api: Arc<dyn JobApi>,
    settings: TrackerSettings,
    pollers: HashMap<JobId, JoinHandle<()>>,
    subscribers: Subscribers,
    event_tx: mpsc::UnboundedSender<Msg>,
}

impl Coordinator {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut event_rx: mpsc::UnboundedReceiver<Msg>,
    ) {
        loop {
            tokio::select! {
                command = cmd_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                Some(msg) = event_rx.recv() => self.apply(msg),
            }
        }

        for (_, poller) in self.pollers.drain() {
            poller.abort();
        }
        engine_info!("tracker stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Apply(msg) => self.apply(msg),
            Command::Subscribe {
                id,
                job_id,
                observer,
            } => self.subscribers.add(id, job_id, observer),
            Command::Unsubscribe(id) => {
                self.subscribers.remove(id);
            }
            Command::Query(query) => self.answer(query),
            Command::Shutdown => {}
        }
    }

    fn answer(&self, query: Query) {
        match query {
            Query::Job { job_id, reply } => {
                let _ = reply.send(self.state.job_view(job_id));
            }
            Query::Jobs(reply) => {
                let _ = reply.send(self.state.jobs());
            }
            Query::TrackedJobs(reply) => {
                let _ = reply.send(self.state.tracked_jobs());
            }
            Query::ActivePollers(reply) => {
                let mut ids: Vec<JobId> = self.pollers.keys().copied().collect();
                ids.sort_unstable();
                let _ = reply.send(ids);
            }
        }
    }

    fn apply(&mut self, msg: Msg) {
        let failed_job = match &msg {
            Msg::PollFailed { job_id, reason } => {
                engine_debug!(job = job_id; "poll failed: {}", reason);
                Some((*job_id, reason.clone()))
            }
            _ => None,
        };

        let (next, effects) = update(std::mem::take(&mut self.state), msg);
        self.state = next;

        if let Some((job_id, reason)) = failed_job {
            self.report_failure(job_id, &reason);
        }
        for effect in effects {
            self.execute(effect);
        }
    }

    fn report_failure(&self, job_id: JobId, reason: &str) {
        let Some(handle) = self.state.polls().get(job_id) else {
            return;
        };
        let failures = handle.consecutive_failures;
        let every = self.settings.failure_warn_every.max(1);
        if failures == 1 || failures % every == 0 {
            engine_warn!(
                job = job_id;
                "poll failed ({} in a row), still tracking: {}",
                failures,
                reason
            );
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::StartPoller { job_id, cadence } => {
                engine_info!(job = job_id; "start polling every {:?}", cadence);
                let task = tokio::spawn(run_poller(
                    self.api.clone(),
                    job_id,
                    cadence,
                    self.event_tx.clone(),
                ));
                if let Some(previous) = self.pollers.insert(job_id, task) {
                    previous.abort();
                }
            }
            Effect::StopPoller { job_id } => {
                if let Some(task) = self.pollers.remove(&job_id) {
                    engine_info!(job = job_id; "stop polling");
                    task.abort();
                }
            }
            Effect::FetchJobList { listing } => {
                let api = self.api.clone();
                let events = self.event_tx.clone();
                tokio::spawn(async move {
                    match api.list_jobs().await {
                        Ok(jobs) => {
                            engine_debug!("job listing {} returned {} jobs", listing, jobs.len());
                            let _ = events.send(Msg::JobsListed { listing, jobs });
                        }
                        Err(err) => engine_warn!("job listing failed: {}", err),
                    }
                });
            }
            Effect::FetchJobs { job_ids } => {
                let api = self.api.clone();
                let events = self.event_tx.clone();
                tokio::spawn(refresh_jobs(api, job_ids, events));
            }
            Effect::DeleteRemote { job_id } => {
                let api = self.api.clone();
                tokio::spawn(async move {
                    match api.delete_job(job_id).await {
                        Ok(()) => engine_info!(job = job_id; "deleted remotely"),
                        Err(err) => engine_warn!(job = job_id; "remote delete failed: {}", err),
                    }
                });
            }
            Effect::Notify(change) => {
                let event = match change {
                    Change::Updated(job_id) => match self.state.job_view(job_id) {
                        Some(view) => JobEvent::Updated(view),
                        None => return,
                    },
                    Change::Removed(job_id) => JobEvent::Removed(job_id),
                };
                self.subscribers.dispatch(&event);
            }
        }
    }
}

/// Fetches every id concurrently and reports each result as soon as it lands,
/// so one slow job never holds back the others.
async fn refresh_jobs(
    api: Arc<dyn JobApi>,
    job_ids: Vec<JobId>,
    events: mpsc::UnboundedSender<Msg>,
) {
    let mut pending: FuturesUnordered<_> = job_ids
        .into_iter()
        .map(|job_id| {
            let api = api.clone();
            async move { poll_once(api.as_ref(), job_id).await }
        })
        .collect();

    while let Some(msg) = pending.next().await {
        let msg = match msg {
            Msg::PollSucceeded(job) => Msg::RefreshCompleted(job),
            Msg::PollFailed { job_id, reason } => {
                engine_warn!(job = job_id; "refresh failed: {}", reason);
                continue;
            }
            other => other,
        };
        if events.send(msg).is_err() {
            break;
        }
    }
}
