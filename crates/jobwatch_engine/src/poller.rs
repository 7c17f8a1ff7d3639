use std::sync::Arc;
use std::time::Duration;

use engine_logging::engine_debug;
use jobwatch_core::{JobId, Msg};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use crate::JobApi;

const MIN_CADENCE: Duration = Duration::from_millis(10);

/// One job's refresh loop. Ticks immediately, then every `cadence`.
///
/// The loop never touches tracker state and never stops on its own: every
/// outcome, including errors, is reported back and the coordinator decides.
/// It ends when aborted or when the coordinator is gone.
pub(crate) async fn run_poller(
    api: Arc<dyn JobApi>,
    job_id: JobId,
    cadence: Duration,
    events: mpsc::UnboundedSender<Msg>,
) {
    let mut ticker = interval(cadence.max(MIN_CADENCE));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        engine_debug!(job = job_id; "poll tick");
        let msg = poll_once(api.as_ref(), job_id).await;
        if events.send(msg).is_err() {
            break;
        }
    }
}

pub(crate) async fn poll_once(api: &dyn JobApi, job_id: JobId) -> Msg {
    match api.get_job(job_id).await {
        Ok(job) if job.id == job_id => Msg::PollSucceeded(job),
        Ok(job) => Msg::PollFailed {
            job_id,
            reason: format!("response carried job id {}", job.id),
        },
        Err(err) if err.is_not_found() => Msg::JobVanished { job_id },
        Err(err) => Msg::PollFailed {
            job_id,
            reason: err.to_string(),
        },
    }
}
