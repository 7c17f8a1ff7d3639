use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Local;
use jobwatch_core::{JobEvent, JobId, JobStatus, JobView};
use jobwatch_engine::{JobApi, ReqwestJobApi, TrackerHandle};
use log::{info, warn};
use tokio::sync::mpsc;

use crate::cli::{Args, Command};
use crate::render;

pub async fn run(args: Args) -> anyhow::Result<()> {
    let api = Arc::new(
        ReqwestJobApi::new(args.api_settings())
            .with_context(|| format!("cannot use base URL {}", args.base_url))?,
    );

    match args.command {
        Command::Delete { job_id } => {
            api.delete_job(job_id)
                .await
                .with_context(|| format!("failed to delete job {job_id}"))?;
            println!("deleted job #{job_id}");
            Ok(())
        }
        Command::Watch { job_id } => {
            let tracker = TrackerHandle::spawn(api, args.tracker_settings());
            let outcome = watch_job(&tracker, job_id).await;
            tracker.shutdown();
            outcome
        }
        Command::Start { job_id, watch } => {
            let tracker = TrackerHandle::spawn(api, args.tracker_settings());
            let outcome = match tracker.start_job(job_id).await {
                Ok(()) => {
                    println!("processing requested for job #{job_id}");
                    if watch {
                        watch_job(&tracker, job_id).await
                    } else {
                        Ok(())
                    }
                }
                Err(err) => Err(err).with_context(|| format!("failed to start job {job_id}")),
            };
            tracker.shutdown();
            outcome
        }
        Command::Dashboard => {
            let tracker = TrackerHandle::spawn(api, args.tracker_settings());
            let outcome = dashboard(&tracker).await;
            tracker.shutdown();
            outcome
        }
    }
}

async fn watch_job(tracker: &TrackerHandle, job_id: JobId) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = tracker.subscribe(Some(job_id), move |event: &JobEvent| {
        let _ = tx.send(event.clone());
    });
    let _tracking = tracker.track(job_id);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last: Option<JobView> = None;
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted while watching job {job_id}");
                break;
            }
            event = rx.recv() => match event {
                Some(JobEvent::Updated(view)) => {
                    print_row(&view);
                    let finished = view.job.status.is_terminal();
                    last = Some(view);
                    if finished {
                        break;
                    }
                }
                Some(JobEvent::Removed(_)) => {
                    tracker.unsubscribe(subscription);
                    bail!("job #{job_id} no longer exists");
                }
                None => break,
            }
        }
    }
    tracker.unsubscribe(subscription);

    match last {
        Some(view) if view.job.status == JobStatus::Failed => {
            let reason = view
                .job
                .error_message
                .or(view.progress.map(|progress| progress.step))
                .unwrap_or_default();
            bail!("job #{job_id} failed: {reason}")
        }
        _ => Ok(()),
    }
}

async fn dashboard(tracker: &TrackerHandle) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = tracker.subscribe(None, move |event: &JobEvent| {
        let _ = tx.send(event.clone());
    });
    let _dashboard = tracker.dashboard();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                if let Err(err) = result {
                    warn!("cannot listen for ctrl-c: {err}");
                }
                break;
            }
            event = rx.recv() => match event {
                Some(JobEvent::Updated(view)) => print_row(&view),
                Some(JobEvent::Removed(job_id)) => {
                    println!("{} #{job_id} removed", timestamp());
                }
                None => break,
            }
        }
    }
    tracker.unsubscribe(subscription);

    let tracked = tracker.list_tracked_jobs().await?;
    info!("dashboard closed with {} jobs still unfinished", tracked.len());
    Ok(())
}

fn print_row(view: &JobView) {
    println!("{} {}", timestamp(), render::job_row(view));
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}
