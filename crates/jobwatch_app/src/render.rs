use jobwatch_core::{JobStatus, JobView, TrackPhase};

/// One line per job: id, status, percent, step, tracking marker.
pub fn job_row(view: &JobView) -> String {
    let percent = match view.percent() {
        Some(percent) => format!("{percent:>3}%"),
        None => "   -".to_string(),
    };
    let step = view.step().unwrap_or("");
    let name = view.job.name.as_deref().unwrap_or("");
    let marker = match view.phase {
        Some(TrackPhase::Tracking) if view.consecutive_failures > 0 => {
            format!(" (polling, {} failed)", view.consecutive_failures)
        }
        Some(TrackPhase::Tracking) => " (polling)".to_string(),
        Some(TrackPhase::Terminal) | None => String::new(),
    };

    format!(
        "#{:<5} {:<10} {} {}{}{}",
        view.job.id,
        status_label(view.job.status),
        percent,
        step,
        if name.is_empty() { String::new() } else { format!(" [{name}]") },
        marker
    )
    .trim_end()
    .to_string()
}

fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "FAILED",
    }
}
