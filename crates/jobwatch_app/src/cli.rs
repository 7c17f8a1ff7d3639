use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use engine_logging::{LevelFilter, LogDestination};
use jobwatch_core::JobId;
use jobwatch_engine::{ApiSettings, TrackerSettings};

#[derive(Parser, Debug)]
#[command(name = "jobwatch")]
#[command(version)]
#[command(about = "Follow the progress of remote media-processing jobs")]
pub struct Args {
    /// Base URL of the job service
    #[arg(long, env = "JOBWATCH_BASE_URL", default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[arg(long, env = "JOBWATCH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Override the polling interval in milliseconds
    #[arg(long, env = "JOBWATCH_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Also write logs to this file
    #[arg(long, env = "JOBWATCH_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Track one job until it completes or fails
    Watch { job_id: JobId },

    /// Track every unfinished job until interrupted
    Dashboard,

    /// Start remote processing for a job
    Start {
        job_id: JobId,

        /// Keep watching the job after starting it
        #[arg(long)]
        watch: bool,
    },

    /// Delete a job
    Delete { job_id: JobId },
}

impl Args {
    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.base_url.clone(),
            bearer_token: self.token.clone(),
            ..ApiSettings::default()
        }
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        let defaults = TrackerSettings::default();
        match self.interval_ms.map(Duration::from_millis) {
            Some(cadence) => TrackerSettings {
                detail_cadence: cadence,
                fleet_cadence: cadence,
                ..defaults
            },
            None => defaults,
        }
    }

    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }
}
