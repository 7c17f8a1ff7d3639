use std::time::Duration;

/// Polling cadences and failure reporting for a tracker instance.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Cadence used by [`crate::TrackerHandle::track`] for single-job views.
    pub detail_cadence: Duration,
    /// Cadence for every poller the dashboard starts.
    pub fleet_cadence: Duration,
    /// Warn when a job's consecutive poll failures reach a multiple of this.
    /// Polling continues regardless.
    pub failure_warn_every: u32,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            detail_cadence: Duration::from_secs(3),
            fleet_cadence: Duration::from_secs(10),
            failure_warn_every: 5,
        }
    }
}
