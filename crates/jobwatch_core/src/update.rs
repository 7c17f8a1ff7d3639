use std::collections::BTreeSet;

use crate::{Change, Effect, Job, JobId, Msg, Owner, Released, TrackerState};

/// Pure update function: applies a message to state and returns any effects.
///
/// Effects come out in the order they must run: a job's final update is
/// notified before its poller is stopped, and local removal precedes the
/// remote delete.
pub fn update(mut state: TrackerState, msg: Msg) -> (TrackerState, Vec<Effect>) {
    let mut effects = Vec::new();

    match msg {
        Msg::ViewActivated { job_id, cadence } => {
            if !state.is_deleted(job_id) {
                acquire(&mut state, job_id, Owner::View, cadence, &mut effects);
            }
        }
        Msg::ViewDeactivated { job_id } => {
            release(&mut state, job_id, Owner::View, &mut effects);
        }
        Msg::DashboardActivated { cadence } => {
            state.fleet_cadence = Some(cadence);
            request_listing(&mut state, &mut effects);
            reconcile_fleet(&mut state, &mut effects);
        }
        Msg::DashboardDeactivated => {
            state.fleet_cadence = None;
            for job_id in state.polls.ids_held_by(Owner::Fleet) {
                release(&mut state, job_id, Owner::Fleet, &mut effects);
            }
        }
        Msg::ListRequested => {
            request_listing(&mut state, &mut effects);
        }
        Msg::JobsListed { listing, jobs } => {
            // A listing overtaken by a newer one carries older data.
            if listing >= state.last_listing {
                state.last_listing = listing;
                apply_listing(&mut state, listing, jobs, &mut effects);
                reconcile_fleet(&mut state, &mut effects);
            }
        }
        Msg::PollSucceeded(job) => {
            // Results from a stopped or deleted poller are dropped.
            if state.polls.is_tracking(job.id) && !state.is_deleted(job.id) {
                apply_observation(&mut state, job, &mut effects);
            }
        }
        Msg::PollFailed { job_id, .. } => {
            if state.polls.is_tracking(job_id) {
                state.polls.record_failure(job_id);
            }
        }
        Msg::JobVanished { job_id } => {
            if state.store.contains(job_id) || state.polls.get(job_id).is_some() {
                remove_job(&mut state, job_id, &mut effects);
            }
        }
        Msg::RefreshRequested { job_id } => {
            if !state.is_deleted(job_id) {
                effects.push(Effect::FetchJobs {
                    job_ids: vec![job_id],
                });
            }
        }
        Msg::RefreshTracked => {
            let job_ids: Vec<JobId> = state
                .polls
                .handles()
                .filter(|handle| handle.is_tracking())
                .map(|handle| handle.job_id)
                .collect();
            if !job_ids.is_empty() {
                effects.push(Effect::FetchJobs { job_ids });
            }
        }
        Msg::RefreshCompleted(job) => {
            // Id-presence guard: a refresh never resurrects a removed job.
            if state.store.contains(job.id) && !state.is_deleted(job.id) {
                apply_observation(&mut state, job, &mut effects);
            }
        }
        Msg::DeleteRequested { job_id } => {
            state.deleted.insert(job_id, state.listings_requested);
            remove_job(&mut state, job_id, &mut effects);
            effects.push(Effect::DeleteRemote { job_id });
        }
    }

    (state, effects)
}

fn request_listing(state: &mut TrackerState, effects: &mut Vec<Effect>) {
    state.listings_requested += 1;
    effects.push(Effect::FetchJobList {
        listing: state.listings_requested,
    });
}

fn acquire(
    state: &mut TrackerState,
    job_id: JobId,
    owner: Owner,
    cadence: std::time::Duration,
    effects: &mut Vec<Effect>,
) {
    if state.polls.acquire(job_id, owner, cadence).needs_poller() {
        let cadence = state
            .polls
            .get(job_id)
            .map_or(cadence, |handle| handle.cadence);
        effects.push(Effect::StartPoller { job_id, cadence });
    }
}

fn release(state: &mut TrackerState, job_id: JobId, owner: Owner, effects: &mut Vec<Effect>) {
    if let Released::Dropped { was_tracking: true } = state.polls.release(job_id, owner) {
        effects.push(Effect::StopPoller { job_id });
    }
}

fn remove_job(state: &mut TrackerState, job_id: JobId, effects: &mut Vec<Effect>) {
    if state.polls.forget(job_id) {
        effects.push(Effect::StopPoller { job_id });
    }
    if state.store.remove(job_id).is_some() {
        effects.push(Effect::Notify(Change::Removed(job_id)));
    }
}

fn apply_observation(state: &mut TrackerState, job: Job, effects: &mut Vec<Effect>) {
    let job_id = job.id;
    let status = job.status;
    let previous_status = state.store.get(job_id).map(|entry| entry.job.status);

    if state.store.upsert(job).should_notify() {
        effects.push(Effect::Notify(Change::Updated(job_id)));
    }
    if state.polls.record_status(job_id, status) {
        effects.push(Effect::StopPoller { job_id });
    }
    if previous_status != Some(status) {
        reconcile_fleet(state, effects);
    }
}

fn apply_listing(
    state: &mut TrackerState,
    listing: u64,
    jobs: Vec<Job>,
    effects: &mut Vec<Effect>,
) {
    // A tombstone is needed only while listings issued before the delete can
    // still arrive, or while the remote side still reports the job.
    let reported: BTreeSet<JobId> = jobs.iter().map(|job| job.id).collect();
    state.deleted.retain(|job_id, requested_before| {
        listing <= *requested_before || reported.contains(job_id)
    });

    let mut listed = BTreeSet::new();
    for job in jobs {
        let job_id = job.id;
        if state.is_deleted(job_id) {
            continue;
        }
        listed.insert(job_id);
        if state.store.upsert(job).should_notify() {
            effects.push(Effect::Notify(Change::Updated(job_id)));
        }
    }

    // Jobs missing from the listing are gone remotely, unless a detail view
    // tracks them on its own.
    let missing: Vec<JobId> = state
        .store
        .ids()
        .filter(|job_id| !listed.contains(job_id))
        .filter(|job_id| {
            !state
                .polls
                .get(*job_id)
                .is_some_and(|handle| handle.held_by(Owner::View))
        })
        .collect();
    for job_id in missing {
        remove_job(state, job_id, effects);
    }
}

/// Set-based reconciliation: every non-terminal job in the store gets a fleet
/// lease, every fleet lease on a job that no longer needs one is released.
fn reconcile_fleet(state: &mut TrackerState, effects: &mut Vec<Effect>) {
    let Some(cadence) = state.fleet_cadence else {
        return;
    };

    let desired: BTreeSet<JobId> = state
        .store
        .list()
        .filter(|entry| !entry.job.status.is_terminal())
        .map(|entry| entry.job.id)
        .collect();
    let current: BTreeSet<JobId> = state.polls.ids_held_by(Owner::Fleet).into_iter().collect();

    for &job_id in desired.difference(&current) {
        acquire(state, job_id, Owner::Fleet, cadence, effects);
    }
    for &job_id in current.difference(&desired) {
        release(state, job_id, Owner::Fleet, effects);
    }
}
