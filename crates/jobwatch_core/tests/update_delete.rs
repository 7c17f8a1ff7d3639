use std::time::Duration;

use jobwatch_core::{update, Change, Effect, Job, JobStatus, Msg, TrackerState};
use pretty_assertions::assert_eq;

const CADENCE: Duration = Duration::from_secs(2);

fn tracked_processing_job(job_id: u64) -> TrackerState {
    let (state, _) = update(
        TrackerState::new(),
        Msg::ViewActivated {
            job_id,
            cadence: CADENCE,
        },
    );
    let (state, _) = update(
        state,
        Msg::PollSucceeded(
            Job::new(job_id, JobStatus::Processing).with_message("Progress 51%: Processing..."),
        ),
    );
    state
}

#[test]
fn delete_removes_locally_before_remote_call() {
    engine_logging::initialize_for_tests();
    let state = tracked_processing_job(1);
    let (state, effects) = update(state, Msg::DeleteRequested { job_id: 1 });

    assert_eq!(
        effects,
        vec![
            Effect::StopPoller { job_id: 1 },
            Effect::Notify(Change::Removed(1)),
            Effect::DeleteRemote { job_id: 1 },
        ]
    );
    assert!(state.store().get(1).is_none());
    assert!(state.polls().get(1).is_none());
    assert!(state.is_deleted(1));
}

#[test]
fn late_poll_after_delete_does_not_resurrect() {
    engine_logging::initialize_for_tests();
    let state = tracked_processing_job(1);
    let (state, _) = update(state, Msg::DeleteRequested { job_id: 1 });
    let (state, effects) = update(
        state,
        Msg::PollSucceeded(
            Job::new(1, JobStatus::Processing).with_message("Progress 53%: Processing..."),
        ),
    );

    assert!(effects.is_empty());
    assert!(state.store().get(1).is_none());
}

#[test]
fn stale_listing_and_refresh_do_not_resurrect() {
    engine_logging::initialize_for_tests();
    let state = tracked_processing_job(1);
    let (state, _) = update(state, Msg::DashboardActivated { cadence: CADENCE });
    let (state, _) = update(state, Msg::DeleteRequested { job_id: 1 });

    let (state, effects) = update(
        state,
        Msg::JobsListed {
            listing: 1,
            jobs: vec![
                Job::new(1, JobStatus::Processing),
                Job::new(2, JobStatus::Pending),
            ],
        },
    );
    assert!(state.store().get(1).is_none());
    assert!(!effects.contains(&Effect::StartPoller {
        job_id: 1,
        cadence: CADENCE
    }));
    assert!(state.polls().is_tracking(2));

    let (state, effects) = update(state, Msg::RefreshCompleted(Job::new(1, JobStatus::Processing)));
    assert!(effects.is_empty());
    assert!(state.store().get(1).is_none());

    let (_state, effects) = update(state, Msg::RefreshRequested { job_id: 1 });
    assert!(effects.is_empty());
}

#[test]
fn reactivating_deleted_job_is_ignored() {
    engine_logging::initialize_for_tests();
    let state = tracked_processing_job(1);
    let (state, _) = update(state, Msg::DeleteRequested { job_id: 1 });
    let (state, effects) = update(
        state,
        Msg::ViewActivated {
            job_id: 1,
            cadence: CADENCE,
        },
    );
    assert!(effects.is_empty());
    assert!(state.polls().is_empty());
}

#[test]
fn deleting_unknown_job_still_calls_remote() {
    engine_logging::initialize_for_tests();
    let (_state, effects) = update(TrackerState::new(), Msg::DeleteRequested { job_id: 9 });
    assert_eq!(effects, vec![Effect::DeleteRemote { job_id: 9 }]);
}

#[test]
fn tombstone_is_pruned_once_a_later_listing_omits_the_job() {
    engine_logging::initialize_for_tests();
    let state = tracked_processing_job(1);
    let (state, effects) = update(state, Msg::DashboardActivated { cadence: CADENCE });
    assert_eq!(effects, vec![Effect::FetchJobList { listing: 1 }]);
    let (state, _) = update(state, Msg::DeleteRequested { job_id: 1 });
    let both = vec![
        Job::new(1, JobStatus::Processing),
        Job::new(2, JobStatus::Pending),
    ];

    // Issued before the delete: the tombstone must hold.
    let (state, _) = update(
        state,
        Msg::JobsListed {
            listing: 1,
            jobs: both.clone(),
        },
    );
    assert!(state.is_deleted(1));

    // Issued after the delete, but the remote side still reports the job.
    let (state, effects) = update(state, Msg::ListRequested);
    assert_eq!(effects, vec![Effect::FetchJobList { listing: 2 }]);
    let (state, _) = update(
        state,
        Msg::JobsListed {
            listing: 2,
            jobs: both.clone(),
        },
    );
    assert!(state.is_deleted(1));
    assert!(state.store().get(1).is_none());

    let (state, _) = update(state, Msg::ListRequested);
    let (state, _) = update(
        state,
        Msg::JobsListed {
            listing: 3,
            jobs: vec![Job::new(2, JobStatus::Pending)],
        },
    );
    assert!(!state.is_deleted(1));
    assert_eq!(state.tombstone_count(), 0);

    // An overtaken listing arriving late is dropped whole.
    let (state, effects) = update(
        state,
        Msg::JobsListed {
            listing: 2,
            jobs: both,
        },
    );
    assert!(effects.is_empty());
    assert!(state.store().get(1).is_none());
}

#[test]
fn tombstones_do_not_accumulate() {
    engine_logging::initialize_for_tests();
    let mut state = TrackerState::new();
    for job_id in 1..=1000 {
        state = update(state, Msg::DeleteRequested { job_id }).0;
    }
    assert_eq!(state.tombstone_count(), 1000);

    let (state, _) = update(state, Msg::ListRequested);
    let (state, _) = update(
        state,
        Msg::JobsListed {
            listing: 1,
            jobs: vec![Job::new(1001, JobStatus::Pending)],
        },
    );
    assert_eq!(state.tombstone_count(), 0);
}
