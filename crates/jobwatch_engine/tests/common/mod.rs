#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use jobwatch_engine::{ApiError, FailureKind, Job, JobApi, JobEvent, JobId, JobObserver};

/// One scripted answer to `get_job`.
#[derive(Debug, Clone)]
pub enum Step {
    Ok(Job),
    Err(FailureKind),
    Delayed(Duration, Box<Step>),
}

impl Step {
    pub fn delayed(delay: Duration, step: Step) -> Self {
        Step::Delayed(delay, Box::new(step))
    }
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    last: Option<Step>,
}

/// In-memory job service. Each job answers its scripted steps in order and
/// then keeps repeating the last one.
#[derive(Default)]
pub struct ScriptedApi {
    scripts: Mutex<HashMap<JobId, Script>>,
    listing: Mutex<Vec<Job>>,
    calls: Mutex<HashMap<JobId, usize>>,
    started: Mutex<Vec<JobId>>,
    deleted: Mutex<Vec<JobId>>,
}

impl ScriptedApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, job_id: JobId, steps: Vec<Step>) {
        self.scripts.lock().unwrap().insert(
            job_id,
            Script {
                steps: steps.into(),
                last: None,
            },
        );
    }

    pub fn set_listing(&self, jobs: Vec<Job>) {
        *self.listing.lock().unwrap() = jobs;
    }

    pub fn calls(&self, job_id: JobId) -> usize {
        self.calls.lock().unwrap().get(&job_id).copied().unwrap_or(0)
    }

    pub fn started(&self) -> Vec<JobId> {
        self.started.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<JobId> {
        self.deleted.lock().unwrap().clone()
    }

    fn next_step(&self, job_id: JobId) -> Step {
        *self.calls.lock().unwrap().entry(job_id).or_default() += 1;
        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(&job_id) else {
            return Step::Err(FailureKind::NotFound);
        };
        match script.steps.pop_front() {
            Some(step) => {
                script.last = Some(step.clone());
                step
            }
            None => script
                .last
                .clone()
                .unwrap_or(Step::Err(FailureKind::NotFound)),
        }
    }
}

#[async_trait::async_trait]
impl JobApi for ScriptedApi {
    async fn get_job(&self, job_id: JobId) -> Result<Job, ApiError> {
        let mut step = self.next_step(job_id);
        loop {
            match step {
                Step::Ok(job) => return Ok(job),
                Step::Err(kind) => return Err(ApiError::new(kind, "scripted failure")),
                Step::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    step = *inner;
                }
            }
        }
    }

    async fn list_jobs(&self) -> Result<Vec<Job>, ApiError> {
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn start_job(&self, job_id: JobId) -> Result<(), ApiError> {
        self.started.lock().unwrap().push(job_id);
        Ok(())
    }

    async fn delete_job(&self, job_id: JobId) -> Result<(), ApiError> {
        self.deleted.lock().unwrap().push(job_id);
        Ok(())
    }
}

/// Collects every event it observes.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<JobEvent>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<JobEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl JobObserver for Recorder {
    fn on_event(&self, event: &JobEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
