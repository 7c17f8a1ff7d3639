use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use engine_logging::engine_error;
use jobwatch_core::{JobEvent, JobId};

/// Receives job change notifications.
///
/// Observers run on the tracker's coordinator task, in notification order;
/// keep them short and hand heavy work off to another task. An observer that
/// panics is unsubscribed; the tracker and other observers carry on.
pub trait JobObserver: Send + Sync {
    fn on_event(&self, event: &JobEvent);
}

impl<F> JobObserver for F
where
    F: Fn(&JobEvent) + Send + Sync,
{
    fn on_event(&self, event: &JobEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

struct Subscription {
    id: SubscriptionId,
    /// `None` subscribes to every job.
    job_id: Option<JobId>,
    observer: Arc<dyn JobObserver>,
}

#[derive(Default)]
pub(crate) struct Subscribers {
    entries: Vec<Subscription>,
}

impl Subscribers {
    pub(crate) fn add(
        &mut self,
        id: SubscriptionId,
        job_id: Option<JobId>,
        observer: Arc<dyn JobObserver>,
    ) {
        self.entries.push(Subscription {
            id,
            job_id,
            observer,
        });
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|subscription| subscription.id != id);
        before != self.entries.len()
    }

    pub(crate) fn dispatch(&mut self, event: &JobEvent) {
        let job_id = event.job_id();
        self.entries.retain(|subscription| {
            if !subscription.job_id.is_none_or(|wanted| wanted == job_id) {
                return true;
            }
            let observer = &subscription.observer;
            match catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
                Ok(()) => true,
                Err(_) => {
                    engine_error!(
                        job = job_id;
                        "observer {} panicked and was unsubscribed",
                        subscription.id.0
                    );
                    false
                }
            }
        });
    }
}
