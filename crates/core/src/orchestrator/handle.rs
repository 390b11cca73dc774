//! Caller-side handle of a running job.

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::job::{JobId, JobOutcome, JobState};

/// The caller's end of a job.
///
/// Outcomes arrive in the order the engine produced them. Dropping the
/// handle (or the stream from [`JobHandle::into_stream`]) while the job is
/// still running cancels it.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    outcomes: mpsc::Receiver<JobOutcome>,
    state: watch::Receiver<JobState>,
    cancel: CancellationToken,
}

impl JobHandle {
    pub(crate) fn new(
        id: JobId,
        outcomes: mpsc::Receiver<JobOutcome>,
        state: watch::Receiver<JobState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            outcomes,
            state,
            cancel,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        *self.state.borrow()
    }

    /// A receiver that follows state changes.
    pub fn watch_state(&self) -> watch::Receiver<JobState> {
        self.state.clone()
    }

    /// Next outcome, or `None` once the job is over.
    pub async fn next_outcome(&mut self) -> Option<JobOutcome> {
        self.outcomes.recv().await
    }

    /// Requests cancellation. No effect on a finished job.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drains the remaining outcomes and returns them with the final state.
    pub async fn collect(mut self) -> (Vec<JobOutcome>, JobState) {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.outcomes.recv().await {
            outcomes.push(outcome);
        }
        let state = self.state();
        (outcomes, state)
    }

    /// Waits for the job to settle, discarding outcomes.
    pub async fn wait(self) -> JobState {
        self.collect().await.1
    }

    /// Converts the handle into a stream of outcomes.
    pub fn into_stream(self) -> impl Stream<Item = JobOutcome> + Send + 'static {
        futures::stream::unfold(self.outcomes, |mut rx| async move {
            rx.recv().await.map(|outcome| (outcome, rx))
        })
    }
}
