//! Job orchestrator implementation.
//!
//! Drives one job through its lifecycle:
//! Idle -> Starting -> Running -> Completed | Failed | Cancelled

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::engine::{EventReceiver, ProcessRequest, ReconstructionEngine, SessionConfig};
use crate::job::{JobError, JobId, JobOutcome, JobParameters, JobState};
use crate::output_plan::OutputPlan;
use crate::translator::{self, Translation};

use super::config::JobsConfig;
use super::handle::JobHandle;

const STREAM_ENDED: &str = "stream ended unexpectedly";
const STREAM_UNAVAILABLE: &str = "event stream unavailable";
const ENGINE_CANCELLED: &str = "processing cancelled by the engine";

/// Terminal state plus the outcome to emit with it, if any.
type Settled = (JobState, Option<JobOutcome>);

/// Runs a single reconstruction job.
///
/// The orchestrator owns the engine session for the whole job and releases
/// it exactly once, right before the terminal state is published.
pub struct JobOrchestrator<E: ReconstructionEngine> {
    id: JobId,
    engine: Arc<E>,
    params: JobParameters,
    /// Per-job directory inside the configured staging area.
    staging_dir: PathBuf,
    cancel: CancellationToken,
    state_tx: watch::Sender<JobState>,
    outcome_tx: mpsc::Sender<JobOutcome>,
}

impl<E: ReconstructionEngine + 'static> JobOrchestrator<E> {
    /// Create an orchestrator in the `Idle` state and the handle to follow it.
    pub fn new(engine: Arc<E>, params: JobParameters, config: &JobsConfig) -> (Self, JobHandle) {
        let id = JobId::new();
        let (outcome_tx, outcome_rx) = mpsc::channel(config.outcome_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(JobState::Idle);
        let cancel = CancellationToken::new();

        let orchestrator = Self {
            id,
            engine,
            params,
            staging_dir: config.staging_dir().join(id.to_string()),
            cancel: cancel.clone(),
            state_tx,
            outcome_tx,
        };
        let handle = JobHandle::new(id, outcome_rx, state_rx, cancel);
        (orchestrator, handle)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Token that cancels this job.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the job to a terminal state.
    pub async fn run(self) -> JobState {
        let plan = OutputPlan::resolve_in(&self.params.output_destination, &self.staging_dir);
        info!(
            job_id = %self.id,
            engine = self.engine.name(),
            input = ?self.params.input_folder,
            destination = ?plan.final_path(),
            target = ?plan.write_target,
            staged = plan.is_staged(),
            detail = %self.params.detail,
            "Starting reconstruction job"
        );
        self.transition(JobState::Starting);

        let mut session = match self.open_session(&plan).await {
            Ok(session) => session,
            Err(err) => {
                return self
                    .settle(&plan, (JobState::Failed, Some(JobOutcome::Failed(err))))
                    .await
            }
        };

        let events = self.engine.events(&mut session);
        self.transition(JobState::Running);

        let settled = self.drive(&session, events, &plan).await;
        self.engine.release(session).await;
        self.settle(&plan, settled).await
    }

    /// Creates the session and submits the request.
    async fn open_session(&self, plan: &OutputPlan) -> Result<E::Session, JobError> {
        if plan.is_staged() {
            tokio::fs::create_dir_all(&self.staging_dir)
                .await
                .map_err(|e| {
                    JobError::IoFailure(format!(
                        "failed to create staging directory {}: {}",
                        self.staging_dir.display(),
                        e
                    ))
                })?;
        }

        let config = SessionConfig {
            sample_ordering: self.params.sample_ordering,
            feature_sensitivity: self.params.feature_sensitivity,
        };
        let mut session = self
            .engine
            .create_session(&self.params.input_folder, &config)
            .await
            .map_err(|e| JobError::SessionCreationFailed(e.to_string()))?;

        let request = ProcessRequest {
            output: plan.write_target.clone(),
            detail: self.params.detail,
        };
        if let Err(e) = self.engine.start_processing(&mut session, request).await {
            self.engine.release(session).await;
            return Err(JobError::ProcessStartFailed(e.to_string()));
        }

        Ok(session)
    }

    /// Consumes engine events until the job settles.
    async fn drive(
        &self,
        session: &E::Session,
        events: Option<EventReceiver>,
        plan: &OutputPlan,
    ) -> Settled {
        let Some(mut events) = events else {
            return failed(JobError::engine(STREAM_UNAVAILABLE));
        };
        let mut cancel_requested = false;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled(), if !cancel_requested => {
                    cancel_requested = true;
                    debug!(job_id = %self.id, "Cancellation requested");
                    self.engine.cancel(session).await;
                }

                _ = self.outcome_tx.closed(), if !cancel_requested => {
                    cancel_requested = true;
                    debug!(job_id = %self.id, "Outcome receiver dropped, cancelling");
                    self.engine.cancel(session).await;
                }

                event = events.recv() => {
                    let Some(event) = event else {
                        return if cancel_requested {
                            (JobState::Cancelled, None)
                        } else {
                            failed(JobError::engine(STREAM_ENDED))
                        };
                    };

                    match translator::translate(&event) {
                        Translation::Outcome(outcome) if !outcome.is_terminal() => {
                            self.forward(session, outcome, &mut cancel_requested).await;
                        }
                        Translation::Outcome(outcome) => return terminal(outcome),
                        Translation::Finalize => {
                            if cancel_requested {
                                debug!(job_id = %self.id, "Engine finished before cancellation took effect");
                            }
                            return terminal(translator::finalize(plan).await);
                        }
                        Translation::Cancelled => {
                            return if cancel_requested {
                                (JobState::Cancelled, None)
                            } else {
                                failed(JobError::engine(ENGINE_CANCELLED))
                            };
                        }
                        Translation::Ignored => {}
                    }
                }
            }
        }
    }

    /// Delivers a progress outcome without blocking cancellation.
    ///
    /// Progress is dropped once cancellation was requested.
    async fn forward(
        &self,
        session: &E::Session,
        outcome: JobOutcome,
        cancel_requested: &mut bool,
    ) {
        if *cancel_requested {
            trace!(job_id = %self.id, "Dropping progress of a cancelled job");
            return;
        }

        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => {
                *cancel_requested = true;
                debug!(job_id = %self.id, "Cancellation requested while delivering progress");
                self.engine.cancel(session).await;
            }

            sent = self.outcome_tx.send(outcome) => {
                if sent.is_err() {
                    *cancel_requested = true;
                    debug!(job_id = %self.id, "Outcome receiver dropped, cancelling");
                    self.engine.cancel(session).await;
                }
            }
        }
    }

    /// Publishes the terminal state and emits the final outcome.
    async fn settle(&self, plan: &OutputPlan, (state, outcome): Settled) -> JobState {
        if state != JobState::Completed {
            translator::discard(plan).await;
        }
        if plan.is_staged() {
            self.remove_staging_dir().await;
        }
        self.transition(state);

        match &outcome {
            Some(JobOutcome::Completed(path)) => {
                info!(job_id = %self.id, path = ?path, "Job completed");
            }
            Some(JobOutcome::Failed(err)) => {
                warn!(job_id = %self.id, "Job failed: {}", err);
            }
            _ => info!(job_id = %self.id, state = %state, "Job stopped"),
        }

        if let Some(outcome) = outcome {
            self.emit(outcome).await;
        }
        state
    }

    async fn remove_staging_dir(&self) {
        match tokio::fs::remove_dir(&self.staging_dir).await {
            Ok(()) => debug!(job_id = %self.id, "Removed staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                job_id = %self.id,
                path = ?self.staging_dir,
                "Failed to remove staging directory: {}",
                e
            ),
        }
    }

    async fn emit(&self, outcome: JobOutcome) {
        if self.outcome_tx.send(outcome).await.is_err() {
            debug!(job_id = %self.id, "Outcome receiver gone, dropping outcome");
        }
    }

    fn transition(&self, state: JobState) {
        let previous = self.state_tx.send_replace(state);
        debug!(job_id = %self.id, from = %previous, to = %state, "Job state changed");
    }
}

fn failed(err: JobError) -> Settled {
    (JobState::Failed, Some(JobOutcome::Failed(err)))
}

fn terminal(outcome: JobOutcome) -> Settled {
    let state = match outcome {
        JobOutcome::Completed(_) => JobState::Completed,
        _ => JobState::Failed,
    };
    (state, Some(outcome))
}
