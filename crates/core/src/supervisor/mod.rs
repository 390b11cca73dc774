//! Job supervisor: runs jobs in named slots, one active job per slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::ReconstructionEngine;
use crate::job::{JobError, JobId, JobParameters, JobState};
use crate::orchestrator::{JobHandle, JobOrchestrator, JobsConfig};

/// Name of a single-job-at-a-time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub const DEFAULT: &'static str = "default";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new(Self::DEFAULT)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Snapshot of the job occupying a slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotStatus {
    pub job_id: JobId,
    pub state: JobState,
    pub started_at: DateTime<Utc>,
}

struct SlotEntry {
    job_id: JobId,
    cancel: CancellationToken,
    state: watch::Receiver<JobState>,
    started_at: DateTime<Utc>,
}

impl SlotEntry {
    fn state(&self) -> JobState {
        *self.state.borrow()
    }

    fn is_active(&self) -> bool {
        !self.state().is_terminal()
    }
}

type SlotTable = Arc<Mutex<HashMap<SlotId, SlotEntry>>>;

/// Starts and cancels jobs, keeping at most one non-terminal job per slot.
///
/// Each accepted job runs on its own tokio task. The task removes the slot
/// entry once the job settles; until then a terminal entry is kept only for
/// status queries and never blocks a new start.
pub struct JobSupervisor<E: ReconstructionEngine> {
    engine: Arc<E>,
    config: JobsConfig,
    slots: SlotTable,
}

impl<E: ReconstructionEngine + 'static> JobSupervisor<E> {
    pub fn new(engine: Arc<E>, config: JobsConfig) -> Self {
        Self {
            engine,
            config,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts a job in the default slot.
    pub async fn start(&self, params: JobParameters) -> Result<JobHandle, JobError> {
        self.start_in(SlotId::default(), params).await
    }

    /// Starts a job in the given slot.
    ///
    /// Fails immediately with [`JobError::SlotBusy`] if the slot holds a job
    /// that has not settled yet. The running job is left untouched.
    pub async fn start_in(
        &self,
        slot: SlotId,
        params: JobParameters,
    ) -> Result<JobHandle, JobError> {
        let mut slots = self.slots.lock().await;

        if let Some(entry) = slots.get(&slot) {
            if entry.is_active() {
                warn!(
                    slot = %slot,
                    running = %entry.job_id,
                    "Rejecting start, slot is busy"
                );
                return Err(JobError::slot_busy(slot.as_str()));
            }
        }

        let (orchestrator, handle) =
            JobOrchestrator::new(Arc::clone(&self.engine), params, &self.config);
        let job_id = orchestrator.id();

        slots.insert(
            slot.clone(),
            SlotEntry {
                job_id,
                cancel: orchestrator.cancellation_token(),
                state: handle.watch_state(),
                started_at: Utc::now(),
            },
        );
        drop(slots);

        info!(slot = %slot, job_id = %job_id, "Job accepted");

        let table = Arc::clone(&self.slots);
        tokio::spawn(async move {
            let state = orchestrator.run().await;

            let mut slots = table.lock().await;
            if slots.get(&slot).is_some_and(|entry| entry.job_id == job_id) {
                slots.remove(&slot);
            }
            debug!(slot = %slot, job_id = %job_id, state = %state, "Slot released");
        });

        Ok(handle)
    }

    /// Requests cancellation of a job. No-op if the job is unknown or settled.
    pub async fn cancel(&self, job_id: &JobId) {
        let slots = self.slots.lock().await;
        match slots.values().find(|entry| entry.job_id == *job_id) {
            Some(entry) if entry.is_active() => {
                info!(job_id = %job_id, "Cancelling job");
                entry.cancel.cancel();
            }
            _ => debug!(job_id = %job_id, "Cancel ignored, job not active"),
        }
    }

    /// Requests cancellation of whatever job occupies the slot.
    pub async fn cancel_slot(&self, slot: &SlotId) {
        let slots = self.slots.lock().await;
        match slots.get(slot) {
            Some(entry) if entry.is_active() => {
                info!(slot = %slot, job_id = %entry.job_id, "Cancelling job");
                entry.cancel.cancel();
            }
            _ => debug!(slot = %slot, "Cancel ignored, slot idle"),
        }
    }

    /// Current occupant of the slot, if any.
    pub async fn status(&self, slot: &SlotId) -> Option<SlotStatus> {
        let slots = self.slots.lock().await;
        slots.get(slot).map(|entry| SlotStatus {
            job_id: entry.job_id,
            state: entry.state(),
            started_at: entry.started_at,
        })
    }
}
