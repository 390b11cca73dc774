//! Translation of raw engine events into job outcomes.
//!
//! `translate` is a pure mapping. The one side effect, relocating a staged
//! output once the engine is done, lives in [`finalize`] so the orchestrator
//! can be exercised without touching a filesystem.

mod finalize;

pub use finalize::{discard, finalize};

use tracing::trace;

use crate::engine::EngineEvent;
use crate::job::{JobError, JobOutcome};

/// What the orchestrator should do with one engine event.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// Emit this outcome. A terminal outcome ends the job.
    Outcome(JobOutcome),
    /// The engine is done: run finalization and emit its outcome.
    Finalize,
    /// The engine stopped processing. Emits nothing.
    Cancelled,
    /// Informational event, keep consuming.
    Ignored,
}

/// Maps a single engine event.
pub fn translate(event: &EngineEvent) -> Translation {
    if event.is_informational() {
        trace!(event = event.name(), "Ignoring informational engine event");
        return Translation::Ignored;
    }

    match event {
        EngineEvent::RequestProgress { fraction } => {
            Translation::Outcome(JobOutcome::Progress(clamp_fraction(*fraction)))
        }
        EngineEvent::RequestComplete => Translation::Outcome(JobOutcome::Progress(1.0)),
        EngineEvent::ProcessingComplete => Translation::Finalize,
        EngineEvent::RequestError { reason } => {
            Translation::Outcome(JobOutcome::Failed(JobError::engine(reason.clone())))
        }
        EngineEvent::ProcessingCancelled => Translation::Cancelled,
        _ => Translation::Ignored,
    }
}

fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}
