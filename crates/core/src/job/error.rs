//! Error types for reconstruction jobs.

use thiserror::Error;

/// Errors a job can end with, or that reject a start request outright.
///
/// Every variant carries a human-readable reason. Engine reason strings are
/// passed through verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    /// Another job is still active in the requested slot.
    #[error("a job is already running in slot '{slot}'")]
    SlotBusy { slot: String },

    /// The engine refused to create a session for the input folder.
    #[error("failed to create session: {0}")]
    SessionCreationFailed(String),

    /// The engine rejected the processing request.
    #[error("failed to start processing: {0}")]
    ProcessStartFailed(String),

    /// The engine reported an error while processing.
    #[error("engine error: {0}")]
    EngineReported(String),

    /// Staging or relocation of the output failed.
    #[error("I/O error: {0}")]
    IoFailure(String),
}

impl JobError {
    /// Creates a slot busy error.
    pub fn slot_busy(slot: impl Into<String>) -> Self {
        Self::SlotBusy { slot: slot.into() }
    }

    /// Creates an engine reported error.
    pub fn engine(reason: impl Into<String>) -> Self {
        Self::EngineReported(reason.into())
    }
}
