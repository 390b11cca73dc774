//! Error types for the engine adapter.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while creating an engine session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Input folder missing or not a directory.
    #[error("input folder is not a directory: {path}")]
    InvalidInput { path: PathBuf },

    /// The engine rejected the session configuration.
    #[error("configuration rejected: {reason}")]
    ConfigurationRejected { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    pub fn configuration_rejected(reason: impl Into<String>) -> Self {
        Self::ConfigurationRejected {
            reason: reason.into(),
        }
    }
}

/// Errors raised while submitting the processing request.
#[derive(Debug, Error)]
pub enum StartError {
    /// The engine process could not be spawned.
    #[error("failed to spawn engine {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A request was already submitted on this session.
    #[error("session already processing")]
    AlreadyStarted,

    /// The engine rejected the request.
    #[error("request rejected: {reason}")]
    Rejected { reason: String },
}

impl StartError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}
