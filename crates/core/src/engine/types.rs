//! Types exchanged with a reconstruction engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::job::{Detail, FeatureSensitivity, SampleOrdering};

/// Session-wide engine configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub sample_ordering: SampleOrdering,
    pub feature_sensitivity: FeatureSensitivity,
}

/// The single model request submitted to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRequest {
    /// File or directory the engine writes the model to.
    pub output: PathBuf,
    pub detail: Detail,
}

/// An event pushed by the engine while a session runs.
///
/// On the wire this is a JSON object tagged by `event`, e.g.
/// `{"event":"request_progress","fraction":0.25}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    RequestProgress {
        fraction: f64,
    },
    /// The request finished; the session may still be wrapping up.
    RequestComplete,
    /// All work is done and the output is written.
    ProcessingComplete,
    RequestError {
        reason: String,
    },
    ProcessingCancelled,
    InputComplete,
    AutomaticDownsampling,
    SkippedSample {
        id: u64,
    },
    InvalidSample {
        id: u64,
        reason: String,
    },
    StitchingIncomplete,
    ProgressInfo {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        estimated_remaining_secs: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
    },
}

impl EngineEvent {
    /// Whether the engine emits nothing meaningful after this event.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineEvent::ProcessingComplete
                | EngineEvent::RequestError { .. }
                | EngineEvent::ProcessingCancelled
        )
    }

    /// Events that carry no outcome for the job.
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            EngineEvent::InputComplete
                | EngineEvent::AutomaticDownsampling
                | EngineEvent::SkippedSample { .. }
                | EngineEvent::InvalidSample { .. }
                | EngineEvent::StitchingIncomplete
                | EngineEvent::ProgressInfo { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::RequestProgress { .. } => "request_progress",
            EngineEvent::RequestComplete => "request_complete",
            EngineEvent::ProcessingComplete => "processing_complete",
            EngineEvent::RequestError { .. } => "request_error",
            EngineEvent::ProcessingCancelled => "processing_cancelled",
            EngineEvent::InputComplete => "input_complete",
            EngineEvent::AutomaticDownsampling => "automatic_downsampling",
            EngineEvent::SkippedSample { .. } => "skipped_sample",
            EngineEvent::InvalidSample { .. } => "invalid_sample",
            EngineEvent::StitchingIncomplete => "stitching_incomplete",
            EngineEvent::ProgressInfo { .. } => "progress_info",
        }
    }
}

/// Producing side of a session's event stream.
pub type EventSender = mpsc::UnboundedSender<EngineEvent>;

/// Consuming side of a session's event stream.
///
/// Ends when the producer is dropped.
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Create a connected event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
