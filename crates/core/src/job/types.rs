//! Types describing a reconstruction job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::error::JobError;

/// Error returned when a string does not name a known option.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Level of detail of the produced model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Detail {
    Preview,
    Reduced,
    #[default]
    Medium,
    Full,
    Raw,
}

impl Detail {
    pub const ALL: [Detail; 5] = [
        Detail::Preview,
        Detail::Reduced,
        Detail::Medium,
        Detail::Full,
        Detail::Raw,
    ];

    /// Returns the string representation used in config and engine arguments.
    pub fn as_str(&self) -> &'static str {
        match self {
            Detail::Preview => "preview",
            Detail::Reduced => "reduced",
            Detail::Medium => "medium",
            Detail::Full => "full",
            Detail::Raw => "raw",
        }
    }

    /// Display title.
    pub fn title(&self) -> &'static str {
        match self {
            Detail::Preview => "Preview",
            Detail::Reduced => "Reduced",
            Detail::Medium => "Medium",
            Detail::Full => "Full",
            Detail::Raw => "Raw",
        }
    }
}

impl FromStr for Detail {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Detail::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "detail",
                value: s.to_string(),
                expected: "preview, reduced, medium, full, raw",
            })
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the input photos were taken in sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleOrdering {
    #[default]
    Unordered,
    Sequential,
}

impl SampleOrdering {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleOrdering::Unordered => "unordered",
            SampleOrdering::Sequential => "sequential",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SampleOrdering::Unordered => "Unordered",
            SampleOrdering::Sequential => "Sequential",
        }
    }
}

impl FromStr for SampleOrdering {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unordered" => Ok(SampleOrdering::Unordered),
            "sequential" => Ok(SampleOrdering::Sequential),
            _ => Err(ParseEnumError {
                kind: "sample ordering",
                value: s.to_string(),
                expected: "unordered, sequential",
            }),
        }
    }
}

impl fmt::Display for SampleOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How aggressively the engine looks for features in low-contrast images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSensitivity {
    #[default]
    Normal,
    High,
}

impl FeatureSensitivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSensitivity::Normal => "normal",
            FeatureSensitivity::High => "high",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FeatureSensitivity::Normal => "Normal",
            FeatureSensitivity::High => "High",
        }
    }
}

impl FromStr for FeatureSensitivity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(FeatureSensitivity::Normal),
            "high" => Ok(FeatureSensitivity::High),
            _ => Err(ParseEnumError {
                kind: "feature sensitivity",
                value: s.to_string(),
                expected: "normal, high",
            }),
        }
    }
}

impl fmt::Display for FeatureSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to start one reconstruction job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    /// Folder containing the input photos.
    pub input_folder: PathBuf,
    /// Output file, or an existing directory for multi-file output.
    pub output_destination: PathBuf,
    pub detail: Detail,
    pub sample_ordering: SampleOrdering,
    pub feature_sensitivity: FeatureSensitivity,
}

impl JobParameters {
    /// Create parameters with default options.
    pub fn new(input_folder: impl Into<PathBuf>, output_destination: impl Into<PathBuf>) -> Self {
        Self {
            input_folder: input_folder.into(),
            output_destination: output_destination.into(),
            detail: Detail::default(),
            sample_ordering: SampleOrdering::default(),
            feature_sensitivity: FeatureSensitivity::default(),
        }
    }

    pub fn with_detail(mut self, detail: Detail) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_sample_ordering(mut self, ordering: SampleOrdering) -> Self {
        self.sample_ordering = ordering;
        self
    }

    pub fn with_feature_sensitivity(mut self, sensitivity: FeatureSensitivity) -> Self {
        self.feature_sensitivity = sensitivity;
        self
    }
}

/// Unique identifier of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Created, not yet started.
    Idle,
    /// Creating the engine session and submitting the request.
    Starting,
    /// Consuming engine events.
    Running,
    /// Output is in place.
    Completed,
    /// Ended with an error.
    Failed,
    /// Stopped at the caller's request.
    Cancelled,
}

impl JobState {
    /// Terminal states are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Starting => "starting",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value emitted to the caller while a job runs.
///
/// `Completed` and `Failed` are terminal: nothing follows them.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Fraction complete, `0.0..=1.0`. Not guaranteed to be monotonic.
    Progress(f64),
    /// The model is at this path.
    Completed(PathBuf),
    Failed(JobError),
}

impl JobOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobOutcome::Progress(_))
    }

    /// The final file path, if this is a completion.
    pub fn completed_path(&self) -> Option<&Path> {
        match self {
            JobOutcome::Completed(path) => Some(path),
            _ => None,
        }
    }
}
