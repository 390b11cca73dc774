//! Job execution configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration shared by every job the supervisor runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Where single-file outputs are staged before relocation.
    /// Defaults to a `calcifer` directory inside the system temp dir.
    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    /// Capacity of each job's outcome channel.
    /// The job waits for the caller once this many outcomes are queued.
    #[serde(default = "default_outcome_buffer")]
    pub outcome_buffer: usize,
}

fn default_outcome_buffer() -> usize {
    64
}

impl JobsConfig {
    /// The effective staging directory.
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("calcifer"))
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            staging_dir: None,
            outcome_buffer: default_outcome_buffer(),
        }
    }
}
