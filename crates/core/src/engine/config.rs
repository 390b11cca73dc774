//! Engine process configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the external engine executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable. Looked up in `PATH` when relative.
    #[serde(default = "default_program")]
    pub program: PathBuf,

    /// Extra arguments placed before the job arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_program() -> PathBuf {
    PathBuf::from("photogrammetry-engine")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: Vec::new(),
        }
    }
}
