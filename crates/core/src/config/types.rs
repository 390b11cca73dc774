use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::job::{Detail, FeatureSensitivity, SampleOrdering};
use crate::orchestrator::JobsConfig;
use crate::selection::OutputFormat;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub defaults: JobDefaults,
}

/// Job options used when the caller does not pick them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct JobDefaults {
    #[serde(default)]
    pub detail: Detail,
    #[serde(default)]
    pub sample_ordering: SampleOrdering,
    #[serde(default)]
    pub feature_sensitivity: FeatureSensitivity,
    #[serde(default)]
    pub format: OutputFormat,
}
