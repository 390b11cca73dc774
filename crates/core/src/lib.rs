pub mod config;
pub mod engine;
pub mod job;
pub mod orchestrator;
pub mod output_plan;
pub mod selection;
pub mod supervisor;
pub mod testing;
pub mod translator;

pub use config::{
    load_config, load_config_from_str, load_config_layered, validate_config, Config, ConfigError,
    JobDefaults,
};
pub use engine::{
    EngineConfig, EngineEvent, ProcessEngine, ReconstructionEngine, SessionError, StartError,
};
pub use job::{
    Detail, FeatureSensitivity, JobError, JobId, JobOutcome, JobParameters, JobState,
    SampleOrdering,
};
pub use orchestrator::{JobHandle, JobOrchestrator, JobsConfig};
pub use output_plan::{OutputPlan, Relocation};
pub use selection::{
    scan_input_folder, suggested_file_name, DestinationPicker, DestinationSelectError,
    InputFolder, InputFolderPicker, InputSelectError, OutputFormat,
};
pub use supervisor::{JobSupervisor, SlotId, SlotStatus};
