//! Job orchestrator: the lifecycle state machine of one reconstruction job.
//!
//! The orchestrator starts the engine session, consumes its event stream
//! through the translator and emits a linear sequence of outcomes:
//! - any number of `Progress` values,
//! - then at most one terminal `Completed` or `Failed`.
//!
//! Cancellation is silent: a cancelled job just ends its outcome stream.

mod config;
mod handle;
mod runner;

pub use config::JobsConfig;
pub use handle::JobHandle;
pub use runner::JobOrchestrator;
