//! Trait definitions for the engine adapter.

use async_trait::async_trait;
use std::path::Path;

use super::error::{SessionError, StartError};
use super::types::{EventReceiver, ProcessRequest, SessionConfig};

/// A photogrammetry engine that turns a folder of photos into a model.
///
/// The core only relies on this contract. A session is a single-owner value:
/// the orchestrator holds it for the lifetime of the job and hands it back
/// through [`ReconstructionEngine::release`] exactly once.
#[async_trait]
pub trait ReconstructionEngine: Send + Sync {
    /// Engine-owned handle for one configured run.
    type Session: Send + Sync + 'static;

    /// Returns the name of this engine implementation.
    fn name(&self) -> &str;

    /// Creates a session over the input folder.
    async fn create_session(
        &self,
        input_folder: &Path,
        config: &SessionConfig,
    ) -> Result<Self::Session, SessionError>;

    /// Submits the single processing request of a session.
    async fn start_processing(
        &self,
        session: &mut Self::Session,
        request: ProcessRequest,
    ) -> Result<(), StartError>;

    /// Takes the consuming side of the session's event stream.
    ///
    /// Returns `None` if the stream was already taken.
    fn events(&self, session: &mut Self::Session) -> Option<EventReceiver>;

    /// Asks the engine to stop. Best-effort and idempotent; the event
    /// stream still has to settle on its own.
    async fn cancel(&self, session: &Self::Session);

    /// Releases the session once the job is over.
    async fn release(&self, session: Self::Session) {
        drop(session);
    }
}
