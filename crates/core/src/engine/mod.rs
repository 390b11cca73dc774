//! Engine adapter for the external photogrammetry engine.
//!
//! This module provides the `ReconstructionEngine` trait the job core is
//! written against, and `ProcessEngine`, an implementation that drives an
//! engine executable and reads its event stream from stdout.
//!
//! # Example
//!
//! ```ignore
//! use calcifer_core::engine::{ProcessEngine, ReconstructionEngine, ProcessRequest, SessionConfig};
//!
//! let engine = ProcessEngine::with_defaults();
//! let mut session = engine.create_session(Path::new("/photos"), &SessionConfig::default()).await?;
//! engine.start_processing(&mut session, ProcessRequest {
//!     output: PathBuf::from("/tmp/model.usdz"),
//!     detail: Detail::Medium,
//! }).await?;
//!
//! let mut events = engine.events(&mut session).unwrap();
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.name());
//! }
//! engine.release(session).await;
//! ```

mod config;
mod error;
mod process;
mod traits;
mod types;

pub use config::EngineConfig;
pub use error::{SessionError, StartError};
pub use process::{parse_event_line, ProcessEngine, ProcessSession};
pub use traits::ReconstructionEngine;
pub use types::{
    event_channel, EngineEvent, EventReceiver, EventSender, ProcessRequest, SessionConfig,
};
