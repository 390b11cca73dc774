//! Testing utilities and mock implementations.
//!
//! This module provides a mock implementation of the engine trait, so the
//! job lifecycle can be exercised end to end without a real engine.
//!
//! # Example
//!
//! ```rust,ignore
//! use calcifer_core::testing::MockEngine;
//!
//! let engine = Arc::new(MockEngine::new());
//! engine.set_script(vec![EngineEvent::ProcessingComplete]).await;
//!
//! let supervisor = JobSupervisor::new(engine.clone(), JobsConfig::default());
//! ```

mod mock_engine;

pub use mock_engine::{MockEngine, MockSession, RecordedSession};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    /// Create a folder of placeholder photos named `IMG_0001.jpg`, ...
    pub fn photo_folder(parent: &Path, name: &str, count: usize) -> std::io::Result<PathBuf> {
        let folder = parent.join(name);
        std::fs::create_dir_all(&folder)?;
        for i in 1..=count {
            std::fs::write(folder.join(format!("IMG_{:04}.jpg", i)), b"jpeg")?;
        }
        Ok(folder)
    }
}
