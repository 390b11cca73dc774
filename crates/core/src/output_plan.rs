//! Output planning: direct vs staged writes.
//!
//! The engine has two physical output modes. A directory destination gets a
//! set of loose files written in place. A single-file destination is written
//! into a staging area first and relocated once the engine reports
//! completion, so a partially written file never shows up at the path the
//! user chose.

use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// File name used when the destination has none and is not a directory.
const FALLBACK_FILE_NAME: &str = "model";

/// Move from the staging area to the final destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub temp_path: PathBuf,
    pub final_path: PathBuf,
}

/// Where the engine writes, and what happens afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPlan {
    /// Path handed to the engine.
    pub write_target: PathBuf,
    /// Set when `write_target` is a staging file.
    pub relocate_on_completion: Option<Relocation>,
}

impl OutputPlan {
    /// Resolve against the system temp directory.
    pub fn resolve(destination: &Path) -> Self {
        Self::resolve_in(destination, &std::env::temp_dir())
    }

    /// Resolve against an explicit staging directory.
    ///
    /// `Path::is_dir` returns false when the metadata lookup fails, which
    /// puts unreadable destinations in staged mode.
    pub fn resolve_in(destination: &Path, staging_dir: &Path) -> Self {
        if destination.is_dir() {
            return Self {
                write_target: destination.to_path_buf(),
                relocate_on_completion: None,
            };
        }

        let file_name = destination
            .file_name()
            .unwrap_or_else(|| OsStr::new(FALLBACK_FILE_NAME));
        let temp_path = staging_dir.join(file_name);

        Self {
            write_target: temp_path.clone(),
            relocate_on_completion: Some(Relocation {
                temp_path,
                final_path: destination.to_path_buf(),
            }),
        }
    }

    /// Whether the output goes through a staging file.
    pub fn is_staged(&self) -> bool {
        self.relocate_on_completion.is_some()
    }

    /// The path reported to the caller on completion.
    pub fn final_path(&self) -> &Path {
        match &self.relocate_on_completion {
            Some(relocation) => &relocation.final_path,
            None => &self.write_target,
        }
    }
}
