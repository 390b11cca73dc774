//! Finalization of a job's output once the engine reports completion.

use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::job::{JobError, JobOutcome};
use crate::output_plan::{OutputPlan, Relocation};

/// Puts the output in place and produces the terminal outcome.
///
/// For a staged plan the temp file is moved to its final path and then
/// removed, whether or not the move succeeded. A failed removal is only
/// logged.
pub async fn finalize(plan: &OutputPlan) -> JobOutcome {
    let Some(relocation) = &plan.relocate_on_completion else {
        return JobOutcome::Completed(plan.write_target.clone());
    };

    let result = relocate(relocation).await;
    remove_staged(&relocation.temp_path).await;

    match result {
        Ok(()) => {
            info!(path = ?relocation.final_path, "Output relocated");
            JobOutcome::Completed(relocation.final_path.clone())
        }
        Err(e) => JobOutcome::Failed(JobError::IoFailure(format!(
            "failed to move {} to {}: {}",
            relocation.temp_path.display(),
            relocation.final_path.display(),
            e
        ))),
    }
}

/// Removes the staging file of a job that will not complete.
pub async fn discard(plan: &OutputPlan) {
    if let Some(relocation) = &plan.relocate_on_completion {
        remove_staged(&relocation.temp_path).await;
    }
}

async fn relocate(relocation: &Relocation) -> io::Result<()> {
    if try_atomic_move(&relocation.temp_path, &relocation.final_path).await? {
        return Ok(());
    }

    debug!(
        from = ?relocation.temp_path,
        to = ?relocation.final_path,
        "Staging area on another filesystem, copying output"
    );
    let content = fs::read(&relocation.temp_path).await?;
    fs::write(&relocation.final_path, content).await
}

/// Attempts a rename. `Ok(false)` means source and destination are on
/// different filesystems.
async fn try_atomic_move(source: &Path, destination: &Path) -> io::Result<bool> {
    match fs::rename(source, destination).await {
        Ok(()) => Ok(true),
        Err(e) => {
            // EXDEV is 18 on Linux
            if e.kind() == io::ErrorKind::CrossesDevices || e.raw_os_error() == Some(18) {
                Ok(false)
            } else {
                Err(e)
            }
        }
    }
}

async fn remove_staged(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(path = ?path, "Removed staging file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = ?path, "Failed to remove staging file: {}", e),
    }
}
