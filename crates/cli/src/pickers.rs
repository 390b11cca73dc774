//! Pickers backed by command-line arguments.

use async_trait::async_trait;
use std::path::PathBuf;

use calcifer_core::{
    scan_input_folder, DestinationPicker, DestinationSelectError, InputFolder, InputFolderPicker,
    InputSelectError, OutputFormat,
};

/// Uses the `--input` folder.
pub struct ArgInputPicker {
    path: PathBuf,
}

impl ArgInputPicker {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl InputFolderPicker for ArgInputPicker {
    async fn pick_input_folder(&self) -> Result<InputFolder, InputSelectError> {
        scan_input_folder(&self.path).await
    }
}

/// Uses the `--output` path, or the suggested name inside the input folder.
pub struct ArgDestinationPicker {
    output: Option<PathBuf>,
}

impl ArgDestinationPicker {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }
}

#[async_trait]
impl DestinationPicker for ArgDestinationPicker {
    async fn pick_destination(
        &self,
        input: &InputFolder,
        format: OutputFormat,
        suggested_name: Option<&str>,
    ) -> Result<PathBuf, DestinationSelectError> {
        if format.writes_directory() {
            let Some(dir) = &self.output else {
                return Err(DestinationSelectError::Other(
                    "directory output requires --output".to_string(),
                ));
            };
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                DestinationSelectError::Other(format!("{}: {}", dir.display(), e))
            })?;
            return Ok(dir.clone());
        }

        let name = suggested_name.unwrap_or("model.usdz");
        match &self.output {
            Some(path) if path.is_dir() => Ok(path.join(name)),
            Some(path) => Ok(path.clone()),
            None => Ok(input.path.join(name)),
        }
    }
}
