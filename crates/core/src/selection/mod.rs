//! Input folder and output destination selection.
//!
//! The pickers are collaborators of the caller: a failed or cancelled pick
//! never reaches the supervisor, so no job is started.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::job::{Detail, ParseEnumError};

/// File extensions accepted as input photos.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["heic", "jpeg", "jpg", "png"];

/// A folder of photos chosen as reconstruction input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFolder {
    pub path: PathBuf,
    pub image_count: usize,
    /// First image by name, shown as a preview.
    pub preview_image: Option<PathBuf>,
}

impl InputFolder {
    /// Folder name, used to derive output names.
    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputSelectError {
    #[error("input selection cancelled")]
    Cancelled,

    #[error("no images found in the selected folder")]
    NoImagesFound,

    #[error("input selection failed: {0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationSelectError {
    #[error("destination selection cancelled")]
    Cancelled,

    #[error("destination selection failed: {0}")]
    Other(String),
}

/// Shape of the produced model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// A single packaged `.usdz` file.
    #[default]
    Usdz,
    /// A directory of loose USDA and OBJ files.
    #[serde(rename = "usda_obj")]
    UsdaAndObj,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Usdz => "usdz",
            OutputFormat::UsdaAndObj => "usda_obj",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            OutputFormat::Usdz => "USDZ",
            OutputFormat::UsdaAndObj => "USDA + OBJ",
        }
    }

    /// Whether the engine writes into a directory rather than a file.
    pub fn writes_directory(&self) -> bool {
        matches!(self, OutputFormat::UsdaAndObj)
    }
}

impl FromStr for OutputFormat {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usdz" => Ok(OutputFormat::Usdz),
            "usda_obj" | "usda-obj" => Ok(OutputFormat::UsdaAndObj),
            _ => Err(ParseEnumError {
                kind: "output format",
                value: s.to_string(),
                expected: "usdz, usda_obj",
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chooses the folder of photos to reconstruct.
#[async_trait]
pub trait InputFolderPicker: Send + Sync {
    async fn pick_input_folder(&self) -> Result<InputFolder, InputSelectError>;
}

/// Chooses where the model is written.
#[async_trait]
pub trait DestinationPicker: Send + Sync {
    async fn pick_destination(
        &self,
        input: &InputFolder,
        format: OutputFormat,
        suggested_name: Option<&str>,
    ) -> Result<PathBuf, DestinationSelectError>;
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Lists the photos of a folder.
pub async fn scan_input_folder(path: &Path) -> Result<InputFolder, InputSelectError> {
    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| InputSelectError::Other(format!("{}: {}", path.display(), e)))?;

    let mut images = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| InputSelectError::Other(format!("{}: {}", path.display(), e)))?
    {
        let file = entry.path();
        if file.is_file() && is_image(&file) {
            images.push(file);
        }
    }

    if images.is_empty() {
        return Err(InputSelectError::NoImagesFound);
    }
    images.sort();
    debug!(folder = ?path, images = images.len(), "Scanned input folder");

    Ok(InputFolder {
        path: path.to_path_buf(),
        image_count: images.len(),
        preview_image: images.into_iter().next(),
    })
}

/// Default file name for a single-file model, `None` for directory output.
pub fn suggested_file_name(
    folder: &InputFolder,
    detail: Detail,
    format: OutputFormat,
) -> Option<String> {
    if format.writes_directory() {
        return None;
    }
    let stem = folder.name().unwrap_or("model");
    Some(format!("{}_{}.usdz", stem, detail.as_str()))
}
