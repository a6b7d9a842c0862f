use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Please enter a valid YouTube URL")]
    InvalidUrl,

    #[error("No valid YouTube URLs found")]
    NoValidUrls,

    #[error("Please choose an output directory")]
    EmptyOutputDirectory,

    #[error("Could not read batch file {path}: {reason}")]
    BatchFile { path: PathBuf, reason: String },

    #[error("{tool} is not installed.\n\n{hint}")]
    MissingTool { tool: &'static str, hint: String },

    #[error("Could not create output directory {path}: {reason}")]
    OutputDirectory { path: PathBuf, reason: String },
}

impl AppError {
    /// Short title for dialogs.
    pub fn title(&self) -> &'static str {
        match self {
            AppError::InvalidUrl | AppError::NoValidUrls | AppError::EmptyOutputDirectory => {
                "Invalid input"
            }
            AppError::BatchFile { .. } => "Batch file",
            AppError::MissingTool { .. } => "Missing tool",
            AppError::OutputDirectory { .. } => "Output directory",
        }
    }
}
