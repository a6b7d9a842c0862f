use std::path::{Path, PathBuf};

use crate::config::{AppConfig, Platform};
use crate::domain::AppError;

/// External programs a run needs, resolved to absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub engine: PathBuf,
    pub transcoder: PathBuf,
}

/// Locates the transcoder and the engine before a run starts.
///
/// Runs on every start request, so tools installed while the app is open are picked up.
pub fn check_tools(config: &AppConfig) -> Result<ToolPaths, AppError> {
    let transcoder = locate(&config.transcoder_program).ok_or_else(|| AppError::MissingTool {
        tool: "FFmpeg",
        hint: transcoder_install_hint(config.platform),
    })?;

    let engine = locate(&config.engine_program).ok_or_else(|| AppError::MissingTool {
        tool: "yt-dlp",
        hint: engine_install_hint(config.platform),
    })?;

    tracing::info!(engine = %engine.display(), transcoder = %transcoder.display(), "tools located");
    Ok(ToolPaths { engine, transcoder })
}

fn locate(program: &Path) -> Option<PathBuf> {
    match which::which(program) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!(program = %program.display(), error = %e, "tool not found");
            None
        }
    }
}

pub fn transcoder_install_hint(platform: Platform) -> String {
    match platform {
        Platform::Windows => "Install it on Windows with:\n\
             winget install Gyan.FFmpeg\n\n\
             Then restart the terminal or Explorer."
            .to_string(),
        Platform::MacOs => "Install it on macOS with:\nbrew install ffmpeg".to_string(),
        Platform::Linux => "Install it on Linux with:\nsudo apt install ffmpeg".to_string(),
    }
}

pub fn engine_install_hint(platform: Platform) -> String {
    match platform {
        Platform::Windows => "Install it on Windows with:\nwinget install yt-dlp.yt-dlp".to_string(),
        Platform::MacOs => "Install it on macOS with:\nbrew install yt-dlp".to_string(),
        Platform::Linux => "Install it on Linux with:\npython3 -m pip install -U yt-dlp".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_transcoder_reported_first() {
        let config = AppConfig {
            transcoder_program: PathBuf::from("definitely-not-a-transcoder-4821"),
            engine_program: PathBuf::from("definitely-not-an-engine-4821"),
            platform: Platform::Linux,
            ..AppConfig::default()
        };

        match check_tools(&config) {
            Err(AppError::MissingTool { tool, hint }) => {
                assert_eq!(tool, "FFmpeg");
                assert!(hint.contains("apt install ffmpeg"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_engine_after_transcoder_found() {
        let config = AppConfig {
            transcoder_program: PathBuf::from("sh"),
            engine_program: PathBuf::from("definitely-not-an-engine-4821"),
            platform: Platform::MacOs,
            ..AppConfig::default()
        };

        match check_tools(&config) {
            Err(AppError::MissingTool { tool, hint }) => {
                assert_eq!(tool, "yt-dlp");
                assert!(hint.contains("brew install yt-dlp"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_all_tools_found() {
        let config = AppConfig {
            transcoder_program: PathBuf::from("sh"),
            engine_program: PathBuf::from("sh"),
            ..AppConfig::default()
        };

        let tools = check_tools(&config).unwrap();
        assert!(tools.engine.is_absolute());
        assert!(tools.transcoder.is_absolute());
    }

    #[test]
    fn test_windows_hint_mentions_winget() {
        assert!(transcoder_install_hint(Platform::Windows).contains("winget install Gyan.FFmpeg"));
    }
}
