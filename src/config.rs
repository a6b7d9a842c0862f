use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Overrides the engine program (name on PATH or absolute path).
pub const ENGINE_ENV: &str = "YTDL_DESK_ENGINE";
/// Overrides the output directory pre-filled in the UI.
pub const OUTPUT_ENV: &str = "YTDL_DESK_OUTPUT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// Process-wide settings, built once at start-up and passed down explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub platform: Platform,
    /// Downloader engine program, resolved against PATH at preflight.
    pub engine_program: PathBuf,
    /// Media transcoder program the engine needs for merging and extraction.
    pub transcoder_program: PathBuf,
    pub default_output_dir: PathBuf,
    pub retries: u32,
    pub fragment_retries: u32,
    pub concurrent_fragments: u32,
    /// How often buffered log lines are pushed to the log view.
    pub log_flush_interval: Duration,
    /// Lines kept in the log view before the oldest are dropped.
    pub log_history_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            engine_program: PathBuf::from("yt-dlp"),
            transcoder_program: PathBuf::from("ffmpeg"),
            default_output_dir: PathBuf::from("."),
            retries: 15,
            fragment_retries: 15,
            concurrent_fragments: 1,
            log_flush_interval: Duration::from_millis(100),
            log_history_limit: 5_000,
        }
    }
}

impl AppConfig {
    /// Builds the config from the host platform and process environment.
    pub fn detect() -> Self {
        Self::from_env(Platform::current(), |key| std::env::var_os(key))
    }

    pub fn from_env(platform: Platform, env: impl Fn(&str) -> Option<OsString>) -> Self {
        let engine_program = env(ENGINE_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("yt-dlp"));

        let default_output_dir = env(OUTPUT_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::video_dir)
            .or_else(|| dirs::home_dir().map(|home| home.join("Videos")))
            .unwrap_or_else(|| PathBuf::from("."));

        let config = Self {
            platform,
            engine_program,
            default_output_dir,
            ..Self::default()
        };

        tracing::debug!(?config, "configuration loaded");
        config
    }
}
