use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::AppError;
use crate::utils::normalize_youtube_url;

/// Maximum video height a download may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Quality {
    #[default]
    Best,
    P1080,
    P720,
    P480,
    P360,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::Best,
        Quality::P1080,
        Quality::P720,
        Quality::P480,
        Quality::P360,
    ];

    /// `None` means unrestricted.
    pub fn max_height(self) -> Option<u32> {
        match self {
            Quality::Best => None,
            Quality::P1080 => Some(1080),
            Quality::P720 => Some(720),
            Quality::P480 => Some(480),
            Quality::P360 => Some(360),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_height() {
            Some(height) => write!(f, "{}", height),
            None => write!(f, "best"),
        }
    }
}

/// A validated batch of downloads. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    urls: Vec<String>,
    output_directory: PathBuf,
    quality: Quality,
    audio_only: bool,
    allow_playlist: bool,
    use_cookies: bool,
}

impl DownloadRequest {
    /// Normalizes every candidate and drops the ones that are not YouTube links.
    pub fn new<I, S>(
        candidates: I,
        output_directory: impl Into<PathBuf>,
        quality: Quality,
        audio_only: bool,
        allow_playlist: bool,
        use_cookies: bool,
    ) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let output_directory = output_directory.into();
        if output_directory.as_os_str().is_empty() {
            return Err(AppError::EmptyOutputDirectory);
        }

        let urls: Vec<String> = candidates
            .into_iter()
            .map(|candidate| normalize_youtube_url(candidate.as_ref()))
            .filter(|url| !url.is_empty())
            .collect();

        if urls.is_empty() {
            return Err(AppError::NoValidUrls);
        }

        Ok(Self {
            urls,
            output_directory,
            quality,
            audio_only,
            allow_playlist,
            use_cookies,
        })
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn audio_only(&self) -> bool {
        self.audio_only
    }

    pub fn allow_playlist(&self) -> bool {
        self.allow_playlist
    }

    pub fn use_cookies(&self) -> bool {
        self.use_cookies
    }
}

/// Browsers whose cookie store the engine knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Browser {
    Chrome,
    Edge,
    Firefox,
    Chromium,
    Brave,
}

impl Browser {
    pub fn as_str(self) -> &'static str {
        match self {
            Browser::Chrome => "chrome",
            Browser::Edge => "edge",
            Browser::Firefox => "firefox",
            Browser::Chromium => "chromium",
            Browser::Brave => "brave",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-processing directive handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostStep {
    /// Merge separate video and audio streams into one container.
    MergeInto { container: &'static str },
    /// Drop the video and transcode the audio track.
    ExtractAudio { codec: &'static str },
}

/// Everything one attempt needs. A new plan is built for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptPlan {
    pub format_expression: String,
    pub cookie_browser: Option<Browser>,
    pub post_steps: Vec<PostStep>,
}

impl AttemptPlan {
    pub fn build(request: &DownloadRequest, cookie_browser: Option<Browser>) -> Self {
        let format_expression = crate::application::format_selector::format_expression(
            request.quality(),
            request.audio_only(),
        );

        let post_steps = if request.audio_only() {
            vec![PostStep::ExtractAudio { codec: "mp3" }]
        } else {
            vec![PostStep::MergeInto { container: "mp4" }]
        };

        Self {
            format_expression,
            cookie_browser,
            post_steps,
        }
    }

    pub fn with_cookies(&self) -> bool {
        self.cookie_browser.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Downloading {
        percent: u8,
        speed: String,
        eta: String,
    },
    PostProcessing,
    LogLine {
        text: String,
        severity: Severity,
    },
    Completed {
        success: bool,
    },
}

impl ProgressEvent {
    /// Progress reset emitted before each URL starts.
    pub fn reset() -> Self {
        ProgressEvent::Downloading {
            percent: 0,
            speed: String::new(),
            eta: String::new(),
        }
    }

    pub fn log(severity: Severity, text: impl Into<String>) -> Self {
        ProgressEvent::LogLine {
            text: text.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Preparing,
    AttemptingWithCookies,
    AttemptingWithoutCookies,
    Succeeded,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Succeeded | RunPhase::Failed)
    }
}

/// Terminal result of one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub success: bool,
    pub reason: String,
    /// Batch attempts made against the engine (0 when preparation failed).
    pub attempts: u8,
}

impl RunOutcome {
    pub fn succeeded(attempts: u8) -> Self {
        Self {
            success: true,
            reason: "All downloads finished".to_string(),
            attempts,
        }
    }

    pub fn failed(reason: impl Into<String>, attempts: u8) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            attempts,
        }
    }

    pub fn phase(&self) -> RunPhase {
        if self.success {
            RunPhase::Succeeded
        } else {
            RunPhase::Failed
        }
    }
}
