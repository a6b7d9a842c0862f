// Downloader engine boundary.
//
// The orchestrator only sees `Engine` / `EngineSession`; the yt-dlp subprocess
// binding lives in `ytdlp`. Anything that reports progress and log lines
// through an `EventSink` can stand in for it.

pub mod models;
pub mod ytdlp;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::bridge::EventSink;

pub use models::EngineOptions;
pub use ytdlp::YtDlpEngine;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine ran and reported a download-layer failure.
    #[error("DownloadError: {message}")]
    Download { message: String },

    #[error("I/O error while talking to the engine: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Download-layer failures as opposed to unclassified ones.
    pub fn is_download_error(&self) -> bool {
        matches!(self, EngineError::Download { .. })
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

pub trait Engine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Opens one session, shared by every URL of an attempt.
    fn open_session(&self, options: EngineOptions) -> Result<Box<dyn EngineSession>>;
}

#[async_trait]
pub trait EngineSession: Send {
    /// Downloads one URL, forwarding progress and log lines to `sink` in the order
    /// the engine produces them.
    async fn download(&mut self, url: &str, sink: &dyn EventSink) -> Result<()>;
}
