use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::models::{EngineOptions, RawProgress, PROGRESS_MARKER};
use super::{Engine, EngineError, EngineSession, Result};
use crate::application::bridge::EventSink;
use crate::domain::{ProgressEvent, Severity};

/// yt-dlp driven as an external process.
#[derive(Debug, Clone)]
pub struct YtDlpEngine {
    program: PathBuf,
    transcoder: Option<PathBuf>,
}

impl YtDlpEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            transcoder: None,
        }
    }

    /// Points yt-dlp at a specific ffmpeg binary.
    pub fn with_transcoder(mut self, transcoder: impl Into<PathBuf>) -> Self {
        self.transcoder = Some(transcoder.into());
        self
    }
}

impl Engine for YtDlpEngine {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn open_session(&self, options: EngineOptions) -> Result<Box<dyn EngineSession>> {
        let mut args = options.to_args();
        if let Some(transcoder) = &self.transcoder {
            args.push("--ffmpeg-location".to_string());
            args.push(transcoder.to_string_lossy().into_owned());
        }

        tracing::debug!(program = %self.program.display(), ?args, "engine session opened");

        Ok(Box::new(YtDlpSession {
            program: self.program.clone(),
            args,
        }))
    }
}

/// Arguments are rendered once per attempt and reused for every URL.
struct YtDlpSession {
    program: PathBuf,
    args: Vec<String>,
}

#[async_trait]
impl EngineSession for YtDlpSession {
    async fn download(&mut self, url: &str, sink: &dyn EventSink) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("engine stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("engine stderr not captured"))?;

        let mut stdout_lines = BufReader::new(stdout).lines();
        let mut stderr_lines = BufReader::new(stderr).lines();
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut last_error: Option<String> = None;

        while stdout_open || stderr_open {
            tokio::select! {
                line = stdout_lines.next_line(), if stdout_open => match line {
                    Ok(Some(line)) => {
                        if let Some(event) = translate_stdout_line(&line) {
                            sink.emit(event);
                        }
                    }
                    Ok(None) => stdout_open = false,
                    Err(e) => {
                        tracing::warn!(error = %e, "engine stdout unreadable");
                        stdout_open = false;
                    }
                },
                line = stderr_lines.next_line(), if stderr_open => match line {
                    Ok(Some(line)) => {
                        if let Some(event) = translate_stderr_line(&line) {
                            if let ProgressEvent::LogLine { text, severity: Severity::Error } = &event {
                                last_error = Some(text.clone());
                            }
                            sink.emit(event);
                        }
                    }
                    Ok(None) => stderr_open = false,
                    Err(e) => {
                        tracing::warn!(error = %e, "engine stderr unreadable");
                        stderr_open = false;
                    }
                },
            }
        }

        let status = child.wait().await?;
        tracing::debug!(%url, ?status, "engine exited");

        if status.success() {
            Ok(())
        } else {
            Err(EngineError::Download {
                message: last_error
                    .unwrap_or_else(|| format!("yt-dlp exited with {}", status)),
            })
        }
    }
}

/// Maps one stdout line to an event: progress records or plain log lines.
pub fn translate_stdout_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return None;
    }

    if line.trim_start().starts_with(PROGRESS_MARKER) {
        return RawProgress::parse(line).and_then(RawProgress::into_event);
    }

    let severity = if line.starts_with("[debug]") {
        Severity::Debug
    } else {
        Severity::Info
    };
    Some(ProgressEvent::log(severity, line))
}

/// Maps one stderr line to a log event, keyed on yt-dlp's `WARNING:` / `ERROR:` prefixes.
pub fn translate_stderr_line(line: &str) -> Option<ProgressEvent> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return None;
    }

    if let Some(rest) = line.strip_prefix("ERROR:") {
        return Some(ProgressEvent::log(Severity::Error, rest.trim()));
    }
    if let Some(rest) = line.strip_prefix("WARNING:") {
        return Some(ProgressEvent::log(Severity::Warning, rest.trim()));
    }
    if line.starts_with("[debug]") {
        return Some(ProgressEvent::log(Severity::Debug, line));
    }
    Some(ProgressEvent::log(Severity::Info, line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::bridge::testing::RecordingSink;
    use crate::domain::PostStep;

    fn options() -> EngineOptions {
        EngineOptions {
            format: "ba/b".to_string(),
            output_template: "/tmp/%(title).200B [%(id)s].%(ext)s".to_string(),
            allow_playlist: false,
            retries: 15,
            fragment_retries: 15,
            concurrent_fragments: 1,
            cookie_browser: None,
            post_steps: vec![PostStep::ExtractAudio { codec: "mp3" }],
        }
    }

    #[test]
    fn test_translate_stdout() {
        assert_eq!(translate_stdout_line("   "), None);
        assert_eq!(
            translate_stdout_line("[youtube] abc: Downloading webpage"),
            Some(ProgressEvent::log(Severity::Info, "[youtube] abc: Downloading webpage"))
        );
        assert_eq!(
            translate_stdout_line("[debug] Command-line config"),
            Some(ProgressEvent::log(Severity::Debug, "[debug] Command-line config"))
        );
        assert_eq!(
            translate_stdout_line("[progress]finished|1|1|NA|NA|NA"),
            Some(ProgressEvent::PostProcessing)
        );
        assert_eq!(translate_stdout_line("[progress]error|1|1|NA|NA|NA"), None);
    }

    #[test]
    fn test_translate_stderr() {
        assert_eq!(
            translate_stderr_line("ERROR: [youtube] abc: Video unavailable"),
            Some(ProgressEvent::log(Severity::Error, "[youtube] abc: Video unavailable"))
        );
        assert_eq!(
            translate_stderr_line("WARNING: falling back to generic"),
            Some(ProgressEvent::log(Severity::Warning, "falling back to generic"))
        );
        assert_eq!(
            translate_stderr_line("something else"),
            Some(ProgressEvent::log(Severity::Info, "something else"))
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let engine = YtDlpEngine::new("/nonexistent/yt-dlp-4821");
        let mut session = engine.open_session(options()).unwrap();
        let sink = RecordingSink::default();

        let err = session
            .download("https://www.youtube.com/watch?v=dQw4w9WgXcQ", &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
        assert!(!err.is_download_error());
    }

    #[cfg(unix)]
    fn fake_engine(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_forwards_engine_output_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_engine(
            dir.path(),
            "echo '[youtube] abc: Downloading webpage'\n\
             echo '[progress]downloading|25|100|NA|1.00MiB/s|00:03'\n\
             echo '[progress]downloading|100|100|NA|1.00MiB/s|00:00'\n\
             echo '[progress]finished|100|100|NA|NA|NA'\n\
             exit 0",
        );

        let engine = YtDlpEngine::new(program);
        let mut session = engine.open_session(options()).unwrap();
        let sink = RecordingSink::default();

        session
            .download("https://www.youtube.com/watch?v=abc123XYZ", &sink)
            .await
            .unwrap();

        assert_eq!(
            sink.events(),
            vec![
                ProgressEvent::log(Severity::Info, "[youtube] abc: Downloading webpage"),
                ProgressEvent::Downloading {
                    percent: 25,
                    speed: "1.00MiB/s".to_string(),
                    eta: "00:03".to_string(),
                },
                ProgressEvent::Downloading {
                    percent: 100,
                    speed: "1.00MiB/s".to_string(),
                    eta: "00:00".to_string(),
                },
                ProgressEvent::PostProcessing,
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_engine(
            dir.path(),
            "echo 'ERROR: [youtube] abc: Sign in to confirm your age' >&2\nexit 1",
        );

        let engine = YtDlpEngine::new(program);
        let mut session = engine.open_session(options()).unwrap();
        let sink = RecordingSink::default();

        let err = session
            .download("https://www.youtube.com/watch?v=abc123XYZ", &sink)
            .await
            .unwrap_err();

        assert!(err.is_download_error());
        assert_eq!(
            err.to_string(),
            "DownloadError: [youtube] abc: Sign in to confirm your age"
        );
        assert_eq!(
            sink.events(),
            vec![ProgressEvent::log(
                Severity::Error,
                "[youtube] abc: Sign in to confirm your age"
            )]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_session_passes_url_last() {
        let dir = tempfile::tempdir().unwrap();
        // Echo the final argument back so the test can see what the session passed.
        let program = fake_engine(dir.path(), "for last; do :; done\necho \"url=$last\"");

        let engine = YtDlpEngine::new(program).with_transcoder("/usr/bin/ffmpeg");
        let mut session = engine.open_session(options()).unwrap();
        let sink = RecordingSink::default();

        session
            .download("https://www.youtube.com/watch?v=abc123XYZ", &sink)
            .await
            .unwrap();

        assert_eq!(
            sink.events(),
            vec![ProgressEvent::log(
                Severity::Info,
                "url=https://www.youtube.com/watch?v=abc123XYZ"
            )]
        );
    }
}
