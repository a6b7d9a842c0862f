use std::path::Path;

use crate::config::AppConfig;
use crate::domain::{AttemptPlan, Browser, DownloadRequest, PostStep, ProgressEvent};

/// File name template, relative to the output directory.
pub const OUTPUT_TEMPLATE: &str = "%(title).200B [%(id)s].%(ext)s";

/// Marker that prefixes machine-readable progress lines on stdout.
pub const PROGRESS_MARKER: &str = "[progress]";

const PROGRESS_TEMPLATE: &str = "download:[progress]%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress._speed_str)s|%(progress._eta_str)s";

/// Options record for one engine session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub format: String,
    pub output_template: String,
    pub allow_playlist: bool,
    pub retries: u32,
    pub fragment_retries: u32,
    pub concurrent_fragments: u32,
    pub cookie_browser: Option<Browser>,
    pub post_steps: Vec<PostStep>,
}

impl EngineOptions {
    pub fn from_plan(config: &AppConfig, request: &DownloadRequest, plan: &AttemptPlan) -> Self {
        Self {
            format: plan.format_expression.clone(),
            output_template: output_template(request.output_directory()),
            allow_playlist: request.allow_playlist(),
            retries: config.retries,
            fragment_retries: config.fragment_retries,
            concurrent_fragments: config.concurrent_fragments,
            cookie_browser: plan.cookie_browser,
            post_steps: plan.post_steps.clone(),
        }
    }

    /// Renders the options as yt-dlp command-line flags (URL not included).
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "-f".to_string(),
            self.format.clone(),
            "-o".to_string(),
            self.output_template.clone(),
        ];

        args.push(if self.allow_playlist {
            "--yes-playlist".to_string()
        } else {
            "--no-playlist".to_string()
        });

        args.extend([
            "--retries".to_string(),
            self.retries.to_string(),
            "--fragment-retries".to_string(),
            self.fragment_retries.to_string(),
            "--concurrent-fragments".to_string(),
            self.concurrent_fragments.to_string(),
        ]);

        if let Some(browser) = self.cookie_browser {
            args.push("--cookies-from-browser".to_string());
            args.push(browser.as_str().to_string());
        }

        for step in &self.post_steps {
            match step {
                PostStep::MergeInto { container } => {
                    args.push("--merge-output-format".to_string());
                    args.push(container.to_string());
                }
                PostStep::ExtractAudio { codec } => {
                    args.push("-x".to_string());
                    args.push("--audio-format".to_string());
                    args.push(codec.to_string());
                }
            }
        }

        args.extend([
            "--newline".to_string(),
            "--no-colors".to_string(),
            "--progress-template".to_string(),
            PROGRESS_TEMPLATE.to_string(),
        ]);

        args
    }
}

pub fn output_template(output_directory: &Path) -> String {
    output_directory
        .join(OUTPUT_TEMPLATE)
        .to_string_lossy()
        .into_owned()
}

/// One progress record as printed through the progress template.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProgress {
    pub status: String,
    pub downloaded_bytes: Option<f64>,
    pub total_bytes: Option<f64>,
    pub total_bytes_estimate: Option<f64>,
    pub speed: String,
    pub eta: String,
}

impl RawProgress {
    /// Parses a `[progress]status|downloaded|total|estimate|speed|eta` line.
    pub fn parse(line: &str) -> Option<Self> {
        let body = line.trim().strip_prefix(PROGRESS_MARKER)?;
        let mut fields = body.split('|');

        let status = fields.next()?.trim().to_string();
        let downloaded_bytes = number(fields.next()?);
        let total_bytes = number(fields.next()?);
        let total_bytes_estimate = number(fields.next()?);
        let speed = label(fields.next().unwrap_or_default());
        let eta = label(fields.next().unwrap_or_default());

        Some(Self {
            status,
            downloaded_bytes,
            total_bytes,
            total_bytes_estimate,
            speed,
            eta,
        })
    }

    pub fn into_event(self) -> Option<ProgressEvent> {
        match self.status.as_str() {
            "downloading" => {
                let total = self
                    .total_bytes
                    .filter(|t| *t > 0.0)
                    .or(self.total_bytes_estimate.filter(|t| *t > 0.0));
                let downloaded = self.downloaded_bytes.unwrap_or(0.0);
                let percent = match total {
                    Some(total) => (downloaded * 100.0 / total).clamp(0.0, 100.0) as u8,
                    None => 0,
                };

                Some(ProgressEvent::Downloading {
                    percent,
                    speed: self.speed,
                    eta: self.eta,
                })
            }
            "finished" => Some(ProgressEvent::PostProcessing),
            _ => None,
        }
    }
}

fn number(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// yt-dlp prints `NA` for missing template fields.
fn label(field: &str) -> String {
    let field = field.trim();
    if field == "NA" || field == "None" {
        String::new()
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quality;

    fn request(audio_only: bool, allow_playlist: bool) -> DownloadRequest {
        DownloadRequest::new(
            ["https://youtu.be/dQw4w9WgXcQ"],
            "/srv/videos",
            Quality::P480,
            audio_only,
            allow_playlist,
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_video_args() {
        let request = request(false, false);
        let plan = AttemptPlan::build(&request, Some(Browser::Edge));
        let args = EngineOptions::from_plan(&AppConfig::default(), &request, &plan).to_args();

        let joined = args.join(" ");
        assert!(joined.starts_with(
            "-f bv*[height<=480][ext=mp4]+ba[ext=m4a]/bv*[height<=480]+ba/b -o "
        ));
        assert!(joined.contains("--no-playlist"));
        assert!(joined.contains("--retries 15 --fragment-retries 15 --concurrent-fragments 1"));
        assert!(joined.contains("--cookies-from-browser edge"));
        assert!(joined.contains("--merge-output-format mp4"));
        assert!(!args.contains(&"-x".to_string()));
        assert!(args.contains(&"--newline".to_string()));
    }

    #[test]
    fn test_audio_args_without_cookies() {
        let request = request(true, true);
        let plan = AttemptPlan::build(&request, None);
        let args = EngineOptions::from_plan(&AppConfig::default(), &request, &plan).to_args();

        let joined = args.join(" ");
        assert!(joined.contains("-f ba/b"));
        assert!(joined.contains("--yes-playlist"));
        assert!(joined.contains("-x --audio-format mp3"));
        assert!(!joined.contains("--cookies-from-browser"));
        assert!(!joined.contains("--merge-output-format"));
    }

    #[test]
    fn test_output_template_keeps_naming_scheme() {
        let template = output_template(Path::new("/srv/videos"));
        assert!(template.starts_with("/srv/videos"));
        assert!(template.ends_with("%(title).200B [%(id)s].%(ext)s"));
    }

    #[test]
    fn test_parse_downloading_line() {
        let raw = RawProgress::parse("[progress]downloading|5242880|10485760|NA|  2.50MiB/s|00:02")
            .unwrap();
        assert_eq!(raw.total_bytes_estimate, None);
        assert_eq!(
            raw.into_event(),
            Some(ProgressEvent::Downloading {
                percent: 50,
                speed: "2.50MiB/s".to_string(),
                eta: "00:02".to_string(),
            })
        );
    }

    #[test]
    fn test_estimate_used_when_total_missing() {
        let raw = RawProgress::parse("[progress]downloading|300|NA|1200.5|NA|NA").unwrap();
        assert_eq!(
            raw.into_event(),
            Some(ProgressEvent::Downloading {
                percent: 24,
                speed: String::new(),
                eta: String::new(),
            })
        );

        let unknown = RawProgress::parse("[progress]downloading|300|NA|NA|NA|NA").unwrap();
        assert!(matches!(
            unknown.into_event(),
            Some(ProgressEvent::Downloading { percent: 0, .. })
        ));
    }

    #[test]
    fn test_percent_is_clamped() {
        let raw = RawProgress::parse("[progress]downloading|2000|1000|NA|NA|NA").unwrap();
        assert!(matches!(
            raw.into_event(),
            Some(ProgressEvent::Downloading { percent: 100, .. })
        ));
    }

    #[test]
    fn test_finished_means_post_processing() {
        let raw = RawProgress::parse("[progress]finished|10|10|NA|NA|NA").unwrap();
        assert_eq!(raw.into_event(), Some(ProgressEvent::PostProcessing));
    }

    #[test]
    fn test_non_progress_lines() {
        assert_eq!(RawProgress::parse("[youtube] dQw4w9WgXcQ: Downloading webpage"), None);
        assert_eq!(RawProgress::parse("[progress]"), None);
    }
}
