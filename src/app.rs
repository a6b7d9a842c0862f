use std::path::PathBuf;
use std::sync::Arc;

use iced::{Subscription, Task};

use crate::application::{
    check_tools, spawn_run, HostCookieResolver, LogBuffer, Orchestrator, ProgressState, RunSlot,
    ToolPaths,
};
use crate::config::AppConfig;
use crate::domain::{AppError, DownloadRequest, ProgressEvent, Severity};
use crate::engine::YtDlpEngine;
use crate::settings::{settings_path, UserSettings};
use crate::ui::{DownloadMessage, DownloadView};
use crate::utils::{normalize_youtube_url, read_batch_file};

pub struct DownloadApp {
    config: Arc<AppConfig>,
    view: DownloadView,
    log: LogBuffer,
    progress: ProgressState,
    run_slot: RunSlot,
    settings_path: Option<PathBuf>,
}

impl DownloadApp {
    /// `settings_path` is where form choices are loaded from and saved to; `None` disables it.
    pub fn new(config: AppConfig, settings_path: Option<PathBuf>) -> Self {
        let settings = settings_path
            .as_deref()
            .map(UserSettings::load_from)
            .unwrap_or_default();

        let mut view = DownloadView {
            quality: settings.quality,
            audio_only: settings.audio_only,
            allow_playlist: settings.allow_playlist,
            use_cookies: settings.use_cookies,
            ..DownloadView::default()
        };
        view.output_dir = settings
            .output_directory
            .unwrap_or_else(|| config.default_output_dir.clone())
            .display()
            .to_string();

        let mut app = Self {
            log: LogBuffer::new(config.log_history_limit),
            config: Arc::new(config),
            view,
            progress: ProgressState::default(),
            run_slot: RunSlot::default(),
            settings_path,
        };

        // Tell the user up front instead of waiting for the first failed start.
        if let Err(e) = check_tools(&app.config) {
            app.log.push(Severity::Warning, &e.to_string());
        }
        app.flush_log();
        app
    }

    pub fn title(&self) -> String {
        format!("YouTube Downloader v{}", env!("CARGO_PKG_VERSION"))
    }

    fn flush_log(&mut self) {
        if self.log.flush() {
            self.view.log_text = self.log.text();
        }
    }

    fn current_settings(&self) -> UserSettings {
        let output_dir = self.view.output_dir.trim();
        UserSettings {
            output_directory: (!output_dir.is_empty()).then(|| PathBuf::from(output_dir)),
            quality: self.view.quality,
            audio_only: self.view.audio_only,
            allow_playlist: self.view.allow_playlist,
            use_cookies: self.view.use_cookies,
        }
    }

    fn build_request<I, S>(&self, candidates: I) -> Result<DownloadRequest, AppError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        DownloadRequest::new(
            candidates,
            PathBuf::from(self.view.output_dir.trim()),
            self.view.quality,
            self.view.audio_only,
            self.view.allow_playlist,
            self.view.use_cookies,
        )
    }

    /// Validates, runs preflight, and hands the request to a background worker.
    fn start(&mut self, request: Result<DownloadRequest, AppError>) -> Task<Message> {
        if self.run_slot.is_active() {
            tracing::debug!("start ignored, a run is already active");
            return Task::none();
        }

        let request = match request {
            Ok(request) => request,
            Err(e) => return show_error(e),
        };

        let tools = match check_tools(&self.config) {
            Ok(tools) => tools,
            Err(e) => return show_error(e),
        };

        if !self.run_slot.try_acquire() {
            return Task::none();
        }

        tracing::info!(
            urls = request.urls().len(),
            quality = %request.quality(),
            audio_only = request.audio_only(),
            use_cookies = request.use_cookies(),
            "starting run"
        );

        self.view.is_downloading = true;
        self.progress.reset();
        self.sync_progress();

        let stream = spawn_run(self.orchestrator(tools), request);
        Task::batch([Task::run(stream, Message::Run), self.save_settings()])
    }

    fn orchestrator(&self, tools: ToolPaths) -> Orchestrator<YtDlpEngine> {
        let engine = YtDlpEngine::new(tools.engine).with_transcoder(tools.transcoder);
        Orchestrator::new(
            self.config.clone(),
            engine,
            Arc::new(HostCookieResolver::new(self.config.platform)),
        )
    }

    fn save_settings(&self) -> Task<Message> {
        let Some(path) = self.settings_path.clone() else {
            return Task::none();
        };
        let settings = self.current_settings();

        Task::perform(
            async move { settings.save_to(&path).await },
            Message::SettingsSaved,
        )
    }

    fn sync_progress(&mut self) {
        self.view.progress_percent = f32::from(self.progress.percent);
        self.view.progress_info = self.progress.info.clone();
    }

    fn on_run_event(&mut self, event: ProgressEvent) {
        match event {
            ProgressEvent::Downloading { .. } | ProgressEvent::PostProcessing => {
                // Applied immediately; only the latest value matters.
                if self.progress.apply(&event) {
                    self.sync_progress();
                }
            }
            ProgressEvent::LogLine { text, severity } => {
                if severity == Severity::Debug {
                    tracing::debug!(target: "ytdl_desk::engine", "{}", text);
                } else {
                    self.log.push(severity, &text);
                }
            }
            ProgressEvent::Completed { success } => {
                if success {
                    self.log.push(Severity::Info, "✔ Done.");
                } else {
                    self.log.push(Severity::Error, "Failed.");
                }
                self.flush_log();
                self.run_slot.release();
                self.view.is_downloading = false;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Ui(DownloadMessage),
    OutputDirPicked(Option<PathBuf>),
    BatchFilePicked(Option<PathBuf>),
    BatchLoaded(Result<Vec<String>, AppError>),
    Run(ProgressEvent),
    /// Periodic flush of buffered log lines
    FlushLog,
    SettingsSaved(Result<(), String>),
    DialogClosed,
}

pub fn boot(config: AppConfig) -> impl Fn() -> (DownloadApp, Task<Message>) {
    move || (DownloadApp::new(config.clone(), settings_path()), Task::none())
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::Ui(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::DownloadPressed => {
                    let url = normalize_youtube_url(&app.view.youtube_url);
                    let request = if url.is_empty() {
                        Err(AppError::InvalidUrl)
                    } else {
                        app.build_request([url])
                    };
                    return app.start(request);
                }
                DownloadMessage::PastePressed => {
                    return iced::clipboard::read()
                        .map(|text| Message::Ui(DownloadMessage::UrlPasted(text)));
                }
                DownloadMessage::BrowsePressed => {
                    let current = PathBuf::from(app.view.output_dir.trim());
                    return Task::perform(
                        async move {
                            let mut dialog = rfd::AsyncFileDialog::new();
                            if current.is_dir() {
                                dialog = dialog.set_directory(&current);
                            }
                            dialog
                                .pick_folder()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::OutputDirPicked,
                    );
                }
                DownloadMessage::BatchPressed => {
                    return Task::perform(
                        async {
                            rfd::AsyncFileDialog::new()
                                .add_filter("Text", &["txt"])
                                .pick_file()
                                .await
                                .map(|handle| handle.path().to_path_buf())
                        },
                        Message::BatchFilePicked,
                    );
                }
                _ => {}
            }
        }
        Message::OutputDirPicked(Some(path)) => {
            app.view.output_dir = path.display().to_string();
        }
        Message::OutputDirPicked(None) | Message::BatchFilePicked(None) => {
            // User cancelled dialog
        }
        Message::BatchFilePicked(Some(path)) => {
            return Task::perform(
                async move { read_batch_file(&path).await },
                Message::BatchLoaded,
            );
        }
        Message::BatchLoaded(result) => {
            let request = result.and_then(|urls| {
                app.log
                    .push(Severity::Info, &format!("Loaded {} URL(s) from batch file", urls.len()));
                app.flush_log();
                app.build_request(urls)
            });
            return app.start(request);
        }
        Message::Run(event) => app.on_run_event(event),
        Message::FlushLog => app.flush_log(),
        Message::SettingsSaved(Err(e)) => {
            tracing::warn!(error = %e, "settings not saved");
        }
        Message::SettingsSaved(Ok(())) | Message::DialogClosed => {}
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::Ui)
}

pub fn subscription(app: &DownloadApp) -> Subscription<Message> {
    if app.view.is_downloading || app.log.has_pending() {
        iced::time::every(app.config.log_flush_interval).map(|_| Message::FlushLog)
    } else {
        Subscription::none()
    }
}

fn show_error(error: AppError) -> Task<Message> {
    tracing::warn!(error = %error, "start rejected");

    let title = error.title();
    let description = error.to_string();
    Task::perform(
        async move {
            rfd::AsyncMessageDialog::new()
                .set_level(rfd::MessageLevel::Error)
                .set_title(title)
                .set_description(description)
                .set_buttons(rfd::MessageButtons::Ok)
                .show()
                .await;
        },
        |_| Message::DialogClosed,
    )
}
