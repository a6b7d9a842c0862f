use std::sync::Arc;

use super::bridge::EventSink;
use super::cookies::CookieResolver;
use crate::config::AppConfig;
use crate::domain::{
    AppError, AttemptPlan, Browser, DownloadRequest, ProgressEvent, RunOutcome, RunPhase,
    Severity,
};
use crate::engine::{Engine, EngineError, EngineOptions};

const NO_BROWSER_WARNING: &str =
    "Cookies enabled, but no supported browser profile found. Continuing without cookies.";

/// Drives a download run: prepare, attempt with cookies if available, and fall back
/// to one attempt without cookies.
///
/// A failing URL fails its whole attempt; the fallback re-runs the full batch.
pub struct Orchestrator<E> {
    config: Arc<AppConfig>,
    engine: E,
    cookies: Arc<dyn CookieResolver>,
}

impl<E: Engine> Orchestrator<E> {
    pub fn new(config: Arc<AppConfig>, engine: E, cookies: Arc<dyn CookieResolver>) -> Self {
        Self {
            config,
            engine,
            cookies,
        }
    }

    /// Runs the request to a terminal state. Emits exactly one `Completed` event.
    pub async fn run(&self, request: &DownloadRequest, sink: &dyn EventSink) -> RunOutcome {
        enter(RunPhase::default());
        let outcome = self.drive(request, sink).await;
        debug_assert!(outcome.phase().is_terminal());

        tracing::info!(
            phase = ?outcome.phase(),
            attempts = outcome.attempts,
            reason = %outcome.reason,
            "run reached terminal state"
        );
        sink.emit(ProgressEvent::Completed {
            success: outcome.success,
        });
        outcome
    }

    async fn drive(&self, request: &DownloadRequest, sink: &dyn EventSink) -> RunOutcome {
        enter(RunPhase::Preparing);

        let output_directory = request.output_directory();
        if let Err(e) = tokio::fs::create_dir_all(output_directory).await {
            let reason = AppError::OutputDirectory {
                path: output_directory.to_path_buf(),
                reason: e.to_string(),
            }
            .to_string();
            sink.log(Severity::Error, &reason);
            return RunOutcome::failed(reason, 0);
        }

        let cookie_browser = if request.use_cookies() {
            let resolved = self.cookies.resolve();
            if resolved.is_none() {
                sink.log(
                    Severity::Warning,
                    NO_BROWSER_WARNING,
                );
            }
            resolved
        } else {
            None
        };

        let first = self.attempt(request, cookie_browser, sink).await;
        let Err(first_error) = first else {
            return RunOutcome::succeeded(1);
        };

        if cookie_browser.is_none() {
            return RunOutcome::failed(first_error.to_string(), 1);
        }

        sink.log(Severity::Warning, "Failed with cookies, retrying without cookies…");

        match self.attempt(request, None, sink).await {
            Ok(()) => RunOutcome::succeeded(2),
            Err(e) => RunOutcome::failed(e.to_string(), 2),
        }
    }

    /// One pass over every URL with a fixed cookie policy.
    async fn attempt(
        &self,
        request: &DownloadRequest,
        cookie_browser: Option<Browser>,
        sink: &dyn EventSink,
    ) -> Result<(), EngineError> {
        let plan = AttemptPlan::build(request, cookie_browser);
        enter(if plan.with_cookies() {
            RunPhase::AttemptingWithCookies
        } else {
            RunPhase::AttemptingWithoutCookies
        });

        let result = self.download_all(request, &plan, sink).await;

        if let Err(e) = &result {
            if e.is_download_error() {
                sink.log(Severity::Error, &e.to_string());
            } else {
                sink.log(Severity::Error, &format!("Error: {}", e));
            }
            tracing::warn!(engine = self.engine.name(), error = %e, "attempt failed");
        }
        result
    }

    async fn download_all(
        &self,
        request: &DownloadRequest,
        plan: &AttemptPlan,
        sink: &dyn EventSink,
    ) -> Result<(), EngineError> {
        let options = EngineOptions::from_plan(&self.config, request, plan);
        let mut session = self.engine.open_session(options)?;

        let total = request.urls().len();
        for (index, url) in request.urls().iter().enumerate() {
            sink.emit(ProgressEvent::reset());
            sink.log(Severity::Info, &format!("== [{}/{}] {} ==", index + 1, total, url));
            session.download(url, sink).await?;
        }
        Ok(())
    }
}

fn enter(phase: RunPhase) {
    tracing::debug!(?phase, "run phase");
}
