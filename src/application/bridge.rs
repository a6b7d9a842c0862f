// Hand-off between the worker task running a download and the UI thread.
//
// The worker only ever enqueues immutable `ProgressEvent`s. The UI applies
// progress updates right away and batches log lines, flushing them on a timer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::channel::mpsc::{self, UnboundedSender};
use futures::{Stream, StreamExt};

use super::orchestrator::Orchestrator;
use crate::domain::{DownloadRequest, ProgressEvent, Severity};
use crate::engine::Engine;

/// Where the orchestrator and the engine binding report what happens during a run.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);

    fn log(&self, severity: Severity, text: &str) {
        self.emit(ProgressEvent::log(severity, text));
    }
}

/// Channel-backed sink. Never blocks the sender.
#[derive(Clone)]
pub struct EventSender {
    tx: UnboundedSender<ProgressEvent>,
    completed: Arc<AtomicBool>,
}

impl EventSender {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self {
            tx,
            completed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

impl EventSink for EventSender {
    fn emit(&self, event: ProgressEvent) {
        // Nothing may follow the terminal event of a run.
        if self.completed.load(Ordering::SeqCst) {
            tracing::debug!(?event, "event dropped after completion");
            return;
        }
        if matches!(event, ProgressEvent::Completed { .. }) {
            self.completed.store(true, Ordering::SeqCst);
        }
        if self.tx.unbounded_send(event).is_err() {
            tracing::debug!("event receiver gone");
        }
    }
}

/// Runs the orchestrator on its own tokio task and streams its events back.
///
/// The stream always ends with exactly one `Completed` event, even if the worker panics.
pub fn spawn_run<E>(
    orchestrator: Orchestrator<E>,
    request: DownloadRequest,
) -> impl Stream<Item = ProgressEvent>
where
    E: Engine + 'static,
{
    let (tx, rx) = mpsc::unbounded();
    let sender = EventSender::new(tx);

    // Spawned lazily, once the stream is first polled on the runtime.
    let start = async move {
        let worker_sink = sender.clone();
        let worker = tokio::spawn(async move { orchestrator.run(&request, &worker_sink).await });

        match worker.await {
            Ok(outcome) => {
                tracing::info!(success = outcome.success, reason = %outcome.reason, "run finished");
            }
            Err(e) => {
                tracing::error!(error = %e, "download worker crashed");
                sender.log(Severity::Error, &format!("Unexpected error: {}", e));
            }
        }

        if !sender.is_completed() {
            sender.emit(ProgressEvent::Completed { success: false });
        }
    };

    futures::stream::once(async move {
        tokio::spawn(start);
        rx
    })
    .flatten()
}

/// Log lines waiting for the next flush, plus what the log view currently shows.
#[derive(Debug, Default)]
pub struct LogBuffer {
    pending: Vec<String>,
    visible: VecDeque<String>,
    limit: usize,
}

impl LogBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            visible: VecDeque::new(),
            limit,
        }
    }

    pub fn push(&mut self, severity: Severity, text: &str) {
        let line = match severity {
            Severity::Warning => format!("⚠ {}", text),
            Severity::Error => format!("✘ {}", text),
            Severity::Debug | Severity::Info => text.to_string(),
        };
        self.pending.push(line);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Moves pending lines into the visible log. Returns `false` if there was nothing to move.
    pub fn flush(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }

        self.visible.extend(self.pending.drain(..));
        if self.limit > 0 {
            while self.visible.len() > self.limit {
                self.visible.pop_front();
            }
        }
        true
    }

    pub fn visible(&self) -> impl Iterator<Item = &str> {
        self.visible.iter().map(String::as_str)
    }

    pub fn text(&self) -> String {
        self.visible().collect::<Vec<_>>().join("\n")
    }
}

/// Latest progress for the progress bar. Last value wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressState {
    pub percent: u8,
    pub info: String,
}

impl ProgressState {
    /// Applies a progress event; returns `false` for events that carry no progress.
    pub fn apply(&mut self, event: &ProgressEvent) -> bool {
        match event {
            ProgressEvent::Downloading { percent, speed, eta } => {
                self.percent = (*percent).min(100);
                self.info = progress_info(speed, eta);
                true
            }
            ProgressEvent::PostProcessing => {
                self.percent = 100;
                self.info = "Done (post-processing)".to_string();
                true
            }
            ProgressEvent::LogLine { .. } | ProgressEvent::Completed { .. } => false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn progress_info(speed: &str, eta: &str) -> String {
    let eta = if eta.is_empty() {
        String::new()
    } else {
        format!("ETA {}", eta)
    };

    [speed, eta.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" • ")
}

/// Single-slot guard: at most one run may be active.
#[derive(Debug, Clone, Default)]
pub struct RunSlot {
    active: Arc<AtomicBool>,
}

impl RunSlot {
    pub fn try_acquire(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn release(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
