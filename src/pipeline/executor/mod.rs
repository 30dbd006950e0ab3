//! Mode executors: one polymorphic interface, three strategies.
//!
//! Every executor follows the same arc: `init → mode-specific phases →
//! done`, or an early failure that sends the session back to the analysis
//! step. [`run`] owns the shared part (capability check, init/done/failed
//! events, callbacks) so each variant only implements its own phases:
//!
//! | Executor | Accepts | Phases (percent) |
//! |----------|---------|------------------|
//! | [`LocalAiExecutor`]  | images | init 0 → encoding 10 → inferring 30 → done 100 |
//! | [`LocalOcrExecutor`] | images | init 0 → loading 0–20 → recognizing 20–90 → done 100 |
//! | [`CloudAiExecutor`]  | PDF, images | init 0 → submitting 0 → server percent → done 100 |

pub mod cloud_ai;
pub mod local_ai;
pub mod local_ocr;

pub use cloud_ai::CloudAiExecutor;
pub use local_ai::LocalAiExecutor;
pub use local_ocr::LocalOcrExecutor;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::{OcrProgress, OcrStatus, TaskProgress};
use crate::error::RepdfError;
use crate::pipeline::input::StagedFile;
use crate::pipeline::present::ResultView;
use crate::progress::{Phase, ProgressCallback, ProgressTracker, ProgressUpdate};
use crate::session::{FileKind, OcrMode};

/// Options chosen on the analysis step before processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Slide aspect ratio for the generated deck, e.g. `"16:9"`.
    pub output_ratio: String,
    pub remove_watermark: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            output_ratio: "16:9".into(),
            remove_watermark: false,
        }
    }
}

/// Raw progress input, mapped to a percentage by
/// [`ModeExecutor::map_progress`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressSignal {
    Init,
    /// OCR engine callback.
    Engine(OcrProgress),
    Encoding,
    Inferring,
    Submitting,
    /// Polled server progress.
    Remote(TaskProgress),
    Done,
}

impl ProgressSignal {
    pub fn phase(&self) -> Phase {
        match self {
            ProgressSignal::Init => Phase::Init,
            ProgressSignal::Engine(p) => match p.status {
                OcrStatus::LoadingLanguage | OcrStatus::Initializing => Phase::Loading,
                OcrStatus::Recognizing => Phase::Recognizing,
            },
            ProgressSignal::Encoding => Phase::Encoding,
            ProgressSignal::Inferring => Phase::Inferring,
            ProgressSignal::Submitting => Phase::Submitting,
            ProgressSignal::Remote(_) => Phase::Polling,
            ProgressSignal::Done => Phase::Done,
        }
    }
}

/// Cloneable handle that turns percentages into callback events.
///
/// Shares one [`ProgressTracker`] across clones, so events from an engine
/// callback and from the executor body stay monotonic together.
#[derive(Clone)]
pub struct ProgressReporter {
    mode: OcrMode,
    tracker: Arc<ProgressTracker>,
    callback: ProgressCallback,
}

impl ProgressReporter {
    pub fn new(mode: OcrMode, callback: ProgressCallback) -> Self {
        Self {
            mode,
            tracker: Arc::new(ProgressTracker::new()),
            callback,
        }
    }

    /// Emit one event; returns the (clamped) percent that was reported.
    pub fn emit(&self, percent: u8, signal: &ProgressSignal) -> u8 {
        let percent = self.tracker.advance(percent);
        let remote = match signal {
            ProgressSignal::Remote(p) => Some(p),
            _ => None,
        };
        self.callback.on_progress(&ProgressUpdate {
            mode: self.mode,
            phase: signal.phase(),
            percent,
            current_page: remote.and_then(|p| p.current_page),
            total_pages: remote.and_then(|p| p.total_pages),
            step: remote.and_then(|p| p.current_step.clone()),
        });
        percent
    }

    fn failed(&self) {
        self.callback.on_progress(&ProgressUpdate {
            mode: self.mode,
            phase: Phase::Failed,
            percent: self.tracker.current(),
            current_page: None,
            total_pages: None,
            step: None,
        });
    }

    pub fn callback(&self) -> &ProgressCallback {
        &self.callback
    }

    pub fn percent(&self) -> u8 {
        self.tracker.current()
    }
}

/// Everything an executor needs from the session for one run.
pub struct ExecutionContext<'a> {
    pub file: &'a StagedFile,
    /// Server-side id; `None` when upload failed.
    pub file_id: Option<&'a str>,
    pub options: &'a ProcessOptions,
    /// Set by the cloud executor once the server accepted a job.
    pub task_id: Option<String>,
    pub reporter: ProgressReporter,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        mode: OcrMode,
        file: &'a StagedFile,
        file_id: Option<&'a str>,
        options: &'a ProcessOptions,
        callback: ProgressCallback,
    ) -> Self {
        Self {
            file,
            file_id,
            options,
            task_id: None,
            reporter: ProgressReporter::new(mode, callback),
        }
    }

    /// Map `signal` through `executor` and emit it.
    pub fn report(&self, executor: &dyn ModeExecutor, signal: ProgressSignal) -> u8 {
        self.reporter.emit(executor.map_progress(&signal), &signal)
    }
}

/// One processing strategy.
#[async_trait]
pub trait ModeExecutor: Send + Sync {
    fn mode(&self) -> OcrMode;

    fn supports(&self, kind: FileKind) -> bool;

    /// Deterministic percentage for a progress signal.
    fn map_progress(&self, signal: &ProgressSignal) -> u8;

    /// Mode-specific phases. Called by [`run`] after the capability check.
    async fn execute(&self, ctx: &mut ExecutionContext<'_>) -> Result<ResultView, RepdfError>;
}

/// Run `executor` against `ctx`: check the file kind, then execute with
/// init/done/failed events around it.
///
/// An unsupported file fails before the executor body runs, so no engine or
/// server is contacted and `ctx.task_id` stays unset.
pub async fn run(
    executor: &dyn ModeExecutor,
    ctx: &mut ExecutionContext<'_>,
) -> Result<ResultView, RepdfError> {
    let mode = executor.mode();
    let kind = ctx.file.kind().ok_or_else(|| RepdfError::UnsupportedFileType {
        name: ctx.file.name.clone(),
        mime: ctx.file.mime.clone(),
    })?;
    if !executor.supports(kind) {
        warn!("{} cannot process a {}", mode, kind);
        return Err(RepdfError::UnsupportedFileKind { mode, kind });
    }

    info!("Running {} on {}", mode, ctx.file.name);
    ctx.reporter.callback().on_run_start(mode);
    ctx.report(executor, ProgressSignal::Init);

    match executor.execute(ctx).await {
        Ok(view) => {
            ctx.report(executor, ProgressSignal::Done);
            ctx.reporter.callback().on_run_complete(mode);
            info!("{} finished", mode);
            Ok(view)
        }
        Err(e) => {
            ctx.reporter.failed();
            ctx.reporter.callback().on_run_failed(mode, &e.to_string());
            warn!("{} failed: {}", mode, e);
            Err(e)
        }
    }
}
