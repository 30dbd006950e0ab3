//! Progress reporting for a single processing run.
//!
//! Inject an [`Arc<dyn ProcessingProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to receive
//! events while a mode executor runs.
//!
//! Local modes drive progress from engine callbacks, the cloud mode from
//! polled server status. Either way every percentage passes through a
//! [`ProgressTracker`], so the values a callback sees never go backwards
//! within one run.
//!
//! # Example
//!
//! ```rust
//! use repdf::{ClientConfig, ProcessingProgressCallback, ProgressUpdate};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl ProcessingProgressCallback for LastPercent {
//!     fn on_progress(&self, update: &ProgressUpdate) {
//!         self.0.store(update.percent, Ordering::SeqCst);
//!         eprintln!("{}% {}", update.percent, update.status_text());
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .progress_callback(Arc::new(LastPercent(AtomicU8::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::session::OcrMode;

/// Coarse phase of an executor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    /// OCR engine start-up and language-data loading.
    Loading,
    /// Image encoding before a local-AI request.
    Encoding,
    /// OCR engine recognising text.
    Recognizing,
    /// Waiting on the local inference server.
    Inferring,
    /// Cloud job submission.
    Submitting,
    /// Cloud job running on the server.
    Polling,
    Done,
    Failed,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Init => "Preparing",
            Phase::Loading => "Loading OCR engine",
            Phase::Encoding => "Encoding image",
            Phase::Recognizing => "Recognizing text",
            Phase::Inferring => "Waiting for local AI",
            Phase::Submitting => "Submitting job",
            Phase::Polling => "Processing on server",
            Phase::Done => "Done",
            Phase::Failed => "Failed",
        }
    }
}

/// Display label for a server-reported step name. Unknown steps are shown
/// verbatim.
pub fn step_label(step: &str) -> &str {
    match step {
        "ocr" => "OCR text recognition",
        "inpainting" => "Background reconstruction",
        "pptx" => "PPTX generation",
        other => other,
    }
}

/// One progress event delivered to [`ProcessingProgressCallback::on_progress`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub mode: OcrMode,
    pub phase: Phase,
    /// 0–100, non-decreasing within a run.
    pub percent: u8,
    /// Cloud path only.
    pub current_page: Option<u32>,
    /// Cloud path only.
    pub total_pages: Option<u32>,
    /// Raw server step name (`ocr`, `inpainting`, `pptx`, …).
    pub step: Option<String>,
}

impl ProgressUpdate {
    /// Step label when the server sent one, otherwise the phase label.
    pub fn status_text(&self) -> String {
        match &self.step {
            Some(step) => step_label(step).to_string(),
            None => self.phase.label().to_string(),
        }
    }
}

/// Called by the orchestrator as an executor runs.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive sequentially from one task, but the
/// trait is `Send + Sync` so the callback can be shared with a spawned OCR
/// progress reader.
pub trait ProcessingProgressCallback: Send + Sync {
    /// Called once, after the file passed the mode's capability check.
    fn on_run_start(&self, mode: OcrMode) {
        let _ = mode;
    }

    /// Called for every progress change.
    fn on_progress(&self, update: &ProgressUpdate) {
        let _ = update;
    }

    /// Called when a status poll failed transiently and will be retried.
    ///
    /// # Arguments
    /// * `attempt` — 1-indexed number of the failed status request
    /// * `error`   — human-readable error description
    fn on_poll_retry(&self, attempt: u32, error: &str) {
        let _ = (attempt, error);
    }

    /// Called once when the run produced a result.
    fn on_run_complete(&self, mode: OcrMode) {
        let _ = mode;
    }

    /// Called once when the run failed; the session is back on the
    /// analysis step.
    fn on_run_failed(&self, mode: OcrMode, error: &str) {
        let _ = (mode, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ProcessingProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn ProcessingProgressCallback>;

/// Clamps reported percentages so they never decrease within a run.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    highest: AtomicU8,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `percent` (capped at 100) and return the value to display.
    pub fn advance(&self, percent: u8) -> u8 {
        let p = percent.min(100);
        let prev = self.highest.fetch_max(p, Ordering::SeqCst);
        prev.max(p)
    }

    pub fn current(&self) -> u8 {
        self.highest.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingCallback {
        updates: AtomicUsize,
        retries: AtomicUsize,
    }

    impl ProcessingProgressCallback for CountingCallback {
        fn on_progress(&self, _update: &ProgressUpdate) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }

        fn on_poll_retry(&self, _attempt: u32, _error: &str) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn update(percent: u8) -> ProgressUpdate {
        ProgressUpdate {
            mode: OcrMode::CloudAi,
            phase: Phase::Polling,
            percent,
            current_page: Some(4),
            total_pages: Some(10),
            step: Some("inpainting".into()),
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(OcrMode::LocalOcr);
        cb.on_progress(&update(10));
        cb.on_poll_retry(1, "timeout");
        cb.on_run_failed(OcrMode::LocalOcr, "boom");
        cb.on_run_complete(OcrMode::LocalOcr);
    }

    #[test]
    fn arc_dyn_callback_receives_events() {
        let counter = Arc::new(CountingCallback {
            updates: AtomicUsize::new(0),
            retries: AtomicUsize::new(0),
        });
        let cb: ProgressCallback = counter.clone();
        cb.on_progress(&update(40));
        cb.on_progress(&update(50));
        cb.on_poll_retry(2, "connection reset");
        assert_eq!(counter.updates.load(Ordering::SeqCst), 2);
        assert_eq!(counter.retries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tracker_never_goes_backwards() {
        let t = ProgressTracker::new();
        let seen: Vec<u8> = [0, 20, 15, 60, 40, 130]
            .into_iter()
            .map(|p| t.advance(p))
            .collect();
        assert_eq!(seen, vec![0, 20, 20, 60, 60, 100]);
        assert_eq!(t.current(), 100);
    }

    #[test]
    fn step_labels() {
        assert_eq!(step_label("ocr"), "OCR text recognition");
        assert_eq!(step_label("pptx"), "PPTX generation");
        assert_eq!(step_label("upscale"), "upscale");
        assert_eq!(update(40).status_text(), "Background reconstruction");
    }
}
